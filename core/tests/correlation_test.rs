use std::sync::Arc;

use tokio::time::{Duration, Instant};
use tribunal_core::{
    AggregatedResult, ContentDescriptor, CorrelationEngine, CorrelationId, EndpointId, Message,
    Outcome, ReplyDisposition, ReviewPayload, ReviewStatus, Submission, UnexpectedReply, Verdict,
};

fn content() -> ContentDescriptor {
    ContentDescriptor::new("dance_video_01", "tiktok", "short_video", "teens")
}

fn submission(cid: &str, reviewers: &[&str]) -> Submission {
    Submission::with_id(
        CorrelationId::new(cid),
        content(),
        reviewers.iter().map(|r| EndpointId::from(*r)),
    )
}

fn request(cid: &str, reviewer: &str) -> Message {
    Message::request("producer", reviewer, CorrelationId::new(cid), content())
}

fn inform(cid: &str, reviewer: &str, verdict: Verdict) -> Message {
    request(cid, reviewer).inform_reply(ReviewPayload::new(reviewer, verdict, 0.8))
}

fn failure(cid: &str, reviewer: &str) -> Message {
    request(cid, reviewer).failure_reply("evaluator crashed")
}

async fn resolve_in_order(engine: &Arc<CorrelationEngine>, cid: &str, order: &[&str]) -> AggregatedResult {
    let mut handle = engine
        .register(&submission(cid, &["feedback", "summary", "moderation"]), Duration::from_secs(10))
        .unwrap();
    for reviewer in order {
        let reply = if *reviewer == "moderation" {
            failure(cid, reviewer)
        } else {
            inform(cid, reviewer, Verdict::Approve)
        };
        assert!(engine.record_reply(&reply).is_accepted());
    }
    handle.wait().await.unwrap()
}

#[tokio::test]
async fn completion_is_independent_of_arrival_order() {
    let engine = Arc::new(CorrelationEngine::new());
    let orders: [[&str; 3]; 4] = [
        ["feedback", "summary", "moderation"],
        ["moderation", "summary", "feedback"],
        ["summary", "moderation", "feedback"],
        ["moderation", "feedback", "summary"],
    ];

    let mut results = Vec::new();
    for (i, order) in orders.iter().enumerate() {
        results.push(resolve_in_order(&engine, &format!("perm-{}", i), order).await);
    }

    for result in &results {
        assert_eq!(result.status, ReviewStatus::Complete);
        assert_eq!(result.outcomes.len(), 3);
        assert_eq!(result.outcomes, results[0].outcomes);
    }
    // A failure reply still counts as an answer
    assert!(matches!(
        results[0].outcome(&"moderation".into()),
        Some(Outcome::Failed { .. })
    ));
    assert_eq!(engine.stats().completed, 4);
    assert_eq!(engine.open_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn zero_replies_resolve_partial_at_deadline() {
    let engine = Arc::new(CorrelationEngine::new());
    let started = Instant::now();
    let mut handle = engine
        .register(&submission("silent", &["feedback", "summary", "moderation"]), Duration::from_millis(500))
        .unwrap();

    let result = handle.wait().await.unwrap();
    let waited = started.elapsed();

    assert_eq!(result.status, ReviewStatus::Partial);
    assert_eq!(result.timed_out().len(), 3);
    assert_eq!(result.responded(), 0);
    assert!(waited >= Duration::from_millis(500));
    assert!(waited < Duration::from_millis(600));
    assert!(!engine.is_open(&CorrelationId::new("silent")));
}

#[tokio::test]
async fn duplicate_replies_are_ignored() {
    let engine = Arc::new(CorrelationEngine::new());
    let mut handle = engine
        .register(&submission("dup", &["feedback", "summary"]), Duration::from_secs(5))
        .unwrap();

    assert_eq!(
        engine.record_reply(&inform("dup", "feedback", Verdict::Approve)),
        ReplyDisposition::Accepted
    );
    assert_eq!(
        engine.record_reply(&inform("dup", "feedback", Verdict::Reject)),
        ReplyDisposition::Rejected(UnexpectedReply::Duplicate)
    );
    assert_eq!(
        engine.record_reply(&inform("dup", "summary", Verdict::Approve)),
        ReplyDisposition::Completed
    );

    let result = handle.wait().await.unwrap();
    let first = result.outcome(&"feedback".into()).and_then(Outcome::review).unwrap();
    assert_eq!(first.verdict, Verdict::Approve);
    assert_eq!(engine.stats().rejected_replies, 1);
}

#[tokio::test]
async fn concurrent_submissions_do_not_cross() {
    let engine = Arc::new(CorrelationEngine::new());
    let reviewers = ["feedback", "summary"];
    let mut first = engine
        .register(&submission("s-1", &reviewers), Duration::from_secs(5))
        .unwrap();
    let mut second = engine
        .register(&submission("s-2", &reviewers), Duration::from_secs(5))
        .unwrap();

    engine.record_reply(&inform("s-1", "feedback", Verdict::Approve));
    engine.record_reply(&inform("s-2", "feedback", Verdict::Reject));
    engine.record_reply(&inform("s-2", "summary", Verdict::Reject));
    assert!(engine.is_open(&CorrelationId::new("s-1")));
    engine.record_reply(&inform("s-1", "summary", Verdict::Approve));

    let first = first.wait().await.unwrap();
    let second = second.wait().await.unwrap();
    assert_eq!(first.final_verdict(), Verdict::Approve);
    assert_eq!(second.final_verdict(), Verdict::Reject);

    assert_eq!(
        engine.record_reply(&inform("s-3", "feedback", Verdict::Approve)),
        ReplyDisposition::Rejected(UnexpectedReply::UnknownCorrelation)
    );
}

#[tokio::test(start_paused = true)]
async fn reply_before_deadline_counts_and_after_is_dropped() {
    let engine = Arc::new(CorrelationEngine::new());
    let timeout = Duration::from_millis(100);

    let mut early = engine
        .register(&submission("early", &["feedback", "summary"]), timeout)
        .unwrap();
    let mut edge = engine
        .register(&submission("edge", &["feedback"]), timeout)
        .unwrap();

    tokio::time::advance(Duration::from_millis(99)).await;
    assert_eq!(
        engine.record_reply(&inform("early", "feedback", Verdict::Approve)),
        ReplyDisposition::Accepted
    );

    tokio::time::advance(Duration::from_millis(1)).await;
    // Exactly at the deadline the reply is late, whether or not the timer ran
    assert_eq!(
        engine.record_reply(&inform("edge", "feedback", Verdict::Approve)),
        ReplyDisposition::Rejected(UnexpectedReply::Late)
    );
    assert_eq!(
        engine.record_reply(&inform("early", "summary", Verdict::Approve)),
        ReplyDisposition::Rejected(UnexpectedReply::Late)
    );

    let early = early.wait().await.unwrap();
    assert_eq!(early.status, ReviewStatus::Partial);
    assert!(early.outcome(&"feedback".into()).unwrap().is_reply());
    assert_eq!(early.outcome(&"summary".into()), Some(&Outcome::TimedOut));

    let edge = edge.wait().await.unwrap();
    assert_eq!(edge.outcome(&"feedback".into()), Some(&Outcome::TimedOut));
}

#[tokio::test]
async fn cancel_resolves_and_drops_later_replies() {
    let engine = Arc::new(CorrelationEngine::new());
    let cid = CorrelationId::new("cancel-me");
    let mut handle = engine
        .register(&submission("cancel-me", &["feedback", "summary"]), Duration::from_secs(5))
        .unwrap();
    engine.record_reply(&inform("cancel-me", "feedback", Verdict::Approve));

    let cancelled = engine.cancel(&cid).unwrap();
    assert_eq!(cancelled.status, ReviewStatus::Cancelled);
    assert_eq!(cancelled.outcome(&"summary".into()), Some(&Outcome::NotReached));
    assert!(cancelled.outcome(&"feedback".into()).unwrap().is_reply());

    let waited = handle.wait().await.unwrap();
    assert_eq!(waited, cancelled);

    assert!(engine.cancel(&cid).is_none());
    assert_eq!(
        engine.record_reply(&inform("cancel-me", "summary", Verdict::Approve)),
        ReplyDisposition::Rejected(UnexpectedReply::Late)
    );
    assert_eq!(engine.stats().cancelled, 1);
}

#[tokio::test]
async fn undeliverable_reviewer_times_out_immediately() {
    let engine = Arc::new(CorrelationEngine::new());
    let cid = CorrelationId::new("unreachable");
    let mut handle = engine
        .register(&submission("unreachable", &["feedback", "ghost"]), Duration::from_secs(30))
        .unwrap();

    assert!(engine.mark_undeliverable(&cid, &"ghost".into()));
    assert!(!engine.mark_undeliverable(&cid, &"ghost".into()));
    assert_eq!(
        engine.record_reply(&inform("unreachable", "feedback", Verdict::Approve)),
        ReplyDisposition::Completed
    );

    let result = handle.wait().await.unwrap();
    assert_eq!(result.status, ReviewStatus::Partial);
    assert_eq!(result.outcome(&"ghost".into()), Some(&Outcome::TimedOut));
}

#[tokio::test]
async fn rejects_strangers_and_non_replies() {
    let engine = Arc::new(CorrelationEngine::new());
    let _handle = engine
        .register(&submission("c-1", &["feedback"]), Duration::from_secs(5))
        .unwrap();

    assert_eq!(
        engine.record_reply(&inform("c-1", "intruder", Verdict::Approve)),
        ReplyDisposition::Rejected(UnexpectedReply::UnexpectedReviewer)
    );
    assert_eq!(
        engine.record_reply(&request("c-1", "feedback")),
        ReplyDisposition::Rejected(UnexpectedReply::NotAReply)
    );
    assert!(engine.is_open(&CorrelationId::new("c-1")));
}

#[tokio::test]
async fn register_validates_submission() {
    let engine = Arc::new(CorrelationEngine::new());

    assert!(engine
        .register(&submission("zero", &["feedback"]), Duration::ZERO)
        .is_err());
    assert!(engine
        .register(&submission("nobody", &[]), Duration::from_secs(1))
        .is_err());
    assert!(engine
        .register(&submission("", &["feedback"]), Duration::from_secs(1))
        .is_err());

    let _open = engine
        .register(&submission("taken", &["feedback"]), Duration::from_secs(1))
        .unwrap();
    assert!(engine
        .register(&submission("taken", &["summary"]), Duration::from_secs(1))
        .is_err());
    assert_eq!(engine.stats().registered, 1);
}
