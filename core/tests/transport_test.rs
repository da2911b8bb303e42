use std::sync::Arc;
use std::time::Duration;

use tribunal_core::{
    ContentDescriptor, CorrelationId, DeliveryError, EndpointDirectory, EndpointId, EndpointInfo,
    LocalTransport, Message, Payload, Performative, ReviewPayload, Transport, TribunalError,
    Verdict,
};

fn directory() -> Arc<EndpointDirectory> {
    Arc::new(EndpointDirectory::from_bindings([
        EndpointInfo::new("producer", "local://producer", "producer"),
        EndpointInfo::new("moderation", "local://moderation", "moderation"),
        EndpointInfo::new("summary", "local://summary", "summary"),
    ]))
}

fn content() -> ContentDescriptor {
    ContentDescriptor::new("dance_video_01", "tiktok", "short_video", "teens")
}

fn request_to(recipient: &str, cid: &str) -> Message {
    Message::request("producer", recipient, CorrelationId::new(cid), content())
}

#[tokio::test]
async fn delivers_to_bound_endpoint() {
    let transport = LocalTransport::from_directory(directory(), 16);
    transport.send(request_to("moderation", "c-1")).await.unwrap();

    let received = transport
        .receive(&EndpointId::from("moderation"), Duration::from_millis(100))
        .await
        .unwrap()
        .expect("message should be queued");
    assert_eq!(received.performative, Performative::Request);
    assert_eq!(received.correlation_id.as_str(), "c-1");
    assert!(matches!(received.payload, Payload::Submission(ref c) if c.content_id == "dance_video_01"));
}

#[tokio::test]
async fn receive_times_out_with_none() {
    let transport = LocalTransport::from_directory(directory(), 16);
    let received = transport
        .receive(&EndpointId::from("summary"), Duration::from_millis(20))
        .await
        .unwrap();
    assert!(received.is_none());
}

#[tokio::test]
async fn unknown_endpoint_is_reported() {
    let transport = LocalTransport::from_directory(directory(), 16);
    let err = transport.send(request_to("ghost", "c-1")).await.unwrap_err();
    assert!(matches!(
        err,
        TribunalError::Delivery(DeliveryError::UnknownEndpoint(ref e)) if e.as_str() == "ghost"
    ));
    assert_eq!(transport.stats().delivery_failures, 1);
}

#[tokio::test]
async fn known_endpoint_without_mailbox_is_unreachable() {
    let transport = LocalTransport::from_directory(directory(), 16);
    assert!(transport.unbind("local://summary"));

    let err = transport.send(request_to("summary", "c-1")).await.unwrap_err();
    assert!(matches!(
        err,
        TribunalError::Delivery(DeliveryError::Unreachable(_))
    ));
}

#[tokio::test]
async fn full_mailbox_is_unreachable() {
    let transport = LocalTransport::from_directory(directory(), 1);
    transport.send(request_to("moderation", "c-1")).await.unwrap();

    let err = transport.send(request_to("moderation", "c-2")).await.unwrap_err();
    assert!(matches!(
        err,
        TribunalError::Delivery(DeliveryError::Unreachable(_))
    ));

    let stats = transport.stats();
    assert_eq!(stats.total_sent, 2);
    assert_eq!(stats.total_delivered, 1);
    assert_eq!(stats.delivery_failures, 1);
}

#[tokio::test]
async fn invalid_messages_are_rejected_before_delivery() {
    let transport = LocalTransport::from_directory(directory(), 16);

    let err = transport.send(request_to("moderation", "")).await.unwrap_err();
    assert!(matches!(err, TribunalError::InvalidMessage(_)));

    let mut mismatched = request_to("moderation", "c-1");
    mismatched.performative = Performative::Inform;
    let err = transport.send(mismatched).await.unwrap_err();
    assert!(matches!(err, TribunalError::InvalidMessage(_)));

    assert_eq!(transport.stats().total_sent, 0);
    let received = transport
        .receive(&EndpointId::from("moderation"), Duration::from_millis(10))
        .await
        .unwrap();
    assert!(received.is_none());
}

#[tokio::test]
async fn preserves_order_between_a_pair() {
    let transport = LocalTransport::from_directory(directory(), 16);
    let request = request_to("moderation", "c-1");
    for i in 0..5 {
        let reply = request.inform_reply(
            ReviewPayload::new("moderation", Verdict::Approve, 0.9).with_notes(i.to_string()),
        );
        transport.send(reply).await.unwrap();
    }

    let producer = EndpointId::from("producer");
    for i in 0..5 {
        let msg = transport
            .receive(&producer, Duration::from_millis(50))
            .await
            .unwrap()
            .unwrap();
        match msg.payload {
            Payload::Review(review) => assert_eq!(review.notes, i.to_string()),
            other => panic!("unexpected payload {:?}", other),
        }
    }
}

#[tokio::test]
async fn replies_keep_correlation_and_swap_endpoints() {
    let request = request_to("moderation", "c-9").with_ontology("custom");
    let reply = request.failure_reply("model offline");

    assert_eq!(reply.sender.as_str(), "moderation");
    assert_eq!(reply.recipient.as_str(), "producer");
    assert_eq!(reply.correlation_id, request.correlation_id);
    assert_eq!(reply.ontology, "custom");
    assert_eq!(reply.performative, Performative::Failure);
    assert!(reply.validate().is_ok());
}
