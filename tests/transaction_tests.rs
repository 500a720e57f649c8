use mq_responder::application::receiver::{Next, ReceiveLoop, RetryPolicy, RetryState};
use mq_responder::application::responder::{Outcome, Responder, RunSummary};
use mq_responder::application::transform::SquareValue;
use mq_responder::domain::envelope::{CorrelId, ID_LENGTH};
use mq_responder::domain::ports::{QueueSelector, QueueTransport};
use mq_responder::domain::record::Record;
use mq_responder::infrastructure::in_memory::InMemoryQueueManager;
use mq_responder::interfaces::json::codec;
use std::time::Duration;

const SOURCE: &str = "DEV.QUEUE.1";
const REPLY: &str = "DEV.QUEUE.2";

fn policy() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(5))
}

async fn queue_manager() -> InMemoryQueueManager {
    let qmgr = InMemoryQueueManager::new("QM1");
    qmgr.define_queue(SOURCE).await;
    qmgr.define_queue(REPLY).await;
    qmgr
}

fn responder(qmgr: &InMemoryQueueManager) -> Responder {
    Responder::new(
        Box::new(qmgr.clone()),
        SOURCE,
        Box::new(SquareValue::new("it")),
    )
    .with_policy(policy())
}

#[tokio::test]
async fn test_failed_send_leaves_request_for_replay() {
    let qmgr = queue_manager().await;
    let request = codec::encode(&Record::new("hi", 4)).unwrap();
    let message_id = qmgr
        .put_request(SOURCE, request.clone(), REPLY, None)
        .await
        .unwrap();
    qmgr.fail_next_sends(1).await;

    let responder = responder(&qmgr);
    let source = qmgr.open(&QueueSelector::input(SOURCE)).await.unwrap();
    let receiver = ReceiveLoop::new(&qmgr, &source, policy());

    let (_, Next::Message(inbound)) = receiver.next(RetryState::start(&policy())).await else {
        panic!("expected a message");
    };
    let outcome = responder.respond(inbound).await.unwrap();
    assert!(matches!(outcome, Outcome::RolledBack { .. }));

    // replaying the source yields the same request again
    let (_, Next::Message(replayed)) = receiver.next(RetryState::start(&policy())).await else {
        panic!("expected the request to be redelivered");
    };
    assert_eq!(replayed.envelope.message_id, message_id);
    assert_eq!(replayed.payload, request);

    let outcome = responder.respond(replayed).await.unwrap();
    assert!(matches!(outcome, Outcome::Committed));
    drop(receiver);
    qmgr.close(source).await.unwrap();

    assert_eq!(qmgr.depth(SOURCE).await, Some(0));
    assert_eq!(qmgr.depth(REPLY).await, Some(1));
    let stats = qmgr.stats().await;
    assert_eq!(stats.commits, 1);
    assert_eq!(stats.rollbacks, 1);
    assert_eq!(stats.backed_out, 1);
}

#[tokio::test]
async fn test_scenario_square_and_restamp() {
    let qmgr = queue_manager().await;
    let request = Record {
        greeting: "hi".into(),
        message: "m".into(),
        value: 4,
        correlation_id: String::new(),
    };
    qmgr.put_request(SOURCE, codec::encode(&request).unwrap(), REPLY, None)
        .await
        .unwrap();

    responder(&qmgr).run().await.unwrap();

    let reply = codec::decode(&qmgr.browse(REPLY).await[0].payload);
    assert!(reply.warning.is_none());
    assert_eq!(reply.record.value, 16);
    assert!(!reply.record.greeting.is_empty());
    assert_ne!(reply.record.greeting, "hi");
}

#[tokio::test]
async fn test_scenario_zero_correlation() {
    let qmgr = queue_manager().await;
    let message_id = qmgr
        .put_request(
            SOURCE,
            codec::encode(&Record::new("hi", 1)).unwrap(),
            REPLY,
            Some(CorrelId::from([0u8; ID_LENGTH])),
        )
        .await
        .unwrap();

    responder(&qmgr).run().await.unwrap();

    let reply = &qmgr.browse(REPLY).await[0];
    assert_eq!(reply.envelope.correlation_id.as_bytes(), message_id.as_bytes());
}

#[tokio::test]
async fn test_scenario_idle_budget() {
    let qmgr = queue_manager().await;
    let summary = Responder::new(
        Box::new(qmgr.clone()),
        SOURCE,
        Box::new(SquareValue::new("it")),
    )
    .with_policy(RetryPolicy::new(10, Duration::from_millis(2)))
    .run()
    .await
    .unwrap();

    assert_eq!(summary, RunSummary::default());
    // one released unit of work per idle wait, nothing committed
    let stats = qmgr.stats().await;
    assert_eq!(stats.rollbacks, 10);
    assert_eq!(stats.commits, 0);
}

#[tokio::test(start_paused = true)]
async fn test_commit_resets_idle_budget() {
    let qmgr = queue_manager().await;
    let policy = RetryPolicy::new(4, Duration::from_millis(30));

    // a request arrives after two idle waits, then the queue stays idle
    let producer = qmgr.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(75)).await;
        producer
            .put_request(SOURCE, codec::encode(&Record::new("late", 3)).unwrap(), REPLY, None)
            .await
            .unwrap();
    });

    let summary = responder(&qmgr).with_policy(policy).run().await.unwrap();
    assert_eq!(summary.committed, 1);

    // two idle waits before the request, then a fresh budget of four
    let stats = qmgr.stats().await;
    assert_eq!(stats.commits, 1);
    assert_eq!(stats.rollbacks, 6);
}
