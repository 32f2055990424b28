//! Lease scripts against a live Redis.
//!
//! Set `TASKHUB_TEST_REDIS_URL` (e.g. `redis://127.0.0.1:6379/15`) to run;
//! without it every test returns early.

#![cfg(feature = "redis-backend")]

use std::time::Duration;

use serde_json::json;

use taskhub_core::traits::queue::{EnqueueOutcome, JobQueue, NewJob};
use taskhub_queue::keys::QueueKeys;
use taskhub_queue::redis::{RedisClient, RedisJobQueue};

const QUEUE: &str = "report-generation";
const SHORT_LEASE: Duration = Duration::from_millis(50);

struct Fixture {
    client: RedisClient,
    queue: RedisJobQueue,
    keys: QueueKeys,
}

impl Fixture {
    async fn connect() -> Option<Self> {
        let url = std::env::var("TASKHUB_TEST_REDIS_URL").ok()?;
        let client = RedisClient::connect(&url).await.expect("connect to test Redis");
        let prefix = format!("taskhub-test:{}:", uuid::Uuid::new_v4().simple());
        Some(Self {
            queue: RedisJobQueue::new(client.clone(), &prefix, QUEUE, 60),
            keys: QueueKeys::new(&prefix, QUEUE),
            client,
        })
    }

    async fn cleanup(&self, job_ids: &[&str]) {
        let mut conn = self.client.conn_mut();
        let mut del = redis::cmd("DEL");
        del.arg(self.keys.waiting())
            .arg(self.keys.active())
            .arg(self.keys.failed());
        for id in job_ids {
            del.arg(self.keys.job(id)).arg(self.keys.lock(id));
        }
        let _: i64 = del.query_async(&mut conn).await.expect("cleanup");
    }
}

fn job(id: &str, max_attempts: u32) -> NewJob {
    NewJob {
        id: id.to_string(),
        name: "generate-report".to_string(),
        payload: json!({ "reportId": id }),
        max_attempts,
    }
}

#[tokio::test]
async fn test_stalled_job_is_retried_then_failed() {
    let Some(fx) = Fixture::connect().await else {
        return;
    };
    assert_eq!(
        fx.queue.enqueue(job("r1", 2)).await.expect("enqueue"),
        EnqueueOutcome::Enqueued
    );

    let first = fx.queue.reserve("w1", SHORT_LEASE).await.expect("reserve").expect("job");
    assert_eq!(first.attempt, 1);
    tokio::time::sleep(SHORT_LEASE * 3).await;
    let swept = fx.queue.recover_stalled().await.expect("recover");
    assert_eq!(swept.requeued, 1);
    assert!(swept.exhausted.is_empty());

    let second = fx.queue.reserve("w2", SHORT_LEASE).await.expect("reserve").expect("retry");
    assert_eq!(second.attempt, 2);
    tokio::time::sleep(SHORT_LEASE * 3).await;
    let swept = fx.queue.recover_stalled().await.expect("recover");
    assert_eq!(swept.requeued, 0);
    assert_eq!(swept.exhausted.len(), 1);
    let dead = &swept.exhausted[0];
    assert_eq!(dead.job_id, "r1");
    assert_eq!((dead.attempt, dead.max_attempts), (2, 2));
    assert_eq!(dead.payload, json!({ "reportId": "r1" }));

    assert!(fx.queue.reserve("w3", SHORT_LEASE).await.expect("reserve").is_none());
    let stats = fx.queue.stats().await.expect("stats");
    assert_eq!((stats.waiting, stats.active, stats.failed), (0, 0, 1));

    let mut conn = fx.client.conn_mut();
    let last_error: Option<String> = redis::cmd("HGET")
        .arg(fx.keys.job("r1"))
        .arg("last_error")
        .query_async(&mut conn)
        .await
        .expect("hget");
    assert_eq!(
        last_error.as_deref(),
        Some("Job stalled: lease expired on attempt 2 of 2")
    );

    fx.cleanup(&["r1"]).await;
}

#[tokio::test]
async fn test_held_lease_survives_the_sweep() {
    let Some(fx) = Fixture::connect().await else {
        return;
    };
    fx.queue.enqueue(job("r2", 1)).await.expect("enqueue");
    let held = fx
        .queue
        .reserve("w1", Duration::from_secs(30))
        .await
        .expect("reserve")
        .expect("job");

    let swept = fx.queue.recover_stalled().await.expect("recover");
    assert_eq!(swept.requeued, 0);
    assert!(swept.exhausted.is_empty());
    fx.queue.complete(&held).await.expect("complete");
    assert_eq!(fx.queue.stats().await.expect("stats").active, 0);

    fx.cleanup(&["r2"]).await;
}
