use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use sqlx::{sqlite::SqliteRow, Row};
use uuid::Uuid;

use concierge_core::queue::{
    DeliveryReceipt, FulfillmentQueue, MessageAttributes, QueueError, QueueMessage, QueuedDelivery,
};

use crate::DbPool;

/// Sqlite-backed fulfillment queue. Delivery semantics: FIFO within a
/// `group_id`, at-least-once redelivery once a claim outlives the
/// visibility timeout, no deduplication across distinct `dedupe_id`s.
/// Acked messages are deleted, so row presence marks unfinished work.
pub struct SqlFulfillmentQueue {
    pool: DbPool,
    visibility_timeout: Duration,
}

impl SqlFulfillmentQueue {
    pub fn new(pool: DbPool, visibility_timeout: Duration) -> Self {
        Self { pool, visibility_timeout }
    }

    pub async fn depth(&self) -> Result<i64, QueueError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM fulfillment_queue_message")
            .fetch_one(&self.pool)
            .await
            .map_err(unavailable)?;
        Ok(row.get::<i64, _>("count"))
    }

    async fn release_expired_claims(&self) -> Result<(), QueueError> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(self.visibility_timeout)
                .unwrap_or_else(|_| chrono::Duration::zero());

        sqlx::query(
            "UPDATE fulfillment_queue_message
             SET state = 'pending', claim_token = NULL, claimed_at = NULL
             WHERE state = 'claimed' AND claimed_at <= ?",
        )
        .bind(timestamp(&cutoff))
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl FulfillmentQueue for SqlFulfillmentQueue {
    async fn send(&self, message: QueueMessage) -> Result<(), QueueError> {
        let attributes_json =
            serde_json::to_string(&message.attributes).map_err(|error| {
                QueueError::Decode(format!("attributes failed to serialize: {error}"))
            })?;

        sqlx::query(
            "INSERT INTO fulfillment_queue_message
                (id, group_id, dedupe_id, body, attributes_json, state, enqueue_seq, created_at)
             VALUES (?, ?, ?, ?, ?, 'pending',
                (SELECT IFNULL(MAX(enqueue_seq), 0) + 1 FROM fulfillment_queue_message), ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&message.group_id)
        .bind(&message.dedupe_id)
        .bind(&message.body)
        .bind(&attributes_json)
        .bind(timestamp(&Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(())
    }

    async fn receive(&self, max_messages: usize) -> Result<Vec<QueuedDelivery>, QueueError> {
        self.release_expired_claims().await?;

        // Only group heads are candidates: an earlier unfinished message in
        // the same group blocks everything behind it.
        let rows = sqlx::query(
            "SELECT m.id, m.group_id, m.dedupe_id, m.body, m.attributes_json
             FROM fulfillment_queue_message AS m
             WHERE m.state = 'pending'
               AND NOT EXISTS (
                   SELECT 1 FROM fulfillment_queue_message AS earlier
                   WHERE earlier.group_id = m.group_id
                     AND earlier.enqueue_seq < m.enqueue_seq
               )
             ORDER BY m.enqueue_seq ASC
             LIMIT ?",
        )
        .bind(max_messages as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;

        let mut deliveries = Vec::with_capacity(rows.len());
        for row in rows {
            let message_id = row.get::<String, _>("id");
            let claim_token = Uuid::new_v4().to_string();

            let claimed = sqlx::query(
                "UPDATE fulfillment_queue_message
                 SET state = 'claimed', claim_token = ?, claimed_at = ?
                 WHERE id = ? AND state = 'pending'",
            )
            .bind(&claim_token)
            .bind(timestamp(&Utc::now()))
            .bind(&message_id)
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;

            // A concurrent runner may have claimed the row between the
            // select and the update; skip it rather than double-deliver.
            if claimed.rows_affected() == 1 {
                deliveries.push(QueuedDelivery {
                    receipt: DeliveryReceipt { message_id, claim_token },
                    message: message_from_row(&row)?,
                });
            }
        }

        Ok(deliveries)
    }

    async fn acknowledge(&self, receipt: &DeliveryReceipt) -> Result<(), QueueError> {
        let deleted = sqlx::query(
            "DELETE FROM fulfillment_queue_message
             WHERE id = ? AND claim_token = ? AND state = 'claimed'",
        )
        .bind(&receipt.message_id)
        .bind(&receipt.claim_token)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        if deleted.rows_affected() == 0 {
            return Err(QueueError::StaleReceipt(receipt.message_id.clone()));
        }
        Ok(())
    }
}

fn message_from_row(row: &SqliteRow) -> Result<QueueMessage, QueueError> {
    let attributes: MessageAttributes =
        serde_json::from_str(&row.get::<String, _>("attributes_json")).map_err(|error| {
            QueueError::Decode(format!("attributes failed to deserialize: {error}"))
        })?;

    Ok(QueueMessage {
        group_id: row.get::<String, _>("group_id"),
        dedupe_id: row.get::<String, _>("dedupe_id"),
        body: row.get::<String, _>("body"),
        attributes,
    })
}

fn timestamp(at: &chrono::DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn unavailable(error: sqlx::Error) -> QueueError {
    QueueError::Unavailable(error.to_string())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use concierge_core::queue::{
        AttributeValue, FulfillmentQueue, QueueError, QueueMessage,
    };

    use crate::migrations;
    use crate::repositories::SqlFulfillmentQueue;

    async fn queue(visibility_timeout: Duration) -> SqlFulfillmentQueue {
        let pool = crate::connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        SqlFulfillmentQueue::new(pool, visibility_timeout)
    }

    fn message(group_id: &str, dedupe_id: &str) -> QueueMessage {
        let mut message = QueueMessage {
            group_id: group_id.to_string(),
            dedupe_id: dedupe_id.to_string(),
            body: format!("request {dedupe_id}"),
            attributes: Default::default(),
        };
        message
            .attributes
            .insert("cuisine".to_string(), AttributeValue::String("thai".to_string()));
        message
    }

    #[tokio::test]
    async fn only_the_group_head_is_visible() {
        let queue = queue(Duration::from_secs(60)).await;
        queue.send(message("conv-a", "d-1")).await.expect("send first");
        queue.send(message("conv-a", "d-2")).await.expect("send second");

        let deliveries = queue.receive(10).await.expect("receive");
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].message.dedupe_id, "d-1");

        // The second message only becomes visible once the first is acked.
        assert!(queue.receive(10).await.expect("receive again").is_empty());
        queue.acknowledge(&deliveries[0].receipt).await.expect("ack");

        let next = queue.receive(10).await.expect("receive after ack");
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].message.dedupe_id, "d-2");
    }

    #[tokio::test]
    async fn different_groups_interleave_freely() {
        let queue = queue(Duration::from_secs(60)).await;
        queue.send(message("conv-a", "d-1")).await.expect("send");
        queue.send(message("conv-b", "d-2")).await.expect("send");

        let deliveries = queue.receive(10).await.expect("receive");
        let dedupe_ids: Vec<&str> = deliveries
            .iter()
            .map(|delivery| delivery.message.dedupe_id.as_str())
            .collect();

        assert_eq!(dedupe_ids, vec!["d-1", "d-2"]);
    }

    #[tokio::test]
    async fn expired_claims_are_redelivered() {
        let queue = queue(Duration::ZERO).await;
        queue.send(message("conv-a", "d-1")).await.expect("send");

        let first = queue.receive(10).await.expect("receive");
        assert_eq!(first.len(), 1);

        // Claim expires immediately with a zero visibility timeout.
        let second = queue.receive(10).await.expect("receive again");
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].message.dedupe_id, "d-1");
        assert_ne!(first[0].receipt.claim_token, second[0].receipt.claim_token);
    }

    #[tokio::test]
    async fn stale_receipts_cannot_acknowledge() {
        let queue = queue(Duration::ZERO).await;
        queue.send(message("conv-a", "d-1")).await.expect("send");

        let first = queue.receive(10).await.expect("receive");
        let second = queue.receive(10).await.expect("receive again");

        let error = queue.acknowledge(&first[0].receipt).await.expect_err("stale ack");
        assert!(matches!(error, QueueError::StaleReceipt(_)));

        queue.acknowledge(&second[0].receipt).await.expect("current claim acks");
        assert_eq!(queue.depth().await.expect("depth"), 0);
    }

    #[tokio::test]
    async fn identical_payloads_with_distinct_dedupe_ids_both_deliver() {
        let queue = queue(Duration::from_secs(60)).await;
        queue.send(message("conv-a", "d-1")).await.expect("send");
        queue.send(message("conv-a", "d-2")).await.expect("send");

        let first = queue.receive(10).await.expect("receive");
        queue.acknowledge(&first[0].receipt).await.expect("ack");
        let second = queue.receive(10).await.expect("receive");

        assert_eq!(first[0].message.dedupe_id, "d-1");
        assert_eq!(second[0].message.dedupe_id, "d-2");
    }

    #[tokio::test]
    async fn attributes_survive_the_store() {
        let queue = queue(Duration::from_secs(60)).await;
        queue.send(message("conv-a", "d-1")).await.expect("send");

        let deliveries = queue.receive(10).await.expect("receive");
        assert_eq!(
            deliveries[0].message.attributes.get("cuisine"),
            Some(&AttributeValue::String("thai".to_string()))
        );
    }
}
