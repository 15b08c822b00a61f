use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::core::types::{current_timestamp_millis, TokenRecord};

/// Wire messages pushed to feed subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum FeedMessage {
    #[serde(rename = "INITIAL_TOKENS")]
    InitialTokens {
        data: Vec<TokenRecord>,
        timestamp: i64,
    },
    #[serde(rename = "NEW_TOKEN")]
    NewToken { data: TokenRecord, timestamp: i64 },
}

impl FeedMessage {
    pub fn initial(data: Vec<TokenRecord>) -> Self {
        Self::InitialTokens {
            data,
            timestamp: current_timestamp_millis(),
        }
    }

    pub fn new_token(record: TokenRecord) -> Self {
        Self::NewToken {
            data: record,
            timestamp: current_timestamp_millis(),
        }
    }
}

/// Fan-out of new-record events to every live subscriber connection.
///
/// Each connection holds its own receiver and drains it at its own pace;
/// a slow or dead connection lags its receiver and gets dropped by its own
/// handler, never blocking the publisher or its peers.
#[derive(Debug)]
pub struct BroadcastHub {
    tx: broadcast::Sender<FeedMessage>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1000);
        Self { tx }
    }

    pub fn publish(&self, record: TokenRecord) {
        match self.tx.send(FeedMessage::new_token(record)) {
            Ok(subscriber_count) => {
                debug!(subscriber_count, "published record to feed");
            }
            Err(_) => {
                debug!("no live subscribers, record not fanned out");
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FeedMessage> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(contract: &str) -> TokenRecord {
        TokenRecord::new(contract.to_string(), "Test".to_string())
    }

    #[tokio::test]
    async fn subscribers_receive_events_published_after_joining() {
        let hub = BroadcastHub::new();
        hub.publish(record("0x1111111111111111111111111111111111111111"));

        let mut rx = hub.subscribe();
        hub.publish(record("0x2222222222222222222222222222222222222222"));

        let msg = rx.recv().await.unwrap();
        match msg {
            FeedMessage::NewToken { data, .. } => {
                assert_eq!(data.contract, "0x2222222222222222222222222222222222222222");
            }
            other => panic!("unexpected message: {other:?}"),
        }
        // The pre-subscribe publish is never replayed.
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn feed_messages_serialize_with_wire_type_tags() {
        let initial = FeedMessage::initial(vec![]);
        let json = serde_json::to_string(&initial).unwrap();
        assert!(json.contains("\"type\":\"INITIAL_TOKENS\""));

        let event = FeedMessage::new_token(record("0x1111111111111111111111111111111111111111"));
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"NEW_TOKEN\""));
        assert!(json.contains("\"contract\""));
    }
}
