use std::sync::Arc;

use {
    anyhow::Result,
    futures::future::{BoxFuture, join_all},
    quotabot_channels::{ContinueCallback, ConversationChannel, TurnContext},
    tracing::{debug, info, warn},
};

use crate::{key::ConversationKey, store::SubscriptionStore};

/// Outcome of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Conversations a delivery was attempted for.
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Pushes messages to every subscriber of a survey.
///
/// Stateless between calls: each broadcast works on a snapshot of the
/// subscribers taken when it starts.
#[derive(Clone)]
pub struct Broadcaster {
    store: Arc<SubscriptionStore>,
    channel: Arc<dyn ConversationChannel>,
}

impl Broadcaster {
    pub fn new(store: Arc<SubscriptionStore>, channel: Arc<dyn ConversationChannel>) -> Self {
        Self { store, channel }
    }

    pub fn store(&self) -> &Arc<SubscriptionStore> {
        &self.store
    }

    /// Send `message` to every conversation subscribed to `survey_id`.
    ///
    /// One task is spawned per subscriber and all of them are awaited, so a
    /// failing or panicking delivery never stops the others.
    pub async fn broadcast(&self, survey_id: &str, message: &str) -> BroadcastReport {
        let subscribers = self.store.get_subscribers(survey_id);
        if subscribers.is_empty() {
            debug!(survey_id, "no subscribers, skipping broadcast");
            return BroadcastReport::default();
        }

        let message: Arc<str> = Arc::from(message);
        let deliveries: Vec<_> = subscribers
            .into_iter()
            .map(|reference| {
                let channel = Arc::clone(&self.channel);
                let message = Arc::clone(&message);
                tokio::spawn(async move {
                    let key = ConversationKey::derive(&reference);
                    let callback: ContinueCallback = Box::new(
                        move |turn: Arc<dyn TurnContext>| -> BoxFuture<'static, Result<()>> {
                            Box::pin(async move { turn.send_text(&message).await })
                        },
                    );
                    match channel.continue_conversation(&reference, callback).await {
                        Ok(()) => true,
                        Err(e) => {
                            warn!(conversation = %key, error = %e, "proactive delivery failed");
                            false
                        },
                    }
                })
            })
            .collect();

        let attempted = deliveries.len();
        let mut delivered = 0;
        for outcome in join_all(deliveries).await {
            match outcome {
                Ok(true) => delivered += 1,
                Ok(false) => {},
                Err(e) => warn!(error = %e, "delivery task aborted"),
            }
        }

        let report = BroadcastReport {
            attempted,
            delivered,
            failed: attempted - delivered,
        };
        info!(
            survey_id,
            attempted = report.attempted,
            delivered = report.delivered,
            failed = report.failed,
            "broadcast finished"
        );
        report
    }
}
