use std::{
    collections::{HashMap, HashSet},
    sync::{Mutex, MutexGuard, PoisonError},
};

use {quotabot_channels::ConversationReference, tracing::debug};

use crate::key::ConversationKey;

#[derive(Default)]
struct Registry {
    /// survey id → subscribed conversation keys
    surveys: HashMap<String, HashSet<ConversationKey>>,
    /// conversation key → last reference seen for it
    references: HashMap<ConversationKey, ConversationReference>,
}

/// In-memory registry of which conversations follow which surveys.
///
/// Every operation takes one short synchronous lock around the two maps. The
/// lock is never held across an await, so callers can share the store via
/// `Arc` between request handlers and broadcast tasks.
#[derive(Default)]
pub struct SubscriptionStore {
    inner: Mutex<Registry>,
}

impl SubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe a conversation to a survey. Returns `false` if it already was.
    ///
    /// The stored reference is replaced with `reference` either way.
    pub fn add_subscription(&self, survey_id: &str, reference: &ConversationReference) -> bool {
        let key = ConversationKey::derive(reference);
        let mut registry = self.lock();
        let added = registry
            .surveys
            .entry(survey_id.to_string())
            .or_default()
            .insert(key.clone());
        registry.references.insert(key, reference.clone());
        drop(registry);
        debug!(survey_id, added, "subscription added");
        added
    }

    /// Unsubscribe a conversation from one survey. Returns `false` if it
    /// was not subscribed.
    ///
    /// The conversation's reference is kept; other surveys may still need it.
    pub fn remove_subscription(&self, survey_id: &str, reference: &ConversationReference) -> bool {
        let key = ConversationKey::derive(reference);
        let mut registry = self.lock();
        let Some(keys) = registry.surveys.get_mut(survey_id) else {
            return false;
        };
        let removed = keys.remove(&key);
        if keys.is_empty() {
            registry.surveys.remove(survey_id);
        }
        drop(registry);
        debug!(survey_id, key = %key, removed, "subscription removed");
        removed
    }

    /// Drop a conversation from every survey and forget its reference.
    /// Returns the number of surveys it was removed from.
    pub fn remove_conversation_everywhere(&self, reference: &ConversationReference) -> usize {
        let key = ConversationKey::derive(reference);
        let mut registry = self.lock();
        let mut removed = 0;
        registry.surveys.retain(|_, keys| {
            if keys.remove(&key) {
                removed += 1;
            }
            !keys.is_empty()
        });
        registry.references.remove(&key);
        drop(registry);
        debug!(conversation = %key, removed, "conversation removed everywhere");
        removed
    }

    /// Survey ids the conversation is subscribed to, in no particular order.
    pub fn list_subscriptions_for_conversation(
        &self,
        reference: &ConversationReference,
    ) -> Vec<String> {
        let key = ConversationKey::derive(reference);
        self.lock()
            .surveys
            .iter()
            .filter(|(_, keys)| keys.contains(&key))
            .map(|(survey_id, _)| survey_id.clone())
            .collect()
    }

    /// Snapshot of the references subscribed to a survey.
    ///
    /// Keys without a stored reference are skipped.
    pub fn get_subscribers(&self, survey_id: &str) -> Vec<ConversationReference> {
        let registry = self.lock();
        let Some(keys) = registry.surveys.get(survey_id) else {
            return Vec::new();
        };
        keys.iter()
            .filter_map(|key| registry.references.get(key).cloned())
            .collect()
    }

    /// Survey ids with at least one subscriber.
    pub fn surveys(&self) -> Vec<String> {
        self.lock().surveys.keys().cloned().collect()
    }

    pub fn survey_count(&self) -> usize {
        self.lock().surveys.len()
    }

    /// Total (survey, conversation) pairs.
    pub fn subscription_count(&self) -> usize {
        self.lock().surveys.values().map(HashSet::len).sum()
    }

    #[cfg(test)]
    fn reference_count(&self) -> usize {
        self.lock().references.len()
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        quotabot_channels::{ChannelAccount, ConversationAccount},
        std::sync::Arc,
    };

    fn conversation(id: &str) -> ConversationReference {
        ConversationReference {
            channel_id: "msteams".into(),
            service_url: "https://smba.trafficmanager.net/amer/".into(),
            conversation: Some(ConversationAccount {
                id: id.into(),
                ..Default::default()
            }),
            bot: Some(ChannelAccount {
                id: "28:bot".into(),
                name: None,
            }),
            ..Default::default()
        }
    }

    fn keys(refs: &[ConversationReference]) -> Vec<ConversationKey> {
        let mut keys: Vec<_> = refs.iter().map(ConversationKey::derive).collect();
        keys.sort();
        keys
    }

    fn sorted(mut ids: Vec<String>) -> Vec<String> {
        ids.sort();
        ids
    }

    #[test]
    fn subscribe_then_get() {
        let store = SubscriptionStore::new();
        let c1 = conversation("c1");
        assert!(store.add_subscription("1001", &c1));
        assert_eq!(keys(&store.get_subscribers("1001")), keys(&[c1]));
    }

    #[test]
    fn add_is_idempotent() {
        let store = SubscriptionStore::new();
        let c1 = conversation("c1");
        assert!(store.add_subscription("1001", &c1));
        assert!(!store.add_subscription("1001", &c1));
        assert_eq!(store.get_subscribers("1001").len(), 1);
        assert_eq!(store.subscription_count(), 1);
    }

    #[test]
    fn resubscribe_keeps_latest_reference() {
        let store = SubscriptionStore::new();
        let first = conversation("c1");
        let mut second = conversation("c1");
        second.activity_id = Some("later".into());
        store.add_subscription("1001", &first);
        store.add_subscription("1001", &second);
        let subs = store.get_subscribers("1001");
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].activity_id.as_deref(), Some("later"));
    }

    #[test]
    fn unsubscribe_prunes_empty_survey() {
        let store = SubscriptionStore::new();
        let c1 = conversation("c1");
        store.add_subscription("1001", &c1);
        assert!(store.remove_subscription("1001", &c1));
        assert!(store.get_subscribers("1001").is_empty());
        assert!(store.surveys().is_empty());
        assert_eq!(store.survey_count(), 0);
        // Reference survives single-survey removal.
        assert_eq!(store.reference_count(), 1);
    }

    #[test]
    fn unsubscribe_unknown_is_noop() {
        let store = SubscriptionStore::new();
        let c1 = conversation("c1");
        assert!(!store.remove_subscription("1001", &c1));
        store.add_subscription("1001", &c1);
        assert!(!store.remove_subscription("1001", &conversation("c2")));
        assert_eq!(store.get_subscribers("1001").len(), 1);
    }

    #[test]
    fn survey_ids_are_case_sensitive() {
        let store = SubscriptionStore::new();
        store.add_subscription("abc", &conversation("c1"));
        assert!(store.get_subscribers("ABC").is_empty());
        assert_eq!(store.get_subscribers("abc").len(), 1);
    }

    #[test]
    fn remove_everywhere_counts_surveys() {
        let store = SubscriptionStore::new();
        let c1 = conversation("c1");
        store.add_subscription("A", &c1);
        store.add_subscription("B", &c1);
        assert_eq!(store.remove_conversation_everywhere(&c1), 2);
        assert!(store.list_subscriptions_for_conversation(&c1).is_empty());
        assert!(store.get_subscribers("A").is_empty());
        assert!(store.get_subscribers("B").is_empty());
        assert_eq!(store.survey_count(), 0);
        assert_eq!(store.reference_count(), 0);
        assert_eq!(store.remove_conversation_everywhere(&c1), 0);
    }

    #[test]
    fn two_surveys_two_conversations() {
        let store = SubscriptionStore::new();
        let c1 = conversation("c1");
        let c2 = conversation("c2");
        store.add_subscription("1001", &c1);
        store.add_subscription("1001", &c2);
        store.add_subscription("2002", &c1);

        assert_eq!(
            sorted(store.list_subscriptions_for_conversation(&c1)),
            vec!["1001".to_string(), "2002".to_string()]
        );
        assert_eq!(
            keys(&store.get_subscribers("1001")),
            keys(&[c1.clone(), c2.clone()])
        );

        assert_eq!(store.remove_conversation_everywhere(&c1), 2);
        assert_eq!(keys(&store.get_subscribers("1001")), keys(&[c2.clone()]));
        assert!(store.list_subscriptions_for_conversation(&c1).is_empty());
        assert_eq!(sorted(store.surveys()), vec!["1001".to_string()]);
        assert_eq!(store.subscription_count(), 1);
    }

    #[test]
    fn missing_reference_is_skipped() {
        let store = SubscriptionStore::new();
        let c1 = conversation("c1");
        store.add_subscription("1001", &c1);
        store
            .lock()
            .references
            .remove(&ConversationKey::derive(&c1));
        assert!(store.get_subscribers("1001").is_empty());
    }

    #[tokio::test]
    async fn concurrent_adds_commute() {
        let store = Arc::new(SubscriptionStore::new());
        let tasks: Vec<_> = (0..32)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store.add_subscription("1001", &conversation(&format!("c{}", i % 4)));
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(store.get_subscribers("1001").len(), 4);
    }
}
