//! Text command handling.

use std::sync::Arc;

use {
    quotabot_channels::ConversationReference,
    quotabot_purespectrum::{ProviderError, SurveyProvider},
    quotabot_subscriptions::{Broadcaster, SubscriptionStore},
    tracing::{info, warn},
};

use crate::format::{format_live_surveys, format_quotas, format_survey_status};

pub const HELP_TEXT: &str = "Commands:
• subscribe <surveyId> - Subscribe to survey updates
• unsubscribe <surveyId> - Unsubscribe from survey
• list - Show your subscriptions
• status <surveyId> - Show survey status and basic metrics
• quotas <surveyId> - Show detailed quota information
• live - Show all active surveys
• update <surveyId> key=value - Manual update (e.g., update 12345 status=live completes=50)
• help - Show this help";

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Empty,
    Help,
    Subscribe(String),
    Unsubscribe(String),
    List,
    Status(String),
    Quotas(String),
    Live,
    Update {
        survey_id: String,
        fields: Vec<(String, String)>,
    },
    /// Known verb with a missing argument; holds the usage line.
    Usage(&'static str),
    Unknown(String),
}

impl Command {
    /// Parse a command. Verbs are case-insensitive, arguments keep their case.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        let mut words = text.split_whitespace();
        let Some(verb) = words.next() else {
            return Self::Empty;
        };
        let survey_id = words.next().map(str::to_string);

        match verb.to_lowercase().as_str() {
            "help" => Self::Help,
            "list" => Self::List,
            "live" | "surveys" => Self::Live,
            "subscribe" => survey_id.map_or(Self::Usage("subscribe <surveyId>"), Self::Subscribe),
            "unsubscribe" => {
                survey_id.map_or(Self::Usage("unsubscribe <surveyId>"), Self::Unsubscribe)
            },
            "status" => survey_id.map_or(Self::Usage("status <surveyId>"), Self::Status),
            "quotas" => survey_id.map_or(Self::Usage("quotas <surveyId>"), Self::Quotas),
            "update" => match survey_id {
                Some(survey_id) => Self::Update {
                    survey_id,
                    fields: words
                        .filter_map(|pair| pair.split_once('='))
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                },
                None => Self::Usage("update <surveyId> key=value ..."),
            },
            _ => Self::Unknown(text.to_string()),
        }
    }
}

/// Text of a manual update pushed to subscribers.
pub fn manual_update_message(survey_id: &str, fields: &[(String, String)]) -> String {
    if fields.is_empty() {
        return format!("Manual update for Survey {survey_id}");
    }
    let pairs: Vec<String> = fields.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("Manual update for Survey {survey_id}: {}", pairs.join(" | "))
}

fn provider_error_text(context: &str, error: &ProviderError) -> String {
    match error {
        ProviderError::NotConfigured => "❌ PureSpectrum access token not configured. Set \
                                         PURESPECTRUM_TOKEN or run `quotabot token set`."
            .into(),
        ProviderError::Unauthorized => "❌ Authentication failed. Please check your \
                                        credentials or update your auth token."
            .into(),
        other => format!("❌ Error fetching {context}: {other}"),
    }
}

/// Answers chat commands on behalf of one conversation.
pub struct SurveyBot {
    broadcaster: Broadcaster,
    provider: Arc<dyn SurveyProvider>,
}

impl SurveyBot {
    pub fn new(broadcaster: Broadcaster, provider: Arc<dyn SurveyProvider>) -> Self {
        Self {
            broadcaster,
            provider,
        }
    }

    fn store(&self) -> &SubscriptionStore {
        self.broadcaster.store()
    }

    /// Run `text` as a command from `reference` and return the reply.
    ///
    /// Never fails: every error becomes a reply string.
    pub async fn handle(&self, text: &str, reference: &ConversationReference) -> String {
        match Command::parse(text) {
            Command::Empty => "Say 'help' to see available commands.".into(),
            Command::Help => HELP_TEXT.into(),
            Command::Usage(usage) => format!("Usage: {usage}"),
            Command::Unknown(_) => "Unknown command. Say 'help' for options.".into(),
            Command::Subscribe(survey_id) => {
                self.store().add_subscription(&survey_id, reference);
                info!(
                    survey_id = %survey_id,
                    conversation = reference.conversation_id(),
                    "subscribed"
                );
                format!("Subscribed this conversation to survey {survey_id}.")
            },
            Command::Unsubscribe(survey_id) => {
                self.store().remove_subscription(&survey_id, reference);
                info!(
                    survey_id = %survey_id,
                    conversation = reference.conversation_id(),
                    "unsubscribed"
                );
                format!("Unsubscribed this conversation from survey {survey_id}.")
            },
            Command::List => {
                let mut survey_ids = self.store().list_subscriptions_for_conversation(reference);
                if survey_ids.is_empty() {
                    return "No subscriptions for this conversation.".into();
                }
                survey_ids.sort();
                format!("Subscribed surveys: {}", survey_ids.join(", "))
            },
            Command::Status(survey_id) => self.status(&survey_id).await,
            Command::Quotas(survey_id) => self.quotas(&survey_id).await,
            Command::Live => match self.provider.list_surveys().await {
                Ok(surveys) => format_live_surveys(&surveys),
                Err(e) => {
                    warn!(error = %e, "failed to list surveys");
                    provider_error_text("surveys", &e)
                },
            },
            Command::Update { survey_id, fields } => {
                let message = manual_update_message(&survey_id, &fields);
                let report = self.broadcaster.broadcast(&survey_id, &message).await;
                match (report.attempted, report.failed) {
                    (0, _) => format!("No subscribers found for survey {survey_id}"),
                    (n, 0) => format!("Update sent to {n} subscribers of survey {survey_id}"),
                    (n, failed) => format!(
                        "Update sent to {n} subscribers of survey {survey_id} ({failed} failed)"
                    ),
                }
            },
        }
    }

    async fn status(&self, survey_id: &str) -> String {
        match self.provider.fetch_survey(survey_id).await {
            Ok(Some(survey)) => format_survey_status(&survey),
            Ok(None) => format!("❌ Survey {survey_id} not found"),
            Err(e) => {
                warn!(survey_id, error = %e, "failed to fetch survey");
                provider_error_text("survey status", &e)
            },
        }
    }

    async fn quotas(&self, survey_id: &str) -> String {
        match self.provider.fetch_quotas(survey_id).await {
            Ok(quotas) if !quotas.is_empty() => format_quotas(survey_id, &quotas),
            Ok(_) | Err(ProviderError::NotFound(_)) => {
                format!("❌ No quota data found for survey {survey_id}")
            },
            Err(e) => {
                warn!(survey_id, error = %e, "failed to fetch quotas");
                provider_error_text("quotas", &e)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::testing::{FakeProvider, RecordingChannel, conversation, survey},
        quotabot_purespectrum::Quota,
    };

    fn bot(provider: FakeProvider, channel: Arc<RecordingChannel>) -> SurveyBot {
        let store = Arc::new(SubscriptionStore::new());
        SurveyBot::new(Broadcaster::new(store, channel), Arc::new(provider))
    }

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("  "), Command::Empty);
        assert_eq!(Command::parse("HELP"), Command::Help);
        assert_eq!(
            Command::parse("Subscribe AbC-1"),
            Command::Subscribe("AbC-1".into())
        );
        assert_eq!(
            Command::parse("unsubscribe"),
            Command::Usage("unsubscribe <surveyId>")
        );
        assert_eq!(Command::parse("surveys"), Command::Live);
        assert_eq!(Command::parse("quotas 9"), Command::Quotas("9".into()));
        assert_eq!(
            Command::parse("update 12345 status=live completes=50 junk"),
            Command::Update {
                survey_id: "12345".into(),
                fields: vec![
                    ("status".into(), "live".into()),
                    ("completes".into(), "50".into()),
                ],
            }
        );
        assert_eq!(
            Command::parse("dance now"),
            Command::Unknown("dance now".into())
        );
    }

    #[test]
    fn trailing_words_after_survey_id_are_ignored() {
        assert_eq!(
            Command::parse("subscribe 1001 please now"),
            Command::Subscribe("1001".into())
        );
        assert_eq!(
            Command::parse("UNSUBSCRIBE 1001 extra"),
            Command::Unsubscribe("1001".into())
        );
        assert_eq!(
            Command::parse("status 1001\tand more"),
            Command::Status("1001".into())
        );
    }

    #[test]
    fn update_message_text() {
        assert_eq!(
            manual_update_message("1", &[("status".into(), "live".into()), ("n".into(), "2".into())]),
            "Manual update for Survey 1: status=live | n=2"
        );
        assert_eq!(manual_update_message("1", &[]), "Manual update for Survey 1");
    }

    #[tokio::test]
    async fn subscribe_list_unsubscribe() {
        let bot = bot(FakeProvider::default(), Arc::new(RecordingChannel::default()));
        let c1 = conversation("c1");

        assert_eq!(
            bot.handle("subscribe 2002", &c1).await,
            "Subscribed this conversation to survey 2002."
        );
        bot.handle("subscribe 1001", &c1).await;
        assert_eq!(
            bot.handle("list", &c1).await,
            "Subscribed surveys: 1001, 2002"
        );
        assert_eq!(
            bot.handle("unsubscribe 2002", &c1).await,
            "Unsubscribed this conversation from survey 2002."
        );
        assert_eq!(bot.handle("list", &c1).await, "Subscribed surveys: 1001");
        assert_eq!(
            bot.handle("list", &conversation("c2")).await,
            "No subscriptions for this conversation."
        );
    }

    #[tokio::test]
    async fn malformed_and_unknown() {
        let bot = bot(FakeProvider::default(), Arc::new(RecordingChannel::default()));
        let c1 = conversation("c1");
        assert_eq!(bot.handle("subscribe", &c1).await, "Usage: subscribe <surveyId>");
        assert_eq!(
            bot.handle("", &c1).await,
            "Say 'help' to see available commands."
        );
        assert_eq!(
            bot.handle("frobnicate", &c1).await,
            "Unknown command. Say 'help' for options."
        );
        assert_eq!(bot.handle("help", &c1).await, HELP_TEXT);
    }

    #[tokio::test]
    async fn update_broadcasts_to_subscribers() {
        let channel = Arc::new(RecordingChannel::default());
        let bot = bot(FakeProvider::default(), Arc::clone(&channel));
        let (c1, c2) = (conversation("c1"), conversation("c2"));

        assert_eq!(
            bot.handle("update 1001 status=live", &c1).await,
            "No subscribers found for survey 1001"
        );
        assert!(channel.sent().is_empty());

        bot.handle("subscribe 1001", &c1).await;
        bot.handle("subscribe 1001", &c2).await;
        assert_eq!(
            bot.handle("update 1001 status=live completes=50", &c1).await,
            "Update sent to 2 subscribers of survey 1001"
        );
        let sent = channel.sent();
        assert_eq!(sent.len(), 2);
        assert!(
            sent.iter()
                .all(|(_, text)| text == "Manual update for Survey 1001: status=live | completes=50")
        );
    }

    #[tokio::test]
    async fn update_reports_failures() {
        let channel = Arc::new(RecordingChannel::failing(&["c2"]));
        let bot = bot(FakeProvider::default(), Arc::clone(&channel));
        for id in ["c1", "c2", "c3"] {
            bot.handle("subscribe 1001", &conversation(id)).await;
        }
        assert_eq!(
            bot.handle("update 1001 x=1", &conversation("c1")).await,
            "Update sent to 3 subscribers of survey 1001 (1 failed)"
        );
    }

    #[tokio::test]
    async fn status_and_quotas() {
        let provider = FakeProvider {
            surveys: vec![survey("45104633", "Active", 50, 200)],
            quotas: vec![Quota {
                quota_title: Some("Total".into()),
                achieved: 50,
                required_count: 200,
                ..Default::default()
            }],
            ..Default::default()
        };
        let bot = bot(provider, Arc::new(RecordingChannel::default()));
        let c1 = conversation("c1");

        let status = bot.handle("status 45104633", &c1).await;
        assert!(status.starts_with("**Survey 45104633 Status**"));
        assert_eq!(
            bot.handle("status 1", &c1).await,
            "❌ Survey 1 not found"
        );

        let quotas = bot.handle("quotas 45104633", &c1).await;
        assert!(quotas.contains("**Total**"));

        let live = bot.handle("live", &c1).await;
        assert!(live.starts_with("**Found 1 Active Surveys**"));
    }

    #[tokio::test]
    async fn provider_errors_become_messages() {
        let bot = bot(
            FakeProvider {
                error: Some(|| ProviderError::Unauthorized),
                ..Default::default()
            },
            Arc::new(RecordingChannel::default()),
        );
        let c1 = conversation("c1");
        assert!(
            bot.handle("status 1", &c1)
                .await
                .starts_with("❌ Authentication failed")
        );

        let bot = bot_with_error(|| ProviderError::NotFound("9".into()));
        assert_eq!(
            bot.handle("quotas 9", &c1).await,
            "❌ No quota data found for survey 9"
        );

        let bot = bot_with_error(|| ProviderError::Status {
            status: 500,
            body: "boom".into(),
        });
        assert_eq!(
            bot.handle("live", &c1).await,
            "❌ Error fetching surveys: PureSpectrum request failed with status 500: boom"
        );

        let bot = bot_with_error(|| ProviderError::NotConfigured);
        assert!(bot.handle("quotas 9", &c1).await.contains("PURESPECTRUM_TOKEN"));
    }

    fn bot_with_error(error: fn() -> ProviderError) -> SurveyBot {
        bot(
            FakeProvider {
                error: Some(error),
                ..Default::default()
            },
            Arc::new(RecordingChannel::default()),
        )
    }
}
