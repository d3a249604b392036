//! Fakes shared by the gateway tests.

use std::sync::{Arc, Mutex};

use {
    anyhow::Result,
    async_trait::async_trait,
    quotabot_channels::{
        ContinueCallback, ConversationAccount, ConversationChannel, ConversationReference,
        TurnContext,
    },
    quotabot_purespectrum::{ProviderError, Quota, Survey, SurveyProvider},
};

pub fn conversation(id: &str) -> ConversationReference {
    ConversationReference {
        channel_id: "msteams".into(),
        service_url: "https://smba.example.test/".into(),
        conversation: Some(ConversationAccount {
            id: id.into(),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn survey(id: &str, status: &str, completes: u64, target: u64) -> Survey {
    Survey {
        id: id.into(),
        title: format!("Survey {id}"),
        status: status.into(),
        completes,
        target,
        ..Default::default()
    }
}

/// In-memory provider. `error`, when set, fails every call.
#[derive(Default)]
pub struct FakeProvider {
    pub surveys: Vec<Survey>,
    pub quotas: Vec<Quota>,
    pub error: Option<fn() -> ProviderError>,
    pub list_calls: Mutex<usize>,
}

impl FakeProvider {
    fn check(&self) -> quotabot_purespectrum::Result<()> {
        match self.error {
            Some(error) => Err(error()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SurveyProvider for FakeProvider {
    async fn check_auth(&self) -> quotabot_purespectrum::Result<()> {
        self.check()
    }

    async fn fetch_survey(&self, survey_id: &str) -> quotabot_purespectrum::Result<Option<Survey>> {
        self.check()?;
        Ok(self.surveys.iter().find(|s| s.id == survey_id).cloned())
    }

    async fn fetch_quotas(&self, _survey_id: &str) -> quotabot_purespectrum::Result<Vec<Quota>> {
        self.check()?;
        Ok(self.quotas.clone())
    }

    async fn list_surveys(&self) -> quotabot_purespectrum::Result<Vec<Survey>> {
        *self.list_calls.lock().unwrap() += 1;
        self.check()?;
        Ok(self.surveys.clone())
    }
}

struct RecordingTurn {
    reference: ConversationReference,
    sent: Arc<Mutex<Vec<(String, String)>>>,
}

#[async_trait]
impl TurnContext for RecordingTurn {
    fn reference(&self) -> &ConversationReference {
        &self.reference
    }

    async fn send_text(&self, text: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((self.reference.conversation_id().to_string(), text.to_string()));
        Ok(())
    }
}

/// Channel that records `(conversation id, text)` pairs instead of sending.
#[derive(Default)]
pub struct RecordingChannel {
    sent: Arc<Mutex<Vec<(String, String)>>>,
    failing: Vec<String>,
}

impl RecordingChannel {
    pub fn failing(ids: &[&str]) -> Self {
        Self {
            failing: ids.iter().map(|id| id.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConversationChannel for RecordingChannel {
    fn id(&self) -> &str {
        "msteams"
    }

    async fn continue_conversation(
        &self,
        reference: &ConversationReference,
        callback: ContinueCallback,
    ) -> Result<()> {
        if self.failing.iter().any(|id| id == reference.conversation_id()) {
            anyhow::bail!("conversation unavailable");
        }
        let turn: Arc<dyn TurnContext> = Arc::new(RecordingTurn {
            reference: reference.clone(),
            sent: Arc::clone(&self.sent),
        });
        callback(turn).await
    }
}
