use std::fmt;

use quotabot_channels::ConversationReference;

/// Conversation identity: `<channel>|<conversation>|<service_url>|<bot>`.
///
/// Absent parts become empty segments, so two references with every part
/// blank share the key `"|||"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConversationKey(pub String);

impl ConversationKey {
    pub const SEPARATOR: &'static str = "|";

    pub fn derive(reference: &ConversationReference) -> Self {
        Self(
            [
                reference.channel_id.as_str(),
                reference.conversation_id(),
                reference.service_url.as_str(),
                reference.bot_id(),
            ]
            .join(Self::SEPARATOR),
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&ConversationReference> for ConversationKey {
    fn from(reference: &ConversationReference) -> Self {
        Self::derive(reference)
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
