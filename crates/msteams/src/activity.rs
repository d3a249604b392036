use {
    quotabot_channels::{ChannelAccount, ConversationAccount, ConversationReference},
    serde::{Deserialize, Serialize},
};

/// The subset of a Bot Framework activity the bot reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub service_url: String,
    #[serde(default)]
    pub from: Option<ChannelAccount>,
    #[serde(default)]
    pub recipient: Option<ChannelAccount>,
    #[serde(default)]
    pub conversation: Option<ConversationAccount>,
    #[serde(default)]
    pub members_added: Option<Vec<ChannelAccount>>,
    #[serde(default)]
    pub members_removed: Option<Vec<ChannelAccount>>,
    #[serde(default)]
    pub channel_data: Option<TeamsChannelData>,
}

/// Teams-specific `channelData` of an activity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamsChannelData {
    /// `channelDeleted`, `teamDeleted`, `channelRenamed`, ...
    #[serde(default)]
    pub event_type: Option<String>,
    /// The channel an event refers to.
    #[serde(default)]
    pub channel: Option<ChannelAccount>,
    #[serde(default)]
    pub team: Option<ChannelAccount>,
}

impl Activity {
    pub fn is_message(&self) -> bool {
        self.kind.eq_ignore_ascii_case("message")
    }

    /// Reference to the conversation this activity arrived in. The activity's
    /// recipient is the bot.
    pub fn conversation_reference(&self) -> ConversationReference {
        ConversationReference {
            channel_id: self.channel_id.clone(),
            service_url: self.service_url.clone(),
            conversation: self.conversation.clone(),
            bot: self.recipient.clone(),
            user: self.from.clone(),
            activity_id: self.id.clone(),
        }
    }

    /// True for a `conversationUpdate` announcing the bot's own removal.
    pub fn bot_removed(&self) -> bool {
        if !self.kind.eq_ignore_ascii_case("conversationUpdate") {
            return false;
        }
        let Some(bot) = self.recipient.as_ref() else {
            return false;
        };
        self.members_removed
            .as_deref()
            .unwrap_or_default()
            .iter()
            .any(|member| member.id == bot.id)
    }

    /// Reference to a conversation this `conversationUpdate` reports as
    /// deleted.
    ///
    /// `channelDeleted` names the channel in `channelData.channel`, while the
    /// activity itself arrives in the team's general channel. `teamDeleted`
    /// refers to the activity's own conversation.
    pub fn deleted_conversation(&self) -> Option<ConversationReference> {
        if !self.kind.eq_ignore_ascii_case("conversationUpdate") {
            return None;
        }
        let data = self.channel_data.as_ref()?;
        let mut reference = self.conversation_reference();
        match data.event_type.as_deref()? {
            "channelDeleted" => {
                let channel = data.channel.as_ref().filter(|c| !c.id.is_empty())?;
                let mut conversation = reference.conversation.take().unwrap_or_default();
                conversation.id = channel.id.clone();
                conversation.name = channel.name.clone();
                reference.conversation = Some(conversation);
            },
            "teamDeleted" => {},
            _ => return None,
        }
        Some(reference)
    }

    /// Message text with mentions of the bot removed.
    pub fn command_text(&self) -> String {
        strip_mentions(self.text.as_deref().unwrap_or_default())
    }
}

/// Remove `<at>Name</at>` mention tags and a leading `@Name` token.
pub fn strip_mentions(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("<at>") {
        out.push_str(&rest[..start]);
        match rest[start..].find("</at>") {
            Some(end) => rest = &rest[start + end + "</at>".len()..],
            None => {
                rest = "";
                break;
            },
        }
    }
    out.push_str(rest);

    let out = out.replace("&nbsp;", " ");
    let trimmed = out.trim();
    if trimmed.starts_with('@') {
        trimmed
            .split_whitespace()
            .skip(1)
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    fn message() -> Activity {
        serde_json::from_value(json!({
            "type": "message",
            "id": "1700000000000",
            "text": "<at>SurveyBot</at> subscribe 45104633",
            "channelId": "msteams",
            "serviceUrl": "https://smba.trafficmanager.net/amer/",
            "from": {"id": "29:user", "name": "Ada"},
            "recipient": {"id": "28:bot", "name": "SurveyBot"},
            "conversation": {"id": "19:abc@thread.tacv2", "conversationType": "channel"}
        }))
        .unwrap()
    }

    #[test]
    fn builds_reference_with_recipient_as_bot() {
        let reference = message().conversation_reference();
        assert_eq!(reference.channel_id, "msteams");
        assert_eq!(reference.conversation_id(), "19:abc@thread.tacv2");
        assert_eq!(reference.bot_id(), "28:bot");
        assert_eq!(reference.user.map(|u| u.id), Some("29:user".to_string()));
        assert_eq!(reference.activity_id.as_deref(), Some("1700000000000"));
    }

    #[test]
    fn command_text_strips_mention() {
        let activity = message();
        assert!(activity.is_message());
        assert_eq!(activity.command_text(), "subscribe 45104633");
    }

    #[test]
    fn strips_plain_and_html_mentions() {
        assert_eq!(strip_mentions("@SurveyBot status 1"), "status 1");
        assert_eq!(strip_mentions("<at>Survey Bot</at>&nbsp;list"), "list");
        assert_eq!(strip_mentions("  help  "), "help");
        assert_eq!(strip_mentions("hi <at>unterminated"), "hi");
        assert_eq!(strip_mentions(""), "");
    }

    #[test]
    fn detects_bot_removal() {
        let mut activity: Activity = serde_json::from_value(json!({
            "type": "conversationUpdate",
            "recipient": {"id": "28:bot"},
            "membersRemoved": [{"id": "29:someone"}, {"id": "28:bot"}]
        }))
        .unwrap();
        assert!(activity.bot_removed());

        activity.members_removed = Some(vec![ChannelAccount {
            id: "29:someone".into(),
            name: None,
        }]);
        assert!(!activity.bot_removed());
        assert!(!message().bot_removed());
    }

    #[test]
    fn channel_deletion_targets_the_deleted_channel() {
        let activity: Activity = serde_json::from_value(json!({
            "type": "conversationUpdate",
            "channelId": "msteams",
            "serviceUrl": "https://smba.trafficmanager.net/amer/",
            "recipient": {"id": "28:bot"},
            "conversation": {"id": "19:general@thread.tacv2", "conversationType": "channel"},
            "channelData": {
                "eventType": "channelDeleted",
                "channel": {"id": "19:chan@thread.tacv2", "name": "Surveys"},
                "team": {"id": "19:general@thread.tacv2"}
            }
        }))
        .unwrap();
        let reference = activity.deleted_conversation().unwrap();
        assert_eq!(reference.conversation_id(), "19:chan@thread.tacv2");
        assert_eq!(reference.service_url, "https://smba.trafficmanager.net/amer/");
        assert_eq!(reference.bot_id(), "28:bot");
        assert_eq!(
            reference.conversation.and_then(|c| c.conversation_type).as_deref(),
            Some("channel")
        );
    }

    #[test]
    fn team_deletion_targets_own_conversation() {
        let activity: Activity = serde_json::from_value(json!({
            "type": "conversationUpdate",
            "conversation": {"id": "19:general@thread.tacv2"},
            "channelData": {"eventType": "teamDeleted", "team": {"id": "19:general@thread.tacv2"}}
        }))
        .unwrap();
        assert_eq!(
            activity.deleted_conversation().unwrap().conversation_id(),
            "19:general@thread.tacv2"
        );
    }

    #[test]
    fn other_updates_delete_nothing() {
        let renamed: Activity = serde_json::from_value(json!({
            "type": "conversationUpdate",
            "channelData": {"eventType": "channelRenamed", "channel": {"id": "19:chan"}}
        }))
        .unwrap();
        assert!(renamed.deleted_conversation().is_none());

        let missing_channel: Activity = serde_json::from_value(json!({
            "type": "conversationUpdate",
            "channelData": {"eventType": "channelDeleted"}
        }))
        .unwrap();
        assert!(missing_channel.deleted_conversation().is_none());

        let mut text = message();
        text.channel_data = Some(TeamsChannelData {
            event_type: Some("channelDeleted".into()),
            channel: Some(ChannelAccount {
                id: "19:chan".into(),
                name: None,
            }),
            team: None,
        });
        assert!(text.deleted_conversation().is_none());
    }

    #[test]
    fn tolerates_null_members() {
        let activity: Activity = serde_json::from_value(json!({
            "type": "conversationUpdate",
            "recipient": {"id": "28:bot"},
            "membersRemoved": null
        }))
        .unwrap();
        assert!(!activity.bot_removed());
    }
}
