use std::sync::Arc;

use {anyhow::Result, async_trait::async_trait, futures::future::BoxFuture};

use crate::reference::ConversationReference;

/// A live turn inside a conversation, handed to proactive callbacks.
#[async_trait]
pub trait TurnContext: Send + Sync {
    /// The conversation this turn belongs to.
    fn reference(&self) -> &ConversationReference;

    /// Send a plain text message into the conversation.
    async fn send_text(&self, text: &str) -> Result<()>;
}

/// Logic run inside a resumed conversation.
pub type ContinueCallback =
    Box<dyn FnOnce(Arc<dyn TurnContext>) -> BoxFuture<'static, Result<()>> + Send>;

/// A messaging channel that can re-enter a conversation outside of the
/// request that created it.
#[async_trait]
pub trait ConversationChannel: Send + Sync {
    /// Channel identifier (e.g. "msteams").
    fn id(&self) -> &str;

    /// Resume `reference` and run `callback` against it.
    ///
    /// An error is scoped to this one conversation.
    async fn continue_conversation(
        &self,
        reference: &ConversationReference,
        callback: ContinueCallback,
    ) -> Result<()>;
}
