//! Session-scoped conversation state and the submit/reply cycle.
//!
//! A [`Conversation`] is an append-only list of [`Message`]s plus a pending
//! flag. Each accepted submission produces one user message and, once the
//! responder finishes, exactly one reply. While a reply is outstanding further
//! submissions are rejected rather than queued.

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::agent::Responder;
use crate::prompts::APOLOGY_REPLY;

/// A single message in the conversation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    id: Uuid,
    content: String,
    is_user: bool,
    timestamp: DateTime<Utc>,
}

impl Message {
    fn new(content: String, is_user: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            content,
            is_user,
            timestamp: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_user(&self) -> bool {
        self.is_user
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Why a submission was not accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("nothing to send")]
    Empty,
    #[error("still waiting on the previous reply")]
    Busy,
}

/// How a reply failed to arrive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ExchangeFailure {
    #[error("responder panicked")]
    Panicked,
    #[error("responder task was aborted")]
    Aborted,
}

impl From<tokio::task::JoinError> for ExchangeFailure {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_panic() {
            ExchangeFailure::Panicked
        } else {
            ExchangeFailure::Aborted
        }
    }
}

/// Ticket for one accepted submission that is waiting on its reply.
///
/// Not `Clone`: handing it back to [`Conversation::complete`] consumes it, so
/// an exchange is answered at most once.
#[derive(Debug)]
pub struct Exchange {
    id: Uuid,
    prompt: String,
}

impl Exchange {
    /// Id of the user message that opened the exchange
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}

/// Result of [`Conversation::submit`]
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Replied(Message),
    Rejected(RejectReason),
}

#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    /// Id of the user message whose reply is outstanding
    pending: Option<Uuid>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// True while a reply is outstanding
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Most recent non-user message
    pub fn last_reply(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| !m.is_user)
    }

    /// Send `text` and wait for its reply.
    ///
    /// Empty input and input submitted while a reply is outstanding are
    /// rejected without touching the conversation.
    pub async fn submit<R>(&mut self, text: &str, responder: &R) -> Submission
    where
        R: Responder + ?Sized,
    {
        let exchange = match self.begin(text) {
            Ok(exchange) => exchange,
            Err(reason) => return Submission::Rejected(reason),
        };

        let outcome = AssertUnwindSafe(responder.respond(exchange.prompt()))
            .catch_unwind()
            .await
            .map_err(|_| ExchangeFailure::Panicked);

        // `&mut self` is held across the await, so the exchange opened above
        // is still the outstanding one.
        Submission::Replied(self.finish(exchange, outcome).clone())
    }

    /// First half of a submission: validate, append the user message and mark
    /// the conversation pending.
    pub fn begin(&mut self, text: &str) -> Result<Exchange, RejectReason> {
        if text.trim().is_empty() {
            return Err(RejectReason::Empty);
        }
        if self.pending.is_some() {
            debug!("submission rejected while a reply is pending");
            return Err(RejectReason::Busy);
        }

        let message = Message::new(text.to_string(), true);
        let exchange = Exchange {
            id: message.id,
            prompt: message.content.clone(),
        };
        info!(message_id = %message.id, chars = text.chars().count(), "user message submitted");

        self.messages.push(message);
        self.pending = Some(exchange.id);
        Ok(exchange)
    }

    /// Second half of a submission: append the reply (or the apology when the
    /// responder never produced one) and clear the pending flag.
    ///
    /// Returns `None` and leaves the conversation untouched if `exchange` is
    /// not the one currently outstanding.
    pub fn complete(
        &mut self,
        exchange: Exchange,
        outcome: Result<String, ExchangeFailure>,
    ) -> Option<&Message> {
        if self.pending != Some(exchange.id) {
            warn!(exchange = %exchange.id, "ignoring reply for an exchange that is not pending");
            return None;
        }
        Some(self.finish(exchange, outcome))
    }

    fn finish(&mut self, exchange: Exchange, outcome: Result<String, ExchangeFailure>) -> &Message {
        let content = match outcome {
            Ok(reply) => reply,
            Err(failure) => {
                warn!(exchange = %exchange.id, %failure, "reply lost, appending apology");
                APOLOGY_REPLY.to_string()
            }
        };

        let reply = Message::new(content, false);
        info!(exchange = %exchange.id, message_id = %reply.id, "reply appended");
        self.messages.push(reply);
        self.pending = None;
        &self.messages[self.messages.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        reply: &'static str,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(reply: &'static str) -> Self {
            Self {
                reply,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Responder for Scripted {
        async fn respond(&self, _user_text: &str) -> String {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.to_string()
        }
    }

    struct Panicking;

    #[async_trait]
    impl Responder for Panicking {
        async fn respond(&self, _user_text: &str) -> String {
            panic!("responder blew up")
        }
    }

    #[tokio::test]
    async fn hello_welcome_scenario() {
        let mut conversation = Conversation::new();
        assert!(!conversation.is_pending());

        let result = conversation.submit("Hello", &Scripted::new("Welcome.")).await;

        let messages = conversation.messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].is_user());
        assert_eq!(messages[0].content(), "Hello");
        assert!(!messages[1].is_user());
        assert_eq!(messages[1].content(), "Welcome.");
        assert!(messages[0].timestamp() <= messages[1].timestamp());
        assert_ne!(messages[0].id(), messages[1].id());
        assert!(!conversation.is_pending());
        assert_eq!(result, Submission::Replied(messages[1].clone()));
    }

    #[tokio::test]
    async fn blank_input_changes_nothing() {
        let responder = Scripted::new("unused");
        let mut conversation = Conversation::new();

        for input in ["", "   ", "\n\t "] {
            let result = conversation.submit(input, &responder).await;
            assert_eq!(result, Submission::Rejected(RejectReason::Empty));
        }

        assert!(conversation.is_empty());
        assert!(!conversation.is_pending());
        assert_eq!(responder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn content_is_kept_verbatim() {
        let mut conversation = Conversation::new();
        conversation.submit("  padded question  ", &Scripted::new("X")).await;
        assert_eq!(conversation.messages()[0].content(), "  padded question  ");
        assert_eq!(conversation.messages()[1].content(), "X");
    }

    #[tokio::test]
    async fn every_submission_gets_exactly_one_reply() {
        let mut conversation = Conversation::new();
        let responder = Scripted::new("reply");
        for text in ["one", "two", "three"] {
            conversation.submit(text, &responder).await;
        }

        let flags: Vec<bool> = conversation.messages().iter().map(Message::is_user).collect();
        assert_eq!(flags, vec![true, false, true, false, true, false]);
        assert_eq!(responder.calls.load(Ordering::SeqCst), 3);
        assert!(!conversation.is_pending());
    }

    #[tokio::test]
    async fn panicking_responder_yields_the_apology() {
        let mut conversation = Conversation::new();
        let result = conversation.submit("Hello", &Panicking).await;

        assert!(matches!(result, Submission::Replied(ref m) if m.content() == APOLOGY_REPLY));
        assert_eq!(conversation.len(), 2);
        assert!(!conversation.is_pending());
    }

    #[test]
    fn begin_rejects_while_pending() {
        let mut conversation = Conversation::new();
        let exchange = conversation.begin("first").unwrap();
        assert!(conversation.is_pending());

        assert_eq!(conversation.begin("second").unwrap_err(), RejectReason::Busy);
        assert_eq!(conversation.len(), 1);

        conversation.complete(exchange, Ok("answer".to_string())).unwrap();
        assert!(!conversation.is_pending());
        assert!(conversation.begin("second").is_ok());
    }

    #[test]
    fn stale_exchange_is_ignored() {
        let mut first = Conversation::new();
        let foreign = first.begin("elsewhere").unwrap();

        let mut conversation = Conversation::new();
        let _open = conversation.begin("here").unwrap();

        assert!(conversation.complete(foreign, Ok("wrong".to_string())).is_none());
        assert_eq!(conversation.len(), 1);
        assert!(conversation.is_pending());
    }

    #[test]
    fn aborted_exchange_yields_the_apology() {
        let mut conversation = Conversation::new();
        let exchange = conversation.begin("Hello").unwrap();
        let reply = conversation
            .complete(exchange, Err(ExchangeFailure::Aborted))
            .unwrap();
        assert_eq!(reply.content(), APOLOGY_REPLY);
        assert_eq!(conversation.last_reply().map(Message::content), Some(APOLOGY_REPLY));
    }

    #[test]
    fn messages_serialize_with_camel_case_fields() {
        let mut conversation = Conversation::new();
        conversation.begin("Hello").unwrap();
        let value = serde_json::to_value(&conversation.messages()[0]).unwrap();
        assert_eq!(value["isUser"], true);
        assert_eq!(value["content"], "Hello");
        assert!(value.get("timestamp").is_some());
    }
}
