use std::fmt;

use tracing::error;

use crate::api::ApiClient;
use crate::state::ChatMessage;

/// Shown in place of an answer whenever the backend call fails.
pub const CHAT_ERROR_MESSAGE: &str = "Lo siento, ha ocurrido un error al procesar tu pregunta.";

/// Transcript and loading flag of the chat view.
#[derive(Debug, Default)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    loading: bool,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Records the user's turn and returns the question to send.
    ///
    /// Returns `None` (and changes nothing) for blank input or while a
    /// previous question is still in flight.
    pub fn begin(&mut self, question: &str) -> Option<String> {
        if question.trim().is_empty() || self.loading {
            return None;
        }

        self.messages.push(ChatMessage::user(question));
        self.loading = true;
        Some(question.to_string())
    }

    /// Appends the assistant's reply, or the fallback message on failure.
    pub fn finish<E: fmt::Display>(&mut self, result: Result<String, E>) {
        let content = match result {
            Ok(reply) => reply,
            Err(e) => {
                error!(error = %e, "error fetching chat response");
                CHAT_ERROR_MESSAGE.to_string()
            }
        };

        self.messages.push(ChatMessage::assistant(content));
        self.loading = false;
    }

    /// Runs a whole question/answer round trip in place.
    pub async fn submit(&mut self, client: &ApiClient, question: &str) {
        if let Some(question) = self.begin(question) {
            let result = client.ask(&question).await;
            self.finish(result);
        }
    }
}
