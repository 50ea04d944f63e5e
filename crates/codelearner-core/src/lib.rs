pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod exercise;
pub mod shell;
pub mod state;
pub mod word_search;

// Re-export main types for convenience
pub use api::ApiClient;
pub use chat::{ChatSession, CHAT_ERROR_MESSAGE};
pub use config::Config;
pub use error::ApiError;
pub use exercise::{
    check_equivalence, CodeArtifact, CodeExerciseSession, ExerciseMode, GenerateRequest, Language,
};
pub use shell::{ShellContext, Theme, View};
pub use state::{ChatMessage, ChatRole};
pub use word_search::{Answer, Cell, ClearTicket, SelectOutcome, WordSearchBoard, WordSearchPuzzle};
