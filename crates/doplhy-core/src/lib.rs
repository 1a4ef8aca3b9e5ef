pub mod ai;
pub mod config;
pub mod conversation;
pub mod credential;
pub mod error;
pub mod knowledge;
pub mod prompt;
pub mod session;
pub mod state;

#[cfg(test)]
mod test_http;

// Re-export main types for convenience
pub use ai::{ChatBackend, GeminiClient, GenerateRequest};
pub use config::Config;
pub use conversation::{Conversation, PendingReply};
pub use credential::{Credential, CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use error::AiError;
pub use knowledge::{load_default, KnowledgeSource, FALLBACK_KNOWLEDGE};
pub use session::{Rejection, Session};
pub use state::{Notice, Phase, Role, Transcript, Turn};
