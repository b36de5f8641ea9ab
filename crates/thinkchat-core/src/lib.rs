pub mod ai;
pub mod config;
pub mod error;
pub mod reveal;
pub mod session;
pub mod state;
pub mod think;

// Re-export main types for convenience
pub use ai::OllamaClient;
pub use config::Config;
pub use error::{ErrorKind, StreamError};
pub use reveal::Typewriter;
pub use session::Conversation;
pub use state::{ChatMessage, ChatRole, Message, StreamFragment};
pub use think::{AnswerPolicy, Segment, ThinkBlock};
pub use tokio_util::sync::CancellationToken;
