pub mod ndjson;
pub mod ollama;

pub use ndjson::{drive_stream, LineBuffer};
pub use ollama::OllamaClient;
