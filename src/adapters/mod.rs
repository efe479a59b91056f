// Adapters layer: concrete implementations of the domain ports.

pub mod gemini;
pub mod storage;

pub use gemini::{GeminiClient, GeminiOptions};
pub use storage::LocalStorage;
