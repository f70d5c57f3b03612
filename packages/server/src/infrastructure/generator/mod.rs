//! Text generation collaborators.
//!
//! - `openai`: chat-completions client
//! - `scripted`: offline deterministic interviewer used when no API key is configured

pub mod openai;
pub mod scripted;

pub use openai::OpenAiGenerator;
pub use scripted::ScriptedGenerator;
