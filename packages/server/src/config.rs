//! Command-line and environment configuration.

use std::{path::PathBuf, time::Duration};

use clap::Parser;

use crate::{
    domain::interview::DEFAULT_OPENING_QUESTION,
    infrastructure::generator::openai::DEFAULT_MODEL,
    usecase::{DEFAULT_GENERATION_TIMEOUT, InterviewSettings},
};

#[derive(Parser, Debug, Clone)]
#[command(name = "clinic-relay-server")]
#[command(about = "Real-time relay for clinic chats and AI interview sessions", long_about = None)]
pub struct ServerConfig {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "RELAY_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "RELAY_PORT", default_value = "8080")]
    pub port: u16,

    /// HS256 secret used to verify access tokens
    #[arg(long, env = "RELAY_JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// JSON fixture of users, rooms and mapping edges for the in-memory stores
    #[arg(long, env = "RELAY_SEED_FILE")]
    pub seed_file: Option<PathBuf>,

    /// API key of the chat-completions endpoint; the offline scripted generator is used without one
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    #[arg(long, env = "OPENAI_MODEL", default_value = DEFAULT_MODEL)]
    pub openai_model: String,

    #[arg(long, env = "OPENAI_BASE_URL")]
    pub openai_base_url: Option<String>,

    /// Number of answers after which the interview is summarized
    #[arg(long, env = "RELAY_QUESTION_THRESHOLD", default_value_t = 5,
          value_parser = clap::value_parser!(u32).range(1..))]
    pub question_threshold: u32,

    /// First assistant turn of every new interview; an empty value disables it
    #[arg(long, env = "RELAY_OPENING_QUESTION", default_value = DEFAULT_OPENING_QUESTION)]
    pub opening_question: String,

    #[arg(long, env = "RELAY_GENERATION_TIMEOUT_SECS", default_value_t = DEFAULT_GENERATION_TIMEOUT.as_secs())]
    pub generation_timeout_secs: u64,

    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl ServerConfig {
    pub fn interview_settings(&self) -> InterviewSettings {
        InterviewSettings {
            threshold: self.question_threshold,
            opening: Some(self.opening_question.trim())
                .filter(|opening| !opening.is_empty())
                .map(str::to_string),
            generation_timeout: Duration::from_secs(self.generation_timeout_secs),
        }
    }
}
