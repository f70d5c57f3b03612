//! OpenAI chat-completions generator.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::domain::{GenerationError, Instruction, Speaker, TextGenerator, Turn};

pub const DEFAULT_MODEL: &str = "gpt-4";

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// System prompt of the patient interviewer
const INTERVIEWER_PROMPT: &str = "You are a doctor's assistant, and patients are enrolled under you.

Ask follow-up questions to help the doctor reach a more accurate diagnosis. Be concise. Cover:
- Severity of symptoms
- Duration
- Side effects (if any)
- Medications being taken
- Any relevant images or documents
Keep questions crisp and avoid irrelevant questions.

Once responses are received, prepare a crisp bullet-point summary for the doctor to review quickly.

Your messages should not exceed 15 words. Summary can be up to 75 words.
Wait for patient response before asking the next question.

IMPORTANT: You must format your response as a valid JSON object with the following structure:
{\"message\": \"Your response text here\", \"isSummary\": true/false}

Set \"isSummary\" to true only when you are providing the final summary after all questions.
For all other responses, set \"isSummary\" to false.";

#[derive(Clone)]
pub struct OpenAiGenerator {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiGenerator {
    pub fn new(api_key: String, model: impl Into<String>, base_url: Option<String>) -> Self {
        let base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            api_key,
            model: model.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body(&self, transcript: &[Turn], instruction: Instruction) -> Value {
        let mut messages = vec![json!({"role": "system", "content": INTERVIEWER_PROMPT})];
        messages.extend(transcript.iter().map(|turn| {
            let role = match turn.speaker {
                Speaker::User => "user",
                Speaker::Assistant => "assistant",
            };
            json!({"role": role, "content": turn.text})
        }));
        if let Some(prompt) = instruction.prompt() {
            messages.push(json!({"role": "system", "content": prompt}));
        }

        json!({
            "model": &self.model,
            "messages": messages,
        })
    }
}

/// Unwrap a `{"message", "isSummary"}` reply to its message; anything else is used verbatim.
pub fn unwrap_reply(raw: &str) -> String {
    #[derive(Deserialize)]
    struct TaggedReply {
        message: String,
    }

    match serde_json::from_str::<TaggedReply>(raw.trim()) {
        Ok(reply) => reply.message.trim().to_string(),
        Err(_) => {
            tracing::debug!("Reply is not a tagged JSON object, using raw text");
            raw.trim().to_string()
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(
        &self,
        transcript: &[Turn],
        instruction: Instruction,
    ) -> Result<String, GenerationError> {
        let body = self.request_body(transcript, instruction);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Failed(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!("OpenAI API error {}: {}", status, body);
            return Err(GenerationError::Failed(format!("upstream returned {}", status)));
        }

        #[derive(Deserialize)]
        struct Message {
            content: Option<String>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: Message,
        }
        #[derive(Deserialize)]
        struct ApiResponse {
            choices: Vec<Choice>,
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Failed(format!("invalid response body: {}", e)))?;

        let content = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| GenerationError::Failed("no choices returned".to_string()))?;

        let message = unwrap_reply(&content);
        if message.is_empty() {
            return Err(GenerationError::Failed("empty reply".to_string()));
        }
        Ok(message)
    }
}
