//! Offline interviewer with deterministic replies.

use async_trait::async_trait;

use crate::domain::{GenerationError, Instruction, Speaker, TextGenerator, Turn};

const FOLLOW_UP_QUESTIONS: [&str; 5] = [
    "How severe are your symptoms, from 1 to 10?",
    "How long have you had these symptoms?",
    "Have you noticed any side effects?",
    "Which medications are you currently taking?",
    "Do you have any relevant images or documents?",
];

#[derive(Debug, Clone, Default)]
pub struct ScriptedGenerator;

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        transcript: &[Turn],
        instruction: Instruction,
    ) -> Result<String, GenerationError> {
        let answers: Vec<&str> = transcript
            .iter()
            .filter(|turn| turn.speaker == Speaker::User)
            .map(|turn| turn.text.as_str())
            .collect();

        match instruction {
            Instruction::Summarize => {
                let bullets: Vec<String> = answers.iter().map(|a| format!("- {}", a)).collect();
                Ok(format!("Patient summary:\n{}", bullets.join("\n")))
            }
            Instruction::Interview => {
                let index = answers.len().saturating_sub(1) % FOLLOW_UP_QUESTIONS.len();
                Ok(FOLLOW_UP_QUESTIONS[index].to_string())
            }
        }
    }
}
