//! AI インタビューの状態機械
//!
//! ```text
//! interviewing --(question_count reaches threshold)--> summarizing --(end session)--> concluded
//! ```
//!
//! 生成に失敗しても状態が変わらないよう、遷移は 2 段階に分かれる。
//! [`InterviewState::prepare`] は状態を変えずに生成への依頼を組み立て、
//! [`InterviewState::commit`] は返答が得られてから結果を反映する。
//! 両方とも同じセッションのロック内で実行すること。

use serde::{Deserialize, Serialize};

use super::{error::InterviewError, value_object::MessageContent};

pub const DEFAULT_QUESTION_THRESHOLD: u32 = 5;

pub const DEFAULT_OPENING_QUESTION: &str = "What brings you in today?";

/// 要約のタイミングでトランスクリプトに追加する指示
pub const SUMMARY_INSTRUCTION: &str = "Now generate a comprehensive summary of the patient's \
     condition based on all the information gathered. Give this summary in the first person.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Interviewing,
    Summarizing,
    Concluded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
        }
    }
}

/// 生成に依頼する内容
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// 次の問診の質問
    Interview,
    /// 医師向けのインタビュー要約
    Summarize,
}

impl Instruction {
    /// トランスクリプトに追加する指示文（あれば）
    pub fn prompt(&self) -> Option<&'static str> {
        match self {
            Instruction::Interview => None,
            Instruction::Summarize => Some(SUMMARY_INSTRUCTION),
        }
    }
}

/// 受け付けたがまだ返答していないユーザーのターン
#[derive(Debug, Clone, PartialEq)]
pub struct PendingTurn {
    utterance: String,
    next_count: u32,
    instruction: Instruction,
    context: Vec<Turn>,
}

impl PendingTurn {
    pub fn instruction(&self) -> Instruction {
        self.instruction
    }

    /// 保留中のユーザーターンを含むトランスクリプト全体
    pub fn context(&self) -> &[Turn] {
        &self.context
    }

    pub fn utterance(&self) -> &str {
        &self.utterance
    }
}

/// 返答済みのユーザーターン 1 件の結果
#[derive(Debug, Clone, PartialEq)]
pub struct InterviewReply {
    pub utterance: String,
    pub message: String,
    pub is_summary: bool,
    pub question_count: u32,
    pub phase: Phase,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterviewState {
    question_count: u32,
    phase: Phase,
    transcript: Vec<Turn>,
    threshold: u32,
}

impl InterviewState {
    /// 新しいインタビューを始める。最初の質問があれば、それがトランスクリプトの
    /// 最初のアシスタントのターンになる。
    pub fn new(threshold: u32, opening: Option<&str>) -> Self {
        let transcript = opening.map(|text| vec![Turn::assistant(text)]).unwrap_or_default();
        Self {
            question_count: 0,
            phase: Phase::Interviewing,
            transcript,
            threshold: threshold.max(1),
        }
    }

    /// 読み込む前にすでに終了していたセッションの状態
    pub fn concluded(threshold: u32) -> Self {
        Self {
            phase: Phase::Concluded,
            ..Self::new(threshold, None)
        }
    }

    pub fn question_count(&self) -> u32 {
        self.question_count
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn transcript(&self) -> &[Turn] {
        &self.transcript
    }

    /// ユーザーの発話を検証し、生成への依頼を組み立てる
    pub fn prepare(&self, utterance: &MessageContent) -> Result<PendingTurn, InterviewError> {
        if self.phase == Phase::Concluded {
            return Err(InterviewError::SessionConcluded);
        }
        let text = utterance.as_str().trim();
        if text.is_empty() {
            return Err(InterviewError::EmptyUtterance);
        }

        let next_count = self.question_count + 1;
        let instruction = if self.phase == Phase::Interviewing && next_count >= self.threshold {
            Instruction::Summarize
        } else {
            Instruction::Interview
        };

        let mut context = self.transcript.clone();
        context.push(Turn::user(text));

        Ok(PendingTurn {
            utterance: text.to_string(),
            next_count,
            instruction,
            context,
        })
    }

    /// 生成された返答を準備済みのターンに反映する
    pub fn commit(&mut self, pending: PendingTurn, reply: String) -> InterviewReply {
        let is_summary = pending.instruction == Instruction::Summarize;

        self.transcript.push(Turn::user(pending.utterance.clone()));
        self.transcript.push(Turn::assistant(reply.clone()));
        self.question_count = pending.next_count;
        if is_summary {
            self.phase = Phase::Summarizing;
        }

        InterviewReply {
            utterance: pending.utterance,
            message: reply,
            is_summary,
            question_count: self.question_count,
            phase: self.phase,
        }
    }

    /// 終端のフェーズに移る。すでに concluded なら `false`
    pub fn conclude(&mut self) -> bool {
        if self.phase == Phase::Concluded {
            return false;
        }
        self.phase = Phase::Concluded;
        true
    }
}
