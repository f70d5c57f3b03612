//! ドメイン層のエラー定義

use serde::Serialize;
use thiserror::Error;

/// 値オブジェクトの生成失敗
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{0} must be at most {1} characters")]
    TooLong(&'static str, usize),
}

/// 永続化コラボレーターが報告する失敗
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("record not found: {0}")]
    NotFound(String),
}

/// 接続（またはルーム単位のリクエスト）が拒否される理由
///
/// 理由の文字列は人が読むためのもので、ストアの内部情報は含めない。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unavailable(String),
}

impl AccessError {
    /// 機械可読な固定のコード
    pub fn code(&self) -> &'static str {
        match self {
            AccessError::Unauthenticated(_) => "UNAUTHENTICATED",
            AccessError::Forbidden(_) => "FORBIDDEN",
            AccessError::NotFound(_) => "NOT_FOUND",
            AccessError::Unavailable(_) => "UNAVAILABLE",
        }
    }

    pub fn refusal(&self) -> Refusal {
        Refusal {
            code: self.code(),
            reason: self.to_string(),
        }
    }
}

impl From<StoreError> for AccessError {
    fn from(err: StoreError) -> Self {
        tracing::error!("Store failure during access check: {}", err);
        AccessError::Unavailable("Service temporarily unavailable".to_string())
    }
}

/// 接続に失敗したクライアントへ送る構造化された拒否
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Refusal {
    pub code: &'static str,
    pub reason: String,
}

/// 外部テキスト生成の失敗
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("generation failed: {0}")]
    Failed(String),

    #[error("generation timed out after {0} seconds")]
    TimedOut(u64),
}

/// AI インタビューの状態機械の失敗
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterviewError {
    /// 再試行可能。状態は進んでいないので同じ発話を再送できる
    #[error("the assistant could not respond: {0}")]
    GenerationFailed(#[from] GenerationError),

    #[error("the interview session has been concluded")]
    SessionConcluded,

    #[error("the utterance is empty")]
    EmptyUtterance,
}

impl InterviewError {
    pub fn code(&self) -> &'static str {
        match self {
            InterviewError::GenerationFailed(_) => "GENERATION_FAILED",
            InterviewError::SessionConcluded => "SESSION_CONCLUDED",
            InterviewError::EmptyUtterance => "INVALID_MESSAGE",
        }
    }
}

/// レジストリのメンバー 1 件への配信失敗
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("connection '{0}' is not registered")]
    ConnectionNotFound(String),

    #[error("connection '{0}' is closed")]
    ChannelClosed(String),
}

/// 不正な受信フレーム
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("malformed frame: {0}")]
    Malformed(String),

    #[error("unsupported action for this room: {0}")]
    Unsupported(String),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}
