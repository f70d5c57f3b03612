//! UseCase 層のエラー定義

use thiserror::Error;

use crate::domain::{AccessError, InterviewError, RoomKind, StoreError};

/// 受信メッセージ処理のエラー（送信者にのみ error イベントとして通知される）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    #[error("this action is not available in a {0:?} room")]
    Unsupported(RoomKind),

    #[error(transparent)]
    Interview(#[from] InterviewError),

    #[error("the message could not be saved")]
    Persist(#[source] StoreError),

    #[error("the session could not be loaded")]
    Load(#[source] StoreError),

    #[error(transparent)]
    Finalize(#[from] FinalizeError),
}

impl MessageError {
    pub fn code(&self) -> &'static str {
        match self {
            MessageError::Unsupported(_) => "INVALID_MESSAGE",
            MessageError::Interview(e) => e.code(),
            MessageError::Persist(_) | MessageError::Load(_) => "UNAVAILABLE",
            MessageError::Finalize(e) => e.code(),
        }
    }
}

/// AI セッション終了のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FinalizeError {
    #[error(transparent)]
    Access(#[from] AccessError),

    #[error("room '{0}' is not an AI session")]
    NotAiSession(String),

    #[error("the session could not be ended")]
    Store(#[source] StoreError),
}

impl FinalizeError {
    pub fn code(&self) -> &'static str {
        match self {
            FinalizeError::Access(e) => e.code(),
            FinalizeError::NotAiSession(_) => "INVALID_MESSAGE",
            FinalizeError::Store(_) => "UNAVAILABLE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GenerationError;

    #[test]
    fn test_message_error_codes() {
        // テスト項目: 受信メッセージのエラーごとに固定のコードが割り当てられる
        // given (前提条件):
        let errors = [
            MessageError::Unsupported(RoomKind::Chat),
            MessageError::Interview(InterviewError::SessionConcluded),
            MessageError::Interview(GenerationError::TimedOut(30).into()),
            MessageError::Persist(StoreError::Unavailable("db".to_string())),
            MessageError::Load(StoreError::Unavailable("db".to_string())),
        ];

        // when (操作):
        let codes: Vec<&str> = errors.iter().map(MessageError::code).collect();

        // then (期待する結果):
        assert_eq!(
            codes,
            vec![
                "INVALID_MESSAGE",
                "SESSION_CONCLUDED",
                "GENERATION_FAILED",
                "UNAVAILABLE",
                "UNAVAILABLE"
            ]
        );
    }

    #[test]
    fn test_persist_error_hides_store_detail() {
        // テスト項目: 保存失敗のメッセージにストアの内部情報は含まれない
        // given (前提条件):
        let error = MessageError::Persist(StoreError::Unavailable("pg timeout".to_string()));

        // when (操作):
        let message = error.to_string();

        // then (期待する結果):
        assert!(!message.contains("pg"));
    }
}
