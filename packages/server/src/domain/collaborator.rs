//! ブローカーが利用する外部コラボレーター（トークン検証とテキスト生成）

use async_trait::async_trait;

use super::{
    entity::Principal,
    error::{AccessError, GenerationError},
    interview::{Instruction, Turn},
};

/// Bearer トークンを検証し、認証済みの Principal を返す
///
/// 失敗はすべて [`AccessError::Unauthenticated`] として報告される。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Principal, AccessError>;
}

/// これまでのトランスクリプトから次のアシスタントのターンを生成する
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        transcript: &[Turn],
        instruction: Instruction,
    ) -> Result<String, GenerationError>;
}
