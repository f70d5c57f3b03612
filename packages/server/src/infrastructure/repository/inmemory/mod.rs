//! インメモリのストア実装
//!
//! ドメイン層が定義するストア trait の具体的な実装です。
//! 将来的に PostgreSQL などの実装に差し替える際も、ドメイン層と UseCase 層は変更不要です。

mod relationship;
mod room;
mod turn;
mod user;

pub use relationship::InMemoryRelationshipStore;
pub use room::{AiSessionRecord, ChatRecord, InMemoryRoomStore};
pub use turn::InMemoryTurnStore;
pub use user::InMemoryUserDirectory;
