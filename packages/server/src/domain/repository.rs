//! 外部に永続化されたレコードを読み書きするストアのトレイト
//!
//! インターフェースはドメイン層が持ち、実装はインフラ層が提供する（依存性逆転）。
//! 業務レコード自体は別の場所で作られる。ブローカーはルーム・ユーザー・
//! 対応エッジを読み、ターンを追記するだけ。

use async_trait::async_trait;

use super::{
    entity::{NodeRef, RelationEdge, Room, TurnRecord, UserAccount},
    error::StoreError,
    value_object::{RoomId, UserId},
};

/// 永続化された対応テーブルの読み取り
///
/// 未知のノードを引いた場合はエラーではなく空の一覧を返す。
#[async_trait]
pub trait RelationshipStore: Send + Sync {
    /// `node` を端点に持つすべてのエッジ
    async fn edges_touching(&self, node: &NodeRef) -> Result<Vec<RelationEdge>, StoreError>;
}

/// チャット・AI セッションのエンドポイントが作成したルームの読み取り
#[async_trait]
pub trait RoomStore: Send + Sync {
    async fn get_room(&self, room_id: &RoomId) -> Result<Option<Room>, StoreError>;

    /// AI セッションを終了済みとして記録する。今回の呼び出しで終了した場合は `true`
    async fn mark_ended(&self, room_id: &RoomId) -> Result<bool, StoreError>;
}

/// 追記のみのターン永続化
#[async_trait]
pub trait TurnStore: Send + Sync {
    async fn append_turn(&self, record: TurnRecord) -> Result<(), StoreError>;

    /// ルームの直近 `limit` 件のターン（古い順）
    async fn recent_turns(
        &self,
        room_id: &RoomId,
        limit: usize,
    ) -> Result<Vec<TurnRecord>, StoreError>;
}

/// トークン検証後に使うユーザーアカウントの参照
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, user_id: &UserId) -> Result<Option<UserAccount>, StoreError>;
}
