//! コネクションレジストリのインターフェース
//!
//! レジストリは接続中のコネクションをルームごとにまとめ、[`ServerEvent`] を送る。
//! プロトコルには依存しない。各コネクションはチャネルの送信側を渡し、
//! 受信側はトランスポートが読み出す。

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{
    entity::ResolvedEntity,
    error::DeliveryError,
    event::ServerEvent,
    value_object::{ConnectionId, RoomId},
};

/// 1 コネクション分の送信チャネル
pub type PusherChannel = mpsc::UnboundedSender<ServerEvent>;

/// ゲートウェイが登録するルームのメンバー
#[derive(Debug, Clone)]
pub struct Member {
    pub entity: ResolvedEntity,
    pub sender: PusherChannel,
}

/// ブロードキャストの結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    /// チャネルが閉じていたためルームから除去されたメンバー
    pub evicted: Vec<ConnectionId>,
}

/// 接続中ルーム 1 件のスナップショット
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveRoom {
    pub room_id: RoomId,
    pub members: usize,
}

#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// `member` を `room_id` に登録し、`joined` 通知に続けて `backlog` を送る
    ///
    /// 通知と `backlog` は、登録後に行われるどのブロードキャストよりも先に届く。
    async fn join(
        &self,
        room_id: &RoomId,
        member: Member,
        notice: String,
        backlog: Vec<ServerEvent>,
    ) -> ConnectionId;

    /// コネクションを除去する。まだ登録されていた場合はそのルームを返す
    async fn leave(&self, connection_id: &ConnectionId) -> Option<RoomId>;

    async fn broadcast(
        &self,
        room_id: &RoomId,
        event: &ServerEvent,
        exclude: Option<&ConnectionId>,
    ) -> BroadcastReport;

    async fn send_to(
        &self,
        connection_id: &ConnectionId,
        event: ServerEvent,
    ) -> Result<(), DeliveryError>;

    async fn live_rooms(&self) -> Vec<LiveRoom>;

    /// 全ルームの全メンバーを除去し、除去したコネクション数を返す
    async fn drain(&self) -> usize;
}
