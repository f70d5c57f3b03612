//! ルーム単位のコネクションレジストリ
//!
//! ## 責務
//!
//! - 接続中のコネクションをルーム ID ごとにグループ化して管理
//! - ルームへのブロードキャストと、単一コネクションへの送信
//! - 送信に失敗したメンバー（切断済みのソケット）の除去
//!
//! ## 並行性
//!
//! ルームの一覧は `RwLock` で保護し、各ルームのメンバー集合はルームごとの
//! `Mutex` で保護します。異なるルームの操作は互いにブロックしません。
//! ブロードキャストはルームのロックを保持したまま全メンバーへ送るため、
//! 同一ルーム内では発行順に配送されます。
//!
//! ロックの取得順序は「ルーム一覧 → ルーム」、および「ルーム → インデックス」
//! ではなく、インデックスのロックは他のロックを保持していない時にのみ取得します。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::domain::{
    BroadcastReport, ConnectionId, DeliveryError, LiveRoom, Member, MessagePusher, RoomId,
    ServerEvent,
};

/// ルームのメンバー集合
#[derive(Default)]
struct RoomMembers {
    /// 空になって一覧から外されたルームは再利用しない
    closed: bool,
    /// 参加順に保持する
    entries: Vec<(ConnectionId, Member)>,
}

#[derive(Default)]
struct RoomSlot {
    members: Mutex<RoomMembers>,
}

/// インプロセスのコネクションレジストリ
///
/// プロセス起動時に一度だけ生成し、`Arc` で各コネクションのタスクに共有します。
#[derive(Default)]
pub struct ConnectionRegistry {
    /// Key: room_id, Value: ルームのメンバー集合
    rooms: RwLock<HashMap<RoomId, Arc<RoomSlot>>>,
    /// Key: connection_id, Value: 所属するルーム
    index: Mutex<HashMap<ConnectionId, RoomId>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, room_id: &RoomId) -> Option<Arc<RoomSlot>> {
        self.rooms.read().await.get(room_id).cloned()
    }

    async fn slot_or_create(&self, room_id: &RoomId) -> Arc<RoomSlot> {
        if let Some(slot) = self.slot(room_id).await {
            return slot;
        }
        let mut rooms = self.rooms.write().await;
        rooms.entry(room_id.clone()).or_default().clone()
    }

    /// 空になったルームを一覧から外す（別のスロットに置き換わっていれば何もしない）
    async fn forget_room(&self, room_id: &RoomId, slot: &Arc<RoomSlot>) {
        let mut rooms = self.rooms.write().await;
        if rooms
            .get(room_id)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
        {
            rooms.remove(room_id);
            tracing::debug!("Room '{}' dropped from registry (no members left)", room_id);
        }
    }

    async fn forget_connections(&self, connection_ids: &[ConnectionId]) {
        if connection_ids.is_empty() {
            return;
        }
        let mut index = self.index.lock().await;
        for connection_id in connection_ids {
            index.remove(connection_id);
        }
    }

    /// 接続中のコネクション数
    pub async fn connection_count(&self) -> usize {
        self.index.lock().await.len()
    }
}

#[async_trait]
impl MessagePusher for ConnectionRegistry {
    async fn join(
        &self,
        room_id: &RoomId,
        member: Member,
        notice: String,
        backlog: Vec<ServerEvent>,
    ) -> ConnectionId {
        let connection_id = ConnectionId::generate();
        let joined = ServerEvent::System {
            content: notice,
            connection_id: Some(connection_id),
        };

        self.index
            .lock()
            .await
            .insert(connection_id, room_id.clone());

        loop {
            let slot = self.slot_or_create(room_id).await;
            let mut members = slot.members.lock().await;
            if members.closed {
                // 直前に空になって外されたスロット。作り直して再試行する
                continue;
            }
            // joined 通知と backlog はロック内で送り、以降のブロードキャストより必ず先に届ける
            let greeting = std::iter::once(joined.clone()).chain(backlog.iter().cloned());
            for event in greeting {
                if let Err(e) = member.sender.send(event) {
                    tracing::warn!(
                        "Failed to push greeting to connection '{}': {}",
                        connection_id,
                        e
                    );
                    break;
                }
            }
            members.entries.push((connection_id, member));
            break;
        }

        tracing::info!("Connection '{}' joined room '{}'", connection_id, room_id);
        connection_id
    }

    async fn leave(&self, connection_id: &ConnectionId) -> Option<RoomId> {
        let room_id = self.index.lock().await.remove(connection_id)?;

        if let Some(slot) = self.slot(&room_id).await {
            let emptied = {
                let mut members = slot.members.lock().await;
                members.entries.retain(|(id, _)| id != connection_id);
                let emptied = members.entries.is_empty() && !members.closed;
                if emptied {
                    members.closed = true;
                }
                emptied
            };
            if emptied {
                self.forget_room(&room_id, &slot).await;
            }
        }

        tracing::info!("Connection '{}' left room '{}'", connection_id, room_id);
        Some(room_id)
    }

    async fn broadcast(
        &self,
        room_id: &RoomId,
        event: &ServerEvent,
        exclude: Option<&ConnectionId>,
    ) -> BroadcastReport {
        let Some(slot) = self.slot(room_id).await else {
            tracing::debug!("Broadcast to room '{}' without members, skipping", room_id);
            return BroadcastReport::default();
        };

        let mut report = BroadcastReport::default();
        let emptied = {
            let mut members = slot.members.lock().await;
            members.entries.retain(|(id, member)| {
                if exclude == Some(id) {
                    return true;
                }
                // ブロードキャストでは一部の送信失敗を許容し、失敗したメンバーは除去する
                match member.sender.send(event.clone()) {
                    Ok(()) => {
                        report.delivered += 1;
                        true
                    }
                    Err(_) => {
                        tracing::warn!(
                            "Failed to push message to connection '{}' in room '{}', evicting",
                            id,
                            room_id
                        );
                        report.evicted.push(*id);
                        false
                    }
                }
            });
            let emptied = !report.evicted.is_empty() && members.entries.is_empty();
            if emptied {
                members.closed = true;
            }
            emptied
        };

        self.forget_connections(&report.evicted).await;
        if emptied {
            self.forget_room(room_id, &slot).await;
        }

        tracing::debug!(
            "Broadcasted to {} connection(s) in room '{}'",
            report.delivered,
            room_id
        );
        report
    }

    async fn send_to(
        &self,
        connection_id: &ConnectionId,
        event: ServerEvent,
    ) -> Result<(), DeliveryError> {
        let not_found = || DeliveryError::ConnectionNotFound(connection_id.to_string());

        let room_id = self
            .index
            .lock()
            .await
            .get(connection_id)
            .cloned()
            .ok_or_else(not_found)?;
        let slot = self.slot(&room_id).await.ok_or_else(not_found)?;

        let (result, emptied) = {
            let mut members = slot.members.lock().await;
            let position = members
                .entries
                .iter()
                .position(|(id, _)| id == connection_id)
                .ok_or_else(not_found)?;

            match members.entries[position].1.sender.send(event) {
                Ok(()) => (Ok(()), false),
                Err(_) => {
                    members.entries.remove(position);
                    let emptied = members.entries.is_empty();
                    if emptied {
                        members.closed = true;
                    }
                    (
                        Err(DeliveryError::ChannelClosed(connection_id.to_string())),
                        emptied,
                    )
                }
            }
        };

        if let Err(e) = &result {
            tracing::warn!("{}, evicting", e);
            self.forget_connections(&[*connection_id]).await;
            if emptied {
                self.forget_room(&room_id, &slot).await;
            }
        }
        result
    }

    async fn live_rooms(&self) -> Vec<LiveRoom> {
        let slots: Vec<(RoomId, Arc<RoomSlot>)> = self
            .rooms
            .read()
            .await
            .iter()
            .map(|(room_id, slot)| (room_id.clone(), slot.clone()))
            .collect();

        let mut live = Vec::with_capacity(slots.len());
        for (room_id, slot) in slots {
            let members = slot.members.lock().await;
            if !members.closed {
                live.push(LiveRoom {
                    room_id,
                    members: members.entries.len(),
                });
            }
        }
        live.sort_by(|a, b| a.room_id.cmp(&b.room_id));
        live
    }

    async fn drain(&self) -> usize {
        let rooms = std::mem::take(&mut *self.rooms.write().await);

        let mut evicted = 0;
        for (room_id, slot) in rooms {
            let mut members = slot.members.lock().await;
            members.closed = true;
            evicted += members.entries.len();
            // sender を破棄するとトランスポート側の送信ループが終了する
            members.entries.clear();
            tracing::debug!("Room '{}' drained", room_id);
        }
        self.index.lock().await.clear();

        tracing::info!("Registry drained ({} connection(s) evicted)", evicted);
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EntityId, EntityKind, ResolvedEntity};
    use tokio::sync::mpsc;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - join / leave / broadcast / send_to / drain の基本動作
    // - 送信失敗したメンバーの除去とルームの破棄
    // - 同一ルーム内での配送順序と、切断後に配送されないこと
    //
    // 【なぜこのテストが必要か】
    // - レジストリはすべてのコネクションの I/O 経路から並行にアクセスされる共有状態
    // - 一部のメンバーの失敗が他のメンバーへの配送を妨げないことを保証する
    // ========================================

    fn room(id: &str) -> RoomId {
        RoomId::new(id.to_string()).unwrap()
    }

    fn member(id: &str) -> (Member, mpsc::UnboundedReceiver<ServerEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let member = Member {
            entity: ResolvedEntity::new(EntityId::new(id.to_string()).unwrap(), EntityKind::Patient),
            sender,
        };
        (member, receiver)
    }

    fn drain_events(receiver: &mut mpsc::UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_backlog_follows_joined_notice_before_any_broadcast() {
        // テスト項目: backlog は joined 通知の直後に届き、join 後のブロードキャストはその後に届く
        // given (前提条件):
        let registry = Arc::new(ConnectionRegistry::new());
        let (alice, _alice_rx) = member("alice");
        let alice_id = registry.join(&room("r1"), alice, "hi".to_string(), vec![]).await;
        let (bob, mut bob_rx) = member("bob");
        let backlog = vec![ServerEvent::status("old 1"), ServerEvent::status("old 2")];

        // when (操作):
        let broadcaster = {
            let registry = registry.clone();
            tokio::spawn(async move {
                for i in 0..20 {
                    registry
                        .broadcast(&room("r1"), &ServerEvent::status(format!("live {}", i)), Some(&alice_id))
                        .await;
                    tokio::task::yield_now().await;
                }
            })
        };
        let bob_id = registry.join(&room("r1"), bob, "hi".to_string(), backlog).await;
        broadcaster.await.unwrap();

        // then (期待する結果):
        let events = drain_events(&mut bob_rx);
        assert_eq!(
            events[0],
            ServerEvent::System {
                content: "hi".to_string(),
                connection_id: Some(bob_id),
            }
        );
        assert_eq!(events[1], ServerEvent::status("old 1"));
        assert_eq!(events[2], ServerEvent::status("old 2"));
        assert!(events[3..].iter().all(|e| matches!(
            e,
            ServerEvent::Status { content } if content.starts_with("live")
        )));
    }

    #[tokio::test]
    async fn test_join_sends_joined_notice_to_new_member_only() {
        // テスト項目: join すると新しいメンバーにだけ joined 通知が届く
        // given (前提条件):
        let registry = ConnectionRegistry::new();
        let (alice, mut alice_rx) = member("alice");
        let (bob, mut bob_rx) = member("bob");
        registry.join(&room("r1"), alice, "welcome".to_string(), vec![]).await;
        drain_events(&mut alice_rx);

        // when (操作):
        let bob_id = registry.join(&room("r1"), bob, "welcome".to_string(), vec![]).await;

        // then (期待する結果):
        assert_eq!(
            drain_events(&mut bob_rx),
            vec![ServerEvent::System {
                content: "welcome".to_string(),
                connection_id: Some(bob_id),
            }]
        );
        assert!(drain_events(&mut alice_rx).is_empty());
        assert_eq!(registry.connection_count().await, 2);
    }

    #[tokio::test]
    async fn test_broadcast_excludes_sender_and_reaches_others() {
        // テスト項目: N 人のルームで送信者を除外すると N-1 人に配送される
        // given (前提条件):
        let registry = ConnectionRegistry::new();
        let mut receivers = Vec::new();
        let mut ids = Vec::new();
        for name in ["a", "b", "c", "d"] {
            let (m, rx) = member(name);
            ids.push(registry.join(&room("r1"), m, "hi".to_string(), vec![]).await);
            receivers.push(rx);
        }
        for rx in receivers.iter_mut() {
            drain_events(rx);
        }

        // when (操作):
        let report = registry
            .broadcast(&room("r1"), &ServerEvent::status("ping"), Some(&ids[0]))
            .await;

        // then (期待する結果):
        assert_eq!(report.delivered, 3);
        assert!(report.evicted.is_empty());
        assert!(drain_events(&mut receivers[0]).is_empty());
        for rx in receivers.iter_mut().skip(1) {
            assert_eq!(drain_events(rx), vec![ServerEvent::status("ping")]);
        }
    }

    #[tokio::test]
    async fn test_broadcasts_preserve_issue_order_per_room() {
        // テスト項目: 同一ルームへのブロードキャストは発行順に配送される
        // given (前提条件):
        let registry = ConnectionRegistry::new();
        let (alice, mut alice_rx) = member("alice");
        registry.join(&room("r1"), alice, "hi".to_string(), vec![]).await;
        drain_events(&mut alice_rx);

        // when (操作):
        for i in 0..50 {
            registry
                .broadcast(&room("r1"), &ServerEvent::status(format!("m{}", i)), None)
                .await;
        }

        // then (期待する結果):
        let expected: Vec<ServerEvent> = (0..50)
            .map(|i| ServerEvent::status(format!("m{}", i)))
            .collect();
        assert_eq!(drain_events(&mut alice_rx), expected);
    }

    #[tokio::test]
    async fn test_broadcast_evicts_stale_member_and_still_delivers() {
        // テスト項目: 切断済みのメンバーは除去され、他のメンバーには配送される
        // given (前提条件):
        let registry = ConnectionRegistry::new();
        let (alice, mut alice_rx) = member("alice");
        let (stale, stale_rx) = member("stale");
        let (bob, mut bob_rx) = member("bob");
        registry.join(&room("r1"), alice, "hi".to_string(), vec![]).await;
        let stale_id = registry.join(&room("r1"), stale, "hi".to_string(), vec![]).await;
        registry.join(&room("r1"), bob, "hi".to_string(), vec![]).await;
        drop(stale_rx);
        drain_events(&mut alice_rx);
        drain_events(&mut bob_rx);

        // when (操作):
        let report = registry
            .broadcast(&room("r1"), &ServerEvent::status("hello"), None)
            .await;

        // then (期待する結果):
        assert_eq!(report.delivered, 2);
        assert_eq!(report.evicted, vec![stale_id]);
        assert_eq!(drain_events(&mut alice_rx), vec![ServerEvent::status("hello")]);
        assert_eq!(drain_events(&mut bob_rx), vec![ServerEvent::status("hello")]);
        assert_eq!(registry.leave(&stale_id).await, None);
        assert_eq!(registry.connection_count().await, 2);
    }

    #[tokio::test]
    async fn test_leave_is_idempotent_and_drops_empty_room() {
        // テスト項目: leave は冪等であり、最後のメンバーが抜けるとルームが破棄される
        // given (前提条件):
        let registry = ConnectionRegistry::new();
        let (alice, _alice_rx) = member("alice");
        let alice_id = registry.join(&room("r1"), alice, "hi".to_string(), vec![]).await;

        // when (操作):
        let first = registry.leave(&alice_id).await;
        let second = registry.leave(&alice_id).await;

        // then (期待する結果):
        assert_eq!(first, Some(room("r1")));
        assert_eq!(second, None);
        assert!(registry.live_rooms().await.is_empty());
    }

    #[tokio::test]
    async fn test_room_is_recreated_after_being_emptied() {
        // テスト項目: 空になって破棄されたルームにも再度 join できる
        // given (前提条件):
        let registry = ConnectionRegistry::new();
        let (alice, _alice_rx) = member("alice");
        let alice_id = registry.join(&room("r1"), alice, "hi".to_string(), vec![]).await;
        registry.leave(&alice_id).await;

        // when (操作):
        let (bob, mut bob_rx) = member("bob");
        registry.join(&room("r1"), bob, "hi".to_string(), vec![]).await;
        drain_events(&mut bob_rx);
        let report = registry
            .broadcast(&room("r1"), &ServerEvent::status("again"), None)
            .await;

        // then (期待する結果):
        assert_eq!(report.delivered, 1);
        assert_eq!(
            registry.live_rooms().await,
            vec![LiveRoom {
                room_id: room("r1"),
                members: 1
            }]
        );
    }

    #[tokio::test]
    async fn test_send_to_targets_exactly_one_connection() {
        // テスト項目: send_to は指定したコネクションにのみ配送する
        // given (前提条件):
        let registry = ConnectionRegistry::new();
        let (alice, mut alice_rx) = member("alice");
        let (bob, mut bob_rx) = member("bob");
        let alice_id = registry.join(&room("r1"), alice, "hi".to_string(), vec![]).await;
        registry.join(&room("r1"), bob, "hi".to_string(), vec![]).await;
        drain_events(&mut alice_rx);
        drain_events(&mut bob_rx);

        // when (操作):
        let result = registry
            .send_to(&alice_id, ServerEvent::status("just you"))
            .await;

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(drain_events(&mut alice_rx), vec![ServerEvent::status("just you")]);
        assert!(drain_events(&mut bob_rx).is_empty());
    }

    #[tokio::test]
    async fn test_send_to_closed_connection_evicts_it() {
        // テスト項目: 閉じたコネクションへの send_to は失敗し、そのコネクションは除去される
        // given (前提条件):
        let registry = ConnectionRegistry::new();
        let (alice, alice_rx) = member("alice");
        let alice_id = registry.join(&room("r1"), alice, "hi".to_string(), vec![]).await;
        drop(alice_rx);

        // when (操作):
        let first = registry.send_to(&alice_id, ServerEvent::status("x")).await;
        let second = registry.send_to(&alice_id, ServerEvent::status("x")).await;

        // then (期待する結果):
        assert!(matches!(first, Err(DeliveryError::ChannelClosed(_))));
        assert!(matches!(second, Err(DeliveryError::ConnectionNotFound(_))));
        assert!(registry.live_rooms().await.is_empty());
    }

    #[tokio::test]
    async fn test_left_connection_never_receives_later_broadcasts() {
        // テスト項目: ブロードキャストの途中で切断しても、以降のブロードキャストは届かない
        // given (前提条件):
        let registry = Arc::new(ConnectionRegistry::new());
        let (alice, mut alice_rx) = member("alice");
        let (bob, _bob_rx) = member("bob");
        let alice_id = registry.join(&room("r1"), alice, "hi".to_string(), vec![]).await;
        registry.join(&room("r1"), bob, "hi".to_string(), vec![]).await;
        drain_events(&mut alice_rx);

        // when (操作): ブロードキャストと並行して alice が切断する
        let broadcaster = {
            let registry = registry.clone();
            tokio::spawn(async move {
                for i in 0..200 {
                    registry
                        .broadcast(&room("r1"), &ServerEvent::status(format!("m{}", i)), None)
                        .await;
                    tokio::task::yield_now().await;
                }
            })
        };
        tokio::task::yield_now().await;
        registry.leave(&alice_id).await;
        let received_at_leave = drain_events(&mut alice_rx).len();
        broadcaster.await.unwrap();
        registry
            .broadcast(&room("r1"), &ServerEvent::status("after"), None)
            .await;

        // then (期待する結果):
        assert!(drain_events(&mut alice_rx).is_empty());
        assert!(received_at_leave <= 200);
    }

    #[tokio::test]
    async fn test_rooms_are_isolated() {
        // テスト項目: 別のルームへのブロードキャストは届かない
        // given (前提条件):
        let registry = ConnectionRegistry::new();
        let (alice, mut alice_rx) = member("alice");
        let (bob, mut bob_rx) = member("bob");
        registry.join(&room("r1"), alice, "hi".to_string(), vec![]).await;
        registry.join(&room("r2"), bob, "hi".to_string(), vec![]).await;
        drain_events(&mut alice_rx);
        drain_events(&mut bob_rx);

        // when (操作):
        registry
            .broadcast(&room("r2"), &ServerEvent::status("only r2"), None)
            .await;

        // then (期待する結果):
        assert!(drain_events(&mut alice_rx).is_empty());
        assert_eq!(drain_events(&mut bob_rx), vec![ServerEvent::status("only r2")]);
    }

    #[tokio::test]
    async fn test_drain_evicts_everyone_and_closes_channels() {
        // テスト項目: drain するとすべてのルームが空になり、各チャンネルが閉じる
        // given (前提条件):
        let registry = ConnectionRegistry::new();
        let (alice, mut alice_rx) = member("alice");
        let (bob, mut bob_rx) = member("bob");
        registry.join(&room("r1"), alice, "hi".to_string(), vec![]).await;
        registry.join(&room("r2"), bob, "hi".to_string(), vec![]).await;
        drain_events(&mut alice_rx);
        drain_events(&mut bob_rx);

        // when (操作):
        let evicted = registry.drain().await;

        // then (期待する結果):
        assert_eq!(evicted, 2);
        assert!(registry.live_rooms().await.is_empty());
        assert_eq!(registry.connection_count().await, 0);
        assert_eq!(alice_rx.recv().await, None);
        assert_eq!(bob_rx.recv().await, None);
    }
}
