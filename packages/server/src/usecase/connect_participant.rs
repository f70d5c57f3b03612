//! UseCase: 参加者接続処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectParticipantUseCase::admit() / execute() メソッド
//! - 認証 → ルーム取得 → エンティティ解決 → 認可 → 登録 の流れ
//!
//! ### なぜこのテストが必要か
//! - 拒否された接続がレジストリに登録されないことを保証
//! - 拒否理由ごとに固定のコード（UNAUTHENTICATED / FORBIDDEN / NOT_FOUND）が返ることを確認
//! - 接続直後の通知（joined 通知、チャット履歴）が本人にだけ届くことを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：患者・医師・管理者の接続
//! - 異常系：不正なトークン、存在しないルーム、関係のない医師、所有していないエンティティの主張
//! - エッジケース：終了済み AI セッションへの接続（読み取り専用で許可）

use std::sync::Arc;

use crate::domain::{
    AccessError, AccessPolicy, AuthVerifier, ConnectionId, EntityId, EntityResolver,
    HistoryEntry, Member, MessagePusher, Principal, PusherChannel, ResolvedEntity, Room, RoomId,
    RoomKind, RoomStore, ServerEvent, TurnAuthor, TurnStore,
};

/// 新しく参加したチャットメンバーに送る履歴の件数
pub const HISTORY_LIMIT: usize = 50;

/// Connect operation input, shared by both transports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub room_id: String,
    pub token: String,
    pub claimed_entity_id: Option<String>,
}

/// Connection attempt that passed authentication and authorization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub room: Room,
    pub principal: Principal,
    pub entity: ResolvedEntity,
}

/// Registered connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub connection_id: ConnectionId,
    pub room: Room,
    pub principal: Principal,
    pub entity: ResolvedEntity,
}

/// 参加者接続のユースケース
pub struct ConnectParticipantUseCase {
    auth: Arc<dyn AuthVerifier>,
    resolver: EntityResolver,
    policy: AccessPolicy,
    rooms: Arc<dyn RoomStore>,
    turns: Arc<dyn TurnStore>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
}

impl ConnectParticipantUseCase {
    pub fn new(
        auth: Arc<dyn AuthVerifier>,
        resolver: EntityResolver,
        policy: AccessPolicy,
        rooms: Arc<dyn RoomStore>,
        turns: Arc<dyn TurnStore>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            auth,
            resolver,
            policy,
            rooms,
            turns,
            message_pusher,
        }
    }

    /// 接続を許可するかを判定する（レジストリには何も登録しない）
    ///
    /// # Returns
    ///
    /// * `Ok(Admission)` - 接続可能
    /// * `Err(AccessError)` - 拒否（再試行はしない）
    pub async fn admit(&self, request: &ConnectRequest) -> Result<Admission, AccessError> {
        // 1. 認証
        let principal = self.auth.verify(&request.token).await?;

        // 2. ルームの取得
        let not_found = || AccessError::NotFound(format!("Room '{}' not found", request.room_id));
        let room_id = RoomId::new(request.room_id.clone()).map_err(|_| not_found())?;
        let room = self.rooms.get_room(&room_id).await?.ok_or_else(not_found)?;

        // 3. エンティティの解決
        let claim = parse_claim(request.claimed_entity_id.as_deref())?;
        let entity = self.resolver.resolve(&principal, claim.as_ref()).await?;

        // 4. 認可
        if !self.policy.authorize(&entity, &room).await? {
            tracing::warn!(
                "Entity '{}' ({:?}) is not authorized for room '{}'",
                entity.id,
                entity.kind,
                room.id
            );
            return Err(AccessError::Forbidden(
                "Not authorized to access this room".to_string(),
            ));
        }

        Ok(Admission {
            room,
            principal,
            entity,
        })
    }

    /// 許可された接続をルームに登録し、joined 通知（チャットなら履歴も）を送る
    ///
    /// 履歴は登録前に読み込み、レジストリが joined 通知の直後に送る。
    /// 登録後のブロードキャストが履歴より先に届いたり、履歴に重複して含まれたりしない。
    pub async fn execute(&self, admission: Admission, sender: PusherChannel) -> Session {
        let Admission {
            room,
            principal,
            entity,
        } = admission;

        let backlog = match room.kind {
            RoomKind::Chat => self.load_history(&room.id).await.into_iter().collect(),
            RoomKind::AiSession => Vec::new(),
        };

        let member = Member {
            entity: entity.clone(),
            sender,
        };
        let connection_id = self
            .message_pusher
            .join(&room.id, member, welcome_notice(&room), backlog)
            .await;

        tracing::info!(
            "Entity '{}' ({:?}) connected to room '{}' as '{}'",
            entity.id,
            entity.kind,
            room.id,
            connection_id
        );

        Session {
            connection_id,
            room,
            principal,
            entity,
        }
    }

    /// 直近の履歴を History イベントにまとめる（空なら None）
    async fn load_history(&self, room_id: &RoomId) -> Option<ServerEvent> {
        let turns = match self.turns.recent_turns(room_id, HISTORY_LIMIT).await {
            Ok(turns) => turns,
            Err(e) => {
                tracing::warn!("Could not load history of room '{}': {}", room_id, e);
                return None;
            }
        };
        if turns.is_empty() {
            return None;
        }

        let messages = turns
            .into_iter()
            .map(|turn| HistoryEntry {
                sender_id: match turn.author {
                    TurnAuthor::Participant(entity) => Some(entity.id),
                    TurnAuthor::Assistant => None,
                },
                content: turn.text,
                metadata: turn.metadata,
                timestamp: turn.timestamp,
            })
            .collect();

        Some(ServerEvent::History { messages })
    }
}

/// 空の主張は「主張なし」として扱う
fn parse_claim(raw: Option<&str>) -> Result<Option<EntityId>, AccessError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(claim) => EntityId::new(claim.to_string())
            .map(Some)
            .map_err(|_| AccessError::Forbidden("Invalid entity id".to_string())),
    }
}

fn welcome_notice(room: &Room) -> String {
    match (room.kind, room.ended) {
        (RoomKind::Chat, _) => format!(
            "Connected to chat {}. You can start chatting now.",
            room.id
        ),
        (RoomKind::AiSession, false) => format!("Connected to AI assistant session {}.", room.id),
        (RoomKind::AiSession, true) => format!(
            "Connected to AI assistant session {}. This session has ended.",
            room.id
        ),
    }
}
