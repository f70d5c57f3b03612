//! ドメインエンティティ（Principal、解決済みエンティティ、関係エッジ、ルーム）

use serde::{Deserialize, Serialize};

use super::value_object::{EdgeId, EntityId, RoomId, Timestamp, UserId};

/// 認証済みユーザーアカウントのロール
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Doctor,
    Patient,
    Hospital,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Doctor => "doctor",
            Role::Patient => "patient",
            Role::Hospital => "hospital",
        }
    }

    /// このロールの Principal が振る舞うエンティティの種別
    pub fn entity_kind(&self) -> EntityKind {
        match self {
            Role::Admin => EntityKind::Admin,
            Role::Doctor => EntityKind::Doctor,
            Role::Patient => EntityKind::Patient,
            Role::Hospital => EntityKind::Hospital,
        }
    }
}

/// エンティティ解決前の認証済みアイデンティティ
///
/// `profile_id` は医師・病院アカウントに 1:1 で紐づくプロフィール。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
    pub profile_id: Option<EntityId>,
}

/// 認証で参照する保存済みユーザーアカウント
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    pub role: Role,
    #[serde(default)]
    pub profile_id: Option<EntityId>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl UserAccount {
    pub fn principal(&self) -> Principal {
        Principal {
            user_id: self.id.clone(),
            role: self.role,
            profile_id: self.profile_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Admin,
    Doctor,
    Patient,
    Hospital,
}

/// コネクションが振る舞う唯一のエンティティ。解決後は変更されない。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedEntity {
    pub id: EntityId,
    pub kind: EntityKind,
}

impl ResolvedEntity {
    pub fn new(id: EntityId, kind: EntityKind) -> Self {
        Self { id, kind }
    }
}

/// 関係グラフのノード種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    User,
    Doctor,
    Patient,
    Hospital,
}

/// グラフノードへの型付き参照
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    pub kind: NodeKind,
    pub id: String,
}

impl NodeRef {
    pub fn new(kind: NodeKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn user(id: &UserId) -> Self {
        Self::new(NodeKind::User, id.as_str())
    }

    pub fn doctor(id: &EntityId) -> Self {
        Self::new(NodeKind::Doctor, id.as_str())
    }

    pub fn patient(id: &EntityId) -> Self {
        Self::new(NodeKind::Patient, id.as_str())
    }

    pub fn hospital(id: &EntityId) -> Self {
        Self::new(NodeKind::Hospital, id.as_str())
    }
}

/// ユーザー↔患者エッジのラベル
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationLabel {
    #[serde(rename = "self")]
    Oneself,
    Wife,
    Husband,
    Child,
    Parent,
    Guardian,
    Other,
}

/// 関係グラフの有向・型付きエッジ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationEdge {
    pub id: EdgeId,
    pub from: NodeRef,
    pub to: NodeRef,
    #[serde(default)]
    pub label: Option<RelationLabel>,
}

impl RelationEdge {
    /// このエッジが `a` と `b` を（向きを問わず）結ぶか
    pub fn connects(&self, a: &NodeRef, b: &NodeRef) -> bool {
        (&self.from == a && &self.to == b) || (&self.from == b && &self.to == a)
    }

    /// `node` が端点の場合、反対側の端点
    pub fn other_end(&self, node: &NodeRef) -> Option<&NodeRef> {
        if &self.from == node {
            Some(&self.to)
        } else if &self.to == node {
            Some(&self.from)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomKind {
    Chat,
    AiSession,
}

/// ルームに参加できるエンティティ
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Participant {
    pub kind: EntityKind,
    pub id: EntityId,
}

/// ルームストアが返すルームの読み取りモデル
///
/// チャットルームは医師と患者を、AI セッションルームはセッションを所有する
/// 1 人の患者を参加者に持つ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub id: RoomId,
    pub kind: RoomKind,
    pub participants: Vec<Participant>,
    pub ended: bool,
}

impl Room {
    pub fn chat(id: RoomId, doctor_id: EntityId, patient_id: EntityId) -> Self {
        Self {
            id,
            kind: RoomKind::Chat,
            participants: vec![
                Participant {
                    kind: EntityKind::Doctor,
                    id: doctor_id,
                },
                Participant {
                    kind: EntityKind::Patient,
                    id: patient_id,
                },
            ],
            ended: false,
        }
    }

    pub fn ai_session(id: RoomId, owner_patient_id: EntityId, ended: bool) -> Self {
        Self {
            id,
            kind: RoomKind::AiSession,
            participants: vec![Participant {
                kind: EntityKind::Patient,
                id: owner_patient_id,
            }],
            ended,
        }
    }

    /// AI セッションルームの所有者
    pub fn owner(&self) -> Option<&Participant> {
        match self.kind {
            RoomKind::AiSession => self.participants.first(),
            RoomKind::Chat => None,
        }
    }

    pub fn has_participant(&self, entity: &ResolvedEntity) -> bool {
        self.participants
            .iter()
            .any(|p| p.id == entity.id && p.kind == entity.kind)
    }
}

/// 保存されたターンの発言者
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnAuthor {
    Participant(ResolvedEntity),
    Assistant,
}

/// ルーム（チャットまたはインタビュー）で保存された 1 件の発言
#[derive(Debug, Clone, PartialEq)]
pub struct TurnRecord {
    pub room_id: RoomId,
    pub author: TurnAuthor,
    pub text: String,
    pub metadata: serde_json::Value,
    pub timestamp: Timestamp,
}
