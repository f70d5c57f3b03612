//! ドメイン層で共有する値オブジェクト
//!
//! 識別子はトークン・URL・JSON フレームから届くため、境界で一度だけ検証し、
//! 以降は newtype として持ち回る。

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ValidationError;

/// 文字列の識別子に許す最大長
pub const MAX_ID_LENGTH: usize = 128;

/// チャットメッセージ・インタビューの発話に許す最大長
pub const MAX_CONTENT_LENGTH: usize = 10_000;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn new(value: String) -> Result<Self, ValidationError> {
                if value.trim().is_empty() {
                    return Err(ValidationError::Empty($label));
                }
                if value.chars().count() > MAX_ID_LENGTH {
                    return Err(ValidationError::TooLong($label, MAX_ID_LENGTH));
                }
                Ok(Self(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = ValidationError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::new(value.to_string())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// 認証済みユーザーアカウントの識別子
    UserId,
    "user_id"
);
string_id!(
    /// ドメインエンティティ（医師・患者・病院・管理者）の識別子
    EntityId,
    "entity_id"
);
string_id!(
    /// ルームの識別子（チャット ID または AI セッション ID）
    RoomId,
    "room_id"
);
string_id!(
    /// 保存された関係エッジの識別子
    EdgeId,
    "edge_id"
);

impl EntityId {
    /// 管理者は自身のユーザー ID で振る舞う
    pub fn from_user(user_id: &UserId) -> Self {
        Self(user_id.as_str().to_string())
    }
}

/// 接続中のコネクションの識別子（コネクションレジストリが発行する）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// チャットメッセージまたはインタビューの発話の本文
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageContent(String);

impl MessageContent {
    pub fn new(value: String) -> Result<Self, ValidationError> {
        if value.trim().is_empty() {
            return Err(ValidationError::Empty("content"));
        }
        if value.chars().count() > MAX_CONTENT_LENGTH {
            return Err(ValidationError::TooLong("content", MAX_CONTENT_LENGTH));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for MessageContent {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Unix タイムスタンプ（ミリ秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}
