use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Like {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub post_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Who wrote a comment: a synced user (name snapshotted at write time) or an
/// anonymous visitor who supplied a display name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CommentAuthor {
    Registered {
        user_id: Uuid,
        name: String,
    },
    Anonymous {
        name: String,
        email: Option<String>,
    },
}

impl CommentAuthor {
    pub fn name(&self) -> &str {
        match self {
            Self::Registered { name, .. } => name,
            Self::Anonymous { name, .. } => name,
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Self::Registered { user_id, .. } => Some(*user_id),
            Self::Anonymous { .. } => None,
        }
    }

    pub fn email(&self) -> Option<&str> {
        match self {
            Self::Registered { .. } => None,
            Self::Anonymous { email, .. } => email.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author: CommentAuthor,
    pub body: String,
    pub status: CommentStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentStatus {
    Pending,
    Approved,
    Rejected,
}

impl CommentStatus {
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}
