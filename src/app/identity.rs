use anyhow::Result;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::user::{IdentityClaim, PublicUser, User};
use crate::infra::db::Db;

#[derive(Clone)]
pub struct IdentityService {
    db: Db,
}

impl IdentityService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Store the caller's identity on first sight, or refresh the stored name
    /// when the provider reports a new one. One upsert keyed on the token
    /// identifier, so concurrent first-time syncs cannot create two rows.
    pub async fn sync_user(&self, claim: &IdentityClaim) -> Result<Uuid> {
        let name = claim
            .name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| "Anonymous".to_string());
        let email = claim.email.clone().unwrap_or_default();

        let user_id: Uuid = sqlx::query_scalar(
            "INSERT INTO users (token_identifier, name, email, username, avatar_url) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (token_identifier) DO UPDATE \
             SET name = EXCLUDED.name, last_active_at = now() \
             RETURNING id",
        )
        .bind(&claim.token_identifier)
        .bind(&name)
        .bind(&email)
        .bind(&claim.username)
        .bind(&claim.avatar_url)
        .fetch_one(self.db.pool())
        .await?;

        Ok(user_id)
    }

    pub async fn current_user(&self, token_identifier: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, token_identifier, name, email, username, avatar_url, \
                    created_at, last_active_at \
             FROM users WHERE token_identifier = $1",
        )
        .bind(token_identifier)
        .fetch_optional(self.db.pool())
        .await?;

        let user = row.map(|row| User {
            id: row.get("id"),
            token_identifier: row.get("token_identifier"),
            name: row.get("name"),
            email: row.get("email"),
            username: row.get("username"),
            avatar_url: row.get("avatar_url"),
            created_at: row.get("created_at"),
            last_active_at: row.get("last_active_at"),
        });

        Ok(user)
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<Option<PublicUser>> {
        let row = sqlx::query(
            "SELECT u.id, u.name, u.username, u.avatar_url, u.created_at, \
                    (SELECT COUNT(*) FROM follows WHERE following_id = u.id) AS followers_count, \
                    (SELECT COUNT(*) FROM follows WHERE follower_id = u.id) AS following_count, \
                    (SELECT COUNT(*) FROM posts WHERE author_id = u.id AND status = 'published') AS posts_count \
             FROM users u WHERE u.id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.db.pool())
        .await?;

        let user = row.map(|row| PublicUser {
            id: row.get("id"),
            name: row.get("name"),
            username: row.get("username"),
            avatar_url: row.get("avatar_url"),
            created_at: row.get("created_at"),
            followers_count: row.get("followers_count"),
            following_count: row.get("following_count"),
            posts_count: row.get("posts_count"),
        });

        Ok(user)
    }
}
