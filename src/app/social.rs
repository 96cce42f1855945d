use anyhow::Result;
use serde::Serialize;
use sqlx::Row;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::infra::db::Db;

#[derive(Clone)]
pub struct SocialService {
    db: Db,
}

#[derive(Debug, Clone, Serialize)]
pub struct FollowEdgeUser {
    pub user_id: Uuid,
    pub name: String,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub followed_at: OffsetDateTime,
}

impl SocialService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Follow toggle: removes the edge if present, creates it otherwise, as
    /// one transaction. Returns None when the target user does not exist,
    /// otherwise whether the caller now follows the target.
    pub async fn toggle_follow(&self, follower_id: Uuid, target_id: Uuid) -> Result<Option<bool>> {
        let mut tx = self.db.pool().begin().await?;

        let target: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE id = $1")
            .bind(target_id)
            .fetch_optional(&mut *tx)
            .await?;
        if target.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }

        let deleted = sqlx::query(
            "DELETE FROM follows WHERE follower_id = $1 AND following_id = $2",
        )
        .bind(follower_id)
        .bind(target_id)
        .execute(&mut *tx)
        .await?;

        if deleted.rows_affected() > 0 {
            tx.commit().await?;
            return Ok(Some(false));
        }

        sqlx::query(
            "INSERT INTO follows (follower_id, following_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(follower_id)
        .bind(target_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(true))
    }

    pub async fn list_followers(
        &self,
        user_id: Uuid,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> Result<Vec<FollowEdgeUser>> {
        let rows = match cursor {
            Some((followed_at, follower_id)) => {
                sqlx::query(
                    "SELECT u.id, u.name, u.username, u.avatar_url, f.created_at AS followed_at \
                     FROM follows f \
                     JOIN users u ON u.id = f.follower_id \
                     WHERE f.following_id = $1 \
                       AND (f.created_at < $2 OR (f.created_at = $2 AND f.follower_id < $3)) \
                     ORDER BY f.created_at DESC, f.follower_id DESC \
                     LIMIT $4",
                )
                .bind(user_id)
                .bind(followed_at)
                .bind(follower_id)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT u.id, u.name, u.username, u.avatar_url, f.created_at AS followed_at \
                     FROM follows f \
                     JOIN users u ON u.id = f.follower_id \
                     WHERE f.following_id = $1 \
                     ORDER BY f.created_at DESC, f.follower_id DESC \
                     LIMIT $2",
                )
                .bind(user_id)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
        };

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(FollowEdgeUser {
                user_id: row.get("id"),
                name: row.get("name"),
                username: row.get("username"),
                avatar_url: row.get("avatar_url"),
                followed_at: row.get("followed_at"),
            });
        }

        Ok(items)
    }

    pub async fn list_following(
        &self,
        user_id: Uuid,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> Result<Vec<FollowEdgeUser>> {
        let rows = match cursor {
            Some((followed_at, following_id)) => {
                sqlx::query(
                    "SELECT u.id, u.name, u.username, u.avatar_url, f.created_at AS followed_at \
                     FROM follows f \
                     JOIN users u ON u.id = f.following_id \
                     WHERE f.follower_id = $1 \
                       AND (f.created_at < $2 OR (f.created_at = $2 AND f.following_id < $3)) \
                     ORDER BY f.created_at DESC, f.following_id DESC \
                     LIMIT $4",
                )
                .bind(user_id)
                .bind(followed_at)
                .bind(following_id)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT u.id, u.name, u.username, u.avatar_url, f.created_at AS followed_at \
                     FROM follows f \
                     JOIN users u ON u.id = f.following_id \
                     WHERE f.follower_id = $1 \
                     ORDER BY f.created_at DESC, f.following_id DESC \
                     LIMIT $2",
                )
                .bind(user_id)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
        };

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(FollowEdgeUser {
                user_id: row.get("id"),
                name: row.get("name"),
                username: row.get("username"),
                avatar_url: row.get("avatar_url"),
                followed_at: row.get("followed_at"),
            });
        }

        Ok(items)
    }
}
