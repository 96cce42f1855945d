use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::Row;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::engagement::{Comment, CommentAuthor, CommentStatus, Like};
use crate::infra::db::Db;

#[derive(Clone)]
pub struct EngagementService {
    db: Db,
}

#[derive(Debug, Clone, Copy)]
pub struct LikeToggle {
    pub liked: bool,
    pub like_count: i64,
}

impl EngagementService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Like toggle for a published post. The post row is locked for the
    /// duration so the edge mutation and the counter move together; two
    /// concurrent toggles on the same (post, user) pair serialize and can
    /// never leave two rows.
    pub async fn toggle_like(&self, user_id: Uuid, post_id: Uuid) -> Result<Option<LikeToggle>> {
        let mut tx = self.db.pool().begin().await?;

        let post: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM posts WHERE id = $1 AND status = 'published' FOR UPDATE",
        )
        .bind(post_id)
        .fetch_optional(&mut *tx)
        .await?;
        if post.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }

        let deleted = sqlx::query("DELETE FROM likes WHERE post_id = $1 AND user_id = $2")
            .bind(post_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let toggle = if deleted.rows_affected() > 0 {
            let like_count: i64 = sqlx::query_scalar(
                "UPDATE posts SET like_count = GREATEST(like_count - 1, 0) \
                 WHERE id = $1 RETURNING like_count",
            )
            .bind(post_id)
            .fetch_one(&mut *tx)
            .await?;
            LikeToggle {
                liked: false,
                like_count,
            }
        } else {
            sqlx::query(
                "INSERT INTO likes (post_id, user_id) VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(post_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
            let like_count: i64 = sqlx::query_scalar(
                "UPDATE posts SET like_count = like_count + 1 \
                 WHERE id = $1 RETURNING like_count",
            )
            .bind(post_id)
            .fetch_one(&mut *tx)
            .await?;
            LikeToggle {
                liked: true,
                like_count,
            }
        };

        tx.commit().await?;
        Ok(Some(toggle))
    }

    pub async fn list_likes(
        &self,
        post_id: Uuid,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> Result<Vec<Like>> {
        let rows = match cursor {
            Some((created_at, like_id)) => {
                sqlx::query(
                    "SELECT id, user_id, post_id, created_at \
                     FROM likes \
                     WHERE post_id = $1 \
                       AND (created_at < $2 OR (created_at = $2 AND id < $3)) \
                     ORDER BY created_at DESC, id DESC \
                     LIMIT $4",
                )
                .bind(post_id)
                .bind(created_at)
                .bind(like_id)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, user_id, post_id, created_at \
                     FROM likes \
                     WHERE post_id = $1 \
                     ORDER BY created_at DESC, id DESC \
                     LIMIT $2",
                )
                .bind(post_id)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
        };

        let mut likes = Vec::with_capacity(rows.len());
        for row in rows {
            likes.push(Like {
                id: row.get("id"),
                user_id: row.get("user_id"),
                post_id: row.get("post_id"),
                created_at: row.get("created_at"),
            });
        }

        Ok(likes)
    }

    /// New comments land as pending until the post's author moderates them.
    /// Returns None when the post does not exist or is not published.
    pub async fn create_comment(
        &self,
        post_id: Uuid,
        author: CommentAuthor,
        body: String,
    ) -> Result<Option<Comment>> {
        let post: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM posts WHERE id = $1 AND status = 'published'",
        )
        .bind(post_id)
        .fetch_optional(self.db.pool())
        .await?;
        if post.is_none() {
            return Ok(None);
        }

        let row = sqlx::query(
            "INSERT INTO comments (post_id, author_id, author_name, author_email, body) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, post_id, author_id, author_name, author_email, body, \
                       status::text AS status, created_at",
        )
        .bind(post_id)
        .bind(author.user_id())
        .bind(author.name())
        .bind(author.email())
        .bind(body)
        .fetch_one(self.db.pool())
        .await?;

        Ok(Some(map_comment(&row)?))
    }

    pub async fn list_comments(
        &self,
        post_id: Uuid,
        status: CommentStatus,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> Result<Vec<Comment>> {
        let rows = match cursor {
            Some((created_at, comment_id)) => {
                sqlx::query(
                    "SELECT id, post_id, author_id, author_name, author_email, body, \
                            status::text AS status, created_at \
                     FROM comments \
                     WHERE post_id = $1 AND status = $2::comment_status \
                       AND (created_at < $3 OR (created_at = $3 AND id < $4)) \
                     ORDER BY created_at DESC, id DESC \
                     LIMIT $5",
                )
                .bind(post_id)
                .bind(status.as_db())
                .bind(created_at)
                .bind(comment_id)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, post_id, author_id, author_name, author_email, body, \
                            status::text AS status, created_at \
                     FROM comments \
                     WHERE post_id = $1 AND status = $2::comment_status \
                     ORDER BY created_at DESC, id DESC \
                     LIMIT $3",
                )
                .bind(post_id)
                .bind(status.as_db())
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
        };

        rows.iter().map(map_comment).collect()
    }

    /// Approve or reject a comment. Only the post's author may moderate.
    pub async fn moderate_comment(
        &self,
        comment_id: Uuid,
        post_id: Uuid,
        post_author_id: Uuid,
        status: CommentStatus,
    ) -> Result<Option<Comment>> {
        let row = sqlx::query(
            "UPDATE comments \
             SET status = $4::comment_status \
             WHERE id = $1 AND post_id = $2 \
               AND EXISTS (SELECT 1 FROM posts WHERE id = $2 AND author_id = $3) \
             RETURNING id, post_id, author_id, author_name, author_email, body, \
                       status::text AS status, created_at",
        )
        .bind(comment_id)
        .bind(post_id)
        .bind(post_author_id)
        .bind(status.as_db())
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(map_comment).transpose()
    }

    /// Deletable by the comment's registered author or the post's author.
    pub async fn delete_comment(
        &self,
        comment_id: Uuid,
        post_id: Uuid,
        caller_id: Uuid,
    ) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM comments \
             WHERE id = $1 AND post_id = $2 \
               AND (author_id = $3 \
                    OR EXISTS (SELECT 1 FROM posts WHERE id = $2 AND author_id = $3))",
        )
        .bind(comment_id)
        .bind(post_id)
        .bind(caller_id)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn map_comment(row: &PgRow) -> Result<Comment> {
    let status: String = row.get("status");
    let status = CommentStatus::from_db(&status)
        .ok_or_else(|| anyhow::anyhow!("unknown comment status: {}", status))?;

    let author_id: Option<Uuid> = row.get("author_id");
    let author_name: String = row.get("author_name");
    let author = match author_id {
        Some(user_id) => CommentAuthor::Registered {
            user_id,
            name: author_name,
        },
        None => CommentAuthor::Anonymous {
            name: author_name,
            email: row.get("author_email"),
        },
    };

    Ok(Comment {
        id: row.get("id"),
        post_id: row.get("post_id"),
        author,
        body: row.get("body"),
        status,
        created_at: row.get("created_at"),
    })
}
