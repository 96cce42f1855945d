use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::Row;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::post::{Post, PostStatus};
use crate::domain::stats::DailyStat;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct PostService {
    db: Db,
}

#[derive(Debug, Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub category: Option<String>,
    pub featured_image_url: Option<String>,
}

pub(crate) const POST_COLUMNS: &str =
    "p.id, p.author_id, u.name AS author_name, p.title, p.content, \
     p.status::text AS status, p.tags, p.category, p.featured_image_url, \
     p.view_count, p.like_count, p.created_at, p.updated_at, p.published_at, \
     p.scheduled_at";

impl PostService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn create_post(
        &self,
        author_id: Uuid,
        title: String,
        content: String,
        tags: Vec<String>,
        category: Option<String>,
        featured_image_url: Option<String>,
    ) -> Result<Post> {
        let row = sqlx::query(&format!(
            "WITH inserted_post AS ( \
                INSERT INTO posts (author_id, title, content, tags, category, featured_image_url) \
                VALUES ($1, $2, $3, $4, $5, $6) \
                RETURNING * \
             ) \
             SELECT {} FROM inserted_post p JOIN users u ON u.id = p.author_id",
            POST_COLUMNS
        ))
        .bind(author_id)
        .bind(title)
        .bind(content)
        .bind(tags)
        .bind(category)
        .bind(featured_image_url)
        .fetch_one(self.db.pool())
        .await?;

        map_post(&row)
    }

    pub async fn update_post(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        changes: PostChanges,
    ) -> Result<Option<Post>> {
        let row = sqlx::query(&format!(
            "WITH updated_post AS ( \
                UPDATE posts \
                SET title = COALESCE($3, title), \
                    content = COALESCE($4, content), \
                    tags = COALESCE($5, tags), \
                    category = COALESCE($6, category), \
                    featured_image_url = COALESCE($7, featured_image_url), \
                    updated_at = now() \
                WHERE id = $1 AND author_id = $2 \
                RETURNING * \
             ) \
             SELECT {} FROM updated_post p JOIN users u ON u.id = p.author_id",
            POST_COLUMNS
        ))
        .bind(post_id)
        .bind(author_id)
        .bind(changes.title)
        .bind(changes.content)
        .bind(changes.tags)
        .bind(changes.category)
        .bind(changes.featured_image_url)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(map_post).transpose()
    }

    /// Draft to published, one direction only. `published_at` is set here and
    /// nowhere else.
    pub async fn publish_post(&self, post_id: Uuid, author_id: Uuid) -> Result<Option<Post>> {
        let row = sqlx::query(&format!(
            "WITH updated_post AS ( \
                UPDATE posts \
                SET status = 'published', published_at = now(), updated_at = now() \
                WHERE id = $1 AND author_id = $2 AND status = 'draft' \
                RETURNING * \
             ) \
             SELECT {} FROM updated_post p JOIN users u ON u.id = p.author_id",
            POST_COLUMNS
        ))
        .bind(post_id)
        .bind(author_id)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(map_post).transpose()
    }

    pub async fn schedule_post(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        scheduled_at: OffsetDateTime,
    ) -> Result<Option<Post>> {
        let row = sqlx::query(&format!(
            "WITH updated_post AS ( \
                UPDATE posts \
                SET scheduled_at = $3, updated_at = now() \
                WHERE id = $1 AND author_id = $2 AND status = 'draft' \
                RETURNING * \
             ) \
             SELECT {} FROM updated_post p JOIN users u ON u.id = p.author_id",
            POST_COLUMNS
        ))
        .bind(post_id)
        .bind(author_id)
        .bind(scheduled_at)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(map_post).transpose()
    }

    /// Published posts are public; drafts are visible to their author only.
    pub async fn get_post(&self, post_id: Uuid, viewer_id: Option<Uuid>) -> Result<Option<Post>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM posts p JOIN users u ON u.id = p.author_id \
             WHERE p.id = $1 AND (p.status = 'published' OR p.author_id = $2)",
            POST_COLUMNS
        ))
        .bind(post_id)
        .bind(viewer_id)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(map_post).transpose()
    }

    pub async fn delete_post(&self, post_id: Uuid, author_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1 AND author_id = $2")
            .bind(post_id)
            .bind(author_id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn list_by_author(
        &self,
        author_id: Uuid,
        viewer_id: Option<Uuid>,
        status: Option<PostStatus>,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> Result<Vec<Post>> {
        // Drafts never leave their author's own listing, whatever the filter says.
        let own_listing = viewer_id == Some(author_id);
        let status_filter = match (own_listing, status) {
            (true, any) => any,
            (false, _) => Some(PostStatus::Published),
        };

        let rows = match cursor {
            Some((created_at, post_id)) => {
                sqlx::query(&format!(
                    "SELECT {} FROM posts p JOIN users u ON u.id = p.author_id \
                     WHERE p.author_id = $1 \
                       AND ($2::post_status IS NULL OR p.status = $2::post_status) \
                       AND (p.created_at < $3 OR (p.created_at = $3 AND p.id < $4)) \
                     ORDER BY p.created_at DESC, p.id DESC \
                     LIMIT $5",
                    POST_COLUMNS
                ))
                .bind(author_id)
                .bind(status_filter.map(|status| status.as_db()))
                .bind(created_at)
                .bind(post_id)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {} FROM posts p JOIN users u ON u.id = p.author_id \
                     WHERE p.author_id = $1 \
                       AND ($2::post_status IS NULL OR p.status = $2::post_status) \
                     ORDER BY p.created_at DESC, p.id DESC \
                     LIMIT $3",
                    POST_COLUMNS
                ))
                .bind(author_id)
                .bind(status_filter.map(|status| status.as_db()))
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
        };

        rows.iter().map(map_post).collect()
    }

    /// Atomic view accounting: the post counter and the per-day row move in
    /// one transaction, both as storage-side increments.
    pub async fn record_view(&self, post_id: Uuid) -> Result<bool> {
        let mut tx = self.db.pool().begin().await?;

        let updated = sqlx::query(
            "UPDATE posts SET view_count = view_count + 1 \
             WHERE id = $1 AND status = 'published'",
        )
        .bind(post_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO daily_stats (post_id, date, view_count) \
             VALUES ($1, CURRENT_DATE, 1) \
             ON CONFLICT (post_id, date) DO UPDATE \
             SET view_count = daily_stats.view_count + 1, updated_at = now()",
        )
        .bind(post_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Daily view rows for a post, newest day first. Author-only; returns
    /// None when the post does not exist or belongs to someone else.
    pub async fn daily_stats(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        limit: i64,
    ) -> Result<Option<Vec<DailyStat>>> {
        let owner: Option<Uuid> =
            sqlx::query_scalar("SELECT author_id FROM posts WHERE id = $1")
                .bind(post_id)
                .fetch_optional(self.db.pool())
                .await?;

        match owner {
            Some(owner) if owner == author_id => {}
            _ => return Ok(None),
        }

        let rows = sqlx::query(
            "SELECT id, post_id, date, view_count, updated_at \
             FROM daily_stats WHERE post_id = $1 \
             ORDER BY date DESC LIMIT $2",
        )
        .bind(post_id)
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        let mut stats = Vec::with_capacity(rows.len());
        for row in rows {
            stats.push(DailyStat {
                id: row.get("id"),
                post_id: row.get("post_id"),
                date: row.get("date"),
                view_count: row.get("view_count"),
                updated_at: row.get("updated_at"),
            });
        }

        Ok(Some(stats))
    }
}

pub(crate) fn map_post(row: &PgRow) -> Result<Post> {
    let status: String = row.get("status");
    let status = PostStatus::from_db(&status)
        .ok_or_else(|| anyhow::anyhow!("unknown post status: {}", status))?;

    Ok(Post {
        id: row.get("id"),
        author_id: row.get("author_id"),
        author_name: Some(row.get("author_name")),
        title: row.get("title"),
        content: row.get("content"),
        status,
        tags: row.get("tags"),
        category: row.get("category"),
        featured_image_url: row.get("featured_image_url"),
        view_count: row.get("view_count"),
        like_count: row.get("like_count"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        published_at: row.get("published_at"),
        scheduled_at: row.get("scheduled_at"),
    })
}
