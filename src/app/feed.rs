use anyhow::Result;
use redis::AsyncCommands;
use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;

use crate::app::posts::{map_post, POST_COLUMNS};
use crate::domain::post::Post;
use crate::infra::{cache::RedisCache, db::Db};

#[derive(Clone)]
pub struct FeedService {
    db: Db,
    cache: RedisCache,
}

const FEED_CACHE_TTL_SECONDS: u64 = 30;
const FEED_CACHE_PREFIX: &str = "feed:public";

impl FeedService {
    pub fn new(db: Db, cache: RedisCache) -> Self {
        Self { db, cache }
    }

    /// Published posts, newest publish first. Only the first page is cached;
    /// every mutation of the published set deletes the key (see
    /// `invalidate`), so reads still observe all prior writes.
    pub async fn public_feed(
        &self,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> Result<(Vec<Post>, Option<(OffsetDateTime, Uuid)>)> {
        let cache_key = format!("{}:{}", FEED_CACHE_PREFIX, limit);
        if cursor.is_none() {
            if let Ok(mut conn) = self.cache.client().get_multiplexed_async_connection().await {
                if let Ok(Some(payload)) = conn.get::<_, Option<String>>(&cache_key).await {
                    if let Ok(posts) = serde_json::from_str::<Vec<Post>>(&payload) {
                        return Ok((posts, None));
                    }
                }
            }
        }

        let limit_plus = limit + 1;
        let rows = match cursor {
            Some((published_at, post_id)) => {
                sqlx::query(&format!(
                    "SELECT {} FROM posts p JOIN users u ON u.id = p.author_id \
                     WHERE p.status = 'published' \
                       AND (p.published_at < $1 OR (p.published_at = $1 AND p.id < $2)) \
                     ORDER BY p.published_at DESC, p.id DESC \
                     LIMIT $3",
                    POST_COLUMNS
                ))
                .bind(published_at)
                .bind(post_id)
                .bind(limit_plus)
                .fetch_all(self.db.pool())
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {} FROM posts p JOIN users u ON u.id = p.author_id \
                     WHERE p.status = 'published' \
                     ORDER BY p.published_at DESC, p.id DESC \
                     LIMIT $1",
                    POST_COLUMNS
                ))
                .bind(limit_plus)
                .fetch_all(self.db.pool())
                .await?
            }
        };

        let mut posts = rows.iter().map(map_post).collect::<Result<Vec<_>>>()?;

        let next_cursor = if posts.len() > limit as usize {
            let extra = posts.pop().expect("checked len");
            extra.published_at.map(|published_at| (published_at, extra.id))
        } else {
            None
        };

        if cursor.is_none() {
            if let Ok(mut conn) = self.cache.client().get_multiplexed_async_connection().await {
                if let Ok(payload) = serde_json::to_string(&posts) {
                    if let Err(err) = conn
                        .set_ex::<_, _, ()>(&cache_key, payload, FEED_CACHE_TTL_SECONDS)
                        .await
                    {
                        warn!(error = ?err, "failed to write feed cache");
                    }
                }
            }
        }

        Ok((posts, next_cursor))
    }

    /// Drop every cached first page after any write that changes what the
    /// public feed shows.
    pub async fn invalidate(&self) {
        if let Ok(mut conn) = self.cache.client().get_multiplexed_async_connection().await {
            let pattern = format!("{}:*", FEED_CACHE_PREFIX);
            if let Ok(keys) = conn.keys::<_, Vec<String>>(&pattern).await {
                if !keys.is_empty() {
                    let _ = conn.del::<_, ()>(keys).await;
                }
            }
        }
    }
}
