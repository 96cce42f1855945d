use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// One row per (post, calendar day), accumulated by upsert increments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyStat {
    pub id: Uuid,
    pub post_id: Uuid,
    pub date: Date,
    pub view_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}
