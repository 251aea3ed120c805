//! Video repository: published-only listing with search, sort, and
//! pagination, owner identity joined onto every row

use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{VideoOwner, VideoQuery, VideoWithOwner};

const VIDEO_COLUMNS: &str = "v.id, v.title, v.description, v.video_url, v.thumbnail_url, \
     v.duration, v.views, v.is_published, v.created_at, \
     u.username, u.full_name, u.avatar_url";

fn video_from_row(row: &PgRow) -> VideoWithOwner {
    VideoWithOwner {
        id: row.get("id"),
        owner: VideoOwner {
            username: row.get("username"),
            full_name: row.get("full_name"),
            avatar: row.get("avatar_url"),
        },
        video_file: row.get("video_url"),
        thumbnail: row.get("thumbnail_url"),
        title: row.get("title"),
        description: row.get("description"),
        duration: row.get("duration"),
        views: row.get("views"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
    }
}

/// Escape LIKE wildcards so a search term matches literally
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Video repository
#[derive(Clone)]
pub struct VideoRepository {
    pool: PgPool,
}

impl VideoRepository {
    /// Create a new video repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List published videos, optionally filtered by a case-insensitive
    /// substring match over title and description
    pub async fn list(&self, query: &VideoQuery) -> Result<Vec<VideoWithOwner>> {
        let (limit, offset) = query.pagination();
        let order_by = format!("v.{} {}", query.sort_column(), query.sort_direction());

        let rows = match query.query.as_deref().filter(|q| !q.trim().is_empty()) {
            Some(term) => {
                let pattern = format!("%{}%", escape_like(term));
                sqlx::query(&format!(
                    r#"
                    SELECT {VIDEO_COLUMNS}
                    FROM videos v
                    JOIN users u ON u.id = v.owner_id
                    WHERE v.is_published = TRUE
                      AND (v.title ILIKE $1 ESCAPE '\' OR v.description ILIKE $1 ESCAPE '\')
                    ORDER BY {order_by}
                    LIMIT $2 OFFSET $3
                    "#,
                ))
                .bind(pattern)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    r#"
                    SELECT {VIDEO_COLUMNS}
                    FROM videos v
                    JOIN users u ON u.id = v.owner_id
                    WHERE v.is_published = TRUE
                    ORDER BY {order_by}
                    LIMIT $1 OFFSET $2
                    "#,
                ))
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.iter().map(video_from_row).collect())
    }

    /// List a user's published videos, sorted by creation time
    pub async fn list_by_owner(
        &self,
        owner_id: Uuid,
        query: &VideoQuery,
    ) -> Result<Vec<VideoWithOwner>> {
        let (limit, offset) = query.pagination();

        let rows = sqlx::query(&format!(
            r#"
            SELECT {VIDEO_COLUMNS}
            FROM videos v
            JOIN users u ON u.id = v.owner_id
            WHERE v.is_published = TRUE AND v.owner_id = $1
            ORDER BY v.created_at {}
            LIMIT $2 OFFSET $3
            "#,
            query.sort_direction(),
        ))
        .bind(owner_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(video_from_row).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("plain"), "plain");
        assert_eq!(escape_like("50%"), "50\\%");
        assert_eq!(escape_like("snake_case"), "snake\\_case");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
    }
}
