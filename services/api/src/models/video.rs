//! Video listing models: enriched video documents and the listing query

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reduced owner projection joined onto every listed video
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoOwner {
    pub username: String,
    pub full_name: String,
    pub avatar: String,
}

/// Video document with its owner collapsed into a single object
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoWithOwner {
    pub id: Uuid,
    pub owner: VideoOwner,
    pub video_file: String,
    pub thumbnail: String,
    pub title: String,
    pub description: String,
    pub duration: f64,
    pub views: i64,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

/// Query parameters for video listing
///
/// `limit` arrives as a raw string and is coerced leniently: anything that
/// does not parse as a positive integer falls back to the default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoQuery {
    /// Page number (1-based)
    pub page: Option<u32>,
    /// Number of items per page
    pub limit: Option<String>,
    /// Free-text search over title and description
    pub query: Option<String>,
    /// Sort field
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
    /// Sort order ("asc" or "desc")
    #[serde(rename = "sortType")]
    pub sort_type: Option<String>,
}

impl VideoQuery {
    pub const DEFAULT_LIMIT: i64 = 10;

    /// Effective (limit, offset) with defaults applied and offset computed
    /// as (page - 1) * limit
    pub fn pagination(&self) -> (i64, i64) {
        let page = i64::from(self.page.unwrap_or(1).max(1));
        let limit = self
            .limit
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(Self::DEFAULT_LIMIT);

        (limit, (page - 1) * limit)
    }

    /// Sort column, whitelisted against the actual schema so the identifier
    /// can be spliced into SQL safely
    pub fn sort_column(&self) -> &'static str {
        match self.sort_by.as_deref() {
            Some("views") => "views",
            Some("duration") => "duration",
            Some("title") => "title",
            // "createdAt" is the contract name of the default column
            _ => "created_at",
        }
    }

    /// Sort direction as a SQL keyword; descending unless "asc" was asked
    pub fn sort_direction(&self) -> &'static str {
        match self.sort_type.as_deref() {
            Some("asc") => "ASC",
            _ => "DESC",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        let query = VideoQuery::default();
        assert_eq!(query.pagination(), (10, 0));
    }

    #[test]
    fn test_pagination_offset() {
        let query = VideoQuery {
            page: Some(2),
            limit: Some("2".to_string()),
            ..Default::default()
        };
        // page 2 with limit 2 skips the first two items
        assert_eq!(query.pagination(), (2, 2));

        let query = VideoQuery {
            page: Some(3),
            limit: Some("10".to_string()),
            ..Default::default()
        };
        assert_eq!(query.pagination(), (10, 20));
    }

    #[test]
    fn test_non_numeric_limit_coerced_to_default() {
        let query = VideoQuery {
            limit: Some("abc".to_string()),
            ..Default::default()
        };
        assert_eq!(query.pagination(), (10, 0));

        let query = VideoQuery {
            limit: Some("-3".to_string()),
            ..Default::default()
        };
        assert_eq!(query.pagination(), (10, 0));
    }

    #[test]
    fn test_sort_whitelist() {
        let query = VideoQuery {
            sort_by: Some("views".to_string()),
            sort_type: Some("asc".to_string()),
            ..Default::default()
        };
        assert_eq!(query.sort_column(), "views");
        assert_eq!(query.sort_direction(), "ASC");

        // unknown columns fall back to creation time, unknown directions
        // to descending
        let query = VideoQuery {
            sort_by: Some("password_hash; DROP TABLE users".to_string()),
            sort_type: Some("sideways".to_string()),
            ..Default::default()
        };
        assert_eq!(query.sort_column(), "created_at");
        assert_eq!(query.sort_direction(), "DESC");
    }
}
