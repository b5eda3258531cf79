//! Meeting store — SQL queries over the shared connection pool
//!
//! All writes run inside explicit transactions so a failed commit leaves no
//! partial row behind. List and search queries are read-only.

use recap_core::models::meeting::{Meeting, NewMeeting};
use recap_core::RecapError;
use sqlx::PgPool;

/// Default page size for list queries.
pub const DEFAULT_PER_PAGE: i64 = 20;

const MEETING_COLUMNS: &str =
    "id, title, date, language, transcript, summary, created_at, updated_at";

/// Search + pagination inputs for [`list_meetings`]. `page` is 1-indexed;
/// out-of-range values are clamped up to 1.
#[derive(Debug, Clone)]
pub struct ListParams {
    pub search: Option<String>,
    pub page: i64,
    pub per_page: i64,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            search: None,
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

/// One page of list results plus pagination totals.
#[derive(Debug)]
pub struct MeetingPage {
    pub items: Vec<Meeting>,
    pub total: i64,
    pub pages: i64,
    pub page: i64,
}

pub async fn create_meeting(pool: &PgPool, fields: NewMeeting) -> Result<Meeting, RecapError> {
    let mut tx = pool.begin().await?;

    let meeting = sqlx::query_as::<_, Meeting>(&format!(
        r#"
        INSERT INTO meetings (title, date, language, transcript, summary)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {MEETING_COLUMNS}
        "#,
    ))
    .bind(&fields.title)
    .bind(fields.date)
    .bind(&fields.language)
    .bind(&fields.transcript)
    .bind(&fields.summary)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(meeting_id = meeting.id, "Stored meeting");

    Ok(meeting)
}

pub async fn get_meeting(pool: &PgPool, id: i32) -> Result<Meeting, RecapError> {
    sqlx::query_as::<_, Meeting>(&format!(
        "SELECT {MEETING_COLUMNS} FROM meetings WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(RecapError::NotFound(id))
}

/// List meetings ordered by `created_at` descending. A non-empty `search`
/// filters to rows whose title or transcript contains it as a
/// case-insensitive substring. Pages past the end yield an empty item list
/// with totals unchanged.
pub async fn list_meetings(pool: &PgPool, params: &ListParams) -> Result<MeetingPage, RecapError> {
    let page = params.page.max(1);
    let per_page = params.per_page.max(1);

    let pattern = params
        .search
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", s));

    let total: i64 = match &pattern {
        Some(p) => {
            sqlx::query_scalar(
                "SELECT COUNT(*) FROM meetings WHERE title ILIKE $1 OR transcript ILIKE $1",
            )
            .bind(p)
            .fetch_one(pool)
            .await?
        }
        None => {
            sqlx::query_scalar("SELECT COUNT(*) FROM meetings")
                .fetch_one(pool)
                .await?
        }
    };

    let offset = (page - 1) * per_page;

    let items = match &pattern {
        Some(p) => {
            sqlx::query_as::<_, Meeting>(&format!(
                r#"
                SELECT {MEETING_COLUMNS} FROM meetings
                WHERE title ILIKE $1 OR transcript ILIKE $1
                ORDER BY created_at DESC
                LIMIT $2 OFFSET $3
                "#,
            ))
            .bind(p)
            .bind(per_page)
            .bind(offset)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, Meeting>(&format!(
                r#"
                SELECT {MEETING_COLUMNS} FROM meetings
                ORDER BY created_at DESC
                LIMIT $1 OFFSET $2
                "#,
            ))
            .bind(per_page)
            .bind(offset)
            .fetch_all(pool)
            .await?
        }
    };

    Ok(MeetingPage {
        items,
        total,
        pages: page_count(total, per_page),
        page,
    })
}

pub async fn delete_meeting(pool: &PgPool, id: i32) -> Result<(), RecapError> {
    let mut tx = pool.begin().await?;

    let deleted = sqlx::query("DELETE FROM meetings WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if deleted.rows_affected() == 0 {
        // Dropping the transaction rolls it back
        return Err(RecapError::NotFound(id));
    }

    tx.commit().await?;

    tracing::info!(meeting_id = id, "Deleted meeting");

    Ok(())
}

/// `ceil(total / per_page)`; zero rows means zero pages.
pub fn page_count(total: i64, per_page: i64) -> i64 {
    (total + per_page - 1) / per_page
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count_rounds_up() {
        assert_eq!(page_count(0, 20), 0);
        assert_eq!(page_count(1, 20), 1);
        assert_eq!(page_count(20, 20), 1);
        assert_eq!(page_count(21, 20), 2);
        assert_eq!(page_count(41, 20), 3);
    }

    #[test]
    fn test_page_count_single_row_pages() {
        assert_eq!(page_count(5, 1), 5);
    }

    #[test]
    fn test_list_params_defaults() {
        let params = ListParams::default();
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, DEFAULT_PER_PAGE);
        assert!(params.search.is_none());
    }
}
