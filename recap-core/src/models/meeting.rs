use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Title applied when the caller supplies none and no generated title exists.
pub const DEFAULT_TITLE: &str = "Untitled Meeting";

/// Locale tag applied when the caller supplies none.
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Transcript excerpt length for list views, in characters.
pub const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Meeting {
    pub id: i32,
    pub title: String,
    pub date: NaiveDate,
    pub language: String,
    pub transcript: String,
    pub summary: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Reduced projection returned by list queries: metadata plus a transcript
/// excerpt instead of the full transcript and summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingPreview {
    pub id: i32,
    pub title: String,
    pub date: NaiveDate,
    pub language: String,
    pub created_at: DateTime<Utc>,
    pub preview: String,
}

impl Meeting {
    pub fn preview(&self) -> MeetingPreview {
        MeetingPreview {
            id: self.id,
            title: self.title.clone(),
            date: self.date,
            language: self.language.clone(),
            created_at: self.created_at,
            preview: excerpt(&self.transcript),
        }
    }
}

/// First `PREVIEW_CHARS` characters of `text`, with an ellipsis marker when
/// truncated. Counts characters, not bytes, so multibyte transcripts never
/// split mid-codepoint.
fn excerpt(text: &str) -> String {
    if text.chars().count() <= PREVIEW_CHARS {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(PREVIEW_CHARS).collect();
    cut.push_str("...");
    cut
}

/// Field set for a meeting about to be inserted. Construct through
/// [`NewMeeting::from_parts`] so the API defaulting rules are applied in one
/// place.
#[derive(Debug, Clone)]
pub struct NewMeeting {
    pub title: String,
    pub date: NaiveDate,
    pub language: String,
    pub transcript: String,
    pub summary: String,
}

impl NewMeeting {
    /// Applies the defaulting rules of the create contract: blank or absent
    /// title/language fall back to the documented defaults, an absent or
    /// unparsable date falls back to today, transcript and summary default
    /// to empty.
    pub fn from_parts(
        title: Option<String>,
        date: Option<String>,
        language: Option<String>,
        transcript: Option<String>,
        summary: Option<String>,
    ) -> Self {
        Self {
            title: title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            date: parse_meeting_date(date.as_deref()),
            language: language
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            transcript: transcript.unwrap_or_default(),
            summary: summary.unwrap_or_default(),
        }
    }
}

/// Parse a `YYYY-MM-DD` date string, falling back to the current date when
/// the value is absent, blank, or unparsable.
pub fn parse_meeting_date(raw: Option<&str>) -> NaiveDate {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .unwrap_or_else(|| Utc::now().date_naive())
}
