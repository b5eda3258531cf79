pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod summarizer;

pub use config::RecapConfig;
pub use error::RecapError;
pub use models::meeting::{Meeting, MeetingPreview, NewMeeting};
pub use summarizer::{Summarization, SummarizerClient, SummarizerError};
