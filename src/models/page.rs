use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Rendering type of a content page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentType {
    Markdown,
    Html,
}

impl FromStr for ContentType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "MARKDOWN" => Ok(ContentType::Markdown),
            "HTML" => Ok(ContentType::Html),
            other => Err(AppError::InvalidInput(format!(
                "invalid content type '{}'",
                other
            ))),
        }
    }
}

/// Content page stored under `page:{normalizedName}`.
/// The normalized name is both the primary key and the page's slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRecord {
    pub name: String,
    pub title: String,
    pub content: String,
    pub content_type: ContentType,
    /// When the page was last written (Unix timestamp)
    pub created_at: i64,
}

/// Input for creating or updating a page
#[derive(Debug, Clone)]
pub struct PageDraft {
    pub name: String,
    pub title: String,
    pub content: String,
    pub content_type: ContentType,
}
