use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookmarkKind {
    Club,
    Event,
}

impl BookmarkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookmarkKind::Club => "club",
            BookmarkKind::Event => "event",
        }
    }
}

impl std::str::FromStr for BookmarkKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "club" => Ok(BookmarkKind::Club),
            "event" => Ok(BookmarkKind::Event),
            _ => Err("Invalid bookmark type. Must be one of: club, event".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub id: String,
    pub user_email: String,
    pub target_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub created_at: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct BookmarkQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}
