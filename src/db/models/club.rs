use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use super::common::Party;

/// Moderation state of a club
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClubStatus {
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for ClubStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClubStatus::Pending => write!(f, "pending"),
            ClubStatus::Approved => write!(f, "approved"),
            ClubStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for ClubStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ClubStatus::Pending),
            "approved" => Ok(ClubStatus::Approved),
            "rejected" => Ok(ClubStatus::Rejected),
            _ => Err(format!("Unknown club status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Club {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub location: Option<String>,
    pub price: f64,
    pub image: Option<String>,
    pub seller_email: String,
    pub seller_name: Option<String>,
    pub seller_image: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Club {
    pub async fn find(pool: &SqlitePool, id: &str) -> Result<Option<Club>, sqlx::Error> {
        sqlx::query_as::<_, Club>("SELECT * FROM clubs WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn owned_by(pool: &SqlitePool, email: &str) -> Result<Vec<Club>, sqlx::Error> {
        sqlx::query_as::<_, Club>(
            "SELECT * FROM clubs WHERE seller_email = ? ORDER BY created_at DESC",
        )
        .bind(email)
        .fetch_all(pool)
        .await
    }

    pub fn is_free(&self) -> bool {
        self.price <= 0.0
    }

    pub fn seller(&self) -> Party {
        Party {
            email: self.seller_email.clone(),
            name: self.seller_name.clone(),
            image: self.seller_image.clone(),
        }
    }
}

/// Club as returned by the API, with the seller nested
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClubResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub location: Option<String>,
    pub price: f64,
    pub image: Option<String>,
    pub seller: Party,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Club> for ClubResponse {
    fn from(club: Club) -> Self {
        let seller = club.seller();
        Self {
            id: club.id,
            name: club.name,
            description: club.description,
            category: club.category,
            location: club.location,
            price: club.price,
            image: club.image,
            seller,
            status: club.status,
            created_at: club.created_at,
            updated_at: club.updated_at,
        }
    }
}

/// Owned club with membership counters for the manager dashboard
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedClub {
    #[serde(flatten)]
    pub club: ClubResponse,
    pub member_count: usize,
    pub active_bookings: usize,
}

#[derive(Debug, Deserialize)]
pub struct CreateClubRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub location: Option<String>,
    #[serde(default)]
    pub price: f64,
    pub image: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateClubRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub price: Option<f64>,
    pub image: Option<String>,
}

impl UpdateClubRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.location.is_none()
            && self.price.is_none()
            && self.image.is_none()
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateClubStatusRequest {
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ClubQuery {
    pub category: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
}
