//! Club events and member registrations.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// Registration status. `Rejected` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    /// Awaiting the manager's decision
    Registered,
    Confirmed,
    Rejected,
    Cancelled,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Registered => "registered",
            RegistrationStatus::Confirmed => "confirmed",
            RegistrationStatus::Rejected => "rejected",
            RegistrationStatus::Cancelled => "cancelled",
        }
    }

    /// Counts against capacity and blocks a second registration
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            RegistrationStatus::Registered | RegistrationStatus::Confirmed
        )
    }
}

impl std::fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RegistrationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "registered" => Ok(RegistrationStatus::Registered),
            "confirmed" => Ok(RegistrationStatus::Confirmed),
            "rejected" => Ok(RegistrationStatus::Rejected),
            "cancelled" => Ok(RegistrationStatus::Cancelled),
            _ => Err(format!("Unknown registration status: {}", s)),
        }
    }
}

impl From<String> for RegistrationStatus {
    fn from(s: String) -> Self {
        s.parse().unwrap_or_else(|e| {
            tracing::warn!(status = %s, error = %e, "Unreadable stored registration status, treating as registered");
            RegistrationStatus::Registered
        })
    }
}

/// Sort order for the public event listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventSort {
    #[default]
    Newest,
    Oldest,
    FeeHigh,
    FeeLow,
}

impl EventSort {
    pub fn order_by(&self) -> &'static str {
        match self {
            EventSort::Newest => "event_date DESC",
            EventSort::Oldest => "event_date ASC",
            EventSort::FeeHigh => "event_fee DESC, event_date DESC",
            EventSort::FeeLow => "event_fee ASC, event_date DESC",
        }
    }
}

impl std::str::FromStr for EventSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newest" => Ok(EventSort::Newest),
            "oldest" => Ok(EventSort::Oldest),
            "fee-high" => Ok(EventSort::FeeHigh),
            "fee-low" => Ok(EventSort::FeeLow),
            _ => Err(format!(
                "Invalid sort '{}'. Must be one of: newest, oldest, fee-high, fee-low",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub club_id: String,
    pub title: String,
    pub description: String,
    pub event_date: String,
    pub location: Option<String>,
    pub is_paid: bool,
    pub event_fee: f64,
    pub max_attendees: Option<i64>,
    pub manager_email: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Event {
    pub async fn find(pool: &SqlitePool, id: &str) -> Result<Option<Event>, sqlx::Error> {
        sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn managed_by(pool: &SqlitePool, email: &str) -> Result<Vec<Event>, sqlx::Error> {
        sqlx::query_as::<_, Event>(
            "SELECT * FROM events WHERE manager_email = ? ORDER BY event_date ASC",
        )
        .bind(email)
        .fetch_all(pool)
        .await
    }

    pub async fn active_registrations(pool: &SqlitePool, id: &str) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM event_registrations WHERE event_id = ? AND status IN ('registered', 'confirmed')",
        )
        .bind(id)
        .fetch_one(pool)
        .await?;
        Ok(count.0)
    }
}

/// Event with its live registration count
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetail {
    #[serde(flatten)]
    pub event: Event,
    pub registration_count: i64,
    /// Seats left, `None` when the event is uncapped
    pub spots_left: Option<i64>,
}

impl EventDetail {
    pub fn new(event: Event, registration_count: i64) -> Self {
        let spots_left = event
            .max_attendees
            .map(|max| (max - registration_count).max(0));
        Self {
            event,
            registration_count,
            spots_left,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    #[serde(default)]
    pub club_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub event_date: String,
    pub location: Option<String>,
    pub is_paid: Option<bool>,
    pub event_fee: Option<f64>,
    pub max_attendees: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub event_date: Option<String>,
    pub location: Option<String>,
    pub is_paid: Option<bool>,
    pub event_fee: Option<f64>,
    pub max_attendees: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventQuery {
    pub sort: Option<String>,
    pub club_id: Option<String>,
    pub upcoming: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EventRegistration {
    pub id: String,
    pub event_id: String,
    pub user_email: String,
    pub user_name: Option<String>,
    pub status: String,
    pub registered_at: String,
    pub updated_at: String,
}

impl EventRegistration {
    pub fn status_enum(&self) -> RegistrationStatus {
        RegistrationStatus::from(self.status.clone())
    }

    pub async fn find(
        pool: &SqlitePool,
        event_id: &str,
        user_email: &str,
    ) -> Result<Option<EventRegistration>, sqlx::Error> {
        sqlx::query_as::<_, EventRegistration>(
            "SELECT * FROM event_registrations WHERE event_id = ? AND user_email = ?",
        )
        .bind(event_id)
        .bind(user_email)
        .fetch_optional(pool)
        .await
    }
}

/// Registration joined with its event, for dashboards and "my registrations"
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationWithEvent {
    pub id: String,
    pub event_id: String,
    pub user_email: String,
    pub user_name: Option<String>,
    pub status: String,
    pub registered_at: String,
    pub event_title: String,
    pub event_date: String,
    pub club_id: String,
}

#[derive(Debug, Deserialize)]
pub struct AdjudicateRegistrationRequest {
    #[serde(default)]
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_keys() {
        assert_eq!("newest".parse::<EventSort>(), Ok(EventSort::Newest));
        assert_eq!("oldest".parse::<EventSort>(), Ok(EventSort::Oldest));
        assert_eq!("fee-high".parse::<EventSort>(), Ok(EventSort::FeeHigh));
        assert_eq!("fee-low".parse::<EventSort>(), Ok(EventSort::FeeLow));
        assert!("popular".parse::<EventSort>().is_err());
        assert_eq!(EventSort::default().order_by(), "event_date DESC");
    }

    #[test]
    fn test_active_registration_states() {
        assert!(RegistrationStatus::Registered.is_active());
        assert!(RegistrationStatus::Confirmed.is_active());
        assert!(!RegistrationStatus::Rejected.is_active());
        assert!(!RegistrationStatus::Cancelled.is_active());
    }

    #[test]
    fn test_unreadable_stored_status_falls_back() {
        assert_eq!(
            RegistrationStatus::from("confirmed".to_string()),
            RegistrationStatus::Confirmed
        );
        assert_eq!(
            RegistrationStatus::from("waitlisted".to_string()),
            RegistrationStatus::Registered
        );
    }

    fn sample_event(max_attendees: Option<i64>) -> Event {
        Event {
            id: "e1".to_string(),
            club_id: "c1".to_string(),
            title: "Night run".to_string(),
            description: String::new(),
            event_date: "2026-11-01T18:00:00Z".to_string(),
            location: None,
            is_paid: false,
            event_fee: 0.0,
            max_attendees,
            manager_email: "m@example.com".to_string(),
            created_at: "2026-10-01T00:00:00Z".to_string(),
            updated_at: "2026-10-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_spots_left() {
        assert_eq!(EventDetail::new(sample_event(Some(10)), 3).spots_left, Some(7));
        assert_eq!(EventDetail::new(sample_event(Some(2)), 5).spots_left, Some(0));
        assert_eq!(EventDetail::new(sample_event(None), 5).spots_left, None);
    }
}
