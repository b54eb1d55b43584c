//! Bookings (club memberships/orders) and their status lifecycle.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use thiserror::Error;

use super::common::{now_timestamp, Party};

/// Booking status. `Completed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    Processing,
    Completed,
    Cancelled,
}

/// Rejected booking status change
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Cannot cancel completed orders")]
    CancelCompleted,

    #[error("Order is already cancelled")]
    AlreadyCancelled,

    #[error("Cannot change a {from} order to {to}")]
    Terminal {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("Only processing orders can be approved or rejected (current status: {0})")]
    NotPending(BookingStatus),

    #[error("Order is no longer {0}")]
    Stale(BookingStatus),
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 4] = [
        BookingStatus::Confirmed,
        BookingStatus::Processing,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Processing => "processing",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    /// Customer or seller cancellation
    pub fn cancel(self) -> Result<BookingStatus, TransitionError> {
        match self {
            BookingStatus::Confirmed | BookingStatus::Processing => Ok(BookingStatus::Cancelled),
            BookingStatus::Completed => Err(TransitionError::CancelCompleted),
            BookingStatus::Cancelled => Err(TransitionError::AlreadyCancelled),
        }
    }

    /// Seller setting an explicit status. Terminal states only accept themselves.
    pub fn update_to(self, target: BookingStatus) -> Result<BookingStatus, TransitionError> {
        if self.is_terminal() && self != target {
            return Err(TransitionError::Terminal {
                from: self,
                to: target,
            });
        }
        Ok(target)
    }

    /// Seller approving or rejecting a pending booking
    pub fn adjudicate(self, approve: bool) -> Result<BookingStatus, TransitionError> {
        match self {
            BookingStatus::Processing if approve => Ok(BookingStatus::Confirmed),
            BookingStatus::Processing => Ok(BookingStatus::Cancelled),
            other => Err(TransitionError::NotPending(other)),
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(BookingStatus::Confirmed),
            "processing" => Ok(BookingStatus::Processing),
            "completed" => Ok(BookingStatus::Completed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            _ => Err(format!("Unknown booking status: {}", s)),
        }
    }
}

impl From<String> for BookingStatus {
    fn from(s: String) -> Self {
        s.parse().unwrap_or_else(|e| {
            tracing::warn!(status = %s, error = %e, "Unreadable stored booking status, treating as processing");
            BookingStatus::Processing
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Booking {
    pub id: String,
    pub session_id: Option<String>,
    pub club_id: String,
    pub transaction_id: Option<String>,
    pub customer_email: String,
    pub customer_name: Option<String>,
    pub customer_image: Option<String>,
    pub seller_email: String,
    pub seller_name: Option<String>,
    pub seller_image: Option<String>,
    pub club_name: String,
    pub category: Option<String>,
    pub image: Option<String>,
    pub status: String,
    pub price: f64,
    pub quantity: i64,
    pub created_at: String,
    pub updated_at: String,
    pub completed_at: Option<String>,
    pub cancelled_at: Option<String>,
}

impl Booking {
    pub fn status_enum(&self) -> BookingStatus {
        BookingStatus::from(self.status.clone())
    }

    pub fn total(&self) -> f64 {
        self.price * self.quantity as f64
    }

    pub async fn find(pool: &SqlitePool, id: &str) -> Result<Option<Booking>, sqlx::Error> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_session(
        pool: &SqlitePool,
        session_id: &str,
    ) -> Result<Option<Booking>, sqlx::Error> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE session_id = ?")
            .bind(session_id)
            .fetch_optional(pool)
            .await
    }

    /// Every booking on clubs currently owned by `seller_email`
    pub async fn for_clubs_owned_by(
        pool: &SqlitePool,
        seller_email: &str,
    ) -> Result<Vec<Booking>, sqlx::Error> {
        sqlx::query_as::<_, Booking>(
            r#"
            SELECT b.* FROM bookings b
            INNER JOIN clubs c ON b.club_id = c.id
            WHERE c.seller_email = ?
            ORDER BY b.created_at DESC
            "#,
        )
        .bind(seller_email)
        .fetch_all(pool)
        .await
    }

    /// Move `from` to `to`, stamping `completed_at`/`cancelled_at` as needed.
    ///
    /// Returns false when the stored status is no longer `from`.
    pub async fn set_status(
        pool: &SqlitePool,
        id: &str,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<bool, sqlx::Error> {
        let now = now_timestamp();
        let result = sqlx::query(
            r#"
            UPDATE bookings SET
                status = ?,
                updated_at = ?,
                completed_at = CASE WHEN ? = 'completed' THEN ? ELSE completed_at END,
                cancelled_at = CASE WHEN ? = 'cancelled' THEN ? ELSE cancelled_at END
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(to.as_str())
        .bind(&now)
        .bind(to.as_str())
        .bind(&now)
        .bind(to.as_str())
        .bind(&now)
        .bind(id)
        .bind(from.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

/// Booking as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub id: String,
    pub session_id: Option<String>,
    pub club_id: String,
    pub transaction_id: Option<String>,
    pub customer: Party,
    pub seller: Party,
    pub name: String,
    pub category: Option<String>,
    pub image: Option<String>,
    pub status: String,
    pub price: f64,
    pub quantity: i64,
    pub created_at: String,
    pub updated_at: String,
    pub completed_at: Option<String>,
    pub cancelled_at: Option<String>,
}

impl From<Booking> for BookingResponse {
    fn from(b: Booking) -> Self {
        Self {
            id: b.id,
            session_id: b.session_id,
            club_id: b.club_id,
            transaction_id: b.transaction_id,
            customer: Party {
                email: b.customer_email,
                name: b.customer_name,
                image: b.customer_image,
            },
            seller: Party {
                email: b.seller_email,
                name: b.seller_name,
                image: b.seller_image,
            },
            name: b.club_name,
            category: b.category,
            image: b.image,
            status: b.status,
            price: b.price,
            quantity: b.quantity,
            created_at: b.created_at,
            updated_at: b.updated_at,
            completed_at: b.completed_at,
            cancelled_at: b.cancelled_at,
        }
    }
}

/// Fields for a new booking row
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub session_id: Option<String>,
    pub club_id: String,
    pub transaction_id: Option<String>,
    pub customer: Party,
    pub seller: Party,
    pub club_name: String,
    pub category: Option<String>,
    pub image: Option<String>,
    pub status: BookingStatus,
    pub price: f64,
    pub quantity: i64,
}

impl NewBooking {
    /// Insert unconditionally. Unique index violations surface as errors.
    pub async fn insert(self, pool: &SqlitePool) -> Result<Booking, sqlx::Error> {
        let id = uuid::Uuid::new_v4().to_string();
        self.insert_row(pool, &id, false).await?;
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = ?")
            .bind(&id)
            .fetch_one(pool)
            .await
    }

    /// Insert keyed on the payment session.
    ///
    /// Returns the booking for the session and whether this call created it.
    /// Concurrent callers for one session all get the same row back.
    pub async fn insert_for_session(
        mut self,
        pool: &SqlitePool,
        session_id: &str,
    ) -> Result<(Booking, bool), sqlx::Error> {
        self.session_id = Some(session_id.to_string());
        let id = uuid::Uuid::new_v4().to_string();
        let created = self.insert_row(pool, &id, true).await?;
        let booking = Booking::find_by_session(pool, session_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
        Ok((booking, created))
    }

    async fn insert_row(
        &self,
        pool: &SqlitePool,
        id: &str,
        ignore_duplicate_session: bool,
    ) -> Result<bool, sqlx::Error> {
        let now = now_timestamp();
        let sql = if ignore_duplicate_session {
            r#"
            INSERT INTO bookings (
                id, session_id, club_id, transaction_id,
                customer_email, customer_name, customer_image,
                seller_email, seller_name, seller_image,
                club_name, category, image, status, price, quantity,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(session_id) DO NOTHING
            "#
        } else {
            r#"
            INSERT INTO bookings (
                id, session_id, club_id, transaction_id,
                customer_email, customer_name, customer_image,
                seller_email, seller_name, seller_image,
                club_name, category, image, status, price, quantity,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#
        };

        let result = sqlx::query(sql)
            .bind(id)
            .bind(&self.session_id)
            .bind(&self.club_id)
            .bind(&self.transaction_id)
            .bind(&self.customer.email)
            .bind(&self.customer.name)
            .bind(&self.customer.image)
            .bind(&self.seller.email)
            .bind(&self.seller.name)
            .bind(&self.seller.image)
            .bind(&self.club_name)
            .bind(&self.category)
            .bind(&self.image)
            .bind(self.status.as_str())
            .bind(self.price)
            .bind(self.quantity)
            .bind(&now)
            .bind(&now)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateBookingStatusRequest {
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub status: Option<String>,
}
