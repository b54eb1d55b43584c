//! Manager dashboard statistics.
//!
//! Everything here is derived from rows already loaded for one manager; no
//! figure is persisted. Percentages are whole numbers and any ratio with a
//! zero denominator is reported as 0.

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use serde::Serialize;
use std::collections::HashSet;

use crate::db::{
    parse_timestamp, Booking, BookingStatus, Club, Event, EventRegistration, RegistrationStatus,
};

/// Length of the trailing growth window
const GROWTH_WINDOW_DAYS: i64 = 30;

/// `round((current - previous) / previous * 100)`, or 0 without a baseline
pub fn percent_change(current: f64, previous: f64) -> i64 {
    if previous > 0.0 {
        ((current - previous) / previous * 100.0).round() as i64
    } else {
        0
    }
}

/// `round(part / total * 100)`, or 0 when `total` is 0
pub fn percent_of(part: usize, total: usize) -> i64 {
    if total == 0 {
        0
    } else {
        (part as f64 / total as f64 * 100.0).round() as i64
    }
}

/// Time boundaries used to partition rows relative to `now`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindows {
    pub now: DateTime<Utc>,
    pub this_month_start: DateTime<Utc>,
    pub last_month_start: DateTime<Utc>,
    pub recent_start: DateTime<Utc>,
    pub prior_start: DateTime<Utc>,
}

impl ReportWindows {
    pub fn at(now: DateTime<Utc>) -> Self {
        let this_month_start = Utc
            .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
            .single()
            .unwrap_or(now);
        let (prev_year, prev_month) = if now.month() == 1 {
            (now.year() - 1, 12)
        } else {
            (now.year(), now.month() - 1)
        };
        let last_month_start = Utc
            .with_ymd_and_hms(prev_year, prev_month, 1, 0, 0, 0)
            .single()
            .unwrap_or(this_month_start);

        Self {
            now,
            this_month_start,
            last_month_start,
            recent_start: now - Duration::days(GROWTH_WINDOW_DAYS),
            prior_start: now - Duration::days(GROWTH_WINDOW_DAYS * 2),
        }
    }

    pub fn in_this_month(&self, at: DateTime<Utc>) -> bool {
        at >= self.this_month_start && at <= self.now
    }

    pub fn in_last_month(&self, at: DateTime<Utc>) -> bool {
        at >= self.last_month_start && at < self.this_month_start
    }

    /// Trailing 30 days
    pub fn in_recent(&self, at: DateTime<Utc>) -> bool {
        at > self.recent_start && at <= self.now
    }

    /// The 30 days before the trailing window
    pub fn in_prior(&self, at: DateTime<Utc>) -> bool {
        at > self.prior_start && at <= self.recent_start
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerStatistics {
    pub total_clubs: usize,
    pub approved_clubs: usize,
    pub pending_clubs: usize,
    /// Distinct customer emails across all bookings
    pub total_members: usize,
    pub total_bookings: usize,
    pub active_bookings: usize,
    pub pending_bookings: usize,
    pub completed_bookings: usize,
    pub cancelled_bookings: usize,
    pub completion_rate: i64,
    pub total_revenue: f64,
    pub revenue_this_month: f64,
    pub revenue_trend: i64,
    pub bookings_this_month: usize,
    pub bookings_last_month: usize,
    pub bookings_trend: i64,
    /// Last 30 days against the 30 days before
    pub growth_rate: i64,
    pub total_events: usize,
    pub upcoming_events: usize,
    pub events_this_month: usize,
    pub events_trend: i64,
    pub total_registrations: usize,
    pub confirmed_registrations: usize,
    pub attendance_rate: i64,
}

/// Build the dashboard figures for one manager's rows
pub fn compute(
    clubs: &[Club],
    bookings: &[Booking],
    events: &[Event],
    registrations: &[EventRegistration],
    now: DateTime<Utc>,
) -> ManagerStatistics {
    let windows = ReportWindows::at(now);
    let mut stats = ManagerStatistics {
        total_clubs: clubs.len(),
        approved_clubs: clubs.iter().filter(|c| c.status == "approved").count(),
        pending_clubs: clubs.iter().filter(|c| c.status == "pending").count(),
        total_bookings: bookings.len(),
        total_events: events.len(),
        total_registrations: registrations.len(),
        ..Default::default()
    };

    let members: HashSet<&str> = bookings.iter().map(|b| b.customer_email.as_str()).collect();
    stats.total_members = members.len();

    let mut revenue_last_month = 0.0;
    let (mut recent, mut prior) = (0usize, 0usize);

    for booking in bookings {
        let status = booking.status_enum();
        match status {
            BookingStatus::Confirmed => stats.active_bookings += 1,
            BookingStatus::Processing => stats.pending_bookings += 1,
            BookingStatus::Completed => stats.completed_bookings += 1,
            BookingStatus::Cancelled => stats.cancelled_bookings += 1,
        }
        let counts_as_revenue = status != BookingStatus::Cancelled;
        if counts_as_revenue {
            stats.total_revenue += booking.total();
        }

        let Some(created) = parse_timestamp(&booking.created_at) else {
            continue;
        };
        if windows.in_this_month(created) {
            stats.bookings_this_month += 1;
            if counts_as_revenue {
                stats.revenue_this_month += booking.total();
            }
        } else if windows.in_last_month(created) {
            stats.bookings_last_month += 1;
            if counts_as_revenue {
                revenue_last_month += booking.total();
            }
        }
        if windows.in_recent(created) {
            recent += 1;
        } else if windows.in_prior(created) {
            prior += 1;
        }
    }

    stats.completion_rate = percent_of(stats.completed_bookings, stats.total_bookings);
    stats.bookings_trend = percent_change(
        stats.bookings_this_month as f64,
        stats.bookings_last_month as f64,
    );
    stats.revenue_trend = percent_change(stats.revenue_this_month, revenue_last_month);
    stats.growth_rate = percent_change(recent as f64, prior as f64);

    let mut events_last_month = 0usize;
    for event in events {
        if parse_timestamp(&event.event_date).is_some_and(|at| at > now) {
            stats.upcoming_events += 1;
        }
        match parse_timestamp(&event.created_at) {
            Some(at) if windows.in_this_month(at) => stats.events_this_month += 1,
            Some(at) if windows.in_last_month(at) => events_last_month += 1,
            _ => {}
        }
    }
    stats.events_trend = percent_change(stats.events_this_month as f64, events_last_month as f64);

    stats.confirmed_registrations = registrations
        .iter()
        .filter(|r| r.status_enum() == RegistrationStatus::Confirmed)
        .count();
    stats.attendance_rate = percent_of(stats.confirmed_registrations, stats.total_registrations);

    stats.total_revenue = round_cents(stats.total_revenue);
    stats.revenue_this_month = round_cents(stats.revenue_this_month);
    stats
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::format_timestamp;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap()
    }

    fn booking(email: &str, status: &str, created: DateTime<Utc>, price: f64) -> Booking {
        Booking {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: None,
            club_id: "club-1".to_string(),
            transaction_id: None,
            customer_email: email.to_string(),
            customer_name: None,
            customer_image: None,
            seller_email: "mgr@example.com".to_string(),
            seller_name: None,
            seller_image: None,
            club_name: "Chess".to_string(),
            category: None,
            image: None,
            status: status.to_string(),
            price,
            quantity: 1,
            created_at: format_timestamp(created),
            updated_at: format_timestamp(created),
            completed_at: None,
            cancelled_at: None,
        }
    }

    fn registration(status: &str) -> EventRegistration {
        EventRegistration {
            id: uuid::Uuid::new_v4().to_string(),
            event_id: "event-1".to_string(),
            user_email: "u@example.com".to_string(),
            user_name: None,
            status: status.to_string(),
            registered_at: "2026-03-01T00:00:00Z".to_string(),
            updated_at: "2026-03-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_percent_change_without_baseline_is_zero() {
        assert_eq!(percent_change(5.0, 0.0), 0);
        assert_eq!(percent_change(0.0, 0.0), 0);
    }

    #[test]
    fn test_percent_change_rounds() {
        assert_eq!(percent_change(3.0, 2.0), 50);
        assert_eq!(percent_change(1.0, 3.0), -67);
        assert_eq!(percent_change(4.0, 3.0), 33);
        assert_eq!(percent_change(2.0, 2.0), 0);
    }

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(0, 0), 0);
        assert_eq!(percent_of(1, 3), 33);
        assert_eq!(percent_of(2, 3), 67);
        assert_eq!(percent_of(4, 4), 100);
    }

    #[test]
    fn test_month_boundaries_wrap_year() {
        let windows = ReportWindows::at(Utc.with_ymd_and_hms(2026, 1, 10, 8, 0, 0).unwrap());
        assert_eq!(
            windows.last_month_start,
            Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            windows.this_month_start,
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
        );
        assert!(windows.in_last_month(Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 59).unwrap()));
        assert!(!windows.in_last_month(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_compute_counts_and_trends() {
        let now = now();
        let bookings = vec![
            // this month
            booking("a@example.com", "confirmed", now - Duration::days(2), 10.0),
            booking("b@example.com", "completed", now - Duration::days(5), 10.0),
            booking("a@example.com", "cancelled", now - Duration::days(6), 10.0),
            // last month
            booking("c@example.com", "processing", Utc.with_ymd_and_hms(2026, 2, 20, 0, 0, 0).unwrap(), 20.0),
            booking("d@example.com", "completed", Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap(), 20.0),
        ];
        let registrations = vec![
            registration("confirmed"),
            registration("registered"),
            registration("cancelled"),
        ];

        let stats = compute(&[], &bookings, &[], &registrations, now);

        assert_eq!(stats.total_members, 4);
        assert_eq!(stats.total_bookings, 5);
        assert_eq!(stats.active_bookings, 1);
        assert_eq!(stats.pending_bookings, 1);
        assert_eq!(stats.completed_bookings, 2);
        assert_eq!(stats.cancelled_bookings, 1);
        assert_eq!(stats.completion_rate, 40);
        assert_eq!(stats.bookings_this_month, 3);
        assert_eq!(stats.bookings_last_month, 2);
        assert_eq!(stats.bookings_trend, 50);
        assert_eq!(stats.total_revenue, 60.0);
        assert_eq!(stats.revenue_this_month, 20.0);
        // 20 this month against 40 last month
        assert_eq!(stats.revenue_trend, -50);
        // last 30 days: 3 this month + Feb 20; prior window: Feb 1
        assert_eq!(stats.growth_rate, 300);
        assert_eq!(stats.attendance_rate, 33);
    }

    #[test]
    fn test_compute_empty_is_all_zero() {
        let stats = compute(&[], &[], &[], &[], now());
        assert_eq!(stats, ManagerStatistics::default());
    }

    #[test]
    fn test_no_previous_month_means_zero_trend() {
        let now = now();
        let bookings = vec![booking("a@example.com", "confirmed", now - Duration::days(1), 5.0)];
        let stats = compute(&[], &bookings, &[], &[], now);
        assert_eq!(stats.bookings_this_month, 1);
        assert_eq!(stats.bookings_trend, 0);
        assert_eq!(stats.growth_rate, 0);
    }

    #[test]
    fn test_upcoming_events() {
        let now = now();
        let make = |date: DateTime<Utc>| Event {
            id: uuid::Uuid::new_v4().to_string(),
            club_id: "club-1".to_string(),
            title: "Meetup".to_string(),
            description: String::new(),
            event_date: format_timestamp(date),
            location: None,
            is_paid: false,
            event_fee: 0.0,
            max_attendees: None,
            manager_email: "mgr@example.com".to_string(),
            created_at: format_timestamp(now - Duration::days(1)),
            updated_at: format_timestamp(now - Duration::days(1)),
        };
        let events = vec![make(now + Duration::days(3)), make(now - Duration::days(3))];

        let stats = compute(&[], &[], &events, &[], now);
        assert_eq!(stats.total_events, 2);
        assert_eq!(stats.upcoming_events, 1);
        assert_eq!(stats.events_this_month, 2);
        assert_eq!(stats.events_trend, 0);
    }
}
