use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Trailing window for the COD cancellation warning.
pub const CANCELLATION_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub trust_score: u8,
    pub total_successful_orders: u32,
    pub is_verified_user: bool,
    pub cod_blacklisted: bool,
    pub blacklist_reason: Option<String>,
    pub cod_cancellations: Vec<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn recent_cod_cancellations(&self, now: DateTime<Utc>) -> u32 {
        let cutoff = now - Duration::days(CANCELLATION_WINDOW_DAYS);
        self.cod_cancellations
            .iter()
            .filter(|at| **at > cutoff)
            .count() as u32
    }

    /// Successful delivery bumps trust by 10, capped at 100.
    pub fn record_successful_delivery(&mut self) {
        self.trust_score = self.trust_score.saturating_add(10).min(100);
        self.total_successful_orders += 1;
    }

    pub fn blacklist(&mut self, reason: String) {
        self.cod_blacklisted = true;
        self.blacklist_reason = Some(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "test-user".to_string(),
            phone: Some("+628123".to_string()),
            trust_score: 95,
            total_successful_orders: 4,
            is_verified_user: true,
            cod_blacklisted: false,
            blacklist_reason: None,
            cod_cancellations: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn trust_score_caps_at_100() {
        let mut u = user();
        u.record_successful_delivery();
        assert_eq!(u.trust_score, 100);
        assert_eq!(u.total_successful_orders, 5);

        u.record_successful_delivery();
        assert_eq!(u.trust_score, 100);
    }

    #[test]
    fn old_cancellations_fall_out_of_the_window() {
        let now = Utc::now();
        let mut u = user();
        u.cod_cancellations = vec![
            now - Duration::days(40),
            now - Duration::days(10),
            now - Duration::days(2),
        ];
        assert_eq!(u.recent_cod_cancellations(now), 2);
    }
}
