use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// COD eligibility thresholds. Operators tune these at runtime through the
/// admin rules endpoint; handlers read one snapshot per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodRules {
    /// Rupiah cap for users without a verified profile and a past delivery.
    pub max_amount_new_user: u64,
    /// Rupiah cap for verified users with at least one successful order.
    pub max_amount_verified_user: u64,
    pub max_distance_km: f64,
    pub min_trust_score: u8,
    /// COD cancellations inside the trailing 30 days at or above this count
    /// produce a warning.
    pub max_recent_cancellations: u32,
}

impl CodRules {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.max_amount_new_user == 0 || self.max_amount_verified_user == 0 {
            return Err(AppError::BadRequest(
                "amount limits must be greater than zero".to_string(),
            ));
        }
        if self.max_amount_verified_user < self.max_amount_new_user {
            return Err(AppError::BadRequest(
                "verified-user limit cannot be below the new-user limit".to_string(),
            ));
        }
        if !self.max_distance_km.is_finite() || self.max_distance_km <= 0.0 {
            return Err(AppError::BadRequest(
                "max_distance_km must be a positive number".to_string(),
            ));
        }
        if self.min_trust_score > 100 {
            return Err(AppError::BadRequest(
                "min_trust_score must be within 0..=100".to_string(),
            ));
        }
        Ok(())
    }
}
