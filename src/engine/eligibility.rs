use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::rules::CodRules;
use crate::models::user::User;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodLimits {
    pub max_amount: u64,
    pub max_distance_km: f64,
    pub min_trust_score: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodVerdict {
    pub eligible: bool,
    pub has_warnings: bool,
    pub reasons: Vec<String>,
    pub limits: CodLimits,
}

/// Scores a prospective COD order against the live rules. Hard fails flip
/// `eligible`; warnings only surface in `reasons`. No side effects.
pub fn evaluate(
    user: &User,
    order_amount: u64,
    delivery_distance_km: f64,
    rules: &CodRules,
    now: DateTime<Utc>,
) -> CodVerdict {
    let verified_tier = user.is_verified_user && user.total_successful_orders >= 1;
    let max_amount = if verified_tier {
        rules.max_amount_verified_user
    } else {
        rules.max_amount_new_user
    };

    let mut reasons = Vec::new();
    let mut eligible = true;

    if user.cod_blacklisted {
        eligible = false;
        match &user.blacklist_reason {
            Some(reason) => reasons.push(format!("user is blacklisted from COD: {reason}")),
            None => reasons.push("user is blacklisted from COD".to_string()),
        }
    }

    if order_amount > max_amount {
        eligible = false;
        let tier = if verified_tier { "verified" } else { "new" };
        reasons.push(format!(
            "order amount Rp {order_amount} exceeds the Rp {max_amount} COD limit for {tier} users"
        ));
    }

    if delivery_distance_km > rules.max_distance_km {
        eligible = false;
        reasons.push(format!(
            "delivery distance {delivery_distance_km} km exceeds the {} km maximum",
            rules.max_distance_km
        ));
    }

    if user.phone.is_none() {
        eligible = false;
        reasons.push("no phone number on file".to_string());
    }

    let mut has_warnings = false;

    if user.trust_score < rules.min_trust_score {
        has_warnings = true;
        reasons.push(format!(
            "trust score {} is below the minimum of {}",
            user.trust_score, rules.min_trust_score
        ));
    }

    let recent = user.recent_cod_cancellations(now);
    if recent >= rules.max_recent_cancellations {
        has_warnings = true;
        reasons.push(format!(
            "{recent} COD cancellations in the last 30 days"
        ));
    }

    CodVerdict {
        eligible,
        has_warnings,
        reasons,
        limits: CodLimits {
            max_amount,
            max_distance_km: rules.max_distance_km,
            min_trust_score: rules.min_trust_score,
        },
    }
}
