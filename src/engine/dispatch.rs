use std::cmp::Ordering;

use rand::seq::SliceRandom;

use crate::models::courier::{Kurir, KurirStatus};
use crate::state::AppState;

/// Callers must handle the no-courier branch explicitly; an empty roster is
/// a normal outcome, not an error.
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    Assigned(Kurir),
    Unassigned { reason: String },
}

/// COD-approval path: uniform random pick among available, active couriers.
pub fn pick_random(state: &AppState) -> DispatchOutcome {
    let candidates: Vec<Kurir> = state
        .couriers
        .iter()
        .filter(|entry| entry.value().takes_random_assignment())
        .map(|entry| entry.value().clone())
        .collect();

    match candidates.choose(&mut rand::thread_rng()) {
        Some(kurir) => DispatchOutcome::Assigned(kurir.clone()),
        None => DispatchOutcome::Unassigned {
            reason: "no available courier".to_string(),
        },
    }
}

/// Payment-webhook path: least-loaded courier wins. Available couriers beat
/// busy ones, then fewer active orders, then higher rating. The ordering is
/// the tie-break; nothing is randomized.
pub fn pick_least_loaded(state: &AppState) -> DispatchOutcome {
    let mut candidates: Vec<Kurir> = state
        .couriers
        .iter()
        .filter(|entry| entry.value().takes_balanced_assignment())
        .map(|entry| entry.value().clone())
        .collect();

    candidates.sort_by(|a, b| {
        let a_busy = a.status == KurirStatus::Busy;
        let b_busy = b.status == KurirStatus::Busy;
        a_busy
            .cmp(&b_busy)
            .then(a.active_orders.cmp(&b.active_orders))
            .then(b.rating.partial_cmp(&a.rating).unwrap_or(Ordering::Equal))
    });

    match candidates.into_iter().next() {
        Some(kurir) => DispatchOutcome::Assigned(kurir),
        None => DispatchOutcome::Unassigned {
            reason: "no courier below the active-order cap".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::models::rules::CodRules;

    fn test_state() -> AppState {
        AppState::new(
            CodRules {
                max_amount_new_user: 50_000,
                max_amount_verified_user: 100_000,
                max_distance_km: 15.0,
                min_trust_score: 20,
                max_recent_cancellations: 2,
            },
            16,
        )
    }

    fn kurir(
        id_seed: u128,
        status: KurirStatus,
        is_active: bool,
        active_orders: u8,
        rating: f64,
    ) -> Kurir {
        Kurir {
            id: Uuid::from_u128(id_seed),
            name: format!("kurir-{id_seed}"),
            phone: "+62811000222".to_string(),
            status,
            is_active,
            active_orders,
            total_deliveries: 0,
            rating,
            updated_at: Utc::now(),
        }
    }

    fn insert(state: &AppState, k: Kurir) {
        state.couriers.insert(k.id, k);
    }

    #[test]
    fn random_pick_skips_busy_offline_and_inactive() {
        let state = test_state();
        insert(&state, kurir(1, KurirStatus::Busy, true, 3, 4.0));
        insert(&state, kurir(2, KurirStatus::Offline, true, 0, 5.0));
        insert(&state, kurir(3, KurirStatus::Available, false, 0, 5.0));
        insert(&state, kurir(4, KurirStatus::Available, true, 1, 3.0));

        match pick_random(&state) {
            DispatchOutcome::Assigned(k) => assert_eq!(k.id, Uuid::from_u128(4)),
            DispatchOutcome::Unassigned { .. } => panic!("expected an assignment"),
        }
    }

    #[test]
    fn random_pick_with_empty_roster_is_unassigned() {
        let state = test_state();
        assert!(matches!(
            pick_random(&state),
            DispatchOutcome::Unassigned { .. }
        ));
    }

    #[test]
    fn least_loaded_prefers_available_over_busy() {
        let state = test_state();
        insert(&state, kurir(1, KurirStatus::Busy, true, 3, 5.0));
        insert(&state, kurir(2, KurirStatus::Available, true, 2, 3.0));

        match pick_least_loaded(&state) {
            DispatchOutcome::Assigned(k) => assert_eq!(k.id, Uuid::from_u128(2)),
            DispatchOutcome::Unassigned { .. } => panic!("expected an assignment"),
        }
    }

    #[test]
    fn least_loaded_breaks_load_ties_by_rating() {
        let state = test_state();
        insert(&state, kurir(1, KurirStatus::Available, true, 1, 4.2));
        insert(&state, kurir(2, KurirStatus::Available, true, 1, 4.9));

        match pick_least_loaded(&state) {
            DispatchOutcome::Assigned(k) => assert_eq!(k.id, Uuid::from_u128(2)),
            DispatchOutcome::Unassigned { .. } => panic!("expected an assignment"),
        }
    }

    #[test]
    fn least_loaded_takes_busy_courier_when_nobody_is_available() {
        let state = test_state();
        insert(&state, kurir(1, KurirStatus::Busy, true, 4, 4.0));
        insert(&state, kurir(2, KurirStatus::Busy, true, 3, 2.0));

        match pick_least_loaded(&state) {
            DispatchOutcome::Assigned(k) => assert_eq!(k.id, Uuid::from_u128(2)),
            DispatchOutcome::Unassigned { .. } => panic!("expected an assignment"),
        }
    }

    #[test]
    fn courier_at_the_five_order_cap_is_excluded() {
        let state = test_state();
        insert(&state, kurir(1, KurirStatus::Busy, true, 5, 5.0));

        assert!(matches!(
            pick_least_loaded(&state),
            DispatchOutcome::Unassigned { .. }
        ));
    }
}
