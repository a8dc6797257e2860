//! The one place where a dispatch decision turns into state: order status,
//! courier load, audit log, and notifications always move together here, so
//! every call site gets the same bookkeeping.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::courier::{Kurir, KurirStatus, MAX_ACTIVE_ORDERS};
use crate::models::notification::{
    Actor, DispatchEvent, Notification, NotificationKind, RecipientKind, StatusLog,
};
use crate::models::order::{Order, OrderStatus, PaymentMethod};
use crate::state::AppState;

/// Attaches a courier to an order as one logical transaction: claim the
/// courier, release any previous one, move the order to `Processing`, write
/// the audit row, and notify both parties.
///
/// The claim re-checks capacity under the courier's entry guard, so two
/// concurrent dispatch calls that scanned the same candidate cannot both
/// take its last slot.
pub fn apply_assignment(
    state: &AppState,
    order_id: Uuid,
    kurir_id: Uuid,
    actor: Actor,
    note: Option<String>,
) -> Result<Kurir, AppError> {
    let now = Utc::now();

    let (from_status, prev_kurir, order_number, user_id) = {
        let order = state
            .orders
            .get(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

        // Dispatch follows a confirmation event; a pending order has not
        // cleared payment or COD approval yet.
        if !matches!(
            order.status,
            OrderStatus::Confirmed | OrderStatus::Processing | OrderStatus::Ready
        ) {
            return Err(AppError::Conflict(format!(
                "order {} cannot be assigned while {:?}",
                order.order_number, order.status
            )));
        }
        if order.kurir_id == Some(kurir_id) {
            return Err(AppError::Conflict(
                "order is already assigned to this courier".to_string(),
            ));
        }

        (
            order.status,
            order.kurir_id,
            order.order_number.clone(),
            order.user_id,
        )
    };

    let claimed = {
        let mut kurir = state
            .couriers
            .get_mut(&kurir_id)
            .ok_or_else(|| AppError::NotFound(format!("kurir {kurir_id} not found")))?;

        if !kurir.is_active {
            return Err(AppError::Conflict(format!(
                "kurir {} is not active",
                kurir.name
            )));
        }
        if kurir.status == KurirStatus::Offline {
            return Err(AppError::Conflict(format!(
                "kurir {} is offline",
                kurir.name
            )));
        }
        if kurir.active_orders >= MAX_ACTIVE_ORDERS {
            return Err(AppError::Conflict(format!(
                "kurir {} is at capacity",
                kurir.name
            )));
        }

        kurir.active_orders += 1;
        kurir.refresh_status();
        kurir.updated_at = now;
        kurir.clone()
    };

    if let Some(prev_id) = prev_kurir {
        release_courier(
            state,
            prev_id,
            NotificationKind::Reassigned,
            format!("Order {order_number} was reassigned to another courier"),
        );
    }

    {
        let mut order = state.orders.get_mut(&order_id).ok_or_else(|| {
            AppError::Internal(format!("order {order_id} disappeared during assignment"))
        })?;
        order.status = OrderStatus::Processing;
        order.kurir_id = Some(kurir_id);
        order.assigned_at = Some(now);
    }

    write_log(state, order_id, from_status, OrderStatus::Processing, actor, note);
    push_notification(
        state,
        RecipientKind::User,
        user_id,
        NotificationKind::CourierAssigned,
        format!(
            "Order {order_number} is being prepared; {} will deliver it",
            claimed.name
        ),
    );
    push_notification(
        state,
        RecipientKind::Kurir,
        kurir_id,
        NotificationKind::NewOrder,
        format!("New delivery: order {order_number}"),
    );

    let _ = state.dispatch_events_tx.send(DispatchEvent {
        order_id,
        order_number: order_number.clone(),
        kurir_id,
        kurir_name: claimed.name.clone(),
        actor,
        assigned_at: now,
    });

    state
        .metrics
        .kurir_active_orders
        .with_label_values(&[&kurir_id.to_string()])
        .set(claimed.active_orders as i64);
    refresh_unassigned_gauge(state);

    info!(
        order_number = %order_number,
        kurir = %claimed.name,
        actor = ?actor,
        "order assigned"
    );

    Ok(claimed)
}

/// Hands one active order back from a courier, recomputing its status and
/// telling it why.
pub fn release_courier(
    state: &AppState,
    kurir_id: Uuid,
    kind: NotificationKind,
    message: String,
) {
    let released = state.couriers.get_mut(&kurir_id).map(|mut kurir| {
        kurir.active_orders = kurir.active_orders.saturating_sub(1);
        kurir.refresh_status();
        kurir.updated_at = Utc::now();
        kurir.clone()
    });

    if let Some(kurir) = released {
        state
            .metrics
            .kurir_active_orders
            .with_label_values(&[&kurir_id.to_string()])
            .set(kurir.active_orders as i64);
        push_notification(state, RecipientKind::Kurir, kurir_id, kind, message);
    }
}

/// Moves an order to `to`, stamps the matching timestamp, and writes the
/// paired audit row. Status and log never diverge because nothing else
/// mutates `Order::status`.
pub fn record_transition(
    state: &AppState,
    order_id: Uuid,
    to: OrderStatus,
    actor: Actor,
    note: Option<String>,
) -> Result<Order, AppError> {
    let now = Utc::now();

    let (from, updated) = {
        let mut order = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

        let from = order.status;
        order.status = to;
        match to {
            OrderStatus::Confirmed => order.confirmed_at = Some(now),
            OrderStatus::Completed => order.completed_at = Some(now),
            OrderStatus::Cancelled => {
                order.cancelled_at = Some(now);
                order.kurir_id = None;
            }
            _ => {}
        }
        (from, order.clone())
    };

    write_log(state, order_id, from, to, actor, note);
    refresh_unassigned_gauge(state);
    Ok(updated)
}

/// Cancels an order, releasing its courier first if one was attached.
pub fn cancel_order(
    state: &AppState,
    order_id: Uuid,
    actor: Actor,
    note: Option<String>,
) -> Result<Order, AppError> {
    let (status, kurir_id, order_number, user_id, payment_method) = {
        let order = state
            .orders
            .get(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
        (
            order.status,
            order.kurir_id,
            order.order_number.clone(),
            order.user_id,
            order.payment_method,
        )
    };

    if status.is_terminal() {
        return Err(AppError::Conflict(format!(
            "order {order_number} is already {status:?}"
        )));
    }

    // COD cancellations feed the 30-day eligibility warning.
    if payment_method == PaymentMethod::Cod {
        if let Some(mut user) = state.users.get_mut(&user_id) {
            user.cod_cancellations.push(Utc::now());
        }
    }

    if let Some(kid) = kurir_id {
        release_courier(
            state,
            kid,
            NotificationKind::OrderCancelled,
            format!("Order {order_number} was cancelled"),
        );
    }

    let updated = record_transition(state, order_id, OrderStatus::Cancelled, actor, note)?;

    push_notification(
        state,
        RecipientKind::User,
        user_id,
        NotificationKind::OrderCancelled,
        format!("Order {order_number} has been cancelled"),
    );

    info!(order_number = %order_number, actor = ?actor, "order cancelled");
    Ok(updated)
}

/// Completes a delivery: courier hands the order back and gains a delivery,
/// the customer's trust score and success counter move up.
pub fn complete_order(
    state: &AppState,
    order_id: Uuid,
    actor: Actor,
) -> Result<Order, AppError> {
    let (status, kurir_id, order_number, user_id) = {
        let order = state
            .orders
            .get(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
        (
            order.status,
            order.kurir_id,
            order.order_number.clone(),
            order.user_id,
        )
    };

    if !matches!(
        status,
        OrderStatus::Processing | OrderStatus::Ready | OrderStatus::Delivering
    ) {
        return Err(AppError::Conflict(format!(
            "order {order_number} cannot be completed while {status:?}"
        )));
    }
    let kurir_id = kurir_id.ok_or_else(|| {
        AppError::Conflict(format!("order {order_number} has no courier attached"))
    })?;

    let delivered_by = state.couriers.get_mut(&kurir_id).map(|mut kurir| {
        kurir.active_orders = kurir.active_orders.saturating_sub(1);
        kurir.total_deliveries += 1;
        kurir.refresh_status();
        kurir.updated_at = Utc::now();
        kurir.clone()
    });

    if let Some(kurir) = &delivered_by {
        state
            .metrics
            .kurir_active_orders
            .with_label_values(&[&kurir_id.to_string()])
            .set(kurir.active_orders as i64);
    }

    if let Some(mut user) = state.users.get_mut(&user_id) {
        user.record_successful_delivery();
    }

    let updated = record_transition(state, order_id, OrderStatus::Completed, actor, None)?;

    push_notification(
        state,
        RecipientKind::User,
        user_id,
        NotificationKind::OrderCompleted,
        format!("Order {order_number} has been delivered"),
    );

    info!(order_number = %order_number, "order completed");
    Ok(updated)
}

pub fn push_notification(
    state: &AppState,
    recipient_kind: RecipientKind,
    recipient_id: Uuid,
    kind: NotificationKind,
    message: String,
) {
    let notification = Notification {
        id: Uuid::new_v4(),
        recipient_kind,
        recipient_id,
        kind,
        message,
        created_at: Utc::now(),
    };
    state.notifications.insert(notification.id, notification);
}

fn write_log(
    state: &AppState,
    order_id: Uuid,
    from_status: OrderStatus,
    to_status: OrderStatus,
    actor: Actor,
    note: Option<String>,
) {
    let row = StatusLog {
        id: Uuid::new_v4(),
        seq: state.next_log_seq(),
        order_id,
        from_status,
        to_status,
        actor,
        note,
        created_at: Utc::now(),
    };
    state.status_log.insert(row.id, row);
}

pub fn refresh_unassigned_gauge(state: &AppState) {
    let count = state
        .orders
        .iter()
        .filter(|entry| {
            entry.value().status == OrderStatus::Confirmed && entry.value().kurir_id.is_none()
        })
        .count();
    state.metrics.unassigned_orders.set(count as i64);
}
