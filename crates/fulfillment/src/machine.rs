//! Per-sub-order fulfillment state machine.
//!
//! Pure transition logic over [`SubOrder`] values: no I/O, no clocks. The
//! store-backed [`crate::BatchManager`] wraps these functions and records
//! history; the payment protocol runs between [`request_departure`] and
//! [`commit_departure`].

use rust_decimal::Decimal;
use sokoni_types::{FoundMark, SubOrder, SubOrderStatus};

use crate::FulfillmentError;

/// A transition that was actually applied.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedTransition {
    pub sub_order_id: String,
    pub from: SubOrderStatus,
    pub to: SubOrderStatus,
}

/// Evidence that the departure guard passed for a sub-order.
///
/// Issued by [`request_departure`] before the payment protocol runs and
/// consumed by [`commit_departure`] once settlement succeeded. Carries the
/// observed status so a commit against a sub-order that moved in between
/// fails instead of double-applying.
#[derive(Debug, Clone, PartialEq)]
pub struct DepartureTicket {
    pub sub_order_id: String,
    pub from: SubOrderStatus,
}

/// Request to mark an item found or not found.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkRequest {
    /// `quantity: None` means everything ordered was found.
    Found { quantity: Option<Decimal> },
    NotFound,
}

/// Result of an item toggle. Clamping never errors, but it is visible.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkOutcome {
    pub item_id: String,
    pub effective_quantity: Decimal,
    pub clamped: bool,
}

fn invalid(sub: &SubOrder, requested: SubOrderStatus) -> FulfillmentError {
    FulfillmentError::InvalidTransition {
        sub_order_id: sub.id.clone(),
        from: sub.status,
        requested,
    }
}

/// `accepted -> shopping`. Only legal for kinds with a find-items step;
/// fast-path kinds go straight to [`request_departure`].
pub fn start_shopping(sub: &mut SubOrder) -> Result<AppliedTransition, FulfillmentError> {
    if sub.status != SubOrderStatus::Accepted || !sub.kind.has_shopping_phase() {
        return Err(invalid(sub, SubOrderStatus::Shopping));
    }
    let from = sub.status;
    sub.status = SubOrderStatus::Shopping;
    Ok(AppliedTransition {
        sub_order_id: sub.id.clone(),
        from,
        to: SubOrderStatus::Shopping,
    })
}

/// Validate the payment-gated departure without mutating anything.
///
/// Regular orders must be `shopping` with at least one found item; reel and
/// restaurant orders depart unconditionally from their pre-payment status.
pub fn request_departure(sub: &SubOrder) -> Result<DepartureTicket, FulfillmentError> {
    let expected = if sub.kind.has_shopping_phase() {
        SubOrderStatus::Shopping
    } else {
        SubOrderStatus::Accepted
    };
    if sub.status != expected {
        return Err(invalid(sub, SubOrderStatus::OnTheWay));
    }
    if sub.kind.requires_found_item() && !sub.has_found_item() {
        return Err(invalid(sub, SubOrderStatus::OnTheWay));
    }
    Ok(DepartureTicket {
        sub_order_id: sub.id.clone(),
        from: sub.status,
    })
}

/// Commit the departure after the payment protocol reported success.
///
/// Applies `-> paid -> on_the_way` as one commit; callers persist both
/// recorded transitions together.
pub fn commit_departure(
    sub: &mut SubOrder,
    ticket: &DepartureTicket,
) -> Result<Vec<AppliedTransition>, FulfillmentError> {
    if ticket.sub_order_id != sub.id || sub.status != ticket.from {
        return Err(invalid(sub, SubOrderStatus::OnTheWay));
    }
    let from = sub.status;
    sub.status = SubOrderStatus::OnTheWay;
    Ok(vec![
        AppliedTransition {
            sub_order_id: sub.id.clone(),
            from,
            to: SubOrderStatus::Paid,
        },
        AppliedTransition {
            sub_order_id: sub.id.clone(),
            from: SubOrderStatus::Paid,
            to: SubOrderStatus::OnTheWay,
        },
    ])
}

/// `on_the_way -> at_customer`.
pub fn arrive_at_customer(sub: &mut SubOrder) -> Result<AppliedTransition, FulfillmentError> {
    if sub.status != SubOrderStatus::OnTheWay {
        return Err(invalid(sub, SubOrderStatus::AtCustomer));
    }
    let from = sub.status;
    sub.status = SubOrderStatus::AtCustomer;
    Ok(AppliedTransition {
        sub_order_id: sub.id.clone(),
        from,
        to: SubOrderStatus::AtCustomer,
    })
}

/// `on_the_way|at_customer -> delivered`, gated on recorded proof.
pub fn confirm_delivery(
    sub: &mut SubOrder,
    has_proof: bool,
) -> Result<AppliedTransition, FulfillmentError> {
    if !matches!(
        sub.status,
        SubOrderStatus::OnTheWay | SubOrderStatus::AtCustomer
    ) {
        return Err(invalid(sub, SubOrderStatus::Delivered));
    }
    if !has_proof {
        return Err(FulfillmentError::ProofRequired {
            sub_order_id: sub.id.clone(),
        });
    }
    let from = sub.status;
    sub.status = SubOrderStatus::Delivered;
    Ok(AppliedTransition {
        sub_order_id: sub.id.clone(),
        from,
        to: SubOrderStatus::Delivered,
    })
}

/// Toggle an item's found state while the sub-order is `shopping`.
///
/// Out-of-range quantities clamp to the ordered quantity rather than
/// rejecting, so a shopper is never blocked mid-trip; the clamp is visible
/// in the returned outcome.
pub fn mark_item(
    sub: &mut SubOrder,
    item_id: &str,
    request: MarkRequest,
) -> Result<MarkOutcome, FulfillmentError> {
    if sub.status != SubOrderStatus::Shopping {
        return Err(FulfillmentError::NotShopping {
            sub_order_id: sub.id.clone(),
            status: sub.status,
        });
    }
    let sub_order_id = sub.id.clone();
    let item = sub
        .item_mut(item_id)
        .ok_or_else(|| FulfillmentError::UnknownItem {
            sub_order_id,
            item_id: item_id.to_string(),
        })?;

    match request {
        MarkRequest::Found { quantity } => {
            let requested = quantity.unwrap_or(item.ordered_quantity);
            let in_range = requested >= Decimal::ZERO && requested <= item.ordered_quantity;
            let effective = if in_range {
                requested
            } else {
                item.ordered_quantity
            };
            item.mark = FoundMark::Found { quantity: effective };
            Ok(MarkOutcome {
                item_id: item.id.clone(),
                effective_quantity: effective,
                clamped: !in_range,
            })
        }
        MarkRequest::NotFound => {
            item.mark = FoundMark::NotFound;
            Ok(MarkOutcome {
                item_id: item.id.clone(),
                effective_quantity: Decimal::ZERO,
                clamped: false,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use sokoni_types::{Item, OrderKind};

    fn regular() -> SubOrder {
        SubOrder::new("sub-1", "shop-a", OrderKind::Regular).with_items(vec![
            Item::new("item-a", "prod-a", dec!(1000), dec!(2), "sub-1"),
            Item::new("item-b", "prod-b", dec!(500), dec!(1), "sub-1"),
        ])
    }

    fn restaurant() -> SubOrder {
        SubOrder::new("sub-m", "resto-1", OrderKind::Restaurant)
    }

    #[test]
    fn test_start_shopping_from_accepted() {
        let mut sub = regular();
        let t = start_shopping(&mut sub).unwrap();
        assert_eq!(t.from, SubOrderStatus::Accepted);
        assert_eq!(sub.status, SubOrderStatus::Shopping);
    }

    #[test]
    fn test_start_shopping_rejected_for_fast_path_kinds() {
        let mut sub = restaurant();
        assert!(matches!(
            start_shopping(&mut sub),
            Err(FulfillmentError::InvalidTransition { .. })
        ));
        assert_eq!(sub.status, SubOrderStatus::Accepted);
    }

    #[test]
    fn test_departure_guard_requires_found_item() {
        let mut sub = regular();
        start_shopping(&mut sub).unwrap();

        let err = request_departure(&sub).unwrap_err();
        assert!(matches!(err, FulfillmentError::InvalidTransition { .. }));
        assert_eq!(sub.status, SubOrderStatus::Shopping);

        mark_item(&mut sub, "item-a", MarkRequest::Found { quantity: Some(dec!(1)) }).unwrap();
        let ticket = request_departure(&sub).unwrap();
        assert_eq!(ticket.from, SubOrderStatus::Shopping);
    }

    #[test]
    fn test_fast_path_departure_from_accepted() {
        let sub = restaurant();
        let ticket = request_departure(&sub).unwrap();
        assert_eq!(ticket.from, SubOrderStatus::Accepted);
    }

    #[test]
    fn test_reel_from_shop_departs_without_found_items() {
        let mut sub = SubOrder::new(
            "sub-r",
            "shop-a",
            OrderKind::ReelFromShop { unit_price: dec!(750), quantity: dec!(1) },
        );
        start_shopping(&mut sub).unwrap();
        assert!(request_departure(&sub).is_ok());
    }

    #[test]
    fn test_commit_departure_records_paid_then_on_the_way() {
        let mut sub = restaurant();
        let ticket = request_departure(&sub).unwrap();
        let transitions = commit_departure(&mut sub, &ticket).unwrap();
        assert_eq!(sub.status, SubOrderStatus::OnTheWay);
        assert_eq!(transitions.len(), 2);
        assert_eq!(transitions[0].to, SubOrderStatus::Paid);
        assert_eq!(transitions[1].to, SubOrderStatus::OnTheWay);
    }

    #[test]
    fn test_commit_fails_if_status_moved() {
        let mut sub = restaurant();
        let ticket = request_departure(&sub).unwrap();
        // Another actor committed first.
        commit_departure(&mut sub, &ticket).unwrap();
        assert!(matches!(
            commit_departure(&mut sub, &ticket),
            Err(FulfillmentError::InvalidTransition { .. })
        ));
        assert_eq!(sub.status, SubOrderStatus::OnTheWay);
    }

    #[test]
    fn test_no_skipping_to_delivery() {
        let mut sub = regular();
        assert!(matches!(
            confirm_delivery(&mut sub, true),
            Err(FulfillmentError::InvalidTransition { .. })
        ));
        assert_eq!(sub.status, SubOrderStatus::Accepted);
    }

    #[test]
    fn test_delivery_gated_on_proof() {
        let mut sub = restaurant();
        let ticket = request_departure(&sub).unwrap();
        commit_departure(&mut sub, &ticket).unwrap();

        let err = confirm_delivery(&mut sub, false).unwrap_err();
        assert!(matches!(err, FulfillmentError::ProofRequired { .. }));
        assert_eq!(sub.status, SubOrderStatus::OnTheWay);

        confirm_delivery(&mut sub, true).unwrap();
        assert_eq!(sub.status, SubOrderStatus::Delivered);
    }

    #[test]
    fn test_delivery_from_at_customer() {
        let mut sub = restaurant();
        let ticket = request_departure(&sub).unwrap();
        commit_departure(&mut sub, &ticket).unwrap();
        arrive_at_customer(&mut sub).unwrap();
        confirm_delivery(&mut sub, true).unwrap();
        assert_eq!(sub.status, SubOrderStatus::Delivered);
    }

    #[test]
    fn test_mark_item_only_while_shopping() {
        let mut sub = regular();
        assert!(matches!(
            mark_item(&mut sub, "item-a", MarkRequest::NotFound),
            Err(FulfillmentError::NotShopping { .. })
        ));
    }

    #[test]
    fn test_mark_item_defaults_to_full_quantity() {
        let mut sub = regular();
        start_shopping(&mut sub).unwrap();
        let outcome = mark_item(&mut sub, "item-a", MarkRequest::Found { quantity: None }).unwrap();
        assert_eq!(outcome.effective_quantity, dec!(2));
        assert!(!outcome.clamped);
    }

    #[test]
    fn test_mark_item_clamps_out_of_range() {
        let mut sub = regular();
        start_shopping(&mut sub).unwrap();

        let over = mark_item(
            &mut sub,
            "item-a",
            MarkRequest::Found { quantity: Some(dec!(5)) },
        )
        .unwrap();
        assert_eq!(over.effective_quantity, dec!(2));
        assert!(over.clamped);

        let negative = mark_item(
            &mut sub,
            "item-a",
            MarkRequest::Found { quantity: Some(dec!(-1)) },
        )
        .unwrap();
        assert_eq!(negative.effective_quantity, dec!(2));
        assert!(negative.clamped);

        // Invariant after any toggle: 0 <= found <= ordered.
        let item = sub.item("item-a").unwrap();
        assert!(item.found_quantity() >= Decimal::ZERO);
        assert!(item.found_quantity() <= item.ordered_quantity);
    }

    #[test]
    fn test_mark_item_partial_then_not_found() {
        let mut sub = regular();
        start_shopping(&mut sub).unwrap();
        mark_item(&mut sub, "item-b", MarkRequest::Found { quantity: Some(dec!(0)) }).unwrap();
        assert_eq!(sub.item("item-b").unwrap().found_quantity(), dec!(0));

        let outcome = mark_item(&mut sub, "item-b", MarkRequest::NotFound).unwrap();
        assert_eq!(outcome.effective_quantity, Decimal::ZERO);
        assert!(!sub.item("item-b").unwrap().is_found());
    }

    #[test]
    fn test_unknown_item() {
        let mut sub = regular();
        start_shopping(&mut sub).unwrap();
        assert!(matches!(
            mark_item(&mut sub, "missing", MarkRequest::NotFound),
            Err(FulfillmentError::UnknownItem { .. })
        ));
    }
}
