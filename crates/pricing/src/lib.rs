//! Pure fee and money arithmetic over an order batch.
//!
//! No I/O and no mutation: every function is deterministic given a [`Batch`]
//! and a scope. Monetary results are rounded to 2 decimal places at the point
//! of return; intermediate sums use unrounded values.

use rust_decimal::Decimal;
use sokoni_types::{round2, Batch, Item, OrderKind, SubOrder};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PricingError {
    #[error("unknown sub-order: {sub_order_id}")]
    UnknownSubOrder { sub_order_id: String },

    #[error("scope 'all' is only valid for single-shop batches: batch {batch_id} is multi-shop")]
    AllScopeOnMultiShop { batch_id: String },
}

/// Which sub-orders a computation covers.
///
/// `All` is legal only for single-shop batches; multi-shop batches must name
/// a sub-order so combined-order numbers never bleed into each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    All,
    SubOrder(String),
}

impl Scope {
    pub fn sub_order(id: impl Into<String>) -> Self {
        Scope::SubOrder(id.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeKind {
    Service,
    Delivery,
}

fn scoped_sub_orders<'a>(
    batch: &'a Batch,
    scope: &Scope,
) -> Result<Vec<&'a SubOrder>, PricingError> {
    match scope {
        Scope::All => {
            if batch.is_multi_shop() {
                return Err(PricingError::AllScopeOnMultiShop {
                    batch_id: batch.id.clone(),
                });
            }
            Ok(batch.sub_orders().collect())
        }
        Scope::SubOrder(id) => {
            let sub = batch
                .sub_order(id)
                .ok_or_else(|| PricingError::UnknownSubOrder {
                    sub_order_id: id.clone(),
                })?;
            Ok(vec![sub])
        }
    }
}

/// Items in scope, de-duplicated by item id.
///
/// Upstream data sometimes repeats a combined order's items inside the
/// primary item list; the first occurrence wins.
pub fn scoped_items<'a>(batch: &'a Batch, scope: &Scope) -> Result<Vec<&'a Item>, PricingError> {
    let subs = scoped_sub_orders(batch, scope)?;
    let mut seen: HashSet<&str> = HashSet::new();
    let mut items = Vec::new();
    for sub in subs {
        for item in &sub.items {
            if seen.insert(item.id.as_str()) {
                items.push(item);
            }
        }
    }
    Ok(items)
}

/// Value of everything the customer ordered within the scope.
///
/// Reel sub-orders price from the reel's own unit price and quantity; this is
/// the single authoritative computation for reel value.
pub fn original_subtotal(batch: &Batch, scope: &Scope) -> Result<Decimal, PricingError> {
    let subs = scoped_sub_orders(batch, scope)?;
    let mut seen: HashSet<&str> = HashSet::new();
    let mut total = Decimal::ZERO;
    for sub in subs {
        match sub.kind.reel_pricing() {
            Some((unit_price, quantity)) => total += unit_price * quantity,
            None => {
                for item in &sub.items {
                    if seen.insert(item.id.as_str()) {
                        total += item.unit_price * item.ordered_quantity;
                    }
                }
            }
        }
    }
    Ok(round2(total))
}

/// Value of what the shopper actually found within the scope.
///
/// Reel and restaurant sub-orders have no find-items step; their full value
/// is payable. Unmarked and not-found items contribute nothing.
pub fn found_subtotal(batch: &Batch, scope: &Scope) -> Result<Decimal, PricingError> {
    let subs = scoped_sub_orders(batch, scope)?;
    let mut seen: HashSet<&str> = HashSet::new();
    let mut total = Decimal::ZERO;
    for sub in subs {
        match &sub.kind {
            OrderKind::ReelFromShop { unit_price, quantity }
            | OrderKind::ReelFromRestaurantOrUser { unit_price, quantity } => {
                total += *unit_price * *quantity;
            }
            OrderKind::Restaurant => {
                for item in &sub.items {
                    if seen.insert(item.id.as_str()) {
                        total += item.unit_price * item.ordered_quantity;
                    }
                }
            }
            OrderKind::Regular => {
                for item in &sub.items {
                    if seen.insert(item.id.as_str()) && item.is_found() {
                        total += item.unit_price * item.found_quantity();
                    }
                }
            }
        }
    }
    Ok(round2(total))
}

/// Refund owed for a single item's shortfall.
pub fn refund_for_item(item: &Item) -> Decimal {
    round2(item.missing_quantity() * item.unit_price)
}

/// Refund owed across the scope: ordered value minus found value.
pub fn refund(batch: &Batch, scope: &Scope) -> Result<Decimal, PricingError> {
    let original = original_subtotal(batch, scope)?;
    let found = found_subtotal(batch, scope)?;
    Ok(round2(original - found))
}

/// Fee of the given kind within the scope.
///
/// A specific sub-order returns its own fee; `All` (single-shop) sums each
/// sub-order's fee exactly once.
pub fn fee(batch: &Batch, kind: FeeKind, scope: &Scope) -> Result<Decimal, PricingError> {
    let subs = scoped_sub_orders(batch, scope)?;
    let mut counted: HashSet<&str> = HashSet::new();
    let mut total = Decimal::ZERO;
    for sub in subs {
        if !counted.insert(sub.id.as_str()) {
            continue;
        }
        total += match kind {
            FeeKind::Service => sub.service_fee,
            FeeKind::Delivery => sub.delivery_fee,
        };
    }
    Ok(round2(total))
}
