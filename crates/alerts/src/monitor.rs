//! Edge-triggered low-stock monitoring.

use stockbook_catalog::Product;
use stockbook_core::WarehouseId;

use crate::notification::Notification;

/// Evaluate a balance change against the product's threshold.
///
/// Fires only on the downward crossing: the new balance is strictly below
/// the threshold while the previous one was not. Further drops while already
/// low stay silent until the balance first recovers to the threshold or
/// above. A zero threshold means "unset" and never fires.
pub fn evaluate_low_stock(
    product: &Product,
    warehouse: WarehouseId,
    previous: i64,
    current: i64,
) -> Option<Notification> {
    if product.min_stock == 0 {
        return None;
    }
    let threshold = product.min_stock as i64;
    if current < threshold && previous >= threshold {
        Some(Notification::low_stock(warehouse, product, current))
    } else {
        None
    }
}
