//! `stockbook-alerts` — Low-Stock Monitor and notification plumbing.
//!
//! The monitor decides *whether* a balance change warrants an alert
//! (edge-triggered); the bus carries the resulting notifications to the
//! external delivery worker.

pub mod bus;
pub mod monitor;
pub mod notification;

pub use bus::{InMemoryNotificationBus, NotificationBus, PublishError, Subscription};
pub use monitor::evaluate_low_stock;
pub use notification::{Notification, NotificationKind};
