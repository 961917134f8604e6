//! Domain models for the marketplace.
//!
//! Repositories in [`crate::db`] map rows into these types; route handlers
//! serialize them (or narrower response types) back out as JSON.

pub mod order;
pub mod product;
pub mod session;
pub mod user;
pub mod vendor;

pub use order::{NewOrder, NewOrderItem, Order, OrderItem};
pub use product::{NewProduct, Product};
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;
pub use vendor::{
    ConnectState, ProfileUpdate, StoreSettings, SubscriptionState, SubscriptionUpdate, Vendor,
};
