//! Settings storage
//!
//! Each effect owns one or more [`Settings`] groups built from a static schema.
//! The store is the source of truth; effects observe it through
//! [`Settings::subscribe`] and keep only derived, cached state.

mod schema;
mod store;

pub use schema::{SettingKind, SettingSpec, SettingValue};
pub use store::{Settings, Subscription};
