//! Tiffin Types - Shared domain types
//!
//! This crate contains domain types used across Tiffin services:
//! - Identifiers, roles and the acting user
//! - Subscriptions and their status state machine
//! - Orders (one scheduled meal each), plans, trial types and slots
//! - Credits and platform-wide lifecycle settings

pub mod credit;
pub mod error;
pub mod order;
pub mod plan;
pub mod session;
pub mod settings;
pub mod subscription;
pub mod user;

pub use credit::*;
pub use error::*;
pub use order::*;
pub use plan::*;
pub use session::*;
pub use settings::*;
pub use subscription::*;
pub use user::*;
