//! REST API handlers

pub mod admin;
pub mod checkout;
pub mod credits;
pub mod health;
pub mod internal;
pub mod orders;
pub mod shared;
pub mod subscription;
pub mod webhook;

pub use admin::*;
pub use checkout::*;
pub use credits::*;
pub use health::*;
pub use internal::*;
pub use orders::*;
pub use subscription::*;
pub use webhook::*;
