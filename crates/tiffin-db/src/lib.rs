//! Tiffin DB - Database abstractions
//!
//! SQLx-based database layer for Tiffin services. Every table sits behind an
//! async repository trait so the lifecycle layer can run against Postgres in
//! production and in-memory stores in tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use tiffin_db::{create_pool, Repositories, SubscriptionRepository};
//!
//! let pool = create_pool("postgres://localhost/tiffin").await?;
//! tiffin_db::migrate(&pool).await?;
//! let repos = Repositories::new(pool);
//!
//! let sub = repos.subscriptions.find_by_id(id).await?;
//! ```

pub mod error;
pub mod models;
pub mod pg;
pub mod pool;
pub mod repo;

pub use error::{DbError, DbResult};
pub use models::*;
pub use pg::Repositories;
pub use pool::{create_pool, create_pool_with_options, migrate, DbPool, PoolOptions};
pub use repo::*;
