//! Database layer
//!
//! Database abstraction for the Unmute World backend:
//! - SQLite (default, single-binary deployment)
//! - MySQL (larger deployments)
//!
//! The driver is selected from configuration. Repositories receive a
//! `DynDatabasePool` and dispatch to per-driver SQL.

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
