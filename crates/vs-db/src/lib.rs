//! vs-db: metadata store for uploaded videos.
//!
//! SQLite-backed storage with connection pooling, embedded migrations, the
//! [`models::VideoRecord`] model and the query functions that drive a
//! record through its `pending -> ready | failed` lifecycle.

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
