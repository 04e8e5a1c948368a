//! GCM Storage Layer
//!
//! Repository traits for devices and message records, with a Diesel/SQLite
//! implementation and an in-process store.

mod error;
mod filter;
mod memory;
mod models;
mod schema;
mod sqlite;
mod traits;

pub use error::*;
pub use filter::*;
pub use memory::MemoryStorage;
pub use models::*;
pub use sqlite::SqliteStorage;
pub use traits::*;

use diesel_migrations::{EmbeddedMigrations, embed_migrations};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");
