//! MongoDB persistence
//!
//! Collections: `forms`, `travelers`, `binders`, `users`, `groups`.
//! Integration tests would require a running MongoDB instance.

mod indexes;
pub mod mongo;
mod store;

pub use mongo::{IntoIndexes, MongoClient, MongoCollection};
pub use store::MongoStore;
