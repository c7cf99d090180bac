//! Traveler - access, sharing and progress engine for laboratory travelers
//!
//! Forms, travelers and binders are shareable documents. This crate decides
//! who may read or write them, keeps share lists and principal
//! back-references in step, drives the three status lifecycles and rolls
//! traveler progress up into binders.
//!
//! ## Components
//!
//! - **Access**: read/write/owner resolution over a document's access record
//! - **Auth**: CAS session gate, group filtering and API basic auth
//! - **Share**: share list edits with asynchronous back-reference upkeep
//! - **Ownership**: owner transfer by display name
//! - **Lifecycle**: form, traveler and binder status state machines
//! - **Progress**: binder work aggregation
//!
//! Storage and directory access sit behind traits; MongoDB and in-memory
//! implementations are provided.

pub mod access;
pub mod auth;
pub mod config;
pub mod db;
pub mod directory;
pub mod lifecycle;
pub mod logging;
pub mod model;
pub mod ownership;
pub mod progress;
pub mod share;
pub mod store;
pub mod types;

pub use access::Principal;
pub use config::Args;
pub use model::{Binder, DocKind, Document, Form, Traveler};
pub use types::{Result, TravelerError};
