#![forbid(unsafe_code)]

//! Core domain model and conversation logic for the gym training bot.
//!
//! This crate provides:
//! - Domain types (users, catalog, plans, workouts, session drafts)
//! - The conversation engine (plan creation, workout logging)
//! - Durable per-user session storage
//! - Catalog caching and pagination
//! - Summary formatting
//! - The backend abstraction and a file-backed local backend

pub mod types;
pub mod error;
pub mod backend;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod local_backend;
pub mod session;
pub mod paging;
pub mod format;
pub mod engine;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use backend::Backend;
pub use catalog::{build_seed_catalog, CatalogCache};
pub use config::Config;
pub use engine::{Action, Command, Engine, Event, Reply};
pub use format::trim_zeros;
pub use local_backend::LocalBackend;
pub use paging::paginate;
pub use session::SessionStore;
