//! Common utilities and shared types for pollhub.
//!
//! This crate provides foundational components used across all pollhub crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based unique identifiers via [`IdGenerator`]
//! - **Violations**: Field-scoped validation findings via [`Violations`]
//!
//! # Example
//!
//! ```no_run
//! use pollhub_common::{Config, IdGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     let id = id_gen.generate();
//!     println!("Generated ID: {} (strict: {})", id, config.engine.strict_question_lock);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod validation;

pub use config::{Config, EngineConfig};
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
pub use validation::{Violation, ViolationKind, Violations};
