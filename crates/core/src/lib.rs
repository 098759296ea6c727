//! Poll engine for pollhub.
//!
//! Every operation takes the acting [`Actor`], checks access through the
//! [`AccessEvaluator`], validates before writing and reports the mutation to
//! the injected [`ActivityRecorder`](services::ActivityRecorder).
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use pollhub_common::{AppResult, Config};
//! use pollhub_core::{Actor, Engine};
//!
//! async fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let db = Arc::new(pollhub_db::init(&config.database).await?);
//!     let engine = Engine::with_db_recorder(db, &config.engine);
//!
//!     let actor = engine.users.authenticate("alice", "correct horse").await?;
//!     let polls = engine.polls.list(&actor, None, 0).await?;
//!     println!("{} polls visible", polls.len());
//!     Ok(())
//! }
//! ```

pub mod access;
pub mod engine;
pub mod services;
pub mod validation;

pub use access::{can_access, AccessEvaluator, Actor, Intent};
pub use engine::Engine;
pub use services::*;
