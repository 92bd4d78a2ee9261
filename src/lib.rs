//! # Portico
//!
//! A client-side data-access facade for a portfolio → programme →
//! project hierarchy (with tasks, resources, and risks under projects):
//! authenticated CRUD with owner tagging, plus a realtime change stream
//! per table.
//!
//! The facade is built against an abstract capability [`client::Client`]
//! — identity, relational access, and change channels. An embedded
//! SQLite implementation ships in [`store`]; a remote transport client
//! is an external collaborator.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use portico::{Facade, store::SqliteBackend};
//!
//! let backend = SqliteBackend::new("./data/portico.db")?;
//! backend.initialize()?;
//! let app = Facade::new(Arc::new(backend));
//!
//! app.session.sign_in("alice@example.com", "secret").await;
//! let portfolios = app.portfolios.get_all(None).await?;
//! ```
//!
//! Every operation suspends until the backing store answers. Writes
//! issued without awaiting the previous one are not serialized; await
//! sequentially when ordering matters.

pub mod client;
pub mod config;
pub mod error;
pub mod facade;
pub mod realtime;
pub mod repo;
pub mod session;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use client::Client;
pub use error::{Error, Result};
pub use facade::Facade;
pub use realtime::{ChangeNotifier, Subscription};
pub use repo::Repository;
pub use session::SessionProvider;
pub use types::{ChangeEvent, ChangeKind, EntityKind, Principal, Record, Row, SessionOutcome};
