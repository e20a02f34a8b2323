//! # tkz-catalog: Equipment Catalog Storage
//!
//! Catalog database of measured electrical parameters behind the
//! calculation engine: schema metadata, connection/session management for
//! the embedded SQLite file or a MySQL server, generic single-table and
//! joined-table CRUD, the CSV-driven installer and the impedance lookup
//! that plugs into `tkz-core`.
//!
//! ## Layering
//!
//! - [`schema`] - static [`TableDef`](schema::TableDef) metadata; no
//!   runtime reflection
//! - [`session`] - [`Engine`](session::Engine) binding and transactional
//!   [`session_scope`](session::Engine::session_scope)
//! - [`base_ops`] / [`join_ops`] - CRUD driven by the metadata
//! - [`models`] - validated input structs for the CRUD surface
//! - [`install`] - idempotent deployment from the shipped CSV catalog
//! - [`catalog`] - the [`ImpedanceSource`](tkz_core::ImpedanceSource)
//!   implementation
//!
//! Sessions are short and scoped: acquire, run, commit or roll back, close.
//! Nothing here threads a session through the calculation layers.

pub mod base_ops;
pub mod catalog;
pub mod install;
pub mod join_ops;
pub mod models;
pub mod schema;
pub mod session;
pub mod value;

pub use base_ops::{Frame, Row, TableOps, UpdateMode};
pub use catalog::Catalog;
pub use install::{db_install, default_data_dir};
pub use join_ops::JoinedOps;
pub use models::{
    BreakerRowUpdate, BreakerSource, CableRowUpdate, CableSource, ContactRowUpdate, InsertBreaker,
    InsertCable, InsertContact, InsertTransformer, TransformerRowUpdate, TransformerSource,
};
pub use schema::{table_by_name, TableDef, ALL_TABLES};
pub use session::{Dialect, Engine, Session, CREDENTIALS_FILE};
pub use value::SqlValue;
