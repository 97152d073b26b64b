//! SQL storage for the sofimar site backend.
//!
//! One [`SqlStore`] serves either a PostgreSQL database (selected from the
//! environment) or an embedded SQLite file, falling back to the file when the
//! database cannot be reached. Queries are written once with `?` placeholders
//! and adapted to the active dialect by [`Connection`].

mod dialect;
mod embedded;
mod networked;
mod store;

pub mod connection;
pub mod error;
pub mod schema;
pub mod selector;
pub mod storage;
pub mod value;

pub use connection::{Connection, Mode, QueryResult};
pub use dialect::translate_placeholders;
pub use error::{Error, Result};
pub use schema::{SchemaReport, ensure_schema};
pub use selector::{Selection, URL_VARIABLES, select_backend};
pub use storage::{Storage, StorageConfig, StorageState};
pub use store::SqlStore;
pub use value::{Row, Value};
