//! Core types and trait definitions for the sofimar site backend.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::SiteStore`]; the HTTP layer depends
//! only on that abstraction.

pub mod backend;
pub mod chat;
pub mod document;
pub mod error;
pub mod review;
pub mod singleton;
pub mod store;

pub use backend::BackendKind;
pub use error::{Error, ErrorKind, Result, StoreError};
