//! Core traits for regdns
//!
//! - [`RegistrarApi`]: the registrar REST API as seen by the engine

pub mod registrar_api;

pub use registrar_api::{Domain, RecordPayload, RegistrarApi, RemoteRecord, remote_id};
