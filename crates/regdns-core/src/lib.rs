// # regdns-core
//
// Core library for managing registrar-hosted DNS declaratively.
//
// ## Architecture Overview
//
// - **ResourceKind**: closed set of manageable entities (DNS record, nameserver set)
// - **PropertyMap**: typed declared/observed state, converted from wire JSON at the boundary
// - **RegistrarApi**: trait over the registrar's REST endpoints
// - **ReconcileEngine**: check/diff/create/update/delete/read lifecycle
// - **ProviderConfig / Credential**: one-time configuration
//
// ## Design Principles
//
// 1. **Registrar is the system of record**: nothing is cached or persisted here
// 2. **Single-shot**: one HTTP attempt per step, failures surface immediately
// 3. **Closed dispatch**: every operation matches exhaustively on `ResourceKind`
// 4. **Immutable credentials**: the API client is built once the token is known

pub mod config;
pub mod engine;
pub mod error;
pub mod resource;
pub mod traits;

// Re-export core types for convenience
pub use config::{Credential, ProviderConfig};
pub use engine::{ReconcileEngine, schema};
pub use error::{Error, Result};
pub use resource::{
    CheckFailure, CheckResult, CreateResult, DiffResult, PropertyMap, PropertyValue, ReadResult,
    ResourceKind,
};
pub use traits::RegistrarApi;
