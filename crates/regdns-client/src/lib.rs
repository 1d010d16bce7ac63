// # regdns HTTP client
//
// Talks to the registrar's REST API on behalf of the reconciliation engine.
//
// - `auth`: Ed25519 challenge/response login producing a bearer token
// - `http`: `HttpRegistrarApi`, the `RegistrarApi` implementation
//
// ## Security Requirements
//
// - The private key never leaves the process and never appears in logs
// - The bearer token never appears in logs or Debug output
// - Configuration fails fast on a missing or malformed credential
//
// ## Failure Model
//
// One HTTP attempt per call. Any status other than 200 is returned as
// `Error::Api` with the status code and the response body verbatim.

pub mod auth;
pub mod http;

pub use auth::{SigningIdentity, authenticate};
pub use http::HttpRegistrarApi;
