// src/ingress/mod.rs

//! HTTP ingress: receives GitHub webhooks and feeds them to the runtime.

pub mod error;
pub mod server;
pub mod signature;

pub use error::IngressError;
pub use server::{IngressConfig, build_router, parse_event, serve};
pub use signature::{sign, sign_sha1, verify_signature};
