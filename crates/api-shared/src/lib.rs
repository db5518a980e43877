//! # API Shared
//!
//! Shared definitions for the triage APIs.
//!
//! Contains:
//! - Request and response bodies (`dto` module), each with an OpenAPI schema
//! - The success/failure envelope every operation answers with (`envelope` module)
//! - Shared services like `HealthService`
//!
//! Used by `api-rest` and the runtime binary. Conversions go from domain types into response
//! bodies and from request bodies into engine inputs; nothing here calls the engine.

pub mod dto;
pub mod envelope;
pub mod health;

pub use dto::*;
pub use envelope::*;
pub use health::HealthService;
