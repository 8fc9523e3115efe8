//! # Horizon Core Types
//!
//! The shared data model for multi-period rebalancing requests.
//!
//! ## Architectural Principles
//!
//! - **Layer 0:** This crate has no knowledge of solvers, HTTP or configuration files.
//!   Every other crate in the workspace depends on it.
//! - **Validate Once:** A raw `OptimizationRequest` is turned into an immutable
//!   `ProblemSpec` exactly once. Everything downstream relies on its invariants
//!   instead of re-checking the request.
//!
//! ## Public API
//!
//! - `AssetId` / `AssetSet`: Asset identifiers and the ordered universe, cash included.
//! - `Period`: A 1-based period index that serializes as its string label.
//! - `Parameters` / `ParameterOverrides`: The risk and cost limits with their defaults.
//! - `OptimizationRequest`: The inbound payload, as parsed by the transport layer.
//! - `ProblemSpec`: The validated problem handed to the model builder.
//! - `ValidationError`: Everything that can be wrong with a request.

pub mod asset;
pub mod error;
pub mod parameters;
pub mod period;
pub mod request;
pub mod spec;

pub use asset::{AssetId, AssetSet, CASH};
pub use error::ValidationError;
pub use parameters::{ParameterOverrides, Parameters};
pub use period::Period;
pub use request::OptimizationRequest;
pub use spec::{ProblemSpec, DEFAULT_WEIGHT_SUM_TOLERANCE};
