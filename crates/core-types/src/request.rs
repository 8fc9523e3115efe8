use crate::parameters::ParameterOverrides;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The inbound payload exactly as the transport layer parsed it.
///
/// Nothing here has been checked yet; `ProblemSpec::from_request` does that.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizationRequest {
    /// Asset → weight at the start of the first period.
    pub initial_weights: BTreeMap<String, f64>,
    /// Asset → (period label → forecast return).
    pub estimated_returns: BTreeMap<String, BTreeMap<String, f64>>,
    #[serde(default)]
    pub parameters: Option<ParameterOverrides>,
}
