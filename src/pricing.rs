//! Token pricing and cost estimation.

use serde::{Deserialize, Serialize};

/// Default input rate in USD per million tokens.
pub const DEFAULT_INPUT_PER_MILLION: f64 = 3.00;
/// Default output rate in USD per million tokens.
pub const DEFAULT_OUTPUT_PER_MILLION: f64 = 15.00;

const TOKENS_PER_MILLION: f64 = 1_000_000.0;

/// Fixed per-million-token rates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    #[serde(default = "default_input_per_million")]
    pub input_per_million: f64,
    #[serde(default = "default_output_per_million")]
    pub output_per_million: f64,
}

fn default_input_per_million() -> f64 {
    DEFAULT_INPUT_PER_MILLION
}
fn default_output_per_million() -> f64 {
    DEFAULT_OUTPUT_PER_MILLION
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            input_per_million: DEFAULT_INPUT_PER_MILLION,
            output_per_million: DEFAULT_OUTPUT_PER_MILLION,
        }
    }
}

impl Pricing {
    /// Estimate the USD cost of an exchange.
    ///
    /// `input / 1e6 * input_rate + output / 1e6 * output_rate`
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // token counts never approach 2^52
    pub fn estimate_cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        let input_cost = input_tokens as f64 / TOKENS_PER_MILLION * self.input_per_million;
        let output_cost = output_tokens as f64 / TOKENS_PER_MILLION * self.output_per_million;
        input_cost + output_cost
    }
}

/// Estimate cost at the default rates.
#[must_use]
pub fn estimate_cost(input_tokens: u64, output_tokens: u64) -> f64 {
    Pricing::default().estimate_cost(input_tokens, output_tokens)
}
