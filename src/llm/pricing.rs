use crate::models::ExtractionUsage;

const INPUT_PER_MILLION: f64 = 0.25;
const CACHED_INPUT_PER_MILLION: f64 = 0.025;
const OUTPUT_PER_MILLION: f64 = 2.00;

/// USD cost of one completion. Cached input tokens are billed at the cached
/// rate and excluded from the regular input count.
pub fn calculate_cost(usage: &ExtractionUsage) -> f64 {
    let normal_input = usage.input_tokens.saturating_sub(usage.cached_input_tokens);
    (normal_input as f64 / 1_000_000.0) * INPUT_PER_MILLION
        + (usage.cached_input_tokens as f64 / 1_000_000.0) * CACHED_INPUT_PER_MILLION
        + (usage.output_tokens as f64 / 1_000_000.0) * OUTPUT_PER_MILLION
}
