//! Strict parse, one coercion retry, and quality scoring of model output.

pub mod coercion;
pub mod quality;

use serde_json::Value;
use tracing::{debug, warn};

use crate::models::ValidatedRecord;
use crate::schema::ExtractionSchema;

pub use quality::assess_quality;

pub const SCHEMA_COERCED_FLAG: &str = "schema_coerced";

pub fn validate(raw: &Value, schema: &dyn ExtractionSchema) -> ValidatedRecord {
    let first_errors = match schema.parse(raw) {
        Ok(parsed) => {
            let quality = assess_quality(&parsed, &schema.required_fields());
            return ValidatedRecord::valid(parsed, quality);
        }
        Err(errors) => errors,
    };

    debug!(schema = schema.name(), errors = first_errors.len(), "Strict parse failed, coercing");
    let coerced = coercion::coerce(raw, schema.json_schema());
    match schema.parse(&coerced) {
        Ok(parsed) => {
            let mut quality = assess_quality(&parsed, &schema.required_fields());
            quality.flags.push(SCHEMA_COERCED_FLAG.to_string());
            ValidatedRecord::valid(parsed, quality)
        }
        Err(_) => {
            warn!(schema = schema.name(), errors = ?first_errors, "Validation failed");
            ValidatedRecord::invalid(first_errors)
        }
    }
}
