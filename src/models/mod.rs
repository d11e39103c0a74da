pub mod agent;
pub mod attempt;
pub mod capture;
pub mod extraction;

pub use agent::*;
pub use attempt::{AttemptMetadata, AttemptResult};
pub use capture::{CaptureResult, NavigationMeta, ScreenshotMode};
pub use extraction::{ApiKeySource, ExtractionResult, ExtractionUsage, QualityReport, ValidatedRecord};
