pub mod extraction;
pub mod json;
pub mod openai;
pub mod pricing;
pub mod prompts;
pub mod provider;
pub mod router;
pub mod types;

pub use extraction::{ExtractionClient, ModelCredentials, PlannedAction};
pub use prompts::{OutputStyle, PromptPreset};
pub use provider::LLMProvider;
pub use router::{create_provider, HttpProviderFactory, ProviderFactory};
pub use types::LLMResponse;
