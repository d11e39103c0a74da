pub mod block;
pub mod capture;
pub mod document;
pub mod engine;
pub mod playwright;
pub mod scripts;
pub mod scroll;
pub mod session;

pub use capture::{CaptureEngine, CaptureOptions, ScrollStrategy};
pub use engine::{FetchedResource, Locator, NavResponse, PageOptions, RenderEngine, RenderPage, WaitCondition};
pub use playwright::PlaywrightEngine;
pub use session::SessionStore;
