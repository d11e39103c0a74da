pub mod agent;
pub mod health;
pub mod history;
pub mod metrics;
pub mod scrape;
