pub mod agent;
pub mod attempts;
pub mod connection;
pub mod schema;

pub use attempts::HistoryFilter;
pub use connection::Database;
