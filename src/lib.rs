pub mod chrome;
pub mod cli;
pub mod config;
pub mod error;
pub mod js_templates;
pub mod output;
pub mod retry;
pub mod scrape;
pub mod site;
pub mod store;
pub mod timeouts;
pub mod utils;

pub use chrome::{PageDriver, SessionLauncher};
pub use config::Config;
pub use error::ScrapeError;
pub use scrape::{ResultDocument, RunOutcome, SnapshotAssembler};
pub use store::SnapshotStore;

pub type Result<T> = std::result::Result<T, ScrapeError>;
