pub mod config;
pub mod entry;
pub mod error;
pub mod fallback;
pub mod generator;
pub mod io;
pub mod ledger;
pub mod paths;
pub mod prompts;
pub mod repair;
pub mod store;
pub mod task;
pub mod textgen;
pub mod types;
pub mod vocabulary;
pub mod workflow;

pub use error::{BragError, Result};
