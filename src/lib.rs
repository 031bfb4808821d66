pub use lifeos_cli::cli;
pub use lifeos_cli::commands;
pub use lifeos_cli::config;
pub use lifeos_cli::logging;
pub use lifeos_cli::{run, AppConfig, Session};

pub use lifeos_assistant as assistant;
pub use lifeos_core as core;
pub use lifeos_core::bus;
pub use lifeos_core::model;
pub use lifeos_sync as sync;
