//! examkit-sinks: report sink integrations.
//!
//! Implements the `ReportSink` trait for an HTTP webhook and a JSON file
//! archive, and loads `examkit.toml` into exam settings plus sink instances.

pub mod config;
pub mod error;
pub mod file;
pub mod http;
pub mod mock;

pub use config::{
    create_sink, load_config, load_config_from, ExamSettings, ExamkitConfig, SinkConfig,
};
pub use error::SinkError;
pub use file::JsonFileSink;
pub use http::HttpSink;
pub use mock::MockSink;
