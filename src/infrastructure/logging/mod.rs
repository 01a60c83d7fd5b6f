//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - Pretty or JSON stdout output
//! - JSON log files with rotation via tracing-appender
//! - `RUST_LOG` overrides through `EnvFilter`

pub mod logger;

pub use logger::{parse_log_level, LoggerImpl, LOG_FILE_NAME};
