#![forbid(unsafe_code)]

pub mod api;
pub mod config;
pub mod error;
pub mod http;
pub mod memory;
pub mod wire;

pub use api::{ExamGateway, SectionOutcome, SectionStart, StartedAttempt, TestCompletion};
pub use config::GatewayConfig;
pub use error::GatewayError;
pub use http::HttpGateway;
pub use memory::{CallCounts, InMemoryGateway};
