// Docbatch Infrastructure - HTTP Adapter
// Implements: JobGateway against the document-generation REST API

mod client;
mod error;
mod job_gateway;

pub use client::{build_client, endpoint_url, HttpGatewayConfig};
pub use error::{map_reqwest_error, map_status};
pub use job_gateway::HttpJobGateway;

// Note: reqwest::Error conversion is handled by helper functions
// due to Rust's orphan rules (cannot implement From<reqwest::Error> for AppError here)
