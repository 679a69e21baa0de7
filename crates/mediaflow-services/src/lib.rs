//! HTTP backends for the mediaflow engine.
//!
//! Provides `HttpServiceClient`, a `CapabilityClient` implementation
//! that talks to the generation service endpoints over HTTP, plus the
//! `ServiceConfig` it is built from.
//!
//! # Example
//!
//! ```ignore
//! use mediaflow_services::{HttpServiceClient, ServiceConfig};
//!
//! let client = HttpServiceClient::new(ServiceConfig::from_env())?;
//! let report = RunOrchestrator::new(&store, &client, &sink).run().await?;
//! ```

pub mod client;
pub mod config;

pub use client::HttpServiceClient;
pub use config::ServiceConfig;
