//! HTTP access to the bundle API with retry and error classification

pub mod client;

pub use client::{BundleClient, RetryPolicy};
