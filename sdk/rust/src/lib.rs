//! HTTP client for the estate coordinator API.

mod client;

pub use client::{EstateClient, Pending, SdkError, Session};
