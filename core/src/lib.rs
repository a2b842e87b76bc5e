//! Async API client core for the cycle tracking service.
//!
//! # Overview
//! A typed HTTP client (`ApiClient`) turns a method, a relative path and an
//! optional serializable body into a typed `Result<T, ApiError>`. Domain
//! services (auth, cycles, daily logs, insights, predictions, settings) wrap
//! it, cache what they fetch, and publish their state through
//! `tokio::sync::watch` channels.
//!
//! # Design
//! - Request building and response parsing are pure; the one network await
//!   goes through the `Transport` trait, so tests can script responses.
//! - Status classification is a closed mapping onto `ApiError`.
//! - The bearer token is the only shared mutable client state and is read
//!   once per request at build time.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod environment;
pub mod error;
pub mod http;
pub mod services;
pub mod state;
pub mod token_store;
pub mod transport;
pub mod types;

pub use client::{check_status, ApiClient};
pub use config::ClientConfig;
pub use environment::AppEnvironment;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use state::{RequestStatus, StateCell, Tracked};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore, TokenStoreError};
pub use transport::{ReqwestTransport, Transport, TransportError};
pub use types::{
    AuthResponse, Cycle, DailyLog, FertilityWindow, FlowLevel, Insight, LoginRequest, Prediction,
    Priority, RegisterRequest, ReminderSettings, User, UserSettings,
};
