//! # Toolgate Core Library
//!
//! Domain types and configuration shared by the gateway and the server binary.
//!
//! ## Modules
//!
//! - `branding` - Product naming and default endpoint values
//! - `clock` - Time source abstraction (system clock, manual clock for tests)
//! - `config` - Environment-driven server configuration
//! - `domain` - Core value objects (sessions, credentials, lifecycle phases)

pub mod branding;
pub mod clock;
pub mod config;
pub mod domain;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::{
    ConfigError, DelegatedLoginConfig, IdentityConfig, ServerConfig, ServiceCredentials,
    SseConfig,
};
pub use domain::*;
