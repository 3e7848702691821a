//! Domain value objects
//!
//! - Sessions (`SessionId`)
//! - Transports (`TransportKind`)
//! - Credentials (`TrustModel`, `CachedCredential`, `LoginCorrelation`)
//! - Server lifecycle (`ServerPhase`)

mod credential;
mod phase;
mod session;
mod transport;

pub use credential::*;
pub use phase::*;
pub use session::*;
pub use transport::*;
