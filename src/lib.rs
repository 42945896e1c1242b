pub mod config;
pub mod error;
pub mod observability;
pub mod pricing;
pub mod protocol;
pub mod session;
pub mod stream;
pub mod transport;

pub use error::BridgeError;
pub use session::{ChatSession, EventSink};
