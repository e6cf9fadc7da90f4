//! WhatsApp gateway abstraction
//!
//! The actual WhatsApp Web session lives in an external bridge process; this
//! module defines the interface the engine consumes and the HTTP client that
//! talks to the bridge.

mod bridge;
mod events;
mod gateway;

pub use bridge::HttpBridgeGateway;
pub use events::{AckBus, AckEvent, AckLevel};
pub use gateway::{GroupInfo, SendReceipt, SessionStatus, WaGateway};
