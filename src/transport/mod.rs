//! The `transport` module is responsible for handling network communication
//! with clients via WebSockets.
//!
//! It defines the inbound message protocol, and implements the WebSocket server
//! itself: accepting connections, parsing subscribe intents and handing them
//! to the broker, and reporting disconnects.

pub mod message;
pub mod websocket;
