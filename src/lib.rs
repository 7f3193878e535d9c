//! # livecast
//!
//! `livecast` is an in-memory live-event fan-out hub. Clients connect over
//! WebSockets and subscribe to a topic; for every topic that has at least one
//! subscriber the hub polls an upstream source on a cadence matched to how
//! "live" the topic currently is, caches the merged snapshot, and pushes it to
//! every subscriber. Upstream load scales with the number of distinct topics,
//! not with the number of connections.
//!
//! ## Core Modules
//!
//! - `broker`: topic registry, refresh scheduling, fanout and the subscription manager.
//! - `client`: a connected WebSocket client's outbound handle.
//! - `config`: layered settings from file and environment.
//! - `source`: the snapshot source abstraction and the bundled NHL source.
//! - `transport`: the WebSocket server and the inbound message protocol.
//! - `utils`: error types and logging setup.

pub mod broker;
pub mod client;
pub mod config;
pub mod source;
pub mod transport;
pub mod utils;
