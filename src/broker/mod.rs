//! livecast broker
//!
//! The fan-out core: per-topic subscriber groups, the latest snapshot per
//! topic, and one adaptive refresh job per topic that has subscribers.
//!
//! Public types:
//! - `Broker`: subscription manager and entry point for the transport.
//! - `TopicRegistry` / `Topic`: the keyed store of per-topic records.
//! - `RefreshScheduler` / `RefreshPolicy`: phase-driven refresh jobs.
//! - `fanout`: best-effort delivery to a topic's open connections.

pub mod engine;
pub mod fanout;
pub mod message;
pub mod registry;
pub mod scheduler;
pub mod topic;

pub use engine::Broker;
pub use scheduler::RefreshPolicy;
pub use topic::TopicKey;
