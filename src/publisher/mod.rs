//! Publisher: connection lifecycle and the fixed-interval publish cycle
//!
//! - [`status`] - Connection state shared with broker callbacks
//! - [`policy`] - Explicit reconnect ceiling and linear backoff
//! - [`publisher_loop`] - Startup, steady-state ticks and shutdown

pub mod policy;
pub mod publisher_loop;
pub mod status;

pub use policy::{ReconnectDecision, ReconnectPolicy, DEFAULT_MAX_ATTEMPTS};
pub use publisher_loop::{
    LoopTimings, PublishOutcome, PublisherLoop, TickOutcome, INITIAL_CONNECT_TIMEOUT,
    RECONNECT_ACK_TIMEOUT,
};
pub use status::{ConnectionPhase, ConnectionStatus, LinkState};
