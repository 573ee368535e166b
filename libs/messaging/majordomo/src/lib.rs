//! # Majordomo Protocol
//!
//! Broker, worker and client for MDP/0.1 with the MMI service-discovery
//! extension, running over the framed TCP transport from `network`.
//!
//! ## Architecture Role
//!
//! ```text
//!  Client ──REQUEST──▶ Broker ──REQUEST──▶ Worker ──▶ RequestHandler
//!    ▲                  │  ▲                 │
//!    └──────REPLY───────┘  └──────REPLY──────┘
//! ```
//!
//! - [`Broker`] routes client requests to idle workers per service, answers
//!   `mmi.*` itself and expires silent workers by heartbeat.
//! - [`Worker`] registers one service and feeds requests to a
//!   [`RequestHandler`], reconnecting when the broker goes away.
//! - [`Client`] sends a request and waits for the reply with timeout and
//!   retries.
//!
//! Every long-running loop takes a [`Shutdown`] from [`shutdown::channel`].

pub mod broker;
pub mod client;
pub mod error;
pub mod shutdown;
pub mod worker;

pub use broker::{Broker, BrokerState, PeerId};
pub use client::Client;
pub use error::{MdpError, Result};
pub use shutdown::{Shutdown, ShutdownTrigger};
pub use worker::{RequestHandler, Worker};
