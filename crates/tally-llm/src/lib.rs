//! Tally LLM - Multi-provider request orchestration
//!
//! Routes a chat-completion request across several independently configured
//! LLM backends:
//!
//! - Provider instances are grouped into **priority tiers** (lower value =
//!   more preferred).
//! - Within a tier, one instance is picked by the [`LoadBalancer`]
//!   (round-robin, weighted, or random).
//! - On error the [`MultiProviderService`] marks the instance unhealthy in
//!   memory and **fails over** to the next tier.
//! - A background health checker periodically probes every enabled instance
//!   and persists the refreshed health flags.
//!
//! ## Key Design Principles
//!
//! 1. Adapters never retry and never return silently-empty content —
//!    failover decisions depend on errors propagating cleanly.
//! 2. Callers of `generate_*` receive a structured [`LlmRequestResult`],
//!    never a raw error.
//! 3. The service is explicitly constructed and torn down (`shutdown`);
//!    there is no process-wide singleton.

pub mod balancer;
pub mod config;
pub mod error;
pub mod health;
pub mod log;
pub mod providers;
pub mod service;
pub mod types;

pub use balancer::*;
pub use config::*;
pub use error::*;
pub use log::*;
pub use providers::*;
pub use service::*;
pub use types::*;
