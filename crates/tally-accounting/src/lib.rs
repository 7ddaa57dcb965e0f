//! Tally Accounting - Smart accounting pipeline
//!
//! Turns one free-text spend/income description into a structured
//! transaction proposal through a linear four-stage pipeline:
//!
//! ```text
//! analyze ──▶ match budget ──▶ match account ──▶ assemble result
//!    │                              │
//!    └─ one LLM call via the        └─ authorization check (fatal)
//!       orchestration layer;
//!       degrades to a default
//!       category on any failure
//! ```
//!
//! Each stage is a pure transform of the running state. Best-effort stages
//! (analyze, budget matching) degrade instead of aborting; the account
//! check is the only fatal stage. Results are cached by
//! `(user, account, description)` with a TTL, so identical repeated text
//! short-circuits the whole pipeline including the outbound LLM call.

pub mod cache;
pub mod error;
pub mod extract;
pub mod matching;
pub mod memory;
pub mod pipeline;
pub mod prompts;
pub mod sources;
pub mod types;

pub use cache::*;
pub use error::*;
pub use memory::*;
pub use pipeline::*;
pub use sources::*;
pub use types::*;
