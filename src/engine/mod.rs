//! Pattern tracking engine with deterministic replay semantics.
//!
//! Architecture:
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │  Producers   │────►│ TrackerHandle│────►│ PatternStore │
//! │ (feed/detect)│     │  (mpsc actor)│     │ (clock, log) │
//! └──────────────┘     └──────────────┘     └──────────────┘
//!                                                  │
//!                                                  ▼
//!                      ┌──────────────┐     ┌──────────────┐
//!                      │   Notices    │◄────│   Reducer    │
//!                      │ (tracked/..) │     │  (pure fn)   │
//!                      └──────────────┘     └──────────────┘
//! ```
//!
//! The reducer owns every transition: intake (auto-track above the
//! confidence threshold), per-tick resolution against target and stop,
//! clear-resolved and remove-one. Nothing else mutates tracker state.

pub mod actor;
pub mod events;
pub mod reducer;
pub mod state;
pub mod store;

pub use actor::TrackerHandle;
pub use events::{Event, Notice, Timestamp};
pub use state::{Outcome, TrackedPattern, TrackerState};
pub use store::PatternStore;
