//! Selector-Addressed Score Model Core
//!
//! The addressing, ordering, and structural-reconciliation layer the music
//! notation editor is built on: selector coordinates with their two
//! orderings (editing order and time order), on-demand resolution into
//! borrowed selections, time-spanning staff modifiers anchored by selector
//! pairs, and reconciliation of flat tuplet/tie/slur marker streams into
//! nested score structures.
//!
//! The core is single-threaded and synchronous. The score tree is the only
//! owner of musical material; everything else holds re-resolvable selector
//! coordinates, so editing layers can splice note arrays freely and
//! staleness shows up as `None` from resolution, never as dangling
//! references.

pub mod converters;
pub mod diagnostics;
pub mod models;
pub mod reconcile;
pub mod selection;

// Re-export commonly used types
pub use models::core::*;
pub use models::modifiers::*;
pub use models::selectors::{Selector, TICK_UNSET};
