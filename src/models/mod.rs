//! Data models for the selector-addressed score core
//!
//! `core` holds the score tree, `selectors` the coordinate algebra, and
//! `modifiers` the time-spanning annotation model.

pub mod core;
pub mod modifiers;
pub mod selectors;

// Re-export commonly used types
pub use self::core::*;
pub use self::modifiers::*;
pub use self::selectors::{Selector, TICK_UNSET};
