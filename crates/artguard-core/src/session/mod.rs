//! Session domain module.
//!
//! # Module Structure
//!
//! - `model`: the `CreationSession` aggregate
//! - `trigger`: `SessionState`, `ProtectionTrigger` and `MilestonePolicy`
//! - `event`: `SessionEvent`s published to subscribers
//!
//! The lifecycle itself is driven by the session manager in the application crate.

mod event;
mod model;
mod trigger;

pub use event::SessionEvent;
pub use model::CreationSession;
pub use trigger::{MilestoneKind, MilestonePolicy, ProtectionTrigger, SessionState};
