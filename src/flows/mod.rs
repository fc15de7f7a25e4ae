//! Conversation state machine for multi-step admin data entry
//!
//! One linear form per flow (AddMentor, AddEvent, per-field EditEvent),
//! driven by a shared step-sequence engine over declarative field specs.
//! Commits to the store happen outside this module.

pub mod session;
pub mod steps;

pub use session::{AdvanceOutcome, FlowKind, Session, SessionStore, StepOutcome};
pub use steps::{EventField, FieldValue, EVENT_DATE_FORMAT};
