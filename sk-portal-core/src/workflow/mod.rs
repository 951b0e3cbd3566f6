//! Explicit state machine for the SK request lifecycle.
//!
//! The design separates:
//! - **State**: the request and its status (`SkRequest`, `RequestStatus`)
//! - **Decisions**: what an actor asks for (`Decision`)
//! - **Effects**: what should be recorded as a result (`Effect`)
//! - **Transition**: pure function `(request, actor, decision) -> (request, effects)`
//!
//! The server persists the transitioned request and its effects atomically.

pub mod effect;
pub mod progress;
pub mod state;
pub mod transition;

pub use effect::*;
pub use progress::*;
pub use state::*;
pub use transition::*;
