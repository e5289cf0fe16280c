//! Asset session - the shared coordinator every UI surface talks to.

mod session_model;
mod session_service;

#[cfg(test)]
mod session_service_tests;

pub use session_model::{SessionPhase, SessionState};
pub use session_service::AssetSession;
