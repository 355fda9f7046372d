pub mod admission;
pub mod boards;
pub mod engine;
pub mod error;
pub mod locks;
pub mod policy;

pub use admission::{next_step, AdmissionStep};
pub use boards::{Board, BoardKind};
pub use engine::RelayEngine;
pub use error::RelayError;
pub use policy::{should_send_quiet_hours_notice, PolicyEngine, PolicyOutcome};
