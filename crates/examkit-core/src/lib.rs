//! examkit-core: Exam session engine.
//!
//! Question model and bank loading, unbiased sampling, the countdown, the
//! session state machine, grading, and score reports. Report sinks plug in
//! through the [`traits::ReportSink`] trait.

pub mod bank;
pub mod clock;
pub mod dispatch;
pub mod error;
pub mod grader;
pub mod model;
pub mod report;
pub mod sampler;
pub mod session;
pub mod traits;

pub use error::SessionError;
pub use session::{SessionController, SessionEvent};
