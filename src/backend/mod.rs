//! Session backends
//!
//! A backend opens a session for a subject and later receives the full event
//! list for scoring. The test runner only talks to this trait.

pub mod local;

#[cfg(feature = "http")]
pub mod http;

pub use local::LocalBackend;

#[cfg(feature = "http")]
pub use http::{HttpBackend, HttpBackendConfig};

use crate::error::ReadinessError;
use crate::types::{FinalizeResponse, ReadinessEvent};

/// Server side of a readiness session
pub trait ReadinessBackend {
    /// Open a session for `subject_id` and return its id
    fn create_session(&mut self, subject_id: &str) -> Result<String, ReadinessError>;

    /// Submit the ordered event list and return the computed score
    fn finalize_session(
        &mut self,
        session_id: &str,
        events: &[ReadinessEvent],
    ) -> Result<FinalizeResponse, ReadinessError>;
}

impl<B: ReadinessBackend + ?Sized> ReadinessBackend for &mut B {
    fn create_session(&mut self, subject_id: &str) -> Result<String, ReadinessError> {
        (**self).create_session(subject_id)
    }

    fn finalize_session(
        &mut self,
        session_id: &str,
        events: &[ReadinessEvent],
    ) -> Result<FinalizeResponse, ReadinessError> {
        (**self).finalize_session(session_id, events)
    }
}
