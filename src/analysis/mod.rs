//! Remote collaborators
//!
//! The pose-analysis endpoint and the session bookkeeping service. Both are
//! object-safe traits returning boxed futures so the controller can hold them
//! behind `Arc<dyn ...>` and tests can substitute scripted fakes.

pub mod http;
pub mod result;
pub mod service;

use futures::future::BoxFuture;

use crate::error::AnalysisError;

pub use http::HttpAnalysisGateway;
pub use result::{AnalysisResult, Landmark, NO_PERSON_WARNING, REP_COMPLETED_EVENT};
pub use service::{HttpSessionService, NoopSessionService, SessionService};

/// Submits one encoded frame and returns the structured analysis
pub trait AnalysisGateway: Send + Sync {
    /// `image_base64` is a base64 JPEG payload
    fn analyze(&self, image_base64: String) -> BoxFuture<'static, Result<AnalysisResult, AnalysisError>>;
}
