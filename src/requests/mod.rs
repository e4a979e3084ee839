//! Step requests: the backend seam, the in-flight request lifecycle and
//! cancellation of calls whose step has gone away.

pub mod abort;
pub mod state_machine;
pub mod submit;
pub mod traits;

pub use abort::{abort_pair, run_abortable, AbortHandle, AbortSignal};
pub use state_machine::{RequestEvent, RequestTicket, StepRequestTracker};
pub use submit::submit_step;
pub use traits::{OnboardingApi, UpstreamRequestError};
