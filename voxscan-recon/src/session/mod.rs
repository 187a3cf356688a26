//! Scan session control
//!
//! [`ScanEngine`] owns the capture-side state (keyframes, anchor, selector)
//! and hands it to a worker thread when a scan stops. Values read by other
//! threads live behind [`ScanView`], which is cheap to clone.

pub mod engine;
pub mod events;
pub mod published;
pub mod state;

pub use engine::{FrameOutcome, ScanEngine, ScanView, SkipReason};
pub use events::{EventBus, ScanEvent};
pub use published::Published;
pub use state::SessionState;
