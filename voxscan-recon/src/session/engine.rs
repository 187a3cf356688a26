//! The scan engine: session state machine, capture path and reconstruction worker.
//!
//! The capture thread owns a [`ScanEngine`] and feeds it frames. Keyframes are
//! only touched through `&mut self`, so they need no lock; when a scan stops
//! they are frozen into an `Arc<[Keyframe]>` and handed to a worker thread.
//! The worker publishes its result through the shared slot that every
//! [`ScanView`] reads.
//!
//! Each scan carries a generation number. Starting a new scan or resetting
//! bumps it, which makes an outstanding reconstruction stop at its next
//! keyframe boundary and discard its output.

use crate::config::ScanConfig;
use crate::error::SessionError;
use crate::ingest::{DepthCamera, DepthFrame, Pose};
use crate::reconstruction::{
    Keyframe, KeyframeSelector, LivePreview, ReconstructionPipeline, ScanResult,
};
use crate::session::events::{EventBus, ScanEvent};
use crate::session::published::Published;
use crate::session::state::SessionState;
use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use std::io::Write;
use std::ops::ControlFlow;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info};
use voxscan_data::{PointSet, write_file_atomically, write_obj, write_ply};

const WORKER_THREAD_NAME: &str = "voxscan-reconstruct";

/// Why a frame did not contribute to the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotScanning,
    TrackingLost,
    NoDepth,
}

/// What [`ScanEngine::process_frame`] did with a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Skipped(SkipReason),
    /// Used for the live preview only.
    Previewed,
    /// Retained as a keyframe; carries the new keyframe count.
    KeyframeRetained(usize),
}

#[derive(Debug, Clone, Copy, Default)]
struct SessionStatus {
    state: SessionState,
    generation: u64,
}

/// State shared between the engine, its views and the worker thread.
#[derive(Debug, Default)]
struct Shared {
    status: Mutex<SessionStatus>,
    result: Published<ScanResult>,
    preview: Published<PointSet>,
    events: EventBus,
}

impl Shared {
    fn state(&self) -> SessionState {
        self.status.lock().state
    }

    /// Enter `state` under a fresh generation and drop everything published.
    fn begin(&self, state: SessionState) -> u64 {
        let mut status = self.status.lock();
        status.generation += 1;
        status.state = state;
        self.result.clear();
        self.preview.clear();
        self.events.emit(ScanEvent::StateChanged(state));
        self.events.emit(ScanEvent::KeyframeCountChanged(0));
        status.generation
    }

    /// Invalidate any outstanding reconstruction without changing state.
    fn supersede(&self) {
        self.status.lock().generation += 1;
    }

    fn emit_if_current(&self, generation: u64, event: ScanEvent) -> bool {
        let status = self.status.lock();
        if status.generation != generation {
            return false;
        }
        self.events.emit(event);
        true
    }

    /// Publish `result` and enter `ViewingResult`, unless the run was superseded.
    fn complete(&self, generation: u64, result: ScanResult) -> bool {
        let mut status = self.status.lock();
        if status.generation != generation || status.state != SessionState::Processing {
            return false;
        }
        let point_count = result.point_count();
        self.result.publish(Arc::new(result));
        status.state = SessionState::ViewingResult;
        self.events.emit(ScanEvent::ProcessingComplete);
        self.events.emit(ScanEvent::ResultReady { point_count });
        self.events.emit(ScanEvent::StateChanged(SessionState::ViewingResult));
        true
    }
}

/// Read-only handle onto an engine's published state. Clone it into a render
/// or UI thread.
#[derive(Debug, Clone)]
pub struct ScanView {
    shared: Arc<Shared>,
}

impl ScanView {
    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    pub fn subscribe(&self) -> Receiver<ScanEvent> {
        self.shared.events.subscribe()
    }

    /// Latest live preview, while scanning.
    pub fn preview(&self) -> Option<Arc<PointSet>> {
        self.shared.preview.get()
    }

    /// The completed reconstruction, once one exists.
    pub fn result(&self) -> Option<Arc<ScanResult>> {
        self.shared.result.get()
    }

    /// Points a renderer should draw right now: the live preview while
    /// scanning, the final point set otherwise. Empty when neither exists.
    pub fn draw_points(&self) -> Arc<PointSet> {
        let points = if self.state().shows_result() {
            self.shared.result.get().map(|r| Arc::clone(&r.points))
        } else {
            self.shared.preview.get()
        };
        points.unwrap_or_default()
    }
}

/// Keyframes of the current session. Appended to while scanning, frozen
/// once handed to a reconstruction.
#[derive(Debug)]
enum KeyframeStore {
    Capturing(Vec<Keyframe>),
    HandedOff(Arc<[Keyframe]>),
}

impl KeyframeStore {
    fn len(&self) -> usize {
        match self {
            KeyframeStore::Capturing(frames) => frames.len(),
            KeyframeStore::HandedOff(frames) => frames.len(),
        }
    }

    /// Append while capturing. Scanning always starts from a cleared store,
    /// so a handed-off store is never appended to.
    fn push(&mut self, keyframe: Keyframe) -> usize {
        match self {
            KeyframeStore::Capturing(frames) => {
                frames.push(keyframe);
                frames.len()
            }
            KeyframeStore::HandedOff(frames) => frames.len(),
        }
    }

    fn hand_off(&mut self) -> Arc<[Keyframe]> {
        let frames: Arc<[Keyframe]> =
            match std::mem::replace(self, KeyframeStore::Capturing(Vec::new())) {
                KeyframeStore::Capturing(frames) => frames.into(),
                KeyframeStore::HandedOff(frames) => frames,
            };
        *self = KeyframeStore::HandedOff(Arc::clone(&frames));
        frames
    }
}

impl Default for KeyframeStore {
    fn default() -> Self {
        KeyframeStore::Capturing(Vec::new())
    }
}

/// A single scanning session engine.
///
/// Frames go in through [`ScanEngine::process_frame`]; results come out through
/// [`ScanEngine::result`], the exporters, and the event stream.
pub struct ScanEngine {
    config: ScanConfig,
    selector: KeyframeSelector,
    keyframes: KeyframeStore,
    anchor: Option<Pose>,
    preview: LivePreview,
    pipeline: ReconstructionPipeline,
    view: ScanView,
    workers: Vec<JoinHandle<()>>,
}

impl ScanEngine {
    /// Create an idle engine. Fails if `config` does not validate.
    pub fn new(config: ScanConfig) -> Result<Self, SessionError> {
        config.validate()?;
        Ok(Self {
            selector: KeyframeSelector::new(config.keyframe.min_move),
            keyframes: KeyframeStore::default(),
            anchor: None,
            preview: LivePreview::from_config(&config),
            pipeline: ReconstructionPipeline::from_config(&config),
            view: ScanView {
                shared: Arc::new(Shared::default()),
            },
            workers: Vec::new(),
            config,
        })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// A cloneable read-only handle for other threads.
    pub fn view(&self) -> ScanView {
        self.view.clone()
    }

    pub fn state(&self) -> SessionState {
        self.view.state()
    }

    pub fn subscribe(&self) -> Receiver<ScanEvent> {
        self.view.subscribe()
    }

    pub fn keyframe_count(&self) -> usize {
        self.keyframes.len()
    }

    /// Pose of the first keyframe of the session, once one exists.
    pub fn anchor(&self) -> Option<&Pose> {
        self.anchor.as_ref()
    }

    pub fn preview(&self) -> Option<Arc<PointSet>> {
        self.view.preview()
    }

    pub fn result(&self) -> Option<Arc<ScanResult>> {
        self.view.result()
    }

    pub fn draw_points(&self) -> Arc<PointSet> {
        self.view.draw_points()
    }

    /// Begin a fresh scan from any state. All keyframes, the anchor, the
    /// preview and any result are discarded; an outstanding reconstruction
    /// is superseded.
    pub fn start_scanning(&mut self) {
        let previous = self.state();
        self.clear_capture();
        let generation = self.view.shared.begin(SessionState::Scanning);
        info!("Scan started (generation {}, was {})", generation, previous);
    }

    /// Return to `Idle` from any state, discarding everything.
    pub fn reset(&mut self) {
        self.clear_capture();
        self.view.shared.begin(SessionState::Idle);
        info!("Session reset");
    }

    /// End the scan and reconstruct the retained keyframes on a worker thread.
    ///
    /// Returns as soon as the worker is started; progress and completion are
    /// reported through events.
    pub fn stop_and_process(&mut self) -> Result<(), SessionError> {
        let shared = Arc::clone(&self.view.shared);
        let generation = {
            let mut status = shared.status.lock();
            if status.state != SessionState::Scanning {
                return Err(SessionError::InvalidTransition {
                    state: status.state,
                    action: "stop scanning",
                });
            }
            status.state = SessionState::Processing;
            shared
                .events
                .emit(ScanEvent::StateChanged(SessionState::Processing));
            status.generation
        };

        let keyframes = self.keyframes.hand_off();
        let anchor = self.anchor;
        let pipeline = self.pipeline.clone();
        info!("Processing {} keyframes", keyframes.len());

        self.workers.retain(|handle| !handle.is_finished());
        let worker_shared = Arc::clone(&shared);
        let spawned = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || reconstruct(&worker_shared, &pipeline, &keyframes, anchor, generation));

        match spawned {
            Ok(handle) => {
                self.workers.push(handle);
                Ok(())
            }
            Err(e) => {
                error!("Failed to spawn reconstruction worker: {}", e);
                shared.complete(generation, ScanResult::empty(self.config.voxel.leaf_size));
                Err(SessionError::WorkerSpawn(e))
            }
        }
    }

    /// Feed one camera frame. Runs on the capture path and never blocks on
    /// reconstruction.
    pub fn process_frame(&mut self, frame: &DepthFrame) -> FrameOutcome {
        let shared = &self.view.shared;
        if let Some(distance) = frame.center_depth_m() {
            shared.events.emit(ScanEvent::DistanceChanged(distance));
        }

        if shared.state() != SessionState::Scanning {
            return FrameOutcome::Skipped(SkipReason::NotScanning);
        }
        if !frame.is_tracking() {
            return FrameOutcome::Skipped(SkipReason::TrackingLost);
        }
        if frame.depth.is_none() {
            return FrameOutcome::Skipped(SkipReason::NoDepth);
        }

        if let Some(points) = self.preview.generate(frame) {
            shared.preview.publish(Arc::new(points));
        }

        if !self.selector.consider(&frame.pose) {
            return FrameOutcome::Previewed;
        }
        let Some(keyframe) = Keyframe::from_frame(frame) else {
            return FrameOutcome::Skipped(SkipReason::NoDepth);
        };
        self.anchor.get_or_insert(frame.pose);
        let count = self.keyframes.push(keyframe);
        shared.events.emit(ScanEvent::KeyframeCountChanged(count));
        debug!("Keyframe {} retained at t={:.3}", count, frame.timestamp);
        FrameOutcome::KeyframeRetained(count)
    }

    /// Block until every started reconstruction has finished, then return the
    /// current result. Not for use on the capture path.
    pub fn wait_for_result(&mut self) -> Result<Arc<ScanResult>, SessionError> {
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                error!("Reconstruction worker panicked");
            }
        }
        self.result().ok_or(SessionError::NoResult)
    }

    /// Write the final point set as ASCII PLY. Returns the point count.
    pub fn export_ply<W: Write>(&self, writer: W) -> Result<usize, SessionError> {
        let result = self.result().ok_or(SessionError::NoResult)?;
        write_ply(&result.points, writer)?;
        Ok(result.point_count())
    }

    /// Write the exposed-face voxel mesh as OBJ. Returns the face count.
    pub fn export_obj<W: Write>(&self, writer: W) -> Result<usize, SessionError> {
        let result = self.result().ok_or(SessionError::NoResult)?;
        let mesh = result.mesh();
        write_obj(&mesh, writer)?;
        Ok(mesh.face_count())
    }

    /// [`ScanEngine::export_ply`] into a file, replacing it only on success.
    #[tracing::instrument(skip(self), fields(path = %path.display()))]
    pub fn export_ply_to_path(&self, path: &Path) -> Result<usize, SessionError> {
        let result = self.result().ok_or(SessionError::NoResult)?;
        write_file_atomically(path, |file| write_ply(&result.points, file))?;
        info!("Exported {} points", result.point_count());
        Ok(result.point_count())
    }

    /// [`ScanEngine::export_obj`] into a file, replacing it only on success.
    #[tracing::instrument(skip(self), fields(path = %path.display()))]
    pub fn export_obj_to_path(&self, path: &Path) -> Result<usize, SessionError> {
        let result = self.result().ok_or(SessionError::NoResult)?;
        let mesh = result.mesh();
        write_file_atomically(path, |file| write_obj(&mesh, file))?;
        info!("Exported {} faces", mesh.face_count());
        Ok(mesh.face_count())
    }

    /// Prepare a camera for scanning: require automatic depth support and
    /// turn autofocus on.
    pub fn configure_camera(&self, camera: &mut dyn DepthCamera) -> Result<(), SessionError> {
        if !camera.supports_depth() {
            return Err(SessionError::DepthUnsupported);
        }
        camera.set_autofocus(true)?;
        debug!("Camera configured for depth capture");
        Ok(())
    }

    pub fn set_autofocus(
        &self,
        camera: &mut dyn DepthCamera,
        enabled: bool,
    ) -> Result<(), SessionError> {
        camera.set_autofocus(enabled)?;
        Ok(())
    }

    fn clear_capture(&mut self) {
        self.keyframes = KeyframeStore::default();
        self.selector.reset();
        self.anchor = None;
    }
}

impl Drop for ScanEngine {
    fn drop(&mut self) {
        self.view.shared.supersede();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

/// Worker body: run the pipeline and publish unless superseded.
fn reconstruct(
    shared: &Shared,
    pipeline: &ReconstructionPipeline,
    keyframes: &[Keyframe],
    anchor: Option<Pose>,
    generation: u64,
) {
    let run = panic::catch_unwind(AssertUnwindSafe(|| {
        pipeline.run(keyframes, anchor.as_ref(), &mut |fraction| {
            if shared.emit_if_current(generation, ScanEvent::ProgressChanged(fraction)) {
                ControlFlow::Continue(())
            } else {
                ControlFlow::Break(())
            }
        })
    }));

    let result = match run {
        Ok(Some(result)) => result,
        Ok(None) => {
            debug!("Reconstruction generation {} superseded", generation);
            return;
        }
        Err(_) => {
            error!("Reconstruction panicked, publishing an empty result");
            ScanResult::empty(pipeline.params().leaf_size)
        }
    };

    if !shared.complete(generation, result) {
        debug!("Discarding result of superseded generation {}", generation);
    }
}
