//! Recorded depth sessions.
//!
//! A recording is a directory holding `manifest.json` and one 16-bit grayscale
//! PNG per frame with depth. Depth pixels are millimeters, `0` is invalid.
//!
//! ```json
//! {
//!   "frame_rate": 30.0,
//!   "frames": [{
//!     "timestamp": 0.0,
//!     "translation": [0.0, 0.0, 0.0],
//!     "rotation": [0.0, 0.0, 0.0, 1.0],
//!     "intrinsics": { "fx": 500.0, "fy": 500.0, "cx": 320.0, "cy": 240.0, "width": 640, "height": 480 },
//!     "depth": "depth_00000.png",
//!     "tracking": "tracking"
//!   }]
//! }
//! ```

use crate::source::CaptureError;
use glam::{Quat, Vec3};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use voxscan_recon::ingest::{
    DepthCamera, DepthFrame, Intrinsics, Pose, StreamError, TrackingState,
};

pub const MANIFEST_FILE: &str = "manifest.json";

/// Index of a recording.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub frame_rate: Option<f32>,
    pub frames: Vec<FrameRecord>,
}

/// One frame of a recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub timestamp: f64,
    pub translation: Vec3,
    /// Quaternion as `[x, y, z, w]`.
    pub rotation: Quat,
    pub intrinsics: Intrinsics,
    /// Depth PNG relative to the recording directory; `null` when the depth
    /// image was unavailable for this frame.
    pub depth: Option<String>,
    #[serde(default)]
    pub tracking: TrackingState,
}

impl FrameRecord {
    pub fn pose(&self) -> Pose {
        Pose::new(self.translation, self.rotation)
    }
}

/// Replays a recording as a [`DepthCamera`]. Depth images are loaded lazily,
/// one per `next_frame` call.
#[derive(Debug)]
pub struct RecordedSource {
    dir: PathBuf,
    manifest: Manifest,
    cursor: usize,
    autofocus: bool,
}

impl RecordedSource {
    #[tracing::instrument(skip_all, fields(dir = %dir.as_ref().display()))]
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, CaptureError> {
        let dir = dir.as_ref().to_path_buf();
        let file = File::open(dir.join(MANIFEST_FILE))?;
        let manifest: Manifest = serde_json::from_reader(BufReader::new(file))?;
        info!(
            "Opened recording with {} frames from {}",
            manifest.frames.len(),
            dir.display()
        );
        Ok(Self {
            dir,
            manifest,
            cursor: 0,
            autofocus: false,
        })
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn len(&self) -> usize {
        self.manifest.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifest.frames.is_empty()
    }

    /// Frames not yet returned by `next_frame`.
    pub fn remaining(&self) -> usize {
        self.len() - self.cursor
    }

    pub fn autofocus(&self) -> bool {
        self.autofocus
    }

    /// Restart playback from the first frame.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// Load frame `index`, reading its depth PNG if it has one.
    pub fn load_frame(&self, index: usize) -> Result<Option<DepthFrame>, CaptureError> {
        let Some(record) = self.manifest.frames.get(index) else {
            return Ok(None);
        };

        let mut frame = match &record.depth {
            Some(name) => {
                let path = self.dir.join(name);
                // Only 16-bit samples are millimeters; converting would rescale them.
                let depth = match image::open(&path)? {
                    DynamicImage::ImageLuma16(depth) => depth,
                    other => {
                        return Err(CaptureError::UnsupportedDepthFormat {
                            index,
                            path,
                            color: other.color(),
                        });
                    }
                };
                if depth.width() == 0 || depth.height() == 0 {
                    return Err(CaptureError::EmptyDepth { index, path });
                }
                DepthFrame::new(record.timestamp, record.pose(), depth, record.intrinsics)
            }
            None => DepthFrame::without_depth(record.timestamp, record.pose(), record.intrinsics),
        };
        frame.tracking = record.tracking;
        Ok(Some(frame))
    }
}

impl DepthCamera for RecordedSource {
    fn next_frame(&mut self) -> Result<Option<DepthFrame>, StreamError> {
        let frame = self.load_frame(self.cursor)?;
        if frame.is_some() {
            self.cursor += 1;
        }
        Ok(frame)
    }

    fn frame_rate(&self) -> Option<f32> {
        self.manifest.frame_rate
    }

    fn is_active(&self) -> bool {
        self.cursor < self.len()
    }

    fn supports_depth(&self) -> bool {
        true
    }

    fn set_autofocus(&mut self, enabled: bool) -> Result<(), StreamError> {
        // Playback has no lens; remember the request so callers can inspect it.
        self.autofocus = enabled;
        Ok(())
    }
}

/// Writes frames into a recording directory that [`RecordedSource`] can replay.
///
/// The manifest is rewritten after every frame, so the directory is a valid
/// recording at all times.
#[derive(Debug)]
pub struct RecordingWriter {
    dir: PathBuf,
    manifest: Manifest,
}

impl RecordingWriter {
    /// Create (or reuse) `dir` and start an empty recording in it.
    pub fn create(dir: impl AsRef<Path>, frame_rate: Option<f32>) -> Result<Self, CaptureError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        let writer = Self {
            dir,
            manifest: Manifest {
                frame_rate,
                frames: Vec::new(),
            },
        };
        writer.write_manifest()?;
        Ok(writer)
    }

    pub fn len(&self) -> usize {
        self.manifest.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifest.frames.is_empty()
    }

    /// Append `frame`, saving its depth grid as a 16-bit PNG.
    pub fn write_frame(&mut self, frame: &DepthFrame) -> Result<(), CaptureError> {
        let index = self.manifest.frames.len();
        let depth = match &frame.depth {
            Some(depth) => {
                let name = format!("depth_{index:05}.png");
                depth.save(self.dir.join(&name))?;
                Some(name)
            }
            None => None,
        };

        self.manifest.frames.push(FrameRecord {
            timestamp: frame.timestamp,
            translation: frame.pose.translation,
            rotation: frame.pose.rotation,
            intrinsics: frame.intrinsics,
            depth,
            tracking: frame.tracking,
        });
        self.write_manifest()?;
        debug!("Recorded frame {} at t={:.3}", index, frame.timestamp);
        Ok(())
    }

    fn write_manifest(&self) -> Result<(), CaptureError> {
        let text = serde_json::to_string_pretty(&self.manifest)?;
        fs::write(self.dir.join(MANIFEST_FILE), text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use voxscan_recon::DepthImage;

    fn intrinsics() -> Intrinsics {
        Intrinsics::new(100.0, 100.0, 8.0, 6.0, 16, 12)
    }

    #[test]
    fn test_record_and_replay() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = RecordingWriter::create(dir.path(), Some(30.0)).unwrap();

        let depth = DepthImage::from_fn(16, 12, |x, y| Luma([(x * 100 + y) as u16]));
        let pose = Pose::new(Vec3::new(0.1, 0.2, 0.3), Quat::from_rotation_y(0.5));
        writer
            .write_frame(&DepthFrame::new(0.0, pose, depth.clone(), intrinsics()))
            .unwrap();
        writer
            .write_frame(&DepthFrame::without_depth(0.033, pose, intrinsics()))
            .unwrap();
        writer
            .write_frame(
                &DepthFrame::new(0.066, Pose::IDENTITY, depth.clone(), intrinsics())
                    .with_tracking(TrackingState::Paused),
            )
            .unwrap();
        assert_eq!(writer.len(), 3);

        let mut source = RecordedSource::open(dir.path()).unwrap();
        assert_eq!(source.len(), 3);
        assert_eq!(source.frame_rate(), Some(30.0));
        assert!(source.is_active());

        let first = source.next_frame().unwrap().unwrap();
        assert_eq!(first.depth.as_ref().unwrap(), &depth);
        assert_eq!(first.pose, pose);
        assert_eq!(first.intrinsics, intrinsics());

        let second = source.next_frame().unwrap().unwrap();
        assert!(second.depth.is_none());
        assert_eq!(second.timestamp, 0.033);

        let third = source.next_frame().unwrap().unwrap();
        assert_eq!(third.tracking, TrackingState::Paused);

        assert!(source.next_frame().unwrap().is_none());
        assert!(!source.is_active());

        source.rewind();
        assert_eq!(source.remaining(), 3);
    }

    #[test]
    fn test_8bit_depth_png_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = RecordingWriter::create(dir.path(), None).unwrap();
        writer
            .write_frame(&DepthFrame::without_depth(0.0, Pose::IDENTITY, intrinsics()))
            .unwrap();
        image::GrayImage::from_pixel(4, 4, Luma([200u8]))
            .save(dir.path().join("depth_8bit.png"))
            .unwrap();
        let mut manifest = writer.manifest.clone();
        manifest.frames[0].depth = Some("depth_8bit.png".to_string());
        fs::write(
            dir.path().join(MANIFEST_FILE),
            serde_json::to_string(&manifest).unwrap(),
        )
        .unwrap();

        let source = RecordedSource::open(dir.path()).unwrap();
        let err = source.load_frame(0).unwrap_err();
        assert!(matches!(
            err,
            CaptureError::UnsupportedDepthFormat {
                index: 0,
                color: image::ColorType::L8,
                ..
            }
        ));

        let mut source = source;
        assert!(matches!(
            source.next_frame(),
            Err(StreamError::InvalidData(_))
        ));
    }

    #[test]
    fn test_manifest_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = r#"{
            "frames": [{
                "timestamp": 1.0,
                "translation": [1.0, 2.0, 3.0],
                "rotation": [0.0, 0.0, 0.0, 1.0],
                "intrinsics": { "fx": 1.0, "fy": 1.0, "cx": 0.5, "cy": 0.5, "width": 1, "height": 1 },
                "depth": null
            }]
        }"#;
        fs::write(dir.path().join(MANIFEST_FILE), manifest).unwrap();

        let mut source = RecordedSource::open(dir.path()).unwrap();
        assert_eq!(source.frame_rate(), None);
        let frame = source.next_frame().unwrap().unwrap();
        assert_eq!(frame.tracking, TrackingState::Tracking);
        assert_eq!(frame.pose.translation, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_missing_manifest() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            RecordedSource::open(dir.path()),
            Err(CaptureError::Io(_))
        ));
    }

    #[test]
    fn test_missing_depth_image_is_stream_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = RecordingWriter::create(dir.path(), None).unwrap();
        writer
            .write_frame(&DepthFrame::new(
                0.0,
                Pose::IDENTITY,
                DepthImage::new(4, 4),
                intrinsics(),
            ))
            .unwrap();
        fs::remove_file(dir.path().join("depth_00000.png")).unwrap();

        let mut source = RecordedSource::open(dir.path()).unwrap();
        assert!(source.next_frame().is_err());
    }

    #[test]
    fn test_autofocus_is_remembered() {
        let dir = tempfile::tempdir().unwrap();
        RecordingWriter::create(dir.path(), None).unwrap();
        let mut source = RecordedSource::open(dir.path()).unwrap();
        assert!(source.is_empty());
        assert!(source.supports_depth());
        source.set_autofocus(true).unwrap();
        assert!(source.autofocus());
    }
}
