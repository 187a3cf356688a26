//! Scan and inspect commands.

use glam::Vec3;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use voxscan_capture::{CaptureError, DepthCamera, RecordedSource, StreamError, SyntheticSource};
use voxscan_data::{LoadError, load_points};
use voxscan_recon::{ConfigError, ScanConfig, ScanEngine, ScanEvent, SessionError};

/// Errors surfaced to the command line.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Session(#[from] SessionError),

    #[error("Frame source error: {0}")]
    Stream(#[from] StreamError),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Load error: {0}")]
    Load(#[from] LoadError),
}

/// Logging configuration.
pub struct LoggingConfig {
    pub level: String,
    #[cfg_attr(not(feature = "tracy"), allow(dead_code))]
    pub enable_tracy: bool,
}

impl LoggingConfig {
    /// Install the global subscriber. `RUST_LOG` overrides `level`.
    pub fn init(&self) {
        #[cfg(feature = "tracy")]
        {
            if self.enable_tracy {
                use tracing_subscriber::Layer;
                use tracing_subscriber::layer::SubscriberExt;
                use tracing_subscriber::util::SubscriberInitExt;
                tracing_subscriber::registry()
                    .with(tracing_tracy::TracyLayer::default())
                    .with(
                        tracing_subscriber::fmt::layer().with_filter(
                            tracing_subscriber::EnvFilter::try_from_default_env()
                                .unwrap_or_else(|_| self.level.clone().into()),
                        ),
                    )
                    .init();
                return;
            }
        }

        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&self.level)),
            )
            .with_target(false)
            .init();
    }
}

/// Where scan frames come from.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameSource {
    Recording(PathBuf),
    Synthetic(usize),
}

impl FrameSource {
    fn open(&self) -> Result<Box<dyn DepthCamera>, AppError> {
        Ok(match self {
            FrameSource::Recording(dir) => Box::new(RecordedSource::open(dir)?),
            FrameSource::Synthetic(frames) => Box::new(SyntheticSource::new(*frames)),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub source: FrameSource,
    pub config: Option<PathBuf>,
    pub ply: Option<PathBuf>,
    pub obj: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    pub frames: usize,
    pub keyframes: usize,
    pub points: usize,
    pub faces: usize,
}

/// Replay a frame source through a scan engine and export the result.
pub fn run_scan(options: &ScanOptions) -> Result<ScanSummary, AppError> {
    let config = match &options.config {
        Some(path) => ScanConfig::from_json_file(path)?,
        None => ScanConfig::default(),
    };
    let mut engine = ScanEngine::new(config)?;
    let mut camera = options.source.open()?;
    engine.configure_camera(camera.as_mut())?;

    let events = engine.subscribe();
    engine.start_scanning();

    let mut frames = 0;
    while let Some(frame) = camera.next_frame()? {
        engine.process_frame(&frame);
        frames += 1;
        for event in events.try_iter() {
            if let ScanEvent::KeyframeCountChanged(count) = event {
                debug!("Keyframes: {}", count);
            }
        }
    }

    engine.stop_and_process()?;
    let result = engine.wait_for_result()?;
    for event in events.try_iter() {
        match event {
            ScanEvent::ProgressChanged(fraction) => debug!("Reconstruction {:.0}%", fraction * 100.0),
            ScanEvent::ResultReady { point_count } => info!("Result ready: {} points", point_count),
            _ => {}
        }
    }

    let mut faces = result.mesh().face_count();
    if let Some(path) = &options.ply {
        engine.export_ply_to_path(path)?;
    }
    if let Some(path) = &options.obj {
        faces = engine.export_obj_to_path(path)?;
    }

    let summary = ScanSummary {
        frames,
        keyframes: engine.keyframe_count(),
        points: result.point_count(),
        faces,
    };
    info!(
        "Scan finished: {} frames, {} keyframes, {} points, {} exposed faces",
        summary.frames, summary.keyframes, summary.points, summary.faces
    );
    Ok(summary)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InspectSummary {
    pub points: usize,
    pub bounds: Option<(Vec3, Vec3)>,
    /// Bounds after scaling into the unit cube.
    pub normalized_bounds: Option<(Vec3, Vec3)>,
}

/// Load an exported `.ply` or `.obj` and report its extent.
pub fn run_inspect(path: &Path) -> Result<InspectSummary, AppError> {
    let points = load_points(path)?;
    let summary = InspectSummary {
        points: points.len(),
        bounds: points.bounds(),
        normalized_bounds: points.normalized_to_unit_cube().bounds(),
    };

    info!("{}: {} points", path.display(), summary.points);
    if let (Some((min, max)), Some((nmin, nmax))) = (summary.bounds, summary.normalized_bounds) {
        info!("Bounds: {:?} .. {:?}", min, max);
        info!("Unit-cube bounds: {:?} .. {:?}", nmin, nmax);
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_scan_exports_and_inspects() {
        let dir = tempfile::tempdir().unwrap();
        let ply = dir.path().join("scan.ply");
        let obj = dir.path().join("scan.obj");
        let options = ScanOptions {
            source: FrameSource::Synthetic(9),
            config: None,
            ply: Some(ply.clone()),
            obj: Some(obj.clone()),
        };

        let summary = run_scan(&options).unwrap();
        assert_eq!(summary.frames, 9);
        assert_eq!(summary.keyframes, 3);
        assert!(summary.points > 0);
        assert!(summary.faces > 0);

        let cloud = run_inspect(&ply).unwrap();
        assert_eq!(cloud.points, summary.points);
        let (nmin, nmax) = cloud.normalized_bounds.unwrap();
        let limit = Vec3::splat(1.0 + 1e-6);
        assert!(nmin.cmpge(-limit).all() && nmax.cmple(limit).all());

        let mesh = run_inspect(&obj).unwrap();
        assert_eq!(mesh.points, summary.faces * 4);
    }

    #[test]
    fn test_scan_with_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("scan.json");
        std::fs::write(&config, r#"{ "voxel": { "leaf_size": 0.05 } }"#).unwrap();
        let coarse = run_scan(&ScanOptions {
            source: FrameSource::Synthetic(4),
            config: Some(config),
            ply: None,
            obj: None,
        })
        .unwrap();
        let fine = run_scan(&ScanOptions {
            source: FrameSource::Synthetic(4),
            config: None,
            ply: None,
            obj: None,
        })
        .unwrap();
        assert!(coarse.points < fine.points);
    }

    #[test]
    fn test_missing_recording_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_scan(&ScanOptions {
            source: FrameSource::Recording(dir.path().join("nope")),
            config: None,
            ply: None,
            obj: None,
        })
        .unwrap_err();
        assert!(matches!(err, AppError::Capture(CaptureError::Io(_))));
    }

    #[test]
    fn test_inspect_rejects_unknown_extension() {
        assert!(matches!(
            run_inspect(Path::new("cloud.xyz")),
            Err(AppError::Load(LoadError::UnsupportedExtension(_)))
        ));
    }
}
