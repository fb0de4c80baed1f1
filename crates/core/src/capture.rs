//! Capture sources: a live camera device and uploaded video files.
//!
//! Both are driven through the `ffmpeg`/`ffprobe` binaries. Frames are piped
//! out as PNG on stdout and decoded in-process. Every read made through
//! [`read_frame`] is bounded by a timeout so a stalled device cannot hold a
//! session lock forever.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::FrameNumber;

/// Error type for capture operations.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("capture source is not open")]
    NotOpen,

    #[error("ffprobe/ffmpeg binary not found: {0}")]
    NotFound(std::io::Error),

    #[error("ffprobe/ffmpeg execution failed (exit code {exit_code:?}): {stderr}")]
    ExecutionFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("failed to parse ffprobe output: {0}")]
    ParseError(String),

    #[error("captured frame could not be decoded: {0}")]
    Decode(String),

    #[error("frame {requested} is out of range (video has {frame_count} frames)")]
    FrameOutOfRange {
        requested: FrameNumber,
        frame_count: u64,
    },

    #[error("frame read timed out after {0:?}")]
    Timeout(Duration),

    #[error("video file not found: {0}")]
    VideoNotFound(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<CaptureError> for CoreError {
    fn from(err: CaptureError) -> Self {
        CoreError::Capture(err.to_string())
    }
}

/// Metadata of an opened video file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoInfo {
    pub frame_count: u64,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
}

/// A source of frames held by a session.
#[async_trait]
pub trait FrameSource: Send {
    /// Grab the next frame (the current frame for a live device).
    async fn next_frame(&mut self) -> Result<RgbImage, CaptureError>;

    /// Grab a specific frame. Live devices ignore the frame number.
    async fn frame_at(&mut self, frame_number: FrameNumber) -> Result<RgbImage, CaptureError>;

    /// Release the source and any files it owns.
    async fn close(self: Box<Self>) -> Result<(), CaptureError> {
        Ok(())
    }
}

/// Opens capture sources. Injected into the API state so tests can supply
/// in-memory sources.
#[async_trait]
pub trait FrameSourceProvider: Send + Sync {
    /// Open the configured camera device.
    async fn open_device(&self) -> Result<Box<dyn FrameSource>, CaptureError>;

    /// Open an uploaded video file and report its metadata.
    async fn open_video(
        &self,
        path: &Path,
    ) -> Result<(Box<dyn FrameSource>, VideoInfo), CaptureError>;
}

/// Read one frame, bounded by `timeout`.
///
/// `None` reads the next frame, `Some(n)` seeks to frame `n`.
pub async fn read_frame(
    source: &mut dyn FrameSource,
    frame_number: Option<FrameNumber>,
    timeout: Duration,
) -> Result<RgbImage, CaptureError> {
    let read = async {
        match frame_number {
            Some(n) => source.frame_at(n).await,
            None => source.next_frame().await,
        }
    };
    tokio::time::timeout(timeout, read)
        .await
        .map_err(|_| CaptureError::Timeout(timeout))?
}

// ---------------------------------------------------------------------------
// ffmpeg-backed sources
// ---------------------------------------------------------------------------

/// [`FrameSourceProvider`] backed by the `ffmpeg` and `ffprobe` binaries.
#[derive(Debug, Clone)]
pub struct FfmpegSourceProvider {
    device: String,
    input_format: String,
}

impl FfmpegSourceProvider {
    /// * `device` - device path or name, e.g. `/dev/video0`.
    /// * `input_format` - ffmpeg input format, e.g. `v4l2`.
    pub fn new(device: impl Into<String>, input_format: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            input_format: input_format.into(),
        }
    }
}

#[async_trait]
impl FrameSourceProvider for FfmpegSourceProvider {
    async fn open_device(&self) -> Result<Box<dyn FrameSource>, CaptureError> {
        let mut source = DeviceSource {
            device: self.device.clone(),
            input_format: self.input_format.clone(),
        };
        // A device that cannot deliver a frame is treated as not opened.
        source.next_frame().await?;
        tracing::info!(device = %self.device, "Capture device opened");
        Ok(Box::new(source))
    }

    async fn open_video(
        &self,
        path: &Path,
    ) -> Result<(Box<dyn FrameSource>, VideoInfo), CaptureError> {
        let source = VideoFileSource::open(path).await?;
        let info = source.info.clone();
        Ok((Box::new(source), info))
    }
}

/// Live camera device. Each read spawns a single-frame ffmpeg grab.
#[derive(Debug)]
pub struct DeviceSource {
    device: String,
    input_format: String,
}

#[async_trait]
impl FrameSource for DeviceSource {
    async fn next_frame(&mut self) -> Result<RgbImage, CaptureError> {
        let args = [
            "-v",
            "error",
            "-f",
            self.input_format.as_str(),
            "-i",
            self.device.as_str(),
            "-frames:v",
            "1",
            "-f",
            "image2pipe",
            "-vcodec",
            "png",
            "-",
        ];
        let png = run_ffmpeg(&args).await?;
        decode_png(&png)
    }

    async fn frame_at(&mut self, _frame_number: FrameNumber) -> Result<RgbImage, CaptureError> {
        self.next_frame().await
    }
}

/// An uploaded video file on disk. Owns the file and deletes it on close.
#[derive(Debug)]
pub struct VideoFileSource {
    path: PathBuf,
    info: VideoInfo,
    position: FrameNumber,
}

impl VideoFileSource {
    /// Probe `path` and open it for frame reads.
    pub async fn open(path: &Path) -> Result<Self, CaptureError> {
        let probe = probe_video(path).await?;
        let (width, height) = parse_resolution(&probe);
        let info = VideoInfo {
            frame_count: parse_total_frames(&probe),
            fps: parse_framerate(&probe),
            width,
            height,
        };
        tracing::info!(
            path = %path.display(),
            frame_count = info.frame_count,
            fps = info.fps,
            "Video opened"
        );
        Ok(Self {
            path: path.to_path_buf(),
            info,
            position: 0,
        })
    }

    pub fn info(&self) -> &VideoInfo {
        &self.info
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl FrameSource for VideoFileSource {
    async fn next_frame(&mut self) -> Result<RgbImage, CaptureError> {
        // frame_at advances the position on success.
        self.frame_at(self.position).await
    }

    async fn frame_at(&mut self, frame_number: FrameNumber) -> Result<RgbImage, CaptureError> {
        if self.info.frame_count > 0 && frame_number >= self.info.frame_count {
            return Err(CaptureError::FrameOutOfRange {
                requested: frame_number,
                frame_count: self.info.frame_count,
            });
        }

        let select = format!("select=eq(n\\,{frame_number})");
        let path = self.path.to_string_lossy().into_owned();
        let args = [
            "-v",
            "error",
            "-i",
            path.as_str(),
            "-vf",
            select.as_str(),
            "-vsync",
            "0",
            "-frames:v",
            "1",
            "-f",
            "image2pipe",
            "-vcodec",
            "png",
            "-",
        ];
        let png = run_ffmpeg(&args).await?;
        if png.is_empty() {
            return Err(CaptureError::FrameOutOfRange {
                requested: frame_number,
                frame_count: self.info.frame_count,
            });
        }
        self.position = frame_number + 1;
        decode_png(&png)
    }

    async fn close(self: Box<Self>) -> Result<(), CaptureError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "Removed uploaded video");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

async fn run_ffmpeg(args: &[&str]) -> Result<Vec<u8>, CaptureError> {
    let output = tokio::process::Command::new("ffmpeg")
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(CaptureError::NotFound)?;

    if !output.status.success() {
        return Err(CaptureError::ExecutionFailed {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }
    Ok(output.stdout)
}

fn decode_png(bytes: &[u8]) -> Result<RgbImage, CaptureError> {
    image::load_from_memory_with_format(bytes, image::ImageFormat::Png)
        .map(|img| img.to_rgb8())
        .map_err(|e| CaptureError::Decode(e.to_string()))
}

// ---------------------------------------------------------------------------
// ffprobe
// ---------------------------------------------------------------------------

/// Subset of `ffprobe -print_format json -show_format -show_streams` output.
#[derive(Debug, Deserialize)]
pub struct FfprobeOutput {
    pub streams: Vec<FfprobeStream>,
    pub format: FfprobeFormat,
}

#[derive(Debug, Deserialize)]
pub struct FfprobeStream {
    pub codec_type: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// e.g. "30/1" or "24000/1001"
    pub r_frame_rate: Option<String>,
    pub duration: Option<String>,
    pub nb_frames: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FfprobeFormat {
    pub duration: Option<String>,
}

/// Run `ffprobe` on a video file and parse its JSON output.
pub async fn probe_video(path: &Path) -> Result<FfprobeOutput, CaptureError> {
    if !path.exists() {
        return Err(CaptureError::VideoNotFound(path.display().to_string()));
    }

    let output = tokio::process::Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .await
        .map_err(CaptureError::NotFound)?;

    if !output.status.success() {
        return Err(CaptureError::ExecutionFailed {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    parse_probe_json(&String::from_utf8_lossy(&output.stdout))
}

pub fn parse_probe_json(json: &str) -> Result<FfprobeOutput, CaptureError> {
    serde_json::from_str(json).map_err(|e| CaptureError::ParseError(format!("{e}: {json}")))
}

fn first_video_stream(probe: &FfprobeOutput) -> Option<&FfprobeStream> {
    probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
}

/// Video duration in seconds, from the container or the first video stream.
pub fn parse_duration(probe: &FfprobeOutput) -> f64 {
    probe
        .format
        .duration
        .as_deref()
        .or_else(|| first_video_stream(probe).and_then(|s| s.duration.as_deref()))
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Frame rate of the first video stream, 0 when unknown.
pub fn parse_framerate(probe: &FfprobeOutput) -> f64 {
    first_video_stream(probe)
        .and_then(|s| s.r_frame_rate.as_deref())
        .map(parse_fraction)
        .unwrap_or(0.0)
}

/// Frame count from `nb_frames`, else estimated from duration and fps.
pub fn parse_total_frames(probe: &FfprobeOutput) -> u64 {
    let declared = first_video_stream(probe)
        .and_then(|s| s.nb_frames.as_deref())
        .and_then(|n| n.parse::<u64>().ok());
    if let Some(n) = declared {
        return n;
    }

    let (duration, fps) = (parse_duration(probe), parse_framerate(probe));
    if duration > 0.0 && fps > 0.0 {
        (duration * fps).round() as u64
    } else {
        0
    }
}

pub fn parse_resolution(probe: &FfprobeOutput) -> (u32, u32) {
    first_video_stream(probe)
        .map(|s| (s.width.unwrap_or(0), s.height.unwrap_or(0)))
        .unwrap_or((0, 0))
}

/// Parse `"30/1"` style fractions. A zero denominator yields 0.
fn parse_fraction(s: &str) -> f64 {
    match s.split_once('/') {
        Some((num, den)) => {
            let num = num.parse::<f64>().unwrap_or(0.0);
            let den = den.parse::<f64>().unwrap_or(0.0);
            if den > 0.0 {
                num / den
            } else {
                0.0
            }
        }
        None => s.parse::<f64>().unwrap_or(0.0),
    }
}
