use std::{
    path::{Path, PathBuf},
    process::{Child, ChildStdin, Command, Stdio},
    sync::atomic::{AtomicBool, Ordering},
};

use crate::{
    compositor::FrameCompositor,
    error::{TickerError, TickerResult},
    model::{CropRect, OutputSettings, Rgb},
    period,
    pixel::PixelBuffer,
    strip::TextStrip,
    tilemap::Tile,
};

#[derive(Clone, Debug)]
pub struct ExportConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub out_path: PathBuf,
    pub overwrite: bool,
    /// Optional crop applied before bytes are emitted; when absent the
    /// crop equals the full frame.
    pub crop: Option<CropRect>,
}

impl ExportConfig {
    pub fn for_output(output: &OutputSettings, out_path: impl Into<PathBuf>) -> Self {
        Self {
            width: output.width,
            height: output.height,
            fps: output.fps,
            out_path: out_path.into(),
            overwrite: true,
            crop: None,
        }
    }

    /// The rectangle actually emitted: the configured crop clipped against
    /// the full frame.
    pub fn encoded_rect(&self) -> CropRect {
        let full = CropRect {
            x: 0,
            y: 0,
            w: self.width,
            h: self.height,
        };
        match self.crop {
            None => full,
            Some(c) => {
                let x = c.x.min(self.width);
                let y = c.y.min(self.height);
                CropRect {
                    x,
                    y,
                    w: c.w.min(self.width - x),
                    h: c.h.min(self.height - y),
                }
            }
        }
    }

    pub fn validate(&self) -> TickerResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(TickerError::validation(
                "export width/height must be non-zero",
            ));
        }
        if self.fps == 0 {
            return Err(TickerError::validation("export fps must be non-zero"));
        }
        let rect = self.encoded_rect();
        if rect.w == 0 || rect.h == 0 {
            return Err(TickerError::validation(
                "export crop leaves no visible pixels",
            ));
        }
        if !rect.w.is_multiple_of(2) || !rect.h.is_multiple_of(2) {
            // The default settings target yuv420p output for maximum
            // compatibility, which requires even dimensions.
            return Err(TickerError::validation(
                "encoded width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        Ok(())
    }
}

pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn ensure_parent_dir(path: &Path) -> TickerResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Streams raw rgb24 frames into a spawned `ffmpeg` process.
///
/// One frame is in flight at a time; a slow encoder back-pressures through
/// the blocking pipe write and simply stalls the export.
pub struct FfmpegEncoder {
    cfg: ExportConfig,
    rect: CropRect,
    child: Child,
    stdin: Option<ChildStdin>,
    scratch: Vec<u8>,
}

impl FfmpegEncoder {
    pub fn new(cfg: ExportConfig) -> TickerResult<Self> {
        cfg.validate()?;
        ensure_parent_dir(&cfg.out_path)?;

        if !cfg.overwrite && cfg.out_path.exists() {
            return Err(TickerError::validation(format!(
                "output file '{}' already exists",
                cfg.out_path.display()
            )));
        }

        if !is_ffmpeg_on_path() {
            return Err(TickerError::export(
                "ffmpeg is required for MP4 export, but was not found on PATH",
            ));
        }

        let rect = cfg.encoded_rect();

        // The system `ffmpeg` binary over a pipe, rather than a native
        // binding, keeps the build free of FFmpeg dev headers/libs.
        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        if cfg.overwrite {
            cmd.arg("-y");
        } else {
            cmd.arg("-n");
        }

        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
            "-s",
            &format!("{}x{}", rect.w, rect.h),
            "-r",
            &cfg.fps.to_string(),
            "-i",
            "pipe:0",
            "-an",
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-preset",
            "veryfast",
            "-b:v",
            "20M",
            "-maxrate",
            "20M",
            "-bufsize",
            "40M",
            "-movflags",
            "+faststart",
        ])
        .arg(&cfg.out_path);

        let mut child = cmd.spawn().map_err(|e| {
            TickerError::export(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| TickerError::export("failed to open ffmpeg stdin (unexpected)"))?;

        Ok(Self {
            scratch: vec![0u8; rect.w as usize * rect.h as usize * 3],
            cfg,
            rect,
            child,
            stdin: Some(stdin),
        })
    }

    pub fn encode_frame(&mut self, frame: &PixelBuffer) -> TickerResult<()> {
        if frame.width() != self.cfg.width || frame.height() != self.cfg.height {
            return Err(TickerError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width(),
                frame.height(),
                self.cfg.width,
                self.cfg.height
            )));
        }

        copy_crop(frame, self.rect, &mut self.scratch);

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(TickerError::export("ffmpeg encoder is already finalized"));
        };

        use std::io::Write as _;
        stdin.write_all(&self.scratch).map_err(|e| {
            TickerError::export(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;

        Ok(())
    }

    pub fn finish(mut self) -> TickerResult<()> {
        drop(self.stdin.take());

        let output = self
            .child
            .wait_with_output()
            .map_err(|e| TickerError::export(format!("failed to wait for ffmpeg to finish: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TickerError::export(format!(
                "ffmpeg exited with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }

    /// Tear the encoder down without waiting for a clean exit (used on
    /// cancellation; the partial output file is left to ffmpeg's mercy).
    pub fn abort(mut self) {
        drop(self.stdin.take());
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Extract the crop window of `frame` into `dst` as packed rgb24 rows.
fn copy_crop(frame: &PixelBuffer, rect: CropRect, dst: &mut [u8]) {
    let row_bytes = rect.w as usize * 3;
    let src = frame.as_bytes();
    for row in 0..rect.h as usize {
        let s = ((rect.y as usize + row) * frame.width() as usize + rect.x as usize) * 3;
        dst[row * row_bytes..(row + 1) * row_bytes].copy_from_slice(&src[s..s + row_bytes]);
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ExportStats {
    pub frames: u32,
    pub seconds: f64,
}

/// Render and encode exactly one seamless loop of `strip`.
///
/// The loop is `period_frames` long at the integer per-frame increment, so
/// the encoded file concatenates with itself without a visible seam. The
/// export renders the given strip only; transitions never appear in a
/// loop-safe file. `cancel` is checked between frames: this is the only
/// preemption point, a blocking pipe write cannot be interrupted.
#[tracing::instrument(skip_all, fields(out = %cfg.out_path.display()))]
pub fn export_loop(
    strip: &TextStrip,
    tiles: &[Tile],
    output: &OutputSettings,
    bg: Rgb,
    cfg: &ExportConfig,
    cancel: &AtomicBool,
) -> TickerResult<ExportStats> {
    cfg.validate()?;
    let period = period::period_frames(strip.len_px(), output.speed_px_per_frame);
    let speed = period::integer_speed(output.speed_px_per_frame);
    tracing::debug!(period, speed, "starting loop export");

    let mut compositor = FrameCompositor::new(cfg.width, cfg.height);
    let mut encoder = FfmpegEncoder::new(cfg.clone())?;

    let mut offset = 0u64;
    for _ in 0..period {
        if cancel.load(Ordering::Relaxed) {
            encoder.abort();
            return Err(TickerError::export("export cancelled"));
        }
        let frame = compositor.render(Some(strip), offset as f64, tiles, bg);
        encoder.encode_frame(frame)?;
        offset += u64::from(speed);
    }

    encoder.finish()?;
    Ok(ExportStats {
        frames: period,
        seconds: f64::from(period) / f64::from(cfg.fps),
    })
}
