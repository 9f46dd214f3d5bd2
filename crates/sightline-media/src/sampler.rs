//! Strided frame sampling over an FFmpeg rawvideo pipe.
//!
//! FFmpeg decodes every frame to packed RGB24 on stdout; the stream
//! reader counts frames as they arrive and only materializes every
//! N-th one as an [`image::RgbImage`]. Skipped frames are read into a
//! scratch buffer and dropped, so memory stays flat regardless of video
//! length.

use image::RgbImage;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tracing::debug;

use crate::error::{MediaError, MediaResult};
use crate::probe::VideoInfo;

/// Default sampling stride: every 5th frame.
pub const DEFAULT_STRIDE: u64 = 5;

/// One decoded frame selected by the sampler.
#[derive(Debug, Clone)]
pub struct SampledFrame {
    /// Zero-based index in the source video
    pub index: u64,
    /// Presentation time in seconds (`index / fps`)
    pub timestamp: f64,
    /// Decoded RGB pixels at source resolution
    pub image: RgbImage,
}

/// Opens strided frame streams over source videos.
#[derive(Debug, Clone, Copy)]
pub struct FrameSampler {
    stride: u64,
}

impl FrameSampler {
    /// Create a sampler with the given stride. Frame 0 is always
    /// sampled; a stride of 1 samples every frame.
    pub fn new(stride: u64) -> MediaResult<Self> {
        if stride == 0 {
            return Err(MediaError::InvalidStride(stride));
        }
        Ok(Self { stride })
    }

    pub fn stride(&self) -> u64 {
        self.stride
    }

    /// Spawn FFmpeg and return a lazy frame stream over the video.
    ///
    /// The caller supplies probe info so frame byte geometry is known up
    /// front; a zero-sized frame means the probe found no usable video
    /// stream.
    pub async fn open(
        &self,
        path: impl AsRef<Path>,
        info: &VideoInfo,
    ) -> MediaResult<FrameStream<BufReader<ChildStdout>>> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(MediaError::FileNotFound(path.to_path_buf()));
        }
        if info.width == 0 || info.height == 0 {
            return Err(MediaError::InvalidVideo(format!(
                "unusable frame geometry {}x{}",
                info.width, info.height
            )));
        }

        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-hide_banner", "-loglevel", "error", "-i"])
            .arg(path)
            .args(["-pix_fmt", "rgb24", "-f", "rawvideo", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(video = %path.display(), stride = self.stride, "spawning FFmpeg frame decoder");

        let mut child = cmd.spawn().map_err(|e| {
            MediaError::ffmpeg_failed(format!("Failed to spawn FFmpeg: {}", e), None, None)
        })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            MediaError::ffmpeg_failed("Failed to capture FFmpeg stdout", None, None)
        })?;
        let stderr = child.stderr.take();

        let fps = if info.fps > 0.0 { info.fps } else { 30.0 };

        Ok(FrameStream::with_child(
            BufReader::new(stdout),
            child,
            stderr,
            self.stride,
            fps,
            info.width,
            info.height,
        ))
    }
}

impl Default for FrameSampler {
    fn default() -> Self {
        Self {
            stride: DEFAULT_STRIDE,
        }
    }
}

/// Lazy stream of sampled frames over packed RGB24 bytes.
///
/// Generic over the byte source so the frame loop can run against any
/// reader, but production streams always wrap an FFmpeg child process
/// whose exit status is checked once the pipe drains.
pub struct FrameStream<R> {
    reader: R,
    child: Option<Child>,
    stderr: Option<ChildStderr>,
    stride: u64,
    fps: f64,
    width: u32,
    height: u32,
    frame_len: usize,
    next_index: u64,
    scratch: Vec<u8>,
    finished: bool,
}

impl<R: AsyncRead + Unpin> FrameStream<R> {
    /// Build a stream over an arbitrary RGB24 byte source.
    pub fn from_reader(reader: R, stride: u64, fps: f64, width: u32, height: u32) -> Self {
        let frame_len = width as usize * height as usize * 3;
        Self {
            reader,
            child: None,
            stderr: None,
            stride: stride.max(1),
            fps: if fps > 0.0 { fps } else { 30.0 },
            width,
            height,
            frame_len,
            next_index: 0,
            scratch: vec![0u8; frame_len],
            finished: false,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn with_child(
        reader: R,
        child: Child,
        stderr: Option<ChildStderr>,
        stride: u64,
        fps: f64,
        width: u32,
        height: u32,
    ) -> Self {
        let mut stream = Self::from_reader(reader, stride, fps, width, height);
        stream.child = Some(child);
        stream.stderr = stderr;
        stream
    }

    /// Pull the next sampled frame, or `None` once the source drains.
    ///
    /// A truncated trailing frame is treated as end of stream; the
    /// decoder's exit status decides whether that end was clean.
    pub async fn next_frame(&mut self) -> MediaResult<Option<SampledFrame>> {
        if self.finished {
            return Ok(None);
        }

        loop {
            let index = self.next_index;
            let sampled = index % self.stride == 0;

            if sampled {
                let mut pixels = vec![0u8; self.frame_len];
                if !self.fill(&mut pixels).await? {
                    return Ok(None);
                }
                self.next_index += 1;

                let image = RgbImage::from_raw(self.width, self.height, pixels)
                    .ok_or_else(|| MediaError::internal("rawvideo frame size mismatch"))?;
                return Ok(Some(SampledFrame {
                    index,
                    timestamp: index as f64 / self.fps,
                    image,
                }));
            }

            // Skipped frame: decode bytes must still be consumed.
            let mut scratch = std::mem::take(&mut self.scratch);
            let filled = self.fill(&mut scratch).await?;
            self.scratch = scratch;
            if !filled {
                return Ok(None);
            }
            self.next_index += 1;
        }
    }

    /// Total frames read off the pipe so far (sampled and skipped).
    pub fn frames_seen(&self) -> u64 {
        self.next_index
    }

    /// Read exactly one frame into `buf`. Returns `false` on end of
    /// stream after verifying the decoder exited cleanly.
    async fn fill(&mut self, buf: &mut [u8]) -> MediaResult<bool> {
        match self.reader.read_exact(buf).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                self.finished = true;
                self.finish().await?;
                Ok(false)
            }
            Err(e) => Err(MediaError::Io(e)),
        }
    }

    /// Reap the decoder process and surface a decode failure if it
    /// exited non-zero.
    async fn finish(&mut self) -> MediaResult<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        let mut stderr_text = String::new();
        if let Some(mut stderr) = self.stderr.take() {
            let _ = stderr.read_to_string(&mut stderr_text).await;
        }

        let status = child.wait().await.map_err(|e| {
            MediaError::ffmpeg_failed(format!("FFmpeg process error: {}", e), None, None)
        })?;

        if !status.success() {
            return Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with an error while decoding",
                Some(stderr_text),
                status.code(),
            ));
        }
        Ok(())
    }
}
