//! On-disk store for annotated frames and per-video manifests.
//!
//! Layout: `{root}/{video_id}/{video_id}_frame_{index}.jpg` plus one
//! `manifest.json` per video directory. The manifest is authoritative;
//! a directory scan only backs it up for stores written by older runs.

use image::RgbImage;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

use sightline_models::{VideoId, VideoManifest, MANIFEST_FILE_NAME};

use crate::annotate::encode_jpeg;
use crate::error::{MediaError, MediaResult};

/// Extension used for persisted frames.
const FRAME_EXT: &str = ".jpg";

/// Separator between the video id and the frame index in file names.
const FRAME_MARKER: &str = "_frame_";

/// A frame file known to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFrame {
    /// Zero-based index in the source video
    pub index: u64,
    /// File name within the video directory
    pub file_name: String,
    /// Absolute path to the JPEG
    pub path: PathBuf,
}

/// Handle to the annotated frame store rooted at one directory.
#[derive(Debug, Clone)]
pub struct FrameStore {
    root: PathBuf,
}

impl FrameStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one video's frames and manifest.
    pub fn video_dir(&self, video_id: &VideoId) -> PathBuf {
        self.root.join(video_id.as_str())
    }

    /// Canonical frame file name: `{video_id}_frame_{index}.jpg`.
    pub fn frame_file_name(video_id: &VideoId, frame_index: u64) -> String {
        format!("{}{}{}{}", video_id, FRAME_MARKER, frame_index, FRAME_EXT)
    }

    /// Recover the frame index from a file name produced by
    /// [`FrameStore::frame_file_name`]. Splits on the last `_frame_`
    /// marker so video ids containing the marker still round-trip.
    pub fn parse_frame_index(file_name: &str) -> MediaResult<u64> {
        let stem = file_name
            .strip_suffix(FRAME_EXT)
            .ok_or_else(|| MediaError::InvalidFrameName(file_name.to_string()))?;
        let (_, index) = stem
            .rsplit_once(FRAME_MARKER)
            .ok_or_else(|| MediaError::InvalidFrameName(file_name.to_string()))?;
        index
            .parse::<u64>()
            .map_err(|_| MediaError::InvalidFrameName(file_name.to_string()))
    }

    /// Remove a video's frame directory, if present. Re-processing a
    /// video starts from an empty directory so stale frames from a
    /// longer earlier run cannot leak into search results.
    pub async fn clear_video(&self, video_id: &VideoId) -> MediaResult<()> {
        let dir = self.video_dir(video_id);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Encode and persist one annotated frame. Returns the file name
    /// within the video directory.
    pub async fn save_frame(
        &self,
        video_id: &VideoId,
        frame_index: u64,
        image: &RgbImage,
    ) -> MediaResult<String> {
        let dir = self.video_dir(video_id);
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = Self::frame_file_name(video_id, frame_index);
        let bytes = encode_jpeg(image)?;
        tokio::fs::write(dir.join(&file_name), &bytes).await?;
        Ok(file_name)
    }

    /// Persist the manifest for a video, replacing any previous one.
    /// Written to a temp name then renamed so readers never observe a
    /// half-written manifest.
    pub async fn write_manifest(&self, manifest: &VideoManifest) -> MediaResult<()> {
        let dir = self.video_dir(&manifest.video_id);
        tokio::fs::create_dir_all(&dir).await?;

        let bytes = serde_json::to_vec_pretty(manifest)?;
        let tmp = dir.join(format!("{}.tmp", MANIFEST_FILE_NAME));
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, dir.join(MANIFEST_FILE_NAME)).await?;
        Ok(())
    }

    /// Load a video's manifest. `Ok(None)` when no manifest exists;
    /// `Err` when one exists but cannot be read or parsed.
    pub async fn load_manifest(&self, video_id: &VideoId) -> MediaResult<Option<VideoManifest>> {
        let path = self.video_dir(video_id).join(MANIFEST_FILE_NAME);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Enumerate a video's stored frames in ascending frame order.
    ///
    /// Prefers the manifest; falls back to scanning the directory for
    /// frame-named JPEGs when the manifest is absent or unreadable. A
    /// video with no directory at all yields an empty list.
    pub async fn list_frames(&self, video_id: &VideoId) -> MediaResult<Vec<StoredFrame>> {
        let dir = self.video_dir(video_id);

        match self.load_manifest(video_id).await {
            Ok(Some(manifest)) => {
                let mut frames: Vec<StoredFrame> = manifest
                    .frames
                    .iter()
                    .map(|f| StoredFrame {
                        index: f.frame_index,
                        file_name: f.filename.clone(),
                        path: dir.join(&f.filename),
                    })
                    .collect();
                frames.sort_by_key(|f| f.index);
                return Ok(frames);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(video_id = %video_id, error = %e, "unreadable manifest, falling back to directory scan");
            }
        }

        let mut read_dir = match tokio::fs::read_dir(&dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut frames = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.ends_with(FRAME_EXT) {
                continue;
            }
            match Self::parse_frame_index(&name) {
                Ok(index) => frames.push(StoredFrame {
                    index,
                    file_name: name,
                    path: entry.path(),
                }),
                Err(_) => debug!(file = %name, "skipping non-frame file"),
            }
        }

        frames.sort_by_key(|f| f.index);
        Ok(frames)
    }

    /// Resolve a store-relative path (`{video_id}/{file}`) to an
    /// absolute one, rejecting traversal out of the store root.
    pub fn resolve(&self, relative: &str) -> MediaResult<PathBuf> {
        let rel = Path::new(relative);
        if rel.is_absolute() {
            return Err(MediaError::SecurityViolation(format!(
                "absolute path rejected: {}",
                relative
            )));
        }
        for component in rel.components() {
            match component {
                Component::Normal(_) => {}
                _ => {
                    return Err(MediaError::SecurityViolation(format!(
                        "path traversal rejected: {}",
                        relative
                    )))
                }
            }
        }
        Ok(self.root.join(rel))
    }
}
