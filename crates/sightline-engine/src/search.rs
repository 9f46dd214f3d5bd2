//! Cross-modal similarity search over persisted frames.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use sightline_media::{decode_image, FrameStore, MediaError};
use sightline_models::{
    Embedding, MatchResult, SearchResults, TargetId, VideoId, VideoMatches,
};
use sightline_vision::EmbeddingEncoder;

use crate::cache::ResultCache;
use crate::error::{EngineError, EngineResult};
use crate::metrics;
use crate::registry::TargetRegistry;

/// Acceptance settings for similarity search.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Matches must exceed this cosine similarity to be returned
    pub similarity_threshold: f32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.70,
        }
    }
}

/// A persisted frame with its embedding, computed once per search and
/// reused across every requested target.
struct EmbeddedFrame {
    index: u64,
    file_name: String,
    embedding: Embedding,
}

/// Compares persisted frames against registered targets in the shared
/// embedding space.
pub struct SimilaritySearchEngine {
    encoder: Arc<dyn EmbeddingEncoder>,
    registry: Arc<TargetRegistry>,
    cache: Arc<ResultCache>,
    store: FrameStore,
    config: SearchConfig,
}

impl SimilaritySearchEngine {
    pub fn new(
        encoder: Arc<dyn EmbeddingEncoder>,
        registry: Arc<TargetRegistry>,
        cache: Arc<ResultCache>,
        store: FrameStore,
        config: SearchConfig,
    ) -> EngineResult<Self> {
        if !(0.0..=1.0).contains(&config.similarity_threshold) {
            return Err(EngineError::invalid_input(
                "similarity threshold must be within [0, 1]",
            ));
        }
        Ok(Self {
            encoder,
            registry,
            cache,
            store,
            config,
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Search the given videos for the given targets.
    ///
    /// Targets are resolved up front, so one unknown identifier fails
    /// the whole request before any frame is read. A video without
    /// persisted frames contributes nothing rather than failing. Pairs
    /// with no match above the threshold are omitted at both levels of
    /// the result, and every pair that did match is also written to the
    /// result cache under its own (video, target) key.
    pub async fn search(
        &self,
        video_ids: &[VideoId],
        target_ids: &[TargetId],
    ) -> EngineResult<SearchResults> {
        if video_ids.is_empty() {
            return Err(EngineError::invalid_input("video_ids must not be empty"));
        }
        if target_ids.is_empty() {
            return Err(EngineError::invalid_input("target_ids must not be empty"));
        }

        let mut targets = Vec::with_capacity(target_ids.len());
        for id in target_ids {
            let target = self
                .registry
                .get(id)
                .ok_or_else(|| EngineError::UnknownTarget(id.clone()))?;
            targets.push(target);
        }

        let started = Instant::now();
        let mut results = SearchResults::new();
        let mut total_matches = 0u64;
        for video_id in video_ids {
            let frames = self.embed_video_frames(video_id).await?;
            if frames.is_empty() {
                debug!(video_id = %video_id, "No persisted frames, skipping video");
                continue;
            }

            let mut video_matches = VideoMatches::new();
            for target in &targets {
                let matches = rank_matches(
                    video_id,
                    &frames,
                    &target.embedding,
                    self.config.similarity_threshold,
                );
                if matches.is_empty() {
                    continue;
                }
                total_matches += matches.len() as u64;
                self.cache
                    .insert(video_id.clone(), target.id.clone(), matches.clone());
                video_matches.insert(target.id.clone(), matches);
            }
            if !video_matches.is_empty() {
                results.insert(video_id.clone(), video_matches);
            }
        }

        let elapsed = started.elapsed().as_secs_f64();
        metrics::record_search(total_matches, elapsed);
        info!(
            videos = video_ids.len(),
            targets = target_ids.len(),
            matches = total_matches,
            elapsed_secs = elapsed,
            "Search completed"
        );
        Ok(results)
    }

    /// Read and embed every persisted frame of one video, in frame
    /// order. An unreadable or undecodable frame file aborts the search.
    async fn embed_video_frames(&self, video_id: &VideoId) -> EngineResult<Vec<EmbeddedFrame>> {
        let stored = self.store.list_frames(video_id).await?;
        let mut frames = Vec::with_capacity(stored.len());
        for frame in stored {
            let bytes = tokio::fs::read(&frame.path)
                .await
                .map_err(MediaError::from)?;
            let image = decode_image(&bytes)?;
            let embedding = self.encoder.encode_image(&image)?;
            frames.push(EmbeddedFrame {
                index: frame.index,
                file_name: frame.file_name,
                embedding,
            });
        }
        Ok(frames)
    }
}

/// Score one video's frames against one target embedding and keep the
/// frames that clear the threshold, best first. Ties keep ascending
/// frame order (the sort is stable over the insertion order).
fn rank_matches(
    video_id: &VideoId,
    frames: &[EmbeddedFrame],
    target: &Embedding,
    threshold: f32,
) -> Vec<MatchResult> {
    let mut matches: Vec<MatchResult> = frames
        .iter()
        .filter_map(|frame| {
            let similarity = target.cosine_similarity(&frame.embedding);
            (similarity > threshold).then(|| MatchResult {
                frame_index: frame.index,
                similarity,
                frame_path: format!("{}/{}", video_id, frame.file_name),
            })
        })
        .collect();
    matches.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
    });
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use sightline_models::TargetSource;
    use sightline_vision::{VisionError, VisionResult};
    use tempfile::TempDir;

    /// Encoder stub living in plain RGB space: an image embeds as its
    /// first pixel's channels, and a handful of known prompts embed as
    /// unit axes. Cosine similarity then follows directly from color.
    struct StubEncoder;

    impl EmbeddingEncoder for StubEncoder {
        fn encode_image(&self, image: &RgbImage) -> VisionResult<Embedding> {
            let p = image.get_pixel(0, 0);
            Ok(Embedding::new(vec![p[0] as f32, p[1] as f32, p[2] as f32]))
        }

        fn encode_text(&self, text: &str) -> VisionResult<Embedding> {
            match text {
                "red" => Ok(Embedding::new(vec![1.0, 0.0, 0.0])),
                "blue" => Ok(Embedding::new(vec![0.0, 0.0, 1.0])),
                other => Err(VisionError::inference(format!("no stub prompt: {other}"))),
            }
        }
    }

    struct World {
        registry: Arc<TargetRegistry>,
        cache: Arc<ResultCache>,
        store: FrameStore,
        engine: SimilaritySearchEngine,
        tmp: TempDir,
    }

    fn world() -> World {
        let tmp = TempDir::new().unwrap();
        let store = FrameStore::new(tmp.path());
        let encoder: Arc<dyn EmbeddingEncoder> = Arc::new(StubEncoder);
        let registry = Arc::new(TargetRegistry::new(encoder.clone()));
        let cache = Arc::new(ResultCache::new());
        let engine = SimilaritySearchEngine::new(
            encoder,
            registry.clone(),
            cache.clone(),
            store.clone(),
            SearchConfig::default(),
        )
        .unwrap();
        World {
            registry,
            cache,
            store,
            engine,
            tmp,
        }
    }

    fn text(prompt: &str) -> TargetSource {
        TargetSource::Text(prompt.to_string())
    }

    async fn put_frame(store: &FrameStore, video: &VideoId, index: u64, color: [u8; 3]) {
        let image = RgbImage::from_pixel(4, 4, Rgb(color));
        store.save_frame(video, index, &image).await.unwrap();
    }

    #[tokio::test]
    async fn matches_rank_by_descending_similarity() {
        let w = world();
        let video = VideoId::from("v1");
        // Against "red": frame 5 scores ~0.94, frame 0 ~0.89, frame 10
        // (gray) ~0.58 and stays below the threshold.
        put_frame(&w.store, &video, 0, [255, 128, 0]).await;
        put_frame(&w.store, &video, 5, [255, 64, 64]).await;
        put_frame(&w.store, &video, 10, [128, 128, 128]).await;

        let target = w.registry.add(text("red"), "red things").unwrap();
        let results = w
            .engine
            .search(&[video.clone()], &[target.id.clone()])
            .await
            .unwrap();

        let matches = &results[&video][&target.id];
        let indices: Vec<u64> = matches.iter().map(|m| m.frame_index).collect();
        assert_eq!(indices, vec![5, 0]);
        assert!(matches.iter().all(|m| m.similarity > 0.70));
        assert!(matches[0].similarity >= matches[1].similarity);
        assert_eq!(matches[0].frame_path, "v1/v1_frame_5.jpg");
    }

    #[tokio::test]
    async fn empty_entries_are_omitted_at_both_levels() {
        let w = world();
        let v1 = VideoId::from("v1");
        let v2 = VideoId::from("v2");
        put_frame(&w.store, &v1, 0, [255, 0, 0]).await;
        put_frame(&w.store, &v2, 0, [128, 128, 128]).await;

        let red = w.registry.add(text("red"), "red").unwrap();
        let blue = w.registry.add(text("blue"), "blue").unwrap();

        let results = w
            .engine
            .search(&[v1.clone(), v2.clone()], &[red.id.clone(), blue.id.clone()])
            .await
            .unwrap();

        // v2's gray frame matches neither target, so v2 has no entry at
        // all; v1 carries only the target it actually matched.
        assert_eq!(results.len(), 1);
        let v1_matches = &results[&v1];
        assert!(v1_matches.contains_key(&red.id));
        assert!(!v1_matches.contains_key(&blue.id));
    }

    #[tokio::test]
    async fn unknown_target_fails_the_whole_search() {
        let w = world();
        let video = VideoId::from("v1");
        put_frame(&w.store, &video, 0, [255, 0, 0]).await;
        let known = w.registry.add(text("red"), "red").unwrap();

        let err = w
            .engine
            .search(
                &[video],
                &[known.id.clone(), TargetId::from("text_9")],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::UnknownTarget(id) if id.as_str() == "text_9"));
        assert!(w.cache.is_empty());
    }

    #[tokio::test]
    async fn unprocessed_videos_are_tolerated() {
        let w = world();
        let processed = VideoId::from("v1");
        put_frame(&w.store, &processed, 0, [255, 0, 0]).await;
        let target = w.registry.add(text("red"), "red").unwrap();

        let results = w
            .engine
            .search(
                &[VideoId::from("never-processed"), processed.clone()],
                &[target.id.clone()],
            )
            .await
            .unwrap();

        assert!(!results.contains_key(&VideoId::from("never-processed")));
        assert!(results.contains_key(&processed));
    }

    #[tokio::test]
    async fn cache_keys_pair_each_video_with_its_own_target() {
        let w = world();
        let v1 = VideoId::from("v1");
        let v2 = VideoId::from("v2");
        put_frame(&w.store, &v1, 0, [255, 0, 0]).await;
        put_frame(&w.store, &v2, 0, [0, 0, 255]).await;

        let red = w.registry.add(text("red"), "red").unwrap();
        let blue = w.registry.add(text("blue"), "blue").unwrap();

        w.engine
            .search(&[v1.clone(), v2.clone()], &[red.id.clone(), blue.id.clone()])
            .await
            .unwrap();

        // Each video's matches live under its own pair, never under
        // another target from the same request.
        let v1_red = w.cache.get(&v1, &red.id).unwrap();
        assert_eq!(v1_red.len(), 1);
        assert_eq!(v1_red[0].frame_path, "v1/v1_frame_0.jpg");
        assert!(w.cache.get(&v1, &blue.id).is_none());

        let v2_blue = w.cache.get(&v2, &blue.id).unwrap();
        assert_eq!(v2_blue[0].frame_path, "v2/v2_frame_0.jpg");
        assert!(w.cache.get(&v2, &red.id).is_none());
    }

    #[tokio::test]
    async fn image_targets_match_frames_of_the_same_color() {
        let w = world();
        let video = VideoId::from("v1");
        put_frame(&w.store, &video, 0, [250, 10, 10]).await;

        let ref_path = w.tmp.path().join("reference.png");
        RgbImage::from_pixel(4, 4, Rgb([255, 0, 0]))
            .save(&ref_path)
            .unwrap();
        let target = w
            .registry
            .add(TargetSource::Image(ref_path), "alice")
            .unwrap();
        assert_eq!(target.id.as_str(), "image_0");

        let results = w
            .engine
            .search(&[video.clone()], &[target.id.clone()])
            .await
            .unwrap();
        assert_eq!(results[&video][&target.id].len(), 1);
    }

    #[tokio::test]
    async fn corrupt_frame_file_aborts_the_search() {
        let w = world();
        let video = VideoId::from("v1");
        put_frame(&w.store, &video, 0, [255, 0, 0]).await;
        std::fs::write(
            w.store.video_dir(&video).join("v1_frame_3.jpg"),
            b"not a jpeg",
        )
        .unwrap();

        let target = w.registry.add(text("red"), "red").unwrap();
        let err = w
            .engine
            .search(&[video], &[target.id.clone()])
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Media(_)));
    }

    #[tokio::test]
    async fn empty_request_lists_are_rejected() {
        let w = world();
        let target = w.registry.add(text("red"), "red").unwrap();

        let err = w
            .engine
            .search(&[], &[target.id.clone()])
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));

        let err = w
            .engine
            .search(&[VideoId::from("v1")], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[test]
    fn out_of_range_threshold_is_rejected_at_construction() {
        let tmp = TempDir::new().unwrap();
        let encoder: Arc<dyn EmbeddingEncoder> = Arc::new(StubEncoder);
        let result = SimilaritySearchEngine::new(
            encoder.clone(),
            Arc::new(TargetRegistry::new(encoder)),
            Arc::new(ResultCache::new()),
            FrameStore::new(tmp.path()),
            SearchConfig {
                similarity_threshold: 1.5,
            },
        );
        assert!(matches!(result, Err(EngineError::InvalidInput(_))));
    }
}
