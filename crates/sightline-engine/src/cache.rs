//! Cache of search results keyed by (video, target) pairs.

use std::collections::HashMap;
use std::sync::RwLock;

use sightline_models::{MatchResult, SearchKey, TargetId, VideoId};

/// Stores the most recent matches for each exact (video, target) pair.
///
/// The key is the composite [`SearchKey`], never a concatenated string,
/// so `video "a_b"` with `target "c"` can never alias `video "a"` with
/// `target "b_c"`. A search over several videos and targets writes one
/// entry per pair it actually evaluated.
#[derive(Default)]
pub struct ResultCache {
    inner: RwLock<HashMap<SearchKey, Vec<MatchResult>>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached matches for one (video, target) pair.
    pub fn insert(&self, video_id: VideoId, target_id: TargetId, matches: Vec<MatchResult>) {
        let key = SearchKey {
            video_id,
            target_id,
        };
        self.inner
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, matches);
    }

    /// Matches from the last search of this pair, or `None` if the pair
    /// has never been searched.
    pub fn get(&self, video_id: &VideoId, target_id: &TargetId) -> Option<Vec<MatchResult>> {
        let key = SearchKey {
            video_id: video_id.clone(),
            target_id: target_id.clone(),
        };
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(frame_index: u64, similarity: f32) -> MatchResult {
        MatchResult {
            frame_index,
            similarity,
            frame_path: format!("v/v_frame_{frame_index}.jpg"),
        }
    }

    #[test]
    fn unsearched_pair_is_none() {
        let cache = ResultCache::new();
        assert!(cache
            .get(&VideoId::from("v1"), &TargetId::from("image_0"))
            .is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn insert_then_get_round_trips() {
        let cache = ResultCache::new();
        cache.insert(
            VideoId::from("v1"),
            TargetId::from("image_0"),
            vec![m(5, 0.9), m(0, 0.8)],
        );

        let hits = cache
            .get(&VideoId::from("v1"), &TargetId::from("image_0"))
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].frame_index, 5);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn pairs_are_isolated() {
        let cache = ResultCache::new();
        cache.insert(VideoId::from("v1"), TargetId::from("image_0"), vec![m(0, 0.9)]);
        cache.insert(VideoId::from("v1"), TargetId::from("text_1"), vec![]);
        cache.insert(VideoId::from("v2"), TargetId::from("image_0"), vec![m(5, 0.8)]);

        assert_eq!(
            cache
                .get(&VideoId::from("v1"), &TargetId::from("image_0"))
                .unwrap()
                .len(),
            1
        );
        assert!(cache
            .get(&VideoId::from("v1"), &TargetId::from("text_1"))
            .unwrap()
            .is_empty());
        assert_eq!(
            cache
                .get(&VideoId::from("v2"), &TargetId::from("image_0"))
                .unwrap()[0]
                .frame_index,
            5
        );
        assert!(cache
            .get(&VideoId::from("v2"), &TargetId::from("text_1"))
            .is_none());
    }

    #[test]
    fn reinsert_replaces_previous_matches() {
        let cache = ResultCache::new();
        let video = VideoId::from("v1");
        let target = TargetId::from("text_0");

        cache.insert(video.clone(), target.clone(), vec![m(0, 0.95), m(5, 0.8)]);
        cache.insert(video.clone(), target.clone(), vec![m(10, 0.72)]);

        let hits = cache.get(&video, &target).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].frame_index, 10);
        assert_eq!(cache.len(), 1);
    }
}
