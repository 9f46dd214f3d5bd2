//! In-memory registry of search targets.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use tracing::info;

use sightline_media::load_image;
use sightline_models::{Target, TargetId, TargetSource};
use sightline_vision::EmbeddingEncoder;

use crate::error::EngineResult;
use crate::metrics;

#[derive(Default)]
struct RegistryInner {
    targets: HashMap<TargetId, Target>,
    registered: usize,
}

/// Owns every registered target and its precomputed embedding.
///
/// Identifiers are `{kind}_{ordinal}` where the ordinal counts all
/// registrations across both kinds, so interleaved image and text
/// registrations never collide. The embedding is computed before the
/// write lock is taken; the lock only covers id assignment and insert,
/// which also means a failed encode consumes no ordinal.
pub struct TargetRegistry {
    encoder: Arc<dyn EmbeddingEncoder>,
    inner: RwLock<RegistryInner>,
}

impl TargetRegistry {
    pub fn new(encoder: Arc<dyn EmbeddingEncoder>) -> Self {
        Self {
            encoder,
            inner: RwLock::new(RegistryInner::default()),
        }
    }

    /// Register a target and return it with its assigned identifier.
    ///
    /// Image sources are loaded from the given server-side path; text
    /// sources are embedded directly. Duplicate payloads register as
    /// separate targets with distinct identifiers.
    pub fn add(&self, source: TargetSource, name: impl Into<String>) -> EngineResult<Target> {
        let name = name.into();

        let embedding = match &source {
            TargetSource::Image(path) => {
                let image = load_image(path)?;
                self.encoder.encode_image(&image)?
            }
            TargetSource::Text(prompt) => self.encoder.encode_text(prompt)?,
        };

        let kind = source.kind();
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let id = TargetId::new(kind, inner.registered);
        let target = Target {
            id: id.clone(),
            name,
            source,
            embedding,
            registered_at: Utc::now(),
        };
        inner.targets.insert(id.clone(), target.clone());
        inner.registered += 1;
        drop(inner);

        metrics::record_target_registered(kind.as_str());
        info!(target_id = %id, kind = %kind, "Target registered");
        Ok(target)
    }

    /// Look up a target by id.
    pub fn get(&self, id: &TargetId) -> Option<Target> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .targets
            .get(id)
            .cloned()
    }

    pub fn contains(&self, id: &TargetId) -> bool {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .targets
            .contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .targets
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
