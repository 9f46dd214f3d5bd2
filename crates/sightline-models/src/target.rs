//! Search target models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::embedding::Embedding;

/// Identifier assigned to a registered target: `{kind}_{ordinal}` where
/// the ordinal is the number of targets registered before it, across
/// both kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct TargetId(pub String);

impl TargetId {
    /// Compose an identifier from a kind and a registration ordinal.
    pub fn new(kind: TargetKind, ordinal: usize) -> Self {
        Self(format!("{}_{}", kind.as_str(), ordinal))
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TargetId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TargetId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The two supported target modalities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Image,
    Text,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Image => "image",
            TargetKind::Text => "text",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a target is built from. The variant fixes how the payload is
/// interpreted, so an image path is never mistaken for a text prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum TargetSource {
    /// Server-side path to a reference image
    Image(PathBuf),
    /// Natural-language description
    Text(String),
}

impl TargetSource {
    pub fn kind(&self) -> TargetKind {
        match self {
            TargetSource::Image(_) => TargetKind::Image,
            TargetSource::Text(_) => TargetKind::Text,
        }
    }
}

/// A registered search target with its precomputed embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Target {
    /// Assigned identifier
    pub id: TargetId,

    /// Human-readable name supplied at registration
    pub name: String,

    /// Payload the embedding was computed from
    pub source: TargetSource,

    /// Embedding in the shared image/text space
    pub embedding: Embedding,

    /// When the target was registered
    pub registered_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_id_composition() {
        assert_eq!(TargetId::new(TargetKind::Image, 0).as_str(), "image_0");
        assert_eq!(TargetId::new(TargetKind::Text, 1).as_str(), "text_1");
        assert_eq!(TargetId::new(TargetKind::Image, 12).as_str(), "image_12");
    }

    #[test]
    fn source_is_tagged_by_type() {
        let image = TargetSource::Image(PathBuf::from("/refs/alice.jpg"));
        let json = serde_json::to_value(&image).unwrap();
        assert_eq!(json["type"], "image");
        assert_eq!(json["data"], "/refs/alice.jpg");

        let text = TargetSource::Text("a red jacket".to_string());
        let json = serde_json::to_value(&text).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["data"], "a red jacket");
    }

    #[test]
    fn unknown_source_type_is_rejected() {
        let raw = serde_json::json!({ "type": "audio", "data": "clip.wav" });
        assert!(serde_json::from_value::<TargetSource>(raw).is_err());
    }

    #[test]
    fn source_kind_matches_variant() {
        assert_eq!(
            TargetSource::Image(PathBuf::from("x.png")).kind(),
            TargetKind::Image
        );
        assert_eq!(
            TargetSource::Text("hello".to_string()).kind(),
            TargetKind::Text
        );
    }
}
