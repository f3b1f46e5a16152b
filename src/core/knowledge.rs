//! Retrieved knowledge and drafted answers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{GuidanceError, Result};

/// An immutable retrieved unit of knowledge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeChunk {
    /// Chunk identifier.
    pub id: String,
    /// Chunk text.
    pub text: String,
    /// Kind of entity the chunk was cut from (career, institution, bursary...).
    #[serde(default)]
    pub source_entity_type: String,
    /// Free-form metadata from the retrieval subsystem.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl KnowledgeChunk {
    /// Create a new chunk.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            source_entity_type: String::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Set the source entity type.
    pub fn with_source(mut self, source_entity_type: impl Into<String>) -> Self {
        self.source_entity_type = source_entity_type.into();
        self
    }
}

/// A drafted candidate answer plus its provenance.
///
/// `text` is optional on the wire so that a missing field can be rejected as
/// invalid input instead of being coerced to an empty answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftAnswer {
    /// Answer text.
    #[serde(default)]
    pub text: Option<String>,
    /// Chunks the drafter says it used, in order.
    #[serde(default)]
    pub chunk_ids_used: Vec<String>,
}

impl DraftAnswer {
    /// Create a draft with the given text.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            chunk_ids_used: Vec::new(),
        }
    }

    /// Set the chunk IDs used.
    pub fn with_chunks<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chunk_ids_used = ids.into_iter().map(Into::into).collect();
        self
    }

    /// The answer text, or `InvalidInput` when it is missing.
    pub fn text(&self) -> Result<&str> {
        self.text
            .as_deref()
            .ok_or_else(|| GuidanceError::invalid_input("draft answer is missing text"))
    }
}
