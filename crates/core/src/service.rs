//! Service descriptors and the derived capability index.
//!
//! Pure data and merge logic; the registry crate owns persistence and
//! liveness, the dispatcher consumes the index read-only.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::ServiceKind;

// ---------------------------------------------------------------------------
// Capability tags
// ---------------------------------------------------------------------------

/// Object detection on an uploaded image.
pub const SERVICE_OBJECT_DETECTION: ServiceKind = 100;
/// Speech-to-text on an uploaded audio file.
pub const SERVICE_SPEECH_TO_TEXT: ServiceKind = 101;
/// Text-to-speech synthesis.
pub const SERVICE_TEXT_TO_SPEECH: ServiceKind = 102;
/// Named-entity recognition over inline text.
pub const SERVICE_ENTITY_RECOGNITION: ServiceKind = 103;
/// Text classification over inline text.
pub const SERVICE_TEXT_CLASSIFICATION: ServiceKind = 104;
/// Topic identification over inline text.
pub const SERVICE_TOPIC_IDENTIFICATION: ServiceKind = 105;
/// Sentiment analysis over inline text.
pub const SERVICE_SENTIMENT_ANALYSIS: ServiceKind = 106;
/// Text summarization over inline text.
pub const SERVICE_SUMMARIZATION: ServiceKind = 107;

// ---------------------------------------------------------------------------
// ServiceDescriptor
// ---------------------------------------------------------------------------

/// One registered execution-backend instance.
///
/// Field names follow the registry wire contract; a descriptor is uniquely
/// identified by its `(server, port)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub service_type: ServiceKind,
    #[serde(rename = "service_description")]
    pub description: String,
    #[serde(rename = "service_server")]
    pub server: String,
    #[serde(rename = "service_port")]
    pub port: u16,
    #[serde(rename = "service_action_url")]
    pub action_url: String,
    #[serde(rename = "service_heartbeat_url")]
    pub heartbeat_url: String,
    #[serde(rename = "service_requires_upload")]
    pub requires_upload: bool,
    #[serde(rename = "service_request_types")]
    pub request_types: Vec<String>,
    #[serde(rename = "service_returns_download")]
    pub returns_download: bool,
    #[serde(rename = "service_response_types")]
    pub response_types: Vec<String>,
    /// Free-form capability document published by the instance.
    #[serde(rename = "service_about")]
    pub about: String,
    #[serde(rename = "service_is_async")]
    pub is_async: bool,
}

impl ServiceDescriptor {
    /// `true` when both descriptors refer to the same instance.
    pub fn same_instance(&self, other: &ServiceDescriptor) -> bool {
        self.server == other.server && self.port == other.port
    }
}

/// Merge a newly registered descriptor into an existing set.
///
/// Any prior entry with the same `(server, port)` is dropped, so the set
/// never holds two entries for one instance. The new descriptor always
/// lands at the end.
pub fn merge_descriptor(
    existing: &[ServiceDescriptor],
    new: ServiceDescriptor,
) -> Vec<ServiceDescriptor> {
    let mut merged: Vec<ServiceDescriptor> = existing
        .iter()
        .filter(|s| s.port > 0 && !s.same_instance(&new))
        .cloned()
        .collect();
    merged.push(new);
    merged
}

// ---------------------------------------------------------------------------
// CapabilityIndex
// ---------------------------------------------------------------------------

/// Read-mostly projection: one representative descriptor per service type.
///
/// Instances of the same type must describe themselves identically in the
/// fields that matter to a caller, so keeping the first seen is enough.
/// Rebuilt from scratch whenever the registry snapshot changes.
#[derive(Debug, Clone, Default)]
pub struct CapabilityIndex {
    by_type: HashMap<ServiceKind, ServiceDescriptor>,
}

impl CapabilityIndex {
    /// Build the index from a snapshot, first-seen-wins per type.
    pub fn build(services: &[ServiceDescriptor]) -> Self {
        let mut by_type = HashMap::new();
        for service in services {
            by_type
                .entry(service.service_type)
                .or_insert_with(|| service.clone());
        }
        Self { by_type }
    }

    /// Representative descriptor for a service type, if any instance serves it.
    pub fn get(&self, service_type: ServiceKind) -> Option<&ServiceDescriptor> {
        self.by_type.get(&service_type)
    }

    /// Number of distinct service types currently servable.
    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    /// `true` when no service type is servable.
    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
