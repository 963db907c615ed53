//! Compliance primitives shared across the service
//!
//! A `Violation` is the unit of evidence every collaborator (text, image,
//! audio) and the video pipeline agree on. Collaborators produce them;
//! fusion and reporting only read them.

use serde::{Deserialize, Serialize};

/// Violation severity as reported by a collaborator
///
/// Collaborators are free-form JSON producers; anything we do not
/// recognize maps to `Unknown` rather than failing the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Major,
    Minor,
    #[serde(other)]
    Unknown,
}

impl Severity {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Major => "major",
            Severity::Minor => "minor",
            Severity::Unknown => "unknown",
        }
    }
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Unknown
    }
}

/// Which modality produced a violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViolationSource {
    Visual,
    Audio,
    Text,
    Link,
    System,
}

/// A single policy violation with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    /// Policy rule name or section the content violates
    pub policy_section: String,
    /// Description of the violation (collaborators use either a
    /// `violation` or `description` field; both land here)
    #[serde(alias = "violation")]
    pub description: String,
    /// Collaborator confidence in this violation (0.0-1.0)
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    /// Specific content that triggered the violation
    #[serde(default)]
    pub evidence: String,
    /// Severity, when the collaborator assigned one
    #[serde(default)]
    pub severity: Severity,
}

fn default_confidence() -> f64 {
    0.5
}

impl Violation {
    /// Synthesize a technical violation for a processing failure
    pub fn technical(policy_section: &str, description: String, severity: Severity) -> Self {
        Self {
            policy_section: policy_section.to_string(),
            description,
            confidence: 0.5,
            evidence: "Processing error".to_string(),
            severity,
        }
    }
}
