//! Cross-verification of accepted results.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Comparison of an accepted result with a second backend's answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub task_id: String,
    /// Agent whose result was returned to the caller
    pub primary_id: String,
    pub verifier_id: String,
    /// Normalized outputs are identical
    pub agreement: bool,
    /// Word-set similarity of the normalized outputs, 0.0 - 1.0
    pub confidence: f64,
    pub notes: String,
}

/// Lowercase, trim and collapse whitespace.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Jaccard similarity of the word sets of two normalized texts.
pub fn similarity(a: &str, b: &str) -> f64 {
    let left: HashSet<&str> = a.split(' ').filter(|w| !w.is_empty()).collect();
    let right: HashSet<&str> = b.split(' ').filter(|w| !w.is_empty()).collect();
    if left.is_empty() && right.is_empty() {
        return 1.0;
    }
    let shared = left.intersection(&right).count();
    let union = left.union(&right).count();
    shared as f64 / union as f64
}

pub(crate) fn compare(
    task_id: &str,
    primary_id: &str,
    primary_output: &str,
    verifier_id: &str,
    verifier_output: &str,
) -> VerificationResult {
    let primary = normalize(primary_output);
    let verifier = normalize(verifier_output);
    let agreement = primary == verifier;
    let confidence = if agreement {
        1.0
    } else {
        similarity(&primary, &verifier)
    };
    let notes = if agreement {
        "outputs agree".to_string()
    } else {
        format!(
            "outputs differ ({} vs {} normalized chars, {:.0}% word overlap)",
            primary.len(),
            verifier.len(),
            confidence * 100.0
        )
    };

    VerificationResult {
        task_id: task_id.to_string(),
        primary_id: primary_id.to_string(),
        verifier_id: verifier_id.to_string(),
        agreement,
        confidence,
        notes,
    }
}
