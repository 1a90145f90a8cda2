//! Address Pattern Matcher (pattern stage)
//!
//! Deterministic, regex-based address extraction. Runs in-process over every
//! entry of a batch before any remote extractor is consulted.
//!
//! # Confidence Scoring
//! - House number + street + suffix + locality (`221B Baker St, London`) → 0.90
//! - House number + street + suffix (`10 Downing Street`) → 0.75
//! - Street + suffix without number, or PO box → 0.50
//! - Postal code only (UK postcode, US ZIP) → 0.40
//! - Nothing recognised → no match
//!
//! Only the first two tiers clear the default pattern acceptance threshold (0.7);
//! everything else is routed to the model stage.

use crate::types::{Candidate, EntryId, PatternExtractor};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

const CONFIDENCE_FULL: f32 = 0.90;
const CONFIDENCE_STREET_NUMBER: f32 = 0.75;
const CONFIDENCE_STREET_ONLY: f32 = 0.50;
const CONFIDENCE_POSTAL_CODE: f32 = 0.40;

static NUMBERED_STREET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        \b\d{1,5}[A-Za-z]?\s+
        (?:[A-Z][A-Za-z'.-]*\s+){1,4}?
        (?i:Street|St|Road|Rd|Avenue|Ave|Boulevard|Blvd|Lane|Ln|Drive|Dr|Way|Court|Ct
            |Place|Pl|Square|Sq|Terrace|Ter|Highway|Hwy|Parkway|Pkwy|Crescent|Cres
            |Close|Row|Gardens|Mews)\b\.?
        (?P<locality>\s*,\s*[A-Z][A-Za-z'.-]*(?:\s+[A-Z][A-Za-z'.-]*){0,3})?
        ",
    )
    .expect("numbered street pattern is valid")
});

static NAMED_STREET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        \b(?:[A-Z][A-Za-z'.-]*\s+){1,4}?
        (?i:Street|St|Road|Rd|Avenue|Ave|Boulevard|Blvd|Lane|Ln|Drive|Dr|Way|Court|Ct
            |Place|Pl|Square|Sq|Terrace|Ter|Highway|Hwy|Parkway|Pkwy|Crescent|Cres
            |Close|Row|Gardens|Mews)\b\.?
        ",
    )
    .expect("named street pattern is valid")
});

static PO_BOX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bP\.?\s*O\.?\s*Box\s+\d+\b").expect("PO box pattern is valid")
});

static POSTAL_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:[A-Z]{1,2}\d[A-Z\d]?\s*\d[A-Z]{2}|\d{5}(?:-\d{4})?)\b")
        .expect("postal code pattern is valid")
});

/// Regex-backed `PatternExtractor`
#[derive(Debug, Default, Clone, Copy)]
pub struct AddressPatternMatcher;

impl AddressPatternMatcher {
    pub fn new() -> Self {
        Self
    }

    /// Best (address, confidence) pair found in `raw_text`
    fn best_match(raw_text: &str) -> Option<(String, f32)> {
        if let Some(caps) = NUMBERED_STREET.captures(raw_text) {
            let whole = caps.get(0).map_or("", |m| m.as_str());
            let confidence = if caps.name("locality").is_some() {
                CONFIDENCE_FULL
            } else {
                CONFIDENCE_STREET_NUMBER
            };
            return Some((whole.to_string(), confidence));
        }

        if let Some(m) = NAMED_STREET.find(raw_text).or_else(|| PO_BOX.find(raw_text)) {
            return Some((m.as_str().to_string(), CONFIDENCE_STREET_ONLY));
        }

        POSTAL_CODE
            .find(raw_text)
            .map(|m| (m.as_str().to_string(), CONFIDENCE_POSTAL_CODE))
    }
}

impl PatternExtractor for AddressPatternMatcher {
    fn name(&self) -> &'static str {
        "AddressPattern"
    }

    fn resolve(&self, raw_text: &str, id: &EntryId) -> Candidate {
        match Self::best_match(raw_text) {
            Some((address, confidence)) => {
                let address = normalize_address(&address);
                trace!(entry_id = %id, %address, confidence, "Pattern match");
                Candidate::new(id.clone(), address, confidence)
            }
            None => Candidate::no_match(id.clone()),
        }
    }
}

/// Collapse whitespace, tighten commas and strip trailing punctuation
pub fn normalize_address(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .replace(" ,", ",")
        .trim_end_matches(|c: char| matches!(c, ',' | ';' | ':') || c.is_whitespace())
        .to_string()
}
