use crate::config::FusionConfig;
use crate::models::Detection;
use crate::processing::normalize::normalize;
use std::cmp::Ordering;
use std::collections::HashMap;

/// A distinct normalized text and the best confidence seen for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub text: String,
    pub confidence: f32,
}

/// Best-of-N merge of detections keyed by normalized text.
///
/// A stored confidence only ever goes up, so the pool after fusing a set of
/// variants is the same whatever order the variants were fed in.
#[derive(Debug, Clone, Default)]
pub struct CandidatePool {
    entries: HashMap<String, f32>,
    min_text_len: usize,
}

impl CandidatePool {
    pub fn new(min_text_len: usize) -> Self {
        CandidatePool {
            entries: HashMap::new(),
            min_text_len,
        }
    }

    /// Normalize and merge one fragment. Returns false if it was too short to keep.
    pub fn insert(&mut self, text: &str, confidence: f32) -> bool {
        let normalized = normalize(text);
        if normalized.chars().count() < self.min_text_len {
            return false;
        }
        let confidence = if confidence.is_nan() { 0.0 } else { confidence.clamp(0.0, 1.0) };
        let stored = self.entries.entry(normalized).or_insert(confidence);
        if confidence > *stored {
            *stored = confidence;
        }
        true
    }

    pub fn extend<'a, I>(&mut self, detections: I)
    where
        I: IntoIterator<Item = &'a Detection>,
    {
        for detection in detections {
            self.insert(&detection.text, detection.confidence);
        }
    }

    pub fn get(&self, text: &str) -> Option<f32> {
        self.entries.get(text).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All candidates, highest confidence first. Ties are broken by text so
    /// the ranking is deterministic.
    pub fn ranked(&self) -> Vec<Candidate> {
        let mut ranked: Vec<Candidate> = self
            .entries
            .iter()
            .map(|(text, confidence)| Candidate {
                text: text.clone(),
                confidence: *confidence,
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.text.cmp(&b.text))
        });
        ranked
    }

    /// Texts worth keeping: confident enough, or long enough that they are
    /// unlikely to be noise (VINs, long numbers) even when confidence is low.
    pub fn usable_texts(&self, config: &FusionConfig) -> Vec<String> {
        self.ranked()
            .into_iter()
            .filter(|c| c.confidence >= config.min_confidence || c.text.chars().count() > config.long_text_len)
            .map(|c| c.text)
            .collect()
    }

    pub fn confident_texts(&self, min_confidence: f32) -> Vec<String> {
        self.ranked()
            .into_iter()
            .filter(|c| c.confidence >= min_confidence)
            .map(|c| c.text)
            .collect()
    }

    /// Distinct lines for the generic text record.
    pub fn lines(&self, config: &FusionConfig) -> Vec<String> {
        let mut lines = self.confident_texts(config.line_confidence);
        lines.truncate(config.max_lines);
        lines
    }

    /// Mean confidence over every candidate, rounded to 4 decimals.
    pub fn average_confidence(&self) -> f64 {
        if self.entries.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.entries.values().map(|c| *c as f64).sum();
        let mean = sum / self.entries.len() as f64;
        (mean * 10_000.0).round() / 10_000.0
    }
}

/// Fuse detections from several variants (or regions) into one pool.
pub fn fuse<'a, I>(detections_by_variant: I, min_text_len: usize) -> CandidatePool
where
    I: IntoIterator<Item = &'a [Detection]>,
{
    let mut pool = CandidatePool::new(min_text_len);
    for detections in detections_by_variant {
        pool.extend(detections.iter());
    }
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(text: &str, confidence: f32) -> Detection {
        Detection::from_rect(0, 0, 10, 10, text, confidence)
    }

    #[test]
    fn test_keeps_best_confidence_per_normalized_text() {
        let mut pool = CandidatePool::new(2);
        pool.insert("Placa", 0.4);
        pool.insert("PLACA", 0.9);
        pool.insert(" placa ", 0.2);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.get("PLACA"), Some(0.9));
    }

    #[test]
    fn test_never_decreases_stored_confidence() {
        let mut pool = CandidatePool::new(2);
        let mut best = 0.0f32;
        for confidence in [0.3, 0.8, 0.1, 0.8, 0.5, 0.95, 0.2] {
            pool.insert("HONDA", confidence);
            best = best.max(confidence);
            assert_eq!(pool.get("HONDA"), Some(best));
        }
    }

    #[test]
    fn test_drops_short_fragments() {
        let mut pool = CandidatePool::new(2);
        assert!(!pool.insert("a", 0.99));
        assert!(!pool.insert("*#", 0.99));
        assert!(pool.insert("AB", 0.1));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_order_independent() {
        let gray = vec![det("ABC 123", 0.6), det("HONDA", 0.3)];
        let otsu = vec![det("abc 123", 0.8), det("MOTOR", 0.5)];
        let upscaled = vec![det("HONDA", 0.7), det("x", 0.9)];

        let forward = fuse([gray.as_slice(), otsu.as_slice(), upscaled.as_slice()], 2);
        let backward = fuse([upscaled.as_slice(), gray.as_slice(), otsu.as_slice()], 2);
        assert_eq!(forward.ranked(), backward.ranked());
        assert_eq!(forward.get("ABC 123"), Some(0.8));
        assert_eq!(forward.get("HONDA"), Some(0.7));
    }

    #[test]
    fn test_usable_texts_length_escape_hatch() {
        let config = FusionConfig::default();
        let mut pool = CandidatePool::new(2);
        pool.insert("9BWZZZ377VT004251", 0.1);
        pool.insert("XQ", 0.1);
        pool.insert("HONDA", 0.25);
        let usable = pool.usable_texts(&config);
        assert_eq!(usable, vec!["HONDA".to_string(), "9BWZZZ377VT004251".to_string()]);
    }

    #[test]
    fn test_ranked_by_confidence_descending() {
        let mut pool = CandidatePool::new(2);
        pool.insert("LOW", 0.2);
        pool.insert("HIGH", 0.9);
        pool.insert("MID", 0.5);
        let texts: Vec<String> = pool.ranked().into_iter().map(|c| c.text).collect();
        assert_eq!(texts, vec!["HIGH", "MID", "LOW"]);
    }

    #[test]
    fn test_average_confidence() {
        let mut pool = CandidatePool::new(2);
        assert_eq!(pool.average_confidence(), 0.0);
        pool.insert("AA", 0.5);
        pool.insert("BB", 0.25);
        pool.insert("CC", 0.3);
        assert!((pool.average_confidence() - 0.35).abs() < 1e-9);
    }

    #[test]
    fn test_lines_respect_threshold_and_cap() {
        let config = FusionConfig {
            max_lines: 2,
            ..FusionConfig::default()
        };
        let mut pool = CandidatePool::new(2);
        pool.insert("ONE", 0.9);
        pool.insert("TWO", 0.8);
        pool.insert("THREE", 0.7);
        pool.insert("FAINT", 0.34);
        assert_eq!(pool.lines(&config), vec!["ONE".to_string(), "TWO".to_string()]);
    }
}
