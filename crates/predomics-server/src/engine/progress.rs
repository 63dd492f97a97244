//! Parsing engine stdout into progress updates

use regex::Regex;

/// One observation of search progress
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressUpdate {
    pub generation: i32,
    pub best_fit: Option<f64>,
}

/// Recognises lines such as `Generation #12 | best fit 0.834` or
/// `epoch 7: auc=0.91`.
pub struct ProgressParser {
    step: Regex,
    fit: Regex,
}

impl ProgressParser {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            step: Regex::new(r"(?i)\b(?:generation|epoch|iteration)\s*#?\s*(\d+)")?,
            fit: Regex::new(r"(?i)\b(?:fit|auc)\b\s*[:=]?\s*(-?\d+(?:\.\d+)?(?:[eE][-+]?\d+)?)")?,
        })
    }

    pub fn parse_line(&self, line: &str) -> Option<ProgressUpdate> {
        let generation = self
            .step
            .captures(line)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<i32>().ok())?;

        let best_fit = self
            .fit
            .captures(line)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .filter(|f| f.is_finite());

        Some(ProgressUpdate {
            generation,
            best_fit,
        })
    }
}
