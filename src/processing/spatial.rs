use crate::config::SpatialConfig;
use crate::models::{Detection, Token};
use crate::processing::normalize::normalize;

/// Turns positioned detections into a reading-order token stream and recovers
/// field values by their vertical distance from a printed label.
pub struct TokenAssembler;

impl TokenAssembler {
    /// Normalize each detection, anchor it at its top-left corner and sort by
    /// `(y, x)`. Fragments that normalize to nothing are dropped.
    pub fn assemble<'a, I>(detections: I) -> Vec<Token>
    where
        I: IntoIterator<Item = &'a Detection>,
    {
        let mut tokens: Vec<Token> = detections
            .into_iter()
            .filter_map(|d| {
                let text = normalize(&d.text);
                if text.is_empty() {
                    return None;
                }
                let anchor = d.top_left();
                Some(Token { x: anchor.x, y: anchor.y, text })
            })
            .collect();
        Self::sort(&mut tokens);
        tokens
    }

    pub fn sort(tokens: &mut [Token]) {
        tokens.sort_by(|a, b| (a.y, a.x).cmp(&(b.y, b.x)));
    }

    /// Reading-order text of the whole stream.
    pub fn joined_text(tokens: &[Token]) -> String {
        tokens.iter().map(|t| t.text.as_str()).collect::<Vec<&str>>().join(" ")
    }

    /// Value printed near `label`.
    ///
    /// The first token containing the label anchors the search. Later tokens
    /// less than `band` pixels away vertically are part of the value; the scan
    /// stops at the first token more than `cutoff` pixels below the label.
    /// Returns an empty string when no token contains the label.
    pub fn find_value(tokens: &[Token], label: &str, config: &SpatialConfig) -> String {
        let label = normalize(label);
        if label.is_empty() {
            return String::new();
        }

        let Some(anchor) = tokens.iter().position(|t| t.text.contains(&label)) else {
            return String::new();
        };
        let y_base = tokens[anchor].y;

        let mut parts = Vec::new();
        for token in &tokens[anchor + 1..] {
            if (token.y - y_base).abs() < config.band {
                parts.push(token.text.as_str());
            } else if token.y > y_base + config.cutoff {
                break;
            }
        }
        parts.join(" ").trim().to_string()
    }
}
