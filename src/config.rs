//! Pipeline configuration.
//!
//! Every threshold the pipeline uses lives here so a deployment can tune it
//! from a TOML file without a rebuild. Missing keys fall back to the defaults.

use crate::utils::DocScanError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which recognition strategy feeds the field extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Regions for ID cards, variants for everything else.
    Auto,
    /// Whole-image recognition over every preprocessed variant, fused.
    Variants,
    /// Region segmentation with spatial tokens, falling back to the whole image.
    Regions,
}

impl std::str::FromStr for Strategy {
    type Err = DocScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(Strategy::Auto),
            "variants" => Ok(Strategy::Variants),
            "regions" => Ok(Strategy::Regions),
            other => Err(DocScanError::InvalidArguments(format!(
                "unknown strategy '{}', expected auto, variants or regions",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub strategy: Strategy,
    pub fusion: FusionConfig,
    pub variants: VariantConfig,
    pub regions: RegionConfig,
    pub spatial: SpatialConfig,
    pub recognition: RecognitionConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Auto,
            fusion: FusionConfig::default(),
            variants: VariantConfig::default(),
            regions: RegionConfig::default(),
            spatial: SpatialConfig::default(),
            recognition: RecognitionConfig::default(),
        }
    }
}

/// Candidate fusion thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Normalized fragments shorter than this are dropped
    pub min_text_len: usize,
    /// Candidates below this confidence are kept only if long
    pub min_confidence: f32,
    /// Candidates longer than this survive regardless of confidence
    pub long_text_len: usize,
    /// Minimum confidence for the generic `lineas` output
    pub line_confidence: f32,
    pub max_lines: usize,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            min_text_len: 2,
            min_confidence: 0.25,
            long_text_len: 6,
            line_confidence: 0.35,
            max_lines: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VariantConfig {
    /// Wider inputs are downscaled to this width first
    pub max_width: u32,
    pub clahe_clip_limit: f32,
    /// CLAHE tile grid is `clahe_tiles x clahe_tiles`
    pub clahe_tiles: u32,
    /// Gaussian adaptive threshold window (odd)
    pub adaptive_block_size: u32,
    pub adaptive_c: i32,
    pub upscale_factor: f32,
}

impl Default for VariantConfig {
    fn default() -> Self {
        Self {
            max_width: 2200,
            clahe_clip_limit: 2.0,
            clahe_tiles: 8,
            adaptive_block_size: 31,
            adaptive_c: 8,
            upscale_factor: 1.6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    /// Dilation kernel width, merges characters into line blobs
    pub kernel_width: u32,
    /// Dilation kernel height, kept small so lines stay apart
    pub kernel_height: u32,
    pub min_width: u32,
    pub min_height: u32,
    /// Below this many region detections the whole image is recognized instead
    pub min_tokens: usize,
    pub block_size: u32,
    pub c: i32,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            kernel_width: 15,
            kernel_height: 5,
            min_width: 120,
            min_height: 25,
            min_tokens: 5,
            block_size: 11,
            c: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialConfig {
    /// Vertical distance from a label that still counts as its value
    pub band: i32,
    /// Vertical distance past which the label's block has ended
    pub cutoff: i32,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self { band: 80, cutoff: 120 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    pub language: String,
    /// Tessdata directory; the engine default when unset
    pub datapath: Option<String>,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            language: "spa+eng".to_string(),
            datapath: None,
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, DocScanError> {
        toml::from_str(content).map_err(|e| DocScanError::ConfigError(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, DocScanError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DocScanError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }
}
