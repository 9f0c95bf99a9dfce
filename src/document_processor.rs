use crate::config::{PipelineConfig, Strategy};
use crate::models::*;
use crate::processing::*;
use crate::utils::DocScanError;
use image::imageops;
use image::{DynamicImage, GrayImage};
use log::{debug, info, warn};
use std::path::Path;

/// Where a processing call is. Only logged; any failure jumps to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Start,
    VariantsGenerated,
    RegionsInsufficient,
    WholeImageFallback,
    Recognized,
    Fused,
    Normalized,
    Extracted,
    Done,
    Failed,
}

/// What a recognition strategy produced for one document.
struct Recognition {
    pool: CandidatePool,
    /// Text and tokens for the field passes
    input: ExtractionInput,
    /// Best-guess text for the generic record
    full_text: String,
}

/// Up to three uploaded images. Absent sides are simply skipped.
#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub id_front: Option<Vec<u8>>,
    pub id_back: Option<Vec<u8>>,
    pub card_front: Option<Vec<u8>>,
}

/// Runs recognition, fusion and extraction for one document at a time.
///
/// The recognizer is owned and injected at construction. Public entry points
/// never fail: errors become a schema-shaped record carrying `_error`.
pub struct DocumentProcessor<R: TextRecognizer> {
    recognizer: R,
    config: PipelineConfig,
}

impl<R: TextRecognizer> DocumentProcessor<R> {
    pub fn new(recognizer: R) -> Self {
        Self::with_config(recognizer, PipelineConfig::default())
    }

    pub fn with_config(recognizer: R, config: PipelineConfig) -> Self {
        DocumentProcessor { recognizer, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn process_bytes(&self, image_bytes: &[u8], document_type: &DocumentType) -> DocumentRecord {
        self.process_pages(&[image_bytes], document_type)
    }

    pub fn process_path(&self, image_path: &Path, document_type: &DocumentType) -> DocumentRecord {
        match std::fs::read(image_path) {
            Ok(bytes) => self.process_bytes(&bytes, document_type),
            Err(e) => self.fail(
                document_type,
                DocScanError::IoError(format!("Failed to read {}: {}", image_path.display(), e)),
            ),
        }
    }

    /// Several images of the same document (e.g. both sides of an ID card)
    /// processed as one.
    pub fn process_pages(&self, pages: &[&[u8]], document_type: &DocumentType) -> DocumentRecord {
        match self.try_process(pages, document_type) {
            Ok(record) => record,
            Err(err) => self.fail(document_type, err),
        }
    }

    pub fn process_submission(&self, submission: &Submission) -> SubmissionRecord {
        let id_pages: Vec<&[u8]> = [&submission.id_front, &submission.id_back]
            .into_iter()
            .filter_map(|page| page.as_deref())
            .collect();

        let cedula = if id_pages.is_empty() {
            DocumentRecord::empty(&DocumentType::IdCard)
        } else {
            self.process_pages(&id_pages, &DocumentType::IdCard)
        };
        let tarjeta = match submission.card_front.as_deref() {
            Some(bytes) => self.process_bytes(bytes, &DocumentType::PropertyCard),
            None => DocumentRecord::empty(&DocumentType::PropertyCard),
        };

        SubmissionRecord { cedula, tarjeta }
    }

    /// Same pipeline as `process_pages`, but errors are returned instead of
    /// being folded into a fallback record.
    pub fn try_process(&self, pages: &[&[u8]], document_type: &DocumentType) -> Result<DocumentRecord, DocScanError> {
        self.enter(PipelineStage::Start);
        if pages.is_empty() {
            return Err(DocScanError::InvalidArguments("no image supplied".to_string()));
        }

        let images = pages
            .iter()
            .map(|bytes| ImageProcessor::decode(bytes, self.config.variants.max_width))
            .collect::<Result<Vec<DynamicImage>, DocScanError>>()?;

        let strategy = self.resolve_strategy(document_type);
        info!(
            "Processing {} page(s) as {} using the {:?} strategy with {}",
            images.len(),
            document_type.as_str(),
            strategy,
            self.recognizer.name()
        );

        let recognition = match strategy {
            Strategy::Regions => self.run_regions(&images)?,
            Strategy::Variants | Strategy::Auto => self.run_variants(&images)?,
        };

        let body = match document_type.schema() {
            Some(schema) => {
                let fields = FieldExtractor::extract(schema, &recognition.input, &self.config.spatial);
                self.enter(PipelineStage::Extracted);
                RecordBody::Fields(fields)
            }
            None => RecordBody::Text {
                lines: recognition.pool.lines(&self.config.fusion),
                text: recognition.full_text,
            },
        };

        // Quality signal only for the fused whole-image reading of non-ID documents
        let average_confidence = match (strategy, document_type) {
            (Strategy::Regions, _) | (_, DocumentType::IdCard) => None,
            _ => Some(recognition.pool.average_confidence()),
        };

        self.enter(PipelineStage::Done);
        Ok(DocumentRecord {
            body,
            average_confidence,
            error: None,
        })
    }

    fn resolve_strategy(&self, document_type: &DocumentType) -> Strategy {
        match (self.config.strategy, document_type) {
            (Strategy::Auto, DocumentType::IdCard) => Strategy::Regions,
            (Strategy::Auto, _) => Strategy::Variants,
            (explicit, _) => explicit,
        }
    }

    /// Recognize every variant of every page and fuse the lot. Tokens come
    /// from the full-resolution grayscale variant, whose coordinates are page
    /// coordinates.
    ///
    /// Field passes only see candidates at or above the confidence threshold,
    /// or every usable candidate when none reaches it. Nothing usable after
    /// filtering is `NoUsableText`.
    fn run_variants(&self, images: &[DynamicImage]) -> Result<Recognition, DocScanError> {
        let fusion = &self.config.fusion;
        let mut pool = CandidatePool::new(fusion.min_text_len);
        let mut positioned: Vec<Detection> = Vec::new();
        let mut last_error = None;

        for image in images {
            let variants = ImageProcessor::generate_variants(image, &self.config.variants);
            self.enter(PipelineStage::VariantsGenerated);

            for variant in &variants {
                match self.recognizer.recognize(&variant.image) {
                    Ok(detections) => {
                        debug!("Variant {} produced {} detections", variant.kind.name(), detections.len());
                        pool.extend(detections.iter());
                        if variant.kind == VariantKind::Gray {
                            positioned.extend(detections);
                        }
                    }
                    Err(e) => {
                        warn!("Recognition failed on variant {}: {}", variant.kind.name(), e);
                        last_error = Some(e);
                    }
                }
            }
        }
        self.enter(PipelineStage::Recognized);
        self.enter(PipelineStage::Fused);

        if pool.is_empty() {
            return Err(last_error.unwrap_or(DocScanError::NoUsableText));
        }

        let usable = pool.usable_texts(fusion);
        if usable.is_empty() {
            return Err(DocScanError::NoUsableText);
        }
        let full_text = usable.join(" ");
        let confident = pool.confident_texts(fusion.min_confidence);
        let text = if confident.is_empty() {
            full_text.clone()
        } else {
            confident.join(" ")
        };
        self.enter(PipelineStage::Normalized);
        debug!("Fused text: {}", preview(&text));

        let tokens = TokenAssembler::assemble(&positioned);
        Ok(Recognition {
            pool,
            input: ExtractionInput::new(text, tokens),
            full_text,
        })
    }

    /// Segment each page, recognize the crops and assemble one reading-order
    /// token stream across pages.
    fn run_regions(&self, images: &[DynamicImage]) -> Result<Recognition, DocScanError> {
        let mut detections = Vec::new();
        for image in images {
            let gray = image.to_luma8();
            let binary = RegionSegmenter::binarize(&gray, &self.config.regions);
            let regions = RegionSegmenter::segment(&binary, &self.config.regions);
            info!("Found {} text regions", regions.len());
            detections.extend(self.recognize_regions(&gray, &regions)?);
        }
        self.enter(PipelineStage::Recognized);

        let pool = fuse([detections.as_slice()], self.config.fusion.min_text_len);
        self.enter(PipelineStage::Fused);

        let tokens = TokenAssembler::assemble(&detections);
        if tokens.is_empty() {
            return Err(DocScanError::NoUsableText);
        }
        let text = TokenAssembler::joined_text(&tokens);
        self.enter(PipelineStage::Normalized);
        debug!("Region text: {}", preview(&text));

        Ok(Recognition {
            pool,
            full_text: text.clone(),
            input: ExtractionInput::new(text, tokens),
        })
    }

    /// Recognize each region crop, shifting results into page coordinates.
    /// Too few detections means segmentation missed the text, so the whole
    /// page is recognized instead.
    pub fn recognize_regions(&self, gray: &GrayImage, regions: &[Region]) -> Result<Vec<Detection>, DocScanError> {
        let mut detections = Vec::new();
        for region in regions {
            let crop = imageops::crop_imm(gray, region.x, region.y, region.width, region.height).to_image();
            match self.recognizer.recognize(&crop) {
                Ok(found) => detections.extend(
                    found
                        .into_iter()
                        .map(|d| d.translated(region.x as i32, region.y as i32)),
                ),
                Err(e) => warn!("Recognition failed on region {:?}: {}", region, e),
            }
        }

        if detections.len() < self.config.regions.min_tokens {
            self.enter(PipelineStage::RegionsInsufficient);
            info!(
                "Only {} detections from {} regions, recognizing the whole page",
                detections.len(),
                regions.len()
            );
            self.enter(PipelineStage::WholeImageFallback);
            detections = self.recognizer.recognize(gray)?;
        }
        Ok(detections)
    }

    fn enter(&self, stage: PipelineStage) {
        debug!("Pipeline stage: {:?}", stage);
    }

    fn fail(&self, document_type: &DocumentType, err: DocScanError) -> DocumentRecord {
        self.enter(PipelineStage::Failed);
        warn!("Processing {} failed: {}", document_type.as_str(), err);
        DocumentRecord::fallback(document_type, err.to_string())
    }
}

fn preview(text: &str) -> String {
    text.chars().take(250).collect()
}
