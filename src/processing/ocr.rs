use crate::models::{Detection, Point};
use crate::utils::DocScanError;
use image::GrayImage;
use std::collections::HashMap;

/// The OCR primitive: given an image, return what was read and where.
///
/// Implementations may fail or return nothing; callers treat both as an
/// ordinary outcome.
pub trait TextRecognizer {
    fn name(&self) -> &'static str;

    fn recognize(&self, image: &GrayImage) -> Result<Vec<Detection>, DocScanError>;
}

impl<T: TextRecognizer + ?Sized> TextRecognizer for &T {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn recognize(&self, image: &GrayImage) -> Result<Vec<Detection>, DocScanError> {
        (**self).recognize(image)
    }
}

impl<T: TextRecognizer + ?Sized> TextRecognizer for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn recognize(&self, image: &GrayImage) -> Result<Vec<Detection>, DocScanError> {
        (**self).recognize(image)
    }
}

/// Stand-in used when the binary is built without an OCR backend.
pub struct UnavailableRecognizer;

impl TextRecognizer for UnavailableRecognizer {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn recognize(&self, _image: &GrayImage) -> Result<Vec<Detection>, DocScanError> {
        Err(DocScanError::RecognitionError(
            "no OCR backend compiled in (enable the `tesseract` feature)".to_string(),
        ))
    }
}

struct LineAccumulator {
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
    words: Vec<String>,
    confidence_sum: f32,
}

/// Group Tesseract TSV word rows into line-level detections.
///
/// Columns: level, page, block, paragraph, line, word, left, top, width,
/// height, conf, text. Only word rows (level 5) with a non-negative
/// confidence and non-blank text count. A line's confidence is the mean of
/// its word confidences scaled to [0, 1].
pub fn parse_tsv(tsv: &str) -> Vec<Detection> {
    let mut order: Vec<(i32, i32, i32, i32)> = Vec::new();
    let mut lines: HashMap<(i32, i32, i32, i32), LineAccumulator> = HashMap::new();

    for row in tsv.lines() {
        let columns: Vec<&str> = row.splitn(12, '\t').collect();
        if columns.len() < 12 {
            continue;
        }
        let numbers: Option<Vec<i32>> = columns[..10].iter().map(|c| c.trim().parse::<i32>().ok()).collect();
        let Some(numbers) = numbers else {
            continue;
        };
        let Ok(confidence) = columns[10].trim().parse::<f32>() else {
            continue;
        };
        let text = columns[11].trim();
        if numbers[0] != 5 || confidence < 0.0 || text.is_empty() {
            continue;
        }

        let key = (numbers[1], numbers[2], numbers[3], numbers[4]);
        let (left, top, width, height) = (numbers[6], numbers[7], numbers[8], numbers[9]);
        let line = lines.entry(key).or_insert_with(|| {
            order.push(key);
            LineAccumulator {
                left,
                top,
                right: left + width,
                bottom: top + height,
                words: Vec::new(),
                confidence_sum: 0.0,
            }
        });
        line.left = line.left.min(left);
        line.top = line.top.min(top);
        line.right = line.right.max(left + width);
        line.bottom = line.bottom.max(top + height);
        line.words.push(text.to_string());
        line.confidence_sum += confidence;
    }

    order
        .into_iter()
        .filter_map(|key| lines.remove(&key))
        .map(|line| {
            let polygon = [
                Point::new(line.left, line.top),
                Point::new(line.right, line.top),
                Point::new(line.right, line.bottom),
                Point::new(line.left, line.bottom),
            ];
            let confidence = line.confidence_sum / line.words.len() as f32 / 100.0;
            Detection::new(polygon, line.words.join(" "), confidence)
        })
        .collect()
}

#[cfg(feature = "tesseract")]
pub use self::tesseract_backend::TesseractRecognizer;

#[cfg(feature = "tesseract")]
mod tesseract_backend {
    use super::{parse_tsv, TextRecognizer};
    use crate::config::RecognitionConfig;
    use crate::models::Detection;
    use crate::utils::DocScanError;
    use image::{DynamicImage, GrayImage, ImageOutputFormat};
    use log::debug;
    use std::cell::RefCell;
    use std::io::Write;
    use tesseract::Tesseract;

    /// Tesseract-backed recognizer. The engine is loaded on first use and
    /// kept for later calls; a call that fails drops it, so the next one
    /// starts from a fresh engine. The image is staged in a temporary PNG
    /// that is removed when the call returns, whichever way it returns.
    pub struct TesseractRecognizer {
        language: String,
        datapath: Option<String>,
        engine: RefCell<Option<Tesseract>>,
    }

    impl TesseractRecognizer {
        pub fn new(config: &RecognitionConfig) -> Self {
            TesseractRecognizer {
                language: config.language.clone(),
                datapath: config.datapath.clone(),
                engine: RefCell::new(None),
            }
        }

        pub fn is_loaded(&self) -> bool {
            self.engine.borrow().is_some()
        }

        fn take_engine(&self) -> Result<Tesseract, DocScanError> {
            if let Some(engine) = self.engine.borrow_mut().take() {
                return Ok(engine);
            }
            debug!("Loading Tesseract engine for language {}", self.language);
            Tesseract::new(self.datapath.as_deref(), Some(self.language.as_str()))
                .map_err(|e| DocScanError::RecognitionError(format!("Tesseract init error: {}", e)))
        }
    }

    impl TextRecognizer for TesseractRecognizer {
        fn name(&self) -> &'static str {
            "tesseract"
        }

        fn recognize(&self, image: &GrayImage) -> Result<Vec<Detection>, DocScanError> {
            let mut staged = tempfile::Builder::new()
                .prefix("docscan-")
                .suffix(".png")
                .tempfile()
                .map_err(|e| DocScanError::RecognitionError(format!("Failed to create temp file: {}", e)))?;

            DynamicImage::ImageLuma8(image.clone())
                .write_to(staged.as_file_mut(), ImageOutputFormat::Png)
                .map_err(|e| DocScanError::RecognitionError(format!("Failed to stage image: {}", e)))?;
            staged
                .flush()
                .map_err(|e| DocScanError::RecognitionError(format!("Failed to write temp file: {}", e)))?;

            let path = staged
                .path()
                .to_str()
                .ok_or_else(|| DocScanError::RecognitionError("Temp path is not valid UTF-8".to_string()))?;

            let mut tess = self
                .take_engine()?
                .set_image(path)
                .map_err(|e| DocScanError::RecognitionError(format!("Tesseract set image error: {}", e)))?
                .recognize()
                .map_err(|e| DocScanError::RecognitionError(format!("Tesseract recognition error: {}", e)))?;

            let tsv = tess
                .get_tsv_text(0)
                .map_err(|e| DocScanError::RecognitionError(format!("Tesseract TSV error: {}", e)))?;
            *self.engine.borrow_mut() = Some(tess);

            let detections = parse_tsv(&tsv);
            debug!("Tesseract read {} lines from {}x{} image", detections.len(), image.width(), image.height());
            Ok(detections)
        }
    }
}
