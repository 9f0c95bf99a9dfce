use crate::config::VariantConfig;
use crate::utils::DocScanError;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use imageproc::contrast::{otsu_level, threshold};
use imageproc::filter::gaussian_blur_f32;
use log::{debug, info};

/// The preprocessed versions of a page that are each run through recognition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantKind {
    Gray,
    Clahe,
    Otsu,
    Adaptive,
    Upscaled,
}

impl VariantKind {
    pub fn name(&self) -> &'static str {
        match self {
            VariantKind::Gray => "gray",
            VariantKind::Clahe => "clahe",
            VariantKind::Otsu => "otsu",
            VariantKind::Adaptive => "adaptive",
            VariantKind::Upscaled => "upscaled",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Variant {
    pub kind: VariantKind,
    pub image: GrayImage,
}

/// ImageProcessor decodes document photos and builds the variant set.
/// No single threshold works for every photo (glare, shadows, low resolution),
/// so recognition runs on all of them and fusion keeps the best reading.
pub struct ImageProcessor;

impl ImageProcessor {
    /// Decode an encoded image, downscaling anything wider than `max_width`.
    pub fn decode(image_bytes: &[u8], max_width: u32) -> Result<DynamicImage, DocScanError> {
        let image = image::load_from_memory(image_bytes)?;
        Ok(Self::limit_width(image, max_width))
    }

    fn limit_width(image: DynamicImage, max_width: u32) -> DynamicImage {
        let (width, height) = (image.width(), image.height());
        if max_width == 0 || width <= max_width {
            return image;
        }
        let new_height = ((height as u64 * max_width as u64) / width as u64).max(1) as u32;
        info!("Resized input from {}x{} to {}x{}", width, height, max_width, new_height);
        image.resize_exact(max_width, new_height, FilterType::Lanczos3)
    }

    /// Build the fixed variant set, in recognition order.
    pub fn generate_variants(image: &DynamicImage, config: &VariantConfig) -> Vec<Variant> {
        let gray = image.to_luma8();
        let clahe = Self::clahe(&gray, config.clahe_clip_limit, config.clahe_tiles);
        let otsu = Self::otsu_binary(&clahe);
        let adaptive = Self::adaptive_gaussian_threshold(&clahe, config.adaptive_block_size, config.adaptive_c, false);
        let upscaled = Self::upscale(&gray, config.upscale_factor);

        let variants = vec![
            Variant { kind: VariantKind::Gray, image: gray },
            Variant { kind: VariantKind::Clahe, image: clahe },
            Variant { kind: VariantKind::Otsu, image: otsu },
            Variant { kind: VariantKind::Adaptive, image: adaptive },
            Variant { kind: VariantKind::Upscaled, image: upscaled },
        ];
        debug!("Generated {} variants", variants.len());
        variants
    }

    /// Sigma OpenCV derives for a Gaussian kernel of size `ksize`.
    pub fn kernel_sigma(ksize: u32) -> f32 {
        let ksize = ksize.max(3) as f32;
        0.3 * ((ksize - 1.0) * 0.5 - 1.0) + 0.8
    }

    pub fn gaussian_blur(gray: &GrayImage, ksize: u32) -> GrayImage {
        if gray.width() == 0 || gray.height() == 0 {
            return gray.clone();
        }
        gaussian_blur_f32(gray, Self::kernel_sigma(ksize))
    }

    /// Blur then binarize at the Otsu level.
    pub fn otsu_binary(gray: &GrayImage) -> GrayImage {
        let blurred = Self::gaussian_blur(gray, 3);
        let level = otsu_level(&blurred);
        threshold(&blurred, level)
    }

    /// Pixel is white when brighter than its Gaussian-weighted neighbourhood
    /// minus `c`. `invert` flips the output so dark text becomes foreground.
    pub fn adaptive_gaussian_threshold(gray: &GrayImage, block_size: u32, c: i32, invert: bool) -> GrayImage {
        let (width, height) = gray.dimensions();
        if width == 0 || height == 0 {
            return gray.clone();
        }
        let local = gaussian_blur_f32(gray, Self::kernel_sigma(block_size));
        ImageBuffer::from_fn(width, height, |x, y| {
            let value = gray.get_pixel(x, y)[0] as i32;
            let limit = local.get_pixel(x, y)[0] as i32 - c;
            let white = value > limit;
            Luma([if white != invert { 255u8 } else { 0u8 }])
        })
    }

    pub fn upscale(gray: &GrayImage, factor: f32) -> GrayImage {
        let (width, height) = gray.dimensions();
        let new_width = ((width as f32 * factor).round() as u32).max(1);
        let new_height = ((height as f32 * factor).round() as u32).max(1);
        imageops::resize(gray, new_width, new_height, FilterType::CatmullRom)
    }

    /// Contrast-limited adaptive histogram equalization over a
    /// `tiles x tiles` grid with bilinear blending between tile mappings.
    pub fn clahe(gray: &GrayImage, clip_limit: f32, tiles: u32) -> GrayImage {
        let (width, height) = gray.dimensions();
        if width == 0 || height == 0 {
            return gray.clone();
        }
        let tiles_x = tiles.max(1).min(width);
        let tiles_y = tiles.max(1).min(height);

        let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
        for ty in 0..tiles_y {
            let y0 = ty * height / tiles_y;
            let y1 = (ty + 1) * height / tiles_y;
            for tx in 0..tiles_x {
                let x0 = tx * width / tiles_x;
                let x1 = (tx + 1) * width / tiles_x;
                luts.push(Self::tile_lut(gray, x0, y0, x1, y1, clip_limit));
            }
        }

        let tile_w = width as f32 / tiles_x as f32;
        let tile_h = height as f32 / tiles_y as f32;
        let lut = |tx: u32, ty: u32, value: u8| luts[(ty * tiles_x + tx) as usize][value as usize] as f32;

        ImageBuffer::from_fn(width, height, |x, y| {
            let value = gray.get_pixel(x, y)[0];
            let (tx0, tx1, ax) = Self::neighbour_tiles(x, tile_w, tiles_x);
            let (ty0, ty1, ay) = Self::neighbour_tiles(y, tile_h, tiles_y);
            let top = lut(tx0, ty0, value) * (1.0 - ax) + lut(tx1, ty0, value) * ax;
            let bottom = lut(tx0, ty1, value) * (1.0 - ax) + lut(tx1, ty1, value) * ax;
            let blended = top * (1.0 - ay) + bottom * ay;
            Luma([blended.round().clamp(0.0, 255.0) as u8])
        })
    }

    fn neighbour_tiles(pos: u32, tile_size: f32, count: u32) -> (u32, u32, f32) {
        let grid = (pos as f32 + 0.5) / tile_size - 0.5;
        if grid <= 0.0 {
            return (0, 0, 0.0);
        }
        let first = (grid.floor() as u32).min(count - 1);
        let second = (first + 1).min(count - 1);
        let weight = if first == second { 0.0 } else { grid - first as f32 };
        (first, second, weight)
    }

    fn tile_lut(gray: &GrayImage, x0: u32, y0: u32, x1: u32, y1: u32, clip_limit: f32) -> [u8; 256] {
        let mut histogram = [0u32; 256];
        for y in y0..y1 {
            for x in x0..x1 {
                histogram[gray.get_pixel(x, y)[0] as usize] += 1;
            }
        }
        let area = ((x1 - x0) * (y1 - y0)).max(1);

        if clip_limit > 0.0 {
            let clip = ((clip_limit * area as f32 / 256.0) as u32).max(1);
            let mut excess = 0u32;
            for bin in histogram.iter_mut() {
                if *bin > clip {
                    excess += *bin - clip;
                    *bin = clip;
                }
            }
            let share = excess / 256;
            let remainder = (excess % 256) as usize;
            for (i, bin) in histogram.iter_mut().enumerate() {
                *bin += share + if i < remainder { 1 } else { 0 };
            }
        }

        let mut lut = [0u8; 256];
        let mut cumulative = 0u32;
        for (value, count) in histogram.iter().enumerate() {
            cumulative += count;
            lut[value] = ((cumulative as f32 * 255.0 / area as f32).round()).min(255.0) as u8;
        }
        lut
    }
}
