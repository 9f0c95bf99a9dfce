use crate::config::RegionConfig;
use crate::processing::image_processor::ImageProcessor;
use image::{GrayImage, ImageBuffer, Luma};
use imageproc::contours::{find_contours, BorderType};
use log::debug;

/// Axis-aligned rectangle in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

pub struct RegionSegmenter;

impl RegionSegmenter {
    /// Binary image with text as white foreground, ready for `segment`.
    pub fn binarize(gray: &GrayImage, config: &RegionConfig) -> GrayImage {
        let blurred = ImageProcessor::gaussian_blur(gray, 5);
        ImageProcessor::adaptive_gaussian_threshold(&blurred, config.block_size, config.c, true)
    }

    /// Find text-bearing rectangles in a binary image (foreground = non-zero).
    ///
    /// A wide, short dilation merges characters into line blobs while keeping
    /// separate lines apart; the bounding box of every outer contour that is
    /// large enough is a region. Output order is unspecified.
    pub fn segment(binary: &GrayImage, config: &RegionConfig) -> Vec<Region> {
        let dilated = dilate_rect(binary, config.kernel_width, config.kernel_height);
        let contours = find_contours::<u32>(&dilated);

        let regions: Vec<Region> = contours
            .iter()
            .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
            .filter_map(|c| {
                let min_x = c.points.iter().map(|p| p.x).min()?;
                let max_x = c.points.iter().map(|p| p.x).max()?;
                let min_y = c.points.iter().map(|p| p.y).min()?;
                let max_y = c.points.iter().map(|p| p.y).max()?;
                Some(Region {
                    x: min_x,
                    y: min_y,
                    width: max_x - min_x + 1,
                    height: max_y - min_y + 1,
                })
            })
            .filter(|r| r.width > config.min_width && r.height > config.min_height)
            .collect();

        debug!("Segmented {} regions from {} contours", regions.len(), contours.len());
        regions
    }
}

/// Binary dilation with a `kernel_w x kernel_h` rectangle anchored at its
/// centre, done as two separable max passes.
pub fn dilate_rect(binary: &GrayImage, kernel_w: u32, kernel_h: u32) -> GrayImage {
    let horizontal = max_pass(binary, kernel_w, true);
    max_pass(&horizontal, kernel_h, false)
}

fn max_pass(image: &GrayImage, kernel: u32, horizontal: bool) -> GrayImage {
    let (width, height) = image.dimensions();
    if kernel <= 1 || width == 0 || height == 0 {
        return image.clone();
    }
    let before = (kernel - 1) / 2;
    let after = kernel - 1 - before;
    ImageBuffer::from_fn(width, height, |x, y| {
        let (pos, limit) = if horizontal { (x, width) } else { (y, height) };
        let start = pos.saturating_sub(before);
        let end = (pos + after).min(limit - 1);
        let max = (start..=end)
            .map(|i| {
                let (px, py) = if horizontal { (i, y) } else { (x, i) };
                image.get_pixel(px, py)[0]
            })
            .max()
            .unwrap_or(0);
        Luma([max])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(image: &mut GrayImage, x: u32, y: u32, w: u32, h: u32, value: u8) {
        for yy in y..y + h {
            for xx in x..x + w {
                image.put_pixel(xx, yy, Luma([value]));
            }
        }
    }

    fn sorted(mut regions: Vec<Region>) -> Vec<Region> {
        regions.sort_by_key(|r| (r.y, r.x));
        regions
    }

    #[test]
    fn test_dilation_extends_by_kernel() {
        let mut binary = GrayImage::new(60, 20);
        binary.put_pixel(30, 10, Luma([255]));
        let dilated = dilate_rect(&binary, 15, 5);
        assert_eq!(dilated.get_pixel(23, 10)[0], 255);
        assert_eq!(dilated.get_pixel(37, 10)[0], 255);
        assert_eq!(dilated.get_pixel(22, 10)[0], 0);
        assert_eq!(dilated.get_pixel(30, 8)[0], 255);
        assert_eq!(dilated.get_pixel(30, 7)[0], 0);
        assert_eq!(dilated.pixels().filter(|p| p[0] == 255).count(), 15 * 5);
    }

    #[test]
    fn test_keeps_large_blobs_and_drops_specks() {
        let mut binary = GrayImage::new(600, 400);
        fill(&mut binary, 50, 50, 200, 40, 255);
        fill(&mut binary, 50, 150, 300, 30, 255);
        fill(&mut binary, 320, 50, 150, 35, 255);
        fill(&mut binary, 500, 300, 10, 10, 255);
        let regions = sorted(RegionSegmenter::segment(&binary, &RegionConfig::default()));
        assert_eq!(regions.len(), 3);
        assert_eq!(regions[0], Region { x: 43, y: 48, width: 214, height: 44 });
        assert_eq!(regions[1], Region { x: 313, y: 48, width: 164, height: 39 });
        assert_eq!(regions[2], Region { x: 43, y: 148, width: 314, height: 34 });
    }

    #[test]
    fn test_merges_characters_into_lines() {
        let mut binary = GrayImage::new(500, 200);
        for i in 0..20 {
            fill(&mut binary, 20 + i * 15, 40, 10, 30, 255);
            fill(&mut binary, 20 + i * 15, 120, 10, 30, 255);
        }
        let regions = sorted(RegionSegmenter::segment(&binary, &RegionConfig::default()));
        assert_eq!(regions.len(), 2);
        assert!(regions[0].width > 290);
        assert!(regions[1].y > regions[0].y + regions[0].height);
    }

    #[test]
    fn test_binarize_marks_dark_text_as_foreground() {
        let mut page = GrayImage::from_pixel(200, 100, Luma([240]));
        fill(&mut page, 40, 40, 4, 20, 20);
        let binary = RegionSegmenter::binarize(&page, &RegionConfig::default());
        assert_eq!(binary.get_pixel(41, 50)[0], 255);
        assert_eq!(binary.get_pixel(150, 20)[0], 0);
    }

    #[test]
    fn test_blank_page_has_no_regions() {
        let binary = GrayImage::new(300, 200);
        assert!(RegionSegmenter::segment(&binary, &RegionConfig::default()).is_empty());
    }
}
