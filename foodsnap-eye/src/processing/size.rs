//! Portion-size heuristic based on the largest foreground contour

use crate::config::SizeThresholds;
use foodsnap_core::FoodSize;
use image::{imageops, GrayImage, RgbImage};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::contrast::{otsu_level, threshold};
use imageproc::filter::gaussian_blur_f32;
use tracing::debug;

/// Blur strength roughly equivalent to a 5x5 Gaussian kernel
const BLUR_SIGMA: f32 = 1.1;

/// Estimates how much of the frame the food occupies
#[derive(Debug, Clone, Copy, Default)]
pub struct SizeEstimator {
    thresholds: SizeThresholds,
}

impl SizeEstimator {
    pub fn new(thresholds: SizeThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> SizeThresholds {
        self.thresholds
    }

    /// Blur, binarize with Otsu, then bucket the area ratio of the largest
    /// external contour. No contour means `Medium`.
    pub fn estimate(&self, image: &RgbImage) -> FoodSize {
        let (w, h) = image.dimensions();
        let image_area = f64::from(w) * f64::from(h);
        if image_area == 0.0 {
            return FoodSize::Medium;
        }

        let gray = imageops::grayscale(image);
        let blurred = gaussian_blur_f32(&gray, BLUR_SIGMA);
        let binary = threshold(&blurred, otsu_level(&blurred));

        match largest_external_area(&binary) {
            Some(area) => {
                let ratio = (area / image_area) as f32;
                let size = bucket_for_ratio(ratio, self.thresholds);
                debug!("Largest contour covers {:.3} of the frame ({})", ratio, size);
                size
            }
            None => FoodSize::Medium,
        }
    }
}

/// `ratio > large` is large, `ratio > medium` is medium, anything else small
pub fn bucket_for_ratio(ratio: f32, thresholds: SizeThresholds) -> FoodSize {
    if ratio > thresholds.large {
        FoodSize::Large
    } else if ratio > thresholds.medium {
        FoodSize::Medium
    } else {
        FoodSize::Small
    }
}

fn largest_external_area(binary: &GrayImage) -> Option<f64> {
    // Outer borders are only traced from a background left neighbour, so
    // regions touching the frame need a zero margin around the mask.
    let padded = with_background_border(binary);
    find_contours::<i32>(&padded)
        .iter()
        .filter(|c| c.parent.is_none() && c.border_type == BorderType::Outer)
        .map(polygon_area)
        .fold(None, |best: Option<f64>, area| match best {
            Some(b) if b >= area => Some(b),
            _ => Some(area),
        })
}

/// Copy of `mask` surrounded by a one-pixel background border
fn with_background_border(mask: &GrayImage) -> GrayImage {
    let (w, h) = mask.dimensions();
    let mut padded = GrayImage::new(w + 2, h + 2);
    imageops::replace(&mut padded, mask, 1, 1);
    padded
}

/// Shoelace area of the contour polygon
fn polygon_area(contour: &Contour<i32>) -> f64 {
    let points = &contour.points;
    if points.len() < 3 {
        return 0.0;
    }

    let twice: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| i64::from(a.x) * i64::from(b.y) - i64::from(b.x) * i64::from(a.y))
        .sum();

    (twice as f64).abs() / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use proptest::prelude::*;

    fn rank(size: FoodSize) -> u8 {
        match size {
            FoodSize::Small => 0,
            FoodSize::Medium => 1,
            FoodSize::Large => 2,
            FoodSize::Unknown => u8::MAX,
        }
    }

    fn square_on_black(side: u32) -> RgbImage {
        let mut image = RgbImage::new(100, 100);
        let offset = (100 - side) / 2;
        for y in offset..offset + side {
            for x in offset..offset + side {
                image.put_pixel(x, y, Rgb([230, 200, 160]));
            }
        }
        image
    }

    #[test]
    fn test_bucket_boundaries() {
        let t = SizeThresholds::default();
        assert_eq!(bucket_for_ratio(0.31, t), FoodSize::Large);
        assert_eq!(bucket_for_ratio(0.30, t), FoodSize::Medium);
        assert_eq!(bucket_for_ratio(0.16, t), FoodSize::Medium);
        assert_eq!(bucket_for_ratio(0.15, t), FoodSize::Small);
        assert_eq!(bucket_for_ratio(0.14, t), FoodSize::Small);
    }

    #[test]
    fn test_bucket_custom_thresholds() {
        let t = SizeThresholds { large: 0.5, medium: 0.2 };
        assert_eq!(bucket_for_ratio(0.4, t), FoodSize::Medium);
        assert_eq!(bucket_for_ratio(0.6, t), FoodSize::Large);
    }

    #[test]
    fn test_estimate_synthetic_squares() {
        let estimator = SizeEstimator::default();
        assert_eq!(estimator.estimate(&square_on_black(60)), FoodSize::Large);
        assert_eq!(estimator.estimate(&square_on_black(45)), FoodSize::Medium);
        assert_eq!(estimator.estimate(&square_on_black(20)), FoodSize::Small);
    }

    fn block_at(x0: u32, side: u32) -> RgbImage {
        let mut image = RgbImage::new(100, 100);
        for y in 20..20 + side {
            for x in x0..x0 + side {
                image.put_pixel(x, y, Rgb([230, 200, 160]));
            }
        }
        image
    }

    #[test]
    fn test_estimate_block_touching_left_edge() {
        let estimator = SizeEstimator::default();
        assert_eq!(estimator.estimate(&block_at(0, 60)), FoodSize::Large);
        assert_eq!(estimator.estimate(&block_at(0, 20)), FoodSize::Small);
    }

    #[test]
    fn test_estimate_ignores_horizontal_position() {
        let estimator = SizeEstimator::default();
        for side in [20, 45, 60] {
            let left = estimator.estimate(&block_at(0, side));
            let centre = estimator.estimate(&block_at((100 - side) / 2, side));
            let right = estimator.estimate(&block_at(100 - side, side));
            assert_eq!(left, centre, "side {}", side);
            assert_eq!(right, centre, "side {}", side);

            let mirrored = imageops::flip_horizontal(&block_at(0, side));
            assert_eq!(estimator.estimate(&mirrored), left, "side {}", side);
        }
    }

    #[test]
    fn test_background_border() {
        let mask = GrayImage::from_pixel(3, 2, image::Luma([255]));
        let padded = with_background_border(&mask);
        assert_eq!(padded.dimensions(), (5, 4));
        assert_eq!(padded.get_pixel(0, 0)[0], 0);
        assert_eq!(padded.get_pixel(1, 1)[0], 255);
        assert_eq!(padded.get_pixel(4, 3)[0], 0);
    }

    #[test]
    fn test_estimate_blank_is_medium() {
        let estimator = SizeEstimator::default();
        assert_eq!(estimator.estimate(&RgbImage::new(64, 48)), FoodSize::Medium);
    }

    #[test]
    fn test_estimate_is_deterministic() {
        let estimator = SizeEstimator::default();
        let image = square_on_black(45);
        let first = estimator.estimate(&image);
        for _ in 0..5 {
            assert_eq!(estimator.estimate(&image), first);
        }
    }

    #[test]
    fn test_polygon_area_square() {
        use imageproc::point::Point;
        let contour = Contour {
            points: vec![Point::new(0, 0), Point::new(10, 0), Point::new(10, 10), Point::new(0, 10)],
            border_type: BorderType::Outer,
            parent: None,
        };
        assert_eq!(polygon_area(&contour), 100.0);
    }

    proptest! {
        #[test]
        fn prop_bucket_is_monotonic(a in 0.0f32..=1.0, b in 0.0f32..=1.0) {
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            let t = SizeThresholds::default();
            prop_assert!(rank(bucket_for_ratio(low, t)) <= rank(bucket_for_ratio(high, t)));
        }
    }
}
