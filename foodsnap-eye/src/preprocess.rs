//! Image decoding and model input preparation

use crate::error::{Result, VisionError};
use crate::models::DetectionBox;
use image::imageops::{self, FilterType};
use image::{ImageFormat, RgbImage};
use std::path::Path;
use tracing::debug;

/// Largest decoded image accepted (pixels)
const MAX_PIXELS: u64 = 100_000_000;

/// ImageNet channel statistics
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// MIME types the pipeline decodes
pub const ACCEPTED_MIME_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png"];

/// How the image is brought to the model's input size
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResizeMode {
    /// Resize straight to the target size, ignoring aspect ratio
    Stretch,
    /// Resize the shorter side to `scale * target`, then center-crop
    ShorterSideThenCenterCrop { scale: f32 },
}

/// Per-channel normalization applied after scaling to `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Normalization {
    /// Divide by 255 only
    Scale255,
    /// `(x / 255 - mean) / std`
    MeanStd { mean: [f32; 3], std: [f32; 3] },
}

/// Input contract of a model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputSpec {
    pub width: u32,
    pub height: u32,
    pub resize: ResizeMode,
    pub normalization: Normalization,
}

impl InputSpec {
    /// 224x224 stretched input scaled to `[0, 1]` (Keras-style classifier)
    pub fn keras_224() -> Self {
        Self {
            width: 224,
            height: 224,
            resize: ResizeMode::Stretch,
            normalization: Normalization::Scale255,
        }
    }

    /// EfficientNet input: shorter side to 1.1x, center crop, ImageNet stats
    pub fn efficientnet(size: u32) -> Self {
        Self {
            width: size,
            height: size,
            resize: ResizeMode::ShorterSideThenCenterCrop { scale: 1.1 },
            normalization: Normalization::MeanStd {
                mean: IMAGENET_MEAN,
                std: IMAGENET_STD,
            },
        }
    }

    /// YOLO-style detector input
    pub fn yolo(size: u32) -> Self {
        Self {
            width: size,
            height: size,
            resize: ResizeMode::Stretch,
            normalization: Normalization::Scale255,
        }
    }
}

/// Dense NCHW float tensor
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    pub shape: [usize; 4],
    pub data: Vec<f32>,
}

/// Decodes raw images and prepares model inputs. Stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// Decode uploaded bytes with the declared MIME type
    pub fn decode(bytes: &[u8], mime: &str) -> Result<RgbImage> {
        let format = Self::format_for_mime(mime)?;

        if bytes.is_empty() {
            return Err(VisionError::Decode("Empty image payload".to_string()));
        }

        let image = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| VisionError::Decode(format!("Failed to decode {}: {}", mime, e)))?;

        Self::check_dimensions(image.width(), image.height())?;
        debug!("Decoded {} image {}x{}", mime, image.width(), image.height());
        Ok(image.to_rgb8())
    }

    /// Decode an image file, guessing the format from its content
    pub fn open(path: &Path) -> Result<RgbImage> {
        let bytes = std::fs::read(path)?;
        let image = image::load_from_memory(&bytes)
            .map_err(|e| VisionError::Decode(format!("Failed to decode {:?}: {}", path, e)))?;

        Self::check_dimensions(image.width(), image.height())?;
        Ok(image.to_rgb8())
    }

    /// Map a MIME type to the decoder format
    pub fn format_for_mime(mime: &str) -> Result<ImageFormat> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Ok(ImageFormat::Jpeg),
            "image/png" => Ok(ImageFormat::Png),
            other => Err(VisionError::UnsupportedMediaType(format!(
                "{} (accepted: {})",
                other,
                ACCEPTED_MIME_TYPES.join(", ")
            ))),
        }
    }

    fn check_dimensions(width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(VisionError::Decode("Image has zero dimension".to_string()));
        }
        if u64::from(width) * u64::from(height) > MAX_PIXELS {
            return Err(VisionError::Decode(format!(
                "Image too large: {}x{} (max 100M pixels)",
                width, height
            )));
        }
        Ok(())
    }

    /// Resize/crop to the input geometry. Fails when the aspect ratio is
    /// too extreme to scale the shorter side within the pixel limit.
    pub fn fit(image: &RgbImage, spec: &InputSpec) -> Result<RgbImage> {
        match spec.resize {
            ResizeMode::Stretch => Ok(imageops::resize(
                image,
                spec.width,
                spec.height,
                FilterType::Triangle,
            )),
            ResizeMode::ShorterSideThenCenterCrop { scale } => {
                let (w, h) = image.dimensions();
                let target_short = ((spec.width.max(spec.height) as f32) * scale.max(1.0)).round() as u32;
                let (new_w, new_h) = if w <= h {
                    let new_h = scale_long_side(h, w, target_short)?;
                    (target_short, new_h.max(spec.height))
                } else {
                    let new_w = scale_long_side(w, h, target_short)?;
                    (new_w.max(spec.width), target_short)
                };
                if u64::from(new_w) * u64::from(new_h) > MAX_PIXELS {
                    return Err(VisionError::Decode(format!(
                        "Aspect ratio of {}x{} is too extreme to resize",
                        w, h
                    )));
                }
                let resized = imageops::resize(image, new_w, new_h, FilterType::Triangle);
                let x = (new_w - spec.width) / 2;
                let y = (new_h - spec.height) / 2;
                Ok(imageops::crop_imm(&resized, x, y, spec.width, spec.height).to_image())
            }
        }
    }

    /// Produce a `[1, 3, H, W]` tensor for this input shape
    pub fn to_tensor(image: &RgbImage, spec: &InputSpec) -> Result<Tensor> {
        let fitted = Self::fit(image, spec)?;
        let (w, h) = (spec.width as usize, spec.height as usize);
        let plane = w * h;
        let mut data = vec![0.0f32; 3 * plane];

        for (x, y, pixel) in fitted.enumerate_pixels() {
            let offset = y as usize * w + x as usize;
            for c in 0..3 {
                let scaled = pixel[c] as f32 / 255.0;
                data[c * plane + offset] = match spec.normalization {
                    Normalization::Scale255 => scaled,
                    Normalization::MeanStd { mean, std } => (scaled - mean[c]) / std[c],
                };
            }
        }

        Ok(Tensor {
            shape: [1, 3, h, w],
            data,
        })
    }

    /// Cut a detection box out of the image. Coordinates are clamped to the
    /// image; a box with no area after clamping yields `None`.
    pub fn crop(image: &RgbImage, bbox: &DetectionBox) -> Option<RgbImage> {
        let (w, h) = image.dimensions();
        let clamp = |v: f32, max: u32| -> u32 {
            if v.is_finite() {
                v.max(0.0).min(max as f32) as u32
            } else {
                0
            }
        };

        let x1 = clamp(bbox.x1.min(bbox.x2), w);
        let x2 = clamp(bbox.x1.max(bbox.x2), w);
        let y1 = clamp(bbox.y1.min(bbox.y2), h);
        let y2 = clamp(bbox.y1.max(bbox.y2), h);

        if x2 <= x1 || y2 <= y1 {
            return None;
        }

        Some(imageops::crop_imm(image, x1, y1, x2 - x1, y2 - y1).to_image())
    }
}

/// `long * target / short` as a pixel length
fn scale_long_side(long: u32, short: u32, target: u32) -> Result<u32> {
    let scaled = u64::from(long) * u64::from(target) / u64::from(short.max(1));
    u32::try_from(scaled).map_err(|_| {
        VisionError::Decode(format!("Resized side of {} pixels does not fit", scaled))
    })
}
