//! ONNX Runtime backed detector and classifier

use crate::error::{Result, VisionError};
use crate::models::{softmax, ClassificationResult, Classifier, DetectionBox, Detector, TOP_K};
use crate::preprocess::{ImagePreprocessor, InputSpec};
use image::RgbImage;
use ort::session::Session;
use ort::value::Tensor;
use parking_lot::Mutex;
use std::path::Path;
use tracing::{debug, info};

/// Values per detector output row: x1, y1, x2, y2, score, class
const DETECTION_ROW: usize = 6;

/// Upper bound on rows read from a detector output
const MAX_DETECTIONS: usize = 100;

fn load_session(model_path: &Path) -> Result<Session> {
    let session = Session::builder()?
        .commit_from_file(model_path)
        .map_err(|e| VisionError::Ort(format!("Failed to load {:?}: {}", model_path, e)))?;
    Ok(session)
}

/// Image classifier. The session is locked for the duration of a run since
/// the runtime needs exclusive access to it.
pub struct OnnxClassifier {
    session: Mutex<Session>,
    labels: Vec<String>,
    spec: InputSpec,
}

impl OnnxClassifier {
    pub fn new(model_path: &Path, labels: Vec<String>, spec: InputSpec) -> Result<Self> {
        let session = load_session(model_path)?;
        info!("Classifier model loaded from {:?} ({} labels)", model_path, labels.len());

        Ok(Self {
            session: Mutex::new(session),
            labels,
            spec,
        })
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        "onnx-classifier"
    }

    fn classify(&self, image: &RgbImage) -> Result<ClassificationResult> {
        let tensor = ImagePreprocessor::to_tensor(image, &self.spec)?;
        let input = Tensor::from_array((tensor.shape, tensor.data))?;

        let probs = {
            let mut session = self.session.lock();
            let outputs = session.run(ort::inputs![input])?;
            let (_, logits) = outputs[0].try_extract_tensor::<f32>()?;
            softmax(logits)
        };

        let result = ClassificationResult::from_distribution(&probs, &self.labels, TOP_K)
            .ok_or_else(|| VisionError::Inference("Classifier returned no scores".to_string()))?;

        debug!("Classified as {} ({:.3})", result.label, result.score);
        Ok(result)
    }
}

/// Region detector producing boxes in source-image coordinates
pub struct OnnxDetector {
    session: Mutex<Session>,
    spec: InputSpec,
}

impl OnnxDetector {
    pub fn new(model_path: &Path, spec: InputSpec) -> Result<Self> {
        let session = load_session(model_path)?;
        info!("Detector model loaded from {:?}", model_path);

        Ok(Self {
            session: Mutex::new(session),
            spec,
        })
    }
}

impl Detector for OnnxDetector {
    fn name(&self) -> &str {
        "onnx-detector"
    }

    fn detect(&self, image: &RgbImage) -> Result<Vec<DetectionBox>> {
        let (width, height) = image.dimensions();
        let tensor = ImagePreprocessor::to_tensor(image, &self.spec)?;
        let input = Tensor::from_array((tensor.shape, tensor.data))?;

        let rows: Vec<f32> = {
            let mut session = self.session.lock();
            let outputs = session.run(ort::inputs![input])?;
            let (_, data) = outputs[0].try_extract_tensor::<f32>()?;
            data.to_vec()
        };

        if rows.len() % DETECTION_ROW != 0 {
            return Err(VisionError::Inference(format!(
                "Unexpected detector output length {}",
                rows.len()
            )));
        }

        let sx = width as f32 / self.spec.width as f32;
        let sy = height as f32 / self.spec.height as f32;

        let boxes: Vec<DetectionBox> = rows
            .chunks_exact(DETECTION_ROW)
            .take(MAX_DETECTIONS)
            .filter(|row| row.iter().all(|v| v.is_finite()))
            .map(|row| DetectionBox::new(row[0] * sx, row[1] * sy, row[2] * sx, row[3] * sy, row[4]))
            .collect();

        debug!("Detector produced {} boxes", boxes.len());
        Ok(boxes)
    }
}
