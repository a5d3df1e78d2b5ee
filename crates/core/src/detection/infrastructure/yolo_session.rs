//! Shared ONNX Runtime plumbing for the YOLO face-pose model.
//!
//! Handles letterbox preprocessing of grayscale input, inference, row
//! parsing and NMS. The face and eye detectors build on the parsed rows.

use std::path::Path;

use image::GrayImage;

use crate::detection::domain::candidate_detector::DetectError;

/// Fallback model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.45;

/// Number of keypoint values per detection (5 landmarks × x, y, conf).
const NUM_KEYPOINT_VALUES: usize = 15;

/// Minimum keypoint confidence to treat a landmark as visible.
const KEYPOINT_CONF_THRESH: f64 = 0.5;

/// One post-NMS detection in source-image pixels.
#[derive(Clone, Debug)]
pub struct RawDetection {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub confidence: f64,
    /// `[left_eye, right_eye, nose, left_mouth, right_mouth]`; `None` for
    /// keypoints below the visibility threshold.
    pub keypoints: [Option<(f64, f64)>; 5],
}

pub struct YoloSession {
    session: ort::session::Session,
    input_size: u32,
    score_threshold: f64,
}

impl YoloSession {
    /// Load a YOLO ONNX model.
    ///
    /// The input resolution is read from the model's input shape (NCHW),
    /// falling back to 640 when the shape is dynamic.
    pub fn load(model_path: &Path, score_threshold: f64) -> Result<Self, DetectError> {
        let session = build_session(model_path)
            .map_err(|e| DetectError::Session(format!("{}: {e}", model_path.display())))?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    if shape.len() >= 4 && shape[2] > 0 {
                        Some(shape[2] as u32)
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        Ok(Self {
            session,
            input_size,
            score_threshold,
        })
    }

    /// Detections above the score threshold after NMS, highest score first.
    pub fn infer(&mut self, image: &GrayImage) -> Result<Vec<RawDetection>, DetectError> {
        if image.width() == 0 || image.height() == 0 {
            return Ok(Vec::new());
        }

        let (input_tensor, scale, pad_x, pad_y) = letterbox(image, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)
            .map_err(|e| DetectError::Inference(e.to_string()))?;
        let outputs = self
            .session
            .run(ort::inputs![input_value])
            .map_err(|e| DetectError::Inference(e.to_string()))?;
        if outputs.len() == 0 {
            return Err(DetectError::Output("model produced no outputs".into()));
        }
        let tensor = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| DetectError::Output(e.to_string()))?;
        let shape = tensor.shape().to_vec();
        let data = tensor
            .as_slice()
            .ok_or_else(|| DetectError::Output("non-contiguous output tensor".into()))?;

        let mut dets = parse_rows(data, &shape, self.score_threshold, scale, pad_x, pad_y)?;
        Ok(nms(&mut dets, NMS_IOU_THRESH))
    }
}

fn build_session(model_path: &Path) -> Result<ort::session::Session, Box<dyn std::error::Error>> {
    let session = ort::session::Session::builder()?
        .with_execution_providers(execution_providers())?
        .commit_from_file(model_path)?;
    log::debug!("Loaded {}", model_path.display());
    Ok(session)
}

/// Hardware providers to try before ONNX Runtime's CPU default.
fn execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}

/// Letterbox-resize a grayscale image to `target_size` × `target_size`,
/// replicating luma into three channels.
///
/// Returns `(NCHW float32 tensor, scale, pad_x, pad_y)`.
fn letterbox(image: &GrayImage, target_size: u32) -> (ndarray::Array4<f32>, f64, u32, u32) {
    let fw = image.width() as f64;
    let fh = image.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // 114/255 gray padding, YOLO convention
    let fill = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), fill);

    let src_w = image.width();
    let src_h = image.height();

    // Nearest-neighbor resize into the padded region
    for y in 0..new_h {
        let src_y = ((y as f64 / scale) as u32).min(src_h - 1);
        for x in 0..new_w {
            let src_x = ((x as f64 / scale) as u32).min(src_w - 1);
            let v = image.get_pixel(src_x, src_y).0[0] as f32 / 255.0;
            let ty = (pad_y + y) as usize;
            let tx = (pad_x + x) as usize;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = v;
            }
        }
    }

    (tensor, scale, pad_x, pad_y)
}

/// Parse model rows `[cx, cy, w, h, conf, kp0_x, kp0_y, kp0_conf, ...]`.
///
/// Output layout is `[1, features, detections]` (transposed) or
/// `[1, detections, features]`; both are handled.
fn parse_rows(
    data: &[f32],
    shape: &[usize],
    score_threshold: f64,
    scale: f64,
    pad_x: u32,
    pad_y: u32,
) -> Result<Vec<RawDetection>, DetectError> {
    if shape.len() != 3 {
        return Err(DetectError::Output(format!("unexpected output shape {shape:?}")));
    }
    let transposed = shape[1] < shape[2];
    let (num_dets, num_feats) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    if data.len() < num_dets * num_feats {
        return Err(DetectError::Output(format!(
            "output holds {} values, shape {shape:?} needs {}",
            data.len(),
            num_dets * num_feats
        )));
    }

    let unletterbox = |x: f64, y: f64| ((x - pad_x as f64) / scale, (y - pad_y as f64) / scale);

    let mut dets = Vec::new();
    for i in 0..num_dets {
        let row: Vec<f32> = if transposed {
            (0..num_feats).map(|f| data[f * num_dets + i]).collect()
        } else {
            data[i * num_feats..(i + 1) * num_feats].to_vec()
        };
        if row.len() < 5 {
            continue;
        }
        let conf = row[4] as f64;
        if conf < score_threshold {
            continue;
        }

        let (cx, cy, w, h) = (row[0] as f64, row[1] as f64, row[2] as f64, row[3] as f64);
        let (x1, y1) = unletterbox(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = unletterbox(cx + w / 2.0, cy + h / 2.0);

        let mut keypoints = [None; 5];
        if row.len() >= 5 + NUM_KEYPOINT_VALUES {
            for (k, slot) in keypoints.iter_mut().enumerate() {
                let base = 5 + k * 3;
                if row[base + 2] as f64 >= KEYPOINT_CONF_THRESH {
                    *slot = Some(unletterbox(row[base] as f64, row[base + 1] as f64));
                }
            }
        }

        dets.push(RawDetection {
            x1,
            y1,
            x2,
            y2,
            confidence: conf,
            keypoints,
        });
    }
    Ok(dets)
}

/// Greedy NMS: sort by confidence descending, suppress overlapping boxes.
fn nms(dets: &mut [RawDetection], iou_thresh: f64) -> Vec<RawDetection> {
    dets.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; dets.len()];

    for i in 0..dets.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(dets[i].clone());
        for j in (i + 1)..dets.len() {
            if !suppressed[j] && bbox_iou(&dets[i], &dets[j]) > iou_thresh {
                suppressed[j] = true;
            }
        }
    }
    keep
}

fn bbox_iou(a: &RawDetection, b: &RawDetection) -> f64 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a.x2 - a.x1) * (a.y2 - a.y1);
    let area_b = (b.x2 - b.x1) * (b.y2 - b.y1);
    inter / (area_a + area_b - inter)
}
