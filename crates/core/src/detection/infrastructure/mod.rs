pub mod onnx_detector_loader;
pub mod onnx_eye_detector;
pub mod onnx_yolo_detector;
pub mod yolo_session;
