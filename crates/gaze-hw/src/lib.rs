//! gaze-hw: V4L2 camera capture for the gaze pipeline.
//!
//! Negotiates a capture format with the device and converts every buffer
//! into an RGB frame the pipeline can consume directly.

pub mod camera;
pub mod frame;

pub use camera::{list_devices, Camera, CameraError, DeviceInfo, FrameStream, PixelFormat};
pub use frame::{Frame, FrameError};
