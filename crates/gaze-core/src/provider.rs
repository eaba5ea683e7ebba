//! Inference provider seam.
//!
//! A provider turns a model file into an [`InferenceSession`] bound to one
//! compute device. Sessions are owned by exactly one adapter after load; the
//! pipeline never shares a session between threads.

use ndarray::{ArrayD, ArrayViewD, IxDyn};
use ort::execution_providers::{
    CPUExecutionProvider, CUDAExecutionProvider, CoreMLExecutionProvider, ExecutionProvider,
    ExecutionProviderDispatch, OpenVINOExecutionProvider,
};
use ort::session::{Session, SessionInputValue};
use ort::value::TensorRef;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("compute device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Compute device a session is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    #[default]
    Cpu,
    Cuda,
    OpenVino,
    CoreMl,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Device::Cpu => "cpu",
            Device::Cuda => "cuda",
            Device::OpenVino => "openvino",
            Device::CoreMl => "coreml",
        })
    }
}

impl FromStr for Device {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" => Ok(Device::Cpu),
            "cuda" => Ok(Device::Cuda),
            // OpenVINO names its GPU plugin "GPU".
            "openvino" | "gpu" => Ok(Device::OpenVino),
            "coreml" => Ok(Device::CoreMl),
            other => Err(ProviderError::DeviceUnavailable(format!(
                "unknown device '{other}' (expected cpu, cuda, openvino or coreml)"
            ))),
        }
    }
}

/// One output tensor of an inference call.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedTensor {
    pub name: String,
    pub value: ArrayD<f32>,
}

impl NamedTensor {
    pub fn new(name: impl Into<String>, value: ArrayD<f32>) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn shape(&self) -> &[usize] {
        self.value.shape()
    }

    /// Tensor contents in logical (row-major) order.
    pub fn to_flat(&self) -> Vec<f32> {
        self.value.iter().copied().collect()
    }
}

/// A loaded model bound to a device.
pub trait InferenceSession: Send {
    fn input_names(&self) -> &[String];
    fn output_names(&self) -> &[String];

    /// Run one synchronous inference. Outputs are returned in the model's
    /// declared output order.
    fn infer(
        &mut self,
        inputs: &[(&str, ArrayViewD<'_, f32>)],
    ) -> Result<Vec<NamedTensor>, ProviderError>;
}

/// Loads models into sessions.
pub trait InferenceProvider {
    fn load(
        &self,
        model_path: &Path,
        device: Device,
    ) -> Result<Box<dyn InferenceSession>, ProviderError>;
}

pub const DEFAULT_INTRA_THREADS: usize = 2;

/// ONNX Runtime backed provider.
#[derive(Debug, Clone)]
pub struct OrtProvider {
    intra_threads: usize,
}

impl Default for OrtProvider {
    fn default() -> Self {
        Self {
            intra_threads: DEFAULT_INTRA_THREADS,
        }
    }
}

impl OrtProvider {
    pub fn new(intra_threads: usize) -> Self {
        Self {
            intra_threads: intra_threads.max(1),
        }
    }
}

impl InferenceProvider for OrtProvider {
    fn load(
        &self,
        model_path: &Path,
        device: Device,
    ) -> Result<Box<dyn InferenceSession>, ProviderError> {
        if !model_path.exists() {
            return Err(ProviderError::ModelNotFound(
                model_path.display().to_string(),
            ));
        }

        let session = Session::builder()?
            .with_intra_threads(self.intra_threads)?
            .with_execution_providers([execution_provider(device)?])?
            .commit_from_file(model_path)?;

        let input_names: Vec<String> = session.inputs().iter().map(|i| i.name().to_string()).collect();
        let output_names: Vec<String> = session.outputs().iter().map(|o| o.name().to_string()).collect();

        tracing::info!(
            path = %model_path.display(),
            %device,
            inputs = ?input_names,
            outputs = ?output_names,
            "loaded model"
        );

        Ok(Box::new(OrtSession {
            session,
            input_names,
            output_names,
        }))
    }
}

/// Bind a device to its execution provider, failing when the runtime reports
/// the provider as unavailable rather than silently falling back to CPU.
fn execution_provider(device: Device) -> Result<ExecutionProviderDispatch, ProviderError> {
    let unavailable = |e: Option<ort::Error>| {
        ProviderError::DeviceUnavailable(match e {
            Some(e) => format!("{device}: {e}"),
            None => format!("{device}: execution provider not available in this build"),
        })
    };

    match device {
        Device::Cpu => Ok(CPUExecutionProvider::default().build()),
        Device::Cuda => {
            let ep = CUDAExecutionProvider::default();
            match ep.is_available() {
                Ok(true) => Ok(ep.build().error_on_failure()),
                Ok(false) => Err(unavailable(None)),
                Err(e) => Err(unavailable(Some(e))),
            }
        }
        Device::OpenVino => {
            let ep = OpenVINOExecutionProvider::default();
            match ep.is_available() {
                Ok(true) => Ok(ep.build().error_on_failure()),
                Ok(false) => Err(unavailable(None)),
                Err(e) => Err(unavailable(Some(e))),
            }
        }
        Device::CoreMl => {
            let ep = CoreMLExecutionProvider::default();
            match ep.is_available() {
                Ok(true) => Ok(ep.build().error_on_failure()),
                Ok(false) => Err(unavailable(None)),
                Err(e) => Err(unavailable(Some(e))),
            }
        }
    }
}

struct OrtSession {
    session: Session,
    input_names: Vec<String>,
    output_names: Vec<String>,
}

impl InferenceSession for OrtSession {
    fn input_names(&self) -> &[String] {
        &self.input_names
    }

    fn output_names(&self) -> &[String] {
        &self.output_names
    }

    fn infer(
        &mut self,
        inputs: &[(&str, ArrayViewD<'_, f32>)],
    ) -> Result<Vec<NamedTensor>, ProviderError> {
        let mut values: Vec<(String, SessionInputValue<'_>)> = Vec::with_capacity(inputs.len());
        for (name, view) in inputs {
            values.push((
                name.to_string(),
                TensorRef::from_array_view(view.view())?.into(),
            ));
        }

        let outputs = self.session.run(values)?;

        let mut tensors = Vec::with_capacity(self.output_names.len());
        for name in &self.output_names {
            let (shape, data) = outputs[name.as_str()]
                .try_extract_tensor::<f32>()
                .map_err(|e| ProviderError::InferenceFailed(format!("output {name}: {e}")))?;
            let dims: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
            let value = ArrayD::from_shape_vec(IxDyn(&dims), data.to_vec())
                .map_err(|e| ProviderError::InferenceFailed(format!("output {name}: {e}")))?;
            tensors.push(NamedTensor::new(name.clone(), value));
        }

        Ok(tensors)
    }
}
