use crate::prediction::Prediction;
use ndarray::{Array, Ix4};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("{0}")]
    MissingArtifact(String),
    #[error("failed to load model: {0}")]
    Load(#[from] ort::Error),
    #[error("session mutex poisoned: {0}")]
    Poisoned(String),
    #[error("failed to build tensor: {0}")]
    Tensor(String),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("expected a single output value, got {0}")]
    OutputShape(usize),
}

/// Binary classifier over a `[1, 3, 224, 224]` input.
pub trait ModelService: Send + Sync + 'static {
    /// Runs one forward pass and returns the raw logit.
    fn forward(&self, input: &Array<f32, Ix4>) -> Result<f32, ModelError>;

    fn predict(&self, input: &Array<f32, Ix4>) -> Result<Prediction, ModelError> {
        let logit = self.forward(input)?;
        let prediction = Prediction::from_logit(logit);
        tracing::debug!(
            "logit={:.4} probability={:.4} class={}",
            logit,
            prediction.probability,
            prediction.class.as_str()
        );
        Ok(prediction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction::LesionClass;

    /// Averages the input, so identical tensors give identical logits.
    struct MeanModelService {
        bias: f32,
    }

    impl ModelService for MeanModelService {
        fn forward(&self, input: &Array<f32, Ix4>) -> Result<f32, ModelError> {
            input
                .mean()
                .map(|mean| mean + self.bias)
                .ok_or(ModelError::OutputShape(0))
        }
    }

    #[test]
    fn test_predict_applies_sigmoid_and_threshold() {
        let input = Array::zeros((1, 3, 224, 224));

        let at_boundary = MeanModelService { bias: 0.0 }.predict(&input).unwrap();
        assert_eq!(at_boundary.probability, 0.5);
        assert_eq!(at_boundary.class, LesionClass::Benign);

        let above = MeanModelService { bias: 0.01 }.predict(&input).unwrap();
        assert_eq!(above.class, LesionClass::Malignant);
    }

    #[test]
    fn test_predict_is_deterministic() {
        let model = MeanModelService { bias: -0.3 };
        let input = Array::from_shape_fn((1, 3, 224, 224), |(_, c, y, x)| {
            (c * 7 + y * 3 + x) as f32 / 1000.
        });

        let first = model.predict(&input).unwrap();
        let second = model.predict(&input).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_forward_errors_propagate() {
        struct FailingModelService;

        impl ModelService for FailingModelService {
            fn forward(&self, _input: &Array<f32, Ix4>) -> Result<f32, ModelError> {
                Err(ModelError::Inference("corrupt artifact".to_string()))
            }
        }

        let err = FailingModelService
            .predict(&Array::zeros((1, 3, 224, 224)))
            .unwrap_err();
        assert_eq!(err.to_string(), "inference failed: corrupt artifact");
    }
}
