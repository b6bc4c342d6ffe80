use serde::Serialize;

pub const DECISION_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LesionClass {
    Benign,
    Malignant,
}

impl LesionClass {
    /// Strictly above the threshold is malignant; exactly 0.5 stays benign.
    pub fn from_probability(probability: f32) -> Self {
        if probability > DECISION_THRESHOLD {
            LesionClass::Malignant
        } else {
            LesionClass::Benign
        }
    }

    pub fn class_id(&self) -> u8 {
        match self {
            LesionClass::Benign => 0,
            LesionClass::Malignant => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LesionClass::Benign => "Benign",
            LesionClass::Malignant => "Malignant",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub probability: f32,
    pub class: LesionClass,
}

impl Prediction {
    pub fn from_logit(logit: f32) -> Self {
        let probability = sigmoid(logit);
        Self {
            probability,
            class: LesionClass::from_probability(probability),
        }
    }
}

pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigmoid_of_zero_is_half() {
        assert_eq!(sigmoid(0.0), 0.5);
    }

    #[test]
    fn test_threshold_boundary() {
        assert_eq!(LesionClass::from_probability(0.5), LesionClass::Benign);
        assert_eq!(
            LesionClass::from_probability(f32::from_bits(0.5f32.to_bits() + 1)),
            LesionClass::Malignant
        );
        assert_eq!(Prediction::from_logit(0.0).class, LesionClass::Benign);
        assert_eq!(Prediction::from_logit(1e-3).class, LesionClass::Malignant);
    }

    #[test]
    fn test_labels() {
        let benign = Prediction::from_logit(-4.0);
        assert_eq!(benign.class.as_str(), "Benign");
        assert_eq!(benign.class.class_id(), 0);
        assert!(benign.probability < 0.05);

        let malignant = Prediction::from_logit(4.0);
        assert_eq!(malignant.class.as_str(), "Malignant");
        assert_eq!(malignant.class.class_id(), 1);
        assert!(malignant.probability > 0.95);
    }
}
