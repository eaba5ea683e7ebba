//! Age / gender classifier.
//!
//! The model has two outputs: an age regression scaled to `[0, 1]` and a
//! two-way softmax over {Female, Male}. Output names have drifted between
//! model releases, so the adapter resolves them once at construction:
//!
//! * **Named contract**: outputs `age_conv3` and `prob` are both declared.
//! * **Legacy shape table**: otherwise each output is classified by shape:
//!   `[1, 1, 1, 1]` is the age scalar, `[1, 2, 1, 1]` is the gender softmax.
//!
//! Whichever contract applies, a field that cannot be decoded falls back to
//! its default (`age = 0`, `gender = Female`) instead of failing the face.

use crate::models::{infer_single, ModelError};
use crate::preprocess::{preprocess, ChannelOrder};
use crate::provider::{InferenceSession, NamedTensor};
use crate::types::{AgeGender, Gender};
use image::RgbImage;

const AGE_GENDER_INPUT_SIZE: usize = 62;
const AGE_OUTPUT: &str = "age_conv3";
const GENDER_OUTPUT: &str = "prob";
const AGE_SHAPE: [usize; 4] = [1, 1, 1, 1];
const GENDER_SHAPE: [usize; 4] = [1, 2, 1, 1];
const AGE_SCALE: f32 = 100.0;
const MAX_AGE: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputContract {
    Named { age: usize, gender: usize },
    ShapeTable,
}

pub struct AgeGenderClassifier {
    session: Box<dyn InferenceSession>,
    contract: OutputContract,
}

impl AgeGenderClassifier {
    pub fn new(session: Box<dyn InferenceSession>) -> Self {
        let contract = resolve_contract(session.output_names());
        Self { session, contract }
    }

    pub fn classify(&mut self, face: &RgbImage) -> Result<AgeGender, ModelError> {
        let input = preprocess(face, AGE_GENDER_INPUT_SIZE, AGE_GENDER_INPUT_SIZE, ChannelOrder::Bgr)?;
        let outputs = infer_single(self.session.as_mut(), &input)?;
        Ok(decode(&outputs, self.contract))
    }
}

fn resolve_contract(names: &[String]) -> OutputContract {
    let find = |target: &str| names.iter().position(|n| n == target);
    match (find(AGE_OUTPUT), find(GENDER_OUTPUT)) {
        (Some(age), Some(gender)) => OutputContract::Named { age, gender },
        _ => {
            tracing::warn!(
                ?names,
                "age/gender: output names not recognized, decoding by legacy shape table"
            );
            OutputContract::ShapeTable
        }
    }
}

fn decode(outputs: &[NamedTensor], contract: OutputContract) -> AgeGender {
    let (age_raw, gender_prob) = match contract {
        OutputContract::Named { age, gender } => (
            outputs.get(age).and_then(|t| t.value.iter().next().copied()),
            outputs.get(gender).map(NamedTensor::to_flat).filter(|p| p.len() >= 2),
        ),
        OutputContract::ShapeTable => {
            let mut age_raw = None;
            let mut gender_prob = None;
            for t in outputs {
                if t.shape() == AGE_SHAPE {
                    age_raw = t.value.iter().next().copied();
                } else if t.shape() == GENDER_SHAPE {
                    gender_prob = Some(t.to_flat());
                }
            }
            (age_raw, gender_prob)
        }
    };

    if age_raw.is_none() || gender_prob.is_none() {
        tracing::warn!(
            shapes = ?outputs.iter().map(|t| (t.name.as_str(), t.shape())).collect::<Vec<_>>(),
            age_found = age_raw.is_some(),
            gender_found = gender_prob.is_some(),
            "age/gender output not recognized, using defaults"
        );
    }

    let defaults = AgeGender::default();
    AgeGender {
        age: age_raw.map(decode_age).unwrap_or(defaults.age),
        gender: gender_prob
            .map(|p| decode_gender(p[0], p[1]))
            .unwrap_or(defaults.gender),
    }
}

/// `round(raw * 100)`, clamped to `0..=100`.
pub fn decode_age(raw: f32) -> u8 {
    (raw * AGE_SCALE).round().clamp(0.0, MAX_AGE) as u8
}

/// Female only when strictly more likely; ties go to Male.
pub fn decode_gender(p_female: f32, p_male: f32) -> Gender {
    if p_female > p_male {
        Gender::Female
    } else {
        Gender::Male
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::stub::{tensor, StubSession};
    use image::Rgb;

    #[test]
    fn test_decode_age_rounds_and_clamps() {
        assert_eq!(decode_age(0.254), 25);
        assert_eq!(decode_age(0.257), 26);
        assert_eq!(decode_age(-0.3), 0);
        assert_eq!(decode_age(1.7), 100);
        assert_eq!(decode_age(f32::NAN), 0);
    }

    #[test]
    fn test_decode_gender_tie_is_male() {
        assert_eq!(decode_gender(0.6, 0.4), Gender::Female);
        assert_eq!(decode_gender(0.4, 0.6), Gender::Male);
        assert_eq!(decode_gender(0.5, 0.5), Gender::Male);
    }

    #[test]
    fn test_named_contract() {
        let names: Vec<String> = vec!["prob".into(), "age_conv3".into()];
        assert_eq!(
            resolve_contract(&names),
            OutputContract::Named { age: 1, gender: 0 }
        );
        let outputs = vec![
            tensor("prob", &[1, 2, 1, 1], vec![0.9, 0.1]),
            tensor("age_conv3", &[1, 1, 1, 1], vec![0.31]),
        ];
        let decoded = decode(&outputs, resolve_contract(&names));
        assert_eq!(decoded, AgeGender { age: 31, gender: Gender::Female });
    }

    #[test]
    fn test_shape_table_ignores_names() {
        let outputs = vec![
            tensor("out_a", &[1, 2, 1, 1], vec![0.2, 0.8]),
            tensor("out_b", &[1, 1, 1, 1], vec![0.42]),
        ];
        let decoded = decode(&outputs, OutputContract::ShapeTable);
        assert_eq!(decoded, AgeGender { age: 42, gender: Gender::Male });
    }

    #[test]
    fn test_unrecognized_shapes_fall_back_to_defaults() {
        let outputs = vec![tensor("weird", &[1, 3], vec![0.1, 0.2, 0.3])];
        assert_eq!(decode(&outputs, OutputContract::ShapeTable), AgeGender::default());
        assert_eq!(decode(&[], OutputContract::ShapeTable), AgeGender::default());
    }

    #[test]
    fn test_partial_match_keeps_found_field() {
        let outputs = vec![tensor("a", &[1, 1, 1, 1], vec![0.5])];
        let decoded = decode(&outputs, OutputContract::ShapeTable);
        assert_eq!(decoded, AgeGender { age: 50, gender: Gender::Female });
    }

    #[test]
    fn test_classify_end_to_end() {
        let stub = StubSession::boxed(
            &["data"],
            vec![
                tensor("age_conv3", &[1, 1, 1, 1], vec![0.254]),
                tensor("prob", &[1, 2, 1, 1], vec![0.3, 0.7]),
            ],
        );
        let mut classifier = AgeGenderClassifier::new(stub);
        let result = classifier
            .classify(&RgbImage::from_pixel(30, 30, Rgb([9, 9, 9])))
            .unwrap();
        assert_eq!(result, AgeGender { age: 25, gender: Gender::Male });
    }
}
