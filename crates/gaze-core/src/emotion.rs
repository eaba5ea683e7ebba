//! Five-class emotion classifier.

use crate::models::{first_output, infer_single, ModelError};
use crate::preprocess::{preprocess, ChannelOrder};
use crate::provider::InferenceSession;
use crate::types::Emotion;
use image::RgbImage;

const EMOTION_INPUT_SIZE: usize = 64;

pub struct EmotionClassifier {
    session: Box<dyn InferenceSession>,
}

impl EmotionClassifier {
    pub fn new(session: Box<dyn InferenceSession>) -> Self {
        Self { session }
    }

    pub fn classify(&mut self, face: &RgbImage) -> Result<Emotion, ModelError> {
        let input = preprocess(face, EMOTION_INPUT_SIZE, EMOTION_INPUT_SIZE, ChannelOrder::Bgr)?;
        let outputs = infer_single(self.session.as_mut(), &input)?;
        decode_emotion(&first_output(&outputs)?)
    }
}

/// Argmax over the class scores; the first maximum wins on ties.
fn decode_emotion(scores: &[f32]) -> Result<Emotion, ModelError> {
    let classes = Emotion::ALL.len();
    if scores.len() < classes {
        return Err(ModelError::UnexpectedOutput(format!(
            "expected {classes} emotion scores, got {}",
            scores.len()
        )));
    }

    let mut best = 0;
    for (i, &score) in scores[..classes].iter().enumerate().skip(1) {
        if score > scores[best] {
            best = i;
        }
    }
    Ok(Emotion::ALL[best])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::stub::{tensor, StubSession};
    use image::Rgb;

    #[test]
    fn test_argmax() {
        assert_eq!(decode_emotion(&[0.1, 0.2, 0.05, 0.6, 0.05]).unwrap(), Emotion::Surprise);
        assert_eq!(decode_emotion(&[0.0, 0.0, 0.0, 0.0, 0.9]).unwrap(), Emotion::Anger);
    }

    #[test]
    fn test_tie_takes_first() {
        assert_eq!(decode_emotion(&[0.4, 0.4, 0.1, 0.05, 0.05]).unwrap(), Emotion::Neutral);
    }

    #[test]
    fn test_too_few_scores() {
        assert!(matches!(
            decode_emotion(&[0.5, 0.5]),
            Err(ModelError::UnexpectedOutput(_))
        ));
    }

    #[test]
    fn test_classify_input_size() {
        let stub = StubSession::new(
            &["data"],
            vec![tensor("prob_emotion", &[1, 5, 1, 1], vec![0.05, 0.8, 0.05, 0.05, 0.05])],
        );
        let seen = stub.seen.clone();
        let mut classifier = EmotionClassifier::new(Box::new(stub));
        let emotion = classifier
            .classify(&RgbImage::from_pixel(90, 70, Rgb([200, 180, 160])))
            .unwrap();
        assert_eq!(emotion, Emotion::Happy);
        assert_eq!(seen.lock().unwrap()[0][0].1, vec![1, 3, 64, 64]);
    }
}
