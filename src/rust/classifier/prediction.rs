use serde::Serialize;

use super::error::InferenceError;
use super::utils::argmax;
use crate::disease::DiseaseClass;

/// Outcome of classifying one image.
///
/// `predicted` is always the arg-max of `class_probabilities`, and the
/// vector is aligned with [`DiseaseClass::ALL`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    predicted: DiseaseClass,
    confidence: f32,
    class_probabilities: Vec<f32>,
    is_simulated: bool,
}

impl PredictionResult {
    /// Builds a result from a per-class probability vector.
    ///
    /// The vector is renormalized to sum to one; the prediction and
    /// confidence are derived from it.
    pub fn from_probabilities(
        probabilities: Vec<f32>,
        is_simulated: bool,
    ) -> Result<Self, InferenceError> {
        if probabilities.len() != DiseaseClass::COUNT {
            return Err(InferenceError::OutputShape {
                expected: DiseaseClass::COUNT,
                actual: probabilities.len(),
            });
        }
        if let Some(bad) = probabilities.iter().find(|p| !p.is_finite() || **p < 0.0) {
            return Err(InferenceError::InvalidProbabilities(format!(
                "entry {} is not a finite non-negative number",
                bad
            )));
        }
        let sum: f32 = probabilities.iter().sum();
        if sum <= 0.0 {
            return Err(InferenceError::InvalidProbabilities("probabilities sum to zero".into()));
        }

        let class_probabilities: Vec<f32> = probabilities.iter().map(|p| p / sum).collect();
        let index = argmax(&class_probabilities)
            .ok_or_else(|| InferenceError::InvalidProbabilities("empty vector".into()))?;
        let predicted = DiseaseClass::from_index(index)
            .ok_or(InferenceError::OutputShape { expected: DiseaseClass::COUNT, actual: index + 1 })?;

        Ok(Self {
            predicted,
            confidence: class_probabilities[index],
            class_probabilities,
            is_simulated,
        })
    }

    /// Builds a result whose vector is already normalized and whose
    /// `predicted` entry is its arg-max.
    pub(crate) fn from_normalized(
        predicted: DiseaseClass,
        class_probabilities: Vec<f32>,
        is_simulated: bool,
    ) -> Self {
        Self {
            predicted,
            confidence: class_probabilities[predicted.index()],
            class_probabilities,
            is_simulated,
        }
    }

    pub(crate) fn mark_simulated(&mut self) {
        self.is_simulated = true;
    }

    pub fn predicted(&self) -> DiseaseClass {
        self.predicted
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Per-class probabilities aligned with [`DiseaseClass::ALL`].
    pub fn class_probabilities(&self) -> &[f32] {
        &self.class_probabilities
    }

    /// Set when the result comes from demo mode rather than the model.
    pub fn is_simulated(&self) -> bool {
        self.is_simulated
    }

    pub fn predicted_label(&self) -> &'static str {
        self.predicted.label()
    }

    pub fn probability_of(&self, class: DiseaseClass) -> f32 {
        self.class_probabilities[class.index()]
    }

    /// The `k` most probable classes, highest first.
    pub fn top_k(&self, k: usize) -> Vec<(DiseaseClass, f32)> {
        let mut ranked: Vec<(DiseaseClass, f32)> = DiseaseClass::ALL
            .iter()
            .copied()
            .zip(self.class_probabilities.iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(k);
        ranked
    }

    pub fn summary(&self) -> String {
        format!(
            "Disease detected is {} with {:.1}% confidence",
            self.predicted_label(),
            self.confidence * 100.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renormalizes_and_picks_argmax() {
        let result = PredictionResult::from_probabilities(
            vec![1.0, 1.0, 6.0, 0.0, 0.0, 0.0, 0.0, 2.0],
            false,
        )
        .unwrap();
        assert_eq!(result.predicted(), DiseaseClass::GrapeBlackRot);
        assert!((result.confidence() - 0.6).abs() < 1e-6);
        let sum: f32 = result.class_probabilities().iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_wrong_length_and_bad_values() {
        assert!(matches!(
            PredictionResult::from_probabilities(vec![1.0; 3], false),
            Err(InferenceError::OutputShape { expected: 8, actual: 3 })
        ));
        let mut nan = vec![0.1; 8];
        nan[2] = f32::NAN;
        assert!(PredictionResult::from_probabilities(nan, false).is_err());
        assert!(PredictionResult::from_probabilities(vec![0.0; 8], true).is_err());
    }

    #[test]
    fn test_top_k_is_sorted() {
        let result = PredictionResult::from_probabilities(
            vec![0.05, 0.3, 0.05, 0.1, 0.05, 0.05, 0.2, 0.2],
            true,
        )
        .unwrap();
        let top = result.top_k(3);
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].0, DiseaseClass::CornCommonRust);
        assert!(top[0].1 >= top[1].1 && top[1].1 >= top[2].1);
        assert_eq!(result.summary(), "Disease detected is Corn Common Rust with 30.0% confidence");
    }

    #[test]
    fn test_mark_simulated_keeps_prediction() {
        let mut result = PredictionResult::from_probabilities(
            vec![0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.3],
            false,
        )
        .unwrap();
        assert!(!result.is_simulated());
        result.mark_simulated();
        assert!(result.is_simulated());
        assert_eq!(result.predicted(), DiseaseClass::TomatoHealthy);
    }
}
