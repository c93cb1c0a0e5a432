use std::sync::{Mutex, PoisonError};

use image::DynamicImage;
use log::debug;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use super::error::InferenceError;
use super::prediction::PredictionResult;
use super::strategy::InferenceStrategy;
use crate::disease::DiseaseClass;

/// Probability the chosen class is guaranteed to reach.
pub const CONFIDENCE_FLOOR: f64 = 0.75;

/// Red must exceed green by this much (0-255 scale) to suggest disease.
const RED_MARGIN: f64 = 20.0;
/// Mean green above this suggests a healthy leaf.
const HEALTHY_GREEN: f64 = 150.0;
/// Channel mean assumed for images without color.
const NEUTRAL_MEAN: f64 = 128.0;

const REDDISH_CANDIDATES: [DiseaseClass; 4] = [
    DiseaseClass::AppleScab,
    DiseaseClass::GrapeBlackRot,
    DiseaseClass::PotatoLateBlight,
    DiseaseClass::TomatoEarlyBlight,
];

/// Demo-mode predictions for when no model is usable.
///
/// This is a placeholder, not a classifier. Coarse color statistics only
/// bias which class is reported; the probabilities are random draws and
/// repeated calls on the same image may disagree. Every result carries
/// `is_simulated = true`.
pub struct SimulatedInference {
    rng: Mutex<StdRng>,
}

impl Default for SimulatedInference {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedInference {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Reproducible variant for tests and benchmarks.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Mean red and green intensity on a 0-255 scale.
    pub fn channel_means(image: &DynamicImage) -> (f64, f64) {
        if !image.color().has_color() {
            return (NEUTRAL_MEAN, NEUTRAL_MEAN);
        }
        let rgb = image.to_rgb8();
        let pixels = (rgb.width() as f64) * (rgb.height() as f64);
        if pixels == 0.0 {
            return (NEUTRAL_MEAN, NEUTRAL_MEAN);
        }
        let (red, green) = rgb.pixels().fold((0u64, 0u64), |(r, g), p| {
            (r + p[0] as u64, g + p[1] as u64)
        });
        (red as f64 / pixels, green as f64 / pixels)
    }

    fn choose_class<R: Rng>(rng: &mut R, red: f64, green: f64) -> DiseaseClass {
        if red > green + RED_MARGIN {
            *REDDISH_CANDIDATES.choose(rng).unwrap_or(&DiseaseClass::AppleScab)
        } else if green > HEALTHY_GREEN {
            DiseaseClass::TomatoHealthy
        } else {
            let index = rng.random_range(0..DiseaseClass::TomatoHealthy.index());
            DiseaseClass::from_index(index).unwrap_or(DiseaseClass::AppleScab)
        }
    }

    /// Symmetric Dirichlet(0.5) sample.
    fn dirichlet<R: Rng>(rng: &mut R) -> Vec<f64> {
        // Z^2 / 2 ~ Gamma(0.5, 1) for standard normal Z
        let draws: Vec<f64> = (0..DiseaseClass::COUNT)
            .map(|_| {
                let z: f64 = rng.sample(StandardNormal);
                z * z / 2.0
            })
            .collect();
        let total: f64 = draws.iter().sum();
        if total > 0.0 {
            draws.into_iter().map(|d| d / total).collect()
        } else {
            vec![1.0 / DiseaseClass::COUNT as f64; DiseaseClass::COUNT]
        }
    }

    /// Raises `chosen` to at least `floor` and rescales the rest so the
    /// vector still sums to one.
    fn apply_floor(probs: &mut [f64], chosen: usize, floor: f64) {
        if probs[chosen] >= floor {
            return;
        }
        let rest: f64 = probs
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != chosen)
            .map(|(_, p)| *p)
            .sum();
        let others = (probs.len() - 1) as f64;
        for (i, p) in probs.iter_mut().enumerate() {
            if i == chosen {
                *p = floor;
            } else if rest > 0.0 {
                *p *= (1.0 - floor) / rest;
            } else {
                *p = (1.0 - floor) / others;
            }
        }
    }

    /// Produces a demo prediction. Never fails.
    pub fn simulate(&self, image: &DynamicImage) -> PredictionResult {
        let (red, green) = Self::channel_means(image);
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);

        let chosen = Self::choose_class(&mut *rng, red, green);
        let mut probs = Self::dirichlet(&mut *rng);
        Self::apply_floor(&mut probs, chosen.index(), CONFIDENCE_FLOOR);
        debug!(
            "Simulated prediction {} (red {:.1}, green {:.1})",
            chosen, red, green
        );

        let class_probabilities: Vec<f32> = probs.iter().map(|p| *p as f32).collect();
        PredictionResult::from_normalized(chosen, class_probabilities, true)
    }
}

impl InferenceStrategy for SimulatedInference {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn predict(&self, image: &DynamicImage) -> Result<PredictionResult, InferenceError> {
        Ok(self.simulate(image))
    }
}
