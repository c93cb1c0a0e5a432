use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The fixed, ordered classification vocabulary.
///
/// The discriminant of each variant is its index in every probability
/// vector produced by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DiseaseClass {
    AppleScab = 0,
    CornCommonRust = 1,
    GrapeBlackRot = 2,
    PepperBacterialSpot = 3,
    PotatoLateBlight = 4,
    StrawberryLeafScorch = 5,
    TomatoEarlyBlight = 6,
    TomatoHealthy = 7,
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown disease class: {0}")]
pub struct UnknownDiseaseClass(pub String);

impl DiseaseClass {
    pub const COUNT: usize = 8;

    pub const ALL: [DiseaseClass; Self::COUNT] = [
        DiseaseClass::AppleScab,
        DiseaseClass::CornCommonRust,
        DiseaseClass::GrapeBlackRot,
        DiseaseClass::PepperBacterialSpot,
        DiseaseClass::PotatoLateBlight,
        DiseaseClass::StrawberryLeafScorch,
        DiseaseClass::TomatoEarlyBlight,
        DiseaseClass::TomatoHealthy,
    ];

    /// Human-readable label, as shown to users and used as the
    /// recommendation table key.
    pub fn label(self) -> &'static str {
        match self {
            Self::AppleScab => "Apple Scab",
            Self::CornCommonRust => "Corn Common Rust",
            Self::GrapeBlackRot => "Grape Black Rot",
            Self::PepperBacterialSpot => "Pepper Bacterial Spot",
            Self::PotatoLateBlight => "Potato Late Blight",
            Self::StrawberryLeafScorch => "Strawberry Leaf Scorch",
            Self::TomatoEarlyBlight => "Tomato Early Blight",
            Self::TomatoHealthy => "Tomato Healthy",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn is_healthy(self) -> bool {
        matches!(self, Self::TomatoHealthy)
    }

    pub fn labels() -> impl Iterator<Item = &'static str> {
        Self::ALL.iter().map(|class| class.label())
    }
}

impl fmt::Display for DiseaseClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DiseaseClass {
    type Err = UnknownDiseaseClass;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|class| class.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownDiseaseClass(s.to_string()))
    }
}

/// Facts about the dataset the published model was trained on.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetInfo {
    pub total_images: usize,
    pub num_classes: usize,
    pub image_resolution: &'static str,
    pub classes: Vec<&'static str>,
    pub model_architecture: &'static str,
    pub training_method: &'static str,
    pub framework: &'static str,
}

pub fn dataset_info() -> DatasetInfo {
    DatasetInfo {
        total_images: 1600,
        num_classes: DiseaseClass::COUNT,
        image_resolution: "224x224",
        classes: DiseaseClass::labels().collect(),
        model_architecture: "ResNet-50",
        training_method: "Transfer Learning",
        framework: "Hugging Face Transformers",
    }
}
