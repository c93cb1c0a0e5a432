use std::collections::HashMap;
use std::fmt;

use lazy_static::lazy_static;
use serde::Serialize;

use crate::disease::DiseaseClass;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => f.write_str("low"),
            Self::Medium => f.write_str("medium"),
            Self::High => f.write_str("high"),
        }
    }
}

/// Pre-authored guidance for a detected condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationRecord {
    pub severity: Severity,
    pub status: String,
    pub message: String,
    pub actions: Vec<String>,
    pub prevention: Vec<String>,
}

impl RecommendationRecord {
    fn new(
        severity: Severity,
        status: &str,
        message: impl Into<String>,
        actions: &[&str],
        prevention: &[&str],
    ) -> Self {
        Self {
            severity,
            status: status.to_string(),
            message: message.into(),
            actions: actions.iter().map(|s| s.to_string()).collect(),
            prevention: prevention.iter().map(|s| s.to_string()).collect(),
        }
    }
}

const DETECTED: &str = "Disease Detected";

lazy_static! {
    static ref HEALTHY: RecommendationRecord = RecommendationRecord::new(
        Severity::Low,
        "Healthy",
        "The plant appears healthy! Continue regular care and monitoring.",
        &[
            "Continue regular watering schedule",
            "Maintain proper sunlight exposure",
            "Monitor for any changes",
            "Keep area clean and free of debris",
        ],
        &[
            "Regular inspection of plants",
            "Proper spacing between plants",
            "Good air circulation",
            "Balanced fertilization",
        ],
    );

    static ref TABLE: HashMap<&'static str, RecommendationRecord> = {
        let mut table = HashMap::new();
        table.insert("Apple Scab", RecommendationRecord::new(
            Severity::Medium,
            DETECTED,
            "Apple Scab is a fungal disease that affects leaves and fruit.",
            &[
                "Remove and destroy infected leaves",
                "Apply fungicide (copper-based or sulfur)",
                "Prune to improve air circulation",
                "Avoid overhead watering",
            ],
            &[
                "Plant resistant varieties",
                "Remove fallen leaves in autumn",
                "Maintain proper spacing",
                "Apply preventive fungicide in spring",
            ],
        ));
        table.insert("Corn Common Rust", RecommendationRecord::new(
            Severity::Medium,
            DETECTED,
            "Common Rust is a fungal disease affecting corn leaves.",
            &[
                "Apply fungicide if severe",
                "Remove heavily infected leaves",
                "Ensure good air circulation",
                "Monitor weather conditions",
            ],
            &[
                "Plant resistant hybrids",
                "Rotate crops annually",
                "Avoid dense planting",
                "Remove crop debris after harvest",
            ],
        ));
        table.insert("Grape Black Rot", RecommendationRecord::new(
            Severity::High,
            DETECTED,
            "Black Rot is a serious fungal disease of grapes.",
            &[
                "Remove and destroy infected fruit immediately",
                "Apply fungicide (mancozeb or captan)",
                "Prune infected canes",
                "Improve air circulation",
            ],
            &[
                "Remove mummified berries",
                "Prune for good air flow",
                "Apply preventive fungicide",
                "Avoid overhead irrigation",
            ],
        ));
        table.insert("Pepper Bacterial Spot", RecommendationRecord::new(
            Severity::High,
            DETECTED,
            "Bacterial Spot is a serious bacterial disease of peppers.",
            &[
                "Remove infected plants",
                "Apply copper-based bactericide",
                "Avoid working with wet plants",
                "Disinfect tools between plants",
            ],
            &[
                "Use disease-free seeds",
                "Rotate crops (3-4 years)",
                "Avoid overhead watering",
                "Maintain plant spacing",
            ],
        ));
        table.insert("Potato Late Blight", RecommendationRecord::new(
            Severity::High,
            DETECTED,
            "Late Blight is a devastating disease that can destroy entire crops.",
            &[
                "Remove and destroy infected plants immediately",
                "Apply fungicide (chlorothalonil or mancozeb)",
                "Harvest early if possible",
                "Monitor weather for favorable conditions",
            ],
            &[
                "Plant certified disease-free seed potatoes",
                "Avoid overhead irrigation",
                "Ensure good drainage",
                "Apply preventive fungicide in humid weather",
            ],
        ));
        table.insert("Strawberry Leaf Scorch", RecommendationRecord::new(
            Severity::Medium,
            DETECTED,
            "Leaf Scorch is a fungal disease affecting strawberry leaves.",
            &[
                "Remove infected leaves",
                "Apply fungicide",
                "Improve air circulation",
                "Reduce leaf wetness",
            ],
            &[
                "Plant resistant varieties",
                "Avoid overhead watering",
                "Maintain proper spacing",
                "Remove old leaves after harvest",
            ],
        ));
        table.insert("Tomato Early Blight", RecommendationRecord::new(
            Severity::Medium,
            DETECTED,
            "Early Blight is a common fungal disease of tomatoes.",
            &[
                "Remove infected lower leaves",
                "Apply fungicide (chlorothalonil or copper)",
                "Mulch around plants",
                "Stake plants for better air flow",
            ],
            &[
                "Rotate crops (3-4 years)",
                "Avoid overhead watering",
                "Mulch to prevent soil splash",
                "Remove plant debris at end of season",
            ],
        ));
        table
    };
}

fn generic(label: &str) -> RecommendationRecord {
    RecommendationRecord::new(
        Severity::Medium,
        DETECTED,
        format!("Disease detected: {}", label),
        &[
            "Isolate affected plants",
            "Remove infected leaves",
            "Apply appropriate treatment",
            "Consult agricultural expert for severe cases",
            "Monitor other plants for symptoms",
        ],
        &[
            "Regular plant inspection",
            "Proper watering practices",
            "Good air circulation",
            "Crop rotation",
        ],
    )
}

/// Returns treatment guidance for any label.
///
/// Labels containing "healthy" (any case) always map to the no-treatment
/// record. Labels missing from the table get a generic record.
pub fn recommendations_for(label: &str) -> RecommendationRecord {
    if label.to_lowercase().contains("healthy") {
        return HEALTHY.clone();
    }
    match TABLE.get(label) {
        Some(record) => record.clone(),
        None => {
            log::debug!("No specific recommendations for '{}', using generic record", label);
            generic(label)
        }
    }
}

pub fn recommendations_for_class(class: DiseaseClass) -> RecommendationRecord {
    recommendations_for(class.label())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_disease_class_has_specific_guidance() {
        for class in DiseaseClass::ALL {
            let record = recommendations_for_class(class);
            assert!(!record.message.starts_with("Disease detected:"), "{} fell back", class);
            assert_eq!(record.actions.len(), 4);
            assert_eq!(record.prevention.len(), 4);
        }
    }

    #[test]
    fn test_healthy_match_is_case_insensitive() {
        let record = recommendations_for("PEPPER HEALTHY leaf");
        assert_eq!(record.status, "Healthy");
        assert_eq!(record.severity, Severity::Low);
    }

    #[test]
    fn test_severity_serializes_lowercase() {
        let json = serde_json::to_string(&recommendations_for("Grape Black Rot")).unwrap();
        assert!(json.contains("\"severity\":\"high\""));
    }
}
