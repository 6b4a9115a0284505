//! Hot dog verdicts from image classifier output.
//!
//! The classifier runs in the browser and reports its top labels. A photo
//! counts as a hot dog when any reported label mentions one.

use serde::{Deserialize, Serialize};

/// Label fragments that mean "hot dog". Matched case-insensitively.
pub const HOT_DOG_TERMS: [&str; 4] = ["hot dog", "hotdog", "frankfurter", "wiener"];

/// One ranked label from the image classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub class_name: String,
    #[serde(default)]
    pub probability: f32,
}

impl Prediction {
    pub fn new(class_name: impl Into<String>, probability: f32) -> Self {
        Self {
            class_name: class_name.into(),
            probability,
        }
    }
}

/// Whether a single classifier label names a hot dog.
pub fn is_hot_dog_label(label: &str) -> bool {
    let label = label.to_lowercase();
    HOT_DOG_TERMS.iter().any(|term| label.contains(term))
}

/// Whether any prediction names a hot dog.
///
/// Confidence is ignored; an empty list is not a hot dog.
pub fn is_hot_dog(predictions: &[Prediction]) -> bool {
    predictions.iter().any(|p| is_hot_dog_label(&p.class_name))
}

/// Headline shown for a verdict.
pub fn verdict_text(is_hot_dog: bool) -> &'static str {
    if is_hot_dog {
        "HOT DOG!"
    } else {
        "NOT HOT DOG!"
    }
}
