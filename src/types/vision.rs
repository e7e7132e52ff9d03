//! Vision analysis domain entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::generation::GenerationResult;
use super::image::ImageMetadata;

/// Course difficulty level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    /// Lenient parse used for model output ("Intermediate", "expert", ...).
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "intermediate" | "medium" => Self::Intermediate,
            "advanced" | "expert" | "hard" => Self::Advanced,
            _ => Self::Beginner,
        }
    }
}

/// Structured course outline suggested from a screenshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CourseOutline {
    pub title: String,
    pub description: String,
    /// Ordered topic list
    pub topics: Vec<String>,
    #[serde(default)]
    pub learning_objectives: Vec<String>,
    pub difficulty: Difficulty,
    pub estimated_duration_minutes: u32,
}

/// An element detected in the image (code block, diagram, table, heading, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualElement {
    pub element_type: String,
    pub content: String,
    pub confidence: f64,
}

/// Result of one successful image analysis.
///
/// Built once per adapter call and never mutated afterwards; the batch
/// combiner produces merged copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisionAnalysis {
    #[serde(flatten)]
    pub generation: GenerationResult,
    pub extracted_text: String,
    pub language: String,
    /// Always within [0.0, 1.0]
    pub confidence: f64,
    pub course_outline: Option<CourseOutline>,
    #[serde(default)]
    pub visual_elements: Vec<VisualElement>,
    /// Vendor response body kept for audit
    pub raw_response: serde_json::Value,
    /// Metadata of the analyzed image; None for merged results
    pub image: Option<ImageMetadata>,
    /// Wall time spent on the analysis in milliseconds
    pub processing_time_ms: u64,
    pub created_at: DateTime<Utc>,
}

impl VisionAnalysis {
    pub fn topics(&self) -> &[String] {
        self.course_outline
            .as_ref()
            .map(|o| o.topics.as_slice())
            .unwrap_or_default()
    }

    pub fn with_image_metadata(mut self, metadata: ImageMetadata) -> Self {
        self.image = Some(metadata);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_parse_is_lenient() {
        assert_eq!(Difficulty::parse_lenient("Advanced"), Difficulty::Advanced);
        assert_eq!(Difficulty::parse_lenient(" medium "), Difficulty::Intermediate);
        assert_eq!(Difficulty::parse_lenient("??"), Difficulty::Beginner);
    }
}
