//! Vision output parsing
//!
//! Model output is expected to be the JSON object described by the vision
//! system prompt. Anything that does not parse is kept as extracted text so
//! the call still succeeds.

use chrono::Utc;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use crate::types::{CourseOutline, Difficulty, GenerationResult, VisionAnalysis, VisualElement};
use crate::utils::{parse_json_lenient, strip_code_fences};

pub const FALLBACK_CONFIDENCE: f64 = 0.5;
pub const FALLBACK_LANGUAGE: &str = "en";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawVisionOutput {
    #[serde(alias = "text")]
    extracted_text: Option<String>,
    language: Option<String>,
    confidence: Option<Value>,
    #[serde(alias = "outline")]
    course_outline: Option<RawOutline>,
    #[serde(deserialize_with = "null_as_empty")]
    visual_elements: Vec<RawVisualElement>,
}

impl RawVisionOutput {
    fn is_empty(&self) -> bool {
        self.extracted_text.is_none()
            && self.course_outline.is_none()
            && self.visual_elements.is_empty()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawOutline {
    title: Option<String>,
    description: Option<String>,
    #[serde(deserialize_with = "null_as_empty")]
    topics: Vec<Value>,
    #[serde(alias = "objectives", deserialize_with = "null_as_empty")]
    learning_objectives: Vec<Value>,
    difficulty: Option<String>,
    #[serde(alias = "duration_minutes", alias = "estimated_duration")]
    estimated_duration_minutes: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawVisualElement {
    #[serde(rename = "type", alias = "element_type")]
    element_type: Option<String>,
    #[serde(alias = "description")]
    content: Option<String>,
    confidence: Option<Value>,
}

/// Number from a JSON number or numeric string
fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
        _ => None,
    };
    n.filter(|n: &f64| n.is_finite())
}

/// `null` lists are read as empty
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Confidence in [0.0, 1.0]; percentages are scaled down
pub fn normalize_confidence(value: Option<&Value>) -> f64 {
    match value.and_then(number) {
        Some(n) if n > 1.0 && n <= 100.0 => n / 100.0,
        Some(n) => n.clamp(0.0, 1.0),
        None => FALLBACK_CONFIDENCE,
    }
}

/// Topic names given as strings or as `{"name": ..}` / `{"title": ..}` objects
fn names(values: &[Value]) -> Vec<String> {
    values
        .iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Object(o) => o
                .get("name")
                .or_else(|| o.get("title"))
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string()),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .collect()
}

fn outline(raw: RawOutline) -> CourseOutline {
    CourseOutline {
        title: raw.title.unwrap_or_default().trim().to_string(),
        description: raw.description.unwrap_or_default().trim().to_string(),
        topics: names(&raw.topics),
        learning_objectives: names(&raw.learning_objectives),
        difficulty: raw
            .difficulty
            .as_deref()
            .map(Difficulty::parse_lenient)
            .unwrap_or_default(),
        estimated_duration_minutes: raw
            .estimated_duration_minutes
            .as_ref()
            .and_then(number)
            .map(|n| n.clamp(0.0, u32::MAX as f64).round() as u32)
            .unwrap_or(0),
    }
}

/// Build a `VisionAnalysis` from a generation result and the vendor body.
///
/// Never fails: unparseable output becomes `extracted_text` with fallback
/// language and confidence.
pub fn parse_vision_analysis(generation: GenerationResult, raw_response: Value) -> VisionAnalysis {
    let parsed = parse_json_lenient::<RawVisionOutput>(&generation.text).filter(|p| !p.is_empty());

    let (extracted_text, language, confidence, course_outline, visual_elements) = match parsed {
        Some(parsed) => {
            let language = parsed
                .language
                .map(|l| l.trim().to_ascii_lowercase())
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| FALLBACK_LANGUAGE.to_string());
            let elements = parsed
                .visual_elements
                .into_iter()
                .map(|e| VisualElement {
                    element_type: e.element_type.unwrap_or_else(|| "unknown".to_string()),
                    content: e.content.unwrap_or_default(),
                    confidence: normalize_confidence(e.confidence.as_ref()),
                })
                .collect();
            (
                parsed.extracted_text.unwrap_or_default(),
                language,
                normalize_confidence(parsed.confidence.as_ref()),
                parsed.course_outline.map(outline),
                elements,
            )
        }
        None => {
            debug!(
                provider = %generation.provider,
                "vision output is not structured JSON, keeping raw text"
            );
            (
                strip_code_fences(&generation.text).to_string(),
                FALLBACK_LANGUAGE.to_string(),
                FALLBACK_CONFIDENCE,
                None,
                Vec::new(),
            )
        }
    };

    let processing_time_ms = generation.latency_ms;
    VisionAnalysis {
        generation,
        extracted_text,
        language,
        confidence,
        course_outline,
        visual_elements,
        raw_response,
        image: None,
        processing_time_ms,
        created_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderKind;
    use crate::types::{FinishReason, Usage};
    use serde_json::json;
    use std::collections::HashMap;

    fn generation(text: &str) -> GenerationResult {
        GenerationResult {
            text: text.to_string(),
            model: "gpt-4o".into(),
            provider: ProviderKind::OpenAi,
            usage: Usage::new(100, 50),
            finish_reason: FinishReason::Stop,
            latency_ms: 42,
            provider_metadata: HashMap::new(),
        }
    }

    #[test]
    fn parses_fenced_structured_output() {
        let text = r#"```json
{
  "extracted_text": "def add(a, b): return a + b",
  "language": "EN",
  "confidence": 0.92,
  "course_outline": {
    "title": "Python Functions",
    "description": "Defining functions",
    "topics": ["functions", {"name": "arguments"}],
    "learning_objectives": ["write a function"],
    "difficulty": "Intermediate",
    "estimated_duration_minutes": "45"
  },
  "visual_elements": [{"type": "code", "content": "def add", "confidence": 95}]
}
```"#;
        let analysis = parse_vision_analysis(generation(text), json!({"id": 1}));
        assert_eq!(analysis.extracted_text, "def add(a, b): return a + b");
        assert_eq!(analysis.language, "en");
        assert!((analysis.confidence - 0.92).abs() < 1e-9);
        let outline = analysis.course_outline.as_ref().unwrap();
        assert_eq!(outline.topics, vec!["functions", "arguments"]);
        assert_eq!(outline.difficulty, Difficulty::Intermediate);
        assert_eq!(outline.estimated_duration_minutes, 45);
        assert_eq!(analysis.visual_elements[0].element_type, "code");
        assert!((analysis.visual_elements[0].confidence - 0.95).abs() < 1e-9);
        assert_eq!(analysis.processing_time_ms, 42);
        assert_eq!(analysis.raw_response, json!({"id": 1}));
    }

    #[test]
    fn plain_text_falls_back_to_extracted_text() {
        let analysis = parse_vision_analysis(generation("A slide about recursion."), json!({}));
        assert_eq!(analysis.extracted_text, "A slide about recursion.");
        assert_eq!(analysis.language, FALLBACK_LANGUAGE);
        assert_eq!(analysis.confidence, FALLBACK_CONFIDENCE);
        assert!(analysis.course_outline.is_none());
        assert_eq!(analysis.generation.usage.total_tokens(), 150);
    }

    #[test]
    fn prose_with_embedded_code_keeps_the_whole_text() {
        let text = "The slide explains loops.\n```python\nfor i in range(3):\n    print(i)\n```\nIt then covers while loops.";
        let analysis = parse_vision_analysis(generation(text), json!({}));
        assert_eq!(analysis.extracted_text, text);
        assert_eq!(analysis.confidence, FALLBACK_CONFIDENCE);
        assert!(analysis.course_outline.is_none());
    }

    #[test]
    fn fenced_plain_text_is_unwrapped() {
        let analysis = parse_vision_analysis(generation("```\nSlide 3: Traits\n```"), json!({}));
        assert_eq!(analysis.extracted_text, "Slide 3: Traits");
    }

    #[test]
    fn unrelated_json_is_treated_as_text() {
        let analysis = parse_vision_analysis(generation(r#"{"answer": 42}"#), json!({}));
        assert_eq!(analysis.extracted_text, r#"{"answer": 42}"#);
        assert_eq!(analysis.confidence, FALLBACK_CONFIDENCE);
    }

    #[test]
    fn confidence_is_clamped() {
        assert_eq!(normalize_confidence(Some(&json!(-0.3))), 0.0);
        assert_eq!(normalize_confidence(Some(&json!(250))), 1.0);
        assert_eq!(normalize_confidence(Some(&json!("80%"))), 0.8);
        assert_eq!(normalize_confidence(Some(&json!("high"))), FALLBACK_CONFIDENCE);
        assert_eq!(normalize_confidence(None), FALLBACK_CONFIDENCE);
    }
}
