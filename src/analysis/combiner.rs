//! Batch combiner
//!
//! Folds independently analyzed screenshots into one merged analysis. Inputs
//! are never mutated; the merged result is a new value.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use serde_json::{Value, json};

use crate::types::{CourseOutline, FinishReason, GenerationResult, Usage, VisionAnalysis};

/// Separator placed between the extracted texts of merged analyses
pub const TEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Caller overrides for the merged course outline
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombineOptions {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl CombineOptions {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Union of string lists, first-seen order, exact duplicates removed
pub fn union_preserving_order<'a, I>(lists: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a [String]>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for list in lists {
        for item in list {
            if seen.insert(item.as_str()) {
                out.push(item.clone());
            }
        }
    }
    out
}

fn join_texts<'a>(texts: impl Iterator<Item = &'a str>) -> String {
    texts
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(TEXT_SEPARATOR)
}

fn merge_outline(analyses: &[VisionAnalysis], options: &CombineOptions) -> Option<CourseOutline> {
    let outlines: Vec<&CourseOutline> = analyses
        .iter()
        .filter_map(|a| a.course_outline.as_ref())
        .collect();
    if outlines.is_empty() && options.title.is_none() && options.description.is_none() {
        return None;
    }
    let first = outlines.first();
    Some(CourseOutline {
        title: options
            .title
            .clone()
            .or_else(|| first.map(|o| o.title.clone()))
            .unwrap_or_default(),
        description: options
            .description
            .clone()
            .or_else(|| first.map(|o| o.description.clone()))
            .unwrap_or_default(),
        topics: union_preserving_order(outlines.iter().map(|o| o.topics.as_slice())),
        learning_objectives: union_preserving_order(
            outlines.iter().map(|o| o.learning_objectives.as_slice()),
        ),
        difficulty: first.map(|o| o.difficulty).unwrap_or_default(),
        estimated_duration_minutes: outlines
            .iter()
            .fold(0u32, |acc, o| acc.saturating_add(o.estimated_duration_minutes)),
    })
}

fn merge_generation(analyses: &[VisionAnalysis], first: &VisionAnalysis) -> GenerationResult {
    let mut usage = Usage::default();
    let mut latency_ms = 0u64;
    let mut models: Vec<String> = Vec::new();
    let mut providers: Vec<String> = Vec::new();
    for analysis in analyses {
        usage.merge(&analysis.generation.usage);
        latency_ms = latency_ms.saturating_add(analysis.generation.latency_ms);
        if !models.contains(&analysis.generation.model) {
            models.push(analysis.generation.model.clone());
        }
        let provider = analysis.generation.provider.to_string();
        if !providers.contains(&provider) {
            providers.push(provider);
        }
    }
    let finish_reason = analyses
        .iter()
        .map(|a| a.generation.finish_reason)
        .find(|r| *r != FinishReason::Stop)
        .unwrap_or(FinishReason::Stop);

    let mut provider_metadata = HashMap::new();
    provider_metadata.insert("merged_count".to_string(), json!(analyses.len()));
    provider_metadata.insert("providers".to_string(), json!(providers));

    GenerationResult {
        text: join_texts(analyses.iter().map(|a| a.generation.text.as_str())),
        model: models.join(","),
        provider: first.generation.provider,
        usage,
        finish_reason,
        latency_ms,
        provider_metadata,
    }
}

/// Fold analyses into one.
///
/// Zero inputs yield None; a single input is returned unchanged.
pub fn combine(analyses: &[VisionAnalysis], options: &CombineOptions) -> Option<VisionAnalysis> {
    let (first, rest) = analyses.split_first()?;
    if rest.is_empty() {
        return Some(first.clone());
    }

    let count = analyses.len() as f64;
    let confidence = analyses.iter().map(|a| a.confidence).sum::<f64>() / count;

    Some(VisionAnalysis {
        generation: merge_generation(analyses, first),
        extracted_text: join_texts(analyses.iter().map(|a| a.extracted_text.as_str())),
        language: first.language.clone(),
        confidence: confidence.clamp(0.0, 1.0),
        course_outline: merge_outline(analyses, options),
        visual_elements: analyses
            .iter()
            .flat_map(|a| a.visual_elements.iter().cloned())
            .collect(),
        raw_response: Value::Array(analyses.iter().map(|a| a.raw_response.clone()).collect()),
        image: None,
        processing_time_ms: analyses
            .iter()
            .fold(0u64, |acc, a| acc.saturating_add(a.processing_time_ms)),
        created_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderKind;
    use crate::types::{Difficulty, VisualElement};
    use proptest::prelude::*;

    fn analysis(text: &str, confidence: f64, topics: &[&str], minutes: u32) -> VisionAnalysis {
        VisionAnalysis {
            generation: GenerationResult {
                text: text.to_string(),
                model: "gpt-4o".into(),
                provider: ProviderKind::OpenAi,
                usage: Usage::new(100, 20),
                finish_reason: FinishReason::Stop,
                latency_ms: 10,
                provider_metadata: HashMap::new(),
            },
            extracted_text: text.to_string(),
            language: "en".into(),
            confidence,
            course_outline: Some(CourseOutline {
                title: format!("{text} title"),
                description: format!("{text} description"),
                topics: topics.iter().map(|t| t.to_string()).collect(),
                learning_objectives: vec![format!("learn {text}")],
                difficulty: Difficulty::Beginner,
                estimated_duration_minutes: minutes,
            }),
            visual_elements: vec![VisualElement {
                element_type: "text".into(),
                content: text.to_string(),
                confidence,
            }],
            raw_response: json!({"text": text}),
            image: None,
            processing_time_ms: 100,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn empty_batch_has_no_result() {
        assert!(combine(&[], &CombineOptions::default()).is_none());
    }

    #[test]
    fn single_analysis_is_unchanged() {
        let only = analysis("a", 0.7, &["x"], 5);
        let merged = combine(std::slice::from_ref(&only), &CombineOptions::default()).unwrap();
        assert_eq!(merged, only);
    }

    #[test]
    fn three_way_merge_averages_and_sums() {
        let batch = [
            analysis("one", 0.95, &["rust", "ownership"], 10),
            analysis("two", 0.85, &["ownership", "borrowing"], 15),
            analysis("three", 0.90, &["lifetimes"], 20),
        ];
        let merged = combine(&batch, &CombineOptions::default()).unwrap();
        assert!((merged.confidence - 0.90).abs() < 1e-9);
        assert_eq!(merged.generation.usage, Usage::new(300, 60));
        assert_eq!(merged.processing_time_ms, 300);
        assert_eq!(merged.extracted_text, "one\n\n---\n\ntwo\n\n---\n\nthree");
        let outline = merged.course_outline.unwrap();
        assert_eq!(outline.topics, vec!["rust", "ownership", "borrowing", "lifetimes"]);
        assert_eq!(outline.estimated_duration_minutes, 45);
        assert_eq!(outline.title, "one title");
        assert_eq!(outline.learning_objectives.len(), 3);
        assert_eq!(merged.visual_elements.len(), 3);
        assert_eq!(merged.raw_response.as_array().unwrap().len(), 3);
        assert!(merged.image.is_none());
    }

    #[test]
    fn overrides_replace_title_and_description() {
        let batch = [analysis("a", 0.5, &[], 1), analysis("b", 0.5, &[], 1)];
        let options = CombineOptions::default()
            .with_title("Course")
            .with_description("All slides");
        let outline = combine(&batch, &options).unwrap().course_outline.unwrap();
        assert_eq!(outline.title, "Course");
        assert_eq!(outline.description, "All slides");
    }

    #[test]
    fn topic_union_is_associative() {
        let a = analysis("a", 0.9, &["x", "y"], 1);
        let b = analysis("b", 0.8, &["y", "z"], 1);
        let c = analysis("c", 0.7, &["w", "x"], 1);
        let options = CombineOptions::default();

        let ab = combine(&[a.clone(), b.clone()], &options).unwrap();
        let ab_c = combine(&[ab, c.clone()], &options).unwrap();
        let abc = combine(&[a, b, c], &options).unwrap();
        assert_eq!(ab_c.topics(), abc.topics());
        assert_eq!(abc.topics(), ["x", "y", "z", "w"]);
    }

    fn topic_list() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[a-f]{1,2}", 0..6)
    }

    fn with_topics(text: &str, topics: &[String], minutes: u32) -> VisionAnalysis {
        let refs: Vec<&str> = topics.iter().map(String::as_str).collect();
        analysis(text, 0.5, &refs, minutes)
    }

    proptest! {
        #[test]
        fn prop_topic_union_is_associative(
            a in topic_list(),
            b in topic_list(),
            c in topic_list(),
            minutes in prop::array::uniform3(0u32..600),
        ) {
            let (a, b, c) = (
                with_topics("a", &a, minutes[0]),
                with_topics("b", &b, minutes[1]),
                with_topics("c", &c, minutes[2]),
            );
            let options = CombineOptions::default();

            let flat = combine(&[a.clone(), b.clone(), c.clone()], &options).unwrap();
            let left = combine(&[combine(&[a.clone(), b.clone()], &options).unwrap(), c.clone()], &options).unwrap();
            let right = combine(&[a, combine(&[b, c], &options).unwrap()], &options).unwrap();

            prop_assert_eq!(left.topics(), flat.topics());
            prop_assert_eq!(right.topics(), flat.topics());
            prop_assert_eq!(left.generation.usage, flat.generation.usage);
            let minutes_of = |v: &VisionAnalysis| v.course_outline.as_ref().map(|o| o.estimated_duration_minutes);
            prop_assert_eq!(minutes_of(&left), minutes_of(&flat));
            prop_assert_eq!(minutes_of(&right), Some(minutes.iter().sum::<u32>()));
        }

        #[test]
        fn prop_topic_union_has_no_duplicates(lists in prop::collection::vec(topic_list(), 0..5)) {
            let union = union_preserving_order(lists.iter().map(Vec::as_slice));
            let unique: HashSet<&String> = union.iter().collect();
            prop_assert_eq!(unique.len(), union.len());
            for topic in lists.iter().flatten() {
                prop_assert!(union.contains(topic));
            }
        }
    }
}
