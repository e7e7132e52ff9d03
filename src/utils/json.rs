//! Helpers for model output that should contain JSON

use lazy_static::lazy_static;
use regex::Regex;
use serde::de::DeserializeOwned;

lazy_static! {
    static ref FENCED_BLOCK: Regex =
        Regex::new(r"(?s)^```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)\r?\n?[ \t]*```$").expect("valid regex");
}

/// Strip a Markdown code fence (```json ... ```) wrapping the whole output.
///
/// Text without a fence, or with fenced blocks embedded in prose, is
/// returned trimmed.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    match FENCED_BLOCK.captures(trimmed).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => trimmed,
    }
}

/// Parse model output as `T`, tolerating code fences and prose around a
/// single JSON object. Returns None when no interpretation parses.
pub fn parse_json_lenient<T: DeserializeOwned>(text: &str) -> Option<T> {
    let candidate = strip_code_fences(text);
    if let Ok(value) = serde_json::from_str::<T>(candidate) {
        return Some(value);
    }
    let start = candidate.find('{')?;
    let end = candidate.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<T>(&candidate[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn strips_json_fence() {
        let text = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(text), "{\"a\": 1}");
    }

    #[test]
    fn strips_bare_fence_and_whitespace() {
        let text = "  ```\n{\"a\": 1}\n```  ";
        assert_eq!(strip_code_fences(text), "{\"a\": 1}");
    }

    #[test]
    fn leaves_unfenced_text_alone() {
        assert_eq!(strip_code_fences("  {\"a\": 1} "), "{\"a\": 1}");
        assert_eq!(strip_code_fences("plain words"), "plain words");
    }

    #[test]
    fn embedded_fence_is_not_stripped() {
        let text = "Intro.\n```rust\nfn main() {}\n```\nOutro.";
        assert_eq!(strip_code_fences(text), text);
    }

    #[test]
    fn lenient_parse_finds_fenced_object_inside_prose() {
        let text = "Result:\n```json\n{\"a\": 2}\n```\nDone.";
        let v: Value = parse_json_lenient(text).unwrap();
        assert_eq!(v["a"], 2);
    }

    #[test]
    fn lenient_parse_handles_prose_around_object() {
        let text = "Here is the result:\n{\"a\": 1}\nHope this helps.";
        let v: Value = parse_json_lenient(text).unwrap();
        assert_eq!(v["a"], 1);

        assert!(parse_json_lenient::<Value>("no json here").is_none());
    }
}
