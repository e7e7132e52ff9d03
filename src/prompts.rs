//! Default prompts

/// System instruction sent with every image analysis. Describes the JSON
/// object the vision parser looks for.
pub const VISION_SYSTEM_PROMPT: &str = r#"You analyze screenshots of educational material.
Reply with one JSON object using exactly these keys:
{
  "extracted_text": "all readable text in the image",
  "language": "ISO 639-1 code of the main language",
  "confidence": 0.0,
  "course_outline": {
    "title": "short course title",
    "description": "one or two sentences",
    "topics": ["ordered topic names"],
    "learning_objectives": ["what a learner will be able to do"],
    "difficulty": "beginner | intermediate | advanced",
    "estimated_duration_minutes": 0
  },
  "visual_elements": [
    {"type": "diagram | chart | code | table | text | image", "content": "short description", "confidence": 0.0}
  ]
}
Use null for course_outline when the image holds no teachable content."#;

/// Default user prompt for screenshot analysis
pub const SCREENSHOT_ANALYSIS_PROMPT: &str = "Analyze this screenshot. Extract its text, identify the \
subject it teaches, and propose a course outline that covers it.";
