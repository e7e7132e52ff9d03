//! Screenshot lifecycle
//!
//! `Pending -> Validating -> (Analyzing | Cached) -> Analyzed | Failed`

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LlmError;
use crate::providers::ProviderKind;
use crate::types::{ImageInput, ImageMetadata, VisionAnalysis};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenshotState {
    Pending,
    Validating,
    Analyzing,
    Cached,
    Analyzed,
    Failed,
}

impl ScreenshotState {
    pub const fn can_transition_to(&self, next: ScreenshotState) -> bool {
        use ScreenshotState::*;
        matches!(
            (self, next),
            (Pending, Validating)
                | (Validating, Analyzing)
                | (Validating, Cached)
                | (Validating, Failed)
                | (Analyzing, Analyzed)
                | (Analyzing, Failed)
                | (Cached, Analyzed)
                | (Cached, Failed)
        )
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Analyzed | Self::Failed)
    }
}

impl std::fmt::Display for ScreenshotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Validating => "validating",
            Self::Analyzing => "analyzing",
            Self::Cached => "cached",
            Self::Analyzed => "analyzed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One uploaded screenshot and everything learned while processing it
#[derive(Debug, Clone)]
pub struct Screenshot {
    pub id: Uuid,
    pub tenant_id: String,
    pub image: ImageInput,
    state: ScreenshotState,
    /// Every state entered, in order, starting with `Pending`
    history: Vec<ScreenshotState>,
    pub metadata: Option<ImageMetadata>,
    pub analysis: Option<Arc<VisionAnalysis>>,
    /// Providers invoked, in order
    pub attempted_providers: Vec<ProviderKind>,
    pub last_error: Option<LlmError>,
    pub from_cache: bool,
    /// Free-form caller labels (file name, user id, ...)
    pub labels: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Screenshot {
    pub fn new(tenant_id: impl Into<String>, image: impl Into<ImageInput>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.into(),
            image: image.into(),
            state: ScreenshotState::Pending,
            history: vec![ScreenshotState::Pending],
            metadata: None,
            analysis: None,
            attempted_providers: Vec::new(),
            last_error: None,
            from_cache: false,
            labels: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn state(&self) -> ScreenshotState {
        self.state
    }

    pub fn history(&self) -> &[ScreenshotState] {
        &self.history
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub(crate) fn transition(&mut self, next: ScreenshotState) -> Result<(), LlmError> {
        if !self.state.can_transition_to(next) {
            return Err(LlmError::InternalError(format!(
                "invalid screenshot transition {} -> {next}",
                self.state
            )));
        }
        self.state = next;
        self.history.push(next);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Move to `Failed`, keeping the error. Safe from any non-terminal state.
    pub(crate) fn fail(&mut self, error: LlmError) {
        if !self.state.is_terminal() {
            self.state = ScreenshotState::Failed;
            self.history.push(ScreenshotState::Failed);
            self.updated_at = Utc::now();
        }
        self.last_error = Some(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_records_history() {
        let mut shot = Screenshot::new("t", vec![1u8, 2, 3]);
        shot.transition(ScreenshotState::Validating).unwrap();
        shot.transition(ScreenshotState::Cached).unwrap();
        shot.transition(ScreenshotState::Analyzed).unwrap();
        assert!(shot.is_terminal());
        assert_eq!(
            shot.history(),
            [
                ScreenshotState::Pending,
                ScreenshotState::Validating,
                ScreenshotState::Cached,
                ScreenshotState::Analyzed
            ]
        );
    }

    #[test]
    fn invalid_transitions_are_rejected() {
        let mut shot = Screenshot::new("t", vec![1u8]);
        assert!(matches!(
            shot.transition(ScreenshotState::Analyzed),
            Err(LlmError::InternalError(_))
        ));
        assert_eq!(shot.state(), ScreenshotState::Pending);
        assert!(!ScreenshotState::Failed.can_transition_to(ScreenshotState::Analyzing));
    }

    #[test]
    fn fail_keeps_error_and_is_terminal() {
        let mut shot = Screenshot::new("t", vec![1u8]);
        shot.transition(ScreenshotState::Validating).unwrap();
        shot.fail(LlmError::UnsupportedFormat {
            mime: "unknown".into(),
        });
        assert_eq!(shot.state(), ScreenshotState::Failed);
        assert!(shot.last_error.is_some());
        shot.fail(LlmError::InternalError("again".into()));
        assert_eq!(shot.history().len(), 3);
    }
}
