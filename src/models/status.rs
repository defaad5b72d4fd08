use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "camelCase")]
pub enum FallStatus {
    #[default]
    Normal,
    FallDetected,
    OccludedFallDetected,
    RecoveredFromFall,
    RecoveredFromOccludedFall,
}

impl FallStatus {
    /// Operator-facing status text.
    pub fn label(&self) -> &'static str {
        match self {
            FallStatus::Normal => "EVERYTHING OK",
            FallStatus::FallDetected => "!FALL DETECTED - ALERT SEND!",
            FallStatus::OccludedFallDetected => "!OCCLUDED FALL DETECTED!",
            FallStatus::RecoveredFromFall => "RECOVERED FROM FALL",
            FallStatus::RecoveredFromOccludedFall => "RECOVERED FROM OCCLUDED FALL",
        }
    }

    pub fn is_alarm(&self) -> bool {
        matches!(
            self,
            FallStatus::FallDetected | FallStatus::OccludedFallDetected
        )
    }
}

impl fmt::Display for FallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum RecordingMode {
    #[default]
    Rolling,
    Capturing,
}

impl RecordingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordingMode::Rolling => "rolling",
            RecordingMode::Capturing => "capturing",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_match_operator_text() {
        assert_eq!(FallStatus::Normal.to_string(), "EVERYTHING OK");
        assert_eq!(
            FallStatus::FallDetected.to_string(),
            "!FALL DETECTED - ALERT SEND!"
        );
        assert!(FallStatus::OccludedFallDetected.is_alarm());
        assert!(!FallStatus::RecoveredFromFall.is_alarm());
    }

    #[test]
    fn defaults_are_normal_and_rolling() {
        assert_eq!(FallStatus::default(), FallStatus::Normal);
        assert_eq!(RecordingMode::default(), RecordingMode::Rolling);
    }
}
