//! Derived body signals from one frame's keypoints.
//!
//! Torso height (shoulder-center to hip-center) stands in for subject scale.
//! A log model calibrated on a reference subject turns it into a camera
//! distance, which in turn lifts the alert line for distant subjects whose
//! apparent fall height shrinks with perspective.

use thiserror::Error;

use crate::models::{KeypointFrame, Point};

use super::config::DetectionConfig;

#[derive(Debug, Clone, Copy, Error, PartialEq)]
pub enum SignalError {
    #[error("one or more required keypoints are missing")]
    MissingKeypoints,
    #[error("torso height {torso_height:.2}px is not positive")]
    InvalidGeometry { torso_height: f64 },
}

/// Positions needed by every stage, available whenever all keypoints are.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyAnchors {
    pub nose: Point,
    pub shoulder_center: Point,
    pub hip_center: Point,
}

impl BodyAnchors {
    pub fn torso_height(&self) -> f64 {
        self.hip_center.y - self.shoulder_center.y
    }

    pub fn hip_center_x(&self) -> f64 {
        (self.shoulder_center.x + self.hip_center.x) / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceEstimate {
    pub camera_distance: f64,
    pub alert_threshold_y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedSignals {
    pub nose_y: f64,
    pub torso_height: f64,
    pub camera_distance: f64,
    pub alert_threshold_y: f64,
    pub hip_center_x: f64,
}

pub fn body_anchors(frame: &KeypointFrame) -> Result<BodyAnchors, SignalError> {
    let (Some(nose), Some(ls), Some(rs), Some(lh), Some(rh)) = (
        frame.nose,
        frame.left_shoulder,
        frame.right_shoulder,
        frame.left_hip,
        frame.right_hip,
    ) else {
        return Err(SignalError::MissingKeypoints);
    };

    Ok(BodyAnchors {
        nose,
        shoulder_center: ls.midpoint(rs),
        hip_center: lh.midpoint(rh),
    })
}

pub fn adaptive_threshold(
    torso_height: f64,
    config: &DetectionConfig,
) -> Result<DistanceEstimate, SignalError> {
    if torso_height.is_nan() || torso_height <= 0.0 {
        return Err(SignalError::InvalidGeometry { torso_height });
    }

    let camera_distance =
        (config.reference_torso_px.ln() - torso_height.ln()) / config.distance_slope;
    let alert_threshold_y =
        config.base_threshold_y - (config.threshold_gain * camera_distance - config.threshold_gain);

    Ok(DistanceEstimate {
        camera_distance,
        alert_threshold_y,
    })
}

/// All signals for a frame; fails on either missing keypoints or bad geometry.
pub fn extract(
    frame: &KeypointFrame,
    config: &DetectionConfig,
) -> Result<DerivedSignals, SignalError> {
    let anchors = body_anchors(frame)?;
    let torso_height = anchors.torso_height();
    let estimate = adaptive_threshold(torso_height, config)?;

    Ok(DerivedSignals {
        nose_y: anchors.nose.y,
        torso_height,
        camera_distance: estimate.camera_distance,
        alert_threshold_y: estimate.alert_threshold_y,
        hip_center_x: anchors.hip_center_x(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upright(torso_top: f64, torso_bottom: f64) -> KeypointFrame {
        KeypointFrame {
            timestamp: 0.0,
            nose: Some(Point::new(960.0, torso_top - 120.0)),
            left_shoulder: Some(Point::new(900.0, torso_top)),
            right_shoulder: Some(Point::new(1020.0, torso_top)),
            left_hip: Some(Point::new(920.0, torso_bottom)),
            right_hip: Some(Point::new(1000.0, torso_bottom)),
        }
    }

    #[test]
    fn reference_torso_is_unit_distance() {
        let config = DetectionConfig::default();
        let estimate = adaptive_threshold(968.0, &config).unwrap();
        assert!(estimate.camera_distance.abs() < 1e-9);
        // 800 - (20 * 0 - 20)
        assert!((estimate.alert_threshold_y - 820.0).abs() < 1e-9);
    }

    #[test]
    fn nearer_subject_lowers_the_alert_line() {
        let config = DetectionConfig::default();
        let mut last: Option<DistanceEstimate> = None;
        for torso in [50.0, 120.0, 300.0, 600.0, 968.0, 1200.0] {
            let estimate = adaptive_threshold(torso, &config).unwrap();
            if let Some(prev) = last {
                assert!(estimate.camera_distance < prev.camera_distance);
                assert!(estimate.alert_threshold_y > prev.alert_threshold_y);
            }
            last = Some(estimate);
        }
    }

    #[test]
    fn non_positive_torso_is_invalid_geometry() {
        let config = DetectionConfig::default();
        assert_eq!(
            adaptive_threshold(0.0, &config),
            Err(SignalError::InvalidGeometry { torso_height: 0.0 })
        );
        assert!(matches!(
            adaptive_threshold(-15.0, &config),
            Err(SignalError::InvalidGeometry { .. })
        ));
        assert!(adaptive_threshold(f64::NAN, &config).is_err());
    }

    #[test]
    fn extract_computes_centers() {
        let config = DetectionConfig::default();
        let signals = extract(&upright(400.0, 700.0), &config).unwrap();

        assert_eq!(signals.nose_y, 280.0);
        assert_eq!(signals.torso_height, 300.0);
        // shoulder center x 960, hip center x 960
        assert_eq!(signals.hip_center_x, 960.0);
        assert!(signals.camera_distance > 0.0);
    }

    #[test]
    fn missing_point_is_reported() {
        let config = DetectionConfig::default();
        let mut frame = upright(400.0, 700.0);
        frame.right_hip = None;

        assert_eq!(extract(&frame, &config), Err(SignalError::MissingKeypoints));
        assert_eq!(body_anchors(&frame), Err(SignalError::MissingKeypoints));
    }

    #[test]
    fn inverted_torso_still_yields_anchors() {
        let config = DetectionConfig::default();
        let frame = upright(700.0, 400.0);

        let anchors = body_anchors(&frame).unwrap();
        assert_eq!(anchors.torso_height(), -300.0);
        assert!(matches!(
            extract(&frame, &config),
            Err(SignalError::InvalidGeometry { .. })
        ));
    }
}
