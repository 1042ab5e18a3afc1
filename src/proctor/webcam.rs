use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::{Camera, Detection, FrameDetector};
use crate::session::SessionEvent;

/// What one poll means for the session, after comparing with the previous poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WebcamFindings {
    /// Face was present on the previous poll and is gone now.
    pub face_lost: bool,
    pub multiple_faces: bool,
    pub phone_detected: bool,
}

/// Remembers face presence between polls so absence is reported once per transition.
#[derive(Debug, Clone)]
pub struct FaceTracker {
    face_present: bool,
}

impl Default for FaceTracker {
    fn default() -> Self {
        Self { face_present: true }
    }
}

impl FaceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn face_present(&self) -> bool {
        self.face_present
    }

    pub fn observe(&mut self, detection: Detection) -> WebcamFindings {
        let face_lost = self.face_present && !detection.face_detected;
        self.face_present = detection.face_detected;

        WebcamFindings {
            face_lost,
            multiple_faces: detection.multiple_faces,
            phone_detected: detection.phone_detected,
        }
    }
}

/// Polls the camera every `period` and forwards each detection to the session queue.
pub fn spawn_poller(
    camera: Arc<dyn Camera>,
    detector: Arc<dyn FrameDetector>,
    period: Duration,
    events: mpsc::Sender<SessionEvent>,
) -> JoinHandle<()> {
    info!("🎥 Webcam monitor started ({}ms)", period.as_millis());

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            let frame = match camera.capture_frame().await {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    debug!("No camera frame ready, skipping poll");
                    continue;
                }
                Err(e) => {
                    warn!("🎥 Webcam monitor stopping: {}", e);
                    let _ = events.send(SessionEvent::CameraRevoked).await;
                    break;
                }
            };

            match detector.detect(&frame).await {
                Ok(detection) => {
                    if events.send(SessionEvent::Detection(detection)).await.is_err() {
                        debug!("Session queue closed, webcam monitor exiting");
                        break;
                    }
                }
                Err(e) => error!("Frame detection failed: {}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seen(face: bool) -> Detection {
        Detection {
            face_detected: face,
            ..Detection::default()
        }
    }

    #[test]
    fn test_absence_reported_once_per_transition() {
        let mut tracker = FaceTracker::new();
        let polls = [true, false, false, false, true, false, true, true];
        let lost: Vec<bool> = polls
            .iter()
            .map(|&face| tracker.observe(seen(face)).face_lost)
            .collect();

        assert_eq!(lost, vec![false, true, false, false, false, true, false, false]);
        assert!(tracker.face_present());
    }

    #[test]
    fn test_absent_from_first_poll_counts() {
        let mut tracker = FaceTracker::new();
        assert!(tracker.observe(seen(false)).face_lost);
        assert!(!tracker.observe(seen(false)).face_lost);
    }

    #[test]
    fn test_phone_and_crowd_reported_every_poll() {
        let mut tracker = FaceTracker::new();
        let detection = Detection {
            face_detected: true,
            multiple_faces: true,
            phone_detected: true,
        };
        for _ in 0..3 {
            let findings = tracker.observe(detection);
            assert!(findings.multiple_faces);
            assert!(findings.phone_detected);
            assert!(!findings.face_lost);
        }
        assert_eq!(tracker.observe(seen(true)), WebcamFindings::default());
    }
}
