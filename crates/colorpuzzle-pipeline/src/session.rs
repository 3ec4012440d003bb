//! Host-owned state for one child's attempt.
//!
//! The camera callback, the "save background" button and the identity
//! check all feed into a [`Session`] value held by the host. Each update
//! consumes the session and returns the next one, and the pure pipeline
//! receives the stored frames explicitly when [`Session::analyze`] runs.
//! Nothing in the core keeps state between calls.

use rand::Rng;

use crate::diagnostics::{Clock, NullClock, PipelineDiagnostics};
use crate::face::{FaceMatcher, IdentityStatus};
use crate::types::{GrayImage, PipelineConfig, PipelineError, RgbImage};
use crate::{Analysis, TargetSequence};

/// Everything the host tracks between camera frames.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    target: TargetSequence,
    background: Option<RgbImage>,
    snapshot: Option<RgbImage>,
    identity: IdentityStatus,
}

impl Session {
    /// Start a session for `target` with no frames captured.
    #[must_use]
    pub const fn new(target: TargetSequence) -> Self {
        Self {
            target,
            background: None,
            snapshot: None,
            identity: IdentityStatus::Mismatch,
        }
    }

    /// Start a session with a freshly shuffled target.
    #[must_use]
    pub fn shuffled<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::new(TargetSequence::shuffled(rng))
    }

    /// Save the empty-scene frame used for background subtraction.
    #[must_use]
    pub fn with_background(self, frame: RgbImage) -> Self {
        Self {
            background: Some(frame),
            ..self
        }
    }

    /// Save the frame to be scored.
    #[must_use]
    pub fn with_snapshot(self, frame: RgbImage) -> Self {
        Self {
            snapshot: Some(frame),
            ..self
        }
    }

    /// Record the outcome of an identity check.
    #[must_use]
    pub fn with_identity(self, identity: IdentityStatus) -> Self {
        Self { identity, ..self }
    }

    /// Run `matcher` on a pair of face crops and record the outcome.
    #[must_use]
    pub fn verify_identity<M: FaceMatcher + ?Sized>(
        self,
        matcher: &M,
        reference: &GrayImage,
        candidate: &GrayImage,
    ) -> Self {
        let identity = IdentityStatus::from_matched(matcher.matches(reference, candidate));
        self.with_identity(identity)
    }

    /// Draw a new target. Captured frames are kept.
    #[must_use]
    pub fn reshuffled<R: Rng + ?Sized>(self, rng: &mut R) -> Self {
        Self {
            target: TargetSequence::shuffled(rng),
            ..self
        }
    }

    #[must_use]
    pub const fn target(&self) -> &TargetSequence {
        &self.target
    }

    #[must_use]
    pub const fn background(&self) -> Option<&RgbImage> {
        self.background.as_ref()
    }

    #[must_use]
    pub const fn snapshot(&self) -> Option<&RgbImage> {
        self.snapshot.as_ref()
    }

    #[must_use]
    pub const fn identity(&self) -> IdentityStatus {
        self.identity
    }

    /// Score the stored snapshot against the stored background.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::MissingBackground`] or
    /// [`PipelineError::MissingSnapshot`] if either frame has not been
    /// captured yet, and otherwise any error from [`crate::analyze`].
    pub fn analyze(&self, config: &PipelineConfig) -> Result<Analysis, PipelineError> {
        self.analyze_with_diagnostics(config, &NullClock)
            .map(|(analysis, _)| analysis)
    }

    /// Like [`Session::analyze`], also returning per-stage diagnostics.
    ///
    /// # Errors
    ///
    /// Same as [`Session::analyze`].
    pub fn analyze_with_diagnostics<C: Clock>(
        &self,
        config: &PipelineConfig,
        clock: &C,
    ) -> Result<(Analysis, PipelineDiagnostics), PipelineError> {
        let background = self
            .background
            .as_ref()
            .ok_or(PipelineError::MissingBackground)?;
        let snapshot = self
            .snapshot
            .as_ref()
            .ok_or(PipelineError::MissingSnapshot)?;
        crate::analyze_with_diagnostics(background, snapshot, &self.target, config, clock)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::MseFaceMatcher;
    use crate::types::ColorLabel;

    fn frame_with_red_square() -> RgbImage {
        RgbImage::from_fn(40, 20, |x, y| {
            if (10..22).contains(&x) && (4..16).contains(&y) {
                image::Rgb([220, 20, 20])
            } else {
                image::Rgb([100, 100, 100])
            }
        })
    }

    #[test]
    fn new_session_has_no_frames() {
        let session = Session::new(TargetSequence::default());
        assert!(session.background().is_none());
        assert!(session.snapshot().is_none());
        assert_eq!(session.identity(), IdentityStatus::Mismatch);
    }

    #[test]
    fn analyze_requires_background() {
        let session =
            Session::new(TargetSequence::default()).with_snapshot(frame_with_red_square());
        assert!(matches!(
            session.analyze(&PipelineConfig::default()),
            Err(PipelineError::MissingBackground)
        ));
    }

    #[test]
    fn analyze_requires_snapshot() {
        let session = Session::new(TargetSequence::default())
            .with_background(RgbImage::from_pixel(40, 20, image::Rgb([100, 100, 100])));
        assert!(matches!(
            session.analyze(&PipelineConfig::default()),
            Err(PipelineError::MissingSnapshot)
        ));
    }

    #[test]
    fn analyze_uses_stored_frames() {
        let session = Session::new(TargetSequence::default())
            .with_background(RgbImage::from_pixel(40, 20, image::Rgb([100, 100, 100])))
            .with_snapshot(frame_with_red_square());
        let analysis = session.analyze(&PipelineConfig::default()).unwrap();
        assert_eq!(analysis.detected, vec![ColorLabel::Red]);
        // Red is first in the default target.
        assert_eq!(analysis.score.correct, 1);
        assert_eq!(analysis.score.missing, 2);
    }

    #[test]
    fn reshuffle_keeps_frames() {
        let mut rng = StdRng::seed_from_u64(11);
        let session = Session::shuffled(&mut rng)
            .with_background(RgbImage::new(4, 4))
            .reshuffled(&mut rng);
        assert!(session.background().is_some());
        assert_eq!(session.target().len(), ColorLabel::COUNT);
    }

    #[test]
    fn identity_is_recorded() {
        let face = GrayImage::from_pixel(8, 8, image::Luma([90]));
        let session = Session::new(TargetSequence::default()).verify_identity(
            &MseFaceMatcher::default(),
            &face,
            &face,
        );
        assert!(session.identity().is_matched());

        let other = GrayImage::from_pixel(8, 8, image::Luma([250]));
        let session = session.verify_identity(&MseFaceMatcher::default(), &face, &other);
        assert_eq!(session.identity(), IdentityStatus::Mismatch);
    }
}
