//! Swipe-to-act card.
//!
//! A single-axis drag gesture drives the card: only leftward (negative)
//! displacement is honored, visual feedback scales with drag distance, and
//! crossing the threshold on release commits the action. The gesture and
//! animation subsystems are external; this module computes states and
//! animation targets only, no physics.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

use crate::timer::Deadline;

/// Default drag distance (in display units) required to commit a swipe.
pub const DEFAULT_SWIPE_THRESHOLD: f32 = 100.0;

/// Animation target for a committed card: fully off-screen to the left.
pub const OFF_SCREEN_OFFSET: f32 = -300.0;

/// Delay before a committed card snaps back to rest.
pub const RESET_DELAY: Duration = Duration::from_millis(500);

/// Opacity never drops below this fraction of full while dragging.
const OPACITY_FLOOR: f32 = 0.3;

/// Opacity lost per threshold-length of drag.
const OPACITY_FALLOFF: f32 = 0.7;

/// Card color at rest.
const REST_COLOR: Rgb = Rgb {
    r: 0x4C,
    g: 0xAF,
    b: 0x50,
};

/// Card color once the drag reaches the threshold.
const ARMED_COLOR: Rgb = Rgb {
    r: 0xFF,
    g: 0x57,
    b: 0x22,
};

/// An RGB color for the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    fn lerp(self, other: Rgb, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let channel = |a: u8, b: u8| (f32::from(a) + (f32::from(b) - f32::from(a)) * t) as u8;
        Rgb {
            r: channel(self.r, other.r),
            g: channel(self.g, other.g),
            b: channel(self.b, other.b),
        }
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Phase of the gesture state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwipePhase {
    /// Offset zero, full opacity.
    #[default]
    Rest,
    /// A drag is in progress.
    Dragging,
    /// The swipe crossed the threshold; the card is animating off-screen
    /// and waiting for its auto-reset.
    Committed,
}

/// Result of releasing a drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeOutcome {
    /// The swipe crossed the threshold and the action fired.
    Committed,
    /// The swipe fell short; the card springs back.
    Reset,
}

/// What the rendering layer should draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Visual {
    /// Horizontal offset (animation target when committed).
    pub offset: f32,
    /// Card opacity in `[0.0, 1.0]`.
    pub opacity: f32,
    /// Card background color.
    pub background: Rgb,
}

/// The pure gesture state machine.
///
/// `Rest -> Dragging -> (Committed | Rest)`. Ephemeral: every completed
/// gesture ends back at `Rest`, whether or not the action fired.
#[derive(Debug, Clone)]
pub struct SwipeCard {
    threshold: f32,
    phase: SwipePhase,
    origin: f32,
    offset: f32,
    opacity: f32,
}

impl Default for SwipeCard {
    fn default() -> Self {
        Self::new(DEFAULT_SWIPE_THRESHOLD)
    }
}

impl SwipeCard {
    /// Create a card with the given commit threshold (display units).
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold: threshold.max(f32::EPSILON),
            phase: SwipePhase::Rest,
            origin: 0.0,
            offset: 0.0,
            opacity: 1.0,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> SwipePhase {
        self.phase
    }

    /// The configured commit threshold.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Begin a drag, capturing the current offset as the gesture origin.
    ///
    /// Returns `false` (and changes nothing) while a committed card is
    /// waiting for its auto-reset; a new gesture must wait for `Rest`.
    pub fn drag_start(&mut self) -> bool {
        if self.phase == SwipePhase::Committed {
            trace!("Drag rejected while committed");
            return false;
        }

        self.origin = self.offset;
        self.phase = SwipePhase::Dragging;
        true
    }

    /// Update the drag with the current displacement from its start point.
    ///
    /// Positive (rightward) displacement is ignored entirely: offset and
    /// opacity stay as they are.
    pub fn drag_move(&mut self, translation: f32) {
        if self.phase != SwipePhase::Dragging || translation >= 0.0 {
            return;
        }

        self.offset = self.origin + translation;
        let progress = translation.abs() / self.threshold;
        self.opacity = (1.0 - progress * OPACITY_FALLOFF).max(OPACITY_FLOOR);
    }

    /// Release the drag with its final displacement.
    ///
    /// Crossing the negative threshold commits: the card targets the
    /// off-screen offset at zero opacity. Anything else springs back to
    /// rest.
    pub fn drag_end(&mut self, translation: f32) -> SwipeOutcome {
        if self.phase != SwipePhase::Dragging {
            return SwipeOutcome::Reset;
        }

        if translation < -self.threshold {
            debug!(translation, "Swipe committed");
            self.phase = SwipePhase::Committed;
            self.offset = OFF_SCREEN_OFFSET;
            self.opacity = 0.0;
            SwipeOutcome::Committed
        } else {
            trace!(translation, "Swipe below threshold, springing back");
            self.reset();
            SwipeOutcome::Reset
        }
    }

    /// Return to `Rest`: offset zero, full opacity.
    pub fn reset(&mut self) {
        self.phase = SwipePhase::Rest;
        self.origin = 0.0;
        self.offset = 0.0;
        self.opacity = 1.0;
    }

    /// Current visual state for the rendering layer.
    pub fn visual(&self) -> Visual {
        let progress = (-self.offset / self.threshold).clamp(0.0, 1.0);

        Visual {
            offset: self.offset,
            opacity: self.opacity,
            background: REST_COLOR.lerp(ARMED_COLOR, progress),
        }
    }
}

/// Card plus completion callback and the auto-reset timer.
///
/// The callback fires exactly once per committed swipe; `RESET_DELAY` later
/// the card returns to rest on its own. Dropping the controller cancels a
/// pending reset.
pub struct SwipeCardController {
    card: Arc<Mutex<SwipeCard>>,
    on_commit: Arc<dyn Fn() + Send + Sync>,
    reset_timer: Mutex<Option<Deadline>>,
}

impl SwipeCardController {
    /// Create a controller with the given threshold and completion
    /// callback.
    pub fn new<F>(threshold: f32, on_commit: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            card: Arc::new(Mutex::new(SwipeCard::new(threshold))),
            on_commit: Arc::new(on_commit),
            reset_timer: Mutex::new(None),
        }
    }

    /// Begin a drag. Returns `false` while the previous commit is still
    /// animating out.
    pub fn drag_start(&self) -> bool {
        self.card.lock().drag_start()
    }

    /// Update the drag displacement.
    pub fn drag_move(&self, translation: f32) {
        self.card.lock().drag_move(translation);
    }

    /// Release the drag. On commit, fires the callback and arms the
    /// auto-reset.
    pub fn drag_end(&self, translation: f32) -> SwipeOutcome {
        let outcome = self.card.lock().drag_end(translation);

        if outcome == SwipeOutcome::Committed {
            (self.on_commit)();

            let card = self.card.clone();
            *self.reset_timer.lock() = Some(Deadline::after(RESET_DELAY, move || async move {
                trace!("Auto-resetting committed card");
                card.lock().reset();
            }));
        }

        outcome
    }

    /// Current visual state.
    pub fn visual(&self) -> Visual {
        self.card.lock().visual()
    }

    /// Current phase.
    pub fn phase(&self) -> SwipePhase {
        self.card.lock().phase()
    }

    /// Cancel a pending auto-reset, for teardown.
    pub fn cancel_pending_reset(&self) {
        self.reset_timer.lock().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const EPS: f32 = 1e-5;

    #[test]
    fn test_rightward_drag_changes_nothing() {
        let mut card = SwipeCard::default();
        assert!(card.drag_start());
        card.drag_move(50.0);

        let visual = card.visual();
        assert_eq!(visual.offset, 0.0);
        assert_eq!(visual.opacity, 1.0);
        assert_eq!(visual.background, REST_COLOR);
    }

    #[test]
    fn test_leftward_drag_tracks_offset_and_fades() {
        let mut card = SwipeCard::new(100.0);
        card.drag_start();
        card.drag_move(-50.0);

        let visual = card.visual();
        assert!((visual.offset - -50.0).abs() < EPS);
        assert!((visual.opacity - 0.65).abs() < EPS);
    }

    #[test]
    fn test_opacity_floor() {
        let mut card = SwipeCard::new(100.0);
        card.drag_start();

        // Floor is reached exactly at the threshold and holds beyond it.
        card.drag_move(-100.0);
        assert!((card.visual().opacity - OPACITY_FLOOR).abs() < EPS);

        card.drag_move(-1000.0);
        assert!((card.visual().opacity - OPACITY_FLOOR).abs() < EPS);
    }

    #[test]
    fn test_release_past_threshold_commits() {
        let mut card = SwipeCard::new(100.0);
        card.drag_start();
        card.drag_move(-150.0);

        assert_eq!(card.drag_end(-150.0), SwipeOutcome::Committed);
        assert_eq!(card.phase(), SwipePhase::Committed);

        let visual = card.visual();
        assert_eq!(visual.offset, OFF_SCREEN_OFFSET);
        assert_eq!(visual.opacity, 0.0);
    }

    #[test]
    fn test_release_short_of_threshold_springs_back() {
        let mut card = SwipeCard::new(100.0);
        card.drag_start();
        card.drag_move(-50.0);

        assert_eq!(card.drag_end(-50.0), SwipeOutcome::Reset);
        assert_eq!(card.phase(), SwipePhase::Rest);

        let visual = card.visual();
        assert_eq!(visual.offset, 0.0);
        assert_eq!(visual.opacity, 1.0);
    }

    #[test]
    fn test_release_exactly_at_threshold_does_not_commit() {
        let mut card = SwipeCard::new(100.0);
        card.drag_start();
        card.drag_move(-100.0);
        assert_eq!(card.drag_end(-100.0), SwipeOutcome::Reset);
    }

    #[test]
    fn test_background_interpolates_toward_armed() {
        let mut card = SwipeCard::new(100.0);
        card.drag_start();
        card.drag_move(-100.0);
        assert_eq!(card.visual().background, ARMED_COLOR);

        let mut card = SwipeCard::new(100.0);
        card.drag_start();
        card.drag_move(-50.0);
        let mid = card.visual().background;
        assert!(mid != REST_COLOR && mid != ARMED_COLOR);
    }

    #[test]
    fn test_new_drag_rejected_while_committed() {
        let mut card = SwipeCard::new(100.0);
        card.drag_start();
        card.drag_end(-150.0);

        assert!(!card.drag_start());
        card.drag_move(-10.0);
        assert_eq!(card.visual().offset, OFF_SCREEN_OFFSET);

        card.reset();
        assert!(card.drag_start());
    }

    #[tokio::test(start_paused = true)]
    async fn test_commit_fires_callback_exactly_once() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let controller = SwipeCardController::new(100.0, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        controller.drag_start();
        controller.drag_move(-150.0);
        assert_eq!(controller.drag_end(-150.0), SwipeOutcome::Committed);
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // A stray release while committed neither fires again nor resets.
        assert_eq!(controller.drag_end(-150.0), SwipeOutcome::Reset);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(controller.phase(), SwipePhase::Committed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_release_never_fires_callback() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let controller = SwipeCardController::new(100.0, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        controller.drag_start();
        controller.drag_move(-50.0);
        assert_eq!(controller.drag_end(-50.0), SwipeOutcome::Reset);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_reset_after_delay() {
        let controller = SwipeCardController::new(100.0, || {});

        controller.drag_start();
        controller.drag_end(-150.0);
        assert_eq!(controller.phase(), SwipePhase::Committed);

        tokio::time::sleep(Duration::from_millis(499)).await;
        assert_eq!(controller.phase(), SwipePhase::Committed);

        tokio::time::sleep(Duration::from_millis(1)).await;
        tokio::task::yield_now().await;

        assert_eq!(controller.phase(), SwipePhase::Rest);
        let visual = controller.visual();
        assert_eq!(visual.offset, 0.0);
        assert_eq!(visual.opacity, 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_cancels_pending_reset() {
        let controller = SwipeCardController::new(100.0, || {});

        controller.drag_start();
        controller.drag_end(-150.0);
        controller.cancel_pending_reset();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(controller.phase(), SwipePhase::Committed);
    }

    proptest! {
        #[test]
        fn prop_opacity_stays_within_bounds(translation in -2000.0f32..2000.0) {
            let mut card = SwipeCard::new(100.0);
            card.drag_start();
            card.drag_move(translation);

            let visual = card.visual();
            prop_assert!(visual.opacity >= OPACITY_FLOOR - EPS);
            prop_assert!(visual.opacity <= 1.0 + EPS);
            prop_assert!(visual.offset <= 0.0);
        }

        #[test]
        fn prop_positive_translation_is_inert(translation in 0.0f32..2000.0) {
            let mut card = SwipeCard::new(100.0);
            card.drag_start();
            card.drag_move(translation);

            prop_assert_eq!(card.visual().offset, 0.0);
            prop_assert_eq!(card.visual().opacity, 1.0);
        }
    }
}
