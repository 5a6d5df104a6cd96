//! Upstream scalar extraction
//!
//! Turns per-frame vision results (an RGB frame with a face box, shoulder
//! landmarks) into the one scalar per channel the pipeline consumes. Face and
//! pose detection themselves are outside this crate.

/// Minimum landmark visibility for a shoulder to count as tracked
pub const MIN_SHOULDER_VISIBILITY: f32 = 0.3;

/// Scale applied to normalized shoulder displacement
pub const SHOULDER_MOTION_SCALE: f32 = 1000.0;

/// Axis-aligned region of interest in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoiRect {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl RoiRect {
    pub fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Clamp to a `frame_width` x `frame_height` frame
    ///
    /// Returns `(x0, y0, x1, y1)` with exclusive upper bounds, or `None` if
    /// nothing of the box lies inside the frame.
    pub fn clamp(&self, frame_width: usize, frame_height: usize) -> Option<(usize, usize, usize, usize)> {
        let x0 = self.x.clamp(0, frame_width as i64);
        let y0 = self.y.clamp(0, frame_height as i64);
        let x1 = self.x.saturating_add(self.width).clamp(0, frame_width as i64);
        let y1 = self.y.saturating_add(self.height).clamp(0, frame_height as i64);

        (x1 > x0 && y1 > y0).then_some((x0 as usize, y0 as usize, x1 as usize, y1 as usize))
    }
}

/// Mean green value inside `roi` of a packed RGB8 frame
///
/// Falls back to the whole frame when there is no face box or the box lies
/// outside the frame. Returns `None` if `rgb` is too small for the given
/// dimensions or the frame is empty.
pub fn green_channel_mean(
    rgb: &[u8],
    width: usize,
    height: usize,
    roi: Option<RoiRect>,
) -> Option<f32> {
    if width == 0 || height == 0 || rgb.len() < width * height * 3 {
        return None;
    }

    let (x0, y0, x1, y1) = roi
        .and_then(|r| r.clamp(width, height))
        .unwrap_or((0, 0, width, height));

    let mut sum = 0u64;
    for row in y0..y1 {
        let start = (row * width + x0) * 3;
        let end = (row * width + x1) * 3;
        sum += rgb[start..end]
            .chunks_exact(3)
            .map(|px| px[1] as u64)
            .sum::<u64>();
    }

    let count = ((x1 - x0) * (y1 - y0)) as f64;
    Some((sum as f64 / count) as f32)
}

/// One pose landmark in normalized image coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    pub y: f32,
    pub visibility: f32,
}

/// Vertical shoulder motion between consecutive frames
///
/// Breathing lifts and drops the shoulders; the frame-to-frame change of the
/// shoulders' mid height is the respiration sample.
#[derive(Debug, Clone, Default)]
pub struct ShoulderMotionTracker {
    prev_mid: Option<f32>,
}

impl ShoulderMotionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Motion sample for this frame's shoulders (`None` = no pose found)
    ///
    /// Yields `0.0` and forgets the previous position whenever either
    /// shoulder is missing or poorly visible.
    pub fn update(&mut self, shoulders: Option<(Landmark, Landmark)>) -> f32 {
        let Some((left, right)) = shoulders else {
            self.prev_mid = None;
            return 0.0;
        };

        if left.visibility <= MIN_SHOULDER_VISIBILITY || right.visibility <= MIN_SHOULDER_VISIBILITY {
            self.prev_mid = None;
            return 0.0;
        }

        let mid = (left.y + right.y) / 2.0;
        let motion = self
            .prev_mid
            .map_or(0.0, |prev| (prev - mid) * SHOULDER_MOTION_SCALE);
        self.prev_mid = Some(mid);
        motion
    }

    pub fn reset(&mut self) {
        self.prev_mid = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn frame(width: usize, height: usize, green: impl Fn(usize, usize) -> u8) -> Vec<u8> {
        let mut rgb = Vec::with_capacity(width * height * 3);
        for y in 0..height {
            for x in 0..width {
                rgb.extend_from_slice(&[255, green(x, y), 0]);
            }
        }
        rgb
    }

    #[test]
    fn test_green_mean_inside_roi() {
        let rgb = frame(4, 4, |x, _| if x < 2 { 100 } else { 200 });
        let roi = RoiRect::new(2, 0, 2, 4);
        assert_eq!(green_channel_mean(&rgb, 4, 4, Some(roi)), Some(200.0));
        assert_eq!(green_channel_mean(&rgb, 4, 4, None), Some(150.0));
    }

    #[test]
    fn test_roi_is_clamped_to_frame() {
        let rgb = frame(4, 4, |x, _| if x < 2 { 100 } else { 200 });
        let roi = RoiRect::new(-3, -3, 5, 10);
        // Clamps to x 0..2, y 0..4
        assert_eq!(green_channel_mean(&rgb, 4, 4, Some(roi)), Some(100.0));
    }

    #[test]
    fn test_roi_outside_frame_uses_whole_frame() {
        let rgb = frame(4, 4, |_, y| (y * 10) as u8);
        let outside = RoiRect::new(10, 10, 5, 5);
        let empty = RoiRect::new(1, 1, 0, 2);
        assert_eq!(green_channel_mean(&rgb, 4, 4, Some(outside)), Some(15.0));
        assert_eq!(green_channel_mean(&rgb, 4, 4, Some(empty)), Some(15.0));
    }

    #[test]
    fn test_short_buffer_rejected() {
        assert_eq!(green_channel_mean(&[0; 10], 4, 4, None), None);
        assert_eq!(green_channel_mean(&[], 0, 0, None), None);
    }

    #[test]
    fn test_shoulder_motion() {
        let visible = |y| Landmark { y, visibility: 0.9 };
        let mut tracker = ShoulderMotionTracker::new();

        assert_eq!(tracker.update(Some((visible(0.50), visible(0.52)))), 0.0);
        // Shoulders rise by 0.002 (y decreases)
        let motion = tracker.update(Some((visible(0.498), visible(0.518))));
        assert_abs_diff_eq!(motion, 2.0, epsilon = 1e-3);
    }

    #[test]
    fn test_low_visibility_resets_tracking() {
        let mut tracker = ShoulderMotionTracker::new();
        let visible = |y| Landmark { y, visibility: 0.9 };
        let hidden = Landmark {
            y: 0.4,
            visibility: 0.3,
        };

        tracker.update(Some((visible(0.5), visible(0.5))));
        assert_eq!(tracker.update(Some((visible(0.5), hidden))), 0.0);
        // No previous mid after the reset
        assert_eq!(tracker.update(Some((visible(0.45), visible(0.45)))), 0.0);
        assert_eq!(tracker.update(None), 0.0);
        assert_eq!(tracker.update(Some((visible(0.45), visible(0.45)))), 0.0);
    }
}
