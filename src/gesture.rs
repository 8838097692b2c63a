//! Thumb/index pinch measurement.

use crate::detect::HandLandmarks;

/// Thumb-tip and index-tip positions in pixels and the distance between them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PinchMeasurement {
    pub thumb: (i32, i32),
    pub index: (i32, i32),
    /// Unclamped Euclidean distance in pixels.
    pub distance: f64,
}

/// Measure the pinch on a `width` x `height` frame.
///
/// Tip coordinates are truncated to whole pixels before the distance is taken,
/// so the distance matches what the overlay draws.
pub fn measure_pinch(hand: &HandLandmarks, width: u32, height: u32) -> PinchMeasurement {
    let thumb = hand.thumb_tip().to_pixel(width, height);
    let index = hand.index_tip().to_pixel(width, height);
    let dx = f64::from(index.0) - f64::from(thumb.0);
    let dy = f64::from(index.1) - f64::from(thumb.1);
    PinchMeasurement {
        thumb,
        index,
        distance: dx.hypot(dy),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::landmarks::{Landmark, INDEX_FINGER_TIP, THUMB_TIP};

    fn hand_with_tips(thumb: (f32, f32), index: (f32, f32)) -> HandLandmarks {
        let mut points = vec![Landmark::new(0.5, 0.5, 0.0); 21];
        points[THUMB_TIP] = Landmark::new(thumb.0, thumb.1, 0.0);
        points[INDEX_FINGER_TIP] = Landmark::new(index.0, index.1, 0.0);
        HandLandmarks::new(points, 0.9).unwrap()
    }

    #[test]
    fn distance_uses_pixel_space() {
        // 0.1 of width and height on a 640x480 frame: 64 by 48 pixels.
        let hand = hand_with_tips((0.2, 0.2), (0.3, 0.3));
        let pinch = measure_pinch(&hand, 640, 480);
        assert_eq!(pinch.thumb, (128, 96));
        assert_eq!(pinch.index, (192, 144));
        assert!((pinch.distance - 80.0).abs() < 1e-9);
    }

    #[test]
    fn touching_tips_measure_zero() {
        let hand = hand_with_tips((0.4, 0.6), (0.4, 0.6));
        assert_eq!(measure_pinch(&hand, 1280, 720).distance, 0.0);
    }

    #[test]
    fn other_landmarks_are_ignored() {
        let mut a = hand_with_tips((0.1, 0.1), (0.1, 0.5));
        let b = measure_pinch(&a, 100, 100);
        a = {
            let mut points = a.points().to_vec();
            points[0] = Landmark::new(0.9, 0.9, 0.3);
            HandLandmarks::new(points, 0.5).unwrap()
        };
        assert_eq!(measure_pinch(&a, 100, 100), b);
    }

    #[test]
    fn far_out_of_frame_tips_do_not_overflow() {
        let hand = hand_with_tips((-1e9, 0.5), (1e9, 0.5));
        let pinch = measure_pinch(&hand, 640, 480);
        assert_eq!(pinch.thumb.0, i32::MIN);
        assert_eq!(pinch.index.0, i32::MAX);
        assert!(pinch.distance.is_finite());
        assert!(pinch.distance > 4.0e9);
    }
}
