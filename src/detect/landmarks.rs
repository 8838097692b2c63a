use anyhow::{anyhow, Result};

/// Number of keypoints in a hand landmark set.
pub const HAND_LANDMARK_COUNT: usize = 21;

pub const WRIST: usize = 0;
pub const THUMB_CMC: usize = 1;
pub const THUMB_MCP: usize = 2;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_FINGER_MCP: usize = 5;
pub const INDEX_FINGER_PIP: usize = 6;
pub const INDEX_FINGER_DIP: usize = 7;
pub const INDEX_FINGER_TIP: usize = 8;
pub const MIDDLE_FINGER_MCP: usize = 9;
pub const RING_FINGER_MCP: usize = 13;
pub const PINKY_MCP: usize = 17;

/// Bones of the 21-point hand skeleton, as landmark index pairs.
pub const HAND_CONNECTIONS: &[(usize, usize)] = &[
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 4),
    (0, 5),
    (5, 6),
    (6, 7),
    (7, 8),
    (5, 9),
    (9, 10),
    (10, 11),
    (11, 12),
    (9, 13),
    (13, 14),
    (14, 15),
    (15, 16),
    (13, 17),
    (0, 17),
    (17, 18),
    (18, 19),
    (19, 20),
];

/// One keypoint in normalized image coordinates (0..1 for points inside the frame).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Pixel position in a `width` x `height` frame. Truncates toward zero.
    pub fn to_pixel(&self, width: u32, height: u32) -> (i32, i32) {
        (
            (self.x * width as f32) as i32,
            (self.y * height as f32) as i32,
        )
    }
}

/// Landmarks for a single detected hand.
#[derive(Clone, Debug, PartialEq)]
pub struct HandLandmarks {
    points: Vec<Landmark>,
    /// Detector confidence that a hand is present.
    pub confidence: f32,
}

impl HandLandmarks {
    pub fn new(points: Vec<Landmark>, confidence: f32) -> Result<Self> {
        if points.len() != HAND_LANDMARK_COUNT {
            return Err(anyhow!(
                "expected {} hand landmarks, got {}",
                HAND_LANDMARK_COUNT,
                points.len()
            ));
        }
        Ok(Self { points, confidence })
    }

    pub fn points(&self) -> &[Landmark] {
        &self.points
    }

    pub fn point(&self, index: usize) -> Option<Landmark> {
        self.points.get(index).copied()
    }

    pub fn thumb_tip(&self) -> Landmark {
        self.points[THUMB_TIP]
    }

    pub fn index_tip(&self) -> Landmark {
        self.points[INDEX_FINGER_TIP]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_landmark_count() {
        assert!(HandLandmarks::new(vec![Landmark::default(); 20], 0.9).is_err());
        assert!(HandLandmarks::new(vec![Landmark::default(); 21], 0.9).is_ok());
    }

    #[test]
    fn pixel_conversion_truncates() {
        let lm = Landmark::new(0.5, 0.251, 0.0);
        assert_eq!(lm.to_pixel(640, 480), (320, 120));
    }

    #[test]
    fn connections_stay_inside_the_skeleton() {
        assert_eq!(HAND_CONNECTIONS.len(), 21);
        for &(a, b) in HAND_CONNECTIONS {
            assert!(a < HAND_LANDMARK_COUNT && b < HAND_LANDMARK_COUNT);
        }
    }
}
