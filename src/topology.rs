// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Skeleton connectivity between body landmarks.

use crate::landmarks::NUM_LANDMARKS;

/// Full connection set of the 33-point body model (face, hands, body and feet).
pub const POSE_CONNECTIONS: [(usize, usize); 35] = [
    (0, 1),   // nose to left eye (inner)
    (1, 2),   // left eye (inner) to left eye
    (2, 3),   // left eye to left eye (outer)
    (3, 7),   // left eye (outer) to left ear
    (0, 4),   // nose to right eye (inner)
    (4, 5),   // right eye (inner) to right eye
    (5, 6),   // right eye to right eye (outer)
    (6, 8),   // right eye (outer) to right ear
    (9, 10),  // mouth
    (11, 12), // shoulders
    (11, 13), // left shoulder to left elbow
    (13, 15), // left elbow to left wrist
    (15, 17), // left wrist to left pinky
    (15, 19), // left wrist to left index
    (15, 21), // left wrist to left thumb
    (17, 19), // left pinky to left index
    (12, 14), // right shoulder to right elbow
    (14, 16), // right elbow to right wrist
    (16, 18), // right wrist to right pinky
    (16, 20), // right wrist to right index
    (16, 22), // right wrist to right thumb
    (18, 20), // right pinky to right index
    (11, 23), // left shoulder to left hip
    (12, 24), // right shoulder to right hip
    (23, 24), // hips
    (23, 25), // left hip to left knee
    (24, 26), // right hip to right knee
    (25, 27), // left knee to left ankle
    (26, 28), // right knee to right ankle
    (27, 29), // left ankle to left heel
    (28, 30), // right ankle to right heel
    (29, 31), // left heel to left foot index
    (30, 32), // right heel to right foot index
    (27, 31), // left ankle to left foot index
    (28, 32), // right ankle to right foot index
];

/// Limbs and torso only, as plotted in the 3D scene.
pub const BODY_CONNECTIONS: [(usize, usize); 16] = [
    (11, 13), // left arm
    (13, 15),
    (12, 14), // right arm
    (14, 16),
    (11, 12), // shoulders
    (23, 24), // hips
    (11, 23), // torso
    (12, 24),
    (23, 25), // left leg
    (25, 27),
    (24, 26), // right leg
    (26, 28),
    (27, 29), // left foot
    (29, 31),
    (28, 30), // right foot
    (30, 32),
];

/// An immutable set of bone segments, each a pair of landmark indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topology {
    segments: &'static [(usize, usize)],
}

impl Topology {
    /// Every connection of the body model.
    #[must_use]
    pub const fn full() -> Self {
        Self {
            segments: &POSE_CONNECTIONS,
        }
    }

    /// Limb and torso connections only.
    #[must_use]
    pub const fn body() -> Self {
        Self {
            segments: &BODY_CONNECTIONS,
        }
    }

    /// Bone segments in drawing order.
    #[must_use]
    pub const fn segments(&self) -> &'static [(usize, usize)] {
        self.segments
    }

    /// Number of bone segments.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the topology has no segments.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Check that every index is in range and no segment is degenerate.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.segments
            .iter()
            .all(|&(a, b)| a < NUM_LANDMARKS && b < NUM_LANDMARKS && a != b)
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::full()
    }
}
