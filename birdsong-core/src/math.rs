//! Math types for Birdsong

pub use glam::Vec3;

/// 3D attributes applied to an instance before it starts.
///
/// Mirrors what audio middleware expects for a positional event: where it is,
/// how fast it moves, and which way it faces. Emitters are static, so most
/// callers only ever set the position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialAttributes {
    pub position: Vec3,
    pub velocity: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
}

impl SpatialAttributes {
    /// Stationary attributes at `position`, facing -Z with +Y up.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            forward: -Vec3::Z,
            up: Vec3::Y,
        }
    }
}

impl Default for SpatialAttributes {
    fn default() -> Self {
        Self::from_position(Vec3::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_position_is_stationary() {
        let attrs = SpatialAttributes::from_position(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(attrs.velocity, Vec3::ZERO);
        assert_eq!(attrs.forward, -Vec3::Z);
        assert_eq!(attrs.up, Vec3::Y);
    }
}
