//! Point types and position hashing

use nalgebra::{Point3, Vector3};

/// A 3D point with floating point coordinates
pub type Point3f = Point3<f32>;

/// A 3D vector with floating point components
pub type Vector3f = Vector3<f32>;

/// Hashable identity of an exact position.
///
/// Two positions map to the same key iff they compare equal component-wise,
/// so `0.0` and `-0.0` share a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PositionKey([u32; 3]);

impl PositionKey {
    pub fn new(p: &Point3f) -> Self {
        let bits = |c: f32| if c == 0.0 { 0u32 } else { c.to_bits() };
        Self([bits(p.x), bits(p.y), bits(p.z)])
    }
}

impl From<&Point3f> for PositionKey {
    fn from(p: &Point3f) -> Self {
        Self::new(p)
    }
}
