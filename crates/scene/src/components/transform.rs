use foundation::math::{Quat, Vec3};

/// Euler rotation in radians, applied in X-then-Y-then-Z frame order
/// (the matrix is `Rx * Ry * Rz`).
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Euler {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Euler {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn to_quat(self) -> Quat {
        let qx = Quat::from_axis_angle(Vec3::X, self.x);
        let qy = Quat::from_axis_angle(Vec3::Y, self.y);
        let qz = Quat::from_axis_angle(Vec3::Z, self.z);
        qx.mul(qy).mul(qz)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Euler,
    /// Uniform scale.
    pub scale: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Euler::default(),
            scale: 1.0,
        }
    }

    pub fn translate(position: Vec3) -> Self {
        Self {
            position,
            ..Self::identity()
        }
    }

    pub fn rotate(rotation: Euler) -> Self {
        Self {
            rotation,
            ..Self::identity()
        }
    }

    /// Map a point from this node's local space into its parent's space.
    pub fn apply(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation.to_quat().rotate(local.scale(self.scale))
    }
}
