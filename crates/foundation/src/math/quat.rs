//! Unit quaternions for orientation (trackball rotation, inertia).

use super::Vec3;

/// Quaternion `[x, y, z, w]`; callers keep it normalized.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Quat {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quat {
    pub const IDENTITY: Quat = Quat {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    pub fn from_axis_angle(axis: Vec3, angle_rad: f64) -> Self {
        let Some(axis) = axis.normalized() else {
            return Self::IDENTITY;
        };
        let (s, c) = (angle_rad * 0.5).sin_cos();
        Self::new(axis.x * s, axis.y * s, axis.z * s, c)
    }

    /// Shortest rotation taking unit vector `a` onto unit vector `b`.
    pub fn from_unit_vectors(a: Vec3, b: Vec3) -> Self {
        let dot = a.dot(b).clamp(-1.0, 1.0);

        // Nearly opposite vectors: pick arbitrary orthogonal axis.
        if dot < -0.999_999 {
            let mut axis = Vec3::X.cross(a);
            if axis.dot(axis) < 1e-12 {
                axis = Vec3::Y.cross(a);
            }
            let axis = axis.normalized().unwrap_or(Vec3::Z);
            return Self::new(axis.x, axis.y, axis.z, 0.0);
        }

        if dot > 0.999_999 {
            return Self::IDENTITY;
        }

        let axis = a.cross(b);
        Self::new(axis.x, axis.y, axis.z, 1.0 + dot).normalize()
    }

    /// Hamilton product `self * rhs` (apply `rhs` first).
    pub fn mul(self, rhs: Quat) -> Quat {
        let (a, b) = (self, rhs);
        Quat::new(
            a.w * b.x + a.x * b.w + a.y * b.z - a.z * b.y,
            a.w * b.y - a.x * b.z + a.y * b.w + a.z * b.x,
            a.w * b.z + a.x * b.y - a.y * b.x + a.z * b.w,
            a.w * b.w - a.x * b.x - a.y * b.y - a.z * b.z,
        )
    }

    pub fn normalize(self) -> Quat {
        let n = (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt();
        if n > 1e-10 {
            Quat::new(self.x / n, self.y / n, self.z / n, self.w / n)
        } else {
            Quat::IDENTITY
        }
    }

    pub fn conjugate(self) -> Quat {
        Quat::new(-self.x, -self.y, -self.z, self.w)
    }

    pub fn rotate(self, v: Vec3) -> Vec3 {
        let qv = Vec3::new(self.x, self.y, self.z);
        let t = qv.cross(v).scale(2.0);
        v + t.scale(self.w) + qv.cross(t)
    }

    /// Rotation angle in radians, in `[0, 2π]`.
    pub fn angle(self) -> f64 {
        2.0 * self.w.clamp(-1.0, 1.0).acos()
    }

    /// Spherical linear interpolation, taking the shorter arc.
    pub fn slerp(self, other: Quat, t: f64) -> Quat {
        let a = self;
        let mut b = other;
        let mut dot = a.x * b.x + a.y * b.y + a.z * b.z + a.w * b.w;
        if dot < 0.0 {
            b = Quat::new(-b.x, -b.y, -b.z, -b.w);
            dot = -dot;
        }

        // Nearly parallel: lerp is stable and close enough.
        if dot > 0.9995 {
            return Quat::new(
                a.x + t * (b.x - a.x),
                a.y + t * (b.y - a.y),
                a.z + t * (b.z - a.z),
                a.w + t * (b.w - a.w),
            )
            .normalize();
        }

        let theta_0 = dot.clamp(-1.0, 1.0).acos();
        let theta = theta_0 * t;
        let sin_theta_0 = theta_0.sin();
        let s0 = theta.cos() - dot * theta.sin() / sin_theta_0;
        let s1 = theta.sin() / sin_theta_0;

        Quat::new(
            s0 * a.x + s1 * b.x,
            s0 * a.y + s1 * b.y,
            s0 * a.z + s1 * b.z,
            s0 * a.w + s1 * b.w,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::Quat;
    use crate::math::Vec3;
    use approx::assert_abs_diff_eq;

    #[test]
    fn identity_leaves_vectors_alone() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(Quat::IDENTITY.rotate(v), v);
    }

    #[test]
    fn from_unit_vectors_maps_a_onto_b() {
        let q = Quat::from_unit_vectors(Vec3::X, Vec3::Y);
        let r = q.rotate(Vec3::X);
        assert_abs_diff_eq!(r.x, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(r.y, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(r.z, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn opposite_vectors_rotate_half_turn() {
        let q = Quat::from_unit_vectors(Vec3::Z, -Vec3::Z);
        let r = q.rotate(Vec3::Z);
        assert_abs_diff_eq!(r.z, -1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(q.angle(), std::f64::consts::PI, epsilon = 1e-9);
    }

    #[test]
    fn slerp_halfway_halves_the_angle() {
        let q = Quat::from_axis_angle(Vec3::Y, 1.0);
        let half = Quat::IDENTITY.slerp(q, 0.5);
        assert_abs_diff_eq!(half.angle(), 0.5, epsilon = 1e-9);
    }

    #[test]
    fn conjugate_undoes_rotation() {
        let q = Quat::from_axis_angle(Vec3::new(1.0, 1.0, 0.0), 0.7);
        let v = Vec3::new(0.3, -2.0, 1.5);
        let back = q.conjugate().rotate(q.rotate(v));
        assert_abs_diff_eq!(back.x, v.x, epsilon = 1e-12);
        assert_abs_diff_eq!(back.y, v.y, epsilon = 1e-12);
        assert_abs_diff_eq!(back.z, v.z, epsilon = 1e-12);
    }
}
