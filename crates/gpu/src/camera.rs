use foundation::math::{Vec2, Vec3};
use scene::picking::Ray;

/// Perspective camera looking from `position` at `target`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera3D {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_rad: f64,
    pub aspect: f64,
    pub near: f64,
    pub far: f64,
}

/// Orthonormal camera frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraBasis {
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,
}

impl Camera3D {
    pub fn look_at(position: Vec3, target: Vec3, fov_y_rad: f64, near: f64, far: f64) -> Self {
        Self {
            position,
            target,
            up: Vec3::Y,
            fov_y_rad,
            aspect: 1.0,
            near,
            far,
        }
    }

    /// `None` when position and target coincide or `up` is parallel to the view direction.
    pub fn basis(&self) -> Option<CameraBasis> {
        let forward = (self.target - self.position).normalized()?;
        let right = forward.cross(self.up).normalized()?;
        let up = right.cross(forward);
        Some(CameraBasis { forward, right, up })
    }

    /// Ray from the eye through normalized device coordinates
    /// (`x` right, `y` up, both in `[-1, 1]`).
    pub fn ray_through_ndc(&self, ndc: Vec2) -> Option<Ray> {
        let basis = self.basis()?;
        let half_h = (0.5 * self.fov_y_rad).tan();
        let half_w = half_h * self.aspect;
        let dir = basis.forward
            + basis.right.scale(ndc.x * half_w)
            + basis.up.scale(ndc.y * half_h);
        Some(Ray::new(self.position, dir.normalized()?))
    }

    /// Normalized device coordinates of a world point; `None` behind the eye.
    pub fn project_to_ndc(&self, point: Vec3) -> Option<Vec2> {
        let basis = self.basis()?;
        let d = point - self.position;
        let depth = d.dot(basis.forward);
        if depth <= 0.0 {
            return None;
        }
        let half_h = (0.5 * self.fov_y_rad).tan();
        let half_w = half_h * self.aspect;
        Some(Vec2::new(
            d.dot(basis.right) / (depth * half_w),
            d.dot(basis.up) / (depth * half_h),
        ))
    }

    /// Distance from the eye along the view direction.
    pub fn depth_of(&self, point: Vec3) -> Option<f64> {
        let basis = self.basis()?;
        Some((point - self.position).dot(basis.forward))
    }
}
