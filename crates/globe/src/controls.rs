//! Trackball-style orbit controls for a camera circling the globe.
//!
//! Dragging maps the pointer onto a virtual arcball and rotates the camera
//! around the target. After release the motion carries on with damped
//! inertia. Zoom and pan are off by default and the camera distance is
//! clamped between `min_distance` and `max_distance`.

use std::collections::VecDeque;

use foundation::math::{Quat, Vec2, Vec3};
use foundation::time::Time;
use gpu::Camera3D;

/// Angular speed below which inertia stops (radians per 60 Hz frame).
const ANGULAR_VELOCITY_THRESHOLD: f64 = 1e-4;

/// Samples older than this at release time do not contribute to inertia.
const VELOCITY_WINDOW_S: f64 = 0.1;

const VELOCITY_HISTORY_SIZE: usize = 5;

/// Largest step `update` will integrate at once.
const MAX_STEP_S: f64 = 0.1;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ControlsOptions {
    /// Fraction of the remaining inertia shed per 60 Hz frame; 0 disables damping.
    pub damping_factor: f64,
    pub enable_zoom: bool,
    pub enable_pan: bool,
    pub min_distance: f64,
    pub max_distance: f64,
}

impl Default for ControlsOptions {
    fn default() -> Self {
        Self {
            damping_factor: 0.05,
            enable_zoom: false,
            enable_pan: false,
            min_distance: 3.5,
            max_distance: 3.5,
        }
    }
}

/// Drag lifecycle signals, the equivalent of `start` / `end` listeners.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ControlEvent {
    Start,
    End,
}

#[derive(Debug, Clone, Copy)]
struct VelocitySample {
    delta: Quat,
    dt: f64,
    at: Time,
}

#[derive(Debug, Clone)]
pub struct OrbitControls {
    options: ControlsOptions,
    /// Camera orbit rotation; the eye sits at `orientation * (0, 0, distance)`.
    orientation: Quat,
    distance: f64,
    target: Vec3,
    /// Per-frame (60 Hz) rotation carried after release.
    angular_velocity: Quat,
    inertia_active: bool,
    canvas: Vec2,
    dragging: bool,
    arcball_last: Option<Vec3>,
    last_move: Time,
    velocity_history: VecDeque<VelocitySample>,
    disposed: bool,
}

impl OrbitControls {
    pub fn new(distance: f64, options: ControlsOptions) -> Self {
        Self {
            options,
            orientation: Quat::IDENTITY,
            distance: distance.clamp(options.min_distance, options.max_distance),
            target: Vec3::ZERO,
            angular_velocity: Quat::IDENTITY,
            inertia_active: false,
            canvas: Vec2::new(1.0, 1.0),
            dragging: false,
            arcball_last: None,
            last_move: Time::ZERO,
            velocity_history: VecDeque::with_capacity(VELOCITY_HISTORY_SIZE),
            disposed: false,
        }
    }

    pub fn set_canvas_size(&mut self, width: f64, height: f64) {
        self.canvas = Vec2::new(width.max(1.0), height.max(1.0));
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn is_inertia_active(&self) -> bool {
        self.inertia_active
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    pub fn eye_position(&self) -> Vec3 {
        self.target + self.orientation.rotate(Vec3::new(0.0, 0.0, self.distance))
    }

    pub fn up(&self) -> Vec3 {
        self.orientation.rotate(Vec3::Y)
    }

    /// Point `camera` along the current orbit.
    pub fn apply_to(&self, camera: &mut Camera3D) {
        camera.position = self.eye_position();
        camera.target = self.target;
        camera.up = self.up();
    }

    pub fn pointer_down(&mut self, pos_px: Vec2, now: Time) -> Option<ControlEvent> {
        if self.disposed || self.dragging {
            return None;
        }
        self.stop_inertia();
        self.dragging = true;
        self.last_move = now;
        self.arcball_last = Some(self.screen_to_arcball(pos_px));
        Some(ControlEvent::Start)
    }

    /// Returns whether the camera moved.
    pub fn pointer_move(&mut self, pos_px: Vec2, now: Time) -> bool {
        if self.disposed || !self.dragging {
            return false;
        }
        let dt = now.since(self.last_move).max(1e-6);
        self.last_move = now;

        let next = self.screen_to_arcball(pos_px);
        let Some(prev) = self.arcball_last.replace(next) else {
            return false;
        };
        let delta = Quat::from_unit_vectors(prev, next);
        // The globe follows the pointer, so the camera turns the other way.
        self.orientation = self.orientation.mul(delta.conjugate()).normalize();

        self.velocity_history.push_back(VelocitySample { delta, dt, at: now });
        if self.velocity_history.len() > VELOCITY_HISTORY_SIZE {
            self.velocity_history.pop_front();
        }
        true
    }

    pub fn pointer_up(&mut self, now: Time) -> Option<ControlEvent> {
        if self.disposed || !self.dragging {
            return None;
        }
        self.angular_velocity = self.estimate_angular_velocity(now);
        self.inertia_active = self.options.damping_factor > 0.0
            && self.angular_velocity.angle() > ANGULAR_VELOCITY_THRESHOLD;

        self.dragging = false;
        self.arcball_last = None;
        self.velocity_history.clear();
        Some(ControlEvent::End)
    }

    /// Dolly by `delta` wheel units. Ignored unless zoom is enabled.
    pub fn wheel(&mut self, delta: f64) {
        if self.disposed || !self.options.enable_zoom {
            return;
        }
        let factor = (delta * 0.002).exp();
        self.distance =
            (self.distance * factor).clamp(self.options.min_distance, self.options.max_distance);
    }

    /// Advance inertia by `dt_s` seconds. Returns whether the camera moved.
    pub fn update(&mut self, dt_s: f64) -> bool {
        if self.disposed || !self.inertia_active || self.dragging {
            return false;
        }
        let frames = dt_s.clamp(0.0, MAX_STEP_S) * 60.0;
        if frames == 0.0 {
            return false;
        }

        let step = Quat::IDENTITY.slerp(self.angular_velocity, frames);
        self.orientation = self.orientation.mul(step.conjugate()).normalize();

        let decay = (1.0 - self.options.damping_factor).powf(frames);
        self.angular_velocity = Quat::IDENTITY.slerp(self.angular_velocity, decay);
        if self.angular_velocity.angle() < ANGULAR_VELOCITY_THRESHOLD {
            self.stop_inertia();
        }
        true
    }

    pub fn stop_inertia(&mut self) {
        self.inertia_active = false;
        self.angular_velocity = Quat::IDENTITY;
        self.velocity_history.clear();
    }

    /// Detach from input. Later events are ignored.
    pub fn dispose(&mut self) {
        self.stop_inertia();
        self.dragging = false;
        self.disposed = true;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn screen_to_arcball(&self, pos_px: Vec2) -> Vec3 {
        let min_dim = self.canvas.x.min(self.canvas.y);
        let nx = (2.0 * pos_px.x - self.canvas.x) / min_dim;
        let ny = (self.canvas.y - 2.0 * pos_px.y) / min_dim;

        let r2 = nx * nx + ny * ny;
        let v = if r2 <= 1.0 {
            Vec3::new(nx, ny, (1.0 - r2).sqrt())
        } else {
            Vec3::new(nx, ny, 0.0)
        };
        v.normalized().unwrap_or(Vec3::Z)
    }

    /// Average rotation per 60 Hz frame over the recent drag samples.
    fn estimate_angular_velocity(&self, now: Time) -> Quat {
        let mut total = Quat::IDENTITY;
        let mut total_dt = 0.0;
        for sample in &self.velocity_history {
            if now.since(sample.at) > VELOCITY_WINDOW_S {
                continue;
            }
            total = sample.delta.mul(total).normalize();
            total_dt += sample.dt;
        }
        if total_dt <= 0.0 {
            return Quat::IDENTITY;
        }
        Quat::IDENTITY.slerp(total, (1.0 / 60.0) / total_dt)
    }
}
