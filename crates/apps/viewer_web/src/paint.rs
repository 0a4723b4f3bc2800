//! Canvas2D rendition of a [`RenderFrame`].
//!
//! The globe's own shell hides whatever lies behind it, so anything past the
//! horizon as seen from the camera is skipped instead of depth-tested.

use foundation::math::{GLOBE_RADIUS, Quat, Vec2, Vec3};
use gpu::{Camera3D, RenderCommand, RenderFrame};
use web_sys::CanvasRenderingContext2d;

struct Painter<'a> {
    ctx: &'a CanvasRenderingContext2d,
    camera: &'a Camera3D,
    width: f64,
    height: f64,
}

impl Painter<'_> {
    fn to_pixels(&self, p: Vec3) -> Option<Vec2> {
        let ndc = self.camera.project_to_ndc(p)?;
        Some(Vec2::new(
            (ndc.x + 1.0) * 0.5 * self.width,
            (1.0 - ndc.y) * 0.5 * self.height,
        ))
    }

    fn in_front_of_globe(&self, p: Vec3) -> bool {
        p.dot(self.camera.position) >= GLOBE_RADIUS * GLOBE_RADIUS
    }

    fn segment(&self, a: Vec3, b: Vec3) {
        if !(self.in_front_of_globe(a) && self.in_front_of_globe(b)) {
            return;
        }
        if let (Some(pa), Some(pb)) = (self.to_pixels(a), self.to_pixels(b)) {
            self.ctx.move_to(pa.x, pa.y);
            self.ctx.line_to(pb.x, pb.y);
        }
    }

    fn wire_sphere(&self, center: Vec3, radius: f64, widths: u32, heights: u32, orientation: Quat) {
        let point = |u: u32, v: u32| {
            let phi = std::f64::consts::TAU * f64::from(u) / f64::from(widths.max(1));
            let theta = std::f64::consts::PI * f64::from(v) / f64::from(heights.max(1));
            let local = Vec3::new(
                -radius * phi.cos() * theta.sin(),
                radius * theta.cos(),
                radius * phi.sin() * theta.sin(),
            );
            center + orientation.rotate(local)
        };
        for v in 0..=heights {
            for u in 0..widths {
                self.segment(point(u, v), point(u + 1, v));
            }
        }
        for u in 0..widths {
            for v in 0..heights {
                self.segment(point(u, v), point(u, v + 1));
            }
        }
    }

    fn disc(&self, center: Vec3, radius: f64) {
        if !self.in_front_of_globe(center) {
            return;
        }
        let Some(basis) = self.camera.basis() else {
            return;
        };
        let (Some(c), Some(edge)) = (
            self.to_pixels(center),
            self.to_pixels(center + basis.right.scale(radius)),
        ) else {
            return;
        };
        let d = edge - c;
        let r = d.x.hypot(d.y).max(1.0);
        self.ctx.move_to(c.x + r, c.y);
        let _ = self.ctx.arc(c.x, c.y, r, 0.0, std::f64::consts::TAU);
    }

    fn command(&self, command: &RenderCommand) {
        let material = command.material();
        let css = material.color.to_string();
        self.ctx.set_global_alpha(material.opacity);
        self.ctx.begin_path();
        match command {
            RenderCommand::Sphere {
                center,
                radius,
                width_segments,
                height_segments,
                orientation,
                ..
            } if material.wireframe => {
                self.wire_sphere(*center, *radius, *width_segments, *height_segments, *orientation);
                self.ctx.set_stroke_style_str(&css);
                self.ctx.stroke();
            }
            RenderCommand::Sphere { center, radius, .. } => {
                self.disc(*center, *radius);
                self.ctx.set_fill_style_str(&css);
                self.ctx.fill();
            }
            RenderCommand::Lines { segments, .. } => {
                for (a, b) in segments {
                    self.segment(*a, *b);
                }
                self.ctx.set_stroke_style_str(&css);
                self.ctx.stroke();
            }
            RenderCommand::Triangles { triangles, .. } => {
                for tri in triangles {
                    if !tri.iter().all(|p| self.in_front_of_globe(*p)) {
                        continue;
                    }
                    let (Some(a), Some(b), Some(c)) = (
                        self.to_pixels(tri[0]),
                        self.to_pixels(tri[1]),
                        self.to_pixels(tri[2]),
                    ) else {
                        continue;
                    };
                    self.ctx.move_to(a.x, a.y);
                    self.ctx.line_to(b.x, b.y);
                    self.ctx.line_to(c.x, c.y);
                    self.ctx.close_path();
                }
                self.ctx.set_fill_style_str(&css);
                self.ctx.fill();
            }
        }
    }
}

pub fn paint(ctx: &CanvasRenderingContext2d, frame: &RenderFrame, camera: &Camera3D) {
    let (w, h) = frame.buffer_size;
    let painter = Painter {
        ctx,
        camera,
        width: f64::from(w),
        height: f64::from(h),
    };

    ctx.clear_rect(0.0, 0.0, painter.width, painter.height);
    let [r, g, b, a] = frame.clear_color;
    if a > 0.0 {
        ctx.set_global_alpha(f64::from(a));
        ctx.set_fill_style_str(&format!(
            "rgb({}, {}, {})",
            (r * 255.0) as u8,
            (g * 255.0) as u8,
            (b * 255.0) as u8
        ));
        ctx.fill_rect(0.0, 0.0, painter.width, painter.height);
    }

    ctx.set_line_width((painter.width / 800.0).max(1.0));
    for command in &frame.commands {
        painter.command(command);
    }
    ctx.set_global_alpha(1.0);
}
