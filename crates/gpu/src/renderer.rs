use std::sync::atomic::{AtomicU64, Ordering};

use foundation::color::Rgb;
use foundation::math::precision::stable_total_cmp_f64;
use foundation::math::{Quat, Vec3};
use scene::components::{Geometry, Material, NodeKind};
use scene::{NodeId, World};

use crate::camera::Camera3D;

static NEXT_SURFACE: AtomicU64 = AtomicU64::new(1);

/// Identity of the drawing surface a renderer owns; hosts attach it to their
/// container element and detach it again on teardown.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub u64);

impl SurfaceId {
    fn next() -> Self {
        SurfaceId(NEXT_SURFACE.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RendererOptions {
    pub antialias: bool,
    /// Surface keeps an alpha channel so the page shows through.
    pub alpha: bool,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            antialias: true,
            alpha: true,
        }
    }
}

/// One draw in world space.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    Sphere {
        node: NodeId,
        center: Vec3,
        radius: f64,
        width_segments: u32,
        height_segments: u32,
        orientation: Quat,
        material: Material,
    },
    Lines {
        node: NodeId,
        segments: Vec<(Vec3, Vec3)>,
        material: Material,
    },
    Triangles {
        node: NodeId,
        triangles: Vec<[Vec3; 3]>,
        material: Material,
    },
}

impl RenderCommand {
    pub fn node(&self) -> NodeId {
        match self {
            RenderCommand::Sphere { node, .. }
            | RenderCommand::Lines { node, .. }
            | RenderCommand::Triangles { node, .. } => *node,
        }
    }

    pub fn material(&self) -> &Material {
        match self {
            RenderCommand::Sphere { material, .. }
            | RenderCommand::Lines { material, .. }
            | RenderCommand::Triangles { material, .. } => material,
        }
    }

    /// Representative world-space point used for depth sorting.
    fn anchor(&self) -> Vec3 {
        match self {
            RenderCommand::Sphere { center, .. } => *center,
            RenderCommand::Lines { segments, .. } => {
                centroid(segments.iter().flat_map(|(a, b)| [*a, *b]))
            }
            RenderCommand::Triangles { triangles, .. } => {
                centroid(triangles.iter().flatten().copied())
            }
        }
    }
}

fn centroid(points: impl Iterator<Item = Vec3>) -> Vec3 {
    let mut sum = Vec3::ZERO;
    let mut n = 0usize;
    for p in points {
        sum = sum + p;
        n += 1;
    }
    if n == 0 { sum } else { sum.scale(1.0 / n as f64) }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct RenderStats {
    pub spheres: usize,
    pub line_segments: usize,
    pub triangles: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderFrame {
    /// Linear RGBA.
    pub clear_color: [f32; 4],
    /// Sum of all ambient lights in the scene.
    pub ambient: [f32; 3],
    /// Drawing-buffer size in device pixels.
    pub buffer_size: (u32, u32),
    /// Opaque draws first, then transparent draws back to front.
    pub commands: Vec<RenderCommand>,
}

impl RenderFrame {
    pub fn stats(&self) -> RenderStats {
        let mut stats = RenderStats::default();
        for cmd in &self.commands {
            match cmd {
                RenderCommand::Sphere { .. } => stats.spheres += 1,
                RenderCommand::Lines { segments, .. } => stats.line_segments += segments.len(),
                RenderCommand::Triangles { triangles, .. } => stats.triangles += triangles.len(),
            }
        }
        stats
    }
}

/// Turns a [`World`] into a flat list of world-space draw commands for a
/// single surface.
#[derive(Debug)]
pub struct Renderer {
    surface: SurfaceId,
    options: RendererOptions,
    size: (u32, u32),
    pixel_ratio: f64,
    clear_color: Rgb,
    clear_alpha: f32,
    frames_rendered: u64,
    disposed: bool,
}

impl Renderer {
    pub fn new(options: RendererOptions) -> Self {
        let surface = SurfaceId::next();
        tracing::debug!(surface = surface.0, ?options, "renderer created");
        Self {
            surface,
            options,
            size: (0, 0),
            pixel_ratio: 1.0,
            clear_color: Rgb::BLACK,
            clear_alpha: 0.0,
            frames_rendered: 0,
            disposed: false,
        }
    }

    pub fn surface(&self) -> SurfaceId {
        self.surface
    }

    /// Logical (CSS pixel) size.
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn set_pixel_ratio(&mut self, ratio: f64) {
        self.pixel_ratio = if ratio.is_finite() && ratio > 0.0 { ratio } else { 1.0 };
    }

    pub fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    pub fn drawing_buffer_size(&self) -> (u32, u32) {
        let scale = |v: u32| (f64::from(v) * self.pixel_ratio).round() as u32;
        (scale(self.size.0), scale(self.size.1))
    }

    pub fn set_clear_color(&mut self, color: Rgb, alpha: f32) {
        self.clear_color = color;
        self.clear_alpha = if self.options.alpha { alpha.clamp(0.0, 1.0) } else { 1.0 };
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Releases the surface. Later `render` calls produce empty frames.
    pub fn dispose(&mut self) {
        if !self.disposed {
            tracing::debug!(
                surface = self.surface.0,
                frames = self.frames_rendered,
                "renderer disposed"
            );
            self.disposed = true;
        }
    }

    pub fn render(&mut self, world: &World, camera: &Camera3D) -> RenderFrame {
        let [r, g, b] = self.clear_color.to_unit();
        let mut frame = RenderFrame {
            clear_color: [r, g, b, self.clear_alpha],
            ambient: [0.0; 3],
            buffer_size: self.drawing_buffer_size(),
            commands: Vec::new(),
        };
        if self.disposed {
            tracing::warn!(surface = self.surface.0, "render on disposed renderer");
            return frame;
        }

        for &root in world.roots() {
            for id in world.descendants(root) {
                if !world.is_visible(id) {
                    continue;
                }
                let Some(node) = world.node(id) else { continue };
                match node.kind {
                    NodeKind::Group => {}
                    NodeKind::AmbientLight { color, intensity } => {
                        let c = color.to_unit();
                        for (acc, v) in frame.ambient.iter_mut().zip(c) {
                            *acc += v * intensity as f32;
                        }
                    }
                    NodeKind::Mesh { .. } | NodeKind::Line { .. } => {
                        if let Some(cmd) = collect_drawable(world, id, node.kind) {
                            frame.commands.push(cmd);
                        }
                    }
                }
            }
        }

        sort_for_blending(&mut frame.commands, camera);
        self.frames_rendered += 1;
        frame
    }
}

fn collect_drawable(world: &World, id: NodeId, kind: NodeKind) -> Option<RenderCommand> {
    let (geometry_id, material_id) = kind.resources()?;
    let (Some(geometry), Some(material)) =
        (world.geometry(geometry_id), world.material(material_id))
    else {
        tracing::warn!(node = id.index(), "drawable references a disposed resource");
        return None;
    };
    let material = *material;
    let to_world = |p: Vec3| world.local_to_world(id, p);

    let cmd = match (kind, geometry) {
        (NodeKind::Line { .. }, g) => RenderCommand::Lines {
            node: id,
            segments: g
                .segments()
                .into_iter()
                .map(|(a, b)| Some((to_world(a)?, to_world(b)?)))
                .collect::<Option<_>>()?,
            material,
        },
        (
            _,
            Geometry::Sphere {
                radius,
                width_segments,
                height_segments,
            },
        ) => RenderCommand::Sphere {
            node: id,
            center: to_world(Vec3::ZERO)?,
            radius: radius * world.world_scale(id)?.abs(),
            width_segments: *width_segments,
            height_segments: *height_segments,
            orientation: world.world_rotation(id)?,
            material,
        },
        (_, Geometry::Triangles { vertices, indices }) => {
            let verts: Vec<Vec3> = vertices.iter().map(|v| to_world(*v)).collect::<Option<_>>()?;
            let triangles = indices
                .iter()
                .filter_map(|[a, b, c]| {
                    Some([
                        *verts.get(*a as usize)?,
                        *verts.get(*b as usize)?,
                        *verts.get(*c as usize)?,
                    ])
                })
                .collect();
            RenderCommand::Triangles {
                node: id,
                triangles,
                material,
            }
        }
        (_, Geometry::Polyline { .. }) => RenderCommand::Lines {
            node: id,
            segments: geometry
                .segments()
                .into_iter()
                .map(|(a, b)| Some((to_world(a)?, to_world(b)?)))
                .collect::<Option<_>>()?,
            material,
        },
    };
    Some(cmd)
}

/// Opaque commands keep scene order; transparent ones follow, farthest first.
fn sort_for_blending(commands: &mut [RenderCommand], camera: &Camera3D) {
    let depth = |cmd: &RenderCommand| camera.depth_of(cmd.anchor()).unwrap_or(0.0);
    commands.sort_by(|a, b| {
        let (ta, tb) = (a.material().transparent, b.material().transparent);
        ta.cmp(&tb).then_with(|| {
            if ta && tb {
                stable_total_cmp_f64(depth(b), depth(a))
            } else {
                std::cmp::Ordering::Equal
            }
        })
    });
}
