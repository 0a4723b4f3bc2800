use foundation::color::Rgb;
use foundation::handles::Handle;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct MaterialId(pub Handle);

/// Which triangle faces render and take part in picking.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Side {
    #[default]
    Front,
    Back,
    Double,
}

/// Unlit material shared by meshes and lines.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Material {
    pub color: Rgb,
    pub opacity: f64,
    pub transparent: bool,
    pub wireframe: bool,
    pub depth_write: bool,
    pub side: Side,
}

impl Material {
    pub fn basic(color: Rgb) -> Self {
        Self {
            color,
            opacity: 1.0,
            transparent: false,
            wireframe: false,
            depth_write: true,
            side: Side::Front,
        }
    }

    /// Sets the opacity and marks the material transparent.
    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self.transparent = true;
        self
    }

    pub fn wireframe(mut self) -> Self {
        self.wireframe = true;
        self
    }

    pub fn double_sided(mut self) -> Self {
        self.side = Side::Double;
        self
    }

    pub fn without_depth_write(mut self) -> Self {
        self.depth_write = false;
        self
    }
}
