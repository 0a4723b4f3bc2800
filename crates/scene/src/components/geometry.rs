use foundation::handles::Handle;
use foundation::math::Vec3;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct GeometryId(pub Handle);

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// UV sphere centred on the node origin.
    Sphere {
        radius: f64,
        width_segments: u32,
        height_segments: u32,
    },
    /// Connected line strip; `closed` adds the segment from last back to first.
    Polyline { vertices: Vec<Vec3>, closed: bool },
    /// Indexed triangle list.
    Triangles {
        vertices: Vec<Vec3>,
        indices: Vec<[u32; 3]>,
    },
}

impl Geometry {
    pub fn sphere(radius: f64, width_segments: u32, height_segments: u32) -> Self {
        Geometry::Sphere {
            radius,
            width_segments: width_segments.max(3),
            height_segments: height_segments.max(2),
        }
    }

    pub fn line_loop(vertices: Vec<Vec3>) -> Self {
        Geometry::Polyline {
            vertices,
            closed: true,
        }
    }

    pub fn line_strip(vertices: Vec<Vec3>) -> Self {
        Geometry::Polyline {
            vertices,
            closed: false,
        }
    }

    pub fn vertex_count(&self) -> usize {
        match self {
            Geometry::Sphere {
                width_segments,
                height_segments,
                ..
            } => ((width_segments + 1) * (height_segments + 1)) as usize,
            Geometry::Polyline { vertices, .. } => vertices.len(),
            Geometry::Triangles { vertices, .. } => vertices.len(),
        }
    }

    /// Line segments in local space; empty for surfaces.
    pub fn segments(&self) -> Vec<(Vec3, Vec3)> {
        let Geometry::Polyline { vertices, closed } = self else {
            return Vec::new();
        };
        let mut out: Vec<(Vec3, Vec3)> = vertices.windows(2).map(|w| (w[0], w[1])).collect();
        if *closed && vertices.len() > 2 {
            out.push((vertices[vertices.len() - 1], vertices[0]));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::Geometry;
    use foundation::math::Vec3;

    #[test]
    fn sphere_clamps_segment_counts() {
        let g = Geometry::sphere(1.0, 1, 1);
        assert_eq!(
            g,
            Geometry::Sphere {
                radius: 1.0,
                width_segments: 3,
                height_segments: 2
            }
        );
        assert_eq!(g.vertex_count(), 12);
    }

    #[test]
    fn closed_polyline_wraps_around() {
        let tri = vec![Vec3::X, Vec3::Y, Vec3::Z];
        assert_eq!(Geometry::line_loop(tri.clone()).segments().len(), 3);
        assert_eq!(Geometry::line_strip(tri).segments().len(), 2);
    }
}
