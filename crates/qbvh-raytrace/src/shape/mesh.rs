//! Indexed triangle mesh.

use qbvh_math::{is_zero, normalize_checked, orthonormal_basis, Aabb, Point2, Point3, Vec3};

use super::{Shape, TriangleSoa};
use crate::error::MeshError;
use crate::intersect::{ray_triangle, TriangleHit};
use crate::{Intersection, Ray};

/// Texture coordinates used when a mesh has none.
fn default_texcoords() -> [Point2; 3] {
    [
        Point2::new(0.0, 0.0),
        Point2::new(1.0, 0.0),
        Point2::new(1.0, 1.0),
    ]
}

/// Indexed triangle mesh with optional per-vertex normals and texcoords.
///
/// Triangles wind counter-clockwise around their front face; only front
/// faces are hit.
#[derive(Debug, Clone)]
pub struct TriangleMesh {
    points: Vec<Point3>,
    triangles: Vec<[u32; 3]>,
    normals: Option<Vec<Vec3>>,
    texcoords: Option<Vec<Point2>>,
    bounds: Aabb,
}

impl TriangleMesh {
    /// Create a mesh, checking indices and attribute lengths.
    pub fn new(
        points: Vec<Point3>,
        triangles: Vec<[u32; 3]>,
        normals: Option<Vec<Vec3>>,
        texcoords: Option<Vec<Point2>>,
    ) -> Result<Self, MeshError> {
        check_triangle_count(triangles.len())?;
        let vertex_count = points.len();
        for (triangle, indices) in triangles.iter().enumerate() {
            if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(MeshError::IndexOutOfRange {
                    triangle,
                    index,
                    vertex_count,
                });
            }
        }
        if let Some(normals) = &normals {
            check_attribute("normals", vertex_count, normals.len())?;
        }
        if let Some(texcoords) = &texcoords {
            check_attribute("texcoords", vertex_count, texcoords.len())?;
        }

        let bounds = Aabb::from_points(&points);
        Ok(Self {
            points,
            triangles,
            normals,
            texcoords,
            bounds,
        })
    }

    /// Axis-aligned box mesh with outward-facing triangles.
    pub fn cuboid(min: Point3, max: Point3) -> Self {
        // Vertex i takes max on axis k when bit k of i is set.
        let points = (0..8u32)
            .map(|i| {
                Point3::new(
                    if i & 1 != 0 { max.x } else { min.x },
                    if i & 2 != 0 { max.y } else { min.y },
                    if i & 4 != 0 { max.z } else { min.z },
                )
            })
            .collect();
        let triangles = vec![
            [0, 4, 6],
            [0, 6, 2],
            [1, 3, 7],
            [1, 7, 5],
            [0, 1, 5],
            [0, 5, 4],
            [2, 6, 7],
            [2, 7, 3],
            [0, 2, 3],
            [0, 3, 1],
            [4, 5, 7],
            [4, 7, 6],
        ];
        let bounds = Aabb::new(min, max);
        Self {
            points,
            triangles,
            normals: None,
            texcoords: None,
            bounds,
        }
    }

    /// Vertex positions.
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    /// Triangle vertex indices.
    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    /// Bounding box of the whole mesh.
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Area of one triangle.
    pub fn surface_area(&self, primitive: u32) -> f32 {
        let [p0, p1, p2] = self.vertices(primitive);
        0.5 * (p1 - p0).cross(&(p2 - p0)).norm()
    }

    /// Texture coordinates of one triangle's vertices.
    pub fn texcoords(&self, primitive: u32) -> [Point2; 3] {
        match &self.texcoords {
            Some(texcoords) => {
                let [i0, i1, i2] = self.triangles[primitive as usize];
                [
                    texcoords[i0 as usize],
                    texcoords[i1 as usize],
                    texcoords[i2 as usize],
                ]
            }
            None => default_texcoords(),
        }
    }

    #[inline]
    fn vertices(&self, primitive: u32) -> [&Point3; 3] {
        let [i0, i1, i2] = self.triangles[primitive as usize];
        [
            &self.points[i0 as usize],
            &self.points[i1 as usize],
            &self.points[i2 as usize],
        ]
    }
}

fn check_triangle_count(count: usize) -> Result<(), MeshError> {
    if i32::try_from(count).is_ok() {
        Ok(())
    } else {
        Err(MeshError::TooManyTriangles(count))
    }
}

fn check_attribute(attribute: &'static str, expected: usize, found: usize) -> Result<(), MeshError> {
    if expected == found {
        Ok(())
    } else {
        Err(MeshError::AttributeCount {
            attribute,
            expected,
            found,
        })
    }
}

impl Shape for TriangleMesh {
    fn primitive_count(&self) -> i32 {
        // Bounded by `check_triangle_count` at construction.
        self.triangles.len() as i32
    }

    fn bbox(&self, primitive: u32) -> Aabb {
        Aabb::from_points(self.vertices(primitive))
    }

    fn centroid(&self, primitive: u32) -> Point3 {
        let [p0, p1, p2] = self.vertices(primitive);
        Point3::from((p0.coords + p1.coords + p2.coords) * (1.0 / 3.0))
    }

    fn intersect(&self, primitive: u32, ray: &Ray) -> Option<TriangleHit> {
        let [p0, p1, p2] = self.vertices(primitive);
        ray_triangle(ray, p0, p1, p2)
    }

    fn vertices_soa(&self, lane: usize, primitive: u32, out: &mut TriangleSoa) {
        out.set_lane(lane, self.vertices(primitive));
    }

    fn fill_intersection(&self, out: &mut Intersection, ray: &Ray, u: f32, v: f32, primitive: u32) {
        let [p0, p1, p2] = self.vertices(primitive);
        let uvs = self.texcoords(primitive);
        let w = 1.0 - u - v;

        out.point = ray.at(ray.tmax);
        out.primitive = primitive;
        out.uv = Point2::from(uvs[0].coords * w + uvs[1].coords * u + uvs[2].coords * v);
        out.geometric_normal = normalize_checked(&(p1 - p0).cross(&(p2 - p0)));

        let (dn02, dn12) = match &self.normals {
            Some(normals) => {
                let [i0, i1, i2] = self.triangles[primitive as usize];
                let (n0, n1, n2) = (
                    normals[i0 as usize],
                    normals[i1 as usize],
                    normals[i2 as usize],
                );
                out.shading_normal = normalize_checked(&(n0 * w + n1 * u + n2 * v));
                (n0 - n2, n1 - n2)
            }
            None => {
                out.shading_normal = out.geometric_normal;
                (Vec3::zeros(), Vec3::zeros())
            }
        };

        // Solve dp = dpdu * du + dpdv * dv over the edges meeting at vertex 2.
        let duv02 = uvs[0] - uvs[2];
        let duv12 = uvs[1] - uvs[2];
        let dp02 = p0 - p2;
        let dp12 = p1 - p2;
        let det = duv02.x * duv12.y - duv02.y * duv12.x;
        if is_zero(det) {
            (out.dpdu, out.dpdv) = orthonormal_basis(&out.shading_normal);
            out.dndu = Vec3::zeros();
            out.dndv = Vec3::zeros();
        } else {
            let inv_det = 1.0 / det;
            out.dpdu = (dp02 * duv12.y - dp12 * duv02.y) * inv_det;
            out.dpdv = (dp12 * duv02.x - dp02 * duv12.x) * inv_det;
            out.dndu = (dn02 * duv12.y - dn12 * duv02.y) * inv_det;
            out.dndv = (dn12 * duv02.x - dn02 * duv12.x) * inv_det;
        }

        out.build_frame();
        out.compute_differentials(ray);
    }
}
