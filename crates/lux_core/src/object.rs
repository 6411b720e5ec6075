//! Scene objects: geometry, material constants and the owned surface cache.
//!
//! Geometry is a closed set of variants (implicit sphere, indexed triangle
//! mesh) behind one struct, so intersection dispatch is a plain `match`.
//! Every object owns the `SurfaceGrid` for its discretized parametric
//! domain; grid resolution is derived from a density constant scaled by
//! object size and, for the angular grids, by material reflectivity -
//! view-dependent materials get finer direction sampling, purely diffuse
//! materials get none.

use log::debug;
use lux_math::{dir_to_spherical_deg, spherical_deg_to_dir, Ray, Vec2, Vec3};

use crate::options::RAY_CAST_DENSITY;
use crate::surface::SurfaceGrid;

/// Material classes driving transport dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialKind {
    /// Phong diffuse + glossy highlight; terminal for forward transport.
    DiffuseGlossy,
    /// Pure mirror with a fixed reflectivity constant.
    Reflective,
    /// Dielectric split by the Fresnel equations.
    ReflectiveRefractive,
}

/// Diffuse color source for a surface point.
#[derive(Debug, Clone, Copy)]
pub enum Albedo {
    Solid(Vec3),
    /// Procedural checker over the parametric coordinate.
    Checkerboard,
}

const CHECKER_MAP_RATIO: f32 = 5.0;
const CHECKER_A: Vec3 = Vec3::new(0.815, 0.235, 0.031);
const CHECKER_B: Vec3 = Vec3::new(0.937, 0.937, 0.231);

/// Geometry-level intersection result.
#[derive(Debug, Clone, Copy)]
pub struct GeomHit {
    /// Distance along the ray, in units of the ray direction's length.
    pub t: f32,
    /// World-space hit point.
    pub point: Vec3,
    /// 2D surface parameter (sphere: polar degrees, mesh: st coordinate).
    pub map_idx: Vec2,
    /// Surface cell containing the hit point.
    pub cell: (u32, u32),
}

/// Indexed triangle mesh with per-vertex texture coordinates.
#[derive(Debug, Clone)]
pub struct TriangleMesh {
    vertices: Vec<Vec3>,
    indices: Vec<u32>,
    st: Vec<Vec2>,
}

#[derive(Debug, Clone)]
pub enum Geometry {
    Sphere { center: Vec3, radius: f32 },
    Mesh(TriangleMesh),
}

/// A renderable object: geometry variant, material constants and the
/// owned radiance caches.
#[derive(Debug, Clone)]
pub struct Object {
    pub name: String,
    pub material: MaterialKind,
    /// Index of refraction (dielectrics).
    pub ior: f32,
    /// Diffuse reflectance factor.
    pub kd: f32,
    /// Specular reflectance factor.
    pub ks: f32,
    pub specular_exponent: f32,
    pub albedo: Albedo,
    pub geometry: Geometry,
    pub surfaces: SurfaceGrid,
    /// When set, render passes record the ray trees rooted at this
    /// object's surface cells.
    pub recorder_enabled: bool,
}

/// Sampling ratios for a material: cell density multiplier and hemisphere
/// bucket ratio.
fn sampling_ratios(material: MaterialKind, amp_scale: f32) -> (f32, f32) {
    match material {
        MaterialKind::DiffuseGlossy => (RAY_CAST_DENSITY, 0.0),
        _ => (amp_scale * RAY_CAST_DENSITY, RAY_CAST_DENSITY),
    }
}

impl Object {
    /// Create a sphere object; the surface grid spans the full polar
    /// parametrization (`theta` in [0,180], `phi` in [0,360)), scaled by
    /// the radius.
    pub fn sphere(
        name: impl Into<String>,
        material: MaterialKind,
        center: Vec3,
        radius: f32,
    ) -> Self {
        let (amp_ratio, angle_ratio) = sampling_ratios(material, 4.0);
        let v_res = (((180.0 + 1.0) * amp_ratio * radius) as u32).max(1);
        let h_res = ((360.0 * amp_ratio * radius) as u32).max(1);
        let mut object = Self {
            name: name.into(),
            material,
            ior: 1.3,
            kd: 0.1,
            ks: 0.2,
            specular_exponent: 25.0,
            albedo: Albedo::Solid(Vec3::splat(0.2)),
            geometry: Geometry::Sphere { center, radius },
            surfaces: SurfaceGrid::new(v_res, h_res, angle_ratio),
            recorder_enabled: false,
        };
        object.reset();
        object.log_grid_stats();
        object
    }

    /// Create a triangle-mesh object; the surface grid spans the
    /// parallelogram of the first triangle's edges, sized by their squared
    /// lengths.
    pub fn mesh(
        name: impl Into<String>,
        material: MaterialKind,
        vertices: Vec<Vec3>,
        indices: Vec<u32>,
        st: Vec<Vec2>,
    ) -> Self {
        let (amp_ratio, angle_ratio) = sampling_ratios(material, 2.0);
        let e0 = vertices[indices[1] as usize] - vertices[indices[0] as usize];
        let e1 = vertices[indices[2] as usize] - vertices[indices[0] as usize];
        let v_res = ((amp_ratio * e0.length_squared()) as u32).max(1);
        let h_res = ((amp_ratio * e1.length_squared()) as u32).max(1);
        let mut object = Self {
            name: name.into(),
            material,
            ior: 1.3,
            kd: 0.1,
            ks: 0.2,
            specular_exponent: 25.0,
            albedo: Albedo::Checkerboard,
            geometry: Geometry::Mesh(TriangleMesh {
                vertices,
                indices,
                st,
            }),
            surfaces: SurfaceGrid::new(v_res, h_res, angle_ratio),
            recorder_enabled: false,
        };
        object.reset();
        object.log_grid_stats();
        object
    }

    fn log_grid_stats(&self) {
        let (v_res, h_res) = (self.surfaces.v_res(), self.surfaces.h_res());
        let (va_res, ha_res) = self.surfaces.angle_res();
        let cells = u64::from(v_res) * u64::from(h_res);
        debug!(
            "object {}: {} surface cells ({}x{}), {} angle buckets per cell ({}x{}), {} precompute rays",
            self.name,
            cells,
            v_res,
            h_res,
            u64::from(va_res) * u64::from(ha_res),
            va_res,
            ha_res,
            cells + cells * u64::from(va_res) * u64::from(ha_res),
        );
    }

    pub fn with_ior(mut self, ior: f32) -> Self {
        self.ior = ior;
        self
    }

    pub fn with_kd(mut self, kd: f32) -> Self {
        self.kd = kd;
        self
    }

    pub fn with_ks(mut self, ks: f32) -> Self {
        self.ks = ks;
        self
    }

    pub fn with_albedo(mut self, albedo: Albedo) -> Self {
        self.albedo = albedo;
        self
    }

    pub fn with_recorder(mut self) -> Self {
        self.recorder_enabled = true;
        self
    }

    /// Rebuild every surface cell's normal, center and frame and clear the
    /// radiance caches. Callable repeatedly between independent render
    /// configurations.
    pub fn reset(&mut self) {
        let (v_res, h_res) = (self.surfaces.v_res(), self.surfaces.h_res());
        match &self.geometry {
            Geometry::Sphere { center, radius } => {
                for v in 0..v_res {
                    for h in 0..h_res {
                        let theta = 180.0 * v as f32 / v_res as f32;
                        let phi = 360.0 * h as f32 / h_res as f32;
                        let normal = spherical_deg_to_dir(theta, phi);
                        let cell_center = *center + normal * *radius;
                        self.surfaces.cell_mut(v, h).reset(normal, cell_center);
                    }
                }
            }
            Geometry::Mesh(mesh) => {
                let v0 = mesh.vertices[mesh.indices[0] as usize];
                let e0 = mesh.vertices[mesh.indices[1] as usize] - v0;
                let e1 = mesh.vertices[mesh.indices[2] as usize] - v0;
                let normal = e0.normalize().cross(e1.normalize()).normalize();
                for v in 0..v_res {
                    for h in 0..h_res {
                        let cell_center = v0
                            + e0 * (h as f32 / h_res as f32)
                            + e1 * (v as f32 / v_res as f32);
                        self.surfaces.cell_mut(v, h).reset(normal, cell_center);
                    }
                }
            }
        }
    }

    /// World center of surface cell `(v, h)` (wrapping).
    pub fn surface_point(&self, v: u32, h: u32) -> Vec3 {
        self.surfaces.cell(v, h).center
    }

    /// Nearest intersection of the ray with this object's geometry.
    pub fn intersect(&self, ray: &Ray) -> Option<GeomHit> {
        match &self.geometry {
            Geometry::Sphere { center, radius } => self.intersect_sphere(ray, *center, *radius),
            Geometry::Mesh(mesh) => self.intersect_mesh(ray, mesh),
        }
    }

    fn intersect_sphere(&self, ray: &Ray, center: Vec3, radius: f32) -> Option<GeomHit> {
        let l = ray.origin - center;
        let a = ray.direction.dot(ray.direction);
        let b = 2.0 * ray.direction.dot(l);
        let c = l.dot(l) - radius * radius;
        let (t0, t1) = solve_quadratic(a, b, c)?;
        let t = if t0 < 0.0 { t1 } else { t0 };
        if t < 0.0 {
            return None;
        }

        let point = ray.at(t);
        let normal = (point - center).normalize();
        let (theta, phi) = dir_to_spherical_deg(normal);
        let v_res = self.surfaces.v_res();
        let h_res = self.surfaces.h_res();
        let v = (theta / 181.0 * v_res as f32).floor() as u32;
        let h = (phi / 360.0 * h_res as f32).floor() as u32;
        Some(GeomHit {
            t,
            point,
            map_idx: Vec2::new(theta, phi),
            cell: (v, h),
        })
    }

    fn intersect_mesh(&self, ray: &Ray, mesh: &TriangleMesh) -> Option<GeomHit> {
        let mut nearest: Option<(f32, usize, f32, f32)> = None;
        for (k, tri) in mesh.indices.chunks_exact(3).enumerate() {
            let v0 = mesh.vertices[tri[0] as usize];
            let v1 = mesh.vertices[tri[1] as usize];
            let v2 = mesh.vertices[tri[2] as usize];
            if let Some((t, u, v)) = ray_triangle_intersect(v0, v1, v2, ray) {
                if nearest.map_or(true, |(tn, ..)| t < tn) {
                    nearest = Some((t, k, u, v));
                }
            }
        }

        let (t, k, u, v) = nearest?;
        let tri = &mesh.indices[k * 3..k * 3 + 3];
        let st0 = mesh.st[tri[0] as usize];
        let st1 = mesh.st[tri[1] as usize];
        let st2 = mesh.st[tri[2] as usize];
        let st = st0 * (1.0 - u - v) + st1 * u + st2 * v;
        let v_res = self.surfaces.v_res();
        let h_res = self.surfaces.h_res();
        let cell_v = (st.y * v_res as f32).floor() as u32;
        let cell_h = (st.x * h_res as f32).floor() as u32;
        Some(GeomHit {
            t,
            point: ray.at(t),
            map_idx: st,
            cell: (cell_v, cell_h),
        })
    }

    /// Diffuse color at a parametric coordinate.
    pub fn eval_diffuse_color(&self, map_idx: Vec2) -> Vec3 {
        match self.albedo {
            Albedo::Solid(color) => color,
            Albedo::Checkerboard => {
                let pattern = ((map_idx.x * CHECKER_MAP_RATIO).rem_euclid(1.0) > 0.5)
                    ^ ((map_idx.y * CHECKER_MAP_RATIO).rem_euclid(1.0) > 0.5);
                if pattern {
                    CHECKER_B
                } else {
                    CHECKER_A
                }
            }
        }
    }

    /// Convert a point from the object's local parametrization to world
    /// space (sphere: unit-sphere relative; mesh: identity).
    pub fn point_to_world(&self, local: Vec3) -> Vec3 {
        match &self.geometry {
            Geometry::Sphere { center, radius } => *center + local * *radius,
            Geometry::Mesh(_) => local,
        }
    }

    /// Inverse of [`point_to_world`](Self::point_to_world).
    pub fn point_to_local(&self, world: Vec3) -> Vec3 {
        match &self.geometry {
            Geometry::Sphere { center, radius } => (world - *center) / *radius,
            Geometry::Mesh(_) => world,
        }
    }
}

/// Stable quadratic roots, ordered `x0 <= x1`. `None` when the
/// discriminant is negative or the equation is degenerate.
fn solve_quadratic(a: f32, b: f32, c: f32) -> Option<(f32, f32)> {
    if a.abs() < f32::EPSILON {
        return None;
    }
    let discr = b * b - 4.0 * a * c;
    if discr < 0.0 {
        return None;
    }
    if discr == 0.0 {
        let x = -0.5 * b / a;
        return Some((x, x));
    }
    let q = if b > 0.0 {
        -0.5 * (b + discr.sqrt())
    } else {
        -0.5 * (b - discr.sqrt())
    };
    let x0 = q / a;
    let x1 = c / q;
    Some(if x0 <= x1 { (x0, x1) } else { (x1, x0) })
}

/// Moeller-Trumbore ray-triangle intersection with backface culling.
///
/// Returns `(t, u, v)` on a front-face hit in front of the origin; near-zero
/// or negative determinants are ordinary "no intersection" results.
fn ray_triangle_intersect(v0: Vec3, v1: Vec3, v2: Vec3, ray: &Ray) -> Option<(f32, f32, f32)> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    let pvec = ray.direction.cross(edge2);
    let det = edge1.dot(pvec);
    if det <= f32::EPSILON {
        return None;
    }

    let tvec = ray.origin - v0;
    let u = tvec.dot(pvec);
    if u < 0.0 || u > det {
        return None;
    }

    let qvec = tvec.cross(edge1);
    let v = ray.direction.dot(qvec);
    if v < 0.0 || u + v > det {
        return None;
    }

    let inv_det = 1.0 / det;
    let t = edge2.dot(qvec) * inv_det;
    if t < 0.0 {
        return None;
    }
    Some((t, u * inv_det, v * inv_det))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_quad(material: MaterialKind) -> Object {
        // Quad in the XZ plane at y = 0, facing +Y.
        let vertices = vec![
            Vec3::new(-2.0, 0.0, 2.0),
            Vec3::new(2.0, 0.0, 2.0),
            Vec3::new(2.0, 0.0, -2.0),
            Vec3::new(-2.0, 0.0, -2.0),
        ];
        let indices = vec![0, 1, 3, 1, 2, 3];
        let st = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ];
        Object::mesh("quad", material, vertices, indices, st)
    }

    #[test]
    fn test_sphere_hit_distance() {
        let sphere = Object::sphere(
            "sph",
            MaterialKind::DiffuseGlossy,
            Vec3::new(0.0, 0.0, -3.0),
            1.0,
        );
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));
        let hit = sphere.intersect(&ray).unwrap();
        assert!((hit.t - 2.0).abs() < 1e-4);
        assert!((hit.point - Vec3::new(0.0, 0.0, -2.0)).length() < 1e-4);
    }

    #[test]
    fn test_sphere_miss() {
        let sphere = Object::sphere(
            "sph",
            MaterialKind::DiffuseGlossy,
            Vec3::new(0.0, 0.0, -3.0),
            1.0,
        );
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 1.0, 0.0));
        assert!(sphere.intersect(&ray).is_none());
    }

    #[test]
    fn test_sphere_behind_origin_misses() {
        let sphere = Object::sphere(
            "sph",
            MaterialKind::DiffuseGlossy,
            Vec3::new(0.0, 0.0, 3.0),
            1.0,
        );
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));
        assert!(sphere.intersect(&ray).is_none());
    }

    #[test]
    fn test_diffuse_sphere_has_no_angle_grid() {
        let sphere = Object::sphere("sph", MaterialKind::DiffuseGlossy, Vec3::ZERO, 2.0);
        assert_eq!(sphere.surfaces.angle_res(), (0, 0));
    }

    #[test]
    fn test_reflective_sphere_has_angle_grid() {
        let sphere = Object::sphere("sph", MaterialKind::Reflective, Vec3::ZERO, 0.1);
        let (va, ha) = sphere.surfaces.angle_res();
        assert!(va > 0 && ha > 0);
    }

    #[test]
    fn test_mesh_hit_front_face() {
        let quad = unit_quad(MaterialKind::DiffuseGlossy);
        let ray = Ray::new(Vec3::new(0.0, 2.0, 0.0), Vec3::new(0.0, -1.0, 0.0));
        let hit = quad.intersect(&ray).unwrap();
        assert!((hit.t - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_mesh_backface_culled() {
        let quad = unit_quad(MaterialKind::DiffuseGlossy);
        // Approaching from below hits only back faces.
        let ray = Ray::new(Vec3::new(0.0, -2.0, 0.0), Vec3::new(0.0, 1.0, 0.0));
        assert!(quad.intersect(&ray).is_none());
    }

    #[test]
    fn test_mesh_normals_face_up() {
        let quad = unit_quad(MaterialKind::DiffuseGlossy);
        let n = quad.surfaces.cell(0, 0).normal;
        assert!((n - Vec3::Y).length() < 1e-4);
    }

    #[test]
    fn test_checkerboard_alternates() {
        let quad = unit_quad(MaterialKind::DiffuseGlossy);
        let a = quad.eval_diffuse_color(Vec2::new(0.05, 0.05));
        let b = quad.eval_diffuse_color(Vec2::new(0.15, 0.05));
        assert_ne!(a, b);
    }

    #[test]
    fn test_point_round_trip() {
        let sphere = Object::sphere(
            "sph",
            MaterialKind::DiffuseGlossy,
            Vec3::new(1.0, 2.0, 3.0),
            2.0,
        );
        let p = Vec3::new(3.0, 2.0, 3.0);
        let back = sphere.point_to_world(sphere.point_to_local(p));
        assert!((back - p).length() < 1e-5);
    }

    #[test]
    fn test_solve_quadratic() {
        // x^2 - 3x + 2 = 0
        let (x0, x1) = solve_quadratic(1.0, -3.0, 2.0).unwrap();
        assert!((x0 - 1.0).abs() < 1e-6);
        assert!((x1 - 2.0).abs() < 1e-6);
        // No real roots
        assert!(solve_quadratic(1.0, 0.0, 1.0).is_none());
        // Degenerate
        assert!(solve_quadratic(0.0, 1.0, 1.0).is_none());
    }
}
