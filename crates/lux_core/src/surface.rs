//! Per-surface-point radiance caches.
//!
//! Every object discretizes its parametric domain into a grid of `Surface`
//! cells. A cell accumulates direct-light irradiance during the light pass
//! and, for view-dependent materials, owns a nested `AngleGrid` of
//! precomputed exit-radiance colors over the outgoing hemisphere
//! (`theta` in [0,90), `phi` in [0,360) in the cell's local frame).
//!
//! Ownership is strictly parent to child: an object owns its `SurfaceGrid`,
//! a grid owns its `Surface` cells, a cell owns its `AngleGrid`.

use lux_math::{
    dir_to_spherical_deg, normal_frame, spherical_deg_to_dir, Mat4, Mat4Ext, Vec3,
};

/// One cached exit-radiance sample for a single outgoing-direction bucket.
///
/// Valid only after the angle pass has run for the owning object; zero
/// before that.
#[derive(Debug, Clone, Copy, Default)]
pub struct SurfaceAngle {
    pub color: Vec3,
}

/// Owned grid of `SurfaceAngle` buckets over the outgoing hemisphere.
///
/// Indices wrap modulo the resolution on every access, so out-of-range
/// queries alias onto valid buckets instead of failing.
#[derive(Debug, Clone)]
pub struct AngleGrid {
    v_res: u32,
    h_res: u32,
    cells: Vec<SurfaceAngle>,
}

impl AngleGrid {
    fn new(v_res: u32, h_res: u32) -> Self {
        Self {
            v_res,
            h_res,
            cells: vec![SurfaceAngle::default(); (v_res * h_res) as usize],
        }
    }

    #[inline]
    fn index(&self, v: u32, h: u32) -> usize {
        ((v % self.v_res) * self.h_res + (h % self.h_res)) as usize
    }

    pub fn at(&self, v: u32, h: u32) -> &SurfaceAngle {
        &self.cells[self.index(v, h)]
    }

    pub fn at_mut(&mut self, v: u32, h: u32) -> &mut SurfaceAngle {
        let idx = self.index(v, h);
        &mut self.cells[idx]
    }

    /// Zero every bucket without reallocating.
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.color = Vec3::ZERO;
        }
    }

    pub fn v_res(&self) -> u32 {
        self.v_res
    }

    pub fn h_res(&self) -> u32 {
        self.h_res
    }
}

/// Per-cell cache: accumulated direct irradiance plus the optional
/// directional exit-radiance grid.
#[derive(Debug, Clone)]
pub struct Surface {
    /// Unit outward normal at the cell center.
    pub normal: Vec3,
    /// World position of the cell center.
    pub center: Vec3,
    /// Accumulated direct irradiance: sum over forward-pass deposits of
    /// `intensity * max(0, -light_dir.dot(normal)) * kd`. Monotonically
    /// non-decreasing within one light pass.
    pub diffuse_amt: Vec3,
    local_to_world: Mat4,
    world_to_local: Mat4,
    angles: Option<AngleGrid>,
}

impl Surface {
    /// Create a cell. `angle_ratio` scales the hemisphere bucket
    /// resolution; zero means no directional cache (view-independent
    /// material).
    pub fn new(angle_ratio: f32) -> Self {
        let angles = (angle_ratio > 0.0).then(|| {
            let v_res = ((90.0 + 1.0) * angle_ratio) as u32;
            let h_res = (360.0 * angle_ratio) as u32;
            AngleGrid::new(v_res.max(1), h_res.max(1))
        });
        Self {
            normal: Vec3::Y,
            center: Vec3::ZERO,
            diffuse_amt: Vec3::ZERO,
            local_to_world: Mat4::IDENTITY,
            world_to_local: Mat4::IDENTITY,
            angles,
        }
    }

    /// (Re)initialize the cell for a normal and world center.
    ///
    /// Idempotent: irradiance is zeroed, the angle grid is cleared in
    /// place, and the frame matrices are rebuilt, so objects can be reset
    /// between independent render configurations.
    pub fn reset(&mut self, normal: Vec3, center: Vec3) {
        self.normal = normal;
        self.center = center;
        self.diffuse_amt = Vec3::ZERO;
        self.local_to_world = normal_frame(center, normal);
        self.world_to_local = self.local_to_world.inverse();
        if let Some(grid) = &mut self.angles {
            grid.clear();
        }
    }

    pub fn angles(&self) -> Option<&AngleGrid> {
        self.angles.as_ref()
    }

    pub fn angles_mut(&mut self) -> Option<&mut AngleGrid> {
        self.angles.as_mut()
    }

    /// World outgoing direction at the center of bucket `(v, h)`, or `None`
    /// when the cell carries no directional grid.
    pub fn bucket_direction(&self, v: u32, h: u32) -> Option<Vec3> {
        let grid = self.angles.as_ref()?;
        let theta = v as f32 * 90.0 / grid.v_res() as f32;
        let phi = h as f32 * 360.0 / grid.h_res() as f32;
        let local = spherical_deg_to_dir(theta, phi);
        Some(self.local_to_world.transform_vector3(local))
    }

    /// Bucket index for a world direction.
    ///
    /// Transforms into the local frame, converts to polar degrees and
    /// buckets by the grid resolution. Returns `None` when the cell has no
    /// directional grid; callers fall back to direct computation.
    pub fn angle_for_direction(&self, world_dir: Vec3) -> Option<(u32, u32)> {
        let grid = self.angles.as_ref()?;
        let local = self.world_to_local.transform_vector3(world_dir);
        let (theta, phi) = dir_to_spherical_deg(local);
        let v = (theta / 90.0 * grid.v_res() as f32).floor() as u32;
        let h = (phi / 360.0 * grid.h_res() as f32).floor() as u32;
        Some((v, h))
    }
}

/// Owned grid of `Surface` cells over an object's parametric domain.
///
/// Like `AngleGrid`, accessors wrap modulo the resolution.
#[derive(Debug, Clone)]
pub struct SurfaceGrid {
    v_res: u32,
    h_res: u32,
    cells: Vec<Surface>,
}

impl SurfaceGrid {
    pub fn new(v_res: u32, h_res: u32, angle_ratio: f32) -> Self {
        Self {
            v_res,
            h_res,
            cells: vec![Surface::new(angle_ratio); (v_res * h_res) as usize],
        }
    }

    #[inline]
    fn index(&self, v: u32, h: u32) -> usize {
        ((v % self.v_res) * self.h_res + (h % self.h_res)) as usize
    }

    pub fn cell(&self, v: u32, h: u32) -> &Surface {
        &self.cells[self.index(v, h)]
    }

    pub fn cell_mut(&mut self, v: u32, h: u32) -> &mut Surface {
        let idx = self.index(v, h);
        &mut self.cells[idx]
    }

    pub fn v_res(&self) -> u32 {
        self.v_res
    }

    pub fn h_res(&self) -> u32 {
        self.h_res
    }

    /// Hemisphere bucket resolution of the cells, `(0, 0)` when the grid
    /// carries no directional cache.
    pub fn angle_res(&self) -> (u32, u32) {
        self.cells[0]
            .angles()
            .map_or((0, 0), |g| (g.v_res(), g.h_res()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_angle_grid_wraps() {
        let mut grid = AngleGrid::new(4, 8);
        grid.at_mut(1, 2).color = Vec3::ONE;

        // Out-of-range indices alias onto valid buckets.
        assert_eq!(grid.at(5, 10).color, Vec3::ONE);
        assert_eq!(grid.at(1, 2).color, grid.at(1 + 4, 2 + 8).color);
    }

    #[test]
    fn test_diffuse_surface_has_no_angles() {
        let surface = Surface::new(0.0);
        assert!(surface.angles().is_none());
        assert!(surface.angle_for_direction(Vec3::Y).is_none());
        assert!(surface.bucket_direction(0, 0).is_none());
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut surface = Surface::new(0.25);
        surface.reset(Vec3::Y, Vec3::new(1.0, 2.0, 3.0));
        surface.diffuse_amt += Vec3::ONE;
        if let Some(grid) = surface.angles_mut() {
            grid.at_mut(0, 0).color = Vec3::ONE;
        }

        surface.reset(Vec3::Y, Vec3::new(1.0, 2.0, 3.0));
        let first = (surface.diffuse_amt, surface.normal, surface.center);
        surface.reset(Vec3::Y, Vec3::new(1.0, 2.0, 3.0));
        let second = (surface.diffuse_amt, surface.normal, surface.center);

        assert_eq!(first, second);
        assert_eq!(surface.diffuse_amt, Vec3::ZERO);
        assert_eq!(surface.angles().unwrap().at(0, 0).color, Vec3::ZERO);
    }

    #[test]
    fn test_zero_bucket_points_along_normal() {
        let normal = Vec3::new(0.3, 0.8, -0.5).normalize();
        let mut surface = Surface::new(0.25);
        surface.reset(normal, Vec3::new(1.0, 0.0, 0.0));

        // theta = 0 is the local +Y axis, i.e. the normal itself.
        let dir = surface.bucket_direction(0, 0).unwrap();
        assert!((dir - normal).length() < 1e-4);

        let (v, _) = surface.angle_for_direction(normal).unwrap();
        assert_eq!(v, 0);
    }

    #[test]
    fn test_angle_lookup_matches_bucket_direction() {
        let mut surface = Surface::new(0.25);
        surface.reset(Vec3::Y, Vec3::ZERO);
        let (v_res, h_res) = {
            let grid = surface.angles().unwrap();
            (grid.v_res(), grid.h_res())
        };

        // A direction in the middle of a bucket must map back onto that
        // bucket. Average the four corner directions to land mid-bucket,
        // safely away from rounding at the edges.
        for &(v, h) in &[(0, 0), (3, 7), (v_res - 2, h_res - 2)] {
            let mid = (surface.bucket_direction(v, h).unwrap()
                + surface.bucket_direction(v + 1, h).unwrap()
                + surface.bucket_direction(v, h + 1).unwrap()
                + surface.bucket_direction(v + 1, h + 1).unwrap())
            .normalize();
            let (lv, lh) = surface.angle_for_direction(mid).unwrap();
            assert_eq!((lv % v_res, lh % h_res), (v, h));
        }
    }

    #[test]
    fn test_surface_grid_wraps() {
        let mut grid = SurfaceGrid::new(3, 5, 0.0);
        grid.cell_mut(2, 4).diffuse_amt = Vec3::ONE;
        assert_eq!(grid.cell(2 + 3, 4 + 5).diffuse_amt, Vec3::ONE);
    }
}
