//! Scene container and nearest-hit tracing.

use lux_math::{Ray, Vec2, Vec3};

use crate::light::Light;
use crate::object::Object;

/// Nearest-hit result over the whole scene.
///
/// Carries indices rather than references so callers can go on to mutate
/// the hit object's caches (the light pass deposits irradiance into the
/// hit cell).
#[derive(Debug, Clone, Copy)]
pub struct Hit {
    /// Index of the hit object in `Scene::objects`.
    pub object: usize,
    /// Distance along the ray, in units of the ray direction's length.
    pub t: f32,
    pub point: Vec3,
    /// 2D surface parameter of the hit.
    pub map_idx: Vec2,
    /// Surface cell containing the hit point.
    pub cell: (u32, u32),
    /// Exit-radiance bucket facing the approach direction, `None` when the
    /// surface carries no angular grid.
    pub angle: Option<(u32, u32)>,
    /// Cell normal, copied out for shading.
    pub normal: Vec3,
}

/// All objects and lights of one render configuration.
#[derive(Debug, Default)]
pub struct Scene {
    pub objects: Vec<Object>,
    pub lights: Vec<Light>,
}

impl Scene {
    pub fn new(objects: Vec<Object>, lights: Vec<Light>) -> Self {
        Self { objects, lights }
    }

    /// Nearest intersection of the ray against every object.
    pub fn trace(&self, ray: &Ray) -> Option<Hit> {
        let mut nearest: Option<Hit> = None;
        for (k, object) in self.objects.iter().enumerate() {
            if let Some(geom) = object.intersect(ray) {
                if nearest.map_or(true, |n| geom.t < n.t) {
                    let surface = object.surfaces.cell(geom.cell.0, geom.cell.1);
                    nearest = Some(Hit {
                        object: k,
                        t: geom.t,
                        point: geom.point,
                        map_idx: geom.map_idx,
                        cell: geom.cell,
                        angle: surface.angle_for_direction(-ray.direction),
                        normal: surface.normal,
                    });
                }
            }
        }
        nearest
    }

    /// Reset every object's caches; required between independent render
    /// configurations.
    pub fn reset(&mut self) {
        for object in &mut self.objects {
            object.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::MaterialKind;

    #[test]
    fn test_trace_returns_nearest() {
        let scene = Scene::new(
            vec![
                Object::sphere(
                    "far",
                    MaterialKind::DiffuseGlossy,
                    Vec3::new(0.0, 0.0, -10.0),
                    1.0,
                ),
                Object::sphere(
                    "near",
                    MaterialKind::DiffuseGlossy,
                    Vec3::new(0.0, 0.0, -5.0),
                    1.0,
                ),
            ],
            vec![],
        );
        let hit = scene
            .trace(&Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0)))
            .unwrap();
        assert_eq!(hit.object, 1);
        assert!((hit.t - 4.0).abs() < 1e-4);
    }

    #[test]
    fn test_trace_miss() {
        let scene = Scene::new(
            vec![Object::sphere(
                "sph",
                MaterialKind::DiffuseGlossy,
                Vec3::new(0.0, 0.0, -5.0),
                1.0,
            )],
            vec![],
        );
        assert!(scene
            .trace(&Ray::new(Vec3::ZERO, Vec3::new(0.0, 1.0, 0.0)))
            .is_none());
    }

    #[test]
    fn test_hit_carries_angle_bucket_for_reflective() {
        let scene = Scene::new(
            vec![Object::sphere(
                "mirror",
                MaterialKind::Reflective,
                Vec3::new(0.0, 0.0, -5.0),
                0.1,
            )],
            vec![],
        );
        let hit = scene
            .trace(&Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0)))
            .unwrap();
        assert!(hit.angle.is_some());
    }

    #[test]
    fn test_hit_has_no_angle_bucket_for_diffuse() {
        let scene = Scene::new(
            vec![Object::sphere(
                "matte",
                MaterialKind::DiffuseGlossy,
                Vec3::new(0.0, 0.0, -5.0),
                1.0,
            )],
            vec![],
        );
        let hit = scene
            .trace(&Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0)))
            .unwrap();
        assert!(hit.angle.is_none());
    }
}
