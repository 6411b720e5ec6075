//! Forward light propagation.
//!
//! Recursively follows light from a source (or a forced first segment to a
//! known surface cell) through the scene, depositing direct irradiance
//! into every surface cell the energy reaches. Recursion is bounded by a
//! hard depth ceiling and by weak-ray pruning on the remaining intensity;
//! both terminate the branch with a counter, never an error.

use lux_core::{
    Hit, MaterialKind, RenderOptions, Scene, INTENSITY_TOO_WEAK, OVERSTACK_PROTECT_DEPTH,
};
use lux_math::{fresnel, reflect, refract, Ray, Vec2, Vec3};

use crate::raystore::{NodeId, RayKind, RayStatus, RayStore};

/// Forced first-segment target: the known cell a light ray is aimed at,
/// bypassing general intersection for the segment from the light.
#[derive(Debug, Clone, Copy)]
pub struct ForcedTarget {
    pub object: usize,
    pub cell: (u32, u32),
    pub point: Vec3,
}

/// Propagate light along `ray`, depositing irradiance into hit cells.
///
/// With a forced target the ray direction must be the full unnormalized
/// segment vector from the origin to just above the target, so an occluder
/// strictly before the target shows up as `t <= 1`; the bias offset keeps
/// the target surface itself past the segment end.
///
/// The returned color is only meaningful to reflective composition above
/// the root; the light pass discards it and relies on the cache side
/// effects.
pub fn forward_cast_ray(
    store: &mut RayStore,
    scene: &mut Scene,
    ray: Ray,
    intensity: Vec3,
    options: &RenderOptions,
    depth: u32,
    forced: Option<ForcedTarget>,
    parent: Option<NodeId>,
) -> Vec3 {
    if depth > OVERSTACK_PROTECT_DEPTH {
        store.counters.overflow += 1;
        store.mark_status(parent, RayStatus::Overflow);
        return options.background;
    }
    store.counters.total += 1;

    let traced = scene.trace(&ray);
    let hit = match forced {
        Some(target) => {
            if traced.map_or(false, |h| h.t <= 1.0) {
                // Something occludes the segment before the target: the
                // cell is shadowed for this light.
                store.counters.nohit += 1;
                store.mark_status(parent, RayStatus::NoHit);
                return options.background;
            }
            let surface = scene.objects[target.object]
                .surfaces
                .cell(target.cell.0, target.cell.1);
            Hit {
                object: target.object,
                t: 1.0,
                point: target.point,
                map_idx: Vec2::ZERO,
                cell: target.cell,
                angle: None,
                normal: surface.normal,
            }
        }
        None => match traced {
            Some(hit) => hit,
            None => {
                store.counters.nohit += 1;
                store.mark_status(parent, RayStatus::NoHit);
                return options.background;
            }
        },
    };

    let incident = ray.direction.normalize();
    let n = hit.normal;
    store.mark_hit(parent, &scene.objects[hit.object].name, hit.point);
    let material = scene.objects[hit.object].material;
    let ior = scene.objects[hit.object].ior;
    let kd = scene.objects[hit.object].kd;

    let mut hit_color = options.background;
    match material {
        MaterialKind::ReflectiveRefractive => {
            let kr = fresnel(incident, n, ior);

            let mut reflection_color = Vec3::ZERO;
            let reflected = intensity * kr;
            if reflected.length_squared() < INTENSITY_TOO_WEAK {
                store.counters.weak += 1;
            } else {
                let refl_dir = reflect(incident, n).normalize();
                // Internal reflection on a closed volume is handled by the
                // exit segment; skip rays pointing into the surface.
                if refl_dir.dot(n) >= 0.0 {
                    let refl_orig = hit.point + n * options.bias;
                    store.counters.reflection += 1;
                    let child = store.record_child(
                        parent,
                        RayKind::Reflection,
                        refl_orig,
                        refl_dir,
                        Some(reflected),
                        false,
                    );
                    reflection_color = forward_cast_ray(
                        store,
                        scene,
                        Ray::new(refl_orig, refl_dir),
                        reflected,
                        options,
                        depth + 1,
                        None,
                        child,
                    );
                }
            }

            let mut refraction_color = Vec3::ZERO;
            let transmitted = intensity * (1.0 - kr);
            if transmitted.length_squared() < INTENSITY_TOO_WEAK {
                store.counters.weak += 1;
            } else {
                let refr_dir = refract(incident, n, ior).normalize_or_zero();
                let inside = refr_dir.dot(n) < 0.0;
                let refr_orig = if inside {
                    hit.point - n * options.bias
                } else {
                    hit.point + n * options.bias
                };
                store.counters.refraction += 1;
                let child = store.record_child(
                    parent,
                    RayKind::Refraction,
                    refr_orig,
                    refr_dir,
                    Some(transmitted),
                    inside,
                );
                refraction_color = forward_cast_ray(
                    store,
                    scene,
                    Ray::new(refr_orig, refr_dir),
                    transmitted,
                    options,
                    depth + 1,
                    None,
                    child,
                );
            }
            hit_color = reflection_color * kr + refraction_color * (1.0 - kr);
        }
        MaterialKind::Reflective => {
            let kr = 0.9;
            let reflected = intensity * kr;
            if reflected.length_squared() < INTENSITY_TOO_WEAK {
                store.counters.weak += 1;
            } else {
                let refl_dir = reflect(incident, n);
                let inside = refl_dir.dot(n) < 0.0;
                let refl_orig = if inside {
                    hit.point - n * options.bias
                } else {
                    hit.point + n * options.bias
                };
                store.counters.reflection += 1;
                let child = store.record_child(
                    parent,
                    RayKind::Reflection,
                    refl_orig,
                    refl_dir,
                    Some(reflected),
                    inside,
                );
                hit_color = forward_cast_ray(
                    store,
                    scene,
                    Ray::new(refl_orig, refl_dir),
                    reflected,
                    options,
                    depth + 1,
                    None,
                    child,
                ) * kr;
            }
        }
        MaterialKind::DiffuseGlossy => {
            // Forward transport terminates at diffuse surfaces; all the
            // energy deposits below.
        }
    }

    // Every hit deposits, whether or not it also recursed: irradiance
    // accumulates at every bounce point along the forward path.
    let light_dir = (hit.point - ray.origin).normalize();
    let ldot_n = (-light_dir).dot(n).max(0.0);
    let cell = scene.objects[hit.object]
        .surfaces
        .cell_mut(hit.cell.0, hit.cell.1);
    cell.diffuse_amt += intensity * ldot_n * kd;

    hit_color
}

#[cfg(test)]
mod tests {
    use super::*;
    use lux_core::{Light, Object};

    fn options() -> RenderOptions {
        RenderOptions::default()
    }

    /// Small mirror quad perpendicular to the Z axis.
    fn mirror_quad(name: &str, z: f32, facing_pos_z: bool) -> Object {
        let vertices = if facing_pos_z {
            vec![
                Vec3::new(-1.0, -1.0, z),
                Vec3::new(1.0, -1.0, z),
                Vec3::new(1.0, 1.0, z),
                Vec3::new(-1.0, 1.0, z),
            ]
        } else {
            vec![
                Vec3::new(1.0, -1.0, z),
                Vec3::new(-1.0, -1.0, z),
                Vec3::new(-1.0, 1.0, z),
                Vec3::new(1.0, 1.0, z),
            ]
        };
        let indices = vec![0, 1, 3, 1, 2, 3];
        let st = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ];
        Object::mesh(name, MaterialKind::Reflective, vertices, indices, st)
    }

    /// Forced cast from a light to the cell facing it on a diffuse sphere.
    fn cast_at_facing_cell(scene: &mut Scene, store: &mut RayStore, options: &RenderOptions) {
        let light = scene.lights[0];
        // Front pole of the sphere faces +Z toward the light.
        let (object, cell) = {
            let object = &scene.objects[0];
            let (v_res, h_res) = (object.surfaces.v_res(), object.surfaces.h_res());
            let mut best = (0, 0);
            let mut best_dot = f32::MIN;
            for v in 0..v_res {
                for h in 0..h_res {
                    let cell = object.surfaces.cell(v, h);
                    let to_light = (light.position - cell.center).normalize();
                    let d = cell.normal.dot(to_light);
                    if d > best_dot {
                        best_dot = d;
                        best = (v, h);
                    }
                }
            }
            (0usize, best)
        };
        let target = scene.objects[object].surface_point(cell.0, cell.1);
        let normal = scene.objects[object].surfaces.cell(cell.0, cell.1).normal;
        let segment = target + normal * options.bias - light.position;
        forward_cast_ray(
            store,
            scene,
            Ray::new(light.position, segment),
            light.intensity,
            options,
            0,
            Some(ForcedTarget {
                object,
                cell,
                point: target,
            }),
            None,
        );
    }

    #[test]
    fn test_forced_cast_deposits_lambert_irradiance() {
        let options = options();
        let mut scene = Scene::new(
            vec![Object::sphere(
                "sph",
                MaterialKind::DiffuseGlossy,
                Vec3::new(0.0, 0.0, -8.0),
                2.0,
            )
            .with_kd(0.8)],
            vec![Light::new(Vec3::new(0.0, 0.0, 8.0), Vec3::ONE)],
        );
        let mut store = RayStore::new(&options);
        cast_at_facing_cell(&mut scene, &mut store, &options);

        // The facing cell's normal points back at the light, so the
        // deposit is intensity * cos(angle) * kd with cos close to 1.
        let deposited: Vec3 = {
            let object = &scene.objects[0];
            let mut max = Vec3::ZERO;
            for v in 0..object.surfaces.v_res() {
                for h in 0..object.surfaces.h_res() {
                    let amt = object.surfaces.cell(v, h).diffuse_amt;
                    if amt.length_squared() > max.length_squared() {
                        max = amt;
                    }
                }
            }
            max
        };
        assert!((deposited.x - 0.8).abs() < 0.05, "deposited={deposited:?}");
        assert_eq!(deposited.x, deposited.y);
    }

    #[test]
    fn test_occluded_forced_cast_deposits_nothing() {
        let options = options();
        // A blocker sphere sits between the light and the target sphere.
        let mut scene = Scene::new(
            vec![
                Object::sphere(
                    "target",
                    MaterialKind::DiffuseGlossy,
                    Vec3::new(0.0, 0.0, -8.0),
                    2.0,
                )
                .with_kd(0.8),
                Object::sphere(
                    "blocker",
                    MaterialKind::DiffuseGlossy,
                    Vec3::new(0.0, 0.0, 0.0),
                    1.0,
                ),
            ],
            vec![Light::new(Vec3::new(0.0, 0.0, 8.0), Vec3::ONE)],
        );
        let mut store = RayStore::new(&options);

        // Aim straight through the blocker at the target's front pole.
        let target_point = Vec3::new(0.0, 0.0, -6.0);
        let normal = Vec3::new(0.0, 0.0, 1.0);
        let light = scene.lights[0];
        let segment = target_point + normal * options.bias - light.position;
        // Locate the cell whose center is nearest the front pole.
        let cell = {
            let object = &scene.objects[0];
            let mut best = (0, 0);
            let mut best_d = f32::MAX;
            for v in 0..object.surfaces.v_res() {
                for h in 0..object.surfaces.h_res() {
                    let d = (object.surfaces.cell(v, h).center - target_point).length();
                    if d < best_d {
                        best_d = d;
                        best = (v, h);
                    }
                }
            }
            best
        };
        forward_cast_ray(
            &mut store,
            &mut scene,
            Ray::new(light.position, segment),
            light.intensity,
            &options,
            0,
            Some(ForcedTarget {
                object: 0,
                cell,
                point: target_point,
            }),
            None,
        );

        assert_eq!(store.counters.nohit, 1);
        let amt = scene.objects[0].surfaces.cell(cell.0, cell.1).diffuse_amt;
        assert_eq!(amt, Vec3::ZERO);
    }

    #[test]
    fn test_weak_ray_is_pruned_not_recursed() {
        let options = options();
        let mut scene = Scene::new(vec![mirror_quad("mirror", -5.0, true)], vec![]);
        let mut store = RayStore::new(&options);
        // Intensity whose scaled square falls below the pruning threshold.
        let weak = Vec3::splat(1e-4);
        forward_cast_ray(
            &mut store,
            &mut scene,
            Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0)),
            weak,
            &options,
            0,
            None,
            None,
        );
        assert_eq!(store.counters.weak, 1);
        assert_eq!(store.counters.reflection, 0);
    }

    #[test]
    fn test_depth_ceiling_counts_overflow() {
        let options = options();
        let mut scene = Scene::new(vec![], vec![]);
        let mut store = RayStore::new(&options);
        let color = forward_cast_ray(
            &mut store,
            &mut scene,
            Ray::new(Vec3::ZERO, Vec3::NEG_Z),
            Vec3::ONE,
            &options,
            OVERSTACK_PROTECT_DEPTH + 1,
            None,
            None,
        );
        assert_eq!(store.counters.overflow, 1);
        assert_eq!(color, options.background);
    }

    #[test]
    fn test_bounce_deposits_at_every_hit() {
        let options = options();
        // Mirror quad in front of a diffuse sphere behind the origin:
        // light hits the mirror, deposits there, and the bounce deposits
        // on the sphere.
        let mut scene = Scene::new(
            vec![
                mirror_quad("mirror", -5.0, true).with_kd(0.1),
                Object::sphere(
                    "wall",
                    MaterialKind::DiffuseGlossy,
                    Vec3::new(0.0, 0.0, 8.0),
                    2.0,
                )
                .with_kd(0.8),
            ],
            vec![],
        );
        let mut store = RayStore::new(&options);
        // Cast head-on at the mirror; the reflection returns along +Z
        // toward the wall sphere.
        forward_cast_ray(
            &mut store,
            &mut scene,
            Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0)),
            Vec3::ONE,
            &options,
            0,
            None,
            None,
        );

        assert_eq!(store.counters.reflection, 1);
        let mirror_total: f32 = sum_irradiance(&scene.objects[0]);
        let wall_total: f32 = sum_irradiance(&scene.objects[1]);
        assert!(mirror_total > 0.0, "mirror cell should accumulate");
        assert!(wall_total > 0.0, "bounced energy should deposit on wall");
    }

    fn sum_irradiance(object: &Object) -> f32 {
        let mut total = 0.0;
        for v in 0..object.surfaces.v_res() {
            for h in 0..object.surfaces.h_res() {
                total += object.surfaces.cell(v, h).diffuse_amt.element_sum();
            }
        }
        total
    }
}
