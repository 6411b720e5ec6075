//! Backward Whitted shading.
//!
//! Computes the color of one query ray (eye ray or angle-pass probe),
//! recursing on reflection and refraction and optionally short-circuiting
//! to the caches the precompute passes built. Recursion is bounded by the
//! configured depth limit only; intensity is not tracked per call.

use lux_core::{MaterialKind, RenderOptions, Scene};
use lux_math::{fresnel, reflect, refract, Ray, Vec3};

use crate::raystore::{NodeId, RayKind, RayStatus, RayStore};

/// Which precomputed caches a shading call may read.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShadePolicy {
    /// Substitute the cached per-cell irradiance for the per-light
    /// Lambert/shadow loop.
    pub use_irradiance: bool,
    /// Return the precomputed exit-radiance bucket immediately on hit.
    pub use_angles: bool,
}

impl ShadePolicy {
    /// Full direct computation, no caches.
    pub const DIRECT: Self = Self {
        use_irradiance: false,
        use_angles: false,
    };
    /// Irradiance cache only (after the light pass).
    pub const IRRADIANCE: Self = Self {
        use_irradiance: true,
        use_angles: false,
    };
    /// Both caches (after the light and angle passes).
    pub const FULL_CACHE: Self = Self {
        use_irradiance: true,
        use_angles: true,
    };
}

/// Shade one query ray. Returns the background color on depth overflow or
/// no hit; both are counted, neither is an error.
pub fn backward_cast_ray(
    store: &mut RayStore,
    scene: &Scene,
    ray: Ray,
    options: &RenderOptions,
    depth: u32,
    policy: ShadePolicy,
    parent: Option<NodeId>,
) -> Vec3 {
    if depth > options.max_depth {
        store.counters.overflow += 1;
        store.mark_status(parent, RayStatus::Overflow);
        return options.background;
    }
    store.counters.total += 1;

    let hit = match scene.trace(&ray) {
        Some(hit) => hit,
        None => {
            store.counters.nohit += 1;
            store.mark_status(parent, RayStatus::NoHit);
            return options.background;
        }
    };

    let object = &scene.objects[hit.object];
    let n = hit.normal;
    store.mark_hit(parent, &object.name, hit.point);

    if policy.use_angles {
        // Fast path: the angle pass has already shaded this surface for
        // every outgoing direction.
        let surface = object.surfaces.cell(hit.cell.0, hit.cell.1);
        if let (Some((v, h)), Some(grid)) = (hit.angle, surface.angles()) {
            return grid.at(v, h).color;
        }
        // No angular grid (view-independent material): irradiance cache.
        return surface.diffuse_amt * object.eval_diffuse_color(hit.map_idx);
    }

    match object.material {
        MaterialKind::ReflectiveRefractive => {
            let refl_dir = reflect(ray.direction, n).normalize();
            let mut reflection_color = Vec3::ZERO;
            if refl_dir.dot(n) >= 0.0 {
                let refl_orig = hit.point + n * options.bias;
                store.counters.reflection += 1;
                let child = store.record_child(
                    parent,
                    RayKind::Reflection,
                    refl_orig,
                    refl_dir,
                    None,
                    false,
                );
                reflection_color = backward_cast_ray(
                    store,
                    scene,
                    Ray::new(refl_orig, refl_dir),
                    options,
                    depth + 1,
                    policy,
                    child,
                );
            }

            let refr_dir = refract(ray.direction, n, object.ior).normalize_or_zero();
            let inside = refr_dir.dot(n) < 0.0;
            let refr_orig = if inside {
                hit.point - n * options.bias
            } else {
                hit.point + n * options.bias
            };
            store.counters.refraction += 1;
            let child =
                store.record_child(parent, RayKind::Refraction, refr_orig, refr_dir, None, inside);
            let refraction_color = backward_cast_ray(
                store,
                scene,
                Ray::new(refr_orig, refr_dir),
                options,
                depth + 1,
                policy,
                child,
            );

            let kr = fresnel(ray.direction, n, object.ior);
            let cached_diffuse = if policy.use_irradiance {
                let surface = object.surfaces.cell(hit.cell.0, hit.cell.1);
                surface.diffuse_amt * object.eval_diffuse_color(hit.map_idx)
            } else {
                Vec3::ZERO
            };
            reflection_color * kr + refraction_color * (1.0 - kr) + cached_diffuse
        }
        MaterialKind::Reflective => {
            let kr = 0.5;
            let refl_dir = reflect(ray.direction, n);
            let inside = refl_dir.dot(n) < 0.0;
            let refl_orig = if inside {
                hit.point - n * options.bias
            } else {
                hit.point + n * options.bias
            };
            store.counters.reflection += 1;
            let child =
                store.record_child(parent, RayKind::Reflection, refl_orig, refl_dir, None, inside);
            let reflection_color = backward_cast_ray(
                store,
                scene,
                Ray::new(refl_orig, refl_dir),
                options,
                depth + 1,
                policy,
                child,
            ) * kr;
            let cached_diffuse = if policy.use_irradiance {
                let surface = object.surfaces.cell(hit.cell.0, hit.cell.1);
                surface.diffuse_amt * object.eval_diffuse_color(hit.map_idx)
            } else {
                Vec3::ZERO
            };
            reflection_color + cached_diffuse
        }
        MaterialKind::DiffuseGlossy => {
            // Phong model: Lambert diffuse per light with a biased shadow
            // ray, plus a mirror-direction specular term.
            let shadow_orig = if ray.direction.dot(n) < 0.0 {
                hit.point + n * options.bias
            } else {
                hit.point - n * options.bias
            };

            let mut local_amt = Vec3::ZERO;
            let mut specular = Vec3::ZERO;
            for light in &scene.lights {
                let to_light = light.position - hit.point;
                let light_distance2 = to_light.length_squared();
                let l = to_light.normalize();
                if !policy.use_irradiance {
                    let ldot_n = l.dot(n).max(0.0);
                    // Occluded only when the blocker sits nearer than the
                    // light itself.
                    let in_shadow = scene
                        .trace(&Ray::new(shadow_orig, l))
                        .map_or(false, |s| s.t * s.t < light_distance2);
                    if !in_shadow {
                        local_amt += light.intensity * ldot_n * object.kd;
                    }
                }
                let mirror = reflect(-l, n);
                specular += (-mirror.dot(ray.direction)).max(0.0).powf(object.specular_exponent)
                    * light.intensity;
            }

            let global_amt = if policy.use_irradiance {
                object.surfaces.cell(hit.cell.0, hit.cell.1).diffuse_amt
            } else {
                Vec3::ZERO
            };

            if local_amt == Vec3::ZERO {
                store.counters.invisible += 1;
            } else {
                store.counters.valid += 1;
            }

            (global_amt + local_amt) * object.eval_diffuse_color(hit.map_idx)
                + specular * object.ks
        }
    }
}
