//! The three render drivers orchestrating the cast engines.
//!
//! Pass order matters: the light pass fills the irradiance caches the
//! angle pass reads, and the eye pass reads whatever caches the enabled
//! precompute passes built.

use lux_core::{RenderOptions, Scene};
use lux_math::{Ray, Vec3};
use rayon::prelude::*;

use crate::backward::{backward_cast_ray, ShadePolicy};
use crate::forward::{forward_cast_ray, ForcedTarget};
use crate::output::Framebuffer;
use crate::raystore::{RayCounters, RayStore, RootKey};

/// Light pass: propagate every light to every surface cell of every
/// object, populating the irradiance caches.
pub fn light_render(store: &mut RayStore, scene: &mut Scene, options: &RenderOptions) {
    for l in 0..scene.lights.len() {
        let origin = scene.lights[l].position;
        let intensity = scene.lights[l].intensity;
        for i in 0..scene.objects.len() {
            let (v_res, h_res) = (
                scene.objects[i].surfaces.v_res(),
                scene.objects[i].surfaces.h_res(),
            );
            for v in 0..v_res {
                for h in 0..h_res {
                    let (target, normal) = {
                        let cell = scene.objects[i].surfaces.cell(v, h);
                        (cell.center, cell.normal)
                    };
                    // Full segment from the light to just above the cell;
                    // t = 1 lands on the biased endpoint, so occluders show
                    // up strictly before it.
                    let segment = target + normal * options.bias - origin;
                    store.counters.origin += 1;
                    let root = if scene.objects[i].recorder_enabled {
                        store.record_root(
                            RootKey::SurfaceCell { object: i, v, h },
                            origin,
                            segment,
                            Some(intensity),
                        )
                    } else {
                        None
                    };
                    forward_cast_ray(
                        store,
                        scene,
                        Ray::new(origin, segment),
                        intensity,
                        options,
                        0,
                        Some(ForcedTarget {
                            object: i,
                            cell: (v, h),
                            point: target,
                        }),
                        root,
                    );
                }
            }
        }
    }
}

/// Angle pass: shade every outgoing-direction bucket of every cached
/// surface cell and store the finished colors. Requires the light pass.
pub fn angle_render(store: &mut RayStore, scene: &mut Scene, options: &RenderOptions) {
    for i in 0..scene.objects.len() {
        let (va_res, ha_res) = scene.objects[i].surfaces.angle_res();
        if va_res == 0 {
            continue;
        }
        let (v_res, h_res) = (
            scene.objects[i].surfaces.v_res(),
            scene.objects[i].surfaces.h_res(),
        );
        for v in 0..v_res {
            for h in 0..h_res {
                for va in 0..va_res {
                    for ha in 0..ha_res {
                        let (target, dir) = {
                            let cell = scene.objects[i].surfaces.cell(v, h);
                            match cell.bucket_direction(va, ha) {
                                Some(dir) => (cell.center, dir),
                                None => continue,
                            }
                        };
                        store.counters.origin += 1;
                        let root = if scene.objects[i].recorder_enabled {
                            store.record_root(
                                RootKey::SurfaceCell { object: i, v, h },
                                target + dir,
                                -dir,
                                None,
                            )
                        } else {
                            None
                        };
                        // Probe from one unit outside the cell back toward
                        // the surface along the bucket direction.
                        let color = backward_cast_ray(
                            store,
                            scene,
                            Ray::new(target + dir, -dir),
                            options,
                            0,
                            ShadePolicy::IRRADIANCE,
                            root,
                        );
                        if let Some(grid) = scene.objects[i].surfaces.cell_mut(v, h).angles_mut() {
                            grid.at_mut(va, ha).color = color;
                        }
                    }
                }
            }
        }
    }
}

/// Eye pass: shade one primary ray per pixel (supersampled by `spp` per
/// axis) from the given viewpoint.
///
/// Rows are rendered in parallel when recording is disabled; each worker
/// accumulates into its own counter set and the results merge after the
/// join, so no counter increments are lost. With recording enabled the
/// pass runs sequentially on the shared store.
pub fn eye_render(
    store: &mut RayStore,
    scene: &Scene,
    options: &RenderOptions,
    viewpoint: Vec3,
    policy: ShadePolicy,
) -> Framebuffer {
    let width = options.width;
    let height = options.height;
    let scale = (options.fov.to_radians() * 0.5).tan();
    let aspect = options.aspect_ratio();
    let spp = options.spp.max(1);

    let render_row = |j: u32, store: &mut RayStore| -> Vec<Vec3> {
        (0..width)
            .map(|i| {
                let mut color = Vec3::ZERO;
                for sj in 0..spp {
                    for si in 0..spp {
                        let px = i as f32 + (si as f32 + 0.5) / spp as f32;
                        let py = j as f32 + (sj as f32 + 0.5) / spp as f32;
                        let x = (2.0 * px / width as f32 - 1.0) * aspect * scale;
                        let y = (1.0 - 2.0 * py / height as f32) * scale;
                        let dir = Vec3::new(x, y, -1.0).normalize();
                        store.counters.origin += 1;
                        let root =
                            store.record_root(RootKey::EyePixel { x: i, y: j }, viewpoint, dir, None);
                        color += backward_cast_ray(
                            store,
                            scene,
                            Ray::new(viewpoint, dir),
                            options,
                            0,
                            policy,
                            root,
                        );
                    }
                }
                color / (spp * spp) as f32
            })
            .collect()
    };

    let mut framebuffer = Framebuffer::new(width, height);
    if store.recording() {
        for j in 0..height {
            let row = render_row(j, store);
            framebuffer.set_row(j, &row);
        }
    } else {
        let rows: Vec<(u32, Vec<Vec3>, RayCounters)> = (0..height)
            .into_par_iter()
            .map(|j| {
                let mut local = RayStore::new(options);
                let row = render_row(j, &mut local);
                (j, row, local.counters)
            })
            .collect();
        for (j, row, counters) in rows {
            framebuffer.set_row(j, &row);
            store.counters.merge(&counters);
        }
    }
    framebuffer
}
