//! Lux command line renderer.
//!
//! Builds the demo scene, runs the enabled passes in dependency order
//! (light, angle, eye) and writes the rendered images plus per-object
//! cache dumps.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use log::{debug, info, LevelFilter};

use lux_core::{Albedo, Light, MaterialKind, Object, RenderOptions, Scene, RAY_CAST_DENSITY};
use lux_math::{Vec2, Vec3};
use lux_renderer::{
    angle_image, angle_render, eye_render, irradiance_image, light_render, RayStore, RootKey,
    ShadePolicy,
};

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Parser)]
#[command(name = "lux")]
#[command(about = "Precomputed light-field Whitted ray tracer")]
struct Args {
    /// Render options JSON file (built-in defaults when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for rendered images and cache dumps
    #[arg(short, long, default_value = "out")]
    output: PathBuf,

    /// Logging level
    #[arg(long, default_value = "info")]
    log_level: LogLevel,

    /// Record the direct render's ray tree for one pixel and dump it at
    /// debug level (forces a sequential eye pass)
    #[arg(long, value_names = ["X", "Y"], num_args = 2)]
    trace_pixel: Option<Vec<u32>>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_default_env()
        .filter_level(args.log_level.clone().into())
        .init();

    let options = match &args.config {
        Some(path) => RenderOptions::from_json_file(path)
            .with_context(|| format!("loading options from {}", path.display()))?,
        None => RenderOptions::default(),
    };
    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("creating output directory {}", args.output.display()))?;

    let mut scene = demo_scene();
    for object in &scene.objects {
        let (va, ha) = object.surfaces.angle_res();
        info!(
            "object {}: {}x{} surface cells, {}x{} angle buckets",
            object.name,
            object.surfaces.v_res(),
            object.surfaces.h_res(),
            va,
            ha,
        );
    }
    scene.reset();

    let needs_light_pass = options.render_with_irradiance || options.render_with_angles;
    if needs_light_pass {
        let mut store = RayStore::new(&options);
        let start = Instant::now();
        light_render(&mut store, &mut scene, &options);
        info!("light pass: {}", store.summary(start.elapsed()));
        for object in &scene.objects {
            let path = args
                .output
                .join(format!("obj_{}_irradiance.png", object.name));
            irradiance_image(object).save_png(path)?;
        }
    }

    if options.render_with_irradiance {
        render_viewpoints(
            &scene,
            &options,
            &args.output,
            ShadePolicy::IRRADIANCE,
            "irradiance",
            None,
        )?;
    }

    if options.render_with_angles {
        let mut store = RayStore::new(&options);
        let start = Instant::now();
        angle_render(&mut store, &mut scene, &options);
        info!("angle pass: {}", store.summary(start.elapsed()));
        for object in &scene.objects {
            if let Some(image) = angle_image(object) {
                let path = args.output.join(format!("obj_{}_angles.png", object.name));
                image.save_png(path)?;
            }
        }
        render_viewpoints(
            &scene,
            &options,
            &args.output,
            ShadePolicy::FULL_CACHE,
            "angles",
            None,
        )?;
    }

    if options.render_direct {
        let trace_pixel = args
            .trace_pixel
            .as_ref()
            .map(|coords| (coords[0], coords[1]));
        render_viewpoints(
            &scene,
            &options,
            &args.output,
            ShadePolicy::DIRECT,
            "direct",
            trace_pixel,
        )?;
    }

    Ok(())
}

/// Eye-render every configured viewpoint under one shading policy.
fn render_viewpoints(
    scene: &Scene,
    options: &RenderOptions,
    output: &Path,
    policy: ShadePolicy,
    label: &str,
    trace_pixel: Option<(u32, u32)>,
) -> anyhow::Result<()> {
    for viewpoint in &options.viewpoints {
        let mut store = match trace_pixel {
            Some(_) => RayStore::with_recording(options),
            None => RayStore::new(options),
        };
        let start = Instant::now();
        let framebuffer = eye_render(&mut store, scene, options, *viewpoint, policy);
        info!("eye pass ({label}): {}", store.summary(start.elapsed()));
        if let Some((x, y)) = trace_pixel {
            if let Some(root) = store.root(RootKey::EyePixel { x, y }) {
                debug!("ray tree for pixel ({x},{y}):\n{}", store.dump_tree(root));
            }
        }
        let path = output.join(format!(
            "{label}_x{}_y{}_z{}_density{:.2}_dep{}_spp{}.png",
            viewpoint.x as i32,
            viewpoint.y as i32,
            viewpoint.z as i32,
            RAY_CAST_DENSITY,
            options.max_depth,
            options.spp,
        ));
        framebuffer.save_png(&path)?;
    }
    Ok(())
}

/// The demo scene: a diffuse sphere over a reflective floor in front of a
/// checkerboard back wall, lit by a single point light.
fn demo_scene() -> Scene {
    let sphere = Object::sphere(
        "sph1",
        MaterialKind::DiffuseGlossy,
        Vec3::new(-4.0, 0.0, -8.0),
        2.0,
    )
    .with_ior(1.3)
    .with_kd(0.8)
    .with_albedo(Albedo::Solid(Vec3::new(0.6, 0.7, 0.8)));

    let floor = Object::mesh(
        "mesh1",
        MaterialKind::Reflective,
        vec![
            Vec3::new(-10.0, -2.0, 0.0),
            Vec3::new(10.0, -2.0, 0.0),
            Vec3::new(10.0, -2.0, -14.0),
            Vec3::new(-10.0, -2.0, -14.0),
        ],
        vec![0, 1, 3, 1, 2, 3],
        vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ],
    )
    .with_ior(1.5)
    .with_kd(0.1)
    .with_albedo(Albedo::Solid(Vec3::new(0.3843, 0.3569, 0.3412)));

    let wall = Object::mesh(
        "mesh2",
        MaterialKind::DiffuseGlossy,
        vec![
            Vec3::new(-10.0, -2.0, -14.0),
            Vec3::new(10.0, -2.0, -14.0),
            Vec3::new(10.0, 18.0, -14.0),
            Vec3::new(-10.0, 18.0, -14.0),
        ],
        vec![0, 1, 3, 1, 2, 3],
        vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ],
    )
    .with_ior(1.3)
    .with_kd(0.8)
    .with_albedo(Albedo::Checkerboard);

    Scene::new(
        vec![sphere, floor, wall],
        vec![Light::new(Vec3::new(20.0, 25.0, 8.0), Vec3::ONE)],
    )
}
