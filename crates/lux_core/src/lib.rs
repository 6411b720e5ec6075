//! Lux Core - scene model and radiance caches.
//!
//! This crate provides:
//!
//! - **Radiance caches**: `Surface` (per-cell irradiance), `SurfaceAngle`
//!   (per-outgoing-direction exit radiance) and their owning grids
//! - **Scene model**: `Object` (sphere / triangle-mesh geometry plus
//!   material constants), `Light`, `Scene` with nearest-hit tracing
//! - **Configuration**: `RenderOptions`, loadable from JSON

pub mod light;
pub mod object;
pub mod options;
pub mod scene;
pub mod surface;

// Re-export commonly used types
pub use light::Light;
pub use object::{Albedo, GeomHit, Geometry, MaterialKind, Object};
pub use options::{
    OptionsError, RenderOptions, INTENSITY_TOO_WEAK, OVERSTACK_PROTECT_DEPTH, RAY_CAST_DENSITY,
};
pub use scene::{Hit, Scene};
pub use surface::{AngleGrid, Surface, SurfaceAngle, SurfaceGrid};
