//! Lux Renderer - precomputed light-field Whitted tracing.
//!
//! The engine runs up to three passes over a scene:
//!
//! 1. a **light pass** propagating every light forward through the scene,
//!    depositing direct irradiance into each object's surface cache;
//! 2. an **angle pass** probing every cached outgoing-direction bucket with
//!    backward Whitted shading and storing the finished colors;
//! 3. an **eye pass** shading camera rays, optionally short-circuiting to
//!    whichever caches the earlier passes built.
//!
//! Every pass carries a [`RayStore`] for counters and optional ray-tree
//! recording.

mod backward;
mod forward;
mod output;
mod passes;
mod raystore;

pub use backward::{backward_cast_ray, ShadePolicy};
pub use forward::{forward_cast_ray, ForcedTarget};
pub use output::{angle_image, color_to_rgb8, irradiance_image, ExportError, Framebuffer};
pub use passes::{angle_render, eye_render, light_render};
pub use raystore::{NodeId, RayCounters, RayKind, RayNode, RayStatus, RayStore, RootKey};
