// Re-export glam for convenience
pub use glam::*;

mod frame;
mod optics;
mod ray;
mod spherical;

pub use frame::{normal_frame, Mat4Ext};
pub use optics::{fresnel, reflect, refract};
pub use ray::Ray;
pub use spherical::{dir_to_spherical_deg, spherical_deg_to_dir, wrap_deg};
