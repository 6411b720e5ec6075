//! Spherical-angle conversions for the cache grids.
//!
//! Surface cells and hemisphere buckets are addressed by polar angles in
//! degrees: `theta` measured from the local +Y axis, `phi` around it,
//! wrapped into [0, 360).

use glam::Vec3;

/// Wrap an angle in degrees into [0, 360).
#[inline]
pub fn wrap_deg(deg: f32) -> f32 {
    if deg < 0.0 {
        deg + 360.0
    } else {
        deg
    }
}

/// Unit direction for polar angles in degrees.
///
/// `theta` is measured from +Y, `phi` from +X toward +Z.
pub fn spherical_deg_to_dir(theta_deg: f32, phi_deg: f32) -> Vec3 {
    let theta = theta_deg.to_radians();
    let phi = phi_deg.to_radians();
    Vec3::new(phi.cos() * theta.sin(), theta.cos(), phi.sin() * theta.sin())
}

/// Polar angles in degrees for a direction: `(theta, phi)` with
/// `theta` in [0, 180] and `phi` wrapped into [0, 360).
pub fn dir_to_spherical_deg(dir: Vec3) -> (f32, f32) {
    let d = dir.normalize_or_zero();
    let theta = d.y.clamp(-1.0, 1.0).acos().to_degrees();
    let phi = wrap_deg(d.z.atan2(d.x).to_degrees());
    (theta, phi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_deg() {
        assert_eq!(wrap_deg(10.0), 10.0);
        assert_eq!(wrap_deg(-90.0), 270.0);
        assert_eq!(wrap_deg(0.0), 0.0);
    }

    #[test]
    fn test_poles() {
        assert!((spherical_deg_to_dir(0.0, 0.0) - Vec3::Y).length() < 1e-6);
        assert!((spherical_deg_to_dir(180.0, 0.0) + Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn test_equator() {
        let d = spherical_deg_to_dir(90.0, 0.0);
        assert!((d - Vec3::X).length() < 1e-5);
        let d = spherical_deg_to_dir(90.0, 90.0);
        assert!((d - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn test_round_trip() {
        for &(theta, phi) in &[(10.0, 20.0), (45.0, 200.0), (90.0, 359.0), (150.0, 1.0)] {
            let dir = spherical_deg_to_dir(theta, phi);
            let (t, p) = dir_to_spherical_deg(dir);
            assert!((t - theta).abs() < 1e-3, "theta {theta} -> {t}");
            assert!((p - phi).abs() < 1e-3, "phi {phi} -> {p}");
        }
    }
}
