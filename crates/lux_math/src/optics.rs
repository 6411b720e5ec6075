//! Reflection, refraction and Fresnel terms for dielectric boundaries.
//!
//! Degenerate cases never error: total internal reflection makes `refract`
//! return the zero vector and `fresnel` return 1.0, and callers treat both
//! as ordinary "no transmission" results.

use glam::Vec3;

/// Reflect incident direction `i` about normal `n`.
#[inline]
pub fn reflect(i: Vec3, n: Vec3) -> Vec3 {
    i - 2.0 * i.dot(n) * n
}

/// Refraction direction by Snell's law.
///
/// `i` must be normalized. Handles the ray arriving from either side of the
/// boundary by flipping the normal and swapping the indices. Returns
/// `Vec3::ZERO` on total internal reflection.
pub fn refract(i: Vec3, n: Vec3, ior: f32) -> Vec3 {
    let mut cosi = i.dot(n).clamp(-1.0, 1.0);
    let mut etai = 1.0;
    let mut etat = ior;
    let mut normal = n;
    if cosi < 0.0 {
        cosi = -cosi;
    } else {
        std::mem::swap(&mut etai, &mut etat);
        normal = -n;
    }
    let eta = etai / etat;
    let k = 1.0 - eta * eta * (1.0 - cosi * cosi);
    if k < 0.0 {
        Vec3::ZERO
    } else {
        eta * i + (eta * cosi - k.sqrt()) * normal
    }
}

/// Fraction of incident light reflected at a dielectric boundary.
///
/// `i` is the incident view direction, `n` the surface normal, `ior` the
/// material refractive index. Uses the exact unpolarized Fresnel equations;
/// total internal reflection yields 1.0. Transmittance is `1 - kr`.
pub fn fresnel(i: Vec3, n: Vec3, ior: f32) -> f32 {
    let mut cosi = i.dot(n).clamp(-1.0, 1.0);
    let mut etai = 1.0;
    let mut etat = ior;
    if cosi > 0.0 {
        std::mem::swap(&mut etai, &mut etat);
    }
    // Compute sint using Snell's law
    let sint = etai / etat * (1.0 - cosi * cosi).max(0.0).sqrt();
    if sint >= 1.0 {
        // Total internal reflection
        1.0
    } else {
        let cost = (1.0 - sint * sint).max(0.0).sqrt();
        cosi = cosi.abs();
        let rs = ((etat * cosi) - (etai * cost)) / ((etat * cosi) + (etai * cost));
        let rp = ((etai * cosi) - (etat * cost)) / ((etai * cosi) + (etat * cost));
        (rs * rs + rp * rp) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reflect() {
        let i = Vec3::new(1.0, -1.0, 0.0).normalize();
        let r = reflect(i, Vec3::Y);
        assert!((r - Vec3::new(1.0, 1.0, 0.0).normalize()).length() < 1e-6);
    }

    #[test]
    fn test_fresnel_normal_incidence() {
        // At normal incidence on glass (ior 1.5) the standard formula gives
        // ((1-1.5)/(1+1.5))^2 = 0.04.
        let kr = fresnel(-Vec3::Y, Vec3::Y, 1.5);
        assert!((kr - 0.04).abs() < 1e-3, "kr={kr}");
    }

    #[test]
    fn test_fresnel_grazing_incidence() {
        let i = Vec3::new(1.0, -0.001, 0.0).normalize();
        let kr = fresnel(i, Vec3::Y, 1.5);
        assert!(kr > 0.98, "kr={kr}");
    }

    #[test]
    fn test_refract_straight_through_at_normal_incidence() {
        let t = refract(-Vec3::Y, Vec3::Y, 1.5);
        assert!((t.normalize() + Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn test_refract_total_internal_reflection() {
        // Grazing exit from inside the denser medium: no transmitted ray.
        let i = Vec3::new(0.9, 0.436, 0.0).normalize();
        let t = refract(i, Vec3::Y, 1.5);
        assert_eq!(t, Vec3::ZERO);
        assert_eq!(fresnel(i, Vec3::Y, 1.5), 1.0);
    }

    #[test]
    fn test_refract_bends_toward_normal_entering() {
        let i = Vec3::new(1.0, -1.0, 0.0).normalize();
        let t = refract(i, Vec3::Y, 1.5).normalize();
        // Entering a denser medium the ray bends toward the (negated) normal.
        assert!(t.y < 0.0);
        assert!(t.x.abs() < i.x.abs());
    }
}
