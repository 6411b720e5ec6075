// Surface-frame utilities for Mat4
//
// Extends glam::Mat4 with a direction transform and builds the local frame
// anchored at a surface cell. Note: glam::Mat4 already provides
// transform_point3() and inverse().

use glam::{Mat4, Vec3, Vec4};

/// Extension trait for Mat4 to provide additional transform utilities
pub trait Mat4Ext {
    /// Transform a vector in 3D space (applies rotation and scale, but NOT translation).
    /// Vectors have an implicit w=0 component.
    fn transform_vector3(&self, vector: Vec3) -> Vec3;
}

impl Mat4Ext for Mat4 {
    fn transform_vector3(&self, vector: Vec3) -> Vec3 {
        // Transform as direction (w=0) - translation should not affect vectors
        let v4 = Vec4::new(vector.x, vector.y, vector.z, 0.0);
        let transformed = *self * v4;
        Vec3::new(transformed.x, transformed.y, transformed.z)
    }
}

/// Build the local-to-world frame of a surface cell.
///
/// Local +Y maps onto `normal`, and the frame is anchored at `center`.
/// The tangent axes are arbitrary but orthonormal; hemisphere bucket
/// directions only need a consistent frame per cell, not a globally
/// continuous one.
pub fn normal_frame(center: Vec3, normal: Vec3) -> Mat4 {
    let n = normal.normalize_or_zero();
    // Pick a helper axis that is not parallel to the normal.
    let helper = if n.y.abs() < 0.999 { Vec3::Y } else { Vec3::X };
    let tangent = helper.cross(n).normalize();
    let bitangent = n.cross(tangent);
    Mat4::from_cols(
        Vec4::new(tangent.x, tangent.y, tangent.z, 0.0),
        Vec4::new(n.x, n.y, n.z, 0.0),
        Vec4::new(bitangent.x, bitangent.y, bitangent.z, 0.0),
        Vec4::new(center.x, center.y, center.z, 1.0),
    )
}
