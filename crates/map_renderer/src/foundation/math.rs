//! Math utilities and types
//!
//! Matrices follow the column-vector convention: a point is transformed as
//! `m * p`, so composing `a` before `b` is written `b * a`.

pub use nalgebra::{Matrix4, Vector3};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Extension trait for Mat4 with the helpers map renderers reach for
pub trait Mat4Ext {
    /// Non-uniform scale matrix
    fn from_scale(sx: f32, sy: f32, sz: f32) -> Mat4;

    /// Translation in x/y combined with a uniform x/y scale, z left untouched
    ///
    /// The result maps `(x, y)` to `(x * scale + tx, y * scale + ty)`.
    fn from_trans_scale(tx: f32, ty: f32, scale: f32) -> Mat4;

    /// Replace `self` with `lhs * self`
    fn multiply_lhs(&mut self, lhs: &Mat4);
}

impl Mat4Ext for Mat4 {
    fn from_scale(sx: f32, sy: f32, sz: f32) -> Mat4 {
        Mat4::new_nonuniform_scaling(&Vec3::new(sx, sy, sz))
    }

    fn from_trans_scale(tx: f32, ty: f32, scale: f32) -> Mat4 {
        Mat4::new(
            scale, 0.0, 0.0, tx,
            0.0, scale, 0.0, ty,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    fn multiply_lhs(&mut self, lhs: &Mat4) {
        *self = lhs * *self;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    #[test]
    fn test_from_trans_scale_maps_points() {
        let m = Mat4::from_trans_scale(-10.0, 5.0, 2.0);
        let p = m.transform_point(&Point3::new(1.0, 1.0, 3.0));

        assert_relative_eq!(p.x, -8.0);
        assert_relative_eq!(p.y, 7.0);
        assert_relative_eq!(p.z, 3.0);
    }

    #[test]
    fn test_multiply_lhs_order() {
        let mut m = Mat4::new_translation(&Vec3::new(1.0, 0.0, 0.0));
        m.multiply_lhs(&Mat4::from_scale(2.0, 2.0, 2.0));

        // translate first, then scale
        let p = m.transform_point(&Point3::new(0.0, 0.0, 0.0));
        assert_relative_eq!(p.x, 2.0);
    }
}
