//! Vector and matrix helpers used to build the camera transforms.
//!
//! The vector and matrix types are [`glam`]'s. The functions here pin down the
//! exact formulas the renderer relies on, so the view matrix is built from an
//! explicit basis rather than whatever convention a library call picks.
//!
//! # Layout
//!
//! Matrices are meant to be read as row-major with row vectors
//! (`v * view * proj`). glam stores column-major matrices used with column
//! vectors (`proj * view * v`). One is the transpose of the other with the
//! same memory layout, so a glam matrix uploaded with
//! [`Mat4::to_cols_array_2d`] is byte-for-byte the row-major matrix a shader
//! reading row vectors expects.

use glam::{Mat4, Vec3, Vec4};

/// Divides each component by the Euclidean magnitude.
///
/// A zero vector yields non-finite components.
pub fn normalize(v: Vec3) -> Vec3 {
    let magnitude = (v.x * v.x + v.y * v.y + v.z * v.z).sqrt();
    Vec3::new(v.x / magnitude, v.y / magnitude, v.z / magnitude)
}

pub fn dot(a: Vec3, b: Vec3) -> f32 {
    a.x * b.x + a.y * b.y + a.z * b.z
}

/// Right-handed cross product.
pub fn cross(a: Vec3, b: Vec3) -> Vec3 {
    Vec3::new(
        a.y * b.z - a.z * b.y,
        a.z * b.x - a.x * b.z,
        a.x * b.y - a.y * b.x,
    )
}

/// Matrix product `a * b`: each entry is a row of `a` dotted with a column of `b`.
pub fn multiply(a: Mat4, b: Mat4) -> Mat4 {
    let row = |r: usize| a.row(r);
    let entry = |r: usize, c: usize| row(r).dot(b.col(c));
    Mat4::from_cols(
        Vec4::new(entry(0, 0), entry(1, 0), entry(2, 0), entry(3, 0)),
        Vec4::new(entry(0, 1), entry(1, 1), entry(2, 1), entry(3, 1)),
        Vec4::new(entry(0, 2), entry(1, 2), entry(2, 2), entry(3, 2)),
        Vec4::new(entry(0, 3), entry(1, 3), entry(2, 3), entry(3, 3)),
    )
}

/// Right-handed view matrix looking from `eye` toward `target`.
///
/// forward = normalize(eye - target), right = normalize(up x forward),
/// true up = forward x right. The basis vectors become the rotation rows and
/// the translation is the negated dot product of each with `eye`.
pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
    let forward = normalize(eye - target);
    let right = normalize(cross(up, forward));
    let true_up = cross(forward, right);

    Mat4::from_cols(
        Vec4::new(right.x, true_up.x, forward.x, 0.0),
        Vec4::new(right.y, true_up.y, forward.y, 0.0),
        Vec4::new(right.z, true_up.z, forward.z, 0.0),
        Vec4::new(
            -dot(right, eye),
            -dot(true_up, eye),
            -dot(forward, eye),
            1.0,
        ),
    )
}

/// Right-handed perspective projection with depth mapped to `[0, 1]`.
///
/// `fov_y` is the vertical field of view in radians.
pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    let focal = 1.0 / (fov_y * 0.5).tan();
    let range = far / (near - far);
    Mat4::from_cols(
        Vec4::new(focal / aspect, 0.0, 0.0, 0.0),
        Vec4::new(0.0, focal, 0.0, 0.0),
        Vec4::new(0.0, 0.0, range, -1.0),
        Vec4::new(0.0, 0.0, range * near, 0.0),
    )
}

/// Drops the translation part of a view matrix, keeping only its rotation.
pub fn rotation_only(view: Mat4) -> Mat4 {
    let mut rotation = view;
    rotation.w_axis = Vec4::W;
    rotation
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    fn sample_vectors() -> Vec<Vec3> {
        vec![
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(3.0, -4.0, 12.0),
            Vec3::new(-0.25, 0.5, 0.125),
            Vec3::new(30.0, 30.0, 30.0),
            Vec3::new(1e-3, 2e-3, -5e-4),
        ]
    }

    fn sample_matrix(seed: f32) -> Mat4 {
        Mat4::from_cols_array(&std::array::from_fn(|i| {
            ((i as f32 + 1.0) * seed).sin() * 3.0
        }))
    }

    fn assert_mat_eq(a: Mat4, b: Mat4, eps: f32) {
        for (x, y) in a.to_cols_array().iter().zip(b.to_cols_array().iter()) {
            assert!((x - y).abs() < eps, "{a:?} != {b:?}");
        }
    }

    #[test]
    fn normalize_yields_unit_length() {
        for v in sample_vectors() {
            let n = normalize(v);
            assert!((dot(n, n).sqrt() - 1.0).abs() < EPS, "{v:?} -> {n:?}");
        }
    }

    #[test]
    fn normalize_zero_is_not_finite() {
        assert!(!normalize(Vec3::ZERO).is_finite());
    }

    #[test]
    fn cross_is_orthogonal_to_both_inputs() {
        let vectors = sample_vectors();
        for a in &vectors {
            for b in &vectors {
                let c = cross(*a, *b);
                let scale = a.length() * b.length();
                assert!(dot(c, *a).abs() <= EPS * scale * a.length().max(1.0));
                assert!(dot(c, *b).abs() <= EPS * scale * b.length().max(1.0));
            }
        }
    }

    #[test]
    fn cross_follows_right_hand_rule() {
        assert_eq!(cross(Vec3::X, Vec3::Y), Vec3::Z);
        assert_eq!(cross(Vec3::Y, Vec3::Z), Vec3::X);
        assert_eq!(cross(Vec3::Z, Vec3::X), Vec3::Y);
    }

    #[test]
    fn multiply_matches_glam() {
        let a = sample_matrix(0.7);
        let b = sample_matrix(1.3);
        assert_mat_eq(multiply(a, b), a * b, EPS);
    }

    #[test]
    fn multiply_is_associative() {
        let a = sample_matrix(0.3);
        let b = sample_matrix(1.1);
        let c = sample_matrix(2.9);
        assert_mat_eq(
            multiply(multiply(a, b), c),
            multiply(a, multiply(b, c)),
            1e-2,
        );
    }

    #[test]
    fn identity_is_neutral() {
        let a = sample_matrix(0.9);
        assert_mat_eq(multiply(a, Mat4::IDENTITY), a, EPS);
        assert_mat_eq(multiply(Mat4::IDENTITY, a), a, EPS);
    }

    #[test]
    fn look_at_maps_eye_to_origin() {
        let eye = Vec3::new(30.0, 30.0, 30.0);
        let view = look_at(eye, Vec3::ZERO, Vec3::Y);
        let p = view * eye.extend(1.0);
        assert!(p.truncate().length() < EPS, "{p:?}");
        assert!((p.w - 1.0).abs() < EPS);
    }

    #[test]
    fn look_at_puts_target_in_front() {
        let eye = Vec3::new(0.0, 0.0, 10.0);
        let view = look_at(eye, Vec3::ZERO, Vec3::Y);
        let target = view * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert!((target.z + 10.0).abs() < EPS, "{target:?}");
    }

    #[test]
    fn look_at_agrees_with_glam() {
        let eye = Vec3::new(-4.0, 7.5, 2.0);
        let target = Vec3::new(1.0, 0.0, -3.0);
        assert_mat_eq(
            look_at(eye, target, Vec3::Y),
            Mat4::look_at_rh(eye, target, Vec3::Y),
            EPS,
        );
    }

    #[test]
    fn perspective_agrees_with_glam() {
        let fov = 75.0_f32.to_radians();
        assert_mat_eq(
            perspective(fov, 4.0 / 3.0, 0.01, 100.0),
            Mat4::perspective_rh(fov, 4.0 / 3.0, 0.01, 100.0),
            EPS,
        );
    }

    #[test]
    fn perspective_maps_near_and_far_to_unit_depth() {
        let proj = perspective(1.0, 1.0, 0.5, 50.0);
        let near = proj * Vec4::new(0.0, 0.0, -0.5, 1.0);
        let far = proj * Vec4::new(0.0, 0.0, -50.0, 1.0);
        assert!((near.z / near.w).abs() < EPS);
        assert!((far.z / far.w - 1.0).abs() < EPS);
    }

    #[test]
    fn rotation_only_keeps_eye_direction() {
        let eye = Vec3::new(5.0, 2.0, 1.0);
        let view = look_at(eye, Vec3::ZERO, Vec3::Y);
        let rotation = rotation_only(view);
        assert_eq!(rotation.w_axis, Vec4::W);
        assert_eq!(rotation.x_axis, view.x_axis);
    }
}
