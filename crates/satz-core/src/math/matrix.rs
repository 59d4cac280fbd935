use glam::{Mat4, Vec2, Vec4};

use crate::math::{Quad, Rect};

/// A transform applied to glyph quads before they are emitted, with a stack
/// for nested transforms.
///
/// Only the 2D part of the matrix (the x/y axes and the translation) is used
/// when transforming rectangles, but rotations around the x and y axes are
/// still useful for perspective-less "tilt" effects.
#[derive(Clone, Debug)]
pub struct QuadMatrix {
    matrix: Mat4,
    stack: Vec<Mat4>,
}

impl Default for QuadMatrix {
    fn default() -> QuadMatrix {
        QuadMatrix::new()
    }
}

impl QuadMatrix {
    pub fn new() -> QuadMatrix {
        QuadMatrix {
            matrix: Mat4::IDENTITY,
            stack: Vec::new(),
        }
    }

    pub fn matrix(&self) -> Mat4 {
        self.matrix
    }

    pub fn load_identity(&mut self) {
        self.matrix = Mat4::IDENTITY;
    }

    pub fn push(&mut self) {
        self.stack.push(self.matrix);
    }

    pub fn pop(&mut self) {
        if let Some(matrix) = self.stack.pop() {
            self.matrix = matrix;
        }
    }

    /// Resets the matrix to a pure translation.
    pub fn set_translation(&mut self, translation: Vec2) {
        self.matrix = Mat4::IDENTITY;
        self.matrix.w_axis.x = translation.x;
        self.matrix.w_axis.y = translation.y;
    }

    pub fn translate(&mut self, translation: Vec2) {
        self.matrix *= Mat4::from_translation(translation.extend(0.0));
    }

    pub fn scale(&mut self, scale: Vec2) {
        self.matrix *= Mat4::from_scale(scale.extend(1.0));
    }

    pub fn rotate_x(&mut self, angle: f32) {
        self.matrix *= Mat4::from_rotation_x(angle);
    }

    pub fn rotate_y(&mut self, angle: f32) {
        self.matrix *= Mat4::from_rotation_y(angle);
    }

    /// Rotation around the z axis, which only mixes the x and y axes.
    pub fn rotate_z(&mut self, angle: f32) {
        let (sin, cos) = angle.sin_cos();

        let x_axis: Vec4 = self.matrix.x_axis;
        let y_axis: Vec4 = self.matrix.y_axis;

        self.matrix.x_axis = x_axis * cos + y_axis * sin;
        self.matrix.y_axis = y_axis * cos - x_axis * sin;
    }

    /// Transforms the corners of an axis-aligned rectangle into a [`Quad`].
    pub fn transform_rect(&self, rect: &Rect) -> Quad {
        let x_axis = Vec2::new(self.matrix.x_axis.x, self.matrix.x_axis.y);
        let y_axis = Vec2::new(self.matrix.y_axis.x, self.matrix.y_axis.y);
        let origin = Vec2::new(self.matrix.w_axis.x, self.matrix.w_axis.y);

        let transform = |point: Vec2| origin + x_axis * point.x + y_axis * point.y;

        Quad {
            p1: transform(Vec2::new(rect.min.x, rect.min.y)),
            p2: transform(Vec2::new(rect.min.x, rect.max.y)),
            p3: transform(Vec2::new(rect.max.x, rect.max.y)),
            p4: transform(Vec2::new(rect.max.x, rect.min.y)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotate_z_matches_full_matrix() {
        let mut quad_matrix = QuadMatrix::new();
        quad_matrix.translate(Vec2::new(3.0, -2.0));
        quad_matrix.rotate_z(0.7);

        let mut reference = Mat4::from_translation(glam::Vec3::new(3.0, -2.0, 0.0));
        reference *= Mat4::from_rotation_z(0.7);

        assert!(quad_matrix.matrix().abs_diff_eq(reference, 1e-5));
    }

    #[test]
    fn transform_rect_translation() {
        let mut matrix = QuadMatrix::new();
        matrix.set_translation(Vec2::new(10.0, 20.0));

        let quad = matrix.transform_rect(&Rect::new(Vec2::ZERO, Vec2::new(2.0, 3.0)));
        assert_eq!(quad.p1, Vec2::new(10.0, 20.0));
        assert_eq!(quad.p2, Vec2::new(10.0, 23.0));
        assert_eq!(quad.p3, Vec2::new(12.0, 23.0));
        assert_eq!(quad.p4, Vec2::new(12.0, 20.0));
    }

    #[test]
    fn push_pop_restores_matrix() {
        let mut matrix = QuadMatrix::new();
        matrix.translate(Vec2::new(1.0, 1.0));
        matrix.push();
        matrix.rotate_z(1.0);
        matrix.pop();

        let mut expected = QuadMatrix::new();
        expected.translate(Vec2::new(1.0, 1.0));
        assert_eq!(matrix.matrix(), expected.matrix());
    }
}
