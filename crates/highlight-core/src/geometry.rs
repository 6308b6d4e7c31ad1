//! Affine transforms and page viewports
//!
//! Matrices use the PDF `[a b c d e f]` layout, mapping `(x, y)` to
//! `(a*x + c*y + e, b*x + d*y + f)`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub const fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub const fn translation(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// Compose two transforms so that `inner` is applied first, then `self`.
    ///
    /// `viewport.then_apply(item)` places an item that lives in user space
    /// onto the viewport.
    pub fn then_apply(&self, inner: &Matrix) -> Matrix {
        Matrix {
            a: self.a * inner.a + self.c * inner.b,
            b: self.b * inner.a + self.d * inner.b,
            c: self.a * inner.c + self.c * inner.d,
            d: self.b * inner.c + self.d * inner.d,
            e: self.a * inner.e + self.c * inner.f + self.e,
            f: self.b * inner.e + self.d * inner.f + self.f,
        }
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Length of the transformed x unit vector.
    pub fn x_scale(&self) -> f64 {
        self.a.hypot(self.b)
    }

    /// Length of the transformed y unit vector.
    pub fn y_scale(&self) -> f64 {
        self.c.hypot(self.d)
    }

    pub fn from_operands(values: &[f64]) -> Option<Matrix> {
        match values {
            [a, b, c, d, e, f] => Some(Matrix::new(*a, *b, *c, *d, *e, *f)),
            _ => None,
        }
    }
}

/// A normalized page box `[x0 y0 x1 y1]` with `x0 <= x1` and `y0 <= y1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl PageBox {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }
}

/// Viewport mapping PDF user space to a top-left-origin, y-down view of the page.
///
/// Mirrors the browser renderer's page viewport: the view box is flipped
/// vertically, rotated by the page's `/Rotate`, and scaled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub transform: Matrix,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(view_box: PageBox, rotation: i64, scale: f64) -> Self {
        let rotation = rotation.rem_euclid(360);
        let center_x = (view_box.x1 + view_box.x0) / 2.0;
        let center_y = (view_box.y1 + view_box.y0) / 2.0;

        let (rotate_a, rotate_b, rotate_c, rotate_d) = match rotation {
            90 => (0.0, 1.0, 1.0, 0.0),
            180 => (-1.0, 0.0, 0.0, 1.0),
            270 => (0.0, -1.0, -1.0, 0.0),
            // Non-multiples of 90 are invalid; treat them as unrotated
            _ => (1.0, 0.0, 0.0, -1.0),
        };

        let (offset_x, offset_y, width, height) = if rotate_a == 0.0 {
            (
                (center_y - view_box.y0).abs() * scale,
                (center_x - view_box.x0).abs() * scale,
                view_box.height() * scale,
                view_box.width() * scale,
            )
        } else {
            (
                (center_x - view_box.x0).abs() * scale,
                (center_y - view_box.y0).abs() * scale,
                view_box.width() * scale,
                view_box.height() * scale,
            )
        };

        let transform = Matrix::new(
            rotate_a * scale,
            rotate_b * scale,
            rotate_c * scale,
            rotate_d * scale,
            offset_x - rotate_a * scale * center_x - rotate_c * scale * center_y,
            offset_y - rotate_b * scale * center_x - rotate_d * scale * center_y,
        );

        Self {
            transform,
            width,
            height,
        }
    }
}
