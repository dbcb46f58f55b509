// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Buffer transforms: the eight rotations and reflections of a rectangle.
//!
//! [`Transform`] uses the HAL bit encoding (`FLIP_H = 1`, `FLIP_V = 2`,
//! `ROT_90 = 4`), where the reflections are applied first and the clockwise
//! quarter turn last. Composition is group multiplication, not bit addition:
//! [`then`](Transform::then) applies `self` and afterwards `next`.

use kurbo::Affine;

/// One of the eight orientation-preserving or -reversing symmetries of a
/// rectangle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Transform {
    /// No transform.
    #[default]
    Identity = 0,
    /// Mirror across the vertical axis.
    FlipH = 1,
    /// Mirror across the horizontal axis.
    FlipV = 2,
    /// Half turn.
    Rotate180 = 3,
    /// Clockwise quarter turn.
    Rotate90 = 4,
    /// Horizontal mirror, then clockwise quarter turn.
    FlipHRotate90 = 5,
    /// Vertical mirror, then clockwise quarter turn.
    FlipVRotate90 = 6,
    /// Clockwise three-quarter turn.
    Rotate270 = 7,
}

/// Row-major 2x2 integer matrix acting on `(x, y)` with y pointing down.
type Mat2 = [[i8; 2]; 2];

const IDENTITY: Mat2 = [[1, 0], [0, 1]];
const FLIP_H: Mat2 = [[-1, 0], [0, 1]];
const FLIP_V: Mat2 = [[1, 0], [0, -1]];
const ROT_90: Mat2 = [[0, -1], [1, 0]];

const fn mul(a: Mat2, b: Mat2) -> Mat2 {
    [
        [
            a[0][0] * b[0][0] + a[0][1] * b[1][0],
            a[0][0] * b[0][1] + a[0][1] * b[1][1],
        ],
        [
            a[1][0] * b[0][0] + a[1][1] * b[1][0],
            a[1][0] * b[0][1] + a[1][1] * b[1][1],
        ],
    ]
}

impl Transform {
    /// All transforms in HAL bit order.
    pub const ALL: [Self; 8] = [
        Self::Identity,
        Self::FlipH,
        Self::FlipV,
        Self::Rotate180,
        Self::Rotate90,
        Self::FlipHRotate90,
        Self::FlipVRotate90,
        Self::Rotate270,
    ];

    /// Decodes a HAL transform bitmask. Returns `None` for bits above `ROT_90`.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Option<Self> {
        if bits > 7 {
            return None;
        }
        Some(Self::ALL[bits as usize])
    }

    /// The HAL transform bitmask.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u32 {
        self as u32
    }

    /// Returns `true` if width and height trade places.
    #[inline]
    #[must_use]
    pub const fn swaps_axes(self) -> bool {
        self.bits() & 4 != 0
    }

    const fn matrix(self) -> Mat2 {
        let bits = self.bits();
        let mut m = IDENTITY;
        if bits & 1 != 0 {
            m = mul(FLIP_H, m);
        }
        if bits & 2 != 0 {
            m = mul(FLIP_V, m);
        }
        if bits & 4 != 0 {
            m = mul(ROT_90, m);
        }
        m
    }

    const fn from_matrix(m: Mat2) -> Self {
        let mut i = 0;
        while i < Self::ALL.len() {
            let c = Self::ALL[i].matrix();
            if c[0][0] == m[0][0] && c[0][1] == m[0][1] && c[1][0] == m[1][0] && c[1][1] == m[1][1]
            {
                return Self::ALL[i];
            }
            i += 1;
        }
        // The eight matrices form a closed group, so products always match.
        Self::Identity
    }

    /// Applies `self`, then `next`.
    #[must_use]
    pub const fn then(self, next: Self) -> Self {
        Self::from_matrix(mul(next.matrix(), self.matrix()))
    }

    /// The transform undoing `self`.
    #[must_use]
    pub const fn inverse(self) -> Self {
        let m = self.matrix();
        // Orthogonal matrices invert by transposition.
        Self::from_matrix([[m[0][0], m[1][0]], [m[0][1], m[1][1]]])
    }

    /// Maps the rectangle `src` onto `dst`, applying `self` about the centre.
    ///
    /// `src` is the coordinate space the input lives in (for example a source
    /// crop); `dst` is the rectangle its transformed image must fill.
    #[must_use]
    pub fn rect_mapping(self, src: kurbo::Rect, dst: kurbo::Rect) -> Affine {
        let src_w = src.width();
        let src_h = src.height();
        if src_w <= 0.0 || src_h <= 0.0 {
            return Affine::translate(dst.origin().to_vec2()) * Affine::scale(0.0);
        }
        let m = self.matrix();
        let orient = Affine::new([
            f64::from(m[0][0]),
            f64::from(m[1][0]),
            f64::from(m[0][1]),
            f64::from(m[1][1]),
            0.0,
            0.0,
        ]);
        Affine::translate(dst.origin().to_vec2())
            * Affine::scale_non_uniform(dst.width(), dst.height())
            * Affine::translate((0.5, 0.5))
            * orient
            * Affine::translate((-0.5, -0.5))
            * Affine::scale_non_uniform(1.0 / src_w, 1.0 / src_h)
            * Affine::translate(-src.origin().to_vec2())
    }
}
