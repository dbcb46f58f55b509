// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Integer rectangles and regions.
//!
//! Display frames, damage and visible regions are pixel aligned and use
//! [`Rect`]. Source crops are sub-pixel and use [`kurbo::Rect`] directly; the
//! two meet in [`Rect::from_kurbo_expand`] when a float rectangle has to be
//! rounded out to whole pixels.

use core::fmt;

/// An axis-aligned integer rectangle stored as edges.
///
/// `right` and `bottom` are exclusive. A rectangle whose width or height is
/// not positive is *empty*; empty rectangles are the identity for
/// [`union`](Self::union).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    /// Left edge.
    pub left: i32,
    /// Top edge.
    pub top: i32,
    /// Right edge (exclusive).
    pub right: i32,
    /// Bottom edge (exclusive).
    pub bottom: i32,
}

impl Rect {
    /// The all-zero rectangle.
    pub const ZERO: Self = Self::new(0, 0, 0, 0);

    /// Creates a rectangle from its edges.
    #[inline]
    #[must_use]
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Creates a rectangle at the origin with the given size.
    #[inline]
    #[must_use]
    pub const fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, clamp_i32(width), clamp_i32(height))
    }

    /// Width in pixels, or 0 for inverted rectangles.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> u32 {
        span(self.left, self.right)
    }

    /// Height in pixels, or 0 for inverted rectangles.
    #[inline]
    #[must_use]
    pub const fn height(&self) -> u32 {
        span(self.top, self.bottom)
    }

    /// Returns `true` if the rectangle covers no pixels.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }

    /// Smallest rectangle containing both. Empty inputs are ignored.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        match (self.is_empty(), other.is_empty()) {
            (true, true) => Self::ZERO,
            (true, false) => *other,
            (false, true) => *self,
            (false, false) => Self::new(
                self.left.min(other.left),
                self.top.min(other.top),
                self.right.max(other.right),
                self.bottom.max(other.bottom),
            ),
        }
    }

    /// Overlap of both rectangles, or [`Rect::ZERO`] if they are disjoint.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        let r = Self::new(
            self.left.max(other.left),
            self.top.max(other.top),
            self.right.min(other.right),
            self.bottom.min(other.bottom),
        );
        if r.is_empty() { Self::ZERO } else { r }
    }

    /// Returns the rectangle shifted by `(dx, dy)`.
    #[inline]
    #[must_use]
    pub const fn translate(&self, dx: i32, dy: i32) -> Self {
        Self::new(
            self.left.saturating_add(dx),
            self.top.saturating_add(dy),
            self.right.saturating_add(dx),
            self.bottom.saturating_add(dy),
        )
    }

    /// Converts to a float rectangle.
    #[inline]
    #[must_use]
    pub fn to_kurbo(&self) -> kurbo::Rect {
        kurbo::Rect::new(
            f64::from(self.left),
            f64::from(self.top),
            f64::from(self.right),
            f64::from(self.bottom),
        )
    }

    /// Rounds a float rectangle outwards to whole pixels.
    ///
    /// Edges within [`SNAP_EPSILON`] of a whole pixel are taken as lying on
    /// it, so rounding noise from composed transforms never grows the result
    /// by a pixel. Non-finite input yields [`Rect::ZERO`].
    #[must_use]
    pub fn from_kurbo_expand(rect: kurbo::Rect) -> Self {
        if !rect.is_finite() {
            return Self::ZERO;
        }
        let r = kurbo::Rect::new(snap(rect.x0), snap(rect.y0), snap(rect.x1), snap(rect.y1))
            .abs()
            .expand();
        Self::new(
            saturate(r.x0),
            saturate(r.y0),
            saturate(r.x1),
            saturate(r.y1),
        )
    }

    /// Bounding rectangle of a region.
    ///
    /// An empty region has [`Rect::ZERO`] bounds.
    #[must_use]
    pub fn bounds_of(region: &[Self]) -> Self {
        region.iter().fold(Self::ZERO, |acc, r| acc.union(r))
    }
}

impl fmt::Debug for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rect([{}, {}] - [{}, {}])",
            self.left, self.top, self.right, self.bottom
        )
    }
}

/// Pixel width of a sub-pixel source crop.
///
/// Partially covered pixels on either edge count as whole pixels.
#[must_use]
pub fn crop_width(crop: &kurbo::Rect) -> u32 {
    crop_span(crop.x0, crop.x1)
}

/// Pixel height of a sub-pixel source crop.
#[must_use]
pub fn crop_height(crop: &kurbo::Rect) -> u32 {
    crop_span(crop.y0, crop.y1)
}

/// Distance from a whole pixel below which a float edge is snapped onto it.
pub const SNAP_EPSILON: f64 = 1e-6;

fn snap(v: f64) -> f64 {
    let r = v.round();
    if (v - r).abs() < SNAP_EPSILON { r } else { v }
}

fn crop_span(start: f64, end: f64) -> u32 {
    if !(start.is_finite() && end.is_finite()) || end <= start {
        return 0;
    }
    let px = snap(end).ceil() - snap(start).floor();
    if px >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "range checked above, value is integral"
        )]
        let v = px as u32;
        v
    }
}

const fn span(start: i32, end: i32) -> u32 {
    if end <= start {
        0
    } else {
        end.abs_diff(start)
    }
}

const fn clamp_i32(v: u32) -> i32 {
    if v > i32::MAX as u32 {
        i32::MAX
    } else {
        v as i32
    }
}

fn saturate(v: f64) -> i32 {
    if v >= f64::from(i32::MAX) {
        i32::MAX
    } else if v <= f64::from(i32::MIN) {
        i32::MIN
    } else {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "range checked above, value is integral"
        )]
        let i = v as i32;
        i
    }
}
