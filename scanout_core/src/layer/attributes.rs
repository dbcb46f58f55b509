// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Plain layer attributes shared by client and overlay layers.

/// How a layer's pixels combine with what lies beneath.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Blending {
    /// Opaque; alpha is ignored.
    #[default]
    None,
    /// Colour channels are premultiplied by alpha.
    Premultiplied,
    /// Colour channels are not premultiplied.
    Coverage,
}

/// The composition path a client asks for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CompositionType {
    /// Scan out directly when the hardware can.
    #[default]
    Device,
    /// Always composite with the GPU.
    Client,
    /// Fill the display frame with [`solid_color`](super::ClientLayer::solid_color).
    SolidColor,
}

/// A CIE 1931 xy chromaticity.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Chromaticity {
    /// x coordinate.
    pub x: f64,
    /// y coordinate.
    pub y: f64,
}

/// SMPTE ST 2086 / CTA-861.3 static HDR metadata.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HdrStaticMetadata {
    /// Red primary.
    pub red: Chromaticity,
    /// Green primary.
    pub green: Chromaticity,
    /// Blue primary.
    pub blue: Chromaticity,
    /// White point.
    pub white_point: Chromaticity,
    /// Maximum mastering luminance in cd/m².
    pub max_luminance: f64,
    /// Minimum mastering luminance in cd/m².
    pub min_luminance: f64,
    /// Maximum content light level.
    pub max_cll: u32,
    /// Maximum frame-average light level.
    pub max_fall: u32,
    /// Transfer function, `None` until one has been set.
    pub eotf: Option<u32>,
}

/// A horizontal band `[left, right)` of a tiled output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileConstraint {
    /// Left edge.
    pub left: i32,
    /// Right edge (exclusive).
    pub right: i32,
}

impl TileConstraint {
    /// Creates a constraint.
    #[must_use]
    pub const fn new(left: i32, right: i32) -> Self {
        Self { left, right }
    }
}
