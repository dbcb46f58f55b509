// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Display configuration.

use crate::transform::Transform;

/// Mode and placement of one display output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DisplayConfig {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Rotation applied to everything shown on the output.
    pub rotation: Transform,
    /// Refresh rate in Hz.
    pub refresh_rate: u32,
    /// Horizontal density in dots per thousand inches.
    pub dpi_x: u32,
    /// Vertical density in dots per thousand inches.
    pub dpi_y: u32,
}

impl DisplayConfig {
    /// An off-screen output of the given size.
    ///
    /// Virtual outputs report 60 Hz and no physical density.
    #[must_use]
    pub const fn virtual_output(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            rotation: Transform::Identity,
            refresh_rate: 60,
            dpi_x: 0,
            dpi_y: 0,
        }
    }

    /// Returns the config with a rotation applied.
    #[must_use]
    pub const fn rotated(mut self, rotation: Transform) -> Self {
        self.rotation = rotation;
        self
    }

    /// Nominal frame period in nanoseconds, or 0 with no refresh rate.
    #[must_use]
    pub const fn vsync_period_nanos(&self) -> u64 {
        if self.refresh_rate == 0 {
            0
        } else {
            1_000_000_000 / self.refresh_rate as u64
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self::virtual_output(1, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_single_pixel_at_60hz() {
        let c = DisplayConfig::default();
        assert_eq!((c.width, c.height), (1, 1));
        assert_eq!(c.refresh_rate, 60);
        assert_eq!(c.rotation, Transform::Identity);
        assert_eq!(c.vsync_period_nanos(), 16_666_666);
    }

    #[test]
    fn rotated_preset() {
        let c = DisplayConfig::virtual_output(1920, 1080).rotated(Transform::Rotate90);
        assert_eq!(c.rotation, Transform::Rotate90);
        assert_eq!(c.width, 1920);
    }
}
