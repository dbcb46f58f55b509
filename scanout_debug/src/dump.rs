// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JSON dumps of overlay layers.
//!
//! [`dump_layers`] describes a frame's layer stack: geometry, transforms,
//! change state, classification, composition and the imported buffer.

use std::io::{self, Write};

use serde_json::{Value, json};

use scanout_core::fence::raw_or_none;
use scanout_core::geometry::Rect;
use scanout_core::layer::OverlayLayer;

/// Describes one overlay layer.
#[must_use]
pub fn dump_layer(layer: &OverlayLayer) -> Value {
    let buffer = layer.buffer().map_or(Value::Null, |buffer| {
        let info = buffer.info();
        json!({
            "handle": buffer.handle().0,
            "width": info.width,
            "height": info.height,
            "format": format!("{:#010x}", info.format),
            "modifier": info.modifier,
            "scanout": info.scanout,
        })
    });
    let crop = layer.source_crop();
    json!({
        "layer_index": layer.layer_index(),
        "z_order": layer.z_order(),
        "visible": layer.is_visible(),
        "kind": format!("{:?}", layer.kind()),
        "display_frame": rect(layer.display_frame()),
        "source_crop": [crop.x0, crop.y0, crop.x1, crop.y1],
        "surface_damage": rect(layer.surface_damage()),
        "transform": format!("{:?}", layer.transform()),
        "plane_transform": format!("{:?}", layer.plane_transform()),
        "merged_transform": format!("{:?}", layer.merged_transform()),
        "alpha": layer.alpha(),
        "blending": format!("{:?}", layer.blending()),
        "dataspace": layer.dataspace(),
        "color_space": layer.color_space(),
        "solid_color": format!("{:#010x}", layer.solid_color()),
        "state": names(layer.state().iter_names()),
        "supported_composition": names(layer.supported_composition().iter_names()),
        "actual_composition": names(layer.actual_composition().iter_names()),
        "import_failed": layer.import_failed(),
        "buffer": buffer,
        "acquire_fence": raw_or_none(layer.acquire_fence()),
    })
}

/// Describes a layer stack, back to front.
#[must_use]
pub fn dump_layers(layers: &[OverlayLayer]) -> Value {
    Value::Array(layers.iter().map(dump_layer).collect())
}

/// Writes [`dump_layers`] as pretty-printed JSON.
pub fn write_layers(layers: &[OverlayLayer], writer: &mut dyn Write) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, &dump_layers(layers))?;
    writeln!(writer)
}

fn rect(r: Rect) -> Value {
    json!([r.left, r.top, r.right, r.bottom])
}

fn names<T>(flags: impl Iterator<Item = (&'static str, T)>) -> Vec<&'static str> {
    flags.map(|(name, _)| name).collect()
}
