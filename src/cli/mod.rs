//! Presentation helpers for the inspection CLI

use crate::layer::LayerRecord;

/// Human-readable name for a blend-mode key; unknown tags print raw
pub fn blend_mode_name(key: &[u8; 4]) -> &'static str {
    match key {
        b"pass" => "Pass Through",
        b"norm" => "Normal",
        b"diss" => "Dissolve",
        b"dark" => "Darken",
        b"mul " => "Multiply",
        b"idiv" => "Color Burn",
        b"lbrn" => "Linear Burn",
        b"lite" => "Lighten",
        b"scrn" => "Screen",
        b"div " => "Color Dodge",
        b"lddg" => "Linear Dodge",
        b"over" => "Overlay",
        b"sLit" => "Soft Light",
        b"hLit" => "Hard Light",
        b"vLit" => "Vivid Light",
        b"lLit" => "Linear Light",
        b"pLit" => "Pin Light",
        b"hMix" => "Hard Mix",
        b"diff" => "Difference",
        b"smud" => "Exclusion",
        b"fsub" => "Subtract",
        b"fdiv" => "Divide",
        b"hue " => "Hue",
        b"sat " => "Saturation",
        b"colr" => "Color",
        b"lum " => "Luminosity",
        _ => "Unknown",
    }
}

/// One-line summary of a layer record
pub fn summarize_layer(index: usize, record: &LayerRecord) -> String {
    format!(
        "#{index} \"{}\" {}x{} at ({},{}) blend={} opacity={} {}",
        record.name,
        record.bounds.width(),
        record.bounds.height(),
        record.bounds.left,
        record.bounds.top,
        blend_mode_name(&record.blend_mode),
        record.opacity,
        if record.visible { "visible" } else { "hidden" },
    )
}

/// Multi-line detail listing for `--verbose` output
pub fn describe_layer(record: &LayerRecord) -> String {
    let mut lines = Vec::new();

    let mut flags = Vec::new();
    if record.clipping {
        flags.push("clipping");
    }
    if record.transparency_protected {
        flags.push("alpha-locked");
    }
    if record.irrelevant {
        flags.push("irrelevant");
    }
    if !flags.is_empty() {
        lines.push(format!("    flags: {}", flags.join(", ")));
    }

    for channel in &record.channels {
        lines.push(format!(
            "    channel {:>2}: {} bytes",
            channel.id, channel.length
        ));
    }

    if let Some(mask) = &record.mask {
        lines.push(format!(
            "    mask: {}x{} at ({},{}) default={}{}",
            mask.bounds.width(),
            mask.bounds.height(),
            mask.bounds.left,
            mask.bounds.top,
            mask.default_color,
            if mask.disabled { " (disabled)" } else { "" },
        ));
    }

    if !record.blending_ranges.is_empty() {
        lines.push(format!(
            "    blending ranges: {} bytes",
            record.blending_ranges.len()
        ));
    }

    for block in record.info_blocks.iter() {
        lines.push(format!(
            "    info block '{}': {} bytes",
            block.key,
            block.payload.len()
        ));
    }

    lines.join("\n")
}
