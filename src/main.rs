use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use psdlayer::{
    cli, container, layer::LayerRecord, pixels, ByteCursor, GlobalHeader, Samples,
};

#[derive(Parser)]
#[command(name = "psdlayer")]
#[command(about = "Inspect and extract layer records from PSD/PSB files")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every layer record's metadata
    Inspect {
        /// Path to input PSD/PSB file
        #[arg(short, long)]
        input: PathBuf,

        /// Also list channels, masks and info blocks
        #[arg(short, long)]
        verbose: bool,
    },

    /// Decode one layer's pixels and write the raw interleaved samples
    Extract {
        /// Path to input PSD/PSB file
        #[arg(short, long)]
        input: PathBuf,

        /// Zero-based layer index, bottom-most first
        #[arg(short, long)]
        layer: usize,

        /// Path for the raw sample dump
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// All layer records plus the position where the pixel-data region begins
struct ParsedLayers {
    header: GlobalHeader,
    records: Vec<LayerRecord>,
    pixel_data_start: u64,
}

fn parse_layers(data: &[u8]) -> anyhow::Result<(ParsedLayers, ByteCursor<&[u8]>)> {
    let mut cursor = ByteCursor::new(data);
    let header = GlobalHeader::read(&mut cursor).context("reading global header")?;
    let section = container::seek_layer_records(&mut cursor, &header)
        .context("locating layer records")?;

    let mut records = Vec::with_capacity(section.layer_count as usize);
    for index in 0..section.layer_count {
        let record = LayerRecord::read(&mut cursor, &header)
            .with_context(|| format!("reading layer record {index}"))?;
        records.push(record);
    }

    let pixel_data_start = cursor.position();
    Ok((
        ParsedLayers {
            header,
            records,
            pixel_data_start,
        },
        cursor,
    ))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { input, verbose } => {
            let data = fs::read(&input)
                .with_context(|| format!("opening {}", input.display()))?;
            let (parsed, _) = parse_layers(&data)?;

            println!(
                "{} version {} {:?} {}x{} depth {} : {} layers",
                input.display(),
                parsed.header.version.as_u16(),
                parsed.header.color_mode,
                parsed.header.width,
                parsed.header.height,
                parsed.header.depth,
                parsed.records.len(),
            );

            for (index, record) in parsed.records.iter().enumerate() {
                println!("{}", cli::summarize_layer(index, record));
                if verbose {
                    let detail = cli::describe_layer(record);
                    if !detail.is_empty() {
                        println!("{detail}");
                    }
                }
            }
        }

        Commands::Extract {
            input,
            layer,
            output,
        } => {
            let data = fs::read(&input)
                .with_context(|| format!("opening {}", input.display()))?;
            let (parsed, mut cursor) = parse_layers(&data)?;

            let Some(record) = parsed.records.get(layer) else {
                bail!(
                    "layer index {layer} out of range, file has {} layers",
                    parsed.records.len()
                );
            };

            // Channel regions for each layer follow sequentially after the
            // records; skip the regions of all preceding layers
            let skipped: u64 = parsed.records[..layer]
                .iter()
                .flat_map(|r| r.channels.iter())
                .map(|c| c.length)
                .sum();
            cursor.seek(parsed.pixel_data_start + skipped);

            let pixels = pixels::unpack(&mut cursor, &record.channels, &record.bounds, &parsed.header)
                .with_context(|| format!("decoding pixels of layer {layer}"))?;

            let bytes = match &pixels.samples {
                Samples::Eight(samples) => samples.clone(),
                Samples::Sixteen(samples) => samples
                    .iter()
                    .flat_map(|s| s.to_be_bytes())
                    .collect(),
            };
            fs::write(&output, &bytes)
                .with_context(|| format!("writing {}", output.display()))?;

            println!(
                "Extracted \"{}\": {}x{}, {} components, {}-bit -> {} ({} bytes)",
                record.name,
                pixels.width,
                pixels.height,
                pixels.components,
                parsed.header.depth,
                output.display(),
                bytes.len(),
            );
        }
    }

    Ok(())
}
