//! OLED Anim CLI - Pack C header listings into animation containers.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};

use oled_anim::{
    animation::{AnimationAssembler, AnimationReader, PayloadEncoding, ReadError},
    batch, columns, listing,
    schema::{BitDepth, PackConfig},
};

#[derive(Parser)]
#[command(name = "oled-anim")]
#[command(about = "Pack monochrome bitmap listings into display animation containers")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack header listings into `.bin` animation containers
    Pack(PackArgs),

    /// Convert a row-major listing into page/column-major order
    Columns {
        /// Input `.h` listing
        #[arg(short, long)]
        input: PathBuf,

        /// Output `.h` listing
        #[arg(short, long)]
        output: PathBuf,

        /// Image width in pixels
        #[arg(short = 'W', long, default_value_t = 128)]
        width: usize,

        /// Image height in pixels
        #[arg(short = 'H', long, default_value_t = 64)]
        height: usize,
    },

    /// Verify a container and print its layout
    Inspect {
        /// Container file
        file: PathBuf,
    },
}

#[derive(Args)]
struct PackArgs {
    /// Listing files or directories containing them
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// JSON pack configuration; flags below override its fields
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Frame width in pixels
    #[arg(short = 'W', long)]
    width: Option<u16>,

    /// Frame height in pixels
    #[arg(short = 'H', long)]
    height: Option<u16>,

    /// Bit depth (1, 4 or 8)
    #[arg(short, long)]
    bit_depth: Option<u8>,

    /// Number of splits per frame
    #[arg(short, long)]
    splits: Option<u16>,

    /// Version string stored in frame headers
    #[arg(short, long)]
    version: Option<String>,

    /// Store payloads uncompressed
    #[arg(long)]
    no_rle: bool,

    /// Reorder frames into page/column-major layout before packing
    #[arg(long)]
    column_major: bool,
}

impl PackArgs {
    fn to_config(&self) -> Result<PackConfig> {
        let mut config = match &self.config {
            Some(path) => PackConfig::from_json_file(path)?,
            None => {
                if self.width.is_none() || self.height.is_none() {
                    bail!("--width and --height are required without --config");
                }
                PackConfig::default()
            }
        };

        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(bits) = self.bit_depth {
            config.bit_depth = BitDepth::try_from(bits)?;
        }
        if let Some(splits) = self.splits {
            config.splits = splits;
        }
        if let Some(version) = &self.version {
            config.version = version.clone();
        }
        if self.no_rle {
            config.enable_rle = false;
        }
        if self.column_major {
            config.column_major = true;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Pack(args) => run_pack(&args),
        Commands::Columns {
            input,
            output,
            width,
            height,
        } => run_columns(input, output, width, height),
        Commands::Inspect { file } => run_inspect(file),
    }
}

fn run_pack(args: &PackArgs) -> Result<()> {
    let assembler = AnimationAssembler::new(args.to_config()?)?;
    let config = assembler.config();
    println!(
        "Animation: {}x{}, {}-bit, {} splits, version {}, RLE {}{}",
        config.width,
        config.height,
        config.bit_depth.bits(),
        config.splits,
        config.version,
        if config.enable_rle { "on" } else { "off" },
        if config.column_major { ", column-major" } else { "" }
    );

    let inputs = batch::collect_inputs(&args.inputs);
    if inputs.is_empty() {
        bail!("No .h listings found in the given inputs");
    }

    let summary = batch::pack_all(&assembler, &inputs, &args.output);
    for result in &summary.results {
        match result {
            Ok(outcome) => println!(
                "✓ {} -> {}\n  {}",
                outcome.input.display(),
                outcome.output.display(),
                outcome.stats
            ),
            Err(e) => println!("✗ {e}"),
        }
    }
    println!("Packed {}/{} listings", summary.succeeded(), summary.total());

    if summary.succeeded() == 0 {
        bail!("No containers written");
    }
    Ok(())
}

fn run_columns(input: PathBuf, output: PathBuf, width: usize, height: usize) -> Result<()> {
    columns::check_dimensions(width, height)?;
    println!(
        "Converting {} ({}x{}, {} bytes per image)",
        input.display(),
        width,
        height,
        width * height / 8
    );

    let buffers = listing::read_listing(&input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    if buffers.is_empty() {
        bail!("No arrays found in {}", input.display());
    }

    let conversion = columns::convert_listing(&buffers, width, height)?;
    if conversion.arrays.is_empty() {
        bail!("No arrays converted");
    }

    let file =
        File::create(&output).with_context(|| format!("Failed to create {}", output.display()))?;
    let mut writer = BufWriter::new(file);
    listing::write_column_header(&mut writer, &input.display().to_string(), &conversion.arrays)?;
    writer.flush()?;

    for report in &conversion.reports {
        let mark = if report.is_verified() { "✓" } else { "!" };
        println!("  {mark} {}: {:?}", report.name, report.outcome);
    }
    println!(
        "Converted {}/{} arrays cleanly, written to {}",
        conversion.verified_count(),
        conversion.reports.len(),
        output.display()
    );
    Ok(())
}

fn run_inspect(file: PathBuf) -> Result<()> {
    let bytes = fs::read(&file).with_context(|| format!("Failed to read {}", file.display()))?;
    let reader = AnimationReader::new(&bytes)
        .with_context(|| format!("Invalid container {}", file.display()))?;
    let header = reader.header();

    println!("{}", file.display());
    println!("  Frames: {}", reader.frame_count());
    println!("  Checksum: 0x{:08X} (verified)", header.checksum);
    println!(
        "  Header: {} bytes ({} byte offset table)",
        header.size(),
        header.table_length()
    );
    println!("  Total: {} bytes", bytes.len());

    for (i, (entry, frame)) in header.entries.iter().zip(reader.frames()).enumerate() {
        let frame = frame?;
        let decoded = match frame.decode() {
            Ok((encoding, pixels)) => format!(
                "{:?} payload {} -> {} bytes",
                encoding,
                frame.payload.len(),
                pixels.len()
            ),
            Err(ReadError::AmbiguousPayload { len }) => {
                let rle = frame.decode_as(PayloadEncoding::Rle)?;
                let raw = frame.decode_as(PayloadEncoding::Raw)?;
                let differing = rle.iter().zip(&raw).filter(|(a, b)| a != b).count();
                format!(
                    "AMBIGUOUS payload {len} bytes: valid as RLE and as raw, \
                     {differing} bytes differ"
                )
            }
            Err(e) => return Err(e.into()),
        };
        println!(
            "  [{i}] offset {} size {}: {}x{} {}-bit v{}, splits {:?}, {}",
            entry.offset,
            entry.size,
            frame.header.width,
            frame.header.height,
            frame.header.bit_depth.bits(),
            frame.header.version_str(),
            frame.header.split_lengths,
            decoded
        );
    }
    Ok(())
}
