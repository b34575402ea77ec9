use std::{
    fs::{self, File},
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "veil", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a noise mask and write its serialized record.
    Generate(GenerateArgs),
    /// Print the metadata of a serialized mask record.
    Info(InfoArgs),
    /// Export one frame of a serialized mask record as a PNG.
    Frame(FrameArgs),
}

#[derive(Parser, Debug)]
struct GenerateArgs {
    /// Output record path.
    #[arg(long)]
    out: PathBuf,

    /// Descriptor JSON; the default-mask descriptor when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also dump the full atlas as an RGBA PNG.
    #[arg(long)]
    png: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct InfoArgs {
    /// Input record path.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input record path.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Frame index (wrapped modulo the frame count).
    #[arg(long)]
    index: i32,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Generate(args) => cmd_generate(args),
        Command::Info(args) => cmd_info(args),
        Command::Frame(args) => cmd_frame(args),
    }
}

fn read_descriptor(path: Option<&Path>) -> anyhow::Result<veil::MaskDescriptor> {
    let Some(path) = path else {
        return Ok(veil::MaskDescriptor::default_mask());
    };
    let file = File::open(path).with_context(|| format!("open descriptor '{}'", path.display()))?;
    let descriptor: veil::MaskDescriptor =
        serde_json::from_reader(BufReader::new(file)).context("parse descriptor JSON")?;
    descriptor.validate()?;
    Ok(descriptor)
}

fn read_mask(path: &Path) -> anyhow::Result<veil::CachedMask> {
    let bytes = fs::read(path).with_context(|| format!("read record '{}'", path.display()))?;
    veil::deserialize(&bytes, None)
        .with_context(|| format!("'{}' is not a valid mask record", path.display()))
}

fn cmd_generate(args: GenerateArgs) -> anyhow::Result<()> {
    let descriptor = read_descriptor(args.config.as_deref())?;
    let mask = veil::generate(&descriptor);
    let bytes = veil::serialize(&mask)?;

    if let Some(parent) = args.out.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    fs::write(&args.out, &bytes)
        .with_context(|| format!("write record '{}'", args.out.display()))?;
    eprintln!("wrote {} ({} bytes)", args.out.display(), bytes.len());

    if let Some(png) = args.png {
        write_rgba_png(&png, mask.image(), None)?;
        eprintln!("wrote {}", png.display());
    }
    Ok(())
}

fn cmd_info(args: InfoArgs) -> anyhow::Result<()> {
    let bytes = fs::read(&args.in_path)
        .with_context(|| format!("read record '{}'", args.in_path.display()))?;
    let mask = veil::deserialize(&bytes, None)
        .with_context(|| format!("'{}' is not a valid mask record", args.in_path.display()))?;

    println!("record:         {} bytes", bytes.len());
    println!("format version: {}", veil::FORMAT_VERSION);
    println!("frames:         {}", mask.frames_count());
    println!("frame duration: {} ms", mask.frame_duration());
    println!("canvas size:    {} px", mask.canvas_size());
    println!(
        "atlas:          {}x{} px",
        mask.image().width(),
        mask.image().height()
    );
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let mask = read_mask(&args.in_path)?;
    let frame = mask.frame(args.index);
    write_rgba_png(&args.out, frame.image, Some(frame.source))?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn write_rgba_png(
    path: &Path,
    raster: &veil::Raster,
    source: Option<veil::FrameRect>,
) -> anyhow::Result<()> {
    let source = source.unwrap_or(veil::FrameRect {
        x: 0,
        y: 0,
        width: raster.width(),
        height: raster.height(),
    });

    let mut data = Vec::with_capacity(source.width as usize * source.height as usize * 4);
    for y in source.y..source.y + source.height {
        for x in source.x..source.x + source.width {
            data.extend_from_slice(&unpremultiply(raster.pixel(x, y)));
        }
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        path,
        &data,
        source.width as u32,
        source.height as u32,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", path.display()))?;
    Ok(())
}

fn unpremultiply(px: [u8; 4]) -> [u8; 4] {
    let a = px[3];
    if a == 0 {
        return [0, 0, 0, 0];
    }
    let expand = |c: u8| ((u32::from(c) * 255 + u32::from(a) / 2) / u32::from(a)).min(255) as u8;
    [expand(px[0]), expand(px[1]), expand(px[2]), a]
}
