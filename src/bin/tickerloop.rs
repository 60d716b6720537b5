use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    sync::atomic::AtomicBool,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "tickerloop", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single ticker frame as a PNG.
    Frame(FrameArgs),
    /// Export one seamless loop as an MP4 (requires `ffmpeg` on PATH).
    Export(ExportArgs),
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input preset JSON.
    #[arg(long)]
    preset: PathBuf,

    /// Frame index (0-based); the scroll offset is index * speed.
    #[arg(long, default_value_t = 0)]
    frame: u32,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Content name to render (default: scheduler pick, then first).
    #[arg(long)]
    content: Option<String>,

    /// Draw tile outlines over the frame (cabling diagnostic).
    #[arg(long)]
    outline: bool,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Input preset JSON.
    #[arg(long)]
    preset: PathBuf,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    /// Content name to export (default: scheduler pick, then first).
    #[arg(long)]
    content: Option<String>,

    /// Crop rectangle "X,Y,W,H" applied before encoding.
    #[arg(long)]
    crop: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Export(args) => cmd_export(args),
    }
}

fn read_preset(path: &Path) -> anyhow::Result<tickerloop::Preset> {
    let f = File::open(path).with_context(|| format!("open preset '{}'", path.display()))?;
    let r = BufReader::new(f);
    let mut preset: tickerloop::Preset =
        serde_json::from_reader(r).with_context(|| "parse preset JSON")?;
    preset.normalize();
    preset.validate()?;
    Ok(preset)
}

fn resolve_content<'a>(
    preset: &'a tickerloop::Preset,
    requested: Option<&str>,
) -> anyhow::Result<&'a tickerloop::Content> {
    if let Some(name) = requested {
        return preset
            .content(name)
            .with_context(|| format!("preset has no content named '{name}'"));
    }
    let picked = preset
        .scheduler
        .pick(chrono::Local::now().naive_local())
        .and_then(|name| preset.content(name));
    picked
        .or_else(|| preset.contents.first())
        .context("preset has no contents")
}

fn parse_crop(s: &str) -> anyhow::Result<tickerloop::CropRect> {
    let parts: Vec<u32> = s
        .split(',')
        .map(|p| p.trim().parse::<u32>())
        .collect::<Result<_, _>>()
        .with_context(|| format!("invalid crop '{s}' (expected X,Y,W,H)"))?;
    let [x, y, w, h] = parts.as_slice() else {
        anyhow::bail!("invalid crop '{s}' (expected X,Y,W,H)");
    };
    Ok(tickerloop::CropRect {
        x: *x,
        y: *y,
        w: *w,
        h: *h,
    })
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let preset = read_preset(&args.preset)?;
    let content = resolve_content(&preset, args.content.as_deref())?;

    let tiles = tickerloop::build_tiles(&preset.ports, &preset.concat_port_order, preset.module)?;
    let mut fonts = tickerloop::FontCatalog::system();
    let spec = tickerloop::StripSpec::for_content(content, preset.module);
    let strip = tickerloop::TextStrip::render(&spec, &mut fonts)?;

    let offset =
        f64::from(args.frame) * f64::from(tickerloop::integer_speed(preset.output.speed_px_per_frame));
    let mut compositor =
        tickerloop::FrameCompositor::new(preset.output.width, preset.output.height);
    let frame = compositor.render(Some(&strip), offset, &tiles, content.bg_rgb);

    let mut out_frame = frame.clone();
    if args.outline {
        tickerloop::draw_tile_outlines(&mut out_frame, &tiles);
    }

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    image::save_buffer_with_format(
        &args.out,
        out_frame.as_bytes(),
        out_frame.width(),
        out_frame.height(),
        image::ColorType::Rgb8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let preset = read_preset(&args.preset)?;
    let content = resolve_content(&preset, args.content.as_deref())?;

    let tiles = tickerloop::build_tiles(&preset.ports, &preset.concat_port_order, preset.module)?;
    let mut fonts = tickerloop::FontCatalog::system();
    let spec = tickerloop::StripSpec::for_content(content, preset.module);
    let strip = tickerloop::TextStrip::render(&spec, &mut fonts)?;

    let mut cfg = tickerloop::ExportConfig::for_output(&preset.output, &args.out);
    if let Some(crop) = args.crop.as_deref() {
        cfg.crop = Some(parse_crop(crop)?);
    }

    let cancel = AtomicBool::new(false);
    let stats = tickerloop::export_loop(
        &strip,
        &tiles,
        &preset.output,
        content.bg_rgb,
        &cfg,
        &cancel,
    )?;

    eprintln!(
        "wrote {} ({} frames, ~{:.2}s loop)",
        args.out.display(),
        stats.frames,
        stats.seconds
    );
    Ok(())
}
