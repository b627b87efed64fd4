//! Headless driver for the image viewport
//!
//! Loads an image into an off-screen viewport, replays pointer input,
//! lets the confirmation animation run, passes the crop through the
//! enhancer and writes the results next to each other.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result, bail};
use clap::Parser;

use pixlens::capture::{ImageSource, snapshot};
use pixlens::config::ViewerConfig;
use pixlens::domain::{Point, Rect, SelectionMode, Size};
use pixlens::enhance::{EnhanceRequest, PassthroughEnhancer, enhance_or_original};
use pixlens::session::{FRAME_INTERVAL, ImageViewport, InputEvent, SelectionOutput, drive_animation};

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// Select a region of an image the way the interactive viewport would.
#[derive(Parser, Debug)]
#[command(
    name = "pixlens",
    version,
    about = "Off-screen image viewport: zoom, select a region, snapshot it",
    long_about = "Loads IMAGE into an off-screen viewport, replays a selection and writes\n\
                  the canvas snapshot and the enhanced crop as PNG files. The selected\n\
                  rects are printed as JSON.\n\n\
                  Example:\n  \
                  pixlens photo.jpg --canvas 800x800 --select 100,200,300,150\n  \
                  pixlens photo.jpg --click 400,400 --percentage 0.25 --history \"a cat\""
)]
struct Args {
    /// Image file or `data:` URL
    image: String,

    /// Canvas size in logical pixels
    #[arg(long, value_name = "WxH", default_value = "800x600", value_parser = parse_size)]
    canvas: Size,

    /// Device pixel ratio of the off-screen canvas
    #[arg(long, value_name = "F")]
    dpr: Option<f32>,

    /// Select with a fixed-size box instead of a free drag
    #[arg(long)]
    fixed_box: bool,

    /// Fixed box size as a fraction of the image, in (0, 1]
    #[arg(long, value_name = "F")]
    percentage: Option<f64>,

    /// Context passed to the enhancer; the last one describes the subject
    #[arg(long = "history", value_name = "TEXT")]
    history: Vec<String>,

    /// JSON array of input events to replay
    #[arg(long, value_name = "FILE", conflicts_with_all = ["select", "click"])]
    script: Option<PathBuf>,

    /// Drag out a selection in canvas coordinates
    #[arg(long, value_name = "X,Y,W,H", value_parser = parse_rect, conflicts_with = "click")]
    select: Option<Rect>,

    /// Place a fixed box at a canvas point (implies --fixed-box)
    #[arg(long, value_name = "X,Y", value_parser = parse_point)]
    click: Option<Point>,

    /// Zoom-in steps around the canvas center before selecting
    #[arg(long, value_name = "N", default_value_t = 0)]
    zoom_in: u32,

    /// Directory for the written PNG files
    #[arg(long, value_name = "DIR", default_value = ".")]
    out: PathBuf,

    /// Config file; defaults to the user config location
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn parse_numbers<const N: usize>(s: &str, sep: char) -> Result<[f64; N], String> {
    let parts: Vec<f64> = s
        .split(sep)
        .map(|p| p.trim().parse::<f64>().map_err(|e| format!("`{p}`: {e}")))
        .collect::<Result<_, _>>()?;
    parts
        .try_into()
        .map_err(|_| format!("expected {N} values separated by `{sep}`"))
}

fn parse_size(s: &str) -> Result<Size, String> {
    let [w, h] = parse_numbers::<2>(&s.to_ascii_lowercase(), 'x')?;
    Ok(Size::new(w, h))
}

fn parse_point(s: &str) -> Result<Point, String> {
    let [x, y] = parse_numbers::<2>(s, ',')?;
    Ok(Point::new(x, y))
}

fn parse_rect(s: &str) -> Result<Rect, String> {
    let [x, y, w, h] = parse_numbers::<4>(s, ',')?;
    Ok(Rect::new(x, y, w, h))
}

// ============================================================================
// Run
// ============================================================================

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;
    runtime.block_on(run(args))
}

fn load_config(args: &Args) -> Result<ViewerConfig> {
    let mut config = match &args.config {
        Some(path) => ViewerConfig::load_from(path)?,
        None => ViewerConfig::load(),
    };
    if let Some(dpr) = args.dpr {
        config.device_pixel_ratio = dpr;
    }
    if args.fixed_box || args.click.is_some() {
        config.use_fixed_selection_box = true;
    }
    if let Some(percentage) = args.percentage {
        config.fixed_selection_size_percentage = percentage;
    }
    Ok(config.sanitized())
}

fn scripted_events(args: &Args) -> Result<Vec<InputEvent>> {
    if let Some(path) = &args.script {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display()))?;
        return serde_json::from_str(&data)
            .with_context(|| format!("Invalid event script {}", path.display()));
    }
    if let Some(r) = args.select {
        return Ok(vec![
            InputEvent::press(r.x, r.y),
            InputEvent::move_to(r.right(), r.bottom()),
            InputEvent::PointerUp,
        ]);
    }
    if let Some(p) = args.click {
        return Ok(vec![InputEvent::press(p.x, p.y), InputEvent::PointerUp]);
    }
    bail!("Nothing to select: pass --script, --select or --click")
}

async fn run(args: Args) -> Result<()> {
    let config = load_config(&args)?;
    let events = scripted_events(&args)?;

    let mut viewport = ImageViewport::new(config, args.canvas);
    if args.select.is_some() {
        viewport.set_selection_mode(SelectionMode::FreeDrag);
    }

    let selections: Rc<RefCell<Vec<SelectionOutput>>> = Rc::default();
    let sink = Rc::clone(&selections);
    viewport.on_select(move |output| sink.borrow_mut().push(output));

    let source = ImageSource::parse(&args.image);
    if !viewport.load_image(source).await.context("Failed to load image")? {
        bail!("Image load was superseded");
    }

    for _ in 0..args.zoom_in {
        viewport.zoom_in();
    }
    log::debug!("Viewport ready: {:?}", viewport);

    for event in events {
        viewport.handle_event(event);
        drive_animation(&mut viewport, FRAME_INTERVAL).await;
    }

    let outputs = std::mem::take(&mut *selections.borrow_mut());
    if outputs.is_empty() {
        log::warn!("No selection was made");
    }

    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("Failed to create {}", args.out.display()))?;

    for (i, output) in outputs.iter().enumerate() {
        let suffix = if i == 0 { String::new() } else { format!("-{}", i + 1) };

        if output.snapshot.is_empty() {
            log::warn!("Selection {} has no snapshot", i + 1);
        } else {
            let path = snapshot::output_path(&args.out, &format!("snapshot{suffix}"));
            snapshot::save_data_url(&output.snapshot, &path)?;
            log::info!("Saved snapshot to {}", path.display());
        }

        let Some(image) = viewport.image() else {
            break;
        };
        let crop = snapshot::crop_to_data_url(&image.rgba, output.original_rect)?;
        let request = EnhanceRequest::new(crop, args.history.clone());
        log::debug!("Enhance prompt: {}", request.prompt());
        let enhanced = enhance_or_original(&PassthroughEnhancer, request).await;
        let path = snapshot::output_path(&args.out, &format!("enhanced{suffix}"));
        snapshot::save_data_url(&enhanced, &path)?;
        log::info!("Saved enhanced crop to {}", path.display());
    }

    println!("{}", serde_json::to_string_pretty(&outputs)?);
    viewport.teardown();
    Ok(())
}
