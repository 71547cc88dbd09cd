use std::{
    fs::File,
    io::BufReader,
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "larm", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP session API.
    Serve(ServeArgs),
    /// Render an image at full resolution to PNG.
    Export(ExportArgs),
    /// Render one coordinated preview frame to PNG.
    Preview(PreviewArgs),
    /// Print the tier geometry derived for an image.
    Tiers(TiersArgs),
}

#[derive(Parser, Debug)]
struct EngineArgs {
    /// Shared library exporting the grain engine.
    #[arg(long, env = "LARM_ENGINE")]
    engine: PathBuf,

    /// Exported engine symbol.
    #[arg(long, default_value = larm::DEFAULT_ENGINE_SYMBOL)]
    symbol: String,
}

#[derive(Parser, Debug)]
struct ServeArgs {
    /// Listen address.
    #[arg(long, env = "LARM_ADDR", default_value = "0.0.0.0:8080")]
    addr: SocketAddr,

    #[command(flatten)]
    engine: EngineArgs,

    /// Proxy width threshold.
    #[arg(long, default_value_t = larm::workspace::tier::DEFAULT_PROXY_MAX_WIDTH)]
    proxy_max_width: u32,

    /// Loupe crop edge length.
    #[arg(long, default_value_t = larm::workspace::tier::DEFAULT_LOUPE_SIZE)]
    crop_size: u32,

    /// JPEG quality of preview responses (1-100).
    #[arg(long, default_value_t = larm::encode::image_bytes::DEFAULT_JPEG_QUALITY)]
    jpeg_quality: u8,

    /// Largest accepted upload in bytes.
    #[arg(long, default_value_t = larm::server::DEFAULT_MAX_UPLOAD_BYTES)]
    max_upload_bytes: usize,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Input image.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long, default_value = "output_compose.png")]
    out: PathBuf,

    #[command(flatten)]
    engine: EngineArgs,

    /// Effect parameters JSON (defaults when omitted).
    #[arg(long)]
    params: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct PreviewArgs {
    /// Input image.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    #[command(flatten)]
    engine: EngineArgs,

    /// Effect parameters JSON (defaults when omitted).
    #[arg(long)]
    params: Option<PathBuf>,

    /// Preview tier.
    #[arg(long, value_enum, default_value_t = ViewChoice::Proxy)]
    view: ViewChoice,
}

#[derive(Parser, Debug)]
struct TiersArgs {
    /// Input image.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Proxy width threshold.
    #[arg(long, default_value_t = larm::workspace::tier::DEFAULT_PROXY_MAX_WIDTH)]
    proxy_max_width: u32,

    /// Loupe edge length.
    #[arg(long, default_value_t = larm::workspace::tier::DEFAULT_LOUPE_SIZE)]
    loupe_size: u32,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ViewChoice {
    Proxy,
    Loupe,
}

impl From<ViewChoice> for larm::ViewMode {
    fn from(v: ViewChoice) -> Self {
        match v {
            ViewChoice::Proxy => larm::ViewMode::Proxy,
            ViewChoice::Loupe => larm::ViewMode::Loupe,
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Serve(args) => cmd_serve(args),
        Command::Export(args) => cmd_export(args),
        Command::Preview(args) => cmd_preview(args),
        Command::Tiers(args) => cmd_tiers(args),
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_engine(args: &EngineArgs) -> anyhow::Result<Arc<dyn larm::GrainEngine>> {
    let engine = larm::NativeEngine::load(&args.engine, &args.symbol)
        .with_context(|| format!("load engine '{}'", args.engine.display()))?;
    Ok(Arc::new(engine))
}

fn read_params(path: Option<&Path>) -> anyhow::Result<larm::EffectParameters> {
    let params = match path {
        None => larm::EffectParameters::default(),
        Some(path) => {
            let f =
                File::open(path).with_context(|| format!("open parameters '{}'", path.display()))?;
            serde_json::from_reader(BufReader::new(f)).with_context(|| "parse parameters JSON")?
        }
    };
    params.validate()?;
    Ok(params)
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let opts = larm::ServerOpts {
        tiers: larm::TierOpts {
            proxy_max_width: args.proxy_max_width,
            loupe_size: args.crop_size,
        },
        crop_size: args.crop_size,
        jpeg_quality: args.jpeg_quality,
        max_upload_bytes: args.max_upload_bytes,
    };
    // The server must not come up without an engine.
    let engine = load_engine(&args.engine)?;
    let state = larm::AppState::new(engine, opts)?;

    let rt = tokio::runtime::Runtime::new().context("start tokio runtime")?;
    rt.block_on(larm::server::serve(args.addr, state))?;
    Ok(())
}

fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let params = read_params(args.params.as_deref())?;
    let engine = load_engine(&args.engine)?;
    let source = larm::SourceImage::open(&args.in_path)?;
    let (w, h) = source.dimensions();

    larm::Tier::original(&source)
        .render_detached(engine.as_ref(), &params)
        .and_then(|img| larm::encode::image_bytes::write_png(&img, &args.out))
        .with_context(|| format!("export '{}'", args.in_path.display()))?;

    eprintln!("wrote {} ({w}x{h})", args.out.display());
    Ok(())
}

fn cmd_preview(args: PreviewArgs) -> anyhow::Result<()> {
    let params = read_params(args.params.as_deref())?;
    let engine = load_engine(&args.engine)?;
    let studio = larm::Studio::new(engine, larm::StudioOpts::default())?;

    studio.submit(larm::RenderRequest::new(params, args.view.into()));
    studio.load(&args.in_path)?;
    if !studio.wait_idle(Duration::from_secs(600)) {
        anyhow::bail!("preview render did not finish");
    }
    let Some(frame) = studio.latest_preview() else {
        let cause = studio.last_error().unwrap_or_else(|| "no frame".to_string());
        anyhow::bail!("preview render failed: {cause}");
    };

    larm::encode::image_bytes::write_png(&frame.output.image, &args.out)
        .with_context(|| format!("write png '{}'", args.out.display()))?;
    let (w, h) = frame.output.image.dimensions();
    eprintln!("wrote {} ({w}x{h})", args.out.display());
    Ok(())
}

fn cmd_tiers(args: TiersArgs) -> anyhow::Result<()> {
    let opts = larm::TierOpts {
        proxy_max_width: args.proxy_max_width,
        loupe_size: args.loupe_size,
    };
    let ws = larm::Workspace::load(&args.in_path, opts)?;
    println!("{}", serde_json::to_string_pretty(&ws.summary())?);
    Ok(())
}
