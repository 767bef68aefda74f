use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gefx", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the built-in effects.
    List,
    /// Run the render loop on the software devices.
    Run(RunArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Engine configuration JSON (defaults to an unpaced 640x480 RGB565 screen).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of frames to run.
    #[arg(long, default_value_t = 120)]
    frames: u64,

    /// Write the final scan-out to this PNG.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Start effect, by index or (partial) name.
    #[arg(long)]
    start: Option<String>,

    /// Request the next effect every N frames.
    #[arg(long)]
    next_every: Option<u64>,

    /// Jump to effect INDEX before frame FRAME (repeatable).
    #[arg(long = "jump", value_name = "FRAME:INDEX", value_parser = parse_jump)]
    jumps: Vec<(u64, usize)>,

    /// Disable the diagnostic overlay.
    #[arg(long, default_value_t = false)]
    no_osd: bool,
}

fn parse_jump(s: &str) -> Result<(u64, usize), String> {
    let (frame, index) = s
        .split_once(':')
        .ok_or_else(|| format!("expected FRAME:INDEX, got '{s}'"))?;
    let frame = frame
        .trim()
        .parse()
        .map_err(|e| format!("bad frame '{frame}': {e}"))?;
    let index = index
        .trim()
        .parse()
        .map_err(|e| format!("bad index '{index}': {e}"))?;
    Ok((frame, index))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::List => cmd_list(),
        Command::Run(args) => cmd_run(args),
    }
}

fn cmd_list() -> anyhow::Result<()> {
    let registry = gefx::Registry::builtin();
    for (i, desc) in registry.iter().enumerate() {
        let path = match desc.strategy {
            gefx::LayerStrategy::Isolated => "isolated",
            gefx::LayerStrategy::Traditional => "traditional",
        };
        println!("{i:>3}  {path:<11}  {}", desc.name);
    }
    Ok(())
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => gefx::EngineConfig::load(path)?,
        None => gefx::EngineConfig::headless(),
    };
    if args.no_osd {
        config.osd = false;
    }

    let registry = gefx::Registry::builtin();
    if let Some(start) = &args.start {
        config.start_effect = match start.parse::<usize>() {
            Ok(i) => i,
            Err(_) => registry
                .find(start)
                .with_context(|| format!("no effect matches '{start}'"))?,
        };
    }

    let mut engine = gefx::Engine::open_soft(&config, registry).context("open display")?;
    let control = engine.control();

    for frame in 0..args.frames {
        if let Some(n) = args.next_every
            && n > 0
            && frame > 0
            && frame % n == 0
        {
            control.next();
        }
        for &(at, index) in &args.jumps {
            if at == frame
                && let Err(err) = control.jump(index)
            {
                tracing::warn!(frame, error = %err, "scripted jump ignored");
            }
        }
        engine
            .run_frame()
            .with_context(|| format!("frame {frame}"))?;
    }

    let stats = engine.stats();
    eprintln!(
        "ran {} frames ({} drawn, {} switches, {} init failures), last effect: {}",
        stats.frames,
        stats.drawn,
        stats.switches,
        stats.init_failures,
        engine.active_name().unwrap_or("none")
    );

    if let Some(out) = &args.out {
        let frame = engine.capture()?;
        if let Some(parent) = out.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create output dir '{}'", parent.display()))?;
        }
        image::save_buffer_with_format(
            out,
            &frame.data,
            frame.width,
            frame.height,
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .with_context(|| format!("write png '{}'", out.display()))?;
        eprintln!("wrote {}", out.display());
    }

    engine.shutdown();
    Ok(())
}
