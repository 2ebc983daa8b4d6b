use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "marquee", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play a movie headlessly and print draw statistics.
    Run(RunArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Input movie JSON.
    #[arg(long)]
    movie: PathBuf,

    /// Number of frames to advance after the first.
    #[arg(long, default_value_t = 1)]
    frames: u32,

    /// Player options JSON; missing fields keep their defaults.
    #[arg(long)]
    opts: Option<PathBuf>,

    /// Print per-frame render statistics.
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Run(args) => cmd_run(args),
    }
}

fn read_movie(path: &Path) -> anyhow::Result<marquee::MovieDef> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read movie '{}'", path.display()))?;
    let movie = marquee::MovieDef::from_json(&text)
        .with_context(|| format!("parse movie '{}'", path.display()))?;
    Ok(movie)
}

fn read_opts(path: Option<&Path>) -> anyhow::Result<marquee::PlayerOpts> {
    let Some(path) = path else {
        return Ok(marquee::PlayerOpts::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read options '{}'", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse options '{}'", path.display()))
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let movie = Rc::new(read_movie(&args.movie)?);
    let opts = read_opts(args.opts.as_deref())?;
    let period = movie.frame_period();

    let mut player = marquee::Player::with_host(movie, opts, Rc::new(marquee::NativeHost))?;
    let mut renderer = player.create_renderer(marquee::RecordingDevice::counting());

    let mut total = player.render(&mut renderer);
    for frame in 0..args.frames {
        player.progress(period);
        let stats = player.render(&mut renderer);
        if args.verbose {
            eprintln!(
                "frame {frame}: shapes={} masks={} skipped={} failures={}",
                stats.shapes, stats.masks, stats.skipped_transparent, stats.failures
            );
        }
        total.shapes += stats.shapes;
        total.masks += stats.masks;
        total.skipped_transparent += stats.skipped_transparent;
        total.failures += stats.failures;
        total.unsupported += stats.unsupported;
    }

    let gc = player.collect_garbage();
    let accel = renderer.stats();
    let device = renderer.device().stats();
    let ps = player.stats();
    eprintln!(
        "frames={} scripts={} faults={} instances={}/{}",
        ps.frames, ps.scripts_run, ps.script_faults, ps.instances_created, ps.instances_removed
    );
    eprintln!(
        "shapes={} masks={} skipped={} failures={} unsupported={}",
        total.shapes, total.masks, total.skipped_transparent, total.failures, total.unsupported
    );
    eprintln!(
        "meshes={} builds={} uploads={} draw_calls={} vertices={}",
        renderer.mesh_count(),
        accel.mesh_builds,
        accel.mesh_uploads,
        device.draw_calls,
        device.vertices_drawn
    );
    if let Some(gc) = gc {
        eprintln!("heap live={} collected={}", gc.live, gc.collected_total);
    }
    Ok(())
}
