// Headless replay of a canvas session.
//
// Mounts a canvas from a JSON script, feeds it the recorded commands, and
// prints every outbound event as one JSON object per line on stdout. Logs
// go to stderr through `tracing-subscriber`; set `RUST_LOG` to see them
// (default `warn`). Audio is discarded.
//
// Usage:
//   channel972_replay --script <PATH> [OPTIONS]
//     --script <PATH>     Replay script: { seed, until_ms?, commands: [{ at_ms, input }] }
//     --config <PATH>     Canvas config JSON (default: built-in defaults)
//     --content <PATH>    Content library JSON (default: shipped content)
//     --snapshot          Print the final interaction snapshot after the events
//     --overlays          Print the final overlay set after the events

use std::io::Write;
use std::path::PathBuf;

use channel972_core::audio::SilentAudioSink;
use channel972_core::command::ReplayScript;
use channel972_core::config::CanvasConfig;
use channel972_core::content::{ContentLibrary, default_library};
use channel972_core::{CanvasState, ChannelResult};
use tracing_subscriber::EnvFilter;

#[derive(Default)]
struct ReplayArgs {
    script: Option<PathBuf>,
    config: Option<PathBuf>,
    content: Option<PathBuf>,
    snapshot: bool,
    overlays: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args();
    if let Err(e) = run(&args) {
        eprintln!("replay failed: {e}");
        std::process::exit(1);
    }
}

fn run(args: &ReplayArgs) -> ChannelResult<()> {
    let Some(script_path) = &args.script else {
        eprintln!("--script is required");
        print_usage();
        std::process::exit(1);
    };
    let script = ReplayScript::from_json(&std::fs::read_to_string(script_path)?)?;

    let config = match &args.config {
        Some(path) => CanvasConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => CanvasConfig::default(),
    };
    let content = match &args.content {
        Some(path) => ContentLibrary::from_json(&std::fs::read_to_string(path)?)?,
        None => default_library(),
    };

    tracing::info!(
        seed = script.seed,
        commands = script.commands.len(),
        end_ms = script.end_ms(),
        "replay starting"
    );

    let mut canvas = CanvasState::with_config(script.seed, config, SilentAudioSink)?;
    let result = canvas.step(&script.commands, script.end_ms());

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for event in &result.events {
        writeln!(out, "{}", serde_json::to_string(event)?)?;
    }
    if args.snapshot {
        writeln!(out, "{}", serde_json::to_string(&canvas.snapshot())?)?;
    }
    if args.overlays {
        writeln!(out, "{}", serde_json::to_string(&canvas.overlays(&content))?)?;
    }
    Ok(())
}

/// Parse command-line arguments. Uses simple `std::env::args()` matching.
fn parse_args() -> ReplayArgs {
    let mut parsed = ReplayArgs::default();
    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--script" => {
                i += 1;
                parsed.script = Some(path_arg(&args, i, "--script"));
            }
            "--config" => {
                i += 1;
                parsed.config = Some(path_arg(&args, i, "--config"));
            }
            "--content" => {
                i += 1;
                parsed.content = Some(path_arg(&args, i, "--content"));
            }
            "--snapshot" => parsed.snapshot = true,
            "--overlays" => parsed.overlays = true,
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    parsed
}

fn path_arg(args: &[String], i: usize, flag: &str) -> PathBuf {
    args.get(i).map(PathBuf::from).unwrap_or_else(|| {
        eprintln!("{flag} requires a path");
        std::process::exit(1);
    })
}

fn print_usage() {
    println!("Usage: channel972_replay --script <PATH> [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --script <PATH>     Replay script JSON (required)");
    println!("  --config <PATH>     Canvas config JSON (default: built-in defaults)");
    println!("  --content <PATH>    Content library JSON (default: shipped content)");
    println!("  --snapshot          Print the final interaction snapshot");
    println!("  --overlays          Print the final overlay set");
    println!("  --help, -h          Show this help");
}
