//! xconsole - console controller demo
//!
//! Walks through everything the library offers: colored output, a line
//! prompt, an arrow-key driven marker paced by the frame throttle, and a
//! pause prompt.
//!
//! # Quick Start
//!
//! ```text
//! xconsole                    # Run on the current terminal
//! xconsole --model palette    # Force the color-pair model
//! xconsole --headless         # Scripted run on a virtual terminal
//! ```
//!
//! # Keys
//!
//! | Key | Action |
//! |-----|--------|
//! | Arrow keys | Move the marker |
//! | q | Leave the marker screen |

use std::env;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use xconsole::backend::{scan, Backend, Coord, CrosstermBackend, VirtualTerminal};
use xconsole::config::{ColorModelChoice, Config, LogConfig};
use xconsole::{ColorModel, FrameThrottle, KeyCode, TerminalSession};

/// Command line options
#[derive(Default)]
struct Args {
    /// Explicit config file
    config: Option<PathBuf>,
    /// Color model override
    model: Option<ColorModelChoice>,
    /// Frame interval override
    interval_ms: Option<u64>,
    /// Run against the virtual terminal
    headless: bool,
}

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

// Logical color ids used by the demo
const TEXT: u8 = 0;
const TITLE: u8 = 1;
const PROMPT: u8 = 2;
const MARKER: u8 = 3;

fn print_help() {
    eprintln!("xconsole {} - cross-platform console controller demo", VERSION);
    eprintln!();
    eprintln!("Usage: xconsole [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c, --config <PATH>   Config file (default: ~/.xconsole/config.toml)");
    eprintln!("  -m, --model <MODEL>   Color model: auto, attribute, palette");
    eprintln!("  -i, --interval <MS>   Frame interval in milliseconds");
    eprintln!("      --headless        Scripted run on a virtual terminal");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
}

fn parse_args() -> Result<Args, String> {
    let args: Vec<String> = env::args().collect();
    let mut parsed = Args::default();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                eprintln!("xconsole {}", VERSION);
                std::process::exit(0);
            }
            "-c" | "--config" => {
                i += 1;
                let path = args.get(i).ok_or("Missing config path")?;
                parsed.config = Some(PathBuf::from(path));
            }
            "-m" | "--model" => {
                i += 1;
                let model = args.get(i).ok_or("Missing color model")?;
                parsed.model = Some(model.parse()?);
            }
            "-i" | "--interval" => {
                i += 1;
                let ms = args.get(i).ok_or("Missing interval")?;
                parsed.interval_ms = Some(
                    ms.parse()
                        .map_err(|_| format!("Invalid interval: {}", ms))?,
                );
            }
            "--headless" => {
                parsed.headless = true;
            }
            arg => {
                return Err(format!("Unknown argument: {}. Use -h for help.", arg));
            }
        }
        i += 1;
    }

    Ok(parsed)
}

/// Log to a file; stdout belongs to the terminal being drawn on
fn init_logging(log: &LogConfig) {
    let log_path = log.file_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&log.level));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

fn main() -> anyhow::Result<()> {
    let args = match parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    // Command line overrides the config file
    let mut config = Config::load(args.config.as_deref());
    if let Some(model) = args.model {
        config.color_model = model;
    }
    if let Some(ms) = args.interval_ms {
        config.frame_interval_ms = ms;
    }

    init_logging(&config.log);
    info!("xconsole {} starting...", VERSION);

    let model = config.color_model.resolve();
    info!("Color model: {:?}", model);

    if args.headless {
        return run_headless(&config, model);
    }

    let session = TerminalSession::open(CrosstermBackend::new(), model)
        .context("Failed to initialize terminal")?;
    run_demo(&session, &config)?;

    info!("xconsole exiting");
    Ok(())
}

/// Run the demo on a virtual terminal with scripted keys, then print the
/// final screen
fn run_headless(config: &Config, model: ColorModel) -> anyhow::Result<()> {
    let (term, feed) = VirtualTerminal::new(60, 16);
    let probe = term.probe();

    let typist = thread::spawn(move || {
        feed.text("Ada\r");
        for _ in 0..3 {
            feed.bytes(&[scan::LEAD_EXTENDED, scan::RIGHT]);
        }
        feed.bytes(&[scan::LEAD_EXTENDED, scan::DOWN]);
        feed.text("q");
        // Arrives after the pause prompt has drained the queue
        thread::sleep(Duration::from_millis(300));
        feed.text(" ");
    });

    let session = TerminalSession::open(term, model)?;
    run_demo(&session, config)?;
    let size = session.window_size()?;

    println!("=== xconsole headless run ===\n");
    for y in 0..size.y {
        println!("|{:<width$}|", probe.row_text(y), width = size.x as usize);
    }

    drop(session);
    let _ = typist.join();
    Ok(())
}

fn run_demo<B: Backend>(session: &TerminalSession<B>, config: &Config) -> anyhow::Result<()> {
    let theme = &config.theme;
    session.register_color(TEXT, theme.text.into());
    session.register_color(TITLE, theme.title.into());
    session.register_color(PROMPT, theme.prompt.into());
    session.register_color(MARKER, theme.marker.into());

    let size = session.window_size()?;
    let width = size.x as usize;

    // Title bar
    session.move_to(0, 0)?;
    session.activate(TITLE)?;
    let title = format!("xconsole {}", VERSION);
    session.write(&format!("{:^width$}", title, width = width.saturating_sub(1)))?;

    // Line prompt
    session.move_to(0, 2)?;
    session.activate(PROMPT)?;
    session.write("What is your name? ")?;
    session.activate(TEXT)?;
    let name = session.line_editor().read_line_default()?;
    info!("Read name ({} chars)", name.len());
    session.write(&format!("Hello, {}!\n", name))?;
    session.write("Arrow keys move the marker, q continues.")?;

    run_marker(session, config.frame_interval_ms, Coord::new(0, 6), size)?;

    session.activate(TEXT)?;
    // Leave the last row free so the trailing newline does not scroll
    session.move_to(0, size.y.saturating_sub(2))?;
    session.keys().pause()?;
    Ok(())
}

/// Move a marker around with the arrow keys until `q` is pressed
fn run_marker<B: Backend>(
    session: &TerminalSession<B>,
    interval_ms: u64,
    origin: Coord,
    size: Coord,
) -> anyhow::Result<()> {
    let keys = session.keys();
    let mut throttle = FrameThrottle::with_clock(session.clone());

    let max_x = size.x.saturating_sub(1);
    let max_y = size.y.saturating_sub(3).max(origin.y);
    let mut pos = origin;
    draw_marker(session, pos)?;

    loop {
        let mut next = pos;
        let mut quit = false;

        while !quit {
            match keys.poll_key()? {
                KeyCode::NoKey => break,
                KeyCode::Char(b'q') => quit = true,
                KeyCode::ArrowUp => next.y = next.y.saturating_sub(1).max(origin.y),
                KeyCode::ArrowDown => next.y = (next.y + 1).min(max_y),
                KeyCode::ArrowLeft => next.x = next.x.saturating_sub(1),
                KeyCode::ArrowRight => next.x = (next.x + 1).min(max_x),
                _ => {}
            }
        }

        if next != pos {
            session.activate(TEXT)?;
            session.move_cursor(pos)?;
            session.write(" ")?;
            pos = next;
            draw_marker(session, pos)?;
        }

        if quit {
            break;
        }
        throttle.throttle_ms(interval_ms);
    }

    Ok(())
}

fn draw_marker<B: Backend>(session: &TerminalSession<B>, pos: Coord) -> anyhow::Result<()> {
    session.activate(MARKER)?;
    session.move_cursor(pos)?;
    session.write("@")?;
    session.move_cursor(pos)?;
    Ok(())
}
