use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::app::App;
use crate::audio::{AudioPlayer, RodioOutput};
use crate::catalog::Catalog;

mod event_loop;
mod keys;
mod logging;
mod settings;


/// Parsed command line: `encore [--print-config] [DIR]`.
#[derive(Debug, Default, PartialEq)]
struct Args {
    print_config: bool,
    dir: Option<PathBuf>,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Args {
    let mut parsed = Args::default();
    for arg in args {
        if arg == "--print-config" {
            parsed.print_config = true;
        } else if parsed.dir.is_none() {
            parsed.dir = Some(PathBuf::from(arg));
        }
    }
    parsed
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = parse_args(env::args().skip(1));
    let (settings, fallback) = settings::load_settings();

    if args.print_config {
        print!("{}", settings.to_toml()?);
        return Ok(());
    }

    if let Err(e) = logging::init(&settings.logging) {
        eprintln!("encore: failed to open log file, logging disabled: {e}");
    }
    if let Some(reason) = fallback {
        tracing::warn!(%reason, "using default settings");
    }

    let dir = match args.dir {
        Some(d) => d,
        None => env::current_dir()?,
    };
    let catalog = Catalog::open(&dir, &settings.catalog)?;
    tracing::info!(
        dir = %dir.display(),
        tracks = catalog.tracks().len(),
        playlists = catalog.playlists().len(),
        "catalog ready"
    );

    let base_url = settings.catalog.base_url.clone();
    let audio_player = AudioPlayer::spawn(
        move || RodioOutput::open(base_url),
        &settings.audio,
        &settings.playback,
    )?;
    let events = audio_player.subscribe()?;

    let mut app = App::new(catalog);
    app.follow_playback = settings.ui.follow_playback;
    app.set_current_dir(dir.display().to_string());
    app.apply_snapshot(audio_player.snapshot());

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let run_result = event_loop::run(&mut terminal, &settings, &mut app, &audio_player, &events);

    audio_player.shutdown(Duration::from_millis(settings.audio.quit_fade_out_ms));

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    run_result
}
