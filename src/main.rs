// heaplab: C statement evaluator with a visible heap allocator

use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::process;
use std::sync::Mutex;

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_subscriber::EnvFilter;

use heaplab::config::{ConfigError, SessionConfig};
use heaplab::interpreter::Session;
use heaplab::ui::App;

/// Route logs to `path`; the TUI owns the terminal, so nothing goes to stderr
fn init_logging(path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Evaluate every line of `path` and print each result
fn run_script(session: &mut Session, path: &Path) -> io::Result<()> {
    let source = fs::read_to_string(path)?;
    let statements = source
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("//"));
    for line in statements {
        println!("> {}", line);
        match session.execute(line) {
            Ok(outcome) => println!("{}", outcome),
            Err(err) => println!("{}", err.display_message()),
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match SessionConfig::from_args(std::env::args().skip(1)) {
        Ok(config) => config,
        Err(ConfigError::HelpRequested) => {
            println!("{}", ConfigError::HelpRequested);
            return Ok(());
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    };

    if let Some(path) = &config.log_file {
        init_logging(path)?;
    }

    let mut session = Session::from_config(&config)?;
    if let Some(path) = &config.load_file {
        let blob = fs::read(path)?;
        if let Err(e) = session.load(&blob) {
            eprintln!("Error: cannot load '{}': {}", path.display(), e);
            process::exit(1);
        }
    }

    if let Some(path) = &config.script {
        run_script(&mut session, path)?;
        return Ok(());
    }

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(session);
    let res = app.run(&mut terminal);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}
