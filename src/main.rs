use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use sidemerge::config;
use sidemerge::diff::{ClassifiedLine, Direction, LineKind};
use sidemerge::watch::{FileWatcher, WatchEvent};
use sidemerge::{Comparison, Engine, Reconciliation, Target};
use std::path::PathBuf;
use std::sync::mpsc;

/// Compare two text files side by side and merge between them
#[derive(Parser)]
#[command(name = "sidemerge", version, about)]
struct Cli {
    /// Left-hand file
    left: PathBuf,

    /// Right-hand file
    right: PathBuf,

    /// Print the comparison as JSON
    #[arg(long)]
    json: bool,

    /// Copy every difference from this side to the other, then save
    #[arg(long, value_enum)]
    take: Option<TakeSide>,

    /// Keep running and reprint when either file changes on disk
    #[arg(long)]
    watch: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum TakeSide {
    Left,
    Right,
}

impl TakeSide {
    fn direction(self) -> Direction {
        match self {
            TakeSide::Left => Direction::LeftToRight,
            TakeSide::Right => Direction::RightToLeft,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let mut engine = Engine::new(config::load_config(&cwd));
    engine
        .compare(&cli.left, &cli.right)
        .with_context(|| format!("Failed to compare {} and {}", cli.left.display(), cli.right.display()))?;

    if let Some(side) = cli.take {
        take_all(&mut engine, side.direction())?;
    }

    print_current(&engine, cli.json)?;

    if cli.watch {
        watch_loop(&mut engine, cli.json)?;
    }

    Ok(())
}

/// Copy chunks from the bottom up until the files match, then save the target.
fn take_all(engine: &mut Engine, direction: Direction) -> Result<()> {
    loop {
        let chunks = match engine.comparison() {
            Some(cmp) => cmp.chunks.len(),
            None => bail!("No comparison loaded"),
        };
        if chunks == 0 {
            break;
        }
        engine.copy(direction, Target::Chunk(chunks - 1))?;

        let remaining = engine.comparison().map_or(0, |cmp| cmp.chunks.len());
        if remaining >= chunks {
            bail!("Copying chunk {} made no progress", chunks);
        }
    }

    let unsaved = engine.unsaved_files();
    engine.save_all(&unsaved).context("Failed to save merged file")?;
    for path in &unsaved {
        eprintln!("Saved {}", path.display());
    }
    Ok(())
}

fn watch_loop(engine: &mut Engine, json: bool) -> Result<()> {
    if !engine.config().watch.enabled {
        bail!("Watching is disabled in config ([watch] enabled = false)");
    }
    let paths = match engine.comparison() {
        Some(cmp) => vec![cmp.left.clone(), cmp.right.clone()],
        None => bail!("No comparison loaded"),
    };

    let (tx, rx) = mpsc::channel::<WatchEvent>();
    let _watcher = FileWatcher::new(&paths, engine.config().watch.debounce_ms, tx)?;
    eprintln!("Watching for changes (Ctrl-C to stop)");

    for event in rx {
        let WatchEvent::FileChanged(change) = event;
        match engine.file_changed(&change) {
            Ok(Reconciliation::Reloaded) => print_current(engine, json)?,
            Ok(Reconciliation::Ignored) => {}
            Ok(Reconciliation::Conflict { path }) => {
                eprintln!("{} changed on disk; keeping unsaved edits", path.display());
            }
            Ok(Reconciliation::Missing { path }) => {
                eprintln!("{} was removed", path.display());
            }
            Err(e) => log::warn!("Could not reconcile {}: {e}", change.path.display()),
        }
    }
    Ok(())
}

fn print_current(engine: &Engine, json: bool) -> Result<()> {
    match engine.comparison() {
        Some(cmp) if json => {
            println!("{}", serde_json::to_string_pretty(cmp).context("Failed to serialize comparison")?);
        }
        Some(cmp) => print_rows(cmp),
        None => bail!("No comparison loaded"),
    }
    Ok(())
}

fn print_rows(cmp: &Comparison) {
    let widest = cmp
        .lines
        .iter()
        .flat_map(|row| [row.left_number, row.right_number])
        .flatten()
        .max()
        .unwrap_or(0);
    let width = widest.to_string().len();

    for row in &cmp.lines {
        println!(
            "{:>w$} {:>w$} {} {}",
            number(row.left_number),
            number(row.right_number),
            row.kind.symbol(),
            row_text(row),
            w = width
        );
    }

    if cmp.is_identical() {
        println!("\nFiles are identical");
    } else {
        let s = cmp.stats;
        println!(
            "\n{} chunk(s): {} added, {} removed, {} modified",
            cmp.chunks.len(),
            s.added,
            s.removed,
            s.modified
        );
    }
}

fn number(n: Option<usize>) -> String {
    n.map(|n| n.to_string()).unwrap_or_default()
}

fn row_text(row: &ClassifiedLine) -> String {
    match row.kind {
        LineKind::Same | LineKind::Removed => row.left_text.clone(),
        LineKind::Added => row.right_text.clone(),
        LineKind::Modified => format!("{} | {}", row.left_text, row.right_text),
    }
}
