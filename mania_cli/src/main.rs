mod autoplay;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use mania_core::chart::read_chart_file;
use mania_core::config::GameConfig;
use mania_data::HistoryStore;

#[derive(Debug, Parser)]
#[command(name = "mania")]
#[command(about = "Four-lane rhythm game chart tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print chart metadata and note statistics.
    Inspect { chart: PathBuf },
    /// Play a chart headless with perfectly timed input and print the record.
    Autoplay {
        chart: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Append the record to the history kept in this directory.
        #[arg(short, long)]
        records: Option<PathBuf>,
        #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(i64).range(1..=1000))]
        tick_ms: i64,
        /// Drive the session from the wall clock instead of simulated time.
        #[arg(long)]
        realtime: bool,
    },
    /// Print a chart's records, best first.
    History {
        chart: PathBuf,
        #[arg(short, long)]
        records: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Inspect { chart } => inspect(&chart)?,
        Command::Autoplay {
            chart,
            config,
            records,
            tick_ms,
            realtime,
        } => {
            let config = match config {
                Some(path) => GameConfig::load_json(&path)?,
                None => GameConfig::default(),
            };
            let loaded = read_chart_file(&chart)?;
            let record = autoplay::run(loaded, config, tick_ms, realtime)
                .with_context(|| format!("autoplay failed: {}", chart.display()))?;

            let json = serde_json::to_string_pretty(&record).context("failed to serialize record")?;
            println!("{json}");

            if let Some(dir) = records {
                HistoryStore::new(dir).append(&record)?;
            }
        }
        Command::History { chart, records } => history(&chart, &records)?,
    }

    Ok(())
}

fn inspect(path: &Path) -> anyhow::Result<()> {
    let loaded = read_chart_file(path)?;
    let audio = loaded.audio_path();
    let chart = &loaded.chart;
    let meta = &chart.meta;

    println!("title:              {}", meta.title);
    println!("artist:             {}", meta.artist);
    println!("version:            {}", meta.version);
    match audio {
        Some(audio) => println!("audio:              {}", audio.display()),
        None => println!("audio:              (none)"),
    }
    println!("notes:              {}", chart.notes.len());
    println!("taps:               {}", chart.tap_count());
    println!("holds:              {}", chart.hold_count());
    println!("judgable events:    {}", chart.judgable_events());
    println!("max possible score: {}", chart.max_possible_score());
    println!("estimated duration: {} ms", chart.estimated_duration());
    Ok(())
}

fn history(path: &Path, records: &Path) -> anyhow::Result<()> {
    let loaded = read_chart_file(path)?;
    let hash = loaded.chart.meta.identity();
    let ranked = HistoryStore::new(records).ranked(&hash)?;

    if ranked.is_empty() {
        println!("no records for {}", loaded.chart.meta.title);
        return Ok(());
    }
    for (rank, record) in ranked.iter().enumerate() {
        println!(
            "{:>3}. {:>7} {} {:>6.2}% combo {:>4}  {}",
            rank + 1,
            record.score,
            record.grade,
            record.acc,
            record.combo,
            record.date.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}
