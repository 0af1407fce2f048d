use anyhow::Context;
use clap::{Parser, Subcommand};
use file_rotate::{ContentLimit, FileRotate, compression::Compression, suffix::AppendCount};
use std::fs::create_dir_all;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::level_filters::LevelFilter;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use wallpaper_changer::{
    RunContext, SelectionState, WallpaperConfig,
    config::LoggingConfig,
    desktop::get_wallpaper_manager,
    images::count_images,
    run_cycle,
    utils::default_config_path,
};

#[derive(Parser)]
#[command(name = "wallpaper-changer")]
#[command(
    version,
    about = "Rotates desktop wallpapers per monitor, by day of week and time of day, on X11 (feh) and Sway (swaybg)."
)]
pub struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(
        short,
        long,
        global = true,
        help = "Configuration file (defaults to ~/.config/wallpaperchanger/config.json)"
    )]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Create a default configuration file")]
    Init {
        #[arg(short, long, help = "Overwrite an existing configuration file")]
        force: bool,
    },
    #[command(about = "Validate the configuration and count images per directory")]
    Validate,
    #[command(about = "Show the persisted rotation state")]
    Status,
}

/// Size-rotated `main.log`: `main.log.1` is the newest backup and at most
/// `backup_count` of them are kept.
fn log_writer(logging: &LoggingConfig) -> std::io::Result<FileRotate<AppendCount>> {
    create_dir_all(&logging.log_dir)?;
    Ok(FileRotate::new(
        logging.log_file(),
        AppendCount::new(logging.backup_count),
        ContentLimit::Bytes(logging.max_size_bytes()),
        Compression::None,
        #[cfg(unix)]
        None,
    ))
}

fn init_logging(logging: &LoggingConfig) {
    let level = logging
        .log_level
        .parse::<LevelFilter>()
        .unwrap_or(LevelFilter::INFO);
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let file_layer = log_writer(logging)
        .map_err(|e| {
            eprintln!(
                "Could not open log file in {}: {}",
                logging.log_dir.display(),
                e
            )
        })
        .ok()
        .map(|file| fmt::layer().with_writer(Mutex::new(file)).with_ansi(false));

    let console_layer = fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();
}

fn load_config(path: &Path) -> anyhow::Result<WallpaperConfig> {
    WallpaperConfig::load(path)
        .with_context(|| format!("Please check your configuration file: {}", path.display()))
}

fn run(config_path: &Path) -> anyhow::Result<()> {
    if !config_path.exists() {
        eprintln!("Configuration file not found. Creating default configuration...");
        WallpaperConfig::create_default(config_path)?;
        eprintln!("Created default configuration at: {}", config_path.display());
        eprintln!("Please edit it to point at your wallpaper directories, then run again.");
        return Ok(());
    }

    let config = load_config(config_path)?;
    init_logging(&config.logging);
    info!("=== Starting wallpaper rotation ===");

    let result = RunContext::now(&config.schedule).and_then(|context| {
        let manager = get_wallpaper_manager()?;
        run_cycle(&config, manager.as_ref(), context)
    });

    match result {
        Ok(report) => {
            info!(
                "Applied {} wallpapers (state saved: {})",
                report.wallpapers.len(),
                report.state_saved
            );
            Ok(())
        }
        Err(e) => {
            error!("Wallpaper rotation failed: {}", e);
            Err(e.into())
        }
    }
}

fn init(config_path: &Path, force: bool) -> anyhow::Result<()> {
    if config_path.exists() && !force {
        println!(
            "Configuration file already exists: {} (use --force to overwrite)",
            config_path.display()
        );
        return Ok(());
    }

    WallpaperConfig::create_default(config_path)?;
    println!("Configuration file created: {}", config_path.display());
    println!("Edit it to set your wallpaper directories, then run `wallpaper-changer validate`.");
    Ok(())
}

fn validate(config_path: &Path) -> anyhow::Result<()> {
    println!("Config file: {}", config_path.display());
    let config = load_config(config_path)?;
    println!("Configuration file is valid\n");

    let schedule = &config.schedule;
    println!("Schedule:");
    println!("  Holiday days: {}", schedule.holiday_days.join(", "));
    println!("  Day starts: {}", schedule.day_start_time);
    println!("  Night starts: {}\n", schedule.night_start_time);

    println!("Directories:");
    let mut total_images = 0;
    for (label, path) in config.directories.entries() {
        let count = count_images(path, &config.images.extensions);
        total_images += count;
        let marker = if path.is_dir() { "" } else { " (missing)" };
        println!("  {}: {} ({} images){}", label, path.display(), count, marker);
    }

    println!("\nImage extensions: {}", config.images.extensions.join(", "));
    println!(
        "Logging: {} at level {} (rotate at {} MB, keep {})",
        config.logging.log_file().display(),
        config.logging.log_level,
        config.logging.max_size_mb,
        config.logging.backup_count
    );
    let tracking = &config.state_tracking;
    if tracking.enabled {
        println!("State tracking: enabled ({})", tracking.state_file.display());
    } else {
        println!("State tracking: disabled");
    }

    if total_images == 0 {
        anyhow::bail!("No images found in any configured directory");
    }
    println!("\nConfiguration validation complete!");
    Ok(())
}

fn status(config_path: &Path) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let tracking = &config.state_tracking;
    if !tracking.enabled {
        println!("State tracking is disabled");
        return Ok(());
    }

    let state = SelectionState::load(&tracking.state_file);
    println!("State file: {}", tracking.state_file.display());
    match state.last_run {
        Some(last_run) => println!("Last run: {}", last_run.format("%Y-%m-%d %H:%M:%S")),
        None => println!("Last run: never"),
    }

    for (monitor, current) in &state.current_wallpapers {
        println!("  {}: {}", monitor, current.filename);
    }
    for (directory, entry) in &state.round_robin {
        println!(
            "  {} [{}/{}]",
            directory,
            entry.position,
            entry.images.len()
        );
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config_path = match args.config {
        Some(path) => path,
        None => default_config_path()?,
    };

    match args.command {
        None => run(&config_path),
        Some(Commands::Init { force }) => init(&config_path, force),
        Some(Commands::Validate) => validate(&config_path),
        Some(Commands::Status) => status(&config_path),
    }
}
