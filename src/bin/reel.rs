use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;

use env_logger::{Env, Target};
use reel_dl::AppConfig;

fn print_usage() {
    eprintln!("Usage: reel [MODE] [OPTIONS] [url]");
    eprintln!();
    eprintln!("Modes:");
    eprintln!("  --tui               Launch interactive TUI");
    eprintln!("  (default)           CLI download mode when a URL is provided");
    eprintln!();
    eprintln!("CLI options:");
    eprintln!("  -r, --resolution R  1080, 720, 480 or audio (default: 1080)");
    eprintln!("  --proxy             Route the download through the system proxy");
    eprintln!("  --no-fallback       Do not retry a failed download via the proxy");
    eprintln!("  --strict            Exit if yt-dlp, ffmpeg or the cookie file is missing");
    eprintln!("  -h, --help          Show this help");
    eprintln!();
    eprintln!(
        "Config file: {} (override with {})",
        AppConfig::default_path().display(),
        reel_dl::config::CONFIG_ENV
    );
}

/// Where TUI mode writes its log so it does not draw over the screen.
fn log_file_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("reel-dl")
        .join("reel.log")
}

fn init_logging(tui: bool) {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    if tui {
        let path = log_file_path();
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => {
                builder.target(Target::Pipe(Box::new(file)));
            }
            // Without a log file, stay quiet rather than corrupt the screen
            Err(_) => {
                builder.filter_level(log::LevelFilter::Off);
            }
        }
    }
    builder.init();
}

#[tokio::main]
async fn main() -> reel_dl::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let tui = args.iter().any(|a| a == "--tui");

    if args.iter().any(|a| a == "-h" || a == "--help") || (!tui && args.is_empty()) {
        print_usage();
        std::process::exit(0);
    }

    init_logging(tui);
    let config = AppConfig::load();

    if tui {
        #[cfg(feature = "tui")]
        {
            reel_dl::tui::run(config).await.map_err(reel_dl::Error::Io)
        }
        #[cfg(not(feature = "tui"))]
        {
            let _ = config;
            eprintln!("TUI support not compiled in");
            std::process::exit(1);
        }
    } else {
        #[cfg(feature = "cli")]
        {
            if let Err(e) = reel_dl::cli::run(config, &args).await {
                eprintln!("Error: {e}");
                if matches!(e, reel_dl::Error::Usage(_) | reel_dl::Error::EmptyUrl) {
                    eprintln!();
                    print_usage();
                }
                std::process::exit(1);
            }
            Ok(())
        }
        #[cfg(not(feature = "cli"))]
        {
            let _ = config;
            eprintln!("CLI support not compiled in");
            std::process::exit(1);
        }
    }
}
