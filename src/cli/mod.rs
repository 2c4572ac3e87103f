//! CLI mode for reel - downloads a single URL from the command line.

mod progress;

use std::sync::Arc;
use std::time::Duration;

use crate::{
    AppConfig, Error, FormatSelection, Orchestrator, RESOLUTIONS, Result, SettingsStore,
    extract_url,
};

use progress::{CliProgress, make_progress_bar, print_media, print_outcome};

/// Options understood by CLI mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub url: String,
    pub selection: FormatSelection,
    /// Route the first attempt through the system proxy.
    pub proxy: bool,
    /// Do not retry a failed download through the proxy.
    pub no_fallback: bool,
    /// Treat missing dependencies as fatal.
    pub strict: bool,
}

/// Parses `-r 1080p`, `-r 720`, `-r audio` and friends.
fn parse_selection(value: &str) -> Option<FormatSelection> {
    let value = value.trim().to_ascii_lowercase();
    if matches!(value.as_str(), "a" | "audio") {
        return Some(FormatSelection::AudioOnly);
    }
    let height: u32 = value.strip_suffix('p').unwrap_or(&value).parse().ok()?;
    RESOLUTIONS
        .contains(&height)
        .then_some(FormatSelection::Video { height })
}

impl CliArgs {
    /// Parses the arguments following the program name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Usage`] for unknown flags, a missing or invalid
    /// resolution, or when no URL is given.
    pub fn parse(args: &[String]) -> Result<Self> {
        let mut url = None;
        let mut selection = FormatSelection::Video {
            height: RESOLUTIONS[0],
        };
        let mut proxy = false;
        let mut no_fallback = false;
        let mut strict = false;

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "-r" | "--resolution" => {
                    let value = iter
                        .next()
                        .ok_or_else(|| Error::Usage(format!("{arg} requires a value")))?;
                    selection = parse_selection(value).ok_or_else(|| {
                        Error::Usage(format!(
                            "unsupported resolution '{value}' (expected 1080, 720, 480 or audio)"
                        ))
                    })?;
                }
                "--proxy" => proxy = true,
                "--no-fallback" => no_fallback = true,
                "--strict" => strict = true,
                flag if flag.starts_with('-') => {
                    return Err(Error::Usage(format!("unknown option '{flag}'")));
                }
                other => {
                    if url.is_some() {
                        return Err(Error::Usage("only one URL can be downloaded at a time".into()));
                    }
                    url = Some(extract_url(other).unwrap_or_else(|| other.to_string()));
                }
            }
        }

        Ok(Self {
            url: url.ok_or(Error::EmptyUrl)?,
            selection,
            proxy,
            no_fallback,
            strict,
        })
    }
}

/// Runs the CLI download mode.
///
/// Ctrl+C cancels the running download; a cancelled download is not an
/// error.
///
/// # Errors
///
/// Returns an error for bad arguments, missing dependencies in strict mode,
/// or a failed metadata fetch or download.
pub async fn run(mut config: AppConfig, args: &[String]) -> Result<()> {
    let args = CliArgs::parse(args)?;

    let store = SettingsStore::at_default_path();
    let settings = store.load_seeded(&mut config.paths);
    if args.no_fallback {
        config.download = config.download.with_fallback_retry(false);
    }
    if args.strict {
        config.download = config.download.with_strict_dependencies(true);
    }

    let orchestrator: Orchestrator = Orchestrator::new(&config);
    orchestrator.set_proxy_enabled(args.proxy || settings.proxy_enabled);

    if let Err(e) = orchestrator.ensure_directories().await {
        log::warn!("Could not create download folders: {e}");
    }
    let problems = orchestrator.check_dependencies().await;
    if !problems.is_empty() {
        if config.download.strict_dependencies {
            return Err(Error::MissingDependencies(problems));
        }
        for problem in &problems {
            eprintln!("{} {problem}\n", console::style("Warning:").yellow());
        }
    }

    println!("Fetching video information...");
    let fetched = tokio::select! {
        result = orchestrator.fetch_metadata(&args.url) => result,
        _ = tokio::signal::ctrl_c() => {
            println!("Cancelled.");
            return Ok(());
        }
    };
    let info = fetched.inspect_err(|e| hint_cookies(e, &config))?;
    print_media(&info, &args.selection.to_string());

    let bar = make_progress_bar();
    bar.enable_steady_tick(Duration::from_millis(250));
    let sink = Arc::new(CliProgress::new(bar));
    let handle = orchestrator.start_download(&info, args.selection, sink)?;
    let output_dir = handle.request().output_dir().to_path_buf();

    // Ctrl+C cancels; the worker notices at its next progress callback
    let watcher = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                orchestrator.cancel();
            }
        }
    });
    let result = handle.wait().await;
    watcher.abort();

    match result {
        Ok(done) => {
            print_outcome(&crate::DownloadOutcome::Completed {
                via_fallback: done.via_fallback,
            });
            println!("Saved to {}", output_dir.display());
            Ok(())
        }
        Err(Error::Cancelled) => {
            print_outcome(&crate::DownloadOutcome::Cancelled);
            Ok(())
        }
        Err(e) => {
            hint_cookies(&e, &config);
            Err(e)
        }
    }
}

fn hint_cookies(error: &Error, config: &AppConfig) {
    if error.is_credential_problem() {
        eprintln!(
            "Your cookies appear to be invalid or expired. Please re-export them to {}",
            config.paths.cookie_file.display()
        );
    }
}
