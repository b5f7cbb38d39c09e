use chrono::Local;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use lotview::prefs::{self, Theme};
use lotview::report::{self, text, RenderOptions};
use lotview::transport::{self, HttpTransport};
use lotview::tree::normalize_path;
use lotview::{
    AnalysisResult, ClientConfig, LotviewError, ReportTree, SessionStore, UploadSession,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "lotview")]
#[command(author, version, about = "Upload parking lot footage and browse the analysis report")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Video file to upload
    path: Option<PathBuf>,

    /// Analysis backend base URL (default: http://localhost:8000)
    #[arg(long, global = true, env = "LOTVIEW_BACKEND_URL")]
    backend: Option<String>,

    #[command(flatten)]
    view: ViewArgs,

    /// Directory for auto-generated reports
    #[arg(long, default_value = "lotview-reports")]
    report_dir: PathBuf,

    /// Don't auto-generate an HTML report
    #[arg(long)]
    no_report: bool,

    /// Don't open the HTML report in a browser
    #[arg(long)]
    no_open: bool,

    /// Browse the result in the interactive viewer after upload
    #[arg(long)]
    serve: bool,

    /// Port for --serve
    #[arg(short, long, default_value = "3001")]
    port: u16,

    /// Pause at 100% before the upload counts as finished, in milliseconds
    #[arg(long, default_value = "500")]
    finalize_delay_ms: u64,

    /// Give up on the upload after this many seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Only show errors
    #[arg(short, long)]
    quiet: bool,
}

/// Tree rendering flags shared by upload and `view`.
#[derive(clap::Args, Debug, Clone, Default)]
struct ViewArgs {
    /// Output report file (.html, .json, .txt)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Expand the node at PATH (e.g. `zones.0`); repeatable
    #[arg(long = "expand", value_name = "PATH")]
    expand: Vec<String>,

    /// Expand every container
    #[arg(long)]
    expand_all: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a saved report as a tree
    View {
        /// Saved report (.json)
        report: PathBuf,

        /// Processed video locator, for bare reports
        #[arg(long)]
        media_ref: Option<String>,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Start the interactive web viewer for a saved report
    Serve {
        /// Saved report (.json)
        report: PathBuf,

        /// Processed video locator, for bare reports
        #[arg(long)]
        media_ref: Option<String>,

        /// Port to listen on
        #[arg(short, long, default_value = "3001")]
        port: u16,
    },

    /// Download the processed video
    Download {
        /// Saved report naming the video
        #[arg(long, conflicts_with = "media_ref", required_unless_present = "media_ref")]
        report: Option<PathBuf>,

        /// Video locator as returned by the backend
        #[arg(long)]
        media_ref: Option<String>,

        /// Destination file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show or set the report theme
    Theme {
        /// `dark` or `light`; toggles when omitted
        value: Option<Theme>,
    },
}

fn main() {
    init_logging();
    let args = Args::parse();

    let config = match args.backend {
        Some(ref url) => ClientConfig::new().with_backend_base(url.as_str()),
        None => ClientConfig::new(),
    };
    debug!(backend = %config.backend_base, "configuration loaded");

    let outcome = match args.command {
        Some(Command::View { ref report, ref media_ref, ref view }) => {
            run_view(&config, report, media_ref.as_deref(), view)
        }
        Some(Command::Serve { ref report, ref media_ref, port }) => {
            run_serve(&config, report, media_ref.as_deref(), port)
        }
        Some(Command::Download { ref report, ref media_ref, ref output }) => {
            run_download(&config, report.as_deref(), media_ref.as_deref(), output)
        }
        Some(Command::Theme { value }) => run_theme(value),
        None => match args.path {
            Some(ref path) => run_upload(&args, config, path),
            None => {
                eprintln!("Usage: lotview <VIDEO>");
                eprintln!("Run 'lotview --help' for more options.");
                std::process::exit(1);
            }
        },
    };

    if let Err(e) = outcome {
        eprintln!("\x1b[31mError:\x1b[0m {}", e);
        let code = match e {
            LotviewError::InputRejected(_) => 2,
            _ => 1,
        };
        std::process::exit(code);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_upload(args: &Args, config: ClientConfig, path: &Path) -> lotview::Result<()> {
    let config = config
        .with_finalize_delay(Duration::from_millis(args.finalize_delay_ms))
        .with_request_timeout(args.timeout.map(Duration::from_secs));

    let mut store = SessionStore::new();
    store.select_path(path)?;

    if !args.quiet {
        if let Some(file) = store.staged() {
            eprintln!("\x1b[1mParking Spot Detector\x1b[0m");
            eprintln!("{}", "─".repeat(60));
            eprintln!("Uploading {} to {}\n", file.describe(), config.backend_base);
        }
    }

    let transport = HttpTransport::new(&config)?;
    let session = UploadSession::new(config.clone());

    let pb = if args.quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(100);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");
        pb.set_style(style);
        pb.set_message("Uploading...");
        pb
    };

    let outcome = session.submit(&mut store, &transport, |update| {
        pb.set_position(u64::from(update.percent));
        if update.percent == 100 {
            pb.set_message("Processing complete");
        }
    });
    pb.finish_and_clear();
    let result = outcome?;

    let tree = build_tree(Arc::clone(&result), &args.view);
    let options = render_options(&config, &result);

    if !args.quiet {
        print_tree(&tree, &options)?;
    }

    let report_path = if let Some(ref output) = args.view.output {
        Some(output.clone())
    } else if !args.no_report {
        std::fs::create_dir_all(&args.report_dir).ok();
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let filename = format!("lotview_report_{}.html", timestamp);
        Some(args.report_dir.join(filename))
    } else {
        None
    };

    if let Some(ref output_path) = report_path {
        report::generate(output_path, &tree, &options)?;
        if !args.quiet {
            eprintln!("\n\x1b[32mReport saved: {}\x1b[0m", output_path.display());
        }
        if !args.no_open && !args.serve && is_html(output_path) {
            if let Err(e) = open::that(output_path) {
                eprintln!("Failed to open report: {}", e);
            }
        }
    }

    if args.serve {
        lotview::serve::start(args.port, config, store)?;
    }

    if !args.quiet {
        eprintln!("\n\x1b[90mAnalysis complete.\x1b[0m");
    }
    Ok(())
}

fn run_view(
    config: &ClientConfig,
    report_path: &Path,
    media_ref: Option<&str>,
    view: &ViewArgs,
) -> lotview::Result<()> {
    let mut store = SessionStore::new();
    let result = store.load_result(report::json::load(report_path, media_ref)?)?;

    let tree = build_tree(Arc::clone(&result), view);
    let options = render_options(config, &result);
    print_tree(&tree, &options)?;

    if let Some(ref output) = view.output {
        report::generate(output, &tree, &options)?;
        eprintln!("\n\x1b[32mReport saved: {}\x1b[0m", output.display());
    }
    Ok(())
}

fn run_serve(
    config: &ClientConfig,
    report_path: &Path,
    media_ref: Option<&str>,
    port: u16,
) -> lotview::Result<()> {
    let mut store = SessionStore::new();
    store.load_result(report::json::load(report_path, media_ref)?)?;
    lotview::serve::start(port, config.clone(), store)?;
    Ok(())
}

fn run_download(
    config: &ClientConfig,
    report_path: Option<&Path>,
    media_ref: Option<&str>,
    output: &Path,
) -> lotview::Result<()> {
    let media_ref = match (report_path, media_ref) {
        (Some(path), _) => report::json::load(path, None)?.media_ref,
        (None, Some(media_ref)) => media_ref.to_string(),
        (None, None) => String::new(),
    };
    if media_ref.is_empty() {
        return Err(LotviewError::NoResult);
    }

    eprintln!("Downloading {}", config.resolve(&media_ref));
    let bytes = transport::download(config, &media_ref, output)?;
    eprintln!(
        "\x1b[32mSaved {} ({})\x1b[0m",
        output.display(),
        lotview::validate::human_size(bytes)
    );
    Ok(())
}

fn run_theme(value: Option<Theme>) -> lotview::Result<()> {
    let path = prefs::default_path();
    let theme = value.unwrap_or_else(|| prefs::load_theme(&path).toggled());
    prefs::save_theme(&path, theme)?;
    println!("{}", theme);
    Ok(())
}

fn build_tree(result: Arc<AnalysisResult>, view: &ViewArgs) -> ReportTree {
    let mut tree = ReportTree::new(result);
    if view.expand_all {
        tree.expand_all();
    }
    for path in &view.expand {
        let path = normalize_path(path);
        if !tree.set_expanded(&path, true) {
            eprintln!("\x1b[33mNothing to expand at '{}'\x1b[0m", path);
        }
    }
    tree
}

fn render_options(config: &ClientConfig, result: &AnalysisResult) -> RenderOptions {
    RenderOptions {
        theme: prefs::load_theme(prefs::default_path()),
        download_url: Some(config.resolve(&result.media_ref)),
        color: true,
    }
}

fn print_tree(tree: &ReportTree, options: &RenderOptions) -> std::io::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    text::write(&mut out, tree, options)
}

fn is_html(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()),
        Some(ref e) if e == "html" || e == "htm"
    )
}
