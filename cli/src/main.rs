//! confluence-markdown CLI - export Confluence content to Markdown

use std::path::{Path, PathBuf};
use std::thread;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use crossbeam_channel::Receiver;
use indicatif::{ProgressBar, ProgressStyle};

use confluence_markdown::{
    parse_page_ref, CancelToken, ConfluenceClient, ExportConfig, ExportEvent, ExportReport,
    ExportScope, ExportState,
};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "confluence-markdown")]
#[command(version)]
#[command(about = "Export Confluence pages and spaces to linked Markdown files", long_about = None)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "FILE", env = "CONFLUENCE_MARKDOWN_CONFIG")]
    config: Option<PathBuf>,

    /// Number of parallel conversion threads
    #[arg(short, long, global = true, value_name = "N")]
    jobs: Option<usize>,

    #[command(flatten)]
    connection: Connection,

    #[command(subcommand)]
    command: Commands,
}

/// Connection settings; each overrides the config file.
#[derive(Args)]
struct Connection {
    /// Confluence base URL, e.g. https://example.atlassian.net/wiki
    #[arg(long, global = true, env = "CONFLUENCE_URL")]
    url: Option<String>,

    /// User name for basic authentication
    #[arg(long, global = true, env = "CONFLUENCE_USERNAME")]
    username: Option<String>,

    /// API token for basic authentication
    #[arg(long, global = true, env = "CONFLUENCE_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    /// Personal access token (bearer authentication)
    #[arg(long, global = true, env = "CONFLUENCE_PAT", hide_env_values = true)]
    pat: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Export single pages
    Page {
        /// Page IDs or URLs
        #[arg(required = true, value_name = "ID|URL")]
        pages: Vec<String>,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output_path: Option<PathBuf>,
    },

    /// Export pages with all their descendants
    PageWithDescendants {
        /// Page IDs or URLs
        #[arg(required = true, value_name = "ID|URL")]
        pages: Vec<String>,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output_path: Option<PathBuf>,

        /// Page IDs or URLs to skip together with their descendants
        #[arg(long, value_delimiter = ',', value_name = "ID|URL")]
        ignore: Vec<String>,
    },

    /// Export whole spaces
    Space {
        /// Space keys
        #[arg(required = true, value_name = "KEY")]
        keys: Vec<String>,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output_path: Option<PathBuf>,
    },

    /// Export every space visible to the user
    AllSpaces {
        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output_path: Option<PathBuf>,
    },

    /// Show or change the configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the configuration with secrets masked
    Show,
    /// Print the config file location
    Path,
    /// Set a value by dotted key, e.g. `render.include_frontmatter false`
    Set {
        /// Dotted setting key
        key: String,
        /// JSON value, or a plain string
        value: String,
    },
    /// Restore the defaults
    Reset,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    if let Some(jobs) = cli.jobs {
        if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(jobs).build_global() {
            log::warn!("Could not configure {} threads: {}", jobs, e);
        }
    }

    let config_path = cli.config.clone().unwrap_or_else(ExportConfig::default_path);

    let result = match cli.command {
        Commands::Config { action } => cmd_config(&config_path, action),
        Commands::Page { pages, output_path } => {
            page_scopes(&pages, ExportScope::Page).and_then(|scopes| {
                cmd_export(&config_path, &cli.connection, output_path.as_deref(), scopes)
            })
        }
        Commands::PageWithDescendants {
            pages,
            output_path,
            ignore,
        } => page_scopes(&ignore, |id| id).and_then(|ignored| {
            let scopes = page_scopes(&pages, |root| ExportScope::Tree {
                root,
                ignore: ignored.clone(),
            })?;
            cmd_export(&config_path, &cli.connection, output_path.as_deref(), scopes)
        }),
        Commands::Space { keys, output_path } => cmd_export(
            &config_path,
            &cli.connection,
            output_path.as_deref(),
            keys.into_iter().map(ExportScope::Space).collect(),
        ),
        Commands::AllSpaces { output_path } => cmd_export(
            &config_path,
            &cli.connection,
            output_path.as_deref(),
            vec![ExportScope::AllSpaces],
        ),
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

/// Parse page IDs or URLs and wrap each in a scope.
fn page_scopes<T>(inputs: &[String], scope: impl Fn(String) -> T) -> CliResult<Vec<T>> {
    inputs
        .iter()
        .map(|input| -> CliResult<T> { Ok(scope(parse_page_ref(input)?)) })
        .collect()
}

fn load_config(path: &Path, connection: &Connection, output: Option<&Path>) -> CliResult<ExportConfig> {
    let mut config = ExportConfig::load(path)?;
    let auth = &mut config.auth;
    for (slot, value) in [
        (&mut auth.url, &connection.url),
        (&mut auth.username, &connection.username),
        (&mut auth.api_token, &connection.api_token),
        (&mut auth.pat, &connection.pat),
    ] {
        if let Some(value) = value {
            *slot = value.clone();
        }
    }
    if let Some(output) = output {
        config.output_directory = output.to_path_buf();
    }
    Ok(config)
}

fn cmd_export(
    config_path: &Path,
    connection: &Connection,
    output: Option<&Path>,
    scopes: Vec<ExportScope>,
) -> CliResult<()> {
    let config = load_config(config_path, connection, output)?;
    let client = ConfluenceClient::from_config(&config)?;
    client.check_connection()?;

    let cancel = CancelToken::new();
    watch_ctrl_c(cancel.clone());

    let mut total = ExportReport::default();
    for scope in &scopes {
        if cancel.is_cancelled() {
            break;
        }
        println!("{} {}", "Exporting".cyan().bold(), scope);

        let (tx, rx) = crossbeam_channel::unbounded();
        let report = thread::scope(|s| {
            let progress = s.spawn(move || show_progress(rx));
            let result = config
                .exporter(&client)
                .map(|e| e.with_events(tx).with_cancel_token(cancel.clone()))
                .and_then(|mut exporter| exporter.run(scope));
            let _ = progress.join();
            result
        })?;

        merge_report(&mut total, report);
    }

    print_summary(&total, &config.output_directory);
    Ok(())
}

fn show_progress(events: Receiver<ExportEvent>) {
    let pb = ProgressBar::new_spinner();
    pb.set_message("Indexing...");
    pb.enable_steady_tick(std::time::Duration::from_millis(120));

    for event in events {
        match event {
            ExportEvent::Indexed { documents, .. } => {
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("#>-"),
                );
                pb.set_length(documents as u64);
                pb.set_message("Converting...");
            }
            ExportEvent::DocumentExported { path, .. } => {
                pb.inc(1);
                pb.set_message(path);
            }
            ExportEvent::DocumentFailed { id, error } => {
                pb.inc(1);
                pb.println(format!("{} page {}: {}", "Failed".red(), id, error));
            }
            ExportEvent::AttachmentFailed { id, error } => {
                pb.println(format!("{} attachment {}: {}", "Failed".red(), id, error));
            }
            ExportEvent::State(ExportState::Converting) => pb.set_message("Converting..."),
            ExportEvent::State(ExportState::Done) | ExportEvent::State(ExportState::Failed) => break,
            _ => {}
        }
    }
    pb.finish_and_clear();
}

/// Trip the token on Ctrl-C, from a helper runtime on its own thread.
fn watch_ctrl_c(cancel: CancelToken) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(runtime) => runtime,
            Err(e) => {
                log::warn!("Ctrl-C handling unavailable: {}", e);
                return;
            }
        };
        if runtime.block_on(tokio::signal::ctrl_c()).is_ok() {
            eprintln!("{}", "Cancelling; pages already started will finish...".yellow());
            cancel.cancel();
        }
    });
}

fn merge_report(total: &mut ExportReport, report: ExportReport) {
    total.exported += report.exported;
    total.failed.extend(report.failed);
    total.skipped += report.skipped;
    total.shadowed += report.shadowed;
    total.attachments_written += report.attachments_written;
    total.attachments_skipped += report.attachments_skipped;
    total.attachment_failures.extend(report.attachment_failures);
    total.collisions.extend(report.collisions);
    total.cancelled |= report.cancelled;
    total.stats.merge(&report.stats);
}

fn print_summary(report: &ExportReport, output: &Path) {
    println!();
    let headline = format!("exported {}, failed {}", report.exported, report.failed.len());
    if report.is_complete() {
        println!("{} {}", "Done!".green().bold(), headline);
    } else {
        println!("{} {}", "Finished with problems:".yellow().bold(), headline);
    }
    println!("  {} {}", "Output".dimmed(), output.display());
    println!(
        "  {} {} written, {} already present",
        "Attachments".dimmed(),
        report.attachments_written,
        report.attachments_skipped
    );
    if report.skipped > 0 {
        println!("  {} {} pages (cancelled)", "Skipped".yellow(), report.skipped);
    }
    if report.shadowed > 0 {
        println!("  {} {} pages (path taken by another page)", "Shadowed".yellow(), report.shadowed);
    }

    for failure in report.failed.iter().chain(&report.attachment_failures) {
        let name = failure.title.as_deref().unwrap_or(&failure.id);
        println!("  {} {}: {}", "✗".red(), name, failure.error);
    }
    for collision in &report.collisions {
        println!(
            "  {} {}: page {} overwritten by {}",
            "!".yellow(),
            collision.path,
            collision.shadowed,
            collision.kept
        );
    }
}

fn cmd_config(path: &Path, action: ConfigAction) -> CliResult<()> {
    match action {
        ConfigAction::Show => {
            let config = ExportConfig::load(path)?;
            println!("{}", serde_json::to_string_pretty(&config.redacted())?);
        }
        ConfigAction::Path => println!("{}", path.display()),
        ConfigAction::Set { key, value } => {
            let mut config = ExportConfig::load(path)?;
            config.set(&key, &value)?;
            config.save(path)?;
            println!("{} {}", "Updated".green(), key);
        }
        ConfigAction::Reset => {
            let mut config = ExportConfig::load(path).unwrap_or_default();
            config.reset();
            config.save(path)?;
            println!("{}", "Configuration reset to defaults".green());
        }
    }
    Ok(())
}
