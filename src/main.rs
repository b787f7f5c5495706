//! filedrop - drop-folder pickup and delivery
//!
//! Entry point for the CLI application.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use filedrop::adapter::{self, FileDestination, FileSource};
use filedrop::config::{DestinationConfig, FileOperation, ParamKind, SourceConfig};
use filedrop::dispatch::{AckToken, MessageSink};
use filedrop::message::{format_timestamp, Message, ParamBag};
use filedrop::scan::{Candidate, IncludeFlags, MatchPipeline, MatchRequest, SortOptions};
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "filedrop", version, about = "Drop-folder pickup and delivery")]
struct Cli {
    /// Verbose logging (repeat for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the files a source would pick up
    Scan(ScanArgs),
    /// Deliver files from a source folder
    Poll(PollArgs),
    /// Write stdin to a destination
    Write(WriteArgs),
    /// Show the parameters of an adapter
    Describe {
        /// Adapter name, kind or id
        #[arg(default_value = "file-source")]
        adapter: String,
    },
}

#[derive(Args, Debug)]
struct ScanArgs {
    /// Folder to scan
    path: PathBuf,

    /// Wildcards, separated by , ; or |
    #[arg(short, long, default_value = "*")]
    filter: String,

    /// Include sub-folders
    #[arg(short, long)]
    recursive: bool,

    #[arg(short, long, default_value = "None")]
    sort: SortOptions,

    /// Seconds a file must exist before it matches
    #[arg(long, default_value_t = 0)]
    min_age: u64,

    #[arg(long)]
    include_empty: bool,
    #[arg(long)]
    include_hidden: bool,
    #[arg(long)]
    include_read_only: bool,
    #[arg(long)]
    include_system: bool,
    #[arg(long)]
    include_temporary: bool,

    /// Stop after this many matches
    #[arg(short, long)]
    limit: Option<usize>,

    /// Only the first match of the first filter that has any
    #[arg(long)]
    first: bool,

    /// Print JSON lines
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct PollArgs {
    /// Source configuration (TOML)
    #[arg(short, long, env = "FILEDROP_SOURCE")]
    config: PathBuf,

    /// Destination configuration (TOML); files are only listed when absent
    #[arg(short, long)]
    to: Option<PathBuf>,

    /// Keep polling until Ctrl-C
    #[arg(short, long)]
    watch: bool,

    /// Override MaxThreads (0 = number of CPUs)
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Args, Debug)]
struct WriteArgs {
    /// Destination configuration (TOML)
    #[arg(short, long, conflicts_with = "path")]
    to: Option<PathBuf>,

    /// Target folder (may contain %tokens%)
    #[arg(short, long)]
    path: Option<String>,

    #[arg(short, long, default_value = "%guid%.txt")]
    filename: String,

    #[arg(short, long)]
    append: bool,

    /// Message parameters used by %tokens%
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    params: Vec<(String, String)>,
}

fn parse_param(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn setup_logging(verbose: u8) {
    let default = match verbose {
        0 => "filedrop=info",
        1 => "filedrop=debug",
        _ => "filedrop=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(command: Command) -> Result<()> {
    match command {
        Command::Scan(args) => scan(args),
        Command::Poll(args) => poll(args).await,
        Command::Write(args) => write(args),
        Command::Describe { adapter } => describe(&adapter),
    }
}

// =============================================================================
// scan
// =============================================================================

#[derive(Serialize)]
struct MatchLine<'a> {
    name: &'a str,
    path: String,
    size: u64,
    created: String,
    modified: String,
    read_only: bool,
}

impl<'a> From<&'a Candidate> for MatchLine<'a> {
    fn from(c: &'a Candidate) -> Self {
        Self {
            name: &c.name,
            path: c.path.display().to_string(),
            size: c.size,
            created: format_timestamp(&c.created),
            modified: format_timestamp(&c.modified),
            read_only: c.is_read_only(),
        }
    }
}

fn scan(args: ScanArgs) -> Result<()> {
    let request = MatchRequest::new(filedrop::template::expand_tilde(&args.path), &args.filter)?
        .recurse(args.recursive)
        .include(IncludeFlags {
            empty: args.include_empty,
            hidden: args.include_hidden,
            read_only: args.include_read_only,
            system: args.include_system,
            temporary: args.include_temporary,
        })
        .min_age(Duration::from_secs(args.min_age))
        .sort(args.sort)
        .limit(args.limit);
    let pipeline = MatchPipeline::new(request);

    let matches: Box<dyn Iterator<Item = Candidate>> = if args.first {
        Box::new(pipeline.find_first()?.into_iter())
    } else {
        pipeline.matches()?
    };

    for candidate in matches {
        if args.json {
            println!("{}", serde_json::to_string(&MatchLine::from(&candidate))?);
        } else {
            println!(
                "{:>10}  {}  {}",
                candidate.size,
                format_timestamp(&candidate.created_local()),
                candidate.path.display()
            );
        }
    }
    Ok(())
}

// =============================================================================
// poll
// =============================================================================

/// Hands each message to a destination (or prints it), then acknowledges.
struct Forward {
    destination: Option<FileDestination>,
}

impl MessageSink for Forward {
    fn message_received(&self, message: Message, ack: AckToken) -> filedrop::Result<()> {
        // Without a destination nothing consumed the file, so it stays put
        let Some(destination) = &self.destination else {
            println!("{}\t{} bytes", ack.path.display(), message.payload.len());
            return Ok(());
        };
        destination.process_message(&message)?;
        ack.acknowledge()?;
        Ok(())
    }
}

async fn poll(args: PollArgs) -> Result<()> {
    let mut config = SourceConfig::load(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    if let Some(threads) = args.threads {
        config.max_threads = if threads == 0 { num_cpus::get() } else { threads };
    }

    let destination = match &args.to {
        Some(path) => {
            let config = DestinationConfig::load(path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            if config.operation != FileOperation::Write {
                bail!("{}: a poll target must use Operation = \"Write\"", path.display());
            }
            Some(FileDestination::new(config)?)
        }
        None => None,
    };

    let source = Arc::new(FileSource::new(config)?);
    let sink: Arc<dyn MessageSink> = Arc::new(Forward { destination });

    if args.watch {
        let stopper = source.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\nInterrupt received, shutting down...");
                stopper.stop();
            }
        });
        source.run(sink).await?;
        return Ok(());
    }

    source.start();
    let report = source.receive_messages(sink).await?;
    tracing::info!(
        "{} of {} file(s) delivered",
        report.delivered,
        report.pulled
    );
    report.into_result()?;
    Ok(())
}

// =============================================================================
// write
// =============================================================================

fn write(args: WriteArgs) -> Result<()> {
    let config = match (&args.to, &args.path) {
        (Some(path), _) => DestinationConfig::load(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        (None, Some(dir)) => DestinationConfig {
            path: dir.clone(),
            filename: args.filename.clone(),
            append_to_existing: args.append,
            ..Default::default()
        },
        (None, None) => bail!("either --to or --path is required"),
    };

    let mut data = Vec::new();
    std::io::stdin()
        .read_to_end(&mut data)
        .context("Failed to read stdin")?;

    let params: ParamBag = args.params.into_iter().collect();
    let message = match String::from_utf8(data) {
        Ok(text) => Message::text(text),
        Err(e) => Message::binary(e.into_bytes()),
    }
    .with_params(params);

    let destination = FileDestination::new(config)?;
    for response in destination.process_message(&message)? {
        print!("{}", response.text_lossy());
    }
    Ok(())
}

// =============================================================================
// describe
// =============================================================================

fn describe(name: &str) -> Result<()> {
    let Some(descriptor) = adapter::find(name) else {
        let known: Vec<_> = adapter::ADAPTERS.iter().map(|a| a.name).collect();
        bail!("unknown adapter '{}' (known: {})", name, known.join(", "));
    };

    println!("{} ({}, {})", descriptor.name, descriptor.kind, descriptor.id);
    println!("{}", descriptor.description);
    if descriptor.supports_multithreading {
        println!("Supports multi-threading");
    }
    println!();

    for p in (descriptor.parameters)() {
        let kind = match p.kind {
            ParamKind::Text => "text".to_string(),
            ParamKind::Bool => "bool".to_string(),
            ParamKind::Integer => "integer".to_string(),
            ParamKind::Choice(choices) => choices.join("|"),
        };
        let default = if p.required {
            "(required)".to_string()
        } else {
            format!("[{}]", p.default)
        };
        println!("{:<24} {:<12} {:<40} {}", p.key, format!("{:?}", p.category), kind, default);
        println!("    {}", p.description);
    }
    Ok(())
}
