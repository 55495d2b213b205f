use anyhow::{Context as AnyhowContext, Result};
use buildscope_classifier::{AssetAnalyzer, Signatures};
use buildscope_crawler::{BuildCrawler, CrawlReport, CrawlerConfig, ReqwestTransport};
use buildscope_protocol::{AssetMetadata, ClassifyRequest, ReleaseChannel};
use buildscope_syntax::{ExperimentExtractor, ExperimentSet};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod report;

#[derive(Parser)]
#[command(name = "buildscope")]
#[command(about = "Crawl and inspect web client builds", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl a build and write its report as JSON
    Crawl(CrawlArgs),

    /// Extract experiment definitions from local script files
    Experiments(ExperimentsArgs),

    /// Classify one local asset file
    Classify(ClassifyArgs),
}

#[derive(Args)]
struct CrawlArgs {
    /// Release channel: stable, ptb, canary or staging
    #[arg(short, long, default_value = "stable")]
    channel: ReleaseChannel,

    /// Resolve a specific build through the lookup endpoint
    #[arg(long)]
    build_id: Option<String>,

    /// Origin override (e.g. a local mirror)
    #[arg(long)]
    domain: Option<String>,

    /// Write the report here instead of stdout
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Keep raw asset bodies in this directory
    #[arg(long)]
    blob_dir: Option<PathBuf>,

    /// Concurrent network fetches
    #[arg(long)]
    concurrency: Option<usize>,

    /// Classification worker threads
    #[arg(long)]
    workers: Option<usize>,

    /// Keep asset bodies in the report
    #[arg(long)]
    with_text: bool,

    /// Print a markdown summary instead of JSON
    #[arg(long)]
    summary: bool,
}

#[derive(Args)]
struct ExperimentsArgs {
    /// Script files; duplicates across files are reported once
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[derive(Args)]
struct ClassifyArgs {
    file: PathBuf,

    /// Content type to assume; guessed from the extension by default
    #[arg(long)]
    content_type: Option<String>,

    /// Keep the body in the output
    #[arg(long)]
    with_text: bool,
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    match cli.command {
        Commands::Crawl(args) => run_crawl(args).await?,
        Commands::Experiments(args) => run_experiments(args)?,
        Commands::Classify(args) => run_classify(args)?,
    }

    Ok(())
}

async fn run_crawl(args: CrawlArgs) -> Result<()> {
    let mut config = CrawlerConfig::for_channel(args.channel).from_env();
    if args.domain.is_some() {
        config.domain = args.domain;
    }
    if args.blob_dir.is_some() {
        config.blob_dir = args.blob_dir;
    }
    if let Some(concurrency) = args.concurrency {
        config.fetch_concurrency = concurrency;
    }
    if let Some(workers) = args.workers {
        config.classify_workers = Some(workers);
    }

    let transport = ReqwestTransport::new().context("Failed to build HTTP client")?;
    let crawler = BuildCrawler::new(config, Arc::new(transport)).context("Invalid configuration")?;
    let mut report = crawler
        .crawl(args.build_id.as_deref())
        .await
        .with_context(|| format!("Failed to crawl {} build", args.channel))?;
    if !args.with_text {
        strip_text(&mut report);
    }

    let rendered = if args.summary {
        report::render_crawl_summary(&report)
    } else {
        serde_json::to_string_pretty(&report)?
    };
    emit(&rendered, args.out.as_deref())
}

fn run_experiments(args: ExperimentsArgs) -> Result<()> {
    let mut extractor = ExperimentExtractor::new().context("Failed to initialise parser")?;
    let mut experiments = ExperimentSet::default();

    for file in &args.files {
        let script = read_text(file)?;
        let found = extractor
            .extract(&script)
            .with_context(|| format!("Failed to extract experiments from {}", file.display()))?;
        log::info!("{}: {} experiment(s)", file.display(), found.len());
        experiments.extend(found);
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&experiments.into_vec())?
    );
    Ok(())
}

fn run_classify(args: ClassifyArgs) -> Result<()> {
    let text = read_text(&args.file)?;
    let name = args
        .file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("Not a file: {}", args.file.display()))?;
    let content_type = args
        .content_type
        .or_else(|| guess_content_type(&name).map(str::to_string));

    let mut analyzer =
        AssetAnalyzer::new(Signatures::default()).context("Failed to initialise classifier")?;
    let asset = analyzer
        .analyze(ClassifyRequest::new(
            name,
            AssetMetadata {
                content_type,
                last_modified: None,
                text: Some(text),
            },
        ))
        .with_context(|| format!("Failed to classify {}", args.file.display()))?;

    let asset = if args.with_text {
        asset
    } else {
        asset.without_text()
    };
    println!("{}", serde_json::to_string_pretty(&asset)?);
    Ok(())
}

fn strip_text(report: &mut CrawlReport) {
    for asset in &mut report.build.assets {
        asset.metadata.text = None;
    }
}

fn guess_content_type(name: &str) -> Option<&'static str> {
    let extension = Path::new(name).extension()?.to_str()?;
    match extension.to_ascii_lowercase().as_str() {
        "js" | "mjs" => Some("application/javascript"),
        "css" => Some("text/css"),
        _ => None,
    }
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn emit(rendered: &str, out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => {
            fs::write(path, format!("{rendered}\n"))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            log::info!("Report written to {}", path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(guess_content_type("a.JS"), Some("application/javascript"));
        assert_eq!(guess_content_type("40532.abc.css"), Some("text/css"));
        assert_eq!(guess_content_type("image.png"), None);
        assert_eq!(guess_content_type("noext"), None);
    }

    #[test]
    fn cli_parses_crawl_flags() {
        let cli = Cli::try_parse_from([
            "buildscope",
            "crawl",
            "--channel",
            "Canary",
            "--workers",
            "3",
            "--with-text",
        ])
        .unwrap();
        let Commands::Crawl(args) = cli.command else {
            panic!("expected crawl");
        };
        assert_eq!(args.channel, ReleaseChannel::Canary);
        assert_eq!(args.workers, Some(3));
        assert!(args.with_text);

        assert!(Cli::try_parse_from(["buildscope", "crawl", "--channel", "nightly"]).is_err());
    }
}
