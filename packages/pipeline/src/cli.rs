//! Command-line interface for the sentiment pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use comment_harvester::sink::load_labeled;
use comment_harvester::{
    Credentials, FetchOutcome, Fetcher, HarvesterConfig, ProgressSignal, ProgressSink,
    Termination, WeiboClient,
};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::task::JoinHandle;

use crate::classifier::ChatCompletionsClient;
use crate::config::ClassifierConfig;
use crate::controller::PipelineController;
use crate::error::Result;
use crate::summary::{display_label, Renderer, SentimentSummary, StatsReportRenderer};
use crate::worker::{ClassificationWorker, ClassifyOutcome};

/// Sentiment Pipeline - Crawl a Weibo comment thread and label each comment.
#[derive(Parser)]
#[command(name = "sentiment-pipeline")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory for artifacts and checkpoints (default: $OUTPUT_DIR or output/)
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch all comments of a post into a CSV artifact.
    Crawl {
        /// Post URL carrying `id=`/`uid=` or ending in the numeric post id
        reference: String,

        /// File with `User-Agent:`, `Cookie:` and `Referer:` lines
        /// (default: WEIBO_* environment variables)
        #[arg(long)]
        headers: Option<PathBuf>,
    },

    /// Label every comment of a comments artifact.
    Analyze {
        /// Comments CSV produced by `crawl`
        comments: PathBuf,
    },

    /// Continue a stopped or failed run from its checkpoint.
    Resume {
        #[command(subcommand)]
        target: ResumeTarget,
    },

    /// Print the label distribution and write the stats report.
    Summary {
        /// Labeled CSV produced by `analyze`
        analyzed: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum ResumeTarget {
    /// Resume the last crawl.
    Crawl {
        #[arg(long)]
        headers: Option<PathBuf>,
    },
    /// Resume the last classification.
    Analyze,
}

/// Run the CLI.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut harvester = HarvesterConfig::from_env();
    if let Some(output) = cli.output {
        harvester.output_dir = output;
    }

    match cli.command {
        Commands::Crawl { reference, headers } => {
            let credentials = load_credentials(headers.as_deref())?;
            crawl_command(&harvester, Some(&reference), credentials).await
        }
        Commands::Analyze { comments } => analyze_command(&harvester, Some(&comments)).await,
        Commands::Resume { target } => match target {
            ResumeTarget::Crawl { headers } => {
                let credentials = load_credentials(headers.as_deref())?;
                crawl_command(&harvester, None, credentials).await
            }
            ResumeTarget::Analyze => analyze_command(&harvester, None).await,
        },
        Commands::Summary { analyzed } => summary_command(&analyzed, &harvester.output_dir),
    }
}

fn load_credentials(headers: Option<&Path>) -> Result<Credentials> {
    match headers {
        Some(path) => Ok(Credentials::from_header_block(&std::fs::read_to_string(path)?)),
        None => Ok(Credentials::from_env()),
    }
}

fn build_controller(
    harvester: &HarvesterConfig,
    classifier: &ClassifierConfig,
) -> Result<PipelineController<WeiboClient>> {
    let fetcher = Fetcher::new(WeiboClient::new(harvester)?, harvester);
    let client = ChatCompletionsClient::new(classifier)?;
    let worker = ClassificationWorker::new(Arc::new(client), classifier, &harvester.output_dir);
    Ok(PipelineController::new(fetcher, worker))
}

/// Wait for a run, turning Ctrl-C into a stop request so the run still
/// saves its partial artifact and checkpoint.
async fn await_run<T>(mut handle: JoinHandle<Result<T>>, stop: impl Fn()) -> Result<T> {
    tokio::select! {
        joined = &mut handle => return joined?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received SIGINT, stopping pipeline");
            stop();
        }
    }
    handle.await?
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn percent_bar() -> ProgressBar {
    let pb = ProgressBar::new(100);
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{bar:40.cyan/blue} {pos:>3}% {msg}")
            .expect("valid template"),
    );
    pb
}

async fn crawl_command(
    harvester: &HarvesterConfig,
    reference: Option<&str>,
    credentials: Credentials,
) -> Result<()> {
    // Crawling never calls the model; an empty key only matters for classify.
    let classifier =
        ClassifierConfig::from_env().unwrap_or_else(|_| ClassifierConfig::builder("").build());
    let controller = build_controller(harvester, &classifier)?;

    let pb = spinner();
    let progress_pb = pb.clone();
    let progress: Arc<dyn ProgressSink> = Arc::new(move |count: f64| {
        progress_pb.set_message(format!("{count} comments fetched"));
        ProgressSignal::Continue
    });

    let result = match reference {
        Some(reference) => {
            println!("{} {}", style("Crawling").bold(), style(reference).cyan());
            pb.set_message("Requesting first page...");
            let handle = controller.start_fetch(reference, credentials, progress)?;
            await_run(handle, || controller.stop_fetch()).await.map(Some)
        }
        None => {
            pb.set_message("Resuming crawl...");
            let handle = controller.resume_fetch(credentials, progress)?;
            await_run(handle, || controller.stop_fetch()).await
        }
    };
    pb.finish_and_clear();

    match result? {
        Some(outcome) => print_fetch_outcome(&outcome),
        None => println!("{}", style("No crawl checkpoint to resume.").yellow()),
    }
    Ok(())
}

async fn analyze_command(harvester: &HarvesterConfig, comments: Option<&Path>) -> Result<()> {
    let classifier = ClassifierConfig::from_env()?;
    let controller = build_controller(harvester, &classifier)?;

    let pb = percent_bar();
    let progress_pb = pb.clone();
    let progress: Arc<dyn ProgressSink> = Arc::new(move |percent: f64| {
        progress_pb.set_position(percent.round().clamp(0.0, 100.0) as u64);
        ProgressSignal::Continue
    });

    let result = match comments {
        Some(path) => {
            println!(
                "{} {}",
                style("Analyzing").bold(),
                style(path.display()).cyan()
            );
            let handle = controller.start_classify(path, progress)?;
            await_run(handle, || controller.stop_classify()).await.map(Some)
        }
        None => {
            let handle = controller.resume_classify(progress)?;
            await_run(handle, || controller.stop_classify()).await
        }
    };
    pb.finish_and_clear();

    match result? {
        Some(outcome) => print_classify_outcome(&outcome),
        None => println!("{}", style("No classify checkpoint to resume.").yellow()),
    }
    Ok(())
}

fn summary_command(analyzed: &Path, output_dir: &Path) -> Result<()> {
    let rows = load_labeled(analyzed)?;
    let summary = SentimentSummary::from_rows(&rows);

    println!("{} {}", style("Comments:").bold(), summary.total);
    for share in &summary.shares {
        println!(
            "  {}: {} ({:.1}%)",
            display_label(share.sentiment),
            share.count,
            share.percentage
        );
    }

    let report = StatsReportRenderer.render(&rows, output_dir)?;
    println!();
    println!("{} {}", style("Saved to:").green().bold(), report.display());
    Ok(())
}

fn print_termination(termination: &Termination, resume_hint: &str) {
    match termination {
        Termination::Completed => println!("{}", style("Completed").green().bold()),
        Termination::Stopped => println!(
            "{} (continue with `{resume_hint}`)",
            style("Stopped").yellow().bold()
        ),
        Termination::Failed(message) => println!(
            "{} {message} (continue with `{resume_hint}`)",
            style("Failed:").red().bold()
        ),
    }
}

fn print_fetch_outcome(outcome: &FetchOutcome) {
    print_termination(&outcome.termination, "resume crawl");
    println!("  Pages: {}", outcome.pages);
    println!("  Comments: {}", outcome.records);
    match &outcome.artifact {
        Some(path) => println!("{} {}", style("Saved to:").green().bold(), path.display()),
        None => println!("{}", style("No comments were saved.").yellow()),
    }
}

fn print_classify_outcome(outcome: &ClassifyOutcome) {
    print_termination(&outcome.termination, "resume analyze");
    println!("  Labeled: {}/{}", outcome.labeled, outcome.total);
    if outcome.fallbacks > 0 {
        println!(
            "  Neutral fallbacks: {}",
            style(outcome.fallbacks).yellow().bold()
        );
    }
    match &outcome.artifact {
        Some(path) => println!("{} {}", style("Saved to:").green().bold(), path.display()),
        None => println!("{}", style("No rows were saved.").yellow()),
    }
}
