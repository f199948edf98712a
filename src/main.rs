// Site audit CLI
//
// Audits a batch of URLs in a headless Chrome, prints the validated summary
// and optionally keeps a debug session timeline.

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use kodegen_tools_siteaudit::utils::{
    DEFAULT_DEBUG_OUTPUT_DIR, DEFAULT_MAX_CONCURRENT, DEFAULT_MAX_RETRIES,
    DEFAULT_MEMORY_WARNING_THRESHOLD_MB, DEFAULT_SNAPSHOT_INTERVAL_SECS, DEFAULT_TIMEOUT_SECS,
    is_valid_url,
};
use kodegen_tools_siteaudit::{
    AccessibilityResult, AnalyzerFlags, AuditDebugger, AuditEventHandler, AuditRun,
    AuditScheduler, ChromiumPageSource, DebugConfig, ProgressStats, RetryBackoff, TestOptions,
    default_pipeline, generate_report, parse_sitemap, read_url_file, run_with_scheduler,
};

const EXIT_VALIDATION_DISAGREEMENT: u8 = 2;
const EXIT_FATAL: u8 = 1;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackoffKind {
    Immediate,
    Fixed,
    Exponential,
}

#[derive(Debug, Parser)]
#[command(name = "kodegen-siteaudit", version, about = "Audit a batch of web pages")]
struct Args {
    /// URLs to audit
    urls: Vec<String>,

    /// File with one URL per line
    #[arg(long)]
    url_file: Option<PathBuf>,

    /// Sitemap (or sitemap index) to take URLs from
    #[arg(long)]
    sitemap: Option<String>,

    /// Stop after this many URLs
    #[arg(long)]
    max_pages: Option<usize>,

    #[arg(short = 'c', long, default_value_t = DEFAULT_MAX_CONCURRENT)]
    concurrency: usize,

    /// Per-attempt timeout in seconds
    #[arg(short, long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    #[arg(short, long, default_value_t = DEFAULT_MAX_RETRIES)]
    retries: u32,

    #[arg(long, value_enum, default_value_t = BackoffKind::Immediate)]
    backoff: BackoffKind,

    /// Fixed delay, or base delay for exponential backoff
    #[arg(long, default_value_t = 500)]
    backoff_ms: u64,

    /// Upper bound for exponential backoff
    #[arg(long, default_value_t = 10_000)]
    backoff_max_ms: u64,

    /// Enable every optional analyzer
    #[arg(long)]
    all: bool,
    #[arg(long)]
    performance: bool,
    #[arg(long)]
    pa11y: bool,
    #[arg(long)]
    seo: bool,
    #[arg(long)]
    social: bool,
    #[arg(long)]
    technical_seo: bool,
    #[arg(long)]
    security: bool,
    #[arg(long)]
    structured_data: bool,
    #[arg(long)]
    mobile: bool,

    /// Record a debug session timeline
    #[arg(long)]
    debug: bool,

    #[arg(long, default_value = DEFAULT_DEBUG_OUTPUT_DIR)]
    debug_dir: PathBuf,

    #[arg(long, default_value_t = DEFAULT_SNAPSHOT_INTERVAL_SECS)]
    snapshot_interval: u64,

    #[arg(long, default_value_t = DEFAULT_MEMORY_WARNING_THRESHOLD_MB)]
    memory_threshold_mb: u64,

    /// Write the validated run as JSON
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    headful: bool,

    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn flags(&self) -> AnalyzerFlags {
        if self.all {
            return AnalyzerFlags::all();
        }
        AnalyzerFlags {
            collect_performance_metrics: self.performance,
            use_pa11y: self.pa11y,
            include_seo_analysis: self.seo,
            include_social_analysis: self.social,
            include_technical_seo: self.technical_seo,
            include_security_analysis: self.security,
            include_structured_data: self.structured_data,
            include_mobile_analysis: self.mobile,
        }
    }

    fn backoff(&self) -> RetryBackoff {
        match self.backoff {
            BackoffKind::Immediate => RetryBackoff::Immediate,
            BackoffKind::Fixed => RetryBackoff::Fixed {
                delay_ms: self.backoff_ms,
            },
            BackoffKind::Exponential => RetryBackoff::Exponential {
                base_ms: self.backoff_ms,
                max_ms: self.backoff_max_ms,
            },
        }
    }

    fn debug_config(&self) -> DebugConfig {
        DebugConfig::default()
            .with_snapshot_interval(Duration::from_secs(self.snapshot_interval))
            .with_memory_warning_threshold_mb(self.memory_threshold_mb)
            .with_output_dir(self.debug_dir.clone())
    }
}

/// Logs lifecycle events as they arrive
struct ConsoleReporter;

impl AuditEventHandler for ConsoleReporter {
    fn on_url_started(&self, url: &str) {
        info!("Auditing {url}");
    }

    fn on_url_completed(
        &self,
        url: &str,
        result: &AccessibilityResult,
        duration_ms: u64,
        attempts: u32,
    ) {
        info!(
            "Done {} in {} ms ({} attempts): {} errors, {} warnings, score {:.0}",
            url,
            duration_ms,
            attempts,
            result.error_count,
            result.warning_count,
            result.overall_score().unwrap_or(0.0)
        );
    }

    fn on_url_failed(&self, url: &str, error: &str, attempts: u32) {
        warn!("Failed {url} after {attempts} attempts: {error}");
    }

    fn on_url_skipped(&self, url: &str, redirect_target: &str) {
        info!("Skipped {url}: redirects to {redirect_target}");
    }

    fn on_progress_update(&self, stats: ProgressStats) {
        info!(
            "Progress {}/{} ({} failed, {} skipped)",
            stats.completed_pages, stats.total_pages, stats.failed_pages, stats.skipped_pages
        );
    }
}

fn init_logging(args: &Args) {
    let default_level = if args.verbose {
        "debug"
    } else if args.quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,kodegen_tools_siteaudit={default_level},kodegen_siteaudit={default_level}"
        ))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn collect_urls(args: &Args) -> Result<Vec<String>> {
    let mut urls = Vec::new();
    for url in &args.urls {
        if is_valid_url(url) {
            urls.push(url.clone());
        } else {
            warn!("Ignoring invalid URL argument '{url}'");
        }
    }
    if let Some(path) = &args.url_file {
        urls.extend(
            read_url_file(path)
                .await
                .with_context(|| format!("Failed to read URL file {}", path.display()))?,
        );
    }
    if let Some(sitemap) = &args.sitemap {
        urls.extend(
            parse_sitemap(sitemap)
                .await
                .with_context(|| format!("Failed to load sitemap {sitemap}"))?,
        );
    }
    if urls.is_empty() {
        bail!("No URLs to audit; pass URLs, --url-file or --sitemap");
    }
    Ok(urls)
}

fn print_run(run: &AuditRun) {
    let s = &run.summary;
    println!("Pages:    {} total, {} tested", s.total_pages, s.tested_pages);
    println!(
        "Outcome:  {} passed, {} failed, {} crashed, {} skipped ({:.1}% pass rate)",
        s.passed_pages,
        s.failed_pages,
        s.crashed_pages,
        s.skipped_pages,
        s.success_rate()
    );
    println!(
        "Issues:   {} errors, {} warnings",
        s.total_errors, s.total_warnings
    );
    println!(
        "Time:     {} ms wall clock, {} ms across tasks",
        s.wall_clock_ms, s.total_duration_ms
    );
    println!();
    print!("{}", generate_report(&run.result_validation));
    print!("{}", generate_report(&run.summary_validation));
    print!("{}", generate_report(&run.aggregation));
    println!();
    println!(
        "Completeness: {:.1}% ({} of {} pages complete)",
        run.completeness.overall_score,
        run.completeness.complete_pages,
        run.completeness.pages.len()
    );
    for url in &run.completeness.flagged_pages {
        println!("  incomplete: {url}");
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let urls = collect_urls(&args).await?;

    let mut builder = TestOptions::builder()
        .timeout_secs(args.timeout)
        .max_concurrent(args.concurrency)
        .max_retries(args.retries)
        .retry_backoff(args.backoff())
        .analyzers(args.flags())
        .event_callbacks(Arc::new(ConsoleReporter));
    if let Some(limit) = args.max_pages {
        builder = builder.max_pages(limit);
    }
    let options = builder.build().context("Invalid audit options")?;

    let source = Arc::new(ChromiumPageSource::launch(!args.headful).await?);
    let scheduler = AuditScheduler::new(Arc::clone(&source), default_pipeline(), options);

    let cancel = scheduler.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing in-flight pages");
            cancel.cancel();
        }
    });

    let mut debugger = args
        .debug
        .then(|| AuditDebugger::start_session(args.debug_config(), scheduler.tracker()));

    let outcome = run_with_scheduler(&scheduler, &urls).await;
    source.shutdown().await;
    let audit = outcome?;

    if let Some(debugger) = debugger.as_mut() {
        debugger.end_session();
        let report = debugger.generate_performance_report(Some(&audit.summary));
        info!(
            "Debug session {}: {} snapshots, peak {:.1} MB",
            report.session_id, report.snapshot_count, report.peak_memory_mb
        );
        // Persistence problems are already logged and never fail the run
        let _ = debugger.save_audit_debug_data(&audit.summary).await;
    }

    print_run(&audit);

    if let Some(path) = &args.output {
        let json = serde_json::to_vec_pretty(&audit)?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote audit results to {}", path.display());
    }

    match audit.ensure_trustworthy() {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            error!("Results are not trustworthy: {e}");
            Ok(ExitCode::from(EXIT_VALIDATION_DISAGREEMENT))
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args);

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}
