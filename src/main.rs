mod cli;

use chdforge::{batch, config, report::Report};
use chdforge_core::{config::Config, Job, JobEvent, MediaKind};
use chdforge_runner::Supervisor;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, TaskArg};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "chdforge=debug,chdforge_runner=debug,chdforge_core=debug".to_string()
        } else {
            "chdforge=info,chdforge_runner=info,chdforge_core=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            jobs,
            concurrency,
            report,
        } => {
            let mut config = load_config(cli.config.as_deref(), cli.tool)?;
            if let Some(n) = concurrency {
                config.runner.concurrency = n;
            }
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_jobs(&jobs, config, report.as_deref()))
        }
        Commands::Convert {
            task,
            input,
            output,
            dvd,
            delete_source,
            extra,
        } => {
            let config = load_config(cli.config.as_deref(), cli.tool)?;
            let job = single_job(task, dvd, input, output, extra)?.delete_source_after(delete_source);
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(convert(job, config))
        }
        Commands::CheckTool => {
            let config = load_config(cli.config.as_deref(), cli.tool)?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(check_tool(config))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("chdforge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Load the config file and apply the global `--tool` override.
fn load_config(path: Option<&Path>, tool: Option<PathBuf>) -> Result<Config> {
    let mut config = config::load_config_or_default(path)?;
    if tool.is_some() {
        config.runner.tool_path = tool;
    }
    Ok(config)
}

/// Cancel `token` on the first Ctrl-C.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted; stopping jobs");
            token.cancel();
        }
    });
}

async fn run_jobs(jobs_path: &Path, config: Config, report_path: Option<&Path>) -> Result<()> {
    let content = std::fs::read_to_string(jobs_path)
        .with_context(|| format!("Failed to read job list: {:?}", jobs_path))?;
    let jobs: Vec<Job> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse job list: {:?}", jobs_path))?;

    let (supervisor, mut events) = Supervisor::new(&config.runner);
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let report = batch::run_batch_observed(
        &supervisor,
        &mut events,
        jobs,
        &config.batch,
        cancel,
        |event, job| match event {
            JobEvent::Started { .. } => println!("▶ {} {}", job.task, job.input.display()),
            JobEvent::Finished { ok, .. } => {
                let mark = if *ok { "✓" } else { "✗" };
                println!("{} {} {}", mark, job.task, job.input.display());
            }
            _ => {}
        },
    )
    .await?;

    print_summary(&report);

    if let Some(path) = report_path {
        let json = report.to_json()?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report: {:?}", path))?;
        println!("Report written to {}", path.display());
    }

    if report.failed() > 0 {
        anyhow::bail!("{} of {} job(s) failed", report.failed(), report.total());
    }
    Ok(())
}

/// Build the job for `convert`. A DVD spelling of the task wins over `--dvd`.
fn single_job(
    arg: TaskArg,
    dvd: bool,
    input: PathBuf,
    output: Option<PathBuf>,
    extra: Vec<String>,
) -> Result<Job> {
    let media = match (arg.media, dvd) {
        (Some(media), _) => media,
        (None, true) => MediaKind::Dvd,
        (None, false) => MediaKind::Cd,
    };

    let mut job = Job::new(arg.task, media, input).with_extra_args(extra);
    job.output = output;
    job.validate()?;
    Ok(job)
}

async fn convert(job: Job, config: Config) -> Result<()> {
    let (supervisor, mut events) = Supervisor::new(&config.runner);
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let show_output = !job.produces_output();
    let report = batch::run_batch_observed(
        &supervisor,
        &mut events,
        vec![job],
        &config.batch,
        cancel,
        |event, job| match event {
            JobEvent::Progress { .. } => {
                eprint!("\r{:>3}% {}", job.progress, job.input.display());
                let _ = std::io::stderr().flush();
            }
            JobEvent::Log { line, .. } if show_output => println!("{}", line),
            JobEvent::Finished { .. } => eprintln!(),
            _ => {}
        },
    )
    .await?;

    let Some(result) = report.items().first() else {
        anyhow::bail!("Job did not run");
    };
    if !result.ok {
        eprint!("{}", result.log);
        anyhow::bail!("chdman failed for {}", result.input.display());
    }

    println!("✓ {} ({} ms)", result.input.display(), result.elapsed_ms);
    if let Some(ref output) = result.output {
        if result.output_bytes > 0 {
            println!("  Output: {} ({:.1}% saved)", output.display(), report.saved_pct());
        }
    }
    Ok(())
}

async fn check_tool(config: Config) -> Result<()> {
    let (supervisor, _events) = Supervisor::new(&config.runner);
    let probe = supervisor.probe_details().await?;

    if probe.available {
        print!("✓ chdman - {}", probe.path.display());
        if let Some(ref banner) = probe.banner {
            print!(" ({})", banner);
        }
        println!();
        Ok(())
    } else {
        println!("✗ chdman - {}", probe.path.display());
        anyhow::bail!("chdman could not be run; install it or set runner.tool_path")
    }
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            config::load_config(p)?
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    let warnings = config.validate();
    if warnings.is_empty() {
        println!("✓ Configuration is valid");
    } else {
        for warning in &warnings {
            println!("⚠ {}", warning);
        }
    }
    match config.runner.tool_path {
        Some(ref p) => println!("  Tool: {}", p.display()),
        None => println!("  Tool: search PATH"),
    }
    println!("  Concurrency: {}", config.runner.concurrency);
    println!("  Probe timeout: {}s", config.runner.probe_timeout_secs);
    println!("  Delete sources: {}", config.batch.delete_sources);

    Ok(())
}

fn print_summary(report: &Report) {
    let summary = report.summary();
    println!();
    println!(
        "Total: {}  OK: {}  Failed: {}  Saved: {:.1}%",
        summary.total, summary.ok, summary.failed, summary.saved_pct
    );
    println!(
        "Input: {:.1} MB  Output: {:.1} MB",
        summary.input_bytes as f64 / 1_048_576.0,
        summary.output_bytes as f64 / 1_048_576.0
    );
}
