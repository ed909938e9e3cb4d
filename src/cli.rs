use chdforge_core::{MediaKind, TaskKind};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "chdforge")]
#[command(author, version, about = "Batch disc-image conversion with chdman")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the chdman executable (overrides the config file)
    #[arg(long, global = true)]
    pub tool: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run every job in a JSON job list
    Run {
        /// JSON array of jobs
        #[arg(required = true)]
        jobs: PathBuf,

        /// Number of jobs to run at once (1-16)
        #[arg(short = 'j', long)]
        concurrency: Option<usize>,

        /// Write the batch report as JSON to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Run a single chdman task with live progress
    Convert {
        /// createcd/createdvd, verify, info or extractcd/extractdvd
        #[arg(value_parser = parse_task)]
        task: TaskArg,

        /// Input image or CHD
        input: PathBuf,

        /// Output file (required for create and extract)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Treat the image as a DVD instead of a CD
        #[arg(long)]
        dvd: bool,

        /// Delete the input after a successful run
        #[arg(long)]
        delete_source: bool,

        /// Extra arguments passed to chdman verbatim
        #[arg(last = true)]
        extra: Vec<String>,
    },

    /// Check that chdman can be run
    CheckTool,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

/// A task given on the command line. The chdman spellings `createdvd` and
/// `extractdvd` also select DVD media.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskArg {
    pub task: TaskKind,
    pub media: Option<MediaKind>,
}

fn parse_task(s: &str) -> Result<TaskArg, String> {
    let (task, media) = match s.to_ascii_lowercase().as_str() {
        "createcd" => (TaskKind::Create, Some(MediaKind::Cd)),
        "createdvd" => (TaskKind::Create, Some(MediaKind::Dvd)),
        "extractcd" => (TaskKind::Extract, Some(MediaKind::Cd)),
        "extractdvd" => (TaskKind::Extract, Some(MediaKind::Dvd)),
        other => (
            other.parse().map_err(|e: chdforge_core::Error| e.to_string())?,
            None,
        ),
    };
    Ok(TaskArg { task, media })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_options() {
        let cli = Cli::try_parse_from([
            "chdforge", "--tool", "/opt/chdman", "run", "jobs.json", "-j", "4", "--report", "out.json",
        ])
        .unwrap();
        assert_eq!(cli.tool.as_deref(), Some(std::path::Path::new("/opt/chdman")));
        match cli.command {
            Commands::Run {
                jobs,
                concurrency,
                report,
            } => {
                assert_eq!(jobs, PathBuf::from("jobs.json"));
                assert_eq!(concurrency, Some(4));
                assert_eq!(report, Some(PathBuf::from("out.json")));
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn parses_convert_with_trailing_args() {
        let cli = Cli::try_parse_from([
            "chdforge", "convert", "createdvd", "movie.iso", "--", "-f", "-c", "zstd",
        ])
        .unwrap();
        match cli.command {
            Commands::Convert {
                task,
                input,
                dvd,
                extra,
                ..
            } => {
                assert_eq!(task.task, TaskKind::Create);
                assert_eq!(task.media, Some(MediaKind::Dvd));
                assert_eq!(input, PathBuf::from("movie.iso"));
                assert!(!dvd);
                assert_eq!(extra, ["-f", "-c", "zstd"]);
            }
            _ => panic!("expected convert"),
        }
    }

    #[test]
    fn plain_task_names_leave_media_open() {
        assert_eq!(
            parse_task("Verify"),
            Ok(TaskArg {
                task: TaskKind::Verify,
                media: None
            })
        );
    }

    #[test]
    fn rejects_unknown_task() {
        assert!(Cli::try_parse_from(["chdforge", "convert", "compress", "a.cue"]).is_err());
    }
}
