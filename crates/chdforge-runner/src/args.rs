//! Command-line construction for chdman invocations.

use chdforge_core::{Job, MediaKind, TaskKind};

/// Build the chdman argument list for `job`.
///
/// The job is not validated: a create/extract job without an output path
/// produces `-o ""`, and chdman will reject it at runtime.
pub fn build_args(job: &Job) -> Vec<String> {
    let input = job.input.to_string_lossy().into_owned();
    let output = || {
        job.output
            .as_deref()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default()
    };

    let mut args: Vec<String> = match job.task {
        TaskKind::Create | TaskKind::Extract => {
            vec![
                subcommand(job.task, job.media).to_string(),
                "-i".into(),
                input,
                "-o".into(),
                output(),
            ]
        }
        TaskKind::Verify => vec!["verify".into(), "-i".into(), input],
        TaskKind::Info => vec!["info".into(), "-i".into(), input, "-v".into()],
    };

    args.extend(job.extra_args.iter().cloned());
    args
}

/// The chdman subcommand for a task/media pair.
pub fn subcommand(task: TaskKind, media: MediaKind) -> &'static str {
    match (task, media) {
        (TaskKind::Create, MediaKind::Cd) => "createcd",
        (TaskKind::Create, MediaKind::Dvd) => "createdvd",
        (TaskKind::Extract, MediaKind::Cd) => "extractcd",
        (TaskKind::Extract, MediaKind::Dvd) => "extractdvd",
        (TaskKind::Verify, _) => "verify",
        (TaskKind::Info, _) => "info",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_cd() {
        let job = Job::new(TaskKind::Create, MediaKind::Cd, "a.cue").with_output("a.chd");
        assert_eq!(build_args(&job), ["createcd", "-i", "a.cue", "-o", "a.chd"]);
    }

    #[test]
    fn create_dvd_with_extra_args() {
        let job = Job::new(TaskKind::Create, MediaKind::Dvd, "b.iso")
            .with_output("b.chd")
            .with_extra_args(["--force", "-np", "4"]);
        assert_eq!(
            build_args(&job),
            ["createdvd", "-i", "b.iso", "-o", "b.chd", "--force", "-np", "4"]
        );
    }

    #[test]
    fn extract_variants() {
        let cd = Job::new(TaskKind::Extract, MediaKind::Cd, "c.chd").with_output("c.cue");
        assert_eq!(build_args(&cd), ["extractcd", "-i", "c.chd", "-o", "c.cue"]);

        let dvd = Job::new(TaskKind::Extract, MediaKind::Dvd, "d.chd").with_output("d.iso");
        assert_eq!(build_args(&dvd), ["extractdvd", "-i", "d.chd", "-o", "d.iso"]);
    }

    #[test]
    fn verify_ignores_media() {
        let cd = Job::new(TaskKind::Verify, MediaKind::Cd, "x.iso");
        let dvd = Job::new(TaskKind::Verify, MediaKind::Dvd, "x.iso");
        assert_eq!(build_args(&cd), ["verify", "-i", "x.iso"]);
        assert_eq!(build_args(&cd), build_args(&dvd));
    }

    #[test]
    fn info_is_verbose() {
        let job = Job::new(TaskKind::Info, MediaKind::Cd, "x.chd").with_extra_args(["--json"]);
        assert_eq!(build_args(&job), ["info", "-i", "x.chd", "-v", "--json"]);
    }

    #[test]
    fn missing_output_still_builds() {
        let job = Job::new(TaskKind::Create, MediaKind::Cd, "a.cue");
        assert_eq!(build_args(&job), ["createcd", "-i", "a.cue", "-o", ""]);
    }
}
