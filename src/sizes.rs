//! Byte accounting for the final report.
//!
//! Disc images described by a `.cue` or `.gdi` sheet keep their data in
//! separate track files, so the input size is the sum of every referenced
//! track rather than the size of the sheet itself. Unreadable or missing
//! files count as zero; accounting never fails a batch.

use std::path::{Path, PathBuf};

use chdforge_core::Job;

/// Size of `path` in bytes, or 0 when it cannot be read.
pub fn safe_file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// Bytes of source data a job will read.
pub fn estimate_input_bytes(job: &Job) -> u64 {
    let ext = job
        .input
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("cue") => sum_tracks(&job.input, cue_tracks),
        Some("gdi") => sum_tracks(&job.input, gdi_tracks),
        _ => safe_file_size(&job.input),
    }
}

/// Bytes written by a job; 0 for tasks that produce no file.
pub fn output_bytes(job: &Job) -> u64 {
    match (&job.output, job.produces_output()) {
        (Some(out), true) => safe_file_size(out),
        _ => 0,
    }
}

fn sum_tracks(sheet: &Path, parse: fn(&str) -> Vec<String>) -> u64 {
    let Ok(contents) = std::fs::read_to_string(sheet) else {
        tracing::debug!("could not read track sheet {}", sheet.display());
        return 0;
    };
    let dir = sheet.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));

    parse(&contents)
        .iter()
        .map(|name| safe_file_size(&dir.join(name)))
        .sum()
}

/// File names from `FILE "<name>" <type>` lines of a cue sheet.
fn cue_tracks(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| {
            line.get(..5)
                .is_some_and(|head| head.eq_ignore_ascii_case("FILE "))
        })
        .filter_map(|line| {
            let start = line.find('"')?;
            let end = line.rfind('"')?;
            (end > start).then(|| line[start + 1..end].to_string())
        })
        .collect()
}

/// File names from GD-ROM track lines: `<track> <lba> <type> <sector size>
/// <file> <offset>`, where the file name may be quoted.
///
/// ```text
/// 3
/// 1 0 4 2352 track01.bin 0
/// 2 450 0 2352 "track 02.raw" 0
/// ```
fn gdi_tracks(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with(|c: char| c.is_ascii_digit()))
        .filter_map(gdi_file_name)
        .collect()
}

fn gdi_file_name(line: &str) -> Option<String> {
    let mut rest = line;
    for _ in 0..4 {
        rest = rest.trim_start();
        let end = rest.find(char::is_whitespace)?;
        rest = &rest[end..];
    }

    let rest = rest.trim_start();
    match rest.strip_prefix('"') {
        Some(quoted) => quoted.find('"').map(|end| quoted[..end].to_string()),
        None => rest.split_whitespace().next().map(str::to_string),
    }
}
