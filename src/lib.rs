use std::path::Path;

use chrono::NaiveDate;

pub mod batch;
pub mod cache;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod directory;
pub mod error;
pub mod processing;
pub mod source;
pub mod summary;

pub use error::SummaryError;

/// `YYYYMMDD.nnn` with a real calendar date.
pub fn is_experiment_id(name: &str) -> bool {
    if name.len() != 12 || name.as_bytes()[8] != b'.' {
        return false;
    }
    let (date, shot) = (&name[..8], &name[9..]);
    date.bytes().all(|b| b.is_ascii_digit())
        && shot.bytes().all(|b| b.is_ascii_digit())
        && NaiveDate::parse_from_str(date, "%Y%m%d").is_ok()
}

/// Experiment directories under `data_root` whose name contains a match of
/// the shell-style `pattern` (`*`, `?`, `[...]`; `.` is literal), sorted.
pub fn get_experiments_by_pattern(
    data_root: &Path,
    pattern: &str,
) -> Result<Vec<String>, SummaryError> {
    let matcher = glob::Pattern::new(&format!("*{}*", pattern.trim_matches('*')))
        .map_err(|source| SummaryError::Pattern {
            pattern: pattern.to_owned(),
            source,
        })?;

    let entries = std::fs::read_dir(data_root).map_err(|err| SummaryError::io(data_root, err))?;

    let mut experiments = entries
        .filter_map(|entry| {
            let entry = entry.ok()?;
            if !entry.file_type().ok()?.is_dir() {
                return None;
            }
            let name = entry.file_name().into_string().ok()?;
            (is_experiment_id(&name) && matcher.matches(&name)).then_some(name)
        })
        .collect::<Vec<_>>();
    experiments.sort();

    Ok(experiments)
}
