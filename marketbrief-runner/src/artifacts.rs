//! Date-stamped artifact files shared by the stages.
//!
//! Every stage writes exactly one `<prefix>_<YYYY-MM-DD>.<ext>` artifact and
//! the next stage finds its input either by explicit date or by picking the
//! newest date it can parse out of the directory listing.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LocateError {
    #[error("no {kind} for {date} at {}", path.display())]
    NotFound {
        kind: &'static str,
        date: NaiveDate,
        path: PathBuf,
    },

    #[error("no {kind} found in {}", dir.display())]
    Empty { kind: &'static str, dir: PathBuf },

    #[error("failed to list {}: {source}", dir.display())]
    Io {
        dir: PathBuf,
        source: std::io::Error,
    },
}

/// How a kind of artifact is named on disk.
#[derive(Debug, Clone, Copy)]
pub struct ArtifactKind {
    /// Human-readable name used in errors ("raw snapshot").
    pub label: &'static str,
    pub file_name: fn(NaiveDate) -> String,
    pub date_from_file_name: fn(&str) -> Option<NaiveDate>,
}

impl ArtifactKind {
    /// Resolve the artifact for `date`, or the newest one in `dir`.
    ///
    /// Files whose names do not carry a parseable date are ignored, so
    /// side files (caches, CSV directories) never shadow the real input.
    pub fn locate(&self, dir: &Path, date: Option<NaiveDate>) -> Result<PathBuf, LocateError> {
        if let Some(date) = date {
            let path = dir.join((self.file_name)(date));
            if path.is_file() {
                return Ok(path);
            }
            return Err(LocateError::NotFound {
                kind: self.label,
                date,
                path,
            });
        }

        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LocateError::Empty {
                    kind: self.label,
                    dir: dir.to_path_buf(),
                })
            }
            Err(source) => {
                return Err(LocateError::Io {
                    dir: dir.to_path_buf(),
                    source,
                })
            }
        };

        let mut newest: Option<(NaiveDate, PathBuf)> = None;
        for entry in entries {
            let entry = entry.map_err(|source| LocateError::Io {
                dir: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(found) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(self.date_from_file_name)
            else {
                continue;
            };
            if newest.as_ref().map_or(true, |(d, _)| found > *d) {
                newest = Some((found, path));
            }
        }

        newest.map(|(_, path)| path).ok_or_else(|| LocateError::Empty {
            kind: self.label,
            dir: dir.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketbrief_core::Snapshot;

    const RAW: ArtifactKind = ArtifactKind {
        label: "raw snapshot",
        file_name: Snapshot::file_name,
        date_from_file_name: Snapshot::date_from_file_name,
    };

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, day).unwrap()
    }

    #[test]
    fn picks_newest_dated_file() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "markets_2024-10-14.json",
            "markets_2024-10-16.json",
            "markets_2024-10-15.json",
            "fii_dii_cache.json",
        ] {
            std::fs::write(dir.path().join(name), "{}").unwrap();
        }
        std::fs::create_dir(dir.path().join("csv_2024-10-17")).unwrap();

        let path = RAW.locate(dir.path(), None).unwrap();
        assert!(path.ends_with("markets_2024-10-16.json"));
    }

    #[test]
    fn explicit_date_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("markets_2024-10-16.json"), "{}").unwrap();

        assert!(RAW.locate(dir.path(), Some(d(16))).is_ok());
        let err = RAW.locate(dir.path(), Some(d(15))).unwrap_err();
        assert!(matches!(err, LocateError::NotFound { .. }));
        assert!(err.to_string().contains("2024-10-15"));
    }

    #[test]
    fn empty_or_missing_dir_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            RAW.locate(dir.path(), None),
            Err(LocateError::Empty { .. })
        ));
        assert!(matches!(
            RAW.locate(&dir.path().join("nope"), None),
            Err(LocateError::Empty { .. })
        ));
    }
}
