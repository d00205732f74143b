//! Per-cohort lists of valid PHV accessions.
//!
//! A cohort's list is a flat file of one accession per line. A cohort that
//! has no list is unfiltered; a cohort that has one only admits its members.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::table::load_token_list;

/// `(file name, cohort)` pairs of the curated lists.
pub const COHORT_FILES: [(&str, &str); 6] = [
    ("chs-ingest.tsv", "CHS"),
    ("copdgene-ingest.tsv", "COPDGene"),
    ("fhs-ingest.tsv", "FHS"),
    ("hchs-ingest.tsv", "HCHS/SOL"),
    ("mesa-ingest.tsv", "MESA"),
    ("whi-ingest.tsv", "WHI"),
];

/// Valid PHVs keyed by cohort; immutable once loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidPhvs {
    lists: BTreeMap<String, BTreeSet<String>>,
}

impl ValidPhvs {
    /// Load every list that exists under `dir`.
    ///
    /// Missing or unreadable files are logged and leave that cohort without
    /// a list; they never fail the load.
    pub fn load(dir: &Path, cohort_files: &[(&str, &str)]) -> Self {
        let mut phvs = Self::default();

        if !dir.is_dir() {
            tracing::warn!(dir = %dir.display(), "valid-phvs directory not found");
            return phvs;
        }

        for (file, cohort) in cohort_files {
            let path = dir.join(file);
            if !path.is_file() {
                tracing::warn!(cohort, path = %path.display(), "no PHV file for cohort");
                continue;
            }
            match load_token_list(&path) {
                Ok(tokens) => {
                    tracing::info!(cohort, count = tokens.len(), "loaded PHVs");
                    phvs.insert(cohort, tokens);
                }
                Err(e) => tracing::warn!(cohort, error = %e, "failed to load PHVs"),
            }
        }

        phvs
    }

    pub fn insert<I, S>(&mut self, cohort: &str, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lists
            .insert(cohort.to_string(), tokens.into_iter().map(Into::into).collect());
    }

    /// True unless the cohort has a list and `phv` is not on it.
    pub fn admits(&self, cohort: &str, phv: &str) -> bool {
        self.lists
            .get(cohort)
            .map_or(true, |list| list.contains(phv))
    }

    /// Cohorts that have a list, sorted.
    pub fn cohorts(&self) -> impl Iterator<Item = &str> {
        self.lists.keys().map(String::as_str)
    }
}

/// Participant count from a stats cell (`"12"`, `"12.0"`); 0 when absent.
pub fn parse_stats_n(cell: &str) -> u64 {
    let cell = cell.trim();
    if let Ok(n) = cell.parse::<u64>() {
        return n;
    }
    match cell.parse::<f64>() {
        Ok(f) if f.is_finite() && f >= 0.0 => f.trunc() as u64,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_parse_stats_n() {
        assert_eq!(parse_stats_n("12"), 12);
        assert_eq!(parse_stats_n("12.0"), 12);
        assert_eq!(parse_stats_n(" 7.9 "), 7);
        assert_eq!(parse_stats_n(""), 0);
        assert_eq!(parse_stats_n("n/a"), 0);
        assert_eq!(parse_stats_n("-3"), 0);
    }

    #[test]
    fn test_load_skips_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("fhs-ingest.tsv"), "phv1\n\n  phv2  \n").unwrap();

        let phvs = ValidPhvs::load(dir.path(), &COHORT_FILES);

        assert_eq!(phvs.cohorts().collect::<Vec<_>>(), vec!["FHS"]);
        assert!(phvs.admits("FHS", "phv2"));
        assert!(!phvs.admits("FHS", "phv3"));
        // No list: unfiltered
        assert!(phvs.admits("MESA", "anything"));
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let phvs = ValidPhvs::load(&dir.path().join("valid-phvs"), &COHORT_FILES);
        assert_eq!(phvs, ValidPhvs::default());
    }
}
