//! Pre-harmonized QA/QC report.
//!
//! Counts, per BDCHM variable and cohort, how many distinct PHVs map to the
//! variable and how many participants those PHVs cover. Rows are restricted
//! to the curated [`ValidPhvs`] lists where a cohort has one.
//!
//! ## Usage Flow
//!
//! ```text
//! SourceSheet × 3 → PhvObservation rows → build_report(ValidPhvs) → CSV + coverage summary
//! ```

pub mod sources;

pub use sources::{default_sources, load_observations, CohortField, PhvObservation, SourceSheet};

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::ReportResult;
use crate::phv::ValidPhvs;

/// Distinct PHVs and summed participant count for one (variable, cohort).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CohortCount {
    pub phvs: BTreeSet<String>,
    pub total_n: u64,
}

/// Which cohorts appear in the data versus in the curated lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CohortCoverage {
    pub in_data: Vec<String>,
    pub with_lists: Vec<String>,
    pub missing_lists: Vec<String>,
    pub unused_lists: Vec<String>,
}

impl CohortCoverage {
    fn new(in_data: &BTreeSet<String>, with_lists: &BTreeSet<String>) -> Self {
        Self {
            in_data: in_data.iter().cloned().collect(),
            with_lists: with_lists.iter().cloned().collect(),
            missing_lists: in_data.difference(with_lists).cloned().collect(),
            unused_lists: with_lists.difference(in_data).cloned().collect(),
        }
    }

    /// Human-readable summary, one line per set.
    pub fn summary_lines(&self) -> Vec<String> {
        vec![
            format!("Cohorts in data: {}", self.in_data.join(", ")),
            format!("Cohorts with valid-phvs files: {}", self.with_lists.join(", ")),
            format!("Cohorts in data but missing valid-phvs: {}", self.missing_lists.join(", ")),
            format!("Cohorts with valid-phvs but not in data: {}", self.unused_lists.join(", ")),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QaqcReport {
    /// Sorted union of data cohorts and list cohorts
    pub cohorts: Vec<String>,
    /// Keyed by variable label; only variables with at least one admitted row
    pub variables: BTreeMap<String, BTreeMap<String, CohortCount>>,
    pub coverage: CohortCoverage,
}

impl QaqcReport {
    /// `variable`, then `{cohort}_phv` and `{cohort}_n` per cohort.
    pub fn header(&self) -> Vec<String> {
        let mut header = vec!["variable".to_string()];
        for cohort in &self.cohorts {
            header.push(format!("{cohort}_phv"));
            header.push(format!("{cohort}_n"));
        }
        header
    }

    /// Report rows in label order; cohorts without data get empty cells.
    pub fn records(&self) -> Vec<Vec<String>> {
        self.variables
            .iter()
            .map(|(variable, counts)| {
                let mut record = vec![variable.clone()];
                for cohort in &self.cohorts {
                    match counts.get(cohort) {
                        Some(count) => {
                            record.push(count.phvs.len().to_string());
                            record.push(count.total_n.to_string());
                        }
                        None => {
                            record.push(String::new());
                            record.push(String::new());
                        }
                    }
                }
                record
            })
            .collect()
    }
}

/// Aggregate observations into the report.
///
/// A row is skipped when its label, PHV or cohort is empty, or when its
/// cohort has a list that does not contain the PHV.
pub fn build_report(observations: &[PhvObservation], valid: &ValidPhvs) -> QaqcReport {
    let mut variables: BTreeMap<String, BTreeMap<String, CohortCount>> = BTreeMap::new();
    let mut in_data = BTreeSet::new();

    for obs in observations {
        if obs.label.is_empty() || obs.phv.is_empty() || obs.cohort.is_empty() {
            continue;
        }
        in_data.insert(obs.cohort.clone());

        if !valid.admits(&obs.cohort, &obs.phv) {
            continue;
        }

        let count = variables
            .entry(obs.label.clone())
            .or_default()
            .entry(obs.cohort.clone())
            .or_default();
        count.phvs.insert(obs.phv.clone());
        count.total_n += obs.n;
    }

    let with_lists: BTreeSet<String> = valid.cohorts().map(String::from).collect();
    let cohorts = in_data.union(&with_lists).cloned().collect();

    QaqcReport {
        cohorts,
        variables,
        coverage: CohortCoverage::new(&in_data, &with_lists),
    }
}

pub fn write_report_csv(path: &Path, report: &QaqcReport) -> ReportResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(report.header())?;
    for record in report.records() {
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(phv: &str, label: &str, cohort: &str, n: u64) -> PhvObservation {
        PhvObservation {
            phv: phv.into(),
            label: label.into(),
            cohort: cohort.into(),
            n,
        }
    }

    fn sample() -> Vec<PhvObservation> {
        vec![
            obs("phv1", "bmi", "FHS", 100),
            obs("phv2", "bmi", "FHS", 50),
            obs("phv2", "bmi", "FHS", 5),
            obs("phv9", "bmi", "FHS", 1000),
            obs("phv3", "bmi", "MESA", 20),
            obs("phv4", "age", "MESA", 30),
            obs("", "age", "MESA", 30),
            obs("phv5", "", "MESA", 30),
        ]
    }

    #[test]
    fn test_build_report_filters_by_cohort_list() {
        let mut valid = ValidPhvs::default();
        valid.insert("FHS", ["phv1", "phv2"]);
        valid.insert("WHI", ["phv7"]);

        let report = build_report(&sample(), &valid);

        assert_eq!(report.cohorts, vec!["FHS", "MESA", "WHI"]);
        let fhs = &report.variables["bmi"]["FHS"];
        assert_eq!(fhs.phvs.len(), 2);
        assert_eq!(fhs.total_n, 155);
        // MESA has no list, so everything non-empty counts
        assert_eq!(report.variables["bmi"]["MESA"].total_n, 20);
        assert_eq!(report.variables["age"]["MESA"].phvs.len(), 1);
    }

    #[test]
    fn test_records_and_header() {
        let mut valid = ValidPhvs::default();
        valid.insert("FHS", ["phv1", "phv2"]);
        let report = build_report(&sample(), &valid);

        assert_eq!(
            report.header(),
            vec!["variable", "FHS_phv", "FHS_n", "MESA_phv", "MESA_n"]
        );
        let records = report.records();
        assert_eq!(records[0], vec!["age", "", "", "1", "30"]);
        assert_eq!(records[1], vec!["bmi", "2", "155", "1", "20"]);
    }

    #[test]
    fn test_coverage() {
        let mut valid = ValidPhvs::default();
        valid.insert("FHS", ["phv1"]);
        valid.insert("WHI", ["phv7"]);
        let report = build_report(&sample(), &valid);

        assert_eq!(report.coverage.missing_lists, vec!["MESA"]);
        assert_eq!(report.coverage.unused_lists, vec!["WHI"]);
        assert_eq!(
            report.coverage.summary_lines(),
            vec![
                "Cohorts in data: FHS, MESA",
                "Cohorts with valid-phvs files: FHS, WHI",
                "Cohorts in data but missing valid-phvs: MESA",
                "Cohorts with valid-phvs but not in data: WHI",
            ]
        );
    }

    #[test]
    fn test_variable_with_no_admitted_rows_is_omitted() {
        let mut valid = ValidPhvs::default();
        valid.insert("MESA", ["none"]);
        let report = build_report(&[obs("phv4", "age", "MESA", 30)], &valid);
        assert!(report.variables.is_empty());
        assert_eq!(report.cohorts, vec!["MESA"]);
    }

    #[test]
    fn test_write_report_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preharmonized_qaqc_report.csv");
        let report = build_report(&sample(), &ValidPhvs::default());

        write_report_csv(&path, &report).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("variable,FHS_phv,FHS_n,MESA_phv,MESA_n"));
        assert_eq!(lines.next(), Some("age,,,1,30"));
        assert_eq!(lines.next(), Some("bmi,3,1155,1,20"));
    }
}
