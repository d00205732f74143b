//! Source worksheets of the QA/QC report and their column layouts.

use crate::error::{ReportError, ReportResult};
use crate::phv::parse_stats_n;
use crate::sheets::SheetSource;
use crate::table::Table;

/// One normalized source row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhvObservation {
    pub phv: String,
    pub label: String,
    pub cohort: String,
    pub n: u64,
}

/// Where a source's cohort comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CohortField {
    Column(String),
    Fixed(String),
}

/// A worksheet and the columns holding PHV, label, cohort and count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSheet {
    pub name: String,
    pub spreadsheet: String,
    pub worksheet: String,
    pub phv_column: String,
    pub label_column: String,
    pub cohort: CohortField,
    pub n_column: String,
    /// Cut the accession at its first `.` (`phv00001.v1.p1` -> `phv00001`)
    pub strip_version: bool,
}

impl SourceSheet {
    /// Normalize a loaded worksheet into observations.
    pub fn observations(&self, table: &Table) -> ReportResult<Vec<PhvObservation>> {
        let missing = |column: &str| ReportError::MissingColumn {
            source_name: self.name.clone(),
            column: column.to_string(),
        };

        let phv_idx = table
            .column_index(&self.phv_column)
            .ok_or_else(|| missing(self.phv_column.as_str()))?;
        let label_idx = table
            .column_index(&self.label_column)
            .ok_or_else(|| missing(self.label_column.as_str()))?;
        let n_idx = table
            .column_index(&self.n_column)
            .ok_or_else(|| missing(self.n_column.as_str()))?;
        let cohort_idx = match &self.cohort {
            CohortField::Column(column) => {
                Some(table.column_index(column).ok_or_else(|| missing(column.as_str()))?)
            }
            CohortField::Fixed(_) => None,
        };

        Ok(table
            .rows()
            .map(|row| {
                let phv = row[phv_idx].trim();
                let phv = if self.strip_version {
                    phv.split('.').next().unwrap_or("")
                } else {
                    phv
                };
                let cohort = match (&self.cohort, cohort_idx) {
                    (CohortField::Fixed(c), _) => c.clone(),
                    (_, Some(i)) => row[i].trim().to_string(),
                    (CohortField::Column(_), None) => String::new(),
                };
                PhvObservation {
                    phv: phv.to_string(),
                    label: row[label_idx].trim().to_string(),
                    cohort,
                    n: parse_stats_n(&row[n_idx]),
                }
            })
            .collect())
    }
}

/// The BDCHM, FHS and COPDGene mapping exports.
pub fn default_sources() -> Vec<SourceSheet> {
    vec![
        SourceSheet {
            name: "BDCHM".into(),
            spreadsheet: "Export_BDCHM_noFHS-noCOPDGene_phv_mappings".into(),
            worksheet: "Export_BDCHM_noFHS-noCOPDGene_p".into(),
            phv_column: "First[data_table.variable.id]".into(),
            label_column: "BDCHM Label".into(),
            cohort: CohortField::Column("Cohort".into()),
            n_column: "var_report.variable.total.stats.stat.n".into(),
            strip_version: false,
        },
        SourceSheet {
            name: "FHS".into(),
            spreadsheet: "FHS_VariableProperties".into(),
            worksheet: "right_join_full".into(),
            phv_column: "Variable accession".into(),
            label_column: "BDCHM Label".into(),
            cohort: CohortField::Fixed("FHS".into()),
            n_column: "data_table.variable.total.stats.stat.n".into(),
            strip_version: true,
        },
        SourceSheet {
            name: "COPDGene".into(),
            spreadsheet: "COPDGene_FullMatchWithManuals_Join_Dedup_XML_BDC Mapped Variables V1".into(),
            worksheet: "COPDGene_FullMatchWithManuals_J".into(),
            phv_column: "First[Variable accession]".into(),
            label_column: "BDCHM Label".into(),
            cohort: CohortField::Column("Cohort".into()),
            n_column: "var_report.variable.total.stats.stat.n".into(),
            strip_version: false,
        },
    ]
}

/// Load and normalize every source.
///
/// A source that fails is logged and skipped; the call only fails when no
/// source could be used at all.
pub async fn load_observations(
    sheets: &SheetSource,
    sources: &[SourceSheet],
) -> ReportResult<Vec<PhvObservation>> {
    let mut observations = Vec::new();
    let mut loaded = 0usize;

    for source in sources {
        let table = match sheets.load(&source.spreadsheet, &source.worksheet).await {
            Ok(table) => table,
            Err(e) => {
                tracing::error!(source = %source.name, error = %e, "failed to load source sheet");
                continue;
            }
        };
        tracing::info!(source = %source.name, rows = table.len(), "loaded source sheet");

        match source.observations(&table) {
            Ok(rows) => {
                observations.extend(rows);
                loaded += 1;
            }
            Err(e) => tracing::error!(source = %source.name, error = %e, "skipping source sheet"),
        }
    }

    if loaded == 0 {
        return Err(ReportError::NoSources);
    }
    Ok(observations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheets::LocalSheetDir;

    fn fhs_table() -> Table {
        Table::new(
            vec![
                "Variable accession".into(),
                "BDCHM Label".into(),
                "data_table.variable.total.stats.stat.n".into(),
            ],
            vec![vec!["phv00000001.v1.p1".into(), "bmi".into(), "42.0".into()]],
        )
    }

    #[test]
    fn test_fhs_strips_version_and_fixes_cohort() {
        let fhs = &default_sources()[1];
        let rows = fhs.observations(&fhs_table()).unwrap();

        assert_eq!(
            rows,
            vec![PhvObservation {
                phv: "phv00000001".into(),
                label: "bmi".into(),
                cohort: "FHS".into(),
                n: 42,
            }]
        );
    }

    #[test]
    fn test_missing_column_names_source() {
        let bdchm = &default_sources()[0];
        let err = bdchm.observations(&fhs_table()).unwrap_err();
        assert!(matches!(
            err,
            ReportError::MissingColumn { ref source_name, .. } if source_name == "BDCHM"
        ));
    }

    #[tokio::test]
    async fn test_failed_sources_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let fhs = &default_sources()[1];
        let sheet_dir = dir.path().join(&fhs.spreadsheet);
        std::fs::create_dir(&sheet_dir).unwrap();
        std::fs::write(
            sheet_dir.join(format!("{}.csv", fhs.worksheet)),
            "Variable accession,BDCHM Label,data_table.variable.total.stats.stat.n\nphv1.v2,bmi,3\n",
        )
        .unwrap();

        let sheets = SheetSource::Local(LocalSheetDir::new(dir.path()));
        let rows = load_observations(&sheets, &default_sources()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].phv, "phv1");
    }

    #[tokio::test]
    async fn test_all_sources_failing_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let sheets = SheetSource::Local(LocalSheetDir::new(dir.path()));
        assert!(matches!(
            load_observations(&sheets, &default_sources()).await,
            Err(ReportError::NoSources)
        ));
    }
}
