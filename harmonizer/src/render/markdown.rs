//! Variable documentation page.

use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::links::{LinkTemplates, RenderedCurie};
use super::{cell, group_rows};
use crate::error::TableResult;
use crate::projection::doc_columns as col;
use crate::table::Table;

/// A rendered page plus the identifier cells that need operator review.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedDocument {
    pub markdown: String,
    /// `(variable label, value)` of every identifier that was not a CURIE
    pub flagged: Vec<(String, String)>,
}

/// Render a table produced by
/// [`variable_documentation_projection`](crate::projection::variable_documentation_projection).
pub fn render_variable_documentation(
    table: &Table,
    links: &LinkTemplates,
) -> TableResult<RenderedDocument> {
    let mut doc = RenderedDocument::default();
    let out = &mut doc.markdown;
    out.push_str("# BDCHM Variable Documentation\n\n");

    for group in group_rows(table, col::ELEMENT)? {
        let _ = write!(out, "## {}\n\n", group.key);

        for row in group.rows {
            let label = cell(table, row, col::LABEL);
            let _ = write!(out, "### {}\n\n", label);
            let _ = write!(
                out,
                "**Machine-readable name:** `{}`\n\n",
                cell(table, row, col::MACHINE_NAME)
            );

            let definition = cell(table, row, col::DEFINITION);
            if !definition.is_empty() {
                let _ = write!(out, "{}\n\n", definition);
            }

            out.push_str("**Properties:**\n");
            push_field(out, "Datatype", cell(table, row, col::DATATYPE));
            push_field(out, "Unit", cell(table, row, col::UNIT));
            push_field(out, "UCUM Unit", cell(table, row, col::UCUM_UNIT));

            out.push_str("\n**Ontology References:**\n");
            for (name, column) in [
                ("OMOP", col::OMOP_CURIE),
                ("OBA", col::OBA_CURIE),
                ("OMOP UCUM", col::OMOP_UCUM_CURIE),
            ] {
                match links.render_curie(cell(table, row, column)) {
                    RenderedCurie::Empty => {}
                    RenderedCurie::Link(link) => push_field(out, name, &link),
                    RenderedCurie::Flagged(text) => {
                        tracing::warn!(variable = label, value = %text, "{} identifier is not a CURIE", name);
                        push_field(out, name, &text);
                        doc.flagged.push((label.to_string(), text));
                    }
                }
            }

            out.push_str("\n---\n\n");
        }
    }

    Ok(doc)
}

fn push_field(out: &mut String, name: &str, value: &str) {
    if !value.trim().is_empty() {
        let _ = writeln!(out, "- **{}:** {}", name, value);
    }
}

/// Write the page; the file is flushed and closed before returning.
pub fn write_document(path: &Path, doc: &RenderedDocument) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(doc.markdown.as_bytes())?;
    writer.flush()
}
