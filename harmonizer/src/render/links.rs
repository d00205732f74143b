//! Hyperlink templating for ontology identifiers.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

use crate::config::Settings;

/// `PREFIX:digits`, optionally with a `VT` sub-tag (`OBA:VT0001253`).
static CURIE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9]*:(VT)?\d+$").expect("regex for CURIEs"));

/// Sentinel for a term that has been asked for but does not exist yet.
pub const REQUESTED: &str = "REQUESTED";

pub const DEFAULT_LINK_TEMPLATE: &str = "http://purl.obolibrary.org/obo/{id}";
pub const DEFAULT_TRACKER_URL: &str = "https://github.com/obophenotype/bio-attribute-ontology/issues";

/// URL templates keyed by CURIE namespace.
///
/// `{id}` in a template is replaced by the CURIE with `:` turned into `_`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTemplates {
    pub default_template: String,
    pub namespace_templates: BTreeMap<String, String>,
    pub tracker_url: String,
}

impl Default for LinkTemplates {
    fn default() -> Self {
        Self {
            default_template: DEFAULT_LINK_TEMPLATE.to_string(),
            namespace_templates: BTreeMap::new(),
            tracker_url: DEFAULT_TRACKER_URL.to_string(),
        }
    }
}

/// Result of rendering one identifier cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedCurie {
    /// Nothing to render.
    Empty,
    /// Markdown link.
    Link(String),
    /// Text that did not look like an identifier; kept but flagged.
    Flagged(String),
}

impl LinkTemplates {
    pub fn from_settings(settings: &Settings) -> Self {
        let mut templates = Self::default();
        if let Some(url) = &settings.tracker_url {
            templates.tracker_url = url.clone();
        }
        templates
    }

    pub fn with_namespace(mut self, namespace: &str, template: &str) -> Self {
        self.namespace_templates
            .insert(namespace.to_string(), template.to_string());
        self
    }

    /// Link target for a well-formed CURIE.
    pub fn url_for(&self, curie: &str) -> String {
        let namespace = curie.split(':').next().unwrap_or("");
        let template = self
            .namespace_templates
            .get(namespace)
            .unwrap_or(&self.default_template);
        template.replace("{id}", &curie.replace(':', "_"))
    }

    pub fn render_curie(&self, value: &str) -> RenderedCurie {
        let value = value.trim();
        if value.is_empty() {
            return RenderedCurie::Empty;
        }
        if value == REQUESTED {
            return RenderedCurie::Link(format!("[{}]({})", REQUESTED, self.tracker_url));
        }
        if is_curie(value) {
            RenderedCurie::Link(format!("[{}]({})", value, self.url_for(value)))
        } else {
            RenderedCurie::Flagged(value.to_string())
        }
    }
}

pub fn is_curie(value: &str) -> bool {
    CURIE_PATTERN.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curie_pattern() {
        assert!(is_curie("OBA:VT0001253"));
        assert!(is_curie("OMOP:3036277"));
        assert!(is_curie("UCUM:8582"));
        assert!(!is_curie("OBA:VTabc"));
        assert!(!is_curie("OMOP:"));
        assert!(!is_curie("see notes"));
        assert!(!is_curie("OMOP:123 extra"));
    }

    #[test]
    fn test_link_embeds_underscored_identifier() {
        let links = LinkTemplates::default();
        assert_eq!(
            links.render_curie("OBA:VT0001253"),
            RenderedCurie::Link(
                "[OBA:VT0001253](http://purl.obolibrary.org/obo/OBA_VT0001253)".into()
            )
        );
    }

    #[test]
    fn test_requested_links_to_tracker() {
        let links = LinkTemplates {
            tracker_url: "https://example.org/issues".into(),
            ..LinkTemplates::default()
        };
        assert_eq!(
            links.render_curie("REQUESTED"),
            RenderedCurie::Link("[REQUESTED](https://example.org/issues)".into())
        );
    }

    #[test]
    fn test_namespace_override() {
        let links = LinkTemplates::default().with_namespace("OMOP", "https://example.org/omop/{id}");
        assert_eq!(links.url_for("OMOP:3036277"), "https://example.org/omop/OMOP_3036277");
        assert_eq!(links.url_for("OBA:1"), "http://purl.obolibrary.org/obo/OBA_1");
    }

    #[test]
    fn test_malformed_and_empty() {
        let links = LinkTemplates::default();
        assert_eq!(links.render_curie("  "), RenderedCurie::Empty);
        assert_eq!(
            links.render_curie("pending review"),
            RenderedCurie::Flagged("pending review".into())
        );
    }

    #[test]
    fn test_tracker_from_settings() {
        let settings = Settings {
            tracker_url: Some("https://tracker.test".into()),
            ..Settings::default()
        };
        assert_eq!(LinkTemplates::from_settings(&settings).tracker_url, "https://tracker.test");
    }
}
