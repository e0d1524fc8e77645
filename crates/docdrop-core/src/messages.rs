//! Locale-aware templates for the dashboard summary line.
//!
//! Each template contains a `{count}` placeholder. Built-in catalogs exist for
//! `en` and `de`; unknown locales fall back to `en`. Individual templates can
//! be overridden from configuration (see [`MessageOverrides`]).

use serde::{Deserialize, Serialize};

/// Placeholder substituted with the clause count.
const COUNT_PLACEHOLDER: &str = "{count}";

/// Optional per-template overrides, read from `dashboard.messages`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageOverrides {
    /// Template for the not-completed clause.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing: Option<String>,

    /// Template for the failed clause.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed: Option<String>,

    /// Template for the succeeded clause.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added: Option<String>,

    /// Separator between clauses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,
}

impl MessageOverrides {
    /// Whether no template is overridden.
    pub fn is_empty(&self) -> bool {
        self.processing.is_none()
            && self.failed.is_none()
            && self.added.is_none()
            && self.separator.is_none()
    }
}

/// Summary templates for one locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryMessages {
    processing: String,
    failed: String,
    added: String,
    separator: String,
}

impl Default for SummaryMessages {
    fn default() -> Self {
        Self::for_locale(crate::constants::DEFAULT_LOCALE)
    }
}

impl SummaryMessages {
    /// Built-in catalog for a locale tag (`en`, `de`, `de-AT`, ...).
    pub fn for_locale(locale: &str) -> Self {
        let language = locale
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_lowercase();
        match language.as_str() {
            "de" => Self::from_parts(
                "In Bearbeitung: {count}",
                "Fehlgeschlagen: {count}",
                "Hinzugefügt: {count}",
            ),
            "en" => Self::english(),
            other => {
                tracing::debug!("No summary messages for locale '{}', using en", other);
                Self::english()
            }
        }
    }

    fn english() -> Self {
        Self::from_parts("Processing: {count}", "Failed: {count}", "Added: {count}")
    }

    fn from_parts(processing: &str, failed: &str, added: &str) -> Self {
        Self {
            processing: processing.to_string(),
            failed: failed.to_string(),
            added: added.to_string(),
            separator: ", ".to_string(),
        }
    }

    /// Apply configured overrides on top of this catalog.
    pub fn with_overrides(mut self, overrides: &MessageOverrides) -> Self {
        if let Some(t) = &overrides.processing {
            self.processing = t.clone();
        }
        if let Some(t) = &overrides.failed {
            self.failed = t.clone();
        }
        if let Some(t) = &overrides.added {
            self.added = t.clone();
        }
        if let Some(s) = &overrides.separator {
            self.separator = s.clone();
        }
        self
    }

    /// Render the summary line. Clauses with a zero count are omitted.
    pub fn render(&self, processing: usize, failed: usize, added: usize) -> String {
        [
            (&self.processing, processing),
            (&self.failed, failed),
            (&self.added, added),
        ]
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(template, count)| template.replace(COUNT_PLACEHOLDER, &count.to_string()))
        .collect::<Vec<_>>()
        .join(&self.separator)
    }

    /// Templates that lack the `{count}` placeholder.
    pub fn templates_missing_placeholder(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.processing.contains(COUNT_PLACEHOLDER) {
            missing.push("processing");
        }
        if !self.failed.contains(COUNT_PLACEHOLDER) {
            missing.push("failed");
        }
        if !self.added.contains(COUNT_PLACEHOLDER) {
            missing.push("added");
        }
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_all_clauses() {
        let messages = SummaryMessages::default();
        assert_eq!(
            messages.render(3, 1, 2),
            "Processing: 3, Failed: 1, Added: 2"
        );
    }

    #[test]
    fn test_render_omits_zero_clauses() {
        let messages = SummaryMessages::default();
        assert_eq!(messages.render(0, 1, 0), "Failed: 1");
        assert_eq!(messages.render(2, 0, 5), "Processing: 2, Added: 5");
        assert_eq!(messages.render(0, 0, 0), "");
    }

    #[test]
    fn test_locale_with_region_and_fallback() {
        let de = SummaryMessages::for_locale("de-AT");
        assert_eq!(de.render(1, 0, 0), "In Bearbeitung: 1");
        assert_eq!(SummaryMessages::for_locale("xx"), SummaryMessages::default());
    }

    #[test]
    fn test_overrides() {
        let overrides = MessageOverrides {
            added: Some("{count} done".to_string()),
            separator: Some(" | ".to_string()),
            ..Default::default()
        };
        let messages = SummaryMessages::default().with_overrides(&overrides);
        assert_eq!(messages.render(1, 0, 4), "Processing: 1 | 4 done");
    }

    #[test]
    fn test_missing_placeholder_detection() {
        let overrides = MessageOverrides {
            failed: Some("Some failed".to_string()),
            ..Default::default()
        };
        let messages = SummaryMessages::default().with_overrides(&overrides);
        assert_eq!(messages.templates_missing_placeholder(), vec!["failed"]);
        assert!(SummaryMessages::default()
            .templates_missing_placeholder()
            .is_empty());
    }
}
