#![forbid(unsafe_code)]

//! Data source configuration.

/// Presentation and scoping options shared by all data sources.
///
/// ```
/// use ftui_datasource::DataSourceConfig;
///
/// let config = DataSourceConfig::new().title("Inbox").section_scope(2);
/// assert_eq!(config.title.as_deref(), Some("Inbox"));
/// assert_eq!(config.section_scope, Some(2));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DataSourceConfig {
    /// Display title, e.g. for a section header or tab.
    pub title: Option<String>,
    /// Expose only this backend section, renumbered as section 0.
    ///
    /// Honored by query data sources. Library data sources are single-section
    /// already and ignore it.
    pub section_scope: Option<usize>,
}

impl DataSourceConfig {
    /// Default configuration: untitled, every section visible.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the display title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Restrict the data source to one backend section.
    #[must_use]
    pub fn section_scope(mut self, section: usize) -> Self {
        self.section_scope = Some(section);
        self
    }
}
