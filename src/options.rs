use serde::{Deserialize, Serialize};

/// Context configuration.
///
/// ```ignore
/// let options = ContextOptions::from_json(r#"{ "ignore_set_case": true, "max_page_size": 100 }"#)?;
/// let ctx = ContextBuilder::new().options(options).register::<Product>().build(store);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextOptions {
    /// Resolve entity set names ignoring ASCII case.
    pub ignore_set_case: bool,

    /// Upper bound on the `count` of a paged `get_all`.
    pub max_page_size: Option<usize>,
}

impl ContextOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn ignore_set_case(mut self, ignore: bool) -> Self {
        self.ignore_set_case = ignore;
        self
    }

    pub fn max_page_size(mut self, max: usize) -> Self {
        self.max_page_size = Some(max);
        self
    }

    /// Apply `max_page_size` to a requested page size.
    pub(crate) fn page_size(&self, requested: usize) -> usize {
        match self.max_page_size {
            Some(max) if requested > max => {
                tracing::debug!(requested, max, "page size capped");
                max
            }
            _ => requested,
        }
    }
}
