use crate::misc::{FEATURE_NAMES, FeatureVector};

/// Ordered list of feature names a model expects, resolved once when the
/// model is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl FeatureSchema {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Schema matching the engineered vector one-to-one.
    pub fn canonical() -> Self {
        Self::new(FEATURE_NAMES)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Expected names the feature engineer does not produce. These are
    /// zero-filled by `reindex`.
    pub fn missing(&self) -> Vec<&str> {
        self.names
            .iter()
            .map(String::as_str)
            .filter(|name| !FEATURE_NAMES.contains(name))
            .collect()
    }

    /// Align a feature vector to this schema: one value per expected name,
    /// in schema order. Unknown names become 0, unexpected features are dropped.
    pub fn reindex(&self, features: &FeatureVector) -> Vec<f64> {
        self.names
            .iter()
            .map(|name| features.get(name).unwrap_or(0.0))
            .collect()
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::canonical()
    }
}
