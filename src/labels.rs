use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Static folder name -> display label mapping
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderLabels {
    labels: HashMap<String, String>,
}

impl FolderLabels {
    pub fn new(labels: HashMap<String, String>) -> Self {
        Self { labels }
    }

    /// Load a JSON object of `{"folder": "Label"}`
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read folder labels from {:?}", path))?;
        serde_json::from_str(&content).context("Invalid folder labels JSON")
    }

    /// Display label for `name`, or `name` itself when unmapped
    pub fn label<'a>(&'a self, name: &'a str) -> &'a str {
        self.labels.get(name).map(String::as_str).unwrap_or(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_falls_back_to_name() {
        let labels: FolderLabels =
            serde_json::from_str(r#"{"trip2024": "Summer trip 2024"}"#).unwrap();

        assert_eq!(labels.label("trip2024"), "Summer trip 2024");
        assert_eq!(labels.label("misc"), "misc");
    }
}
