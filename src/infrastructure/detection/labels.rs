//! Class names for model outputs

use std::path::Path;

use crate::domain::DomainError;

const MAX_CLASSES: usize = 10_000;

/// Maps class ids to display names
#[derive(Debug, Clone, Default)]
pub struct ClassLabels {
    names: Vec<String>,
}

impl ClassLabels {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Read one name per line, skipping blank lines
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            DomainError::configuration(format!(
                "Failed to read labels file {}: {}",
                path.display(),
                e
            ))
        })?;

        Ok(Self::parse(&contents))
    }

    pub fn parse(contents: &str) -> Self {
        Self::new(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// Parse an exporter `names` map such as `{0: 'pneu', 1: 'vaso'}`
    ///
    /// Ids missing from the map get the `class {id}` fallback.
    pub fn from_names_map(map: &str) -> Option<Self> {
        let body = map.trim().strip_prefix('{')?.strip_suffix('}')?;
        let mut entries: Vec<(usize, String)> = Vec::new();
        let mut rest = body.trim_start();

        while !rest.is_empty() {
            let (key, value) = rest.split_once(':')?;
            let id: usize = key
                .trim()
                .trim_matches(|c: char| c == '\'' || c == '"')
                .parse()
                .ok()?;

            let value = value.trim_start();
            let quote = value.chars().next().filter(|c| *c == '\'' || *c == '"')?;
            let value = &value[1..];
            let end = value.find(quote)?;
            entries.push((id, value[..end].to_string()));

            rest = value[end + 1..].trim_start();
            rest = rest.strip_prefix(',').unwrap_or(rest).trim_start();
        }

        let len = entries.iter().map(|(id, _)| id + 1).max()?;
        if len > MAX_CLASSES {
            return None;
        }

        let mut names: Vec<String> = (0..len).map(|id| format!("class {}", id)).collect();
        for (id, name) in entries {
            names[id] = name;
        }

        Some(Self::new(names))
    }

    pub fn name(&self, class_id: u32) -> String {
        self.names
            .get(class_id as usize)
            .cloned()
            .unwrap_or_else(|| format!("class {}", class_id))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
