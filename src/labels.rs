use std::path::Path;

use crate::error::{GateError, Result};

/// Class names of the model output, in output index order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labels(Vec<String>);

impl Labels {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| GateError::ModelLoad(format!("{}: {e}", path.display())))?;
        Self::parse(&content).map_err(|_| {
            GateError::ModelLoad(format!("{}: label file has no labels", path.display()))
        })
    }

    /// One label per non-empty line. A leading WordNet synset id such as
    /// `n07697537 hotdog, hot dog, red hot` is dropped.
    pub fn parse(content: &str) -> Result<Self> {
        let labels: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| strip_synset(line).to_string())
            .collect();

        if labels.is_empty() {
            return Err(GateError::model_load("label file has no labels"));
        }
        Ok(Self(labels))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for Labels {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

fn strip_synset(line: &str) -> &str {
    match line.split_once(char::is_whitespace) {
        Some((id, rest))
            if id.len() == 9
                && id.starts_with('n')
                && id[1..].bytes().all(|b| b.is_ascii_digit()) =>
        {
            rest.trim_start()
        }
        _ => line,
    }
}
