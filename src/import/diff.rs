//! Line differences between an imported song and the library copy.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use similar::{ChangeTag, TextDiff};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffTag {
    Equal,
    /// Only in the library copy.
    Removed,
    /// Only in the imported file.
    Added,
}

impl DiffTag {
    pub fn sign(self) -> char {
        match self {
            DiffTag::Equal => ' ',
            DiffTag::Removed => '-',
            DiffTag::Added => '+',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub tag: DiffTag,
    pub text: String,
}

/// Diff `target` (library copy) against `source` (imported file).
pub fn diff_text(target: &str, source: &str) -> Vec<DiffLine> {
    let diff = TextDiff::from_lines(target, source);
    diff.iter_all_changes()
        .map(|change| DiffLine {
            tag: match change.tag() {
                ChangeTag::Equal => DiffTag::Equal,
                ChangeTag::Delete => DiffTag::Removed,
                ChangeTag::Insert => DiffTag::Added,
            },
            text: change.value().trim_end_matches(['\n', '\r']).to_string(),
        })
        .collect()
}

pub fn diff_files(source: &Path, target: &Path) -> Result<Vec<DiffLine>> {
    let source_text = fs::read_to_string(source)
        .with_context(|| format!("failed to read {}", source.display()))?;
    let target_text = fs::read_to_string(target)
        .with_context(|| format!("failed to read {}", target.display()))?;
    Ok(diff_text(&target_text, &source_text))
}
