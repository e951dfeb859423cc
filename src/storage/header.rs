//! Rendering of the generated C++ header.

use std::{io, path::Path};

use crate::domain::RequirementSet;

/// Renders the header declaring one enum value per identifier and a map from
/// each value to its message.
///
/// The output is deterministic and has no trailing newline.
#[must_use]
pub fn render(set: &RequirementSet) -> String {
    let mut lines = Vec::with_capacity(2 * set.len() + 8);
    lines.push("// Copyright here".to_string());
    lines.push("#pragma once".to_string());
    lines.push("// Comment on enum declaration".to_string());
    lines.push("enum UNIQUE_VALIDATION_ERROR_CODE {".to_string());
    for id in set.ids() {
        lines.push(format!("    {id} = {},", id.suffix()));
    }
    lines.push("};".to_string());
    lines.push("// Comment on enum error map".to_string());
    lines.push("std::unordered_map<int, char const *const> validation_error_map{".to_string());
    for (id, message) in set.iter() {
        lines.push(format!("    {{{id}, \"{}\"}},", escape(message)));
    }
    lines.push("};".to_string());
    lines.join("\n")
}

/// Renders the header and writes it to `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write(set: &RequirementSet, path: &Path) -> io::Result<()> {
    std::fs::write(path, render(set))?;
    tracing::info!(path = %path.display(), entries = set.len(), "wrote header");
    Ok(())
}

fn escape(message: &str) -> String {
    let mut escaped = String::with_capacity(message.len());
    for c in message.chars() {
        if matches!(c, '\\' | '"') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
