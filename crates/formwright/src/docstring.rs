//! Docstring extraction.
//!
//! A docstring carries two things for the form:
//!
//! - **Prose**: the function description shown on the page, and
//!   per-parameter descriptions in any of the common styles
//!   (`:param name:` / `@param name:`, `Args:` sections, numpy
//!   `Parameters` sections).
//! - **Widget overlays**: an embedded TOML region delimited by a line
//!   containing only `@params` (or `@widgets`) and a line containing only
//!   `@end`. Each top-level key names a parameter and maps to a table of
//!   widget options:
//!
//! ```text
//! Compute a greeting.
//!
//! @params
//! [name]
//! label = "Your name"
//! placeholder = "Ada"
//! @end
//! ```
//!
//! Only the first region is parsed. A region without `@end` runs to the end
//! of the docstring. Every region is removed from the prose.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::resolver::Overlays;
use crate::value::Value;

const TARGET: &str = "formwright::docstring";

const BLOCK_MARKERS: [&str; 2] = ["@params", "@widgets"];
const END_MARKER: &str = "@end";

static FIELD_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s*)[:@]param(?:\s+[^\s:]+)?\s+\*{0,2}(\w+)\s*:\s*(.*)$").expect("valid regex")
});

static GOOGLE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s*)(?:Args|Arguments|Parameters|Params|Keyword Args|Keyword Arguments)\s*:\s*$")
        .expect("valid regex")
});

static GOOGLE_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\*{0,2}(\w+)\s*(?:\([^)]*\))?\s*:\s*(.*)$").expect("valid regex")
});

static GOOGLE_BARE_ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\*{0,2}(\w+)$").expect("valid regex"));

static NUMPY_ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\w+)\s*(?::.*)?$").expect("valid regex"));

static DASH_RULE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*-{3,}\s*$").expect("valid regex"));

/// The parsed contents of a docstring.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Docstring {
    /// The prose with every `@params` region removed.
    pub description: String,
    /// Widget options from the first `@params` region.
    pub overlays: Overlays,
    /// Raw text of the first `@params` region, if present.
    pub config_region: Option<String>,
    parameter_descriptions: BTreeMap<String, String>,
}

impl Docstring {
    /// Split `doc` into prose, overlays and parameter descriptions.
    ///
    /// Fails with [`Error::DocstringConfig`] when the `@params` region is
    /// not valid TOML or has a top-level value that is not a table.
    pub fn extract(doc: &str) -> Result<Self> {
        let cleaned = clean_docstring(doc);
        let (prose, region) = split_regions(&cleaned);

        let overlays = match &region {
            Some(region) => parse_region(region)?,
            None => Overlays::new(),
        };
        let parameter_descriptions = parameter_descriptions(&prose);
        let description = prose.trim().to_string();

        tracing::trace!(
            target: TARGET,
            has_region = region.is_some(),
            overlays = overlays.len(),
            described = parameter_descriptions.len(),
            "extracted docstring"
        );

        Ok(Self {
            description,
            overlays,
            config_region: region,
            parameter_descriptions,
        })
    }

    /// The description of parameter `name`, if the docstring has one.
    pub fn parameter_description(&self, name: &str) -> Option<&str> {
        self.parameter_descriptions.get(name).map(String::as_str)
    }

    /// Descriptions for each of `names`, `None` where the docstring is silent.
    pub fn descriptions_for<'a, I>(&self, names: I) -> BTreeMap<String, Option<String>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .map(|name| {
                (
                    name.to_string(),
                    self.parameter_description(name).map(str::to_string),
                )
            })
            .collect()
    }
}

/// Strip uniform indentation and surrounding blank lines.
///
/// The first line is taken as-is because docstrings usually start right
/// after the opening quotes.
pub fn clean_docstring(doc: &str) -> String {
    let doc = doc.replace('\t', "    ");
    let lines: Vec<&str> = doc.lines().collect();
    let indent = lines
        .iter()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut out: Vec<String> = lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let line = if i == 0 {
                line.trim_start()
            } else {
                line.get(indent..).unwrap_or_else(|| line.trim_start())
            };
            line.trim_end().to_string()
        })
        .collect();

    while out.first().is_some_and(|l| l.is_empty()) {
        out.remove(0);
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out.join("\n")
}

fn is_block_marker(line: &str) -> bool {
    BLOCK_MARKERS.contains(&line.trim())
}

/// Separate the prose from the marker regions, returning the first region.
fn split_regions(doc: &str) -> (String, Option<String>) {
    let mut prose = Vec::new();
    let mut first_region: Option<Vec<&str>> = None;
    let mut current: Option<Vec<&str>> = None;

    for line in doc.lines() {
        if current.is_none() {
            if is_block_marker(line) {
                current = Some(Vec::new());
            } else {
                prose.push(line);
            }
        } else if line.trim() == END_MARKER {
            let finished = current.take();
            if first_region.is_none() {
                first_region = finished;
            } else {
                tracing::debug!(target: TARGET, "ignoring additional @params region");
            }
        } else if let Some(region) = current.as_mut() {
            region.push(line);
        }
    }
    if let Some(unterminated) = current {
        tracing::debug!(target: TARGET, "@params region has no @end, reading to end of docstring");
        if first_region.is_none() {
            first_region = Some(unterminated);
        }
    }

    let region = first_region.map(|lines| dedent(&lines));
    (prose.join("\n"), region)
}

fn dedent(lines: &[&str]) -> String {
    let indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|l| l.get(indent..).unwrap_or_else(|| l.trim_start()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn parse_region(region: &str) -> Result<Overlays> {
    let config_error = |message: String| Error::DocstringConfig {
        message,
        region: region.to_string(),
    };
    let table: toml::Table =
        toml::from_str(region).map_err(|e| config_error(e.message().to_string()))?;

    let mut overlays = Overlays::new();
    for (parameter, options) in table {
        match Value::from(options) {
            Value::Table(options) => {
                overlays.insert(parameter, options);
            }
            other => {
                return Err(config_error(format!(
                    "'{parameter}' must be a table of widget options, found {}",
                    other.type_name()
                )));
            }
        }
    }
    Ok(overlays)
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

fn append(entry: &mut String, text: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    if !entry.is_empty() {
        entry.push(' ');
    }
    entry.push_str(text);
}

fn parameter_descriptions(prose: &str) -> BTreeMap<String, String> {
    let lines: Vec<&str> = prose.lines().collect();
    let mut found: Vec<(String, String)> = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        if let Some(caps) = FIELD_TAG.captures(line) {
            let base = caps[1].len();
            let mut text = String::new();
            append(&mut text, &caps[3]);
            i += 1;
            while i < lines.len()
                && !lines[i].trim().is_empty()
                && indent_of(lines[i]) > base
                && !FIELD_TAG.is_match(lines[i])
            {
                append(&mut text, lines[i]);
                i += 1;
            }
            found.push((caps[2].to_string(), text));
        } else if let Some(caps) = GOOGLE_HEADER.captures(line) {
            if lines.get(i + 1).is_some_and(|next| DASH_RULE.is_match(next)) {
                i = read_numpy_section(&lines, i + 2, indent_of(line), &mut found);
            } else {
                i = read_google_section(&lines, i + 1, caps[1].len(), &mut found);
            }
        } else if line.trim() == "Parameters"
            && lines.get(i + 1).is_some_and(|next| DASH_RULE.is_match(next))
        {
            i = read_numpy_section(&lines, i + 2, indent_of(line), &mut found);
        } else {
            i += 1;
        }
    }

    let mut descriptions = BTreeMap::new();
    for (name, text) in found {
        descriptions.entry(name).or_insert(text);
    }
    descriptions
}

fn read_google_section(
    lines: &[&str],
    mut i: usize,
    header_indent: usize,
    found: &mut Vec<(String, String)>,
) -> usize {
    let mut entry_indent: Option<usize> = None;
    while i < lines.len() {
        let line = lines[i];
        if line.trim().is_empty() {
            i += 1;
            continue;
        }
        let indent = indent_of(line);
        if indent <= header_indent {
            break;
        }
        let entry_level = *entry_indent.get_or_insert(indent);
        let entry = line.trim();
        if indent == entry_level
            && let Some(caps) = GOOGLE_ENTRY.captures(entry)
        {
            let mut text = String::new();
            append(&mut text, &caps[2]);
            found.push((caps[1].to_string(), text));
        } else if indent == entry_level
            && let Some(caps) = GOOGLE_BARE_ENTRY.captures(entry)
        {
            // name alone; the description follows on deeper lines
            found.push((caps[1].to_string(), String::new()));
        } else if let Some((_, text)) = found.last_mut() {
            append(text, line);
        }
        i += 1;
    }
    i
}

fn read_numpy_section(
    lines: &[&str],
    mut i: usize,
    header_indent: usize,
    found: &mut Vec<(String, String)>,
) -> usize {
    let mut in_entry = false;
    while i < lines.len() {
        let line = lines[i];
        if line.trim().is_empty() {
            i += 1;
            continue;
        }
        if lines.get(i + 1).is_some_and(|next| DASH_RULE.is_match(next)) {
            break;
        }
        let indent = indent_of(line);
        if indent == header_indent {
            match NUMPY_ENTRY.captures(line.trim()) {
                Some(caps) => {
                    found.push((caps[1].to_string(), String::new()));
                    in_entry = true;
                }
                None => break,
            }
        } else if indent > header_indent && in_entry {
            if let Some((_, text)) = found.last_mut() {
                append(text, line);
            }
        } else {
            break;
        }
        i += 1;
    }
    i
}
