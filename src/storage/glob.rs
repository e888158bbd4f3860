//! Glob pattern compilation and resolution
//!
//! Patterns are absolute namespace paths. Supported syntax:
//! - `*` any run of characters within one path component
//! - `?` exactly one character within one path component
//! - `[abc]`, `[a-z]`, `[!abc]` character classes
//! - `{a,b}` alternation, nestable, may span `/`
//! - `\x` escapes `x`
//!
//! Alternation is expanded up front; each alternative is split into path
//! components, and components without wildcards are looked up directly
//! instead of listing their parent.

use crate::error::{StorageError, StorageResult};
use crate::storage::types::{join_path, Entry};
use regex::Regex;

#[derive(Debug, Clone)]
enum Component {
    Literal(String),
    Pattern(Regex),
}

impl Component {
    fn matches(&self, name: &str) -> bool {
        match self {
            Component::Literal(literal) => literal == name,
            Component::Pattern(re) => re.is_match(name),
        }
    }
}

/// A compiled glob pattern
#[derive(Debug, Clone)]
pub struct GlobPattern {
    raw: String,
    alternatives: Vec<Vec<Component>>,
}

impl GlobPattern {
    /// Compile a glob pattern
    pub fn new(pattern: &str) -> StorageResult<Self> {
        if !pattern.starts_with('/') {
            return Err(invalid(pattern, "pattern must be an absolute path"));
        }

        let expanded = expand_braces(pattern).map_err(|reason| invalid(pattern, &reason))?;

        let alternatives = expanded
            .iter()
            .map(|alt| compile_components(alt).map_err(|reason| invalid(pattern, &reason)))
            .collect::<StorageResult<Vec<_>>>()?;

        Ok(Self {
            raw: pattern.to_string(),
            alternatives,
        })
    }

    /// The pattern as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Check whether the pattern contains any wildcard or alternation
    pub fn has_wildcard(&self) -> bool {
        self.alternatives.len() > 1
            || self
                .alternatives
                .iter()
                .flatten()
                .any(|c| matches!(c, Component::Pattern(_)))
    }

    /// Check whether a full namespace path matches this pattern
    pub fn matches(&self, path: &str) -> bool {
        let names: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        self.alternatives.iter().any(|components| {
            components.len() == names.len()
                && components.iter().zip(&names).all(|(c, name)| c.matches(name))
        })
    }
}

fn invalid(pattern: &str, reason: &str) -> StorageError {
    StorageError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    }
}

/// Expand the first top-level `{...}` group, recursing into the results
fn expand_braces(pattern: &str) -> Result<Vec<String>, String> {
    let chars: Vec<char> = pattern.chars().collect();

    let mut open = None;
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '{' => {
                open = Some(i);
                break;
            }
            '}' => return Err("unmatched '}'".into()),
            _ => {}
        }
        i += 1;
    }

    let Some(start) = open else {
        return Ok(vec![pattern.to_string()]);
    };

    let mut depth = 0usize;
    let mut splits = vec![start];
    let mut end = None;
    let mut j = start;
    while j < chars.len() {
        match chars[j] {
            '\\' => j += 1,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    end = Some(j);
                    break;
                }
            }
            ',' if depth == 1 => splits.push(j),
            _ => {}
        }
        j += 1;
    }

    let end = end.ok_or_else(|| "unclosed '{'".to_string())?;
    splits.push(end);

    let prefix: String = chars[..start].iter().collect();
    let suffix: String = chars[end + 1..].iter().collect();

    let mut expanded = Vec::new();
    for bounds in splits.windows(2) {
        let alt: String = chars[bounds[0] + 1..bounds[1]].iter().collect();
        expanded.extend(expand_braces(&format!("{}{}{}", prefix, alt, suffix))?);
    }
    Ok(expanded)
}

fn compile_components(path: &str) -> Result<Vec<Component>, String> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(compile_component)
        .collect()
}

fn compile_component(segment: &str) -> Result<Component, String> {
    let chars: Vec<char> = segment.chars().collect();
    let mut regex = String::from("^");
    let mut literal = String::new();
    let mut wildcard = false;

    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' => {
                i += 1;
                let escaped = *chars.get(i).ok_or_else(|| "trailing escape".to_string())?;
                literal.push(escaped);
                regex.push_str(&regex::escape(&escaped.to_string()));
            }
            '*' => {
                wildcard = true;
                regex.push_str("[^/]*");
            }
            '?' => {
                wildcard = true;
                regex.push_str("[^/]");
            }
            '[' => {
                wildcard = true;
                let mut j = i + 1;
                let negated = matches!(chars.get(j), Some('!') | Some('^'));
                if negated {
                    j += 1;
                }
                let body_start = j;
                // A leading ']' is a class member, not the terminator
                if chars.get(j) == Some(&']') {
                    j += 1;
                }
                while j < chars.len() && chars[j] != ']' {
                    j += 1;
                }
                if j >= chars.len() {
                    return Err("unclosed '['".into());
                }

                regex.push('[');
                if negated {
                    regex.push('^');
                }
                for ch in &chars[body_start..j] {
                    if matches!(ch, '\\' | '[' | ']' | '^' | '&' | '~') {
                        regex.push('\\');
                    }
                    regex.push(*ch);
                }
                regex.push(']');
                i = j;
            }
            c => {
                literal.push(c);
                regex.push_str(&regex::escape(&c.to_string()));
            }
        }
        i += 1;
    }

    if !wildcard {
        if literal == "." || literal == ".." {
            return Err(format!("'{}' components are not allowed", literal));
        }
        return Ok(Component::Literal(literal));
    }

    regex.push('$');
    Regex::new(&regex)
        .map(Component::Pattern)
        .map_err(|e| e.to_string())
}

/// Minimal view of a namespace tree needed to resolve globs
pub(crate) trait NamespaceTree {
    /// Look up a single path, `None` if it does not exist
    fn lookup(&self, path: &str) -> StorageResult<Option<Entry>>;

    /// List the immediate children of a directory
    fn read_dir(&self, path: &str) -> StorageResult<Vec<Entry>>;
}

/// Resolve a compiled glob against a namespace tree
///
/// Returns matches sorted by path with duplicates from overlapping
/// alternatives removed.
pub(crate) fn resolve<T: NamespaceTree + ?Sized>(
    tree: &T,
    glob: &GlobPattern,
) -> StorageResult<Vec<Entry>> {
    let failed = |e: StorageError| StorageError::GlobFailed {
        pattern: glob.as_str().to_string(),
        reason: e.to_string(),
    };

    let mut matches: Vec<Entry> = Vec::new();

    for components in &glob.alternatives {
        let Some(root) = tree.lookup("/").map_err(failed)? else {
            continue;
        };
        let mut candidates = vec![root];

        for component in components {
            let mut next = Vec::new();
            for candidate in candidates.iter().filter(|c| c.is_dir()) {
                match component {
                    Component::Literal(name) => {
                        let path = join_path(&candidate.path, name);
                        if let Some(entry) = tree.lookup(&path).map_err(failed)? {
                            next.push(entry);
                        }
                    }
                    Component::Pattern(re) => {
                        let children = tree.read_dir(&candidate.path).map_err(failed)?;
                        next.extend(children.into_iter().filter(|c| re.is_match(c.name())));
                    }
                }
            }
            candidates = next;
            if candidates.is_empty() {
                break;
            }
        }

        matches.extend(candidates);
    }

    matches.sort_by(|a, b| a.path.cmp(&b.path));
    matches.dedup_by(|a, b| a.path == b.path);
    Ok(matches)
}
