//! Package token grammar.
//!
//! A token is either a repository reference `owner/repo[:alias]` or an index
//! requirement `name[==version][:alias]`. Repository references are matched
//! first; the pattern is anchored so `a/b/c` is never mistaken for one.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Prefix turning `owner/repo` into an installer-understood VCS locator.
pub const GITHUB_VCS_PREFIX: &str = "git+git://github.com/";

static REPOSITORY_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([^/:\s]+)/([^/:\s]+)(?::(.*))?$").expect("repository token pattern")
});

const REQUIREMENT_DELIMITERS: &[char] = &['[', '=', '<', '>', '!', '~', ';', '@', ' ', '\t'];

/// A package the user asked to try, resolved into what to install and what to import.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageSpec {
    /// Install target as entered, possibly with a version pin.
    pub name: String,
    /// Passed to the package installer verbatim.
    pub source_locator: String,
    /// Identifier used in the generated `import` statement.
    pub import_symbol: String,
}

impl PackageSpec {
    #[must_use]
    pub fn is_repository(&self) -> bool {
        self.source_locator.starts_with(GITHUB_VCS_PREFIX)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SpecError {
    #[error("package token is empty")]
    Empty,
    #[error("package token '{token}' has an empty import alias after ':'")]
    EmptyAlias { token: String },
    #[error("package token '{token}' has no package name before ':'")]
    MissingName { token: String },
    #[error("repository reference '{token}' carries a version pin; pins only apply to index packages")]
    AmbiguousPin { token: String },
    #[error("package token '{token}' is neither 'owner/repo[:alias]' nor 'name[==version][:alias]'")]
    InvalidShape { token: String },
}

impl SpecError {
    #[must_use]
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Empty | Self::MissingName { .. } => {
                Some("pass packages like `requests`, `requests==2.31` or `owner/repo`")
            }
            Self::EmptyAlias { .. } => Some("drop the trailing ':' or name the module to import"),
            Self::AmbiguousPin { .. } => {
                Some("install the repository without a pin, or use the index name with `==version`")
            }
            Self::InvalidShape { .. } => {
                Some("repository references take exactly one '/', e.g. `timofurrer/try`")
            }
        }
    }
}

/// Resolves a raw token into a [`PackageSpec`].
///
/// Never fails: malformed input degrades to a best-effort interpretation whose
/// import symbol is still a valid dotted identifier.
#[must_use]
pub fn resolve(token: &str) -> PackageSpec {
    let token = token.trim();
    if let Some(captures) = REPOSITORY_TOKEN.captures(token) {
        let owner = &captures[1];
        let repo = &captures[2];
        let path = format!("{owner}/{repo}");
        let alias = captures
            .get(3)
            .map(|m| m.as_str().trim())
            .filter(|alias| !alias.is_empty());
        let symbol = alias.unwrap_or_else(|| strip_requirement_suffix(repo));
        return PackageSpec {
            source_locator: format!("{GITHUB_VCS_PREFIX}{path}"),
            name: path,
            import_symbol: normalize_import_symbol(symbol),
        };
    }

    let (name, alias) = match token.split_once(':') {
        Some((name, alias)) => (name.trim(), Some(alias.trim()).filter(|a| !a.is_empty())),
        None => (token, None),
    };
    let symbol = alias.unwrap_or_else(|| strip_requirement_suffix(name));
    PackageSpec {
        name: name.to_string(),
        source_locator: name.to_string(),
        import_symbol: normalize_import_symbol(symbol),
    }
}

/// Strict variant of [`resolve`] that rejects tokens outside the grammar.
///
/// # Errors
/// Returns [`SpecError`] for empty tokens, empty names or aliases, repository
/// references with a version pin, and tokens with more than one `/`.
pub fn parse(token: &str) -> Result<PackageSpec, SpecError> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return Err(SpecError::Empty);
    }
    if let Some(captures) = REPOSITORY_TOKEN.captures(trimmed) {
        if captures[2].contains(REQUIREMENT_DELIMITERS) {
            return Err(SpecError::AmbiguousPin {
                token: trimmed.to_string(),
            });
        }
        if captures.get(3).is_some_and(|alias| alias.as_str().trim().is_empty()) {
            return Err(SpecError::EmptyAlias {
                token: trimmed.to_string(),
            });
        }
        return Ok(resolve(trimmed));
    }
    if trimmed.contains('/') {
        return Err(SpecError::InvalidShape {
            token: trimmed.to_string(),
        });
    }
    if let Some((name, alias)) = trimmed.split_once(':') {
        if name.trim().is_empty() {
            return Err(SpecError::MissingName {
                token: trimmed.to_string(),
            });
        }
        if alias.trim().is_empty() {
            return Err(SpecError::EmptyAlias {
                token: trimmed.to_string(),
            });
        }
    }
    Ok(resolve(trimmed))
}

fn strip_requirement_suffix(name: &str) -> &str {
    name.split(REQUIREMENT_DELIMITERS)
        .next()
        .unwrap_or(name)
        .trim()
}

/// Maps hyphens to underscores and any other non-identifier character to `_`,
/// segment by segment, so the result can follow `import`.
pub(crate) fn normalize_import_symbol(raw: &str) -> String {
    let normalized = raw
        .trim()
        .split('.')
        .map(|segment| {
            let mut ident: String = segment
                .chars()
                .map(|ch| {
                    if ch.is_alphanumeric() || ch == '_' {
                        ch
                    } else {
                        '_'
                    }
                })
                .collect();
            if ident.is_empty() || ident.starts_with(|ch: char| ch.is_ascii_digit()) {
                ident.insert(0, '_');
            }
            ident
        })
        .collect::<Vec<_>>();
    normalized.join(".")
}
