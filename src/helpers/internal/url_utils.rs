//! Mirror URL rewriting
//!
//! GitHub raw-content URLs have the fixed shape
//! `scheme://host/{USER}/{REPO}/{BRANCH}/{FILE...}`. A mirror template names
//! where the same file lives behind a proxy, e.g.
//! `https://cdn.jsdelivr.net/gh/{USER}/{REPO}@{BRANCH}/{FILE}` or
//! `https://ghproxy.com/{ORIGINAL_URL}`.

use crate::core::error::MirrorError;

/// Placeholders understood in mirror templates.
pub const PLACEHOLDERS: [&str; 5] = ["{ORIGINAL_URL}", "{USER}", "{REPO}", "{BRANCH}", "{FILE}"];

/// A named URL template from the mirror registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorTemplate {
    pub name: String,
    pub template: String,
}

impl MirrorTemplate {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
        }
    }

    /// Rewrite a canonical raw-content URL through this mirror.
    pub fn rewrite(&self, canonical_url: &str) -> Result<String, MirrorError> {
        rewrite(canonical_url, &self.template)
    }

    /// True when the template only prefixes the full original URL, so it can
    /// proxy any GitHub URL (release assets included), not just raw content.
    pub fn proxies_any_url(&self) -> bool {
        self.template.contains("{ORIGINAL_URL}")
            && !PLACEHOLDERS[1..]
                .iter()
                .any(|p| self.template.contains(p))
    }
}

/// The pieces of a raw-content URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawUrlParts<'a> {
    pub original: &'a str,
    pub user: &'a str,
    pub repo: &'a str,
    pub branch: &'a str,
    pub file: String,
}

/// Split `scheme://host/USER/REPO/BRANCH/FILE...` into its parts.
///
/// Needs at least six `/`-separated segments (`scheme:`, empty, host, user,
/// repo, branch); the file part may be empty.
pub fn split_raw_url(url: &str) -> Result<RawUrlParts<'_>, MirrorError> {
    let parts: Vec<&str> = url.split('/').collect();
    if parts.len() < 6 || !parts[0].ends_with(':') || !parts[1].is_empty() {
        return Err(MirrorError::MalformedSourceUrl {
            url: url.to_string(),
        });
    }

    Ok(RawUrlParts {
        original: url,
        user: parts[3],
        repo: parts[4],
        branch: parts[5],
        file: parts[6..].join("/"),
    })
}

/// Substitute the placeholders of `template` with the parts of `canonical_url`.
///
/// Substitution is a single left-to-right pass over the template, so text
/// introduced by one placeholder is never expanded again. Braces that do not
/// form a known placeholder are copied through.
pub fn rewrite(canonical_url: &str, template: &str) -> Result<String, MirrorError> {
    let parts = split_raw_url(canonical_url)?;
    let mut out = String::with_capacity(template.len() + canonical_url.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];

        let replacement = PLACEHOLDERS
            .iter()
            .find(|p| tail.starts_with(*p))
            .map(|p| (p.len(), placeholder_value(p, &parts)));

        match replacement {
            Some((len, value)) => {
                out.push_str(value);
                rest = &tail[len..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);

    Ok(out)
}

fn placeholder_value<'a>(placeholder: &str, parts: &'a RawUrlParts<'_>) -> &'a str {
    match placeholder {
        "{ORIGINAL_URL}" => parts.original,
        "{USER}" => parts.user,
        "{REPO}" => parts.repo,
        "{BRANCH}" => parts.branch,
        _ => &parts.file,
    }
}
