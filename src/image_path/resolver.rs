//! Path Resolver
//!
//! Turns backend-reported file paths (Windows drive paths, duplicated
//! `inspection/.../inspection/...` paths, relative paths) into URLs on the
//! file-serving endpoint. Stateless; memoized by [`super::ResolutionCache`].

use regex::Regex;
use serde::Serialize;

/// Segment name that anchors inspection image paths
const INSPECTION_SEGMENT: &str = "inspection";

/// Resolver configuration
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// File-serving endpoint, e.g. `/api/files`
    pub file_endpoint: String,
    /// Root the file endpoint serves from, e.g. `data`
    pub data_root: String,
    /// Root of inspection images, e.g. `data/images`
    pub image_root: String,
    /// Value of the `convert` query parameter
    pub convert_format: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            file_endpoint: "/api/files".to_string(),
            data_root: "data".to_string(),
            image_root: "data/images".to_string(),
            convert_format: "jpg".to_string(),
        }
    }
}

/// Which rule produced a resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveRule {
    DuplicatedInspection,
    InspectionSegment,
    InspectionPrefix,
    DriveLetter,
    DataRoot,
    PassThrough,
}

/// Canonical server-side path and the rule that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub rule: ResolveRule,
    pub path: String,
}

pub struct PathResolver {
    config: ResolverConfig,
    inspection_tail: Regex,
    drive_letter: Regex,
    date_code: Regex,
}

impl PathResolver {
    pub fn new(config: ResolverConfig) -> Self {
        let config = ResolverConfig {
            data_root: normalize(&config.data_root).trim_end_matches('/').to_string(),
            image_root: normalize(&config.image_root).trim_end_matches('/').to_string(),
            ..config
        };
        Self {
            config,
            inspection_tail: Regex::new(r"(?:^|[/\\])inspection[/\\](.+)$")
                .expect("inspection pattern is valid"),
            drive_letter: Regex::new(r"^[A-Za-z]:[/\\]").expect("drive pattern is valid"),
            date_code: Regex::new(r"\d{8}_\d{4}").expect("date code pattern is valid"),
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve `raw` to a file URL. Empty input yields an empty string.
    pub fn resolve(&self, raw: &str, cache_token: Option<&str>) -> String {
        match self.resolve_path(raw) {
            Some(resolved) => self.build_url(&resolved.path, cache_token),
            None => String::new(),
        }
    }

    /// Canonical path for `raw`, `None` for empty input
    pub fn resolve_path(&self, raw: &str) -> Option<ResolvedPath> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        let segments: Vec<&str> = raw.split(['/', '\\']).collect();
        let inspection_count = segments
            .iter()
            .filter(|s| **s == INSPECTION_SEGMENT)
            .count();

        // 1. duplicated inspection segment: keep the tail from the last one
        if inspection_count >= 2 {
            let last = segments
                .iter()
                .rposition(|s| *s == INSPECTION_SEGMENT)
                .unwrap_or(0);
            let tail = segments[last..].join("/");
            return Some(self.under_image_root(ResolveRule::DuplicatedInspection, &tail));
        }

        // 2. .../inspection/<rest>
        if let Some(rest) = self.inspection_tail.captures(raw).and_then(|c| c.get(1)) {
            let tail = format!("{}/{}", INSPECTION_SEGMENT, rest.as_str());
            return Some(self.under_image_root(ResolveRule::InspectionSegment, &tail));
        }

        // 3. inspection/ prefix
        if raw.starts_with("inspection/") {
            return Some(self.under_image_root(ResolveRule::InspectionPrefix, raw));
        }

        // 4. drive letter absolute path
        if self.drive_letter.is_match(raw) {
            let filename = segments
                .iter()
                .rev()
                .find(|s| !s.is_empty())
                .copied()
                .unwrap_or_default();
            let tail = match self.date_code.find_iter(raw).last() {
                Some(code) => format!("{}/{}/{}", INSPECTION_SEGMENT, code.as_str(), filename),
                None => format!("{}/{}", INSPECTION_SEGMENT, filename),
            };
            return Some(self.under_image_root(ResolveRule::DriveLetter, &tail));
        }

        let normalized = normalize(raw);

        // 5. already under the data root
        if is_under(&normalized, &self.config.data_root) {
            return Some(ResolvedPath {
                rule: ResolveRule::DataRoot,
                path: normalized,
            });
        }

        // 6. anything else passes through under the data root
        Some(ResolvedPath {
            rule: ResolveRule::PassThrough,
            path: join(&self.config.data_root, &normalized),
        })
    }

    fn under_image_root(&self, rule: ResolveRule, relative: &str) -> ResolvedPath {
        ResolvedPath {
            rule,
            path: join(&self.config.image_root, &normalize(relative)),
        }
    }

    fn build_url(&self, path: &str, cache_token: Option<&str>) -> String {
        // Keep `/` literal so the served path stays readable
        let encoded: Vec<String> = path
            .split('/')
            .map(|s| urlencoding::encode(s).into_owned())
            .collect();

        let mut url = format!(
            "{}?path={}&convert={}",
            self.config.file_endpoint,
            encoded.join("/"),
            urlencoding::encode(&self.config.convert_format)
        );

        if let Some(token) = cache_token.map(str::trim).filter(|t| !t.is_empty()) {
            url.push_str("&t=");
            url.push_str(&urlencoding::encode(token));
        }

        url
    }
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::new(ResolverConfig::default())
    }
}

/// `\` to `/`, collapse repeated separators, drop leading `./` and `/`
fn normalize(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let parts: Vec<&str> = unified
        .split('/')
        .enumerate()
        .filter(|(i, s)| !s.is_empty() && !(*i == 0 && *s == "."))
        .map(|(_, s)| s)
        .collect();
    let mut out = parts.join("/");
    if unified.ends_with('/') && !out.is_empty() {
        out.push('/');
    }
    out
}

fn is_under(path: &str, root: &str) -> bool {
    !root.is_empty() && (path == root || path.starts_with(&format!("{}/", root)))
}

fn join(root: &str, relative: &str) -> String {
    match (root.is_empty(), relative.is_empty()) {
        (true, _) => relative.to_string(),
        (false, true) => root.to_string(),
        (false, false) => format!("{}/{}", root.trim_end_matches('/'), relative),
    }
}
