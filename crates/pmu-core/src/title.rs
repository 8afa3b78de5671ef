//! Branch identity and its issue-title encoding.
//!
//! A tracker issue's title is the only place a branch's identity lives:
//! `Branch: v1.2.0 (Phoenix)` or `Branch: patch/v1.1.1`. The legacy
//! `Release: ` prefix decodes identically. Everything outside this module
//! works with [`BranchIdentity`] and never strips prefixes itself.

use crate::error::{PmuError, Result};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

pub const BRANCH_PREFIX: &str = "Branch: ";
pub const LEGACY_PREFIX: &str = "Release: ";

/// Prefixes recognised on tracker titles, in preference order.
pub const TRACKER_PREFIXES: &[&str] = &[BRANCH_PREFIX, LEGACY_PREFIX];

pub const STABLE_TRACK: &str = "stable";

// ---------------------------------------------------------------------------
// BranchIdentity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchIdentity {
    pub track: String,
    pub version: String,
    /// Empty when the title carries no `(Codename)` suffix.
    pub codename: String,
}

impl BranchIdentity {
    pub fn new(track: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            track: track.into(),
            version: version.into(),
            codename: String::new(),
        }
    }

    pub fn with_codename(mut self, codename: impl Into<String>) -> Self {
        self.codename = codename.into();
        self
    }

    /// Interpret a user-supplied branch name such as `v1.2.0`, `1.2.0` or
    /// `patch/v1.1.1`.
    pub fn from_name(name: &str) -> Result<Self> {
        let name = name.trim();
        if !name_re().is_match(name) {
            return Err(PmuError::InvalidBranchName(name.to_string()));
        }
        let (track, version) = split_remainder(name);
        Ok(Self::new(track, version))
    }

    pub fn is_stable(&self) -> bool {
        self.track == STABLE_TRACK
    }

    /// The title body without prefix or codename: `v1.2.0`, `patch/v1.1.1`.
    pub fn display_name(&self) -> String {
        if self.is_stable() {
            format!("v{}", self.version)
        } else {
            format!("{}/v{}", self.track, self.version)
        }
    }

    pub fn title(&self) -> String {
        let codename = (!self.codename.is_empty()).then_some(self.codename.as_str());
        encode(&self.track, &self.version, codename)
    }

    pub fn tag_name(&self) -> String {
        format!("v{}", self.version)
    }

    /// Same track and version; the codename is decoration.
    pub fn same_branch(&self, other: &BranchIdentity) -> bool {
        self.track == other.track && self.version == other.version
    }
}

impl fmt::Display for BranchIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())?;
        if !self.codename.is_empty() {
            write!(f, " ({})", self.codename)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

pub fn encode(track: &str, version: &str, codename: Option<&str>) -> String {
    let body = if track == STABLE_TRACK {
        format!("v{version}")
    } else {
        format!("{track}/v{version}")
    };
    match codename {
        Some(c) if !c.is_empty() => format!("{BRANCH_PREFIX}{body} ({c})"),
        _ => format!("{BRANCH_PREFIX}{body}"),
    }
}

/// Returns `None` when the title is not a tracker title.
pub fn decode(title: &str) -> Option<BranchIdentity> {
    let rest = strip_prefix(title)?;
    let (remainder, codename) = split_codename(rest);
    let (track, version) = split_remainder(remainder);
    Some(BranchIdentity::new(track, version).with_codename(codename))
}

pub fn is_tracker(title: &str) -> bool {
    strip_prefix(title).is_some()
}

/// Title with prefix and codename removed, e.g. `v1.2.0` for
/// `Release: v1.2.0 (Phoenix)`.
pub fn remainder(title: &str) -> Option<&str> {
    strip_prefix(title).map(|rest| split_codename(rest).0)
}

fn strip_prefix(title: &str) -> Option<&str> {
    TRACKER_PREFIXES
        .iter()
        .find_map(|prefix| title.strip_prefix(prefix))
}

fn split_codename(rest: &str) -> (&str, &str) {
    match codename_re().captures(rest) {
        Some(caps) => {
            let body = caps.get(1).map_or(rest, |m| m.as_str());
            let codename = caps.get(2).map_or("", |m| m.as_str());
            (body, codename)
        }
        None => (rest, ""),
    }
}

fn split_remainder(remainder: &str) -> (&str, &str) {
    match remainder.split_once('/') {
        Some((track, version)) => (track, strip_v(version)),
        None => (STABLE_TRACK, strip_v(remainder)),
    }
}

fn strip_v(version: &str) -> &str {
    version.strip_prefix('v').unwrap_or(version)
}

static CODENAME_RE: OnceLock<Regex> = OnceLock::new();
static NAME_RE: OnceLock<Regex> = OnceLock::new();

fn codename_re() -> &'static Regex {
    CODENAME_RE.get_or_init(|| Regex::new(r"^(.*) \(([^()]*)\)$").unwrap())
}

fn name_re() -> &'static Regex {
    NAME_RE.get_or_init(|| Regex::new(r"^(?:[A-Za-z0-9._-]+/)?v?[0-9A-Za-z][0-9A-Za-z.+-]*$").unwrap())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_stable_with_codename() {
        let id = decode("Branch: v1.2.0 (Phoenix)").unwrap();
        assert_eq!(id.track, "stable");
        assert_eq!(id.version, "1.2.0");
        assert_eq!(id.codename, "Phoenix");
    }

    #[test]
    fn decode_legacy_prefix_with_track() {
        let id = decode("Release: patch/1.1.1").unwrap();
        assert_eq!(id.track, "patch");
        assert_eq!(id.version, "1.1.1");
        assert_eq!(id.codename, "");
    }

    #[test]
    fn decode_track_strips_leading_v() {
        let id = decode("Branch: hotfix/v2.0.1").unwrap();
        assert_eq!(id.track, "hotfix");
        assert_eq!(id.version, "2.0.1");
    }

    #[test]
    fn encode_stable_and_track() {
        assert_eq!(encode("stable", "1.2.0", None), "Branch: v1.2.0");
        assert_eq!(encode("patch", "1.1.1", None), "Branch: patch/v1.1.1");
        assert_eq!(
            encode("stable", "1.2.0", Some("Phoenix")),
            "Branch: v1.2.0 (Phoenix)"
        );
        assert_eq!(encode("stable", "1.2.0", Some("")), "Branch: v1.2.0");
    }

    #[test]
    fn round_trip_holds_for_legal_inputs() {
        let cases = [
            ("stable", "1.0.0", ""),
            ("stable", "2.10.3", "Kestrel"),
            ("patch", "1.1.1", ""),
            ("lts", "3.0.0-rc.1", "Long Haul"),
        ];
        for (track, version, codename) in cases {
            let title = encode(track, version, Some(codename));
            let id = decode(&title).unwrap();
            assert_eq!(
                (id.track.as_str(), id.version.as_str(), id.codename.as_str()),
                (track, version, codename),
                "round trip of {title}"
            );
        }
    }

    #[test]
    fn is_tracker_requires_reserved_prefix() {
        assert!(is_tracker("Branch: v1.0.0"));
        assert!(is_tracker("Release: v1.0.0"));
        assert!(!is_tracker("branch: v1.0.0"));
        assert!(!is_tracker("Fix crash in Branch: parser"));
        assert!(!is_tracker("Branch:v1.0.0"));
        assert!(!is_tracker(""));
        assert!(decode("Bug: v1.0.0").is_none());
    }

    #[test]
    fn remainder_strips_prefix_and_codename() {
        assert_eq!(remainder("Release: v1.2.0 (Phoenix)"), Some("v1.2.0"));
        assert_eq!(remainder("Branch: patch/v1.1.1"), Some("patch/v1.1.1"));
        assert_eq!(remainder("Other"), None);
    }

    #[test]
    fn from_name_accepts_common_shapes() {
        assert_eq!(
            BranchIdentity::from_name("v1.2.0").unwrap(),
            BranchIdentity::new("stable", "1.2.0")
        );
        assert_eq!(
            BranchIdentity::from_name("1.2.0").unwrap(),
            BranchIdentity::new("stable", "1.2.0")
        );
        assert_eq!(
            BranchIdentity::from_name("patch/v1.1.1").unwrap(),
            BranchIdentity::new("patch", "1.1.1")
        );
    }

    #[test]
    fn from_name_rejects_garbage() {
        for bad in ["", "v1 .0", "a/b/c", "(x)", "/1.0.0"] {
            assert!(
                matches!(
                    BranchIdentity::from_name(bad),
                    Err(PmuError::InvalidBranchName(_))
                ),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn identity_title_and_display() {
        let id = BranchIdentity::new("patch", "1.1.1").with_codename("Ember");
        assert_eq!(id.title(), "Branch: patch/v1.1.1 (Ember)");
        assert_eq!(id.display_name(), "patch/v1.1.1");
        assert_eq!(id.to_string(), "patch/v1.1.1 (Ember)");
        assert_eq!(id.tag_name(), "v1.1.1");
    }
}
