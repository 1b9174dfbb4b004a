//! Version parsing, ordering, and pattern matching for bz dependencies.
//!
//! Versions in bz are loose dotted numbers rather than strict semver: a
//! release may be tagged `v1.2`, `1.2.3.4`, or `2.0-rc1+build.7`. This module
//! parses such strings without ever failing, orders them, and matches them
//! against wildcard patterns such as `1.2.*`.
//!
//! # Parsing Rules
//!
//! - A single leading `v` is stripped
//! - Everything after the first `+` is build metadata (ignored for ordering)
//! - The text after the first `-` is the pre-release tag; any further
//!   `-`-separated segments are dropped
//! - The numeric prefix is split on `.`; segments that are empty or not
//!   numbers count as `0`
//!
//! # Ordering
//!
//! Numeric components are compared pairwise, padding the shorter version with
//! zeros, so `1.2 == 1.2.0`. When the numbers are equal a release ranks above
//! any pre-release of the same numbers. Two pre-releases with equal numbers
//! compare equal regardless of their tags.
//!
//! # Examples
//!
//! ```rust
//! use bz_cli::version::{Version, VersionPattern};
//!
//! let v: Version = "v1.2.3-pre+build".parse().unwrap();
//! assert_eq!(v.canonical(), "1.2.3-pre");
//! assert_eq!(v.to_string(), "1.2.3-pre+build");
//! assert!(v < Version::parse("1.2.3"));
//!
//! let pattern = VersionPattern::parse("1.2.*");
//! assert!(pattern.matches(&Version::parse("1.2.9.1")));
//! assert!(!pattern.matches(&Version::parse("1.3.0")));
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Splits a version-like string into `(numeric prefix, pre-release, metadata)`.
fn split_version(s: &str) -> (&str, Option<&str>, Option<&str>) {
    let s = s.strip_prefix('v').unwrap_or(s);

    let (rest, meta) = match s.split_once('+') {
        Some((rest, meta)) => (rest, Some(meta)),
        None => (s, None),
    };

    let mut parts = rest.split('-');
    let nums = parts.next().unwrap_or_default();
    let pre = parts.next();

    (nums, pre, meta)
}

/// A parsed release version.
///
/// Equality and ordering follow the loose comparison described in the module
/// docs, so `Version::parse("1.2") == Version::parse("1.2.0+meta")`.
#[derive(Debug, Clone)]
pub struct Version {
    nums: Vec<u64>,
    pre: Option<String>,
    meta: Option<String>,
    original: String,
}

impl Version {
    /// Parses a version string. Never fails; unparsable parts become `0`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let (nums, pre, meta) = split_version(s);

        Self {
            nums: nums.split('.').map(|n| n.parse().unwrap_or(0)).collect(),
            pre: pre.filter(|p| !p.is_empty()).map(str::to_string),
            meta: meta.filter(|m| !m.is_empty()).map(str::to_string),
            original: s.to_string(),
        }
    }

    /// Dotted numeric components followed by `-<pre>` when tagged.
    ///
    /// Build metadata is not part of the canonical form; this is the string
    /// used in cache paths and in `server/owner/repo@version` renderings.
    #[must_use]
    pub fn canonical(&self) -> String {
        let nums = self.nums.iter().map(u64::to_string).collect::<Vec<_>>().join(".");
        match &self.pre {
            Some(pre) => format!("{nums}-{pre}"),
            None => nums,
        }
    }

    /// The exact string this version was parsed from.
    #[must_use]
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Numeric components in order.
    #[must_use]
    pub fn components(&self) -> &[u64] {
        &self.nums
    }

    /// Pre-release tag, if any.
    #[must_use]
    pub fn pre_release(&self) -> Option<&str> {
        self.pre.as_deref()
    }

    /// Build metadata, if any.
    #[must_use]
    pub fn metadata(&self) -> Option<&str> {
        self.meta.as_deref()
    }

    #[must_use]
    pub const fn is_prerelease(&self) -> bool {
        self.pre.is_some()
    }
}

fn compare_nums(a: &[u64], b: &[u64]) -> Ordering {
    let len = a.len().max(b.len());
    for idx in 0..len {
        let av = a.get(idx).copied().unwrap_or(0);
        let bv = b.get(idx).copied().unwrap_or(0);
        match av.cmp(&bv) {
            Ordering::Equal => {}
            other => return other,
        }
    }
    Ordering::Equal
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_nums(&self.nums, &other.nums).then_with(|| match (&self.pre, &other.pre) {
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            _ => Ordering::Equal,
        })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())?;
        if let Some(meta) = &self.meta {
            write!(f, "+{meta}")?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse(&s))
    }
}

/// One position of a [`VersionPattern`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternComponent {
    /// Must equal the version's component at this position.
    Literal(u64),
    /// `*`: matches any value.
    Wildcard,
}

/// A version pattern such as `1.2.*`.
///
/// Positions past the end of the pattern match anything, so `1` matches
/// `1.0`, `1.5.2` and `1.9-rc1`. Pre-release tags and metadata written in the
/// pattern are ignored. The empty pattern matches every version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionPattern {
    components: Vec<PatternComponent>,
    original: String,
}

impl VersionPattern {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let (nums, _, _) = split_version(s);

        let components = if nums.is_empty() {
            Vec::new()
        } else {
            nums.split('.')
                .map(|n| {
                    if n == "*" {
                        PatternComponent::Wildcard
                    } else {
                        PatternComponent::Literal(n.parse().unwrap_or(0))
                    }
                })
                .collect()
        };

        Self {
            components,
            original: s.to_string(),
        }
    }

    /// Returns true when every literal position equals the version's
    /// component at that position (missing components count as `0`).
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        let nums = version.components();
        let len = self.components.len().max(nums.len());

        (0..len).all(|idx| {
            let actual = nums.get(idx).copied().unwrap_or(0);
            match self.components.get(idx) {
                Some(PatternComponent::Literal(expected)) => *expected == actual,
                Some(PatternComponent::Wildcard) | None => true,
            }
        })
    }

    /// True when the pattern contains no wildcard and is not empty.
    #[must_use]
    pub fn is_exact(&self) -> bool {
        !self.components.is_empty()
            && self.components.iter().all(|c| matches!(c, PatternComponent::Literal(_)))
    }

    #[must_use]
    pub fn original(&self) -> &str {
        &self.original
    }
}

impl fmt::Display for VersionPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

/// Selects the greatest version among `candidates` that matches `pattern`.
///
/// Among versions that compare equal, the last one wins.
pub fn latest_matching<'a, I>(pattern: &VersionPattern, candidates: I) -> Option<&'a Version>
where
    I: IntoIterator<Item = &'a Version>,
{
    candidates.into_iter().filter(|v| pattern.matches(v)).max()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s)
    }

    #[test]
    fn test_parse_components() {
        let version = v("v1.2.3-rc1+build.5");
        assert_eq!(version.components(), &[1, 2, 3]);
        assert_eq!(version.pre_release(), Some("rc1"));
        assert_eq!(version.metadata(), Some("build.5"));
        assert_eq!(version.original(), "v1.2.3-rc1+build.5");
        assert!(version.is_prerelease());
    }

    #[test]
    fn test_parse_metadata_keeps_extra_plus() {
        let version = v("1.0+a+b");
        assert_eq!(version.metadata(), Some("a+b"));
        assert_eq!(version.to_string(), "1.0+a+b");
    }

    #[test]
    fn test_parse_drops_second_prerelease_segment() {
        let version = v("1.0-alpha-2");
        assert_eq!(version.pre_release(), Some("alpha"));
        assert_eq!(version.canonical(), "1.0-alpha");
    }

    #[test]
    fn test_parse_invalid_segments_are_zero() {
        assert_eq!(v("1.x.3").components(), &[1, 0, 3]);
        assert_eq!(v("").components(), &[0]);
        assert_eq!(v("").canonical(), "0");
    }

    #[test]
    fn test_metadata_ignored_for_equality() {
        assert_eq!(v("0.0.0.1+asdfasdf"), v("0.0.0.1"));
        assert_eq!(v("v0.0.0.1+asdfasdf"), v("0.0.0.1"));
    }

    #[test]
    fn test_ordering() {
        assert!(v("1.2.3") > v("1.2"));
        assert!(v("0.0.2") > v("0.0.0.1"));
        assert!(v("0.0.2") < v("0.2"));
        assert!(v("") < v("0.2"));
        assert!(v("1.2.3-pre") < v("1.2.3"));
        assert_eq!(v("1.2"), v("1.2.0.0"));
        assert_eq!(v("1.0-alpha").cmp(&v("1.0-beta")), Ordering::Equal);
    }

    #[test]
    fn test_display_and_serde() {
        let version = v("v2.1-beta+7");
        assert_eq!(version.canonical(), "2.1-beta");
        assert_eq!(version.to_string(), "2.1-beta+7");

        let json = serde_json::to_string(&version).unwrap();
        assert_eq!(json, "\"2.1-beta+7\"");

        let back: Version = serde_json::from_str(&json).unwrap();
        assert_eq!(back, version);
        assert_eq!(back.pre_release(), Some("beta"));
    }

    #[test]
    fn test_pattern_matches() {
        let cases = [
            ("*", vec!["1", "1.2.3.4", "1.2-pre", "1.2.3.4-pre+extra", "0"]),
            ("1.*", vec!["1", "1.2", "1.2.3.4", "1-pre", "1.2.3+extra", "1.2.3.4-pre+extra"]),
            ("1.2.*", vec!["1.2", "1.2.3", "1.2.3.4", "1.2-pre", "1.2.3+extra", "1.2.3.4-pre+extra"]),
            ("1.2", vec!["1.2", "1.2.0", "1.2.7", "v1.2.3-pre"]),
            ("", vec!["0", "3.4.5"]),
        ];

        for (pattern, versions) in cases {
            let p = VersionPattern::parse(pattern);
            for version in versions {
                assert!(p.matches(&v(version)), "{pattern} should match {version}");
            }
        }
    }

    #[test]
    fn test_pattern_does_not_match() {
        let cases = [
            ("1.*", vec!["2", "0.2", "2.2.3", "3.2.3.4-pre", "2-pre+extra"]),
            ("1.2.*", vec!["0.1", "2.1", "1", "0.2", "1.3.0", "1-pre", "4.2.3.4-pre", "1-pre+extra"]),
            ("1.2.3", vec!["1.2", "1.2.4"]),
        ];

        for (pattern, versions) in cases {
            let p = VersionPattern::parse(pattern);
            for version in versions {
                assert!(!p.matches(&v(version)), "{pattern} should not match {version}");
            }
        }
    }

    #[test]
    fn test_pattern_is_exact() {
        assert!(VersionPattern::parse("1.2.3").is_exact());
        assert!(VersionPattern::parse("v1").is_exact());
        assert!(!VersionPattern::parse("1.*").is_exact());
        assert!(!VersionPattern::parse("").is_exact());
    }

    #[test]
    fn test_latest_matching() {
        let candidates = [v("1.2.0"), v("1.2.5"), v("1.3.0"), v("1.2.6-rc1"), v("2.0")];

        let best = latest_matching(&VersionPattern::parse("1.2.*"), &candidates);
        assert_eq!(best.map(Version::canonical), Some("1.2.6-rc1".to_string()));

        let best = latest_matching(&VersionPattern::parse("1.*"), &candidates);
        assert_eq!(best.map(Version::canonical), Some("1.3.0".to_string()));

        assert!(latest_matching(&VersionPattern::parse("3"), &candidates).is_none());
    }
}
