use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use semver::Version;

/// Leading run of non-digit characters, e.g. the `v` in `v1.2.3`
static PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^0-9]*").expect("prefix regex is valid"));

/// An image tag interpreted as a semantic version.
///
/// The prefix is kept so the tag can be rendered back to the string the
/// registry knows it by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemVerTag {
    pub prefix: String,
    pub version: Version,
}

impl SemVerTag {
    /// Compare two tags by version precedence, ignoring build metadata and prefix.
    pub fn cmp_precedence(&self, other: &Self) -> Ordering {
        self.version.cmp_precedence(&other.version)
    }
}

impl fmt::Display for SemVerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.prefix, self.version)
    }
}

/// Parse a docker tag as a semantic version.
///
/// Returns `None` if the tag is not a semantic version. This is an expected
/// outcome for tags like `latest` or `1.2`, not an error.
///
/// Examples:
/// - "v1.2.3" -> prefix "v", version 1.2.3
/// - "alpine3.12.0" -> prefix "alpine", version 3.12.0
/// - "1.2.3-rc.1" -> prefix "", version 1.2.3-rc.1
pub fn parse_tag(tag: &str) -> Option<SemVerTag> {
    let prefix_len = PREFIX_RE.find(tag).map_or(0, |m| m.end());
    let (prefix, rest) = tag.split_at(prefix_len);

    let version = Version::parse(rest).ok()?;

    Some(SemVerTag {
        prefix: prefix.to_string(),
        version,
    })
}
