//! Version & specifier algebra (C1).
//!
//! Implements a PEP 440-flavored version type with ordered comparison, a
//! specifier grammar (`<op><version>`), and specifier sets combined by
//! logical AND. Parsing is lenient: a string that cannot be parsed as a
//! release identifier becomes [`Version::Unknown`] rather than an error.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A single pre-release marker: alpha, beta, or release-candidate, with its number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreReleaseKind {
    /// `aN`
    Alpha,
    /// `bN`
    Beta,
    /// `rcN` / `cN`
    ReleaseCandidate,
}

impl PreReleaseKind {
    fn rank(&self) -> u8 {
        match self {
            PreReleaseKind::Alpha => 0,
            PreReleaseKind::Beta => 1,
            PreReleaseKind::ReleaseCandidate => 2,
        }
    }
}

/// A parsed, PEP 440-conforming version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedVersion {
    raw: String,
    epoch: u64,
    release: Vec<u64>,
    pre: Option<(PreReleaseKind, u64)>,
    post: Option<u64>,
    dev: Option<u64>,
}

impl ParsedVersion {
    /// The original string this version was parsed from.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether this version carries a pre-release or dev segment.
    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some() || self.dev.is_some()
    }

    fn release_at(&self, index: usize) -> u64 {
        self.release.get(index).copied().unwrap_or(0)
    }

    /// The release segment at `index` (major=0, minor=1, patch=2), or 0 if
    /// the version string didn't specify that many components.
    pub fn release_component(&self, index: usize) -> u64 {
        self.release_at(index)
    }
}

impl PartialOrd for ParsedVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ParsedVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.epoch.cmp(&other.epoch) {
            Ordering::Equal => {}
            o => return o,
        }

        let len = self.release.len().max(other.release.len());
        for i in 0..len {
            match self.release_at(i).cmp(&other.release_at(i)) {
                Ordering::Equal => continue,
                o => return o,
            }
        }

        // Dev releases sort before the final release; pre-releases sort
        // before the final release but after dev releases of the same
        // release segment; post-releases sort after.
        dev_pre_post_key(self).cmp(&dev_pre_post_key(other))
    }
}

/// Orders the (dev, pre, post) triple: dev < pre < final < post.
fn dev_pre_post_key(v: &ParsedVersion) -> (u8, u8, u64, u64) {
    if let Some(dev) = v.dev {
        (0, 0, 0, dev)
    } else if let Some((kind, num)) = &v.pre {
        (1, kind.rank(), *num, 0)
    } else if let Some(post) = v.post {
        (3, 0, 0, post)
    } else {
        (2, 0, 0, 0)
    }
}

/// A version that either parsed cleanly under PEP 440 or didn't.
///
/// An [`Version::Unknown`] value never satisfies a non-empty specifier set;
/// it only satisfies the wildcard (empty) set, matching the historical
/// behavior of treating unparseable installed versions as "anything goes
/// until proven otherwise, but never proven compatible."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Version {
    /// Successfully parsed release identifier.
    Parsed(ParsedVersion),
    /// Could not be parsed as PEP 440; carries the original string.
    Unknown(String),
}

impl Version {
    /// The raw string this version was constructed from.
    pub fn as_str(&self) -> &str {
        match self {
            Version::Parsed(p) => p.as_str(),
            Version::Unknown(s) => s.as_str(),
        }
    }

    /// Whether this is the `UnknownVersion` sentinel.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Version::Unknown(_))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for Version {
    fn from(s: &str) -> Self {
        parse_version(s)
    }
}

impl From<String> for Version {
    fn from(s: String) -> Self {
        parse_version(&s)
    }
}

// `epoch!release[.N]*[{a|b|rc}N][.postN|-N][.devN][+local]`
static VERSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)^
        \s*v?
        (?:(?P<epoch>[0-9]+)!)?
        (?P<release>[0-9]+(?:\.[0-9]+)*)
        (?P<pre>[-_.]?(?P<pre_kind>a|alpha|b|beta|rc|c)[-_.]?(?P<pre_num>[0-9]+)?)?
        (?:(?:[-_.]?(?:post|rev|r))(?P<post_num>[0-9]+)?|-(?P<post_implicit>[0-9]+))?
        (?:[-_.]?dev(?P<dev_num>[0-9]+)?)?
        (?:\+(?P<local>[a-zA-Z0-9.]+))?
        \s*$",
    )
    .expect("VERSION_RE is a fixed, valid pattern")
});

/// Parses a version string, falling back to the `Unknown` sentinel on failure.
pub fn parse_version(s: &str) -> Version {
    let trimmed = s.trim();
    let Some(caps) = VERSION_RE.captures(trimmed) else {
        return Version::Unknown(trimmed.to_string());
    };

    let epoch = caps
        .name("epoch")
        .and_then(|m| m.as_str().parse::<u64>().ok())
        .unwrap_or(0);

    let release: Vec<u64> = caps["release"]
        .split('.')
        .filter_map(|part| part.parse::<u64>().ok())
        .collect();

    let pre = caps.name("pre_kind").map(|m| {
        let kind = match m.as_str().to_ascii_lowercase().as_str() {
            "a" | "alpha" => PreReleaseKind::Alpha,
            "b" | "beta" => PreReleaseKind::Beta,
            _ => PreReleaseKind::ReleaseCandidate,
        };
        let num = caps
            .name("pre_num")
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(0);
        (kind, num)
    });

    let post = caps
        .name("post_num")
        .or_else(|| caps.name("post_implicit"))
        .map(|m| m.as_str().parse::<u64>().unwrap_or(0))
        .or_else(|| {
            // A bare "post"/"rev"/"r" token with no digits still counts as post0.
            if trimmed.to_ascii_lowercase().contains("post")
                || trimmed.to_ascii_lowercase().contains("rev")
            {
                Some(0)
            } else {
                None
            }
        });

    let dev = caps
        .name("dev_num")
        .map(|m| m.as_str().parse::<u64>().unwrap_or(0))
        .or_else(|| {
            if trimmed.to_ascii_lowercase().contains("dev") {
                Some(0)
            } else {
                None
            }
        });

    Version::Parsed(ParsedVersion {
        raw: trimmed.to_string(),
        epoch,
        release,
        pre,
        post,
        dev,
    })
}

/// Three-way comparison result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// Less than
    Lt,
    /// Equal
    Eq,
    /// Greater than
    Gt,
}

/// Compares two versions. Unknown versions compare equal only to an
/// identical raw string, and are otherwise considered incomparable in the
/// sense that neither direction implies satisfaction; callers that need a
/// total order should special-case `is_unknown()` first.
pub fn compare(a: &Version, b: &Version) -> Comparison {
    match (a, b) {
        (Version::Parsed(pa), Version::Parsed(pb)) => match pa.cmp(pb) {
            Ordering::Less => Comparison::Lt,
            Ordering::Equal => Comparison::Eq,
            Ordering::Greater => Comparison::Gt,
        },
        _ => {
            if a.as_str() == b.as_str() {
                Comparison::Eq
            } else {
                // Arbitrary but stable: unknown versions never compare
                // satisfied, so ordering them lexically is sufficient for
                // deterministic sort order without implying compatibility.
                match a.as_str().cmp(b.as_str()) {
                    Ordering::Less => Comparison::Lt,
                    Ordering::Equal => Comparison::Eq,
                    Ordering::Greater => Comparison::Gt,
                }
            }
        }
    }
}

/// A comparison operator in a specifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `~=`
    Compatible,
    /// `===` (arbitrary equality, compares raw strings)
    ArbitraryEq,
}

impl Operator {
    fn parse(s: &str) -> Option<(Self, &str)> {
        const OPS: &[(&str, Operator)] = &[
            ("===", Operator::ArbitraryEq),
            ("~=", Operator::Compatible),
            ("==", Operator::Eq),
            ("!=", Operator::Ne),
            ("<=", Operator::Le),
            (">=", Operator::Ge),
            ("<", Operator::Lt),
            (">", Operator::Gt),
        ];
        for (token, op) in OPS {
            if let Some(rest) = s.strip_prefix(token) {
                return Some((*op, rest));
            }
        }
        None
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Compatible => "~=",
            Operator::ArbitraryEq => "===",
        };
        write!(f, "{}", s)
    }
}

/// A single constraint of the form `<op><version>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specifier {
    /// The comparison operator.
    pub op: Operator,
    /// The operand version.
    pub version: Version,
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op, self.version.as_str())
    }
}

impl Specifier {
    /// Parses a single specifier fragment, e.g. `">=1.2.3"`.
    pub fn parse(fragment: &str) -> Option<Specifier> {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            return None;
        }
        let (op, rest) = Operator::parse(fragment)?;
        let version_str = rest.trim();
        if version_str.is_empty() {
            return None;
        }
        Some(Specifier {
            op,
            version: parse_version(version_str),
        })
    }

    /// Whether `version` satisfies this single constraint.
    pub fn satisfies(&self, version: &Version) -> bool {
        if self.op == Operator::ArbitraryEq {
            return version.as_str() == self.version.as_str();
        }

        let (Version::Parsed(v), Version::Parsed(operand)) = (version, &self.version) else {
            return false;
        };

        // Pre-releases are excluded from satisfaction unless the operand
        // itself is a pre-release of the same release segment (an explicit
        // opt-in) or the operator is strict equality.
        if v.is_prerelease() && !operand.is_prerelease() && self.op != Operator::Eq {
            return false;
        }

        match self.op {
            Operator::Eq => v == operand,
            Operator::Ne => v != operand,
            Operator::Lt => v < operand,
            Operator::Le => v <= operand,
            Operator::Gt => v > operand,
            Operator::Ge => v >= operand,
            Operator::ArbitraryEq => unreachable!(),
            Operator::Compatible => {
                if operand.release.len() < 2 {
                    return false;
                }
                let mut ceiling_release = operand.release.clone();
                let last = ceiling_release.len() - 2;
                ceiling_release.truncate(last + 1);
                ceiling_release[last] += 1;
                let ceiling = ParsedVersion {
                    raw: String::new(),
                    epoch: operand.epoch,
                    release: ceiling_release,
                    pre: None,
                    post: None,
                    dev: None,
                };
                v >= operand && v < &ceiling
            }
        }
    }
}

/// An ordered collection of specifiers combined by logical AND.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecifierSet(pub Vec<Specifier>);

impl SpecifierSet {
    /// The empty (wildcard) specifier set, satisfied by every parseable version.
    pub fn empty() -> Self {
        SpecifierSet(Vec::new())
    }

    /// Whether this set carries no constraints.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Intersects two specifier sets by concatenation (§9: no simplification
    /// is performed; satisfaction tests remain correct regardless).
    pub fn intersect(&self, other: &SpecifierSet) -> SpecifierSet {
        let mut combined = self.0.clone();
        combined.extend(other.0.iter().cloned());
        SpecifierSet(combined)
    }

    /// Renders the set back to its raw comma-joined form.
    pub fn to_raw_string(&self) -> String {
        self.0
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for SpecifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_raw_string())
    }
}

/// The historical wildcard sentinel: an explicit "no constraint" marker that
/// must be filtered before specifier construction.
fn is_wildcard_marker(s: &str) -> bool {
    let t = s.trim();
    t.is_empty() || t == "Any"
}

/// Parses a comma-separated specifier fragment into a [`SpecifierSet`].
///
/// Tolerates surrounding whitespace around each fragment. An invalid
/// fragment is dropped with the rest of the set still honored; a completely
/// unparseable or wildcard string yields the empty set, never an error.
pub fn parse_specifier_set(raw: &str) -> SpecifierSet {
    if is_wildcard_marker(raw) {
        return SpecifierSet::empty();
    }

    let specifiers: Vec<Specifier> = raw
        .split(',')
        .filter_map(|fragment| {
            let fragment = fragment.trim();
            if fragment.is_empty() {
                return None;
            }
            match Specifier::parse(fragment) {
                Some(spec) => Some(spec),
                None => {
                    tracing::warn!("dropping unparseable specifier fragment: {:?}", fragment);
                    None
                }
            }
        })
        .collect();

    SpecifierSet(specifiers)
}

/// Whether `version` satisfies every specifier in `set`.
///
/// An [`Version::Unknown`] version satisfies only the empty set.
pub fn satisfies(version: &Version, set: &SpecifierSet) -> bool {
    if set.is_empty() {
        return true;
    }
    if version.is_unknown() {
        return false;
    }
    set.0.iter().all(|spec| spec.satisfies(version))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_release() {
        let v = parse_version("1.2.3");
        match v {
            Version::Parsed(p) => assert_eq!(p.release, vec![1, 2, 3]),
            Version::Unknown(_) => panic!("expected parsed version"),
        }
    }

    #[test]
    fn unparseable_becomes_unknown() {
        let v = parse_version("not-a-version-at-all!!");
        assert!(v.is_unknown());
    }

    #[test]
    fn unknown_satisfies_only_wildcard() {
        let v = parse_version("banana");
        assert!(satisfies(&v, &SpecifierSet::empty()));
        assert!(!satisfies(&v, &parse_specifier_set(">=1.0")));
    }

    #[test]
    fn wildcard_markers_yield_empty_set() {
        assert!(parse_specifier_set("").is_empty());
        assert!(parse_specifier_set("Any").is_empty());
    }

    #[test]
    fn ordering_is_numeric_not_lexical() {
        let v1 = parse_version("1.9.0");
        let v2 = parse_version("1.10.0");
        assert_eq!(compare(&v1, &v2), Comparison::Lt);
    }

    #[test]
    fn compatible_release_two_components() {
        let set = parse_specifier_set("~=2.2");
        assert!(satisfies(&parse_version("2.2.0"), &set));
        assert!(satisfies(&parse_version("2.9.9"), &set));
        assert!(!satisfies(&parse_version("3.0.0"), &set));
        assert!(!satisfies(&parse_version("2.1.9"), &set));
    }

    #[test]
    fn compatible_release_three_components() {
        let set = parse_specifier_set("~=2.2.1");
        assert!(satisfies(&parse_version("2.2.1"), &set));
        assert!(satisfies(&parse_version("2.2.9"), &set));
        assert!(!satisfies(&parse_version("2.3.0"), &set));
    }

    #[test]
    fn prerelease_excluded_by_default() {
        let set = parse_specifier_set(">=1.0");
        assert!(!satisfies(&parse_version("1.1.0rc1"), &set));
    }

    #[test]
    fn prerelease_allowed_under_exact_match() {
        let set = parse_specifier_set("==1.1.0rc1");
        assert!(satisfies(&parse_version("1.1.0rc1"), &set));
    }

    #[test]
    fn intersection_is_concatenation() {
        let a = parse_specifier_set(">=1.0");
        let b = parse_specifier_set("<2.0");
        let combined = a.intersect(&b);
        assert_eq!(combined.0.len(), 2);
        assert!(satisfies(&parse_version("1.5.0"), &combined));
        assert!(!satisfies(&parse_version("2.5.0"), &combined));
    }

    #[test]
    fn invalid_fragment_drops_but_continues() {
        let set = parse_specifier_set(">=1.0, garbage, <2.0");
        assert_eq!(set.0.len(), 2);
    }
}
