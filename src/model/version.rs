use serde::Serialize;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Dot-separated version number. Parsing never fails: an unparsable string
/// leaves every numeric field absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Version {
    raw: String,
    pub major: Option<u64>,
    pub minor: Option<u64>,
    pub revision: Option<u64>,
    pub patch: Option<u64>,
    pub build: Option<u64>,
    /// Components after the fifth.
    pub tail: Vec<u64>,
}

fn component(part: &str) -> Option<u64> {
    part.trim().parse().ok()
}

impl Version {
    pub fn parse(raw: &str) -> Self {
        let parts: Option<Vec<u64>> = raw.split('.').map(component).collect();
        let parts = parts.unwrap_or_else(|| {
            debug!("version {:?} is not purely numeric", raw);
            Vec::new()
        });
        let at = |i: usize| parts.get(i).copied();

        Self {
            raw: raw.to_string(),
            major: at(0),
            minor: at(1),
            revision: at(2),
            patch: at(3),
            build: at(4),
            tail: parts.get(5..).map(<[u64]>::to_vec).unwrap_or_default(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Component at `index`. Positions past the fifth are read from the
    /// raw string.
    pub fn get(&self, index: usize) -> Option<u64> {
        match index {
            0 => self.major,
            1 => self.minor,
            2 => self.revision,
            3 => self.patch,
            4 => self.build,
            _ => self.raw.split('.').nth(index).and_then(component),
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.major.is_some()
    }
}

impl From<&str> for Version {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl FromStr for Version {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_version_leaves_fields_absent() {
        let v = Version::parse("1.2.3");
        assert_eq!(v.major, Some(1));
        assert_eq!(v.minor, Some(2));
        assert_eq!(v.revision, Some(3));
        assert_eq!(v.patch, None);
        assert_eq!(v.build, None);
        assert!(v.tail.is_empty());
        assert_eq!(v.to_string(), "1.2.3");
    }

    #[test]
    fn unparsable_version_degrades() {
        let v = Version::parse("not-a-version");
        assert_eq!(
            (v.major, v.minor, v.revision, v.patch, v.build),
            (None, None, None, None, None)
        );
        assert!(v.tail.is_empty());
        assert!(!v.is_numeric());
        assert_eq!(v.get(0), None);
        assert_eq!(v.get(9), None);
    }

    #[test]
    fn long_version_keeps_tail() {
        let v = Version::parse("1.2.3.4.5.6.7");
        assert_eq!(v.build, Some(5));
        assert_eq!(v.tail, vec![6, 7]);
        assert_eq!(v.get(4), Some(5));
        assert_eq!(v.get(6), Some(7));
        assert_eq!(v.get(7), None);
    }

    #[test]
    fn index_past_fifth_resplits_raw_string() {
        // one bad component poisons the parsed fields but not the re-split
        let v = Version::parse("1.2.3.4.x.6");
        assert_eq!(v.major, None);
        assert_eq!(v.get(5), Some(6));
        assert_eq!(v.get(4), None);
    }

    #[test]
    fn components_are_trimmed() {
        let v: Version = " 2 . 0 ".parse().unwrap();
        assert_eq!(v.major, Some(2));
        assert_eq!(v.minor, Some(0));
    }
}
