use crate::error::{Error, ErrorKind};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// A set of case-insensitive substrings to look for.
///
/// Terms are trimmed, blanks are dropped, and duplicates (ignoring case) are
/// kept once. The original spelling and order are preserved for display.
///
/// # Examples
///
/// ```
/// use ziptrawl_archive::QueryTerms;
///
/// let terms: QueryTerms = " Foo , bar,,FOO ".parse().unwrap();
/// assert_eq!(terms.iter().collect::<Vec<_>>(), vec!["Foo", "bar"]);
/// assert!(terms.matches("<name>foobar</name>"));
/// assert!(!terms.matches("<name>baz</name>"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryTerms {
    terms: Vec<String>,
    /// Uppercased copies, compared against uppercased content.
    needles: Vec<String>,
}
impl QueryTerms {
    pub fn new<S: AsRef<str>>(terms: impl IntoIterator<Item = S>) -> Self {
        let mut query = Self::default();
        for term in terms {
            let term = term.as_ref().trim();
            if term.is_empty() {
                continue;
            }
            let needle = term.to_uppercase();
            if !query.needles.contains(&needle) {
                query.terms.push(term.to_string());
                query.needles.push(needle);
            }
        }
        query
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(String::as_str)
    }

    /// Whether `content` contains at least one term, ignoring case.
    pub fn matches(&self, content: &str) -> bool {
        if self.needles.is_empty() {
            return false;
        }
        let haystack = content.to_uppercase();
        self.needles.iter().any(|needle| haystack.contains(needle.as_str()))
    }
}

impl FromStr for QueryTerms {
    type Err = Error;

    /// Parses a comma-separated list. Fails if no term survives trimming.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let terms = Self::new(s.split(','));
        if terms.is_empty() {
            exn::bail!(ErrorKind::EmptyQuery);
        }
        Ok(terms)
    }
}

impl Display for QueryTerms {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.terms.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("foo", vec!["foo"])]
    #[case(" foo , bar ", vec!["foo", "bar"])]
    #[case("foo,,bar,", vec!["foo", "bar"])]
    #[case("Ромашка, ромашка, РОМАШКА", vec!["Ромашка"])]
    #[case("ООО Ромашка, ромашка", vec!["ООО Ромашка", "ромашка"])]
    fn test_parse(#[case] input: &str, #[case] expected: Vec<&str>) {
        let terms: QueryTerms = input.parse().unwrap();
        assert_eq!(terms.iter().collect::<Vec<_>>(), expected);
    }

    #[rstest]
    #[case("")]
    #[case(" , ,")]
    fn test_parse_rejects_blank(#[case] input: &str) {
        let err = input.parse::<QueryTerms>().unwrap_err();
        assert_eq!(*err, ErrorKind::EmptyQuery);
    }

    #[rstest]
    #[case(&["foo"], "<x>Foo</x>", true)]
    #[case(&["bar"], "<x>Foo</x>", false)]
    #[case(&["bar", "FOO"], "<x>foo</x>", true)]
    #[case(&["ромашка"], "<customer>ООО \"РОМАШКА\"</customer>", true)]
    #[case(&["inn>1655"], "<inn>1655000000</inn>", true)]
    fn test_matches(#[case] terms: &[&str], #[case] content: &str, #[case] expected: bool) {
        assert_eq!(QueryTerms::new(terms).matches(content), expected);
    }

    #[test]
    fn test_empty_set_matches_nothing() {
        assert!(!QueryTerms::default().matches("anything"));
    }
}
