//! Search queries and their parsers.
//!
//! A query is gathered one field at a time (root, date range, terms); each
//! field has its own parser that either produces a value or a typed error
//! naming the field that was rejected.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::collections::BTreeMap;
use ziptrawl_archive::QueryTerms;
use ziptrawl_dates::DateRange;

/// Named shortcuts for frequently searched roots, keyed by alias.
pub type Roots = BTreeMap<String, String>;

/// Everything a single [`run`](crate::Pipeline::run) needs to know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    root: String,
    dates: Option<DateRange>,
    terms: QueryTerms,
}
impl Query {
    pub fn new(root: impl Into<String>, dates: Option<DateRange>, terms: QueryTerms) -> Self {
        Self {
            root: root.into(),
            dates,
            terms,
        }
    }

    /// Parses every field of a query from user input.
    ///
    /// # Examples
    ///
    /// ```
    /// use ziptrawl_pipeline::{Query, Roots};
    ///
    /// let roots = Roots::from([("contracts".to_string(), "/fcs_regions/Tatarstan_Resp/contracts/".to_string())]);
    /// let query = Query::parse("contracts", Some("01.01.2018 -"), ["inn, kpp"], &roots).unwrap();
    /// assert_eq!(query.root(), "/fcs_regions/Tatarstan_Resp/contracts/");
    /// assert_eq!(query.terms().len(), 2);
    /// ```
    pub fn parse<S: AsRef<str>>(
        root: &str,
        dates: Option<&str>,
        terms: impl IntoIterator<Item = S>,
        roots: &Roots,
    ) -> Result<Self> {
        let root = parse_root(root, roots)?;
        let dates = match dates {
            Some(dates) => parse_dates(dates)?,
            None => None,
        };
        Ok(Self::new(root, dates, parse_terms(terms)?))
    }

    /// Remote directory to search, exactly as the credential rules see it.
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn dates(&self) -> Option<&DateRange> {
        self.dates.as_ref()
    }

    pub fn terms(&self) -> &QueryTerms {
        &self.terms
    }
}

/// Resolves a root given either as an alias (case-insensitive) or as an
/// absolute remote path.
///
/// Paths are kept as written, trailing slash included, so credential rules
/// such as `^/out/` see what the user typed.
pub fn parse_root(input: &str, roots: &Roots) -> Result<String> {
    let input = input.trim();
    if let Some((_, path)) = roots.iter().find(|(alias, _)| alias.eq_ignore_ascii_case(input)) {
        return Ok(path.clone());
    }
    if input.starts_with('/') {
        return Ok(input.to_string());
    }
    exn::bail!(ErrorKind::InvalidRoot(input.to_string()))
}

/// Parses a `FROM - TO` date range. Blank input means "no date filter".
pub fn parse_dates(input: &str) -> Result<Option<DateRange>> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    let range = input.parse::<DateRange>().or_raise(|| ErrorKind::InvalidDates(input.to_string()))?;
    Ok(Some(range))
}

/// Collects terms from one or more comma-separated lists.
pub fn parse_terms<S: AsRef<str>>(inputs: impl IntoIterator<Item = S>) -> Result<QueryTerms> {
    let mut split = Vec::new();
    for input in inputs {
        split.extend(input.as_ref().split(',').map(str::to_string));
    }
    let terms = QueryTerms::new(split);
    if terms.is_empty() {
        exn::bail!(ErrorKind::InvalidTerms);
    }
    Ok(terms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn roots() -> Roots {
        Roots::from([
            ("pz".to_string(), "/fcs_regions/Tatarstan_Resp/purchaseplans/".to_string()),
            ("contracts".to_string(), "/fcs_regions/Tatarstan_Resp/contracts/".to_string()),
        ])
    }

    #[rstest]
    #[case("pz", "/fcs_regions/Tatarstan_Resp/purchaseplans/")]
    #[case(" PZ ", "/fcs_regions/Tatarstan_Resp/purchaseplans/")]
    #[case("Contracts", "/fcs_regions/Tatarstan_Resp/contracts/")]
    #[case("/out/nsi/", "/out/nsi/")]
    #[case("/", "/")]
    fn test_parse_root(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(parse_root(input, &roots()).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("plans")]
    #[case("out/nsi")]
    fn test_parse_root_rejects(#[case] input: &str) {
        let err = parse_root(input, &roots()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidRoot(_)));
    }

    #[test]
    fn test_parse_dates() {
        assert_eq!(parse_dates("  ").unwrap(), None);
        let range = parse_dates("01.06.2017 - 2018-01-01").unwrap().unwrap();
        assert_eq!(range, "2017-06-01 - 01.01.2018".parse::<DateRange>().unwrap());
        let err = parse_dates("June - July").unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidDates("June - July".to_string()));
    }

    #[test]
    fn test_parse_terms_splits_every_input() {
        let terms = parse_terms(["customer, 1655", "  ", "Customer,inn"]).unwrap();
        assert_eq!(terms.iter().collect::<Vec<_>>(), vec!["customer", "1655", "inn"]);
    }

    #[rstest]
    #[case(&[])]
    #[case(&[""])]
    #[case(&[" , ,", " "])]
    fn test_parse_terms_rejects_blank(#[case] inputs: &[&str]) {
        let err = parse_terms(inputs.iter()).unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidTerms);
    }

    #[test]
    fn test_query_parse_reports_failing_field() {
        let err = Query::parse("nowhere", None, ["foo"], &roots()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidRoot(_)));
        let err = Query::parse("pz", Some("31.02.2018 -"), ["foo"], &roots()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidDates(_)));
        let err = Query::parse("pz", None, [","], &roots()).unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidTerms);
        let query = Query::parse("pz", None, ["foo"], &roots()).unwrap();
        assert!(query.dates().is_none());
    }
}
