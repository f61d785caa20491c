use crate::interval::{FileInterval, overlaps};
use crate::range::DateRange;

/// Decides whether a file is worth fetching for a query.
///
/// With no date range every file passes. With a range, even a fully open
/// one, only files whose names carry a valid interval overlapping the range
/// pass.
///
/// # Examples
///
/// ```
/// use ziptrawl_dates::{DateRange, matches};
///
/// let range: DateRange = "15.01.2018 - 20.01.2018".parse().unwrap();
/// assert!(matches("20180101aa_20180201bb_5.xml.zip", Some(&range)));
/// assert!(!matches("not_a_date_file.zip", Some(&range)));
/// assert!(matches("not_a_date_file.zip", None));
/// ```
pub fn matches(filename: &str, range: Option<&DateRange>) -> bool {
    let Some(range) = range else {
        return true;
    };
    match FileInterval::from_filename(filename) {
        Some(interval) => overlaps(&interval, range),
        None => {
            tracing::trace!(filename, "Filename carries no date interval");
            false
        },
    }
}

/// A query's date range, bound once and applied to every listed file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRangeFilter {
    range: Option<DateRange>,
}
impl DateRangeFilter {
    pub fn new(range: Option<DateRange>) -> Self {
        Self { range }
    }

    pub fn matches(&self, filename: &str) -> bool {
        matches(filename, self.range.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("20180101aa_20180201bb_5.xml.zip", Some("15.01.2018 - 20.01.2018"), true)]
    #[case("20180101aa_20180110bb_5.xml.zip", Some("10.01.2018 -"), true)]
    #[case("20180101aa_20180110bb_5.xml.zip", Some("11.01.2018 -"), false)]
    #[case("not_a_date_file.zip", Some("01.01.2018 -"), false)]
    #[case("not_a_date_file.zip", Some("-"), false)]
    #[case("not_a_date_file.zip", None, true)]
    #[case("2018023000_2018030100_5.xml.zip", Some("-"), false)]
    #[case("2018023000_2018030100_5.xml.zip", None, true)]
    fn test_matches(#[case] filename: &str, #[case] range: Option<&str>, #[case] expected: bool) {
        let range: Option<DateRange> = range.map(|r| r.parse().unwrap());
        assert_eq!(matches(filename, range.as_ref()), expected);
        assert_eq!(DateRangeFilter::new(range).matches(filename), expected);
    }
}
