use crate::consts::{COMPACT_DATE_REGEX, FILENAME_REGEX};
use crate::error::{ErrorKind, Result};
use crate::range::{DateRange, calendar_date};
use exn::OptionExt;
use time::Date;

/// The closed interval of days an archive bundle covers, taken from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileInterval {
    pub from: Date,
    pub to: Date,
}
impl FileInterval {
    /// Extracts the two embedded dates from a bundle filename.
    ///
    /// Returns `None` if the name doesn't follow the naming convention, or
    /// if either embedded date is not a real calendar date.
    ///
    /// # Examples
    ///
    /// ```
    /// use ziptrawl_dates::FileInterval;
    ///
    /// let interval = FileInterval::from_filename("2018010100_2018020100_5.xml.zip").unwrap();
    /// assert_eq!(interval.from.to_string(), "2018-01-01");
    /// assert_eq!(interval.to.to_string(), "2018-02-01");
    /// assert!(FileInterval::from_filename("readme.txt").is_none());
    /// ```
    pub fn from_filename(name: &str) -> Option<Self> {
        let captures = FILENAME_REGEX.captures(name)?;
        let from = compact_date(&captures[1]).ok()?;
        let to = compact_date(&captures[2]).ok()?;
        Some(Self { from, to })
    }
}

fn compact_date(digits: &str) -> Result<Date> {
    let captures = COMPACT_DATE_REGEX.captures(digits).ok_or_raise(|| ErrorKind::ParseError {
        field: "filename date",
        value: digits.to_string(),
    })?;
    calendar_date(&captures[1], &captures[2], &captures[3])
}

/// Whether a file's interval and a query range share at least one day.
///
/// Open query ends are unbounded. Touching endpoints count as overlapping.
pub fn overlaps(file: &FileInterval, query: &DateRange) -> bool {
    let (from, to) = query.bounds();
    file.from <= to && from <= file.to
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use time::macros::date;

    #[rstest]
    #[case("2018010100_2018020100_5.xml.zip", date!(2018 - 01 - 01), date!(2018 - 02 - 01))]
    #[case("20180101aa_20180201bb_5.xml.zip", date!(2018 - 01 - 01), date!(2018 - 02 - 01))]
    #[case("2017123123_2018010100_000123.xml.zip", date!(2017 - 12 - 31), date!(2018 - 01 - 01))]
    fn test_from_filename(#[case] name: &str, #[case] from: Date, #[case] to: Date) {
        assert_eq!(FileInterval::from_filename(name), Some(FileInterval { from, to }));
    }

    #[rstest]
    #[case("not_a_date_file.zip")]
    #[case("2018010100_2018020100_5.xml")]
    #[case("2018010100_2018020100_.xml.zip")]
    #[case("1918010100_2018020100_5.xml.zip")]
    #[case("contract_2018010100_2018020100_5.xml.zip")]
    #[case("2018010100_2018020100_5.xml.zip.part")]
    #[case("2018023000_2018030100_5.xml.zip")]
    #[case("20180101_20180201_5.xml.zip")]
    fn test_from_filename_rejects(#[case] name: &str) {
        assert_eq!(FileInterval::from_filename(name), None);
    }

    fn interval(from: Date, to: Date) -> FileInterval {
        FileInterval { from, to }
    }

    #[rstest]
    // Query strictly inside the file.
    #[case(date!(2018 - 01 - 15), Some(date!(2018 - 01 - 20)), true)]
    // Touching at either end.
    #[case(date!(2018 - 02 - 01), None, true)]
    #[case(date!(2017 - 01 - 01), Some(date!(2018 - 01 - 01)), true)]
    // Disjoint.
    #[case(date!(2018 - 02 - 02), None, false)]
    #[case(date!(2017 - 01 - 01), Some(date!(2017 - 12 - 31)), false)]
    fn test_overlaps(#[case] from: Date, #[case] to: Option<Date>, #[case] expected: bool) {
        let file = interval(date!(2018 - 01 - 01), date!(2018 - 02 - 01));
        let query = DateRange::new(Some(from), to).unwrap();
        assert_eq!(overlaps(&file, &query), expected);
    }

    #[test]
    fn test_fully_open_query_overlaps_everything() {
        let file = interval(date!(2018 - 01 - 01), date!(2018 - 01 - 01));
        assert!(overlaps(&file, &DateRange::open()));
    }
}
