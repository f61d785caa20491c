use crate::consts::{DOTTED_DATE_REGEX, ISO_DATE_REGEX};
use crate::error::{Error, ErrorKind, Result};
use exn::ResultExt;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use time::{Date, Month};

/// A query-side date range, either end of which may be open.
///
/// # Examples
///
/// ```
/// use ziptrawl_dates::DateRange;
///
/// let range: DateRange = "01.01.2018 - 2018-02-01".parse().unwrap();
/// assert!(range.from().is_some() && range.to().is_some());
///
/// let open: DateRange = "15.01.2018 -".parse().unwrap();
/// assert!(open.to().is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DateRange {
    from: Option<Date>,
    to: Option<Date>,
}
impl DateRange {
    /// Fails with [`ReversedRange`](ErrorKind::ReversedRange) if both ends are
    /// given and `to` comes before `from`.
    pub fn new(from: Option<Date>, to: Option<Date>) -> Result<Self> {
        if let (Some(from), Some(to)) = (from, to)
            && to < from
        {
            exn::bail!(ErrorKind::ReversedRange {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        Ok(Self { from, to })
    }

    /// A range open on both ends.
    pub fn open() -> Self {
        Self::default()
    }

    pub fn from(&self) -> Option<Date> {
        self.from
    }

    pub fn to(&self) -> Option<Date> {
        self.to
    }

    /// Both ends, with open ends widened to the earliest and latest
    /// representable dates.
    pub fn bounds(&self) -> (Date, Date) {
        (self.from.unwrap_or(Date::MIN), self.to.unwrap_or(Date::MAX))
    }
}

impl FromStr for DateRange {
    type Err = Error;

    /// Parses `FROM - TO`, where either side may be left empty.
    ///
    /// Dates are `DD.MM.YYYY` or `YYYY-MM-DD`. Since ISO dates contain the
    /// separator themselves, every `-` is tried in turn and the first split
    /// where both sides are empty or valid dates wins.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let input = s.trim();
        for (idx, _) in input.match_indices('-') {
            let (left, right) = (input[..idx].trim(), input[idx + 1..].trim());
            let (Ok(from), Ok(to)) = (parse_side(left), parse_side(right)) else {
                continue;
            };
            return Self::new(from, to);
        }
        exn::bail!(ErrorKind::ParseError {
            field: "date range",
            value: s.to_string(),
        })
    }
}

impl Display for DateRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match (self.from, self.to) {
            (Some(from), Some(to)) => write!(f, "{from} - {to}"),
            (Some(from), None) => write!(f, "{from} -"),
            (None, Some(to)) => write!(f, "- {to}"),
            (None, None) => write!(f, "-"),
        }
    }
}

fn parse_side(side: &str) -> Result<Option<Date>> {
    match side {
        "" => Ok(None),
        date => parse_date(date).map(Some),
    }
}

/// Parses a single user-supplied date, `DD.MM.YYYY` or `YYYY-MM-DD`.
pub fn parse_date(input: &str) -> Result<Date> {
    let input = input.trim();
    if let Some(captures) = DOTTED_DATE_REGEX.captures(input) {
        return calendar_date(&captures[3], &captures[2], &captures[1]);
    }
    if let Some(captures) = ISO_DATE_REGEX.captures(input) {
        return calendar_date(&captures[1], &captures[2], &captures[3]);
    }
    exn::bail!(ErrorKind::ParseError {
        field: "date",
        value: input.to_string(),
    })
}

/// Builds a date from its textual components, rejecting impossible dates
/// such as the 30th of February.
pub(crate) fn calendar_date(year: &str, month: &str, day: &str) -> Result<Date> {
    let invalid = || ErrorKind::ParseError {
        field: "date",
        value: format!("{year}-{month}-{day}"),
    };
    let year: i32 = year.parse::<i32>().or_raise(invalid)?;
    let month: u8 = month.parse::<u8>().or_raise(invalid)?;
    let day: u8 = day.parse::<u8>().or_raise(invalid)?;
    let month = Month::try_from(month).or_raise(invalid)?;
    Date::from_calendar_date(year, month, day).or_raise(invalid)
}
