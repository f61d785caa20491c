use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

// Two embedded YYYYMMDD dates, each followed by two characters we don't care
// about (usually hour digits, sometimes letters), then a sequence number.
regex!(FILENAME_REGEX, r"^(20\d{6})[[:alnum:]]{2}_(20\d{6})[[:alnum:]]{2}_\d+\.xml\.zip$");
regex!(COMPACT_DATE_REGEX, r"^(\d{4})(\d{2})(\d{2})$");
regex!(DOTTED_DATE_REGEX, r"^(\d{1,2})\.(\d{1,2})\.(\d{4})$");
regex!(ISO_DATE_REGEX, r"^(\d{4})-(\d{1,2})-(\d{1,2})$");
