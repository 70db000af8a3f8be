//! Time related utils.

use crate::Error;
use chrono::SecondsFormat;
use chrono::SubsecRound;
use chrono::Utc;

/// DateTime is the alias for chrono::DateTime<Utc>.
pub type DateTime = chrono::DateTime<Utc>;

/// Create datetime of now.
pub fn now() -> DateTime {
    Utc::now()
}

/// Format time into RFC 3339 with second precision: `2022-03-13T07:20:04Z`
///
/// This is the format carried by `st` and `se` in a SAS token.
pub fn format_rfc3339(t: DateTime) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Drop the sub-second part of a time.
///
/// Tokens and stored policies carry whole seconds only.
pub fn truncate_subsecs(t: DateTime) -> DateTime {
    t.trunc_subsecs(0)
}

/// Parse time from RFC 3339: `2022-03-13T07:20:04Z`
pub fn parse_rfc3339(s: &str) -> crate::Result<DateTime> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            Error::unexpected(format!("parse '{s}' into rfc3339 failed")).with_source(e)
        })
}
