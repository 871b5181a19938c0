//! Reporting period identifiers.
//!
//! A period is either an ISO week (`YYYY-WW`, 1..=53) or a calendar month
//! (`YYYY-MM`, 1..=12). Tokens are validated and canonicalized before any
//! network call is made, and every period knows the canonical file name of
//! its filing artifact.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Earliest year the authority accepts in a schedule token.
pub const MIN_YEAR: u16 = 2000;
/// Latest year the authority accepts in a schedule token.
pub const MAX_YEAR: u16 = 2100;

/// The two filing cadences the authority supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PeriodKind {
    Week,
    Month,
}

impl PeriodKind {
    /// The `TIPOENTREGA` value the authority expects on the wire.
    #[must_use]
    pub const fn delivery_type(self) -> &'static str {
        match self {
            Self::Week => "SEMANAL",
            Self::Month => "MENSUAL",
        }
    }

    /// Subdirectory of the processed area for this cadence.
    #[must_use]
    pub const fn processed_dir(self) -> &'static str {
        match self {
            Self::Week => "weekly",
            Self::Month => "monthly",
        }
    }

    #[must_use]
    pub const fn max_ordinal(self) -> u8 {
        match self {
            Self::Week => 53,
            Self::Month => 12,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Week => "week",
            Self::Month => "month",
        }
    }
}

impl fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PeriodKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "week" | "weekly" => Ok(Self::Week),
            "month" | "monthly" => Ok(Self::Month),
            other => Err(format!("unknown flow kind '{other}'")),
        }
    }
}

/// A validated reporting interval.
///
/// Construction goes through [`Period::parse`] or [`Period::new`], so a value
/// of this type always carries an ordinal in range for its kind and a year in
/// `MIN_YEAR..=MAX_YEAR`. `Display` renders the canonical zero-padded token,
/// which round-trips through `parse`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Period {
    year: u16,
    ordinal: u8,
    kind: PeriodKind,
}

/// A period token that does not match `YYYY-WW` / `YYYY-MM` or whose values
/// are out of range for the requested kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} period '{token}': {reason}")]
pub struct InvalidPeriodFormat {
    pub token: String,
    pub kind: PeriodKind,
    pub reason: String,
}

impl InvalidPeriodFormat {
    fn new(token: &str, kind: PeriodKind, reason: impl Into<String>) -> Self {
        Self {
            token: token.to_string(),
            kind,
            reason: reason.into(),
        }
    }
}

impl Period {
    pub fn new(kind: PeriodKind, year: u16, ordinal: u8) -> Result<Self, InvalidPeriodFormat> {
        let token = format!("{year:04}-{ordinal:02}");
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(InvalidPeriodFormat::new(
                &token,
                kind,
                format!("year must be between {MIN_YEAR} and {MAX_YEAR}"),
            ));
        }
        if ordinal < 1 || ordinal > kind.max_ordinal() {
            return Err(InvalidPeriodFormat::new(
                &token,
                kind,
                format!("{} must be between 1 and {}", kind.label(), kind.max_ordinal()),
            ));
        }
        Ok(Self { year, ordinal, kind })
    }

    /// Parse a `YYYY-WW` or `YYYY-MM` token for the given cadence.
    pub fn parse(token: &str, kind: PeriodKind) -> Result<Self, InvalidPeriodFormat> {
        let token = token.trim();
        let Some((year_part, ordinal_part)) = token.split_once('-') else {
            return Err(InvalidPeriodFormat::new(
                token,
                kind,
                "expected the form YYYY-NN",
            ));
        };

        if year_part.len() != 4
            || ordinal_part.len() != 2
            || !year_part.bytes().all(|b| b.is_ascii_digit())
            || !ordinal_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(InvalidPeriodFormat::new(
                token,
                kind,
                "expected four year digits and two period digits",
            ));
        }

        let year: u16 = year_part
            .parse()
            .map_err(|_| InvalidPeriodFormat::new(token, kind, "year is not a number"))?;
        let ordinal: u8 = ordinal_part
            .parse()
            .map_err(|_| InvalidPeriodFormat::new(token, kind, "period is not a number"))?;

        Self::new(kind, year, ordinal)
    }

    #[must_use]
    pub const fn kind(&self) -> PeriodKind {
        self.kind
    }

    #[must_use]
    pub const fn year(&self) -> u16 {
        self.year
    }

    #[must_use]
    pub const fn ordinal(&self) -> u8 {
        self.ordinal
    }

    /// Canonical file name of this period's filing artifact.
    ///
    /// Weekly artifacts are named after the week number alone
    /// (`Semana15.json`), monthly ones after the full token
    /// (`Mes-2025-05.json`), matching what the extraction step emits.
    #[must_use]
    pub fn artifact_file_name(&self) -> String {
        match self.kind {
            PeriodKind::Week => format!("Semana{:02}.json", self.ordinal),
            PeriodKind::Month => format!("Mes-{self}.json"),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.ordinal)
    }
}

#[cfg(test)]
mod tests {
    use super::{InvalidPeriodFormat, Period, PeriodKind};

    #[test]
    fn parse_round_trips_all_valid_weeks() {
        for week in 1..=53u8 {
            let token = format!("2025-{week:02}");
            let period = Period::parse(&token, PeriodKind::Week).expect("valid week");
            assert_eq!(period.to_string(), token);
        }
    }

    #[test]
    fn parse_round_trips_all_valid_months() {
        for month in 1..=12u8 {
            let token = format!("2024-{month:02}");
            let period = Period::parse(&token, PeriodKind::Month).expect("valid month");
            assert_eq!(period.to_string(), token);
        }
    }

    #[test]
    fn week_ordinal_out_of_range_is_rejected() {
        let err = Period::parse("2025-54", PeriodKind::Week).unwrap_err();
        assert!(matches!(err, InvalidPeriodFormat { .. }));
        assert!(err.reason.contains("between 1 and 53"));
    }

    #[test]
    fn month_ordinal_out_of_range_is_rejected() {
        let err = Period::parse("2025-13", PeriodKind::Month).unwrap_err();
        assert!(err.reason.contains("between 1 and 12"));
    }

    #[test]
    fn zero_ordinal_is_rejected() {
        assert!(Period::parse("2025-00", PeriodKind::Week).is_err());
        assert!(Period::parse("2025-00", PeriodKind::Month).is_err());
    }

    #[test]
    fn year_out_of_range_is_rejected() {
        assert!(Period::parse("1999-10", PeriodKind::Week).is_err());
        assert!(Period::parse("2101-10", PeriodKind::Month).is_err());
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        for token in ["2025", "2025-5", "25-05", "2025-ab", "2025-05-01", ""] {
            assert!(
                Period::parse(token, PeriodKind::Week).is_err(),
                "token {token:?} should not parse"
            );
        }
    }

    #[test]
    fn weekly_artifact_name_matches_extractor_output() {
        let period = Period::parse("2025-15", PeriodKind::Week).unwrap();
        assert_eq!(period.artifact_file_name(), "Semana15.json");

        let early = Period::parse("2025-05", PeriodKind::Week).unwrap();
        assert_eq!(early.artifact_file_name(), "Semana05.json");
    }

    #[test]
    fn monthly_artifact_name_includes_year() {
        let period = Period::parse("2025-05", PeriodKind::Month).unwrap();
        assert_eq!(period.artifact_file_name(), "Mes-2025-05.json");
    }
}
