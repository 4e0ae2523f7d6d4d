//! # Folio Codec
//!
//! Human-readable document identifiers.
//!
//! ## Wire Format
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  17 ASCII characters, fixed width, no separators                        │
//! │                                                                         │
//! │    0 1 │ 0 2 │ 1 9 1 0 2 0 2 6 │ V │ 0 0 0 7                           │
//! │    ─┬─   ─┬─   ───────┬───────  ┬   ───┬───                           │
//! │  branch register   DDMMYYYY    kind  sequence                          │
//! │                                                                         │
//! │  |←──────────── prefix (13) ───────────→|                              │
//! │                                                                         │
//! │  Kinds: V=sale  A=layaway  C=credit  P=payment (abono)  X=shift close  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Counting Policies
//! - **Daily** (V, A, C, P): counter per (branch, register, kind, day)
//! - **Global** (X): counter across every shift ever opened; date, branch
//!   and register are display fields only

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::validation::ValidationResult;

/// Total folio length.
pub const FOLIO_LEN: usize = 17;

/// Length of the branch/register/date/kind prefix.
pub const FOLIO_PREFIX_LEN: usize = 13;

/// Highest sequence the four-digit suffix can carry.
pub const MAX_SEQUENCE: u32 = 9999;

/// Highest branch or register number (two digits).
pub const MAX_STATION: u8 = 99;

// =============================================================================
// Folio Kind
// =============================================================================

/// How a kind's sequence counter is scoped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountingPolicy {
    /// Resets at local midnight, scoped to branch and register.
    Daily,
    /// Never resets, ignores branch, register and date.
    Global,
}

/// The document kind encoded in a folio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FolioKind {
    Sale,
    Layaway,
    Credit,
    /// Abono against a credit or a layaway. Both tables share this letter.
    Payment,
    Close,
}

impl FolioKind {
    /// All kinds, in wire-letter order.
    pub const ALL: [FolioKind; 5] = [
        FolioKind::Sale,
        FolioKind::Layaway,
        FolioKind::Credit,
        FolioKind::Payment,
        FolioKind::Close,
    ];

    /// The single wire letter for this kind.
    pub const fn letter(&self) -> char {
        match self {
            FolioKind::Sale => 'V',
            FolioKind::Layaway => 'A',
            FolioKind::Credit => 'C',
            FolioKind::Payment => 'P',
            FolioKind::Close => 'X',
        }
    }

    /// Decodes a wire letter.
    pub fn from_letter(letter: char) -> Option<Self> {
        FolioKind::ALL.into_iter().find(|k| k.letter() == letter)
    }

    pub const fn policy(&self) -> CountingPolicy {
        match self {
            FolioKind::Close => CountingPolicy::Global,
            _ => CountingPolicy::Daily,
        }
    }
}

impl fmt::Display for FolioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FolioKind::Sale => "sale",
            FolioKind::Layaway => "layaway",
            FolioKind::Credit => "credit",
            FolioKind::Payment => "payment",
            FolioKind::Close => "close",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Folio
// =============================================================================

/// A validated 17-character folio.
///
/// Construct with [`Folio::format`] when minting or [`str::parse`] when
/// reading one back. Both guarantee the wire format, so the accessors never
/// fail.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Folio {
    raw: String,
    parts: FolioParts,
}

/// The decoded segments of a folio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FolioParts {
    pub branch: u8,
    pub register: u8,
    pub date: NaiveDate,
    pub kind: FolioKind,
    pub sequence: u32,
}

impl Folio {
    /// Formats a new folio from its segments.
    ///
    /// ```rust
    /// use chrono::NaiveDate;
    /// use tally_core::folio::{Folio, FolioKind};
    ///
    /// let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
    /// let folio = Folio::format(1, 2, date, FolioKind::Sale, 7).unwrap();
    /// assert_eq!(folio.as_str(), "010219102026V0007");
    /// ```
    pub fn format(
        branch: u8,
        register: u8,
        date: NaiveDate,
        kind: FolioKind,
        sequence: u32,
    ) -> ValidationResult<Self> {
        if sequence > MAX_SEQUENCE {
            return Err(ValidationError::OutOfRange {
                field: "sequence".to_string(),
                min: 0,
                max: i64::from(MAX_SEQUENCE),
            });
        }
        let prefix = folio_prefix(branch, register, date, kind)?;
        Ok(Folio {
            raw: format!("{}{:04}", prefix, sequence),
            parts: FolioParts {
                branch,
                register,
                date,
                kind,
                sequence,
            },
        })
    }

    /// The decoded segments.
    pub fn parts(&self) -> FolioParts {
        self.parts
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The branch/register/date/kind prefix.
    pub fn prefix(&self) -> &str {
        &self.raw[..FOLIO_PREFIX_LEN]
    }

    pub fn sequence(&self) -> u32 {
        self.parts.sequence
    }

    pub fn kind(&self) -> FolioKind {
        self.parts.kind
    }

    pub fn into_string(self) -> String {
        self.raw
    }
}

impl fmt::Display for Folio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl AsRef<str> for Folio {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

impl FromStr for Folio {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.to_string().try_into()
    }
}

impl TryFrom<String> for Folio {
    type Error = ValidationError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        let parts = decode(&raw)?;
        Ok(Folio { raw, parts })
    }
}

impl From<Folio> for String {
    fn from(folio: Folio) -> Self {
        folio.raw
    }
}

/// Parses a folio into its segments.
///
/// ```rust
/// use tally_core::folio::{parse_folio, FolioKind};
///
/// let parts = parse_folio("010219102026P0012").unwrap();
/// assert_eq!(parts.branch, 1);
/// assert_eq!(parts.kind, FolioKind::Payment);
/// assert_eq!(parts.sequence, 12);
/// assert!(parse_folio("0102191020").is_err());
/// ```
pub fn parse_folio(s: &str) -> ValidationResult<FolioParts> {
    decode(s)
}

/// Builds the 13-character prefix shared by every folio of one counter.
pub fn folio_prefix(
    branch: u8,
    register: u8,
    date: NaiveDate,
    kind: FolioKind,
) -> ValidationResult<String> {
    check_station("branch", branch)?;
    check_station("register", register)?;
    if !(0..=9999).contains(&date.year()) {
        return Err(ValidationError::InvalidFormat {
            field: "date".to_string(),
            reason: format!("year {} does not fit in four digits", date.year()),
        });
    }
    Ok(format!(
        "{:02}{:02}{:02}{:02}{:04}{}",
        branch,
        register,
        date.day(),
        date.month(),
        date.year(),
        kind.letter()
    ))
}

/// Extracts the sequence suffix of a stored folio, if it is well formed.
pub fn sequence_suffix(folio: &str) -> Option<u32> {
    decode(folio).ok().map(|parts| parts.sequence)
}

fn check_station(field: &str, value: u8) -> ValidationResult<()> {
    if value > MAX_STATION {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::from(MAX_STATION),
        });
    }
    Ok(())
}

fn decode(s: &str) -> ValidationResult<FolioParts> {
    if s.len() != FOLIO_LEN || !s.is_ascii() {
        return Err(invalid(format!(
            "expected {} ASCII characters, got {}",
            FOLIO_LEN,
            s.chars().count()
        )));
    }

    let branch = digits(s, 0..2, "branch")?;
    let register = digits(s, 2..4, "register")?;
    let day = digits(s, 4..6, "day")?;
    let month = digits(s, 6..8, "month")?;
    let year = digits(s, 8..12, "year")?;
    let letter = s[12..13].chars().next().unwrap_or_default();
    let kind = FolioKind::from_letter(letter)
        .ok_or_else(|| invalid(format!("unknown kind letter '{}'", letter)))?;
    let sequence = digits(s, 13..17, "sequence")?;

    let date = NaiveDate::from_ymd_opt(year as i32, month, day)
        .ok_or_else(|| invalid(format!("{:02}/{:02}/{:04} is not a date", day, month, year)))?;

    Ok(FolioParts {
        branch: branch as u8,
        register: register as u8,
        date,
        kind,
        sequence,
    })
}

fn digits(s: &str, range: std::ops::Range<usize>, segment: &str) -> ValidationResult<u32> {
    let raw = &s[range];
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(format!("{} segment '{}' is not numeric", segment, raw)));
    }
    raw.parse::<u32>()
        .map_err(|e| invalid(format!("{} segment '{}': {}", segment, raw, e)))
}

fn invalid(reason: String) -> ValidationError {
    ValidationError::InvalidFormat {
        field: "folio".to_string(),
        reason,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
