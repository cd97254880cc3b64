// src/token.rs
//
// Deterministic codec for the portal's QR payload:
//   FFFF MMDDYYYY HH SSSS
// where FFFF is the facility code, HH a 2-hour block start
// (00, 02, ..., 22) and SSSS the 4-digit suffix.

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};

use crate::config::consts::{BLOCK_HOURS, FACILITY_CODE, TOKEN_LEN};
use crate::errors::Error;

/// Suffix rule for the trailing 4 digits.
///
/// The rule was reverse-engineered from a small sample and is
/// provisional: early captures showed `0001` only for the midnight
/// block, later ones showed `0001` elsewhere too. Swap the policy
/// instead of editing the codec.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SuffixPolicy {
    /// `0001` for the 00:00-01:59 block, `0000` for all others.
    #[default]
    MidnightMarker,
    /// `0001` for every block.
    AlwaysMarker,
}

impl SuffixPolicy {
    pub fn suffix(self, block_hour: u32) -> &'static str {
        match self {
            SuffixPolicy::MidnightMarker => {
                if block_hour == 0 { "0001" } else { "0000" }
            }
            SuffixPolicy::AlwaysMarker => "0001",
        }
    }
}

/// A decoded (or freshly generated) access token. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub facility: String,
    pub date: NaiveDate,
    /// Start of the 2-hour window, even, 0..=22.
    pub block_hour: u32,
    pub suffix: String,
}

impl Token {
    /// Fixed 18-char wire form.
    pub fn render(&self) -> String {
        format!(
            "{}{:02}{:02}{:04}{:02}{}",
            self.facility,
            self.date.month(),
            self.date.day(),
            self.date.year(),
            self.block_hour,
            self.suffix
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenCodec {
    facility: String,
    policy: SuffixPolicy,
}

impl Default for TokenCodec {
    fn default() -> Self {
        Self { facility: s!(FACILITY_CODE), policy: SuffixPolicy::default() }
    }
}

impl TokenCodec {
    pub fn new(facility: impl Into<String>, policy: SuffixPolicy) -> Self {
        Self { facility: facility.into(), policy }
    }

    pub fn with_policy(policy: SuffixPolicy) -> Self {
        Self { policy, ..Self::default() }
    }

    pub fn facility(&self) -> &str {
        &self.facility
    }

    /// Token for the 2-hour window containing `hour`. Total for any
    /// valid calendar date and hour 0..=23.
    pub fn encode(&self, date: NaiveDate, hour: u32) -> Token {
        let block_hour = (hour / BLOCK_HOURS) * BLOCK_HOURS;
        Token {
            facility: self.facility.clone(),
            date,
            block_hour,
            suffix: s!(self.policy.suffix(block_hour)),
        }
    }

    pub fn decode(&self, raw: &str) -> Result<Token, Error> {
        if raw.len() != TOKEN_LEN || !raw.is_ascii() {
            return Err(Error::Format(format!(
                "expected {TOKEN_LEN} ASCII chars, got {}",
                raw.len()
            )));
        }
        let (facility, rest) = raw.split_at(4);
        if facility != self.facility {
            return Err(Error::Format(format!(
                "facility prefix {facility:?} (expected {:?})",
                self.facility
            )));
        }
        let (date_part, rest) = rest.split_at(8);
        let (hour_part, suffix) = rest.split_at(2);

        if !date_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::Field(format!("non-numeric date {date_part:?}")));
        }
        if !hour_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::Field(format!("non-numeric hour {hour_part:?}")));
        }

        let month: u32 = date_part[0..2].parse().map_err(|_| bad_date(date_part))?;
        let day: u32 = date_part[2..4].parse().map_err(|_| bad_date(date_part))?;
        let year: i32 = date_part[4..8].parse().map_err(|_| bad_date(date_part))?;
        let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| bad_date(date_part))?;

        let block_hour: u32 = hour_part.parse().map_err(|_| bad_hour(hour_part))?;
        if block_hour % BLOCK_HOURS != 0 || block_hour > 22 {
            return Err(bad_hour(hour_part));
        }

        if suffix != "0000" && suffix != "0001" {
            return Err(Error::Field(format!("unknown suffix {suffix:?}")));
        }

        Ok(Token {
            facility: s!(facility),
            date,
            block_hour,
            suffix: s!(suffix),
        })
    }
}

fn bad_date(part: &str) -> Error {
    Error::Field(format!("invalid date {part:?}"))
}

fn bad_hour(part: &str) -> Error {
    Error::Field(format!("invalid block hour {part:?}"))
}

/// Human label for the 2-hour window containing `hour`,
/// e.g. 19 → "18:00-19:59".
pub fn block_label(hour: u32) -> String {
    let start = (hour / BLOCK_HOURS) * BLOCK_HOURS;
    format!("{:02}:00-{:02}:59", start, start + 1)
}

/// Minutes until the next even-hour boundary, 1..=120.
/// Exactly on a boundary counts as a full fresh window.
pub fn minutes_until_rollover(now: NaiveTime) -> u32 {
    let into_block = (now.hour() % BLOCK_HOURS) * 60 + now.minute();
    BLOCK_HOURS * 60 - into_block
}
