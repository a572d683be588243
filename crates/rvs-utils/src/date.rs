//! Timestamps and author/committer identities.
//!
//! The serialized form is git's: `<epoch-seconds> <±HHMM>`. The offset is
//! stored internally in minutes so `+0530` and `-0500` survive round trips
//! with their signs intact.

use bstr::{BStr, BString, ByteSlice, ByteVec};
use chrono::{DateTime, FixedOffset, Local};

use crate::error::UtilError;
use crate::Result;

/// A commit timestamp: seconds since the epoch plus a zone offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RvsDate {
    /// Seconds since the Unix epoch.
    pub seconds: i64,
    /// Zone offset in minutes east of UTC (e.g. -300 for -0500).
    pub offset_minutes: i32,
}

/// `±HHMM` decimal form → minutes (e.g. -500 → -300).
fn hhmm_to_minutes(hhmm: i32) -> i32 {
    let sign = if hhmm < 0 { -1 } else { 1 };
    let abs = hhmm.abs();
    sign * ((abs / 100) * 60 + abs % 100)
}

/// Minutes → `±HHMM` decimal form (e.g. 330 → 530).
fn minutes_to_hhmm(minutes: i32) -> i32 {
    let sign = if minutes < 0 { -1 } else { 1 };
    let abs = minutes.abs();
    sign * ((abs / 60) * 100 + abs % 60)
}

impl RvsDate {
    pub fn new(seconds: i64, offset_minutes: i32) -> Self {
        Self {
            seconds,
            offset_minutes,
        }
    }

    /// The current time in the local zone.
    pub fn now() -> Self {
        let now = Local::now();
        Self {
            seconds: now.timestamp(),
            offset_minutes: now.offset().local_minus_utc() / 60,
        }
    }

    /// Parse `"<epoch> <±HHMM>"`; a missing offset means UTC.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let mut parts = input.splitn(2, ' ');
        let epoch = parts.next().unwrap_or("");
        let seconds: i64 = epoch
            .parse()
            .map_err(|_| UtilError::DateParse(format!("bad epoch '{epoch}'")))?;
        let offset_minutes = match parts.next() {
            Some(zone) => {
                let zone = zone.trim();
                let hhmm: i32 = zone
                    .parse()
                    .map_err(|_| UtilError::DateParse(format!("bad zone '{zone}'")))?;
                hhmm_to_minutes(hhmm)
            }
            None => 0,
        };
        Ok(Self {
            seconds,
            offset_minutes,
        })
    }

    /// Serialize as `"<epoch> <±HHMM>"`.
    pub fn to_raw(&self) -> String {
        format!("{} {:+05}", self.seconds, minutes_to_hhmm(self.offset_minutes))
    }

    /// Render in git's default log format, in the stored zone:
    /// `Thu Feb 13 23:31:30 2009 +0000`.
    pub fn to_default(&self) -> String {
        let offset = FixedOffset::east_opt(self.offset_minutes * 60)
            .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap());
        let dt = DateTime::from_timestamp(self.seconds, 0)
            .unwrap_or(DateTime::UNIX_EPOCH)
            .with_timezone(&offset);
        dt.format("%a %b %e %H:%M:%S %Y %z").to_string()
    }
}

/// An identity with a timestamp, as it appears in commit headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: BString,
    pub email: BString,
    pub when: RvsDate,
}

impl Signature {
    pub fn new(name: impl Into<BString>, email: impl Into<BString>, when: RvsDate) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            when,
        }
    }

    /// Parse `Name <email> epoch ±HHMM`.
    pub fn parse(input: &BStr) -> Result<Self> {
        let bytes = input.as_bytes();
        let gt = bytes
            .iter()
            .rposition(|&b| b == b'>')
            .ok_or_else(|| UtilError::DateParse("missing '>' in signature".into()))?;
        let lt = bytes[..gt]
            .iter()
            .rposition(|&b| b == b'<')
            .ok_or_else(|| UtilError::DateParse("missing '<' in signature".into()))?;

        let name = bytes[..lt].trim();
        let email = &bytes[lt + 1..gt];
        let date = std::str::from_utf8(bytes[gt + 1..].trim())
            .map_err(|_| UtilError::DateParse("non-UTF-8 date in signature".into()))?;

        Ok(Self {
            name: BString::from(name),
            email: BString::from(email),
            when: RvsDate::parse(date)?,
        })
    }

    /// Serialize as `Name <email> epoch ±HHMM`.
    pub fn to_bytes(&self) -> BString {
        let mut out = BString::new(Vec::new());
        out.push_str(&self.name);
        out.push_str(b" <");
        out.push_str(&self.email);
        out.push_str(b"> ");
        out.push_str(self.when.to_raw().as_bytes());
        out
    }
}
