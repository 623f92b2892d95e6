use anyhow::{Result, anyhow};
use chrono::{DateTime, FixedOffset, Offset, Utc};
use chrono_tz::Tz;

/// Zone the archive displays timestamps in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DisplayZone {
    Fixed(FixedOffset),
    Named(Tz),
}

impl DisplayZone {
    pub fn utc() -> Self {
        Self::Fixed(Utc.fix())
    }

    /// Parses `+HH:MM`, `-HH:MM`, `+HH` or `Z`.
    pub fn fixed(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
            return Ok(Self::utc());
        }

        let (sign, rest) = match trimmed.as_bytes().first() {
            Some(b'+') => (1, &trimmed[1..]),
            Some(b'-') => (-1, &trimmed[1..]),
            _ => return Err(anyhow!("invalid utc offset `{trimmed}`: expected +HH:MM")),
        };
        let (hours, minutes) = match rest.split_once(':') {
            Some((h, m)) => (h, m),
            None => (rest, "0"),
        };
        let hours = unsigned_part(hours).ok_or_else(|| anyhow!("invalid utc offset `{trimmed}`: bad hours"))?;
        let minutes =
            unsigned_part(minutes).ok_or_else(|| anyhow!("invalid utc offset `{trimmed}`: bad minutes"))?;
        if hours > 14 || minutes >= 60 {
            return Err(anyhow!("invalid utc offset `{trimmed}`: out of range"));
        }

        FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60) as i32)
            .map(Self::Fixed)
            .ok_or_else(|| anyhow!("invalid utc offset `{trimmed}`"))
    }

    pub fn named(name: &str) -> Result<Self> {
        name.trim()
            .parse::<Tz>()
            .map(Self::Named)
            .map_err(|_| anyhow!("unknown timezone `{}`", name.trim()))
    }

    pub fn localize(&self, ts: DateTime<Utc>) -> DateTime<FixedOffset> {
        match self {
            Self::Fixed(offset) => ts.with_timezone(offset),
            Self::Named(tz) => ts.with_timezone(tz).fixed_offset(),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::Fixed(offset) => format!("UTC{offset}"),
            Self::Named(tz) => tz.name().to_string(),
        }
    }
}

/// One or two ASCII digits; signs and whitespace are refused.
fn unsigned_part(raw: &str) -> Option<u32> {
    if raw.is_empty() || raw.len() > 2 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Export-style timestamp strings for one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayTime {
    pub timestamp: String,
    pub time: String,
}

pub fn display_time(zone: &DisplayZone, ts: DateTime<Utc>) -> DisplayTime {
    let local = zone.localize(ts);
    DisplayTime {
        timestamp: format!(
            "{} UTC{}",
            local.format("%d.%m.%Y %H:%M:%S"),
            local.format("%:z")
        ),
        time: local.format("%H:%M").to_string(),
    }
}
