use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use std::fmt;

/// Timezone in which calendar days are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayZone {
    /// The system timezone, DST rules included
    Local,
    Fixed(FixedOffset),
}

impl DayZone {
    pub fn today(&self) -> NaiveDate {
        match self {
            DayZone::Local => Local::now().date_naive(),
            DayZone::Fixed(offset) => Utc::now().with_timezone(offset).date_naive(),
        }
    }

    /// First instant of `date` in this zone, as UTC.
    fn midnight(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
        match self {
            DayZone::Local => local_midnight(&Local, date),
            DayZone::Fixed(offset) => local_midnight(offset, date),
        }
    }
}

impl From<FixedOffset> for DayZone {
    fn from(offset: FixedOffset) -> Self {
        DayZone::Fixed(offset)
    }
}

fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Option<DateTime<Utc>> {
    let midnight = date.and_time(NaiveTime::MIN);
    // Zones that skip midnight for DST start the day at the end of the gap
    tz.from_local_datetime(&midnight)
        .earliest()
        .or_else(|| {
            tz.from_local_datetime(&midnight.checked_add_signed(Duration::hours(1))?)
                .earliest()
        })
        .map(|dt| dt.with_timezone(&Utc))
}

/// Half-open UTC interval covering one local calendar day:
/// `[local midnight of date, local midnight of the next date)`.
///
/// The offset is resolved for each date, so days around a DST change are
/// 23 or 25 hours long.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayWindow {
    pub date: NaiveDate,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DayWindow {
    /// `None` when `date` sits at the edge of the representable range.
    pub fn for_date(date: NaiveDate, zone: impl Into<DayZone>) -> Option<Self> {
        let zone = zone.into();
        let next = date.succ_opt()?;
        let from = zone.midnight(date)?;
        let to = zone.midnight(next)?;
        Some(Self { date, from, to })
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.from <= instant && instant < self.to
    }
}

impl fmt::Display for DayWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}, {})",
            self.date,
            self.from.to_rfc3339(),
            self.to.to_rfc3339()
        )
    }
}
