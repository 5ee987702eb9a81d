//! Conversions between the time formats of the devices and [`time`] types plus other small helpers
//!
//! The devices represent a point in time either as a dictionary
//! `{"year", "mon", "day", "hour", "min", "sec"}` or as a compact `YYYYMMDDhhmmss` string
//! used in recording file names.
//!
use err_derive::Error;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{Date, Month, PrimitiveDateTime, Time};

/// Raised when a device time cannot be turned into a calendar time
#[derive(Debug, Error)]
pub enum TimeError {
    /// A component such as the month is out of range
    #[error(display = "Time component out of range")]
    OutOfRange(#[error(source)] time::error::ComponentRange),
    /// The compact form was not 14 digits
    #[error(display = "Invalid compact time: {}", _0)]
    InvalidCompact(String),
}

/// The time dictionary used in searches, recordings and the device clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReolinkTime {
    /// Full year e.g. 2023
    pub year: i32,
    /// Month 1..=12
    pub mon: u8,
    /// Day of the month 1..=31
    pub day: u8,
    /// Hour 0..=23
    pub hour: u8,
    /// Minute 0..=59
    pub min: u8,
    /// Second 0..=59
    pub sec: u8,
}

/// Turns the dictionary form into a calendar time
pub fn reolink_time_to_datetime(time: &ReolinkTime) -> Result<PrimitiveDateTime, TimeError> {
    let date = Date::from_calendar_date(time.year, Month::try_from(time.mon)?, time.day)?;
    let clock = Time::from_hms(time.hour, time.min, time.sec)?;
    Ok(PrimitiveDateTime::new(date, clock))
}

/// Turns a calendar time into the dictionary form
pub fn datetime_to_reolink_time(time: &PrimitiveDateTime) -> ReolinkTime {
    ReolinkTime {
        year: time.year(),
        mon: time.month() as u8,
        day: time.day(),
        hour: time.hour(),
        min: time.minute(),
        sec: time.second(),
    }
}

/// Parses the compact `YYYYMMDDhhmmss` form
pub fn compact_to_reolink_time(time: &str) -> Result<ReolinkTime, TimeError> {
    let invalid = || TimeError::InvalidCompact(time.to_string());
    if time.len() < 14 || !time.is_char_boundary(14) || !time[..14].bytes().all(|b| b.is_ascii_digit())
    {
        return Err(invalid());
    }
    let field = |range: std::ops::Range<usize>| time[range].parse::<u8>().map_err(|_| invalid());
    Ok(ReolinkTime {
        year: time[0..4].parse().map_err(|_| invalid())?,
        mon: field(4..6)?,
        day: field(6..8)?,
        hour: field(8..10)?,
        min: field(10..12)?,
        sec: field(12..14)?,
    })
}

/// Formats the dictionary form as `YYYYMMDDhhmmss`
pub fn reolink_time_to_compact(time: &ReolinkTime) -> String {
    format!(
        "{:04}{:02}{:02}{:02}{:02}{:02}",
        time.year, time.mon, time.day, time.hour, time.min, time.sec
    )
}

lazy_static! {
    static ref BRACKETS: Regex = Regex::new(r"\(.*?\)|（.*?）").expect("static regex");
}

/// Removes bracketed annotations and spaces from a model name
///
/// `"RLC-811A (4K) "` becomes `"RLC-811A"`
pub fn strip_model_str(model: &str) -> String {
    BRACKETS.replace_all(model, "").replace(' ', "")
}

/// Finds the channel a command body addresses
///
/// The channel is either a direct parameter or nested one level down e.g.
/// `{"param": {"Alarm": {"channel": 0}}}`
pub fn search_channel(body: &[Value]) -> Option<u8> {
    let param = body.first()?.get("param")?;
    let channel = match param.get("channel") {
        Some(channel) => channel,
        None => param.as_object()?.values().next()?.get("channel")?,
    };
    channel.as_u64().and_then(|ch| u8::try_from(ch).ok())
}

/// Percent encodes everything except unreserved characters and `/`
///
/// This is the encoding the devices expect for passwords in stream urls
pub fn quote(input: &str) -> String {
    input
        .split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn test_time_roundtrip() {
        let samples = [
            ReolinkTime { year: 2023, mon: 4, day: 17, hour: 1, min: 59, sec: 57 },
            ReolinkTime { year: 2000, mon: 1, day: 1, hour: 0, min: 0, sec: 0 },
            ReolinkTime { year: 2024, mon: 2, day: 29, hour: 23, min: 59, sec: 59 },
            ReolinkTime { year: 1999, mon: 12, day: 31, hour: 12, min: 30, sec: 5 },
        ];
        for sample in samples {
            let datetime = reolink_time_to_datetime(&sample).unwrap();
            assert_eq!(datetime_to_reolink_time(&datetime), sample);
        }
    }

    #[test]
    fn test_invalid_time() {
        let feb30 = ReolinkTime { year: 2023, mon: 2, day: 30, hour: 0, min: 0, sec: 0 };
        assert_matches!(reolink_time_to_datetime(&feb30), Err(TimeError::OutOfRange(_)));
    }

    #[test]
    fn test_compact() {
        let time = compact_to_reolink_time("20230417015957").unwrap();
        assert_eq!(
            time,
            ReolinkTime { year: 2023, mon: 4, day: 17, hour: 1, min: 59, sec: 57 }
        );
        assert_eq!(reolink_time_to_compact(&time), "20230417015957");
        assert_matches!(
            compact_to_reolink_time("2023-04-17"),
            Err(TimeError::InvalidCompact(_))
        );
    }

    #[test]
    fn test_time_dict_json() {
        let time: ReolinkTime = serde_json::from_value(
            json!({"year": 2023, "mon": 4, "day": 17, "hour": 2, "min": 43, "sec": 50}),
        )
        .unwrap();
        assert_eq!(time.min, 43);
    }

    #[test]
    fn test_strip_model_str() {
        assert_eq!(strip_model_str("RLC-811A (4K) "), "RLC-811A");
        assert_eq!(strip_model_str("E1 Zoom（新）"), "E1Zoom");
    }

    #[test]
    fn test_search_channel() {
        let direct = [json!({"cmd": "GetEnc", "action": 0, "param": {"channel": 2}})];
        assert_eq!(search_channel(&direct), Some(2));

        let nested = [json!({"cmd": "SetAlarm", "param": {"Alarm": {"channel": 1, "type": "md"}}})];
        assert_eq!(search_channel(&nested), Some(1));

        let none = [json!({"cmd": "GetDevInfo", "action": 0, "param": {}})];
        assert_eq!(search_channel(&none), None);
        assert_eq!(search_channel(&[]), None);
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote("pa ss/w@rd"), "pa%20ss/w%40rd");
        assert_eq!(quote("abc-_.~"), "abc-_.~");
        assert_eq!(quote("p&ss+w=?#"), "p%26ss%2Bw%3D%3F%23");
        assert_eq!(quote("ü/"), "%C3%BC/");
    }
}
