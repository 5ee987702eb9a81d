//! Parsing and ordering of firmware versions such as `v3.1.0.989_22051908`
//!
use err_derive::Error;
use lazy_static::lazy_static;
use regex::Regex;
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use time::{Date, Month, PrimitiveDateTime, Time};

/// Raised for a version string that does not follow `vMAJOR.MIDDLE.MINOR.BUILD_DATE`
#[derive(Debug, Error)]
#[error(display = "Version string has invalid version format: {}", _0)]
pub struct VersionError(pub String);

lazy_static! {
    static ref VERSION_RE: Regex =
        Regex::new(r"^v(?P<major>[0-9]+)\.(?P<middle>[0-9]+)\.(?P<minor>[0-9]+).(?P<build>[0-9]+)_(?P<date>[0-9]+)")
            .unwrap();
}

/// A parsed firmware version
///
/// Versions are ordered by major, middle, minor and build number with the build date as
/// the final tie break, which orders beta releases of the same build.
#[derive(Debug, Clone)]
pub struct SoftwareVersion {
    version_string: String,
    /// True if the device reported no or an `unknown` version
    pub is_unknown: bool,
    /// First number
    pub major: u32,
    /// Second number
    pub middle: u32,
    /// Third number
    pub minor: u32,
    /// Build number
    pub build: u32,
    /// Build date, `2000-01-01 00:00` if it could not be read
    pub date: PrimitiveDateTime,
}

fn epoch() -> PrimitiveDateTime {
    PrimitiveDateTime::new(
        Date::from_calendar_date(2000, Month::January, 1).unwrap_or(Date::MIN),
        Time::MIDNIGHT,
    )
}

// The date part is `yymmdd` followed by two more digits that are read as minutes
fn parse_date(date: &str) -> Option<PrimitiveDateTime> {
    if date.len() < 8 {
        return None;
    }
    let num = |range: std::ops::Range<usize>| date.get(range)?.parse::<u8>().ok();
    let year = 2000 + num(0..2)? as i32;
    let month = Month::try_from(num(2..4)?).ok()?;
    let day = Date::from_calendar_date(year, month, num(4..6)?).ok()?;
    let clock = Time::from_hms(0, num(6..8)?, 0).ok()?;
    Some(PrimitiveDateTime::new(day, clock))
}

impl SoftwareVersion {
    /// A version for devices that did not report one
    pub fn unknown() -> Self {
        Self {
            version_string: "unknown".to_string(),
            is_unknown: true,
            major: 0,
            middle: 0,
            minor: 0,
            build: 0,
            date: epoch(),
        }
    }

    /// Parses a version string, `None` and `"unknown"` give [`SoftwareVersion::unknown`]
    pub fn parse(version: Option<&str>) -> Result<Self, VersionError> {
        let version_string = match version {
            None => return Ok(Self::unknown()),
            Some(v) => v.to_lowercase(),
        };
        if version_string == "unknown" {
            return Ok(Self::unknown());
        }

        let captures = VERSION_RE
            .captures(&version_string)
            .ok_or_else(|| VersionError(version_string.clone()))?;
        let number = |name: &str| -> Result<u32, VersionError> {
            captures
                .name(name)
                .and_then(|m| m.as_str().parse().ok())
                .ok_or_else(|| VersionError(version_string.clone()))
        };

        Ok(Self {
            major: number("major")?,
            middle: number("middle")?,
            minor: number("minor")?,
            build: number("build")?,
            date: captures
                .name("date")
                .and_then(|m| parse_date(m.as_str()))
                .unwrap_or_else(epoch),
            is_unknown: false,
            version_string,
        })
    }

    /// The version as reported, lower cased
    pub fn as_str(&self) -> &str {
        &self.version_string
    }

    fn key(&self) -> (u32, u32, u32, u32, PrimitiveDateTime) {
        (self.major, self.middle, self.minor, self.build, self.date)
    }
}

impl PartialEq for SoftwareVersion {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for SoftwareVersion {}

impl PartialOrd for SoftwareVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SoftwareVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl Display for SoftwareVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.version_string)
    }
}

const MINIMUM_FIRMWARE: &[(&str, &str, &str)] = &[
    ("RLN8-410", "N3MB01", "v3.2.0.218_23020151"),
    ("RLN8-410", "H3MB02", "v2.0.0.4732_1728_21062800"),
    ("RLN8-410", "H3MB16", "v2.0.0.280_21060101"),
    ("RLN8-410", "N2MB02", "v3.2.0.218_23020153"),
    ("RLN8-410", "H3MB18", "v3.2.0.218_23020153"),
    ("RLN8-410", "N7MB01", "v3.2.0.218_23011221"),
    ("RLN16-410", "H3MB02", "v2.0.0.4732_1728_21062800"),
    ("RLN16-410", "H3MB18", "v3.2.0.218_23020154"),
    ("RLN16-410", "N6MB01", "v3.2.0.218_23011215"),
    ("RLN36", "N5MB01", "v3.2.0.218_23011219"),
    ("E1 Zoom", "IPC_566SD65MP", "v3.1.0.1349_22092302"),
    ("E1 Zoom", "IPC_515BSD6", "v3.0.0.1107_22070508"),
    ("E1 Zoom", "IPC_515SD6", "v3.0.0.1107_22070508"),
    ("RLC-410W", "IPC_30K128M4MP", "v3.1.0.739_22042505"),
    ("RLC-410W", "IPC_51516M5M", "v3.0.0.136_20121102"),
    ("RLC-410W", "IPC_515B16M5M", "v3.0.0.136_20121102"),
    ("RLC-420", "IPC_51316M", "v3.0.0.136_20121101"),
    ("RLC-420", "IPC_51516M5M", "v3.0.0.136_20121101"),
    ("RLC-420", "IPC_515B16M5M", "v3.0.0.136_20121101"),
    ("RLC-511", "IPC_51516M5M", "v3.0.0.142_20121803"),
    ("RLC-511W", "IPC_51516M5M", "v3.0.0.142_20121804"),
    ("RLC-511WA", "IPC_523128M5MP", "v3.1.0.956_22041509"),
    ("RLC-520", "IPC_51516M5M", "v3.0.0.136_20121112"),
    ("RLC-520", "IPC_515B16M5M", "v3.0.0.136_20121112"),
    ("RLC-520A", "IPC_523128M5MP", "v3.1.0.951_22041566"),
    ("RLC-522", "IPC_51516M5M", "v3.0.0.136_20121111"),
    ("RLC-810A", "IPC_523128M8MP", "v3.1.0.956_22041503"),
    ("RLC-811A", "IPC_523128M8MP", "v3.1.0.989_22051908"),
    ("RLC-820A", "IPC_523128M8MP", "v3.1.0.956_22041501"),
    ("RLC-823A", "IPC_523128M8MP", "v3.1.0.989_22051911_v1.0.0.30"),
];

/// The oldest firmware known to work for a model and hardware revision
pub fn minimum_firmware(model: &str, hardware_version: &str) -> Option<SoftwareVersion> {
    MINIMUM_FIRMWARE
        .iter()
        .find(|(m, hw, _)| *m == model && *hw == hardware_version)
        .and_then(|(_, _, version)| SoftwareVersion::parse(Some(version)).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn v(s: &str) -> SoftwareVersion {
        SoftwareVersion::parse(Some(s)).unwrap()
    }

    #[test]
    fn test_parse() {
        let version = v("v3.1.0.989_22051908");
        assert_eq!(
            (version.major, version.middle, version.minor, version.build),
            (3, 1, 0, 989)
        );
        assert_eq!(version.date.year(), 2022);
        assert_eq!(version.date.month(), Month::May);
        assert_eq!(version.date.day(), 19);
        assert!(!version.is_unknown);
    }

    #[test]
    fn test_unknown() {
        assert!(SoftwareVersion::parse(None).unwrap().is_unknown);
        assert!(SoftwareVersion::parse(Some("Unknown")).unwrap().is_unknown);
        assert_matches!(SoftwareVersion::parse(Some("3.1")), Err(VersionError(_)));
    }

    #[test]
    fn test_ordering() {
        assert!(v("v3.1.0.989_22051908") > v("v3.1.0.956_22041503"));
        assert!(v("v3.2.0.218_23020151") > v("v3.1.0.989_22051908"));
        assert!(v("v2.0.0.4732_1728_21062800") < v("v3.0.0.136_20121102"));
        // Same build, a later date is a newer beta
        assert!(v("v3.1.0.989_22051909") > v("v3.1.0.989_22051908"));
        assert_eq!(v("V3.1.0.989_22051908"), v("v3.1.0.989_22051908"));
    }

    #[test]
    fn test_minimum_firmware() {
        let min = minimum_firmware("RLC-811A", "IPC_523128M8MP").unwrap();
        assert_eq!(min.as_str(), "v3.1.0.989_22051908");
        assert!(minimum_firmware("RLC-811A", "OTHER").is_none());
    }
}
