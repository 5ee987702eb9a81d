//! Typed forms of the JSON replies
//!
//! Only the parts of a reply that are read are modelled, the devices add fields with every
//! firmware release. Numbers that some firmware sends as strings are read through
//! [`flexible_int`].
//!
use crate::utils::ReolinkTime;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One element of a reply array
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Reply {
    #[serde(default)]
    pub cmd: String,
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub error: Option<ReplyError>,
}

/// The `error` object of a failed command
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ReplyError {
    #[serde(rename = "rspCode", default)]
    pub rsp_code: i64,
    #[serde(default)]
    pub detail: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginValue {
    #[serde(rename = "Token")]
    pub token: LoginToken,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginToken {
    #[serde(rename = "leaseTime")]
    pub lease_time: f64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChannelStatusValue {
    pub count: usize,
    #[serde(default)]
    pub status: Vec<ChannelStatus>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChannelStatus {
    pub channel: u8,
    #[serde(default)]
    pub online: i64,
    pub name: Option<String>,
    #[serde(rename = "typeInfo")]
    pub type_info: Option<String>,
}

/// Identity of the device as reported by `GetDevInfo`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DevInfo {
    /// `NVR`, `IPC` or `WIFI_IPC`
    #[serde(rename = "exactType", default)]
    pub exact_type: Option<String>,
    /// Serial number
    pub serial: String,
    /// User given name
    pub name: String,
    /// Model name
    pub model: String,
    /// Hardware revision
    #[serde(rename = "hardVer")]
    pub hardware_version: String,
    /// Firmware version
    #[serde(rename = "firmVer")]
    pub firmware_version: String,
    /// Number of channels the device has, online or not
    #[serde(rename = "channelNum", default)]
    pub channel_num: usize,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LocalLinkValue {
    #[serde(rename = "LocalLink")]
    pub local_link: LocalLink,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LocalLink {
    pub mac: String,
}

/// The service ports as reported by `GetNetPort`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NetPort {
    /// RTSP port
    #[serde(rename = "rtspPort")]
    pub rtsp_port: u16,
    /// RTMP port
    #[serde(rename = "rtmpPort")]
    pub rtmp_port: u16,
    /// ONVIF port
    #[serde(rename = "onvifPort")]
    pub onvif_port: u16,
    /// RTSP switch, absent on older firmware which means on
    #[serde(rename = "rtspEnable", default = "one")]
    pub rtsp_enable: i64,
    /// RTMP switch, absent on older firmware which means on
    #[serde(rename = "rtmpEnable", default = "one")]
    pub rtmp_enable: i64,
    /// ONVIF switch, absent on older firmware which means on
    #[serde(rename = "onvifEnable", default = "one")]
    pub onvif_enable: i64,
}

fn one() -> i64 {
    1
}

/// A `{"ver": n}` capability entry
#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct Ver {
    pub ver: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AbilityValue {
    #[serde(rename = "Ability")]
    pub ability: Ability,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Ability {
    pub email: Option<Ver>,
    pub push: Option<Ver>,
    #[serde(rename = "supportFtpEnable")]
    pub support_ftp_enable: Option<Ver>,
    #[serde(rename = "supportRecordEnable")]
    pub support_record_enable: Option<Ver>,
    #[serde(rename = "supportAudioAlarm")]
    pub support_audio_alarm: Option<Ver>,
    #[serde(rename = "abilityChn", default)]
    pub ability_chn: Vec<ChannelAbility>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChannelAbility {
    #[serde(rename = "ptzType")]
    pub ptz_type: Ver,
    pub ftp: Option<Ver>,
    #[serde(rename = "recCfg")]
    pub rec_cfg: Option<Ver>,
    #[serde(rename = "supportAudioAlarm")]
    pub support_audio_alarm: Option<Ver>,
}

/// A `{"support", "alarm_state"}` pair of the events and AI replies
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub(crate) struct AlarmSupport {
    #[serde(default)]
    pub support: i64,
    #[serde(default)]
    pub alarm_state: i64,
}

impl AlarmSupport {
    pub(crate) fn supported(&self) -> bool {
        self.support == 1
    }

    pub(crate) fn triggered(&self) -> bool {
        self.supported() && self.alarm_state == 1
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct EventsValue {
    pub channel: u8,
    pub ai: Option<BTreeMap<String, AlarmSupport>>,
    pub md: Option<AlarmState>,
    pub visitor: Option<AlarmSupport>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AlarmState {
    pub alarm_state: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RtspUrl {
    pub channel: u8,
    #[serde(rename = "mainStream")]
    pub main_stream: String,
    #[serde(rename = "subStream")]
    pub sub_stream: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PtzPreset {
    #[serde(deserialize_with = "flexible_int")]
    pub enable: i64,
    #[serde(deserialize_with = "flexible_int")]
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

/// One sensitivity window of the motion alarm
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SensitivityPreset {
    /// Preset id
    #[serde(deserialize_with = "flexible_int")]
    pub id: i64,
    /// Device facing sensitivity, 1 is the most sensitive
    #[serde(deserialize_with = "flexible_int")]
    pub sensitivity: i64,
    /// Start hour of the window
    #[serde(rename = "beginHour", default)]
    pub begin_hour: i64,
    /// Start minute of the window
    #[serde(rename = "beginMin", default)]
    pub begin_min: i64,
    /// End hour of the window
    #[serde(rename = "endHour", default)]
    pub end_hour: i64,
    /// End minute of the window
    #[serde(rename = "endMin", default)]
    pub end_min: i64,
}

/// Reads an integer that may arrive as a number or as a string
pub(crate) fn flexible_int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrString {
        Int(i64),
        Str(String),
    }
    match IntOrString::deserialize(deserializer)? {
        IntOrString::Int(i) => Ok(i),
        IntOrString::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Which days of a month have recordings, as returned by a search
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SearchStatus {
    /// Year of the table
    pub year: i32,
    /// Month of the table
    pub mon: u8,
    /// One character per day, `1` if the day has recordings
    pub table: String,
}

impl SearchStatus {
    /// The days of the month that have recordings
    pub fn days(&self) -> Vec<u8> {
        self.table
            .chars()
            .enumerate()
            .filter(|(_, flag)| *flag == '1')
            .map(|(day, _)| day as u8 + 1)
            .collect()
    }
}

/// A recording found by a search
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SearchFile {
    /// File name as used in playback urls
    pub name: String,
    /// Start of the recording
    #[serde(rename = "StartTime")]
    pub start_time: ReolinkTime,
    /// End of the recording
    #[serde(rename = "EndTime")]
    pub end_time: ReolinkTime,
    /// `main` or `sub`
    #[serde(rename = "type", default)]
    pub stream_type: String,
    /// Size in bytes
    #[serde(deserialize_with = "flexible_int", default)]
    pub size: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchValue {
    #[serde(rename = "SearchResult")]
    pub search_result: SearchResult,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResult {
    #[serde(rename = "Status", default)]
    pub status: Vec<SearchStatus>,
    #[serde(rename = "File")]
    pub file: Option<Vec<SearchFile>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flexible_preset() {
        let preset: PtzPreset =
            serde_json::from_value(json!({"enable": "1", "id": "3", "name": "gate"})).unwrap();
        assert_eq!((preset.enable, preset.id), (1, 3));
    }

    #[test]
    fn test_net_port_defaults() {
        let port: NetPort =
            serde_json::from_value(json!({"rtspPort": 554, "rtmpPort": 1935, "onvifPort": 8000}))
                .unwrap();
        assert_eq!(port.rtsp_enable, 1);
        assert_eq!(port.onvif_port, 8000);
    }

    #[test]
    fn test_search_days() {
        let status = SearchStatus {
            year: 2023,
            mon: 4,
            table: "0110000000000000000000000000001".to_string(),
        };
        assert_eq!(status.days(), vec![2, 3, 31]);
    }
}
