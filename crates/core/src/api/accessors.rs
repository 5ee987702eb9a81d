//! Reads of the cached state, none of these talk to the device
use super::commands::{ApiVersions, Family};
use super::model::{DevInfo, SensitivityPreset};
use super::state::ChannelState;
use super::Host;
use crate::software_version::SoftwareVersion;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Instant;

impl Host {
    fn with_channel<T, F>(&self, channel: u8, read: F) -> Option<T>
    where
        F: FnOnce(&ChannelState) -> Option<T>,
    {
        self.read_state().ch(channel).and_then(read)
    }

    fn with_dev_info<T, F>(&self, read: F) -> Option<T>
    where
        F: FnOnce(&DevInfo) -> T,
    {
        self.read_state().dev_info.as_ref().map(read)
    }

    /// Serial number
    pub fn serial(&self) -> Option<String> {
        self.with_dev_info(|d| d.serial.clone())
    }

    /// Name of the host itself
    pub fn nvr_name(&self) -> Option<String> {
        self.with_dev_info(|d| d.name.clone())
    }

    /// Model of the host, e.g. `RLN8-410`
    pub fn model(&self) -> Option<String> {
        self.with_dev_info(|d| d.model.clone())
    }

    /// Hardware revision of the host
    pub fn hardware_version(&self) -> Option<String> {
        self.with_dev_info(|d| d.hardware_version.clone())
    }

    /// The firmware version, [`SoftwareVersion::unknown`] before [`Host::get_host_data`]
    pub fn sw_version(&self) -> SoftwareVersion {
        self.read_state()
            .sw_version
            .clone()
            .unwrap_or_else(SoftwareVersion::unknown)
    }

    /// MAC address of the wired or wifi link
    pub fn mac_address(&self) -> Option<String> {
        self.read_state().mac_address.clone()
    }

    /// True for recorders, which put cameras behind channels
    pub fn is_nvr(&self) -> bool {
        self.read_state().is_nvr
    }

    /// Number of channels the host has, online or not
    pub fn num_channels(&self) -> usize {
        self.read_state().num_channels
    }

    /// The online channels
    pub fn channels(&self) -> Vec<u8> {
        self.read_state().channels.clone()
    }

    /// Name of the camera on a channel
    pub fn camera_name(&self, channel: u8) -> Option<String> {
        self.with_channel(channel, |ch| ch.name.clone())
    }

    /// Model of the camera on a channel, the host model for plain cameras
    pub fn camera_model(&self, channel: u8) -> Option<String> {
        self.with_channel(channel, |ch| ch.model.clone())
    }

    /// Whether the camera on a channel is a doorbell
    pub fn is_doorbell_enabled(&self, channel: u8) -> bool {
        self.with_channel(channel, |ch| Some(ch.is_doorbell))
            .unwrap_or(false)
    }

    /// The last motion state read or pushed
    pub fn motion_detected(&self, channel: u8) -> bool {
        self.with_channel(channel, |ch| ch.motion).unwrap_or(false)
    }

    /// Whether motion detection is switched on
    pub fn motion_detection_enabled(&self, channel: u8) -> Option<bool> {
        self.with_channel(channel, |ch| ch.md_enabled)
    }

    /// The last state of one AI detection type such as `people` or `vehicle`
    pub fn ai_detected(&self, channel: u8, object: &str) -> bool {
        self.with_channel(channel, |ch| ch.ai_state.get(object).copied())
            .unwrap_or(false)
    }

    /// Whether AI detection is supported at all, or for one object type like `people`
    pub fn ai_supported(&self, channel: u8, object: Option<&str>) -> bool {
        self.with_channel(channel, |ch| {
            Some(match object {
                Some(object) => ch.ai_support.get(object).copied().unwrap_or(false),
                None => ch.ai_support.values().any(|supported| *supported),
            })
        })
        .unwrap_or(false)
    }

    /// States of all AI detection types the channel supports
    pub fn ai_detection_states(&self, channel: u8) -> BTreeMap<String, bool> {
        self.with_channel(channel, |ch| {
            Some(
                ch.ai_state
                    .iter()
                    .filter(|(object, _)| ch.ai_support.get(*object).copied().unwrap_or(false))
                    .map(|(object, state)| (object.clone(), *state))
                    .collect(),
            )
        })
        .unwrap_or_default()
    }

    /// Doorbell press state
    pub fn visitor_detected(&self, channel: u8) -> bool {
        self.with_channel(channel, |ch| ch.visitor).unwrap_or(false)
    }

    fn family_enabled(&self, family: Family, channel: Option<u8>) -> bool {
        let state = self.read_state();
        let enabled = |ch: &ChannelState| ch.family(family).map(|f| f.enabled);
        match channel {
            Some(channel) => state.ch(channel).and_then(enabled).unwrap_or(false),
            None => state
                .channels
                .iter()
                .filter_map(|c| state.ch(*c))
                .any(|ch| enabled(ch).unwrap_or(false)),
        }
    }

    /// Email notifications, `None` asks whether any channel sends them
    pub fn email_enabled(&self, channel: Option<u8>) -> bool {
        self.family_enabled(Family::Email, channel)
    }

    /// Push notifications, `None` asks whether any channel sends them
    pub fn push_enabled(&self, channel: Option<u8>) -> bool {
        self.family_enabled(Family::Push, channel)
    }

    /// FTP upload, `None` asks whether any channel uploads
    pub fn ftp_enabled(&self, channel: Option<u8>) -> bool {
        self.family_enabled(Family::Ftp, channel)
    }

    /// Recording, `None` asks whether any channel records
    pub fn recording_enabled(&self, channel: Option<u8>) -> bool {
        self.family_enabled(Family::Rec, channel)
    }

    /// Whether alarms sound the siren
    pub fn audio_alarm_enabled(&self, channel: u8) -> bool {
        self.family_enabled(Family::AudioAlarm, Some(channel))
    }

    /// Infrared lights in auto mode
    pub fn ir_enabled(&self, channel: u8) -> bool {
        self.with_channel(channel, |ch| ch.ir_enabled).unwrap_or(false)
    }

    /// Power/status led
    pub fn status_led_enabled(&self, channel: u8) -> bool {
        self.with_channel(channel, |ch| ch.power_led_enabled)
            .unwrap_or(false)
    }

    /// Doorbell button light
    pub fn doorbell_light_enabled(&self, channel: u8) -> bool {
        self.with_channel(channel, |ch| ch.doorbell_light)
            .unwrap_or(false)
    }

    /// Spotlight currently lit
    pub fn whiteled_enabled(&self, channel: u8) -> bool {
        self.with_channel(channel, |ch| ch.whiteled_enabled)
            .unwrap_or(false)
    }

    /// The spotlight mode, see [`super::SpotlightMode`] for the values
    pub fn whiteled_mode(&self, channel: u8) -> Option<i64> {
        self.with_channel(channel, |ch| ch.whiteled_mode)
    }

    /// The `LightingSchedule` of the spotlight
    pub fn whiteled_schedule(&self, channel: u8) -> Option<Value> {
        self.with_channel(channel, |ch| {
            ch.whiteled
                .as_ref()
                .and_then(|w| w.pointer("/WhiteLed/LightingSchedule"))
                .cloned()
        })
    }

    /// `Auto`, `Color` or `Black&White`
    pub fn daynight_state(&self, channel: u8) -> Option<String> {
        self.with_channel(channel, |ch| ch.daynight.clone())
    }

    /// `Off`, `BackLightControl` or `DynamicRangeControl`
    pub fn backlight_state(&self, channel: u8) -> Option<String> {
        self.with_channel(channel, |ch| ch.backlight.clone())
    }

    /// Whether the streams carry audio
    pub fn audio_state(&self, channel: u8) -> bool {
        self.with_channel(channel, |ch| ch.audio).unwrap_or(false)
    }

    /// PTZ preset names and their ids
    pub fn ptz_presets(&self, channel: u8) -> BTreeMap<String, i64> {
        self.with_channel(channel, |ch| Some(ch.ptz_presets.clone()))
            .unwrap_or_default()
    }

    /// Motion sensitivity schedule entries
    pub fn sensitivity_presets(&self, channel: u8) -> Vec<SensitivityPreset> {
        self.with_channel(channel, |ch| Some(ch.sensitivity.clone()))
            .unwrap_or_default()
    }

    /// Any PTZ capability
    pub fn ptz_supported(&self, channel: u8) -> bool {
        self.read_state().ptz_supported(channel)
    }

    /// Optical zoom
    pub fn zoom_supported(&self, channel: u8) -> bool {
        self.read_state().zoom_supported(channel)
    }

    /// Motorised pan and tilt
    pub fn pan_tilt_supported(&self, channel: u8) -> bool {
        self.read_state().pan_tilt_supported(channel)
    }

    /// RTSP port from GetNetPort
    pub fn rtsp_port(&self) -> Option<u16> {
        self.read_state().net_port.as_ref().map(|p| p.rtsp_port)
    }

    /// RTMP port from GetNetPort
    pub fn rtmp_port(&self) -> Option<u16> {
        self.read_state().net_port.as_ref().map(|p| p.rtmp_port)
    }

    /// ONVIF port from GetNetPort
    pub fn onvif_port(&self) -> Option<u16> {
        self.read_state().net_port.as_ref().map(|p| p.onvif_port)
    }

    /// Whether the RTSP service is switched on
    pub fn rtsp_enabled(&self) -> bool {
        self.read_state()
            .net_port
            .as_ref()
            .map(|p| p.rtsp_enable == 1)
            .unwrap_or(false)
    }

    /// Whether the RTMP service is switched on
    pub fn rtmp_enabled(&self) -> bool {
        self.read_state()
            .net_port
            .as_ref()
            .map(|p| p.rtmp_enable == 1)
            .unwrap_or(false)
    }

    /// Whether the ONVIF service is switched on
    pub fn onvif_enabled(&self) -> bool {
        self.read_state()
            .net_port
            .as_ref()
            .map(|p| p.onvif_enable == 1)
            .unwrap_or(false)
    }

    /// Where ONVIF event subscriptions are sent
    pub fn subscribe_url(&self) -> Option<String> {
        self.read_state().subscribe_url.clone()
    }

    /// Raw storage info as reported by GetHddInfo
    pub fn hdd_info(&self) -> Option<Value> {
        self.read_state().hdd_info.clone()
    }

    /// The level of the login user, `None` if the user list is unknown
    pub fn user_level(&self) -> Option<String> {
        let state = self.read_state();
        state
            .users
            .as_ref()
            .and_then(Value::as_array)?
            .iter()
            .find(|user| user.get("userName").and_then(Value::as_str) == Some(self.username()))
            .and_then(|user| user.get("level"))
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    /// Only admins may change settings
    pub fn is_admin(&self) -> bool {
        self.user_level().as_deref() == Some("admin")
    }

    /// The command versions in use
    pub fn api_versions(&self) -> ApiVersions {
        self.read_state().versions
    }

    /// The session token, `None` when logged out
    pub fn session_token(&self) -> Option<String> {
        self.token()
    }

    /// When the session token expires
    pub fn session_lease(&self) -> Option<Instant> {
        self.lease()
    }

    ///
    /// Names of the features of a channel that can be switched
    ///
    /// A feature is listed once the device answered its settings.
    ///
    pub fn get_switchable_capabilities(&self, channel: u8) -> Vec<&'static str> {
        let state = self.read_state();
        let mut capabilities = vec![];
        let ch = match state.ch(channel) {
            Some(ch) => ch,
            None => return capabilities,
        };

        let family = |f: Family| ch.family(f).is_some();
        let flags = [
            ("ftp", family(Family::Ftp)),
            ("push", family(Family::Push)),
            ("irLights", ch.ir_enabled.is_some()),
            ("powerLed", ch.power_led_enabled.is_some()),
            ("doorbellLight", ch.doorbell_light.is_some()),
            ("spotlight", ch.whiteled_enabled.is_some()),
            ("siren", family(Family::AudioAlarm)),
            ("recording", family(Family::Rec)),
            ("email", family(Family::Email)),
            ("audio", ch.audio.is_some()),
        ];
        capabilities.extend(flags.iter().filter(|(_, has)| *has).map(|(name, _)| *name));

        if state.ptz_supported(channel) {
            capabilities.push("ptzControl");
            if state.zoom_supported(channel) {
                capabilities.push("zoomControl");
            }
            if state.pan_tilt_supported(channel) {
                capabilities.push("ptControl");
            }
            if !ch.ptz_presets.is_empty() {
                capabilities.push("ptzPresets");
            }
        }
        if !ch.sensitivity.is_empty() {
            capabilities.push("sensitivityPresets");
        }
        if ch.motion.is_some() {
            capabilities.push("motionDetection");
        }
        if ch.daynight.is_some() {
            capabilities.push("dayNight");
        }
        capabilities
    }
}

#[cfg(test)]
mod tests {
    use super::super::state::FamilySettings;
    use super::*;
    use crate::api::HostConfig;
    use serde_json::json;

    fn host() -> Host {
        let host = Host::new(HostConfig::new("cam", "admin", "pw"));
        let mut state = host.write_state();
        state.channels = vec![0, 1];
        state.users = Some(json!([
            {"userName": "guest", "level": "guest"},
            {"userName": "admin", "level": "admin"},
        ]));
        let ch = state.ch_mut(0);
        ch.ptz_type = Some(2);
        ch.ptz_presets.insert("door".to_string(), 1);
        ch.ir_enabled = Some(true);
        ch.ai_support.insert("people".to_string(), true);
        ch.ai_support.insert("dog_cat".to_string(), false);
        ch.ai_state.insert("people".to_string(), true);
        ch.ai_state.insert("dog_cat".to_string(), true);
        ch.families.insert(
            Family::Push,
            FamilySettings {
                settings: json!({}),
                enabled: false,
            },
        );
        state.ch_mut(1).families.insert(
            Family::Push,
            FamilySettings {
                settings: json!({}),
                enabled: true,
            },
        );
        drop(state);
        host
    }

    #[test]
    fn test_user_level() {
        let host = host();
        assert_eq!(host.user_level().as_deref(), Some("admin"));
        assert!(host.is_admin());
    }

    #[test]
    fn test_family_enabled() {
        let host = host();
        assert!(!host.push_enabled(Some(0)));
        assert!(host.push_enabled(Some(1)));
        assert!(host.push_enabled(None));
        assert!(!host.email_enabled(None));
    }

    #[test]
    fn test_ai_states_only_supported() {
        let host = host();
        let states = host.ai_detection_states(0);
        assert_eq!(states.len(), 1);
        assert_eq!(states.get("people"), Some(&true));
        assert!(host.ai_supported(0, None));
        assert!(!host.ai_supported(0, Some("dog_cat")));
    }

    #[test]
    fn test_capabilities() {
        let host = host();
        assert_eq!(
            host.get_switchable_capabilities(0),
            vec!["push", "irLights", "ptzControl", "zoomControl", "ptControl", "ptzPresets"]
        );
        assert!(host.get_switchable_capabilities(5).is_empty());
    }
}
