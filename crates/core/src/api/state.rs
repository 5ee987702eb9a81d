use super::commands::{ApiVersions, Family};
use super::model::{DevInfo, NetPort, SensitivityPreset};
use crate::software_version::SoftwareVersion;
use serde_json::Value;
use std::collections::BTreeMap;

/// Settings of a family that comes in a legacy and a `V20` variant
#[derive(Debug, Clone)]
pub(crate) struct FamilySettings {
    /// The `value` of the last reply, handed back when changing the settings
    pub settings: Value,
    pub enabled: bool,
}

/// What is known about one channel
///
/// A field that is `None` was never answered by the device, either because it was not asked
/// yet or because the channel does not support it.
#[derive(Debug, Clone, Default)]
pub(crate) struct ChannelState {
    pub name: Option<String>,
    pub model: Option<String>,
    pub is_doorbell: bool,

    pub ptz_type: Option<i64>,
    pub ptz_preset_settings: Option<Value>,
    pub ptz_presets: BTreeMap<String, i64>,
    pub auto_focus: Option<Value>,
    pub zoom_focus: Option<Value>,

    pub motion: Option<bool>,
    pub ai_support: BTreeMap<String, bool>,
    pub ai_state: BTreeMap<String, bool>,
    pub visitor: Option<bool>,

    pub alarm: Option<Value>,
    pub md_enabled: Option<bool>,
    pub sensitivity: Vec<SensitivityPreset>,

    pub osd: Option<Value>,
    pub enc: Option<Value>,
    pub audio: Option<bool>,
    pub rtsp_main: Option<String>,
    pub rtsp_sub: Option<String>,

    pub isp: Option<Value>,
    pub daynight: Option<String>,
    pub backlight: Option<String>,

    pub ir: Option<Value>,
    pub ir_enabled: Option<bool>,
    pub power_led: Option<Value>,
    pub power_led_enabled: Option<bool>,
    pub doorbell_light: Option<bool>,
    pub whiteled: Option<Value>,
    pub whiteled_enabled: Option<bool>,
    pub whiteled_mode: Option<i64>,

    pub families: BTreeMap<Family, FamilySettings>,
}

impl ChannelState {
    pub(crate) fn family(&self, family: Family) -> Option<&FamilySettings> {
        self.families.get(&family)
    }
}

/// Everything learnt about a host, replaced piecewise by every reply
#[derive(Debug, Clone, Default)]
pub(crate) struct HostState {
    pub is_nvr: bool,
    pub dev_info: Option<DevInfo>,
    pub sw_version: Option<SoftwareVersion>,
    pub num_channels: usize,
    /// Online channels in the order the device listed them
    pub channels: Vec<u8>,
    pub channel_status_present: bool,
    pub channel_status_has_name: bool,

    pub hdd_info: Option<Value>,
    pub local_link: Option<Value>,
    pub mac_address: Option<String>,
    pub netport_settings: Option<Value>,
    pub net_port: Option<NetPort>,
    pub subscribe_url: Option<String>,
    pub users: Option<Value>,
    pub ntp_settings: Option<Value>,
    pub time_settings: Option<Value>,

    pub versions: ApiVersions,
    pub channel: BTreeMap<u8, ChannelState>,
}

impl HostState {
    pub(crate) fn ch(&self, channel: u8) -> Option<&ChannelState> {
        self.channel.get(&channel)
    }

    pub(crate) fn ch_mut(&mut self, channel: u8) -> &mut ChannelState {
        self.channel.entry(channel).or_default()
    }

    pub(crate) fn has_channel(&self, channel: u8) -> bool {
        self.channels.contains(&channel)
    }

    pub(crate) fn ptz_type(&self, channel: u8) -> i64 {
        self.ch(channel).and_then(|ch| ch.ptz_type).unwrap_or(0)
    }

    pub(crate) fn ptz_supported(&self, channel: u8) -> bool {
        self.ptz_type(channel) != 0
    }

    pub(crate) fn zoom_supported(&self, channel: u8) -> bool {
        matches!(self.ptz_type(channel), 1 | 2 | 5)
    }

    pub(crate) fn pan_tilt_supported(&self, channel: u8) -> bool {
        matches!(self.ptz_type(channel), 2 | 3 | 5)
    }

    /// Forgets the channel list, names and models before they are read again
    pub(crate) fn reset_channels(&mut self) {
        self.channels.clear();
        for ch in self.channel.values_mut() {
            ch.model = None;
            ch.is_doorbell = false;
        }
    }

    pub(crate) fn clear_names(&mut self) {
        for ch in self.channel.values_mut() {
            ch.name = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ptz_support() {
        let mut state = HostState::default();
        assert!(!state.ptz_supported(0));
        for (ptz, zoom, pan_tilt) in [
            (1, true, false),
            (2, true, true),
            (3, false, true),
            (4, false, false),
            (5, true, true),
        ] {
            state.ch_mut(0).ptz_type = Some(ptz);
            assert!(state.ptz_supported(0));
            assert_eq!(state.zoom_supported(0), zoom, "ptz type {}", ptz);
            assert_eq!(state.pan_tilt_supported(0), pan_tilt, "ptz type {}", ptz);
        }
    }
}
