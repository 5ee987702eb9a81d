//! Commands that change settings
//!
//! Every setter checks the channel and that the device reported the settings it is about to
//! change before anything is sent. Most settings are changed by sending back the last reply
//! with one field replaced.
//!
use super::commands::Family;
use super::enums::{BackLight, DayNight, PtzCommand, SpotlightMode, StatusLed};
use super::state::{ChannelState, HostState};
use super::Host;
use crate::{Error, Result};
use log::*;
use serde_json::{json, Value};

const OSD_POSITIONS: [&str; 6] = [
    "Upper Left",
    "Upper Right",
    "Top Center",
    "Bottom Center",
    "Lower Left",
    "Lower Right",
];

const DATE_FORMATS: [&str; 3] = ["DD/MM/YYYY", "MM/DD/YYYY", "YYYY/MM/DD"];

fn on_off(enable: bool) -> i64 {
    if enable {
        1
    } else {
        0
    }
}

fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        other => other.as_i64(),
    }
}

fn setting(cmd: &str, param: Value) -> Value {
    json!({"cmd": cmd, "action": 0, "param": param})
}

impl Host {
    pub(crate) fn invalid_parameter<T: Into<String>>(&self, why: T) -> Error {
        Error::InvalidParameter {
            host: self.host().to_string(),
            why: why.into(),
        }
    }

    pub(crate) fn not_supported<T: Into<String>>(&self, why: T) -> Error {
        Error::NotSupported {
            host: self.host().to_string(),
            why: why.into(),
        }
    }

    /// Replaces the value at `path`, every parent object must already exist
    fn set_path(&self, value: &mut Value, path: &[&str], new: Value) -> Result<()> {
        let missing = || Error::UnexpectedData {
            host: self.host().to_string(),
            why: format!("cached settings have no '{}'", path.join(".")),
        };
        let (last, parents) = path.split_last().ok_or_else(missing)?;
        let mut current = value;
        for key in parents {
            current = current.get_mut(*key).ok_or_else(missing)?;
        }
        current
            .as_object_mut()
            .ok_or_else(missing)?
            .insert(last.to_string(), new);
        Ok(())
    }

    /// Checks the channel and hands out its cached state
    fn checked_channel<'s>(
        &self,
        state: &'s HostState,
        func: &str,
        channel: u8,
    ) -> Result<&'s ChannelState> {
        if !state.has_channel(channel) {
            return Err(self.invalid_parameter(format!(
                "{}: no camera connected to channel '{}'",
                func, channel
            )));
        }
        state.ch(channel).ok_or_else(|| {
            self.not_supported(format!("{}: nothing known about channel {}", func, channel))
        })
    }

    /// A copy of a cached settings block of a channel
    fn cached_settings<F>(&self, func: &str, channel: u8, what: &str, pick: F) -> Result<Value>
    where
        F: Fn(&ChannelState) -> Option<&Value>,
    {
        let state = self.read_state();
        let ch = self.checked_channel(&state, func, channel)?;
        pick(ch).cloned().ok_or_else(|| {
            self.not_supported(format!(
                "{}: {} on camera {} is not available",
                func,
                what,
                ch.name.as_deref().unwrap_or("unknown")
            ))
        })
    }

    fn family_body(&self, family: Family, version: i64, settings: &Value, enable: bool) -> Result<Value> {
        let mut param = settings.clone();
        let path: &[&str] = if version >= 1 {
            &[family.key(), "enable"]
        } else {
            &[family.key(), "schedule", "enable"]
        };
        self.set_path(&mut param, path, json!(on_off(enable)))?;
        Ok(setting(&family.set_cmd(version), param))
    }

    /// The requests that switch a family on or off, `None` addresses the whole host
    fn family_bodies(
        &self,
        func: &str,
        family: Family,
        channel: Option<u8>,
        enable: bool,
    ) -> Result<Vec<Value>> {
        let state = self.read_state();
        let version = state.versions.of(family);
        let not_available = |channel: u8| {
            self.not_supported(format!(
                "{}: {:?} on channel {} is not available",
                func, family, channel
            ))
        };
        match channel {
            // Legacy firmware has no host wide switch, every channel is set
            None if version == 0 => state
                .channels
                .iter()
                .filter_map(|c| state.ch(*c).and_then(|ch| ch.family(family)))
                .map(|cached| self.family_body(family, version, &cached.settings, enable))
                .collect(),
            None => {
                let cached = state
                    .ch(0)
                    .and_then(|ch| ch.family(family))
                    .ok_or_else(|| not_available(0))?;
                Ok(vec![self.family_body(family, version, &cached.settings, enable)?])
            }
            Some(channel) => {
                let ch = self.checked_channel(&state, func, channel)?;
                let cached = ch.family(family).ok_or_else(|| not_available(channel))?;
                Ok(vec![self.family_body(family, version, &cached.settings, enable)?])
            }
        }
    }

    async fn set_family(&self, func: &str, family: Family, channel: Option<u8>, enable: bool) -> Result<()> {
        for body in self.family_bodies(func, family, channel, enable)? {
            self.send_setting(&[body]).await?;
        }
        Ok(())
    }

    /// Switches email notifications, `None` switches the whole host
    pub async fn set_email(&self, channel: Option<u8>, enable: bool) -> Result<()> {
        self.set_family("set_email", Family::Email, channel, enable).await
    }

    /// Switches push notifications, `None` switches the whole host
    pub async fn set_push(&self, channel: Option<u8>, enable: bool) -> Result<()> {
        self.set_family("set_push", Family::Push, channel, enable).await
    }

    /// Switches FTP upload, `None` switches the whole host
    pub async fn set_ftp(&self, channel: Option<u8>, enable: bool) -> Result<()> {
        self.set_family("set_ftp", Family::Ftp, channel, enable).await
    }

    /// Switches recording, `None` switches the whole host
    pub async fn set_recording(&self, channel: Option<u8>, enable: bool) -> Result<()> {
        self.set_family("set_recording", Family::Rec, channel, enable).await
    }

    /// Switches the siren being triggered by alarms
    pub async fn set_audio_alarm(&self, channel: u8, enable: bool) -> Result<()> {
        let body = {
            let state = self.read_state();
            let ch = self.checked_channel(&state, "set_audio_alarm", channel)?;
            if ch.family(Family::AudioAlarm).is_none() {
                return Err(self.not_supported(format!(
                    "set_audio_alarm: AudioAlarm on channel {} is not available",
                    channel
                )));
            }
            let version = state.versions.of(Family::AudioAlarm);
            let audio = if version >= 1 {
                json!({"enable": on_off(enable), "channel": channel})
            } else {
                json!({"schedule": {"enable": on_off(enable), "channel": channel}})
            };
            json!({"cmd": Family::AudioAlarm.set_cmd(version), "param": {"Audio": audio}})
        };
        self.send_setting(&[body]).await
    }

    /// Sounds or silences the siren
    pub async fn set_siren(&self, channel: u8, enable: bool) -> Result<()> {
        {
            let state = self.read_state();
            self.checked_channel(&state, "set_siren", channel)?;
        }
        self.set_audio_alarm(channel, enable).await?;
        let body = setting(
            "AudioAlarmPlay",
            json!({
                "alarm_mode": "manul",
                "manual_switch": on_off(enable),
                "times": 2,
                "channel": channel,
            }),
        );
        self.send_setting(&[body]).await
    }

    ///
    /// Sets the motion sensitivity, 1 is the least and 50 the most sensitive
    ///
    /// The device stores the inverse, `51 - value`. With a `preset` only that sensitivity
    /// window is changed.
    ///
    pub async fn set_sensitivity(&self, channel: u8, value: i64, preset: Option<i64>) -> Result<()> {
        let alarm = self.cached_settings("set_sensitivity", channel, "alarm", |ch| ch.alarm.as_ref())?;
        let mut sens = alarm
            .pointer("/Alarm/sens")
            .cloned()
            .ok_or_else(|| self.not_supported("set_sensitivity: no sensitivity presets"))?;
        if let Some(presets) = sens.as_array_mut() {
            for entry in presets.iter_mut() {
                let matches = match preset {
                    None => true,
                    Some(id) => entry.get("id").and_then(as_int) == Some(id),
                };
                if matches {
                    self.set_path(entry, &["sensitivity"], json!(51 - value))?;
                }
            }
        }
        let body = setting(
            "SetAlarm",
            json!({"Alarm": {"channel": channel, "type": "md", "sens": sens}}),
        );
        self.send_setting(&[body]).await
    }

    /// Switches motion detection
    pub async fn set_motion_detection(&self, channel: u8, enable: bool) -> Result<()> {
        let mut param =
            self.cached_settings("set_motion_detection", channel, "alarm", |ch| ch.alarm.as_ref())?;
        self.set_path(&mut param, &["Alarm", "enable"], json!(on_off(enable)))?;
        self.send_setting(&[setting("SetAlarm", param)]).await
    }

    /// Switches the infrared lights between automatic and off
    pub async fn set_ir_lights(&self, channel: u8, enable: bool) -> Result<()> {
        self.cached_settings("set_ir_lights", channel, "IR light", |ch| ch.ir.as_ref())?;
        let state = if enable { "Auto" } else { "Off" };
        let body = setting(
            "SetIrLights",
            json!({"IrLights": {"channel": channel, "state": state}}),
        );
        self.send_setting(&[body]).await
    }

    /// Switches the power led and the doorbell button light
    pub async fn set_power_led(&self, channel: u8, state: bool, doorbell_light: bool) -> Result<()> {
        self.cached_settings("set_power_led", channel, "power led", |ch| ch.power_led.as_ref())?;
        let on = |b: bool| if b { "On" } else { "Off" };
        let body = setting(
            "SetPowerLed",
            json!({"PowerLed": {
                "channel": channel,
                "state": on(state),
                "eDoorbellLightState": on(doorbell_light),
            }}),
        );
        self.send_setting(&[body]).await
    }

    /// Sets the mode of the status led
    pub async fn set_status_led(&self, channel: u8, mode: StatusLed) -> Result<()> {
        self.cached_settings("set_status_led", channel, "status led", |ch| ch.power_led.as_ref())?;
        let body = setting(
            "SetPowerLed",
            json!({"PowerLed": {"channel": channel, "state": mode.as_str()}}),
        );
        self.send_setting(&[body]).await
    }

    ///
    /// Switches the spotlight and sets its brightness and mode
    ///
    /// Brightness is 0..=100, the mode defaults to [`SpotlightMode::Auto`] and must be one of
    /// off, auto or schedule.
    ///
    pub async fn set_whiteled(
        &self,
        channel: u8,
        enable: bool,
        brightness: i64,
        mode: Option<SpotlightMode>,
    ) -> Result<()> {
        self.cached_settings("set_whiteled", channel, "white led", |ch| ch.whiteled.as_ref())?;
        let mode = mode.unwrap_or(SpotlightMode::Auto);
        if !(0..=100).contains(&brightness)
            || !matches!(
                mode,
                SpotlightMode::Off | SpotlightMode::Auto | SpotlightMode::Schedule
            )
        {
            return Err(self.invalid_parameter(format!(
                "set_whiteled: brightness {} not in range 0..100 or mode {} not in [0,1,3]",
                brightness, mode as i64
            )));
        }
        let body = json!({"cmd": "SetWhiteLed", "param": {"WhiteLed": {
            "state": on_off(enable),
            "channel": channel,
            "mode": mode as i64,
            "bright": brightness,
        }}});
        self.send_setting(&[body]).await
    }

    ///
    /// Sets when the spotlight is on in schedule mode, times are 24 hour
    ///
    /// A window may run over midnight only if it ends in the morning and starts in the
    /// evening.
    ///
    pub async fn set_spotlight_lighting_schedule(
        &self,
        channel: u8,
        end_hour: u8,
        end_min: u8,
        start_hour: u8,
        start_min: u8,
    ) -> Result<()> {
        self.cached_settings(
            "set_spotlight_lighting_schedule",
            channel,
            "white led",
            |ch| ch.whiteled.as_ref(),
        )?;
        let over_midnight = end_hour < 12 && start_hour > 16;
        if end_hour > 23
            || end_min > 59
            || start_hour > 23
            || start_min > 59
            || (end_hour == start_hour && end_min < start_min)
            || (!over_midnight && end_hour < start_hour)
        {
            return Err(self.invalid_parameter(format!(
                "set_spotlight_lighting_schedule: start time {}:{:02}, end time {}:{:02}",
                start_hour, start_min, end_hour, end_min
            )));
        }
        let body = json!({"cmd": "SetWhiteLed", "param": {"WhiteLed": {
            "LightingSchedule": {
                "EndHour": end_hour,
                "EndMin": end_min,
                "StartHour": start_hour,
                "StartMin": start_min,
            },
            "channel": channel,
            "mode": SpotlightMode::Schedule as i64,
        }}});
        self.send_setting(&[body]).await
    }

    /// Switches the spotlight fully on or back to automatic
    pub async fn set_spotlight(&self, channel: u8, enable: bool) -> Result<()> {
        if enable {
            self.set_spotlight_lighting_schedule(channel, 23, 59, 0, 0)
                .await?;
            self.set_whiteled(channel, true, 100, Some(SpotlightMode::Schedule))
                .await
        } else {
            self.set_spotlight_lighting_schedule(channel, 0, 0, 0, 0)
                .await?;
            self.set_whiteled(channel, false, 100, Some(SpotlightMode::Auto))
                .await
        }
    }

    /// Sets day and night switching of the image
    pub async fn set_daynight(&self, channel: u8, value: DayNight) -> Result<()> {
        let mut param = self.cached_settings("set_daynight", channel, "ISP", |ch| ch.isp.as_ref())?;
        self.set_path(&mut param, &["Isp", "dayNight"], json!(value.as_str()))?;
        self.send_setting(&[setting("SetIsp", param)]).await
    }

    /// Sets the backlight compensation of the image
    pub async fn set_backlight(&self, channel: u8, value: BackLight) -> Result<()> {
        let mut param = self.cached_settings("set_backlight", channel, "ISP", |ch| ch.isp.as_ref())?;
        self.set_path(&mut param, &["Isp", "backLight"], json!(value.as_str()))?;
        self.send_setting(&[setting("SetIsp", param)]).await
    }

    /// Switches audio recording in the streams
    pub async fn set_audio(&self, channel: u8, enable: bool) -> Result<()> {
        let mut param = self.cached_settings("set_audio", channel, "audio", |ch| ch.enc.as_ref())?;
        self.set_path(&mut param, &["Enc", "audio"], json!(on_off(enable)))?;
        self.send_setting(&[setting("SetEnc", param)]).await
    }

    ///
    /// Moves the camera
    ///
    /// [`PtzCommand::ToPos`] needs the id of a preset, see [`Host::ptz_presets`].
    ///
    pub async fn set_ptz_command(
        &self,
        channel: u8,
        command: PtzCommand,
        preset: Option<i64>,
        speed: Option<u8>,
    ) -> Result<()> {
        {
            let state = self.read_state();
            self.checked_channel(&state, "set_ptz_command", channel)?;
        }
        if command == PtzCommand::ToPos && preset.is_none() {
            return Err(self.invalid_parameter("set_ptz_command: ToPos requires a preset"));
        }
        let mut param = json!({"channel": channel, "op": command.as_str()});
        if let Some(speed) = speed {
            param["speed"] = json!(speed);
        }
        if let Some(preset) = preset {
            param["id"] = json!(preset);
        }
        self.send_setting(&[setting("PtzCtrl", param)]).await
    }

    /// Sets the absolute zoom position, 0..=33
    pub async fn set_zoom(&self, channel: u8, zoom: u8) -> Result<()> {
        self.zoom_focus("set_zoom", channel, "ZoomPos", zoom, 33).await
    }

    /// Sets the absolute focus position, 0..=223
    pub async fn set_focus(&self, channel: u8, focus: u8) -> Result<()> {
        self.zoom_focus("set_focus", channel, "FocusPos", focus, 223).await
    }

    async fn zoom_focus(&self, func: &str, channel: u8, op: &str, pos: u8, max: u8) -> Result<()> {
        {
            let state = self.read_state();
            self.checked_channel(&state, func, channel)?;
        }
        if pos > max {
            return Err(self.invalid_parameter(format!(
                "{}: value {} not in range 0..{}",
                func, pos, max
            )));
        }
        let body = setting(
            "StartZoomFocus",
            json!({"ZoomFocus": {"channel": channel, "op": op, "pos": pos}}),
        );
        self.send_setting(&[body]).await
    }

    /// The cached zoom position
    pub fn get_zoom(&self, channel: u8) -> Result<i64> {
        self.zoom_focus_pos("get_zoom", channel, "/ZoomFocus/zoom/pos")
    }

    /// The cached focus position
    pub fn get_focus(&self, channel: u8) -> Result<i64> {
        self.zoom_focus_pos("get_focus", channel, "/ZoomFocus/focus/pos")
    }

    fn zoom_focus_pos(&self, func: &str, channel: u8, pointer: &str) -> Result<i64> {
        let settings =
            self.cached_settings(func, channel, "ZoomFocus", |ch| ch.zoom_focus.as_ref())?;
        settings
            .pointer(pointer)
            .and_then(Value::as_i64)
            .ok_or_else(|| self.not_supported(format!("{}: no position reported", func)))
    }

    /// Switches autofocus
    pub async fn set_autofocus(&self, channel: u8, enable: bool) -> Result<()> {
        let mut param =
            self.cached_settings("set_autofocus", channel, "AutoFocus", |ch| ch.auto_focus.as_ref())?;
        self.set_path(&mut param, &["AutoFocus", "disable"], json!(on_off(!enable)))?;
        self.send_setting(&[setting("SetAutoFocus", param)]).await
    }

    ///
    /// Sets the on screen display
    ///
    /// Positions are `Upper Left`, `Upper Right`, `Top Center`, `Bottom Center`, `Lower Left`
    /// or `Lower Right`, `Off` hides the text. The watermark is left alone on cameras without
    /// one.
    ///
    pub async fn set_osd(
        &self,
        channel: u8,
        name_pos: Option<&str>,
        date_pos: Option<&str>,
        watermark: Option<bool>,
    ) -> Result<()> {
        let mut param = self.cached_settings("set_osd", channel, "OSD", |ch| ch.osd.as_ref())?;

        for (pos, block) in [(name_pos, "osdChannel"), (date_pos, "osdTime")] {
            match pos {
                None => {}
                Some("Off") => self.set_path(&mut param, &["Osd", block, "enable"], json!(0))?,
                Some(pos) if OSD_POSITIONS.contains(&pos) => {
                    self.set_path(&mut param, &["Osd", block, "enable"], json!(1))?;
                    self.set_path(&mut param, &["Osd", block, "pos"], json!(pos))?;
                }
                Some(pos) => {
                    return Err(self.invalid_parameter(format!(
                        "set_osd: invalid OSD position '{}'",
                        pos
                    )))
                }
            }
        }

        if let Some(watermark) = watermark {
            if param.pointer("/Osd/watermark").is_some() {
                self.set_path(&mut param, &["Osd", "watermark"], json!(on_off(watermark)))?;
            } else {
                debug!(
                    "{}: ignoring watermark request, not supported by channel {}",
                    self.host(),
                    channel
                );
            }
        }
        self.send_setting(&[setting("SetOsd", param)]).await
    }

    ///
    /// Sets the clock display of the host
    ///
    /// `tz_offset` is the offset to UTC in seconds, -43200..=50400.
    ///
    pub async fn set_time(
        &self,
        date_fmt: Option<&str>,
        hours24: Option<bool>,
        tz_offset: Option<i32>,
    ) -> Result<()> {
        if let Some(fmt) = date_fmt {
            if !DATE_FORMATS.contains(&fmt) {
                return Err(self.invalid_parameter(format!(
                    "set_time: date format {} not in {:?}",
                    fmt, DATE_FORMATS
                )));
            }
        }
        if let Some(offset) = tz_offset {
            if !(-43200..=50400).contains(&offset) {
                return Err(self.invalid_parameter(format!(
                    "set_time: time zone offset {} not in range -43200..50400",
                    offset
                )));
            }
        }

        // The clock keeps running, always start from the current time
        self.get_host_data().await?;
        let mut param = self
            .read_state()
            .time_settings
            .clone()
            .ok_or_else(|| self.not_supported("set_time: failed to retrieve current time settings"))?;

        if let Some(fmt) = date_fmt {
            self.set_path(&mut param, &["Time", "timeFmt"], json!(fmt))?;
        }
        if let Some(hours24) = hours24 {
            self.set_path(&mut param, &["Time", "hourFmt"], json!(on_off(!hours24)))?;
        }
        if let Some(offset) = tz_offset {
            self.set_path(&mut param, &["Time", "timeZone"], json!(offset))?;
        }
        self.send_setting(&[setting("SetTime", param)]).await
    }

    async fn ntp_settings(&self) -> Result<Value> {
        if self.read_state().ntp_settings.is_none() {
            self.get_host_data().await?;
        }
        self.read_state()
            .ntp_settings
            .clone()
            .ok_or_else(|| self.not_supported("failed to retrieve current NTP settings"))
    }

    ///
    /// Sets the NTP client of the host
    ///
    /// `port` is 1..=65535, `interval` is in minutes 60..=65535.
    ///
    pub async fn set_ntp(
        &self,
        enable: Option<bool>,
        server: Option<&str>,
        port: Option<u32>,
        interval: Option<u32>,
    ) -> Result<()> {
        if let Some(port) = port {
            if !(1..=65535).contains(&port) {
                return Err(self.invalid_parameter(format!(
                    "set_ntp: invalid NTP port {}, out of valid range 1...65535",
                    port
                )));
            }
        }
        if let Some(interval) = interval {
            if !(60..=65535).contains(&interval) {
                return Err(self.invalid_parameter(format!(
                    "set_ntp: invalid NTP interval {}, out of valid range 60...65535",
                    interval
                )));
            }
        }

        let mut param = self.ntp_settings().await?;
        if let Some(enable) = enable {
            self.set_path(&mut param, &["Ntp", "enable"], json!(on_off(enable)))?;
        }
        if let Some(server) = server {
            self.set_path(&mut param, &["Ntp", "server"], json!(server))?;
        }
        if let Some(port) = port {
            self.set_path(&mut param, &["Ntp", "port"], json!(port))?;
        }
        if let Some(interval) = interval {
            self.set_path(&mut param, &["Ntp", "interval"], json!(interval))?;
        }
        self.send_setting(&[setting("SetNtp", param)]).await
    }

    /// Makes the host synchronise its clock with NTP now
    pub async fn sync_ntp(&self) -> Result<()> {
        let mut param = self.ntp_settings().await?;
        self.set_path(&mut param, &["Ntp", "interval"], json!(0))?;
        self.send_setting(&[setting("SetNtp", param)]).await
    }

    ///
    /// Switches the ONVIF, RTMP and RTSP services
    ///
    /// The device drops all sessions when its ports change, so the session is expired and the
    /// ports are read again on a fresh login.
    ///
    pub async fn set_net_port(
        &self,
        enable_onvif: Option<bool>,
        enable_rtmp: Option<bool>,
        enable_rtsp: Option<bool>,
    ) -> Result<()> {
        if self.read_state().netport_settings.is_none() {
            self.get_host_data().await?;
        }
        let mut param = self
            .read_state()
            .netport_settings
            .clone()
            .ok_or_else(|| {
                self.not_supported("set_net_port: failed to retrieve current NetPort settings")
            })?;

        for (enable, key) in [
            (enable_onvif, "onvifEnable"),
            (enable_rtmp, "rtmpEnable"),
            (enable_rtsp, "rtspEnable"),
        ] {
            if let Some(enable) = enable {
                self.set_path(&mut param, &["NetPort", key], json!(on_off(enable)))?;
            }
        }
        let body = json!({"cmd": "SetNetPort", "param": param});
        self.send_setting(&[body]).await?;
        self.expire_session();
        self.get_state("GetNetPort").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::HostConfig;
    use assert_matches::assert_matches;

    fn host_with_channel() -> Host {
        let host = Host::new(HostConfig::new("cam", "admin", "pw").with_port(1, false));
        {
            let mut state = host.write_state();
            state.channels = vec![0];
            let ch = state.ch_mut(0);
            ch.whiteled = Some(json!({"WhiteLed": {"channel": 0, "state": 0}}));
            ch.isp = Some(json!({"Isp": {"channel": 0, "dayNight": "Auto"}}));
        }
        host
    }

    #[tokio::test]
    async fn test_unknown_channel() {
        let host = host_with_channel();
        assert_matches!(
            host.set_ir_lights(3, true).await,
            Err(Error::InvalidParameter { .. })
        );
    }

    #[tokio::test]
    async fn test_missing_block() {
        let host = host_with_channel();
        assert_matches!(
            host.set_ir_lights(0, true).await,
            Err(Error::NotSupported { .. })
        );
        assert_matches!(
            host.set_email(Some(0), true).await,
            Err(Error::NotSupported { .. })
        );
    }

    #[tokio::test]
    async fn test_range_checks() {
        let host = host_with_channel();
        assert_matches!(
            host.set_whiteled(0, true, 101, None).await,
            Err(Error::InvalidParameter { .. })
        );
        assert_matches!(
            host.set_whiteled(0, true, 50, Some(SpotlightMode::Adaptive)).await,
            Err(Error::InvalidParameter { .. })
        );
        assert_matches!(
            host.set_spotlight_lighting_schedule(0, 10, 0, 12, 0).await,
            Err(Error::InvalidParameter { .. })
        );
        assert_matches!(host.set_zoom(0, 34).await, Err(Error::InvalidParameter { .. }));
        assert_matches!(
            host.set_ptz_command(0, PtzCommand::ToPos, None, None).await,
            Err(Error::InvalidParameter { .. })
        );
        assert_matches!(
            host.set_osd(0, Some("Middle"), None, None).await,
            Err(Error::NotSupported { .. })
        );
        assert_matches!(
            host.set_ntp(None, None, Some(0), None).await,
            Err(Error::InvalidParameter { .. })
        );
        assert_matches!(
            host.set_ntp(None, None, None, Some(59)).await,
            Err(Error::InvalidParameter { .. })
        );
        assert_matches!(
            host.set_time(Some("YYYY-MM-DD"), None, None).await,
            Err(Error::InvalidParameter { .. })
        );
        assert_matches!(
            host.set_time(None, None, Some(50401)).await,
            Err(Error::InvalidParameter { .. })
        );
    }

    #[test]
    fn test_family_bodies() {
        let host = host_with_channel();
        {
            let mut state = host.write_state();
            state.channels = vec![0, 1];
            for channel in [0, 1] {
                state.ch_mut(channel).families.insert(
                    Family::Email,
                    super::super::state::FamilySettings {
                        settings: json!({"Email": {"schedule": {"enable": 0, "channel": channel}}}),
                        enabled: false,
                    },
                );
            }
            state.versions.email = 0;
        }
        let bodies = host.family_bodies("set_email", Family::Email, None, true).unwrap();
        assert_eq!(bodies.len(), 2);
        assert_eq!(bodies[1]["cmd"], "SetEmail");
        assert_eq!(bodies[1]["param"]["Email"]["schedule"]["enable"], 1);
        assert_eq!(bodies[1]["param"]["Email"]["schedule"]["channel"], 1);

        host.write_state().versions.email = 1;
        host.write_state()
            .ch_mut(0)
            .families
            .get_mut(&Family::Email)
            .unwrap()
            .settings = json!({"Email": {"enable": 0}});
        let bodies = host.family_bodies("set_email", Family::Email, None, true).unwrap();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["cmd"], "SetEmailV20");
        assert_eq!(bodies[0]["param"]["Email"]["enable"], 1);
    }

    #[test]
    fn test_set_path() {
        let host = host_with_channel();
        let mut value = json!({"Isp": {"dayNight": "Auto"}});
        host.set_path(&mut value, &["Isp", "dayNight"], json!("Color")).unwrap();
        assert_eq!(value["Isp"]["dayNight"], "Color");
        assert_matches!(
            host.set_path(&mut value, &["Enc", "audio"], json!(1)),
            Err(Error::UnexpectedData { .. })
        );
    }
}
