use super::commands::{self, channel_cmd, Family};
use super::model::Reply;
use super::Host;
use crate::{Error, Result};
use log::*;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// A batch of channel commands and the channel each one is for
#[derive(Default)]
struct ChannelBatch {
    body: Vec<Value>,
    channels: Vec<u8>,
}

impl ChannelBatch {
    fn push(&mut self, channel: u8, cmd: Value) {
        self.body.push(cmd);
        self.channels.push(channel);
    }

    fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

impl Host {
    fn no_data(&self, what: &str) -> Error {
        Error::NoData {
            host: self.host().to_string(),
            why: format!("returned no data when obtaining {}", what),
        }
    }

    /// Sends a batch that must be answered with at least one element
    async fn query(&self, body: &[Value], what: &str) -> Result<Vec<Value>> {
        let replies = self.send_json(body).await?;
        if replies.is_empty() {
            return Err(self.no_data(what));
        }
        Ok(replies)
    }

    async fn query_channels(&self, batch: &ChannelBatch, what: &str) -> Result<Vec<Value>> {
        let replies = self.query(&batch.body, what).await?;
        let ctx = self.map_context();
        self.write_state()
            .map_channels_response(&ctx, &replies, &batch.channels);
        Ok(replies)
    }

    ///
    /// Reads the device identity, channels, ports and capabilities
    ///
    /// This has to be called once before the per channel commands. It also settles which
    /// variant of the versioned commands the device answers.
    ///
    pub async fn get_host_data(&self) -> Result<()> {
        let body = commands::host_data_batch(self.username());
        let replies = self.query(&body, "host-settings").await?;
        let ctx = self.map_context();
        self.write_state().map_host_response(&ctx, &replies);

        let mut batch = ChannelBatch::default();
        {
            let state = self.read_state();
            for &channel in &state.channels {
                // GetAiState captures the AI capabilities
                for cmd in ["GetAiState", "GetEvents", "GetRtspUrl"] {
                    batch.push(channel, channel_cmd(cmd, channel));
                }
                // GetAbility is not reliable, ask for the V20 commands and see which get answered
                for family in Family::ALL {
                    if state.versions.of(family) >= 1 {
                        batch.push(channel, channel_cmd(&family.get_cmd(1), channel));
                    }
                }
            }
        }
        if batch.is_empty() {
            return Ok(());
        }

        let replies = self.query_channels(&batch, "initial channel-settings").await?;
        // All channels of a host are assumed to speak the same command versions
        self.write_state().apply_version_probe(&replies);
        Ok(())
    }

    /// Refreshes the states and settings of every channel
    pub async fn get_states(&self) -> Result<()> {
        let mut batch = ChannelBatch::default();
        {
            let state = self.read_state();
            let versions = state.versions;
            for &channel in &state.channels {
                for cmd in ["GetEnc", "GetIsp", "GetIrLights", "GetPowerLed", "GetWhiteLed", "GetOsd"] {
                    batch.push(channel, channel_cmd(cmd, channel));
                }
                if versions.getevents >= 1 {
                    batch.push(channel, channel_cmd("GetEvents", channel));
                } else {
                    batch.push(channel, channel_cmd("GetAiState", channel));
                    if versions.alarm >= 1 {
                        batch.push(channel, channel_cmd("GetMdState", channel));
                    } else {
                        batch.push(channel, commands::alarm_cmd(channel));
                    }
                }

                let pan_tilt = state.pan_tilt_supported(channel);
                let zoom = state.zoom_supported(channel);
                if pan_tilt {
                    batch.push(channel, channel_cmd("GetPtzPreset", channel));
                }
                if zoom {
                    batch.push(channel, channel_cmd("GetZoomFocus", channel));
                }
                if pan_tilt && zoom {
                    batch.push(channel, channel_cmd("GetAutoFocus", channel));
                }

                for family in Family::ALL {
                    batch.push(channel, channel_cmd(&versions.get_cmd(family), channel));
                }
            }
        }
        if batch.is_empty() {
            return Ok(());
        }
        self.query_channels(&batch, "channel-state").await?;
        Ok(())
    }

    ///
    /// Refreshes the state a single `Get` command reads
    ///
    /// Channel commands are sent for every channel, host commands once. The versioned
    /// families accept either variant of the name and send the one the device speaks.
    /// Unknown commands are ignored.
    ///
    pub async fn get_state(&self, cmd: &str) -> Result<()> {
        let mut batch = ChannelBatch::default();
        {
            let state = self.read_state();
            for &channel in &state.channels {
                if let Some(body) = commands::channel_state_cmd(cmd, channel, &state.versions) {
                    batch.push(channel, body);
                }
            }
        }

        if !batch.is_empty() {
            self.query_channels(&batch, &format!("get_state response for cmd '{}'", cmd))
                .await?;
        } else if let Some(body) = commands::host_state_cmd(cmd, self.username()) {
            let replies = self
                .query(&[body], &format!("get_state response for cmd '{}'", cmd))
                .await?;
            let ctx = self.map_context();
            self.write_state().map_host_response(&ctx, &replies);
        }
        Ok(())
    }

    async fn query_motion(&self, channel: u8, body: &[Value]) -> Result<bool> {
        let replies = match self.send_json(body).await {
            Ok(replies) => replies,
            Err(e @ Error::InvalidContentType { .. }) => {
                error!(
                    "{}: error translating motion state response for channel {}: {}",
                    self.host(),
                    channel,
                    e
                );
                return Ok(false);
            }
            Err(e) => return Err(e),
        };
        if replies.is_empty() {
            error!(
                "{}: error obtaining motion state response for channel {}",
                self.host(),
                channel
            );
            return Ok(false);
        }
        let ctx = self.map_context();
        let mut state = self.write_state();
        for reply in &replies {
            state.map_channel_response(&ctx, reply, channel);
        }
        Ok(true)
    }

    fn reset_motion(&self, channel: u8, ai: bool) {
        let mut state = self.write_state();
        let ch = state.ch_mut(channel);
        ch.motion = Some(false);
        if ai {
            ch.ai_state.clear();
        }
    }

    /// Polls the motion state of a channel, `None` for an unknown channel
    pub async fn get_motion_state(&self, channel: u8) -> Result<Option<bool>> {
        if !self.read_state().has_channel(channel) {
            return Ok(None);
        }
        let body = [channel_cmd("GetMdState", channel)];
        if !self.query_motion(channel, &body).await? {
            self.reset_motion(channel, false);
        }
        Ok(self.read_state().ch(channel).and_then(|ch| ch.motion))
    }

    /// Polls the AI detection states of a channel, `None` for an unknown channel
    pub async fn get_ai_state(&self, channel: u8) -> Result<Option<BTreeMap<String, bool>>> {
        if !self.read_state().has_channel(channel) {
            return Ok(None);
        }
        let body = [channel_cmd("GetAiState", channel)];
        if !self.query_motion(channel, &body).await? {
            self.write_state().ch_mut(channel).ai_state.clear();
            return Ok(None);
        }
        Ok(self.read_state().ch(channel).map(|ch| ch.ai_state.clone()))
    }

    /// Polls motion, AI and visitor states of a channel in one request
    pub async fn get_all_motion_states(&self, channel: u8) -> Result<Option<bool>> {
        let body = {
            let state = self.read_state();
            if !state.has_channel(channel) {
                return Ok(None);
            }
            if state.versions.getevents >= 1 {
                vec![channel_cmd("GetEvents", channel)]
            } else {
                vec![
                    channel_cmd("GetMdState", channel),
                    channel_cmd("GetAiState", channel),
                ]
            }
        };
        if !self.query_motion(channel, &body).await? {
            self.reset_motion(channel, true);
        }
        Ok(self.read_state().ch(channel).and_then(|ch| ch.motion))
    }

    /// Polls motion, AI and visitor states of all channels in one request
    ///
    /// Returns false if the reply could not be read, all states are then reset.
    pub async fn get_motion_state_all_ch(&self) -> Result<bool> {
        let mut batch = ChannelBatch::default();
        let channels = {
            let state = self.read_state();
            for &channel in &state.channels {
                if state.versions.getevents >= 1 {
                    batch.push(channel, channel_cmd("GetEvents", channel));
                } else {
                    batch.push(channel, channel_cmd("GetMdState", channel));
                    batch.push(channel, channel_cmd("GetAiState", channel));
                }
            }
            state.channels.clone()
        };
        if batch.is_empty() {
            return Ok(true);
        }

        let failure = match self.send_json(&batch.body).await {
            Ok(replies) if !replies.is_empty() => {
                let ctx = self.map_context();
                self.write_state()
                    .map_channels_response(&ctx, &replies, &batch.channels);
                return Ok(true);
            }
            Ok(_) => "no data".to_string(),
            Err(e @ Error::InvalidContentType { .. }) => e.to_string(),
            Err(e) => return Err(e),
        };
        error!(
            "{}: error obtaining all motion states: {}",
            self.host(),
            failure
        );
        for channel in channels {
            self.reset_motion(channel, true);
        }
        Ok(false)
    }

    ///
    /// Sends a command that changes a setting and checks that the device applied it
    ///
    /// The device must answer `code` 0 and `rspCode` 200. A `Set` command is followed by the
    /// matching `Get` so that the cached state reflects the change.
    ///
    pub async fn send_setting(&self, body: &[Value]) -> Result<()> {
        let command = commands::batch_cmd(body);
        debug!("{}: sending command {}", self.host(), command);

        let replies = self.send_json(body).await?;
        let reply = replies
            .first()
            .ok_or_else(|| self.no_data(&format!("response for command '{}'", command)))?;
        let unexpected = || Error::UnexpectedData {
            host: self.host().to_string(),
            why: format!("received an unexpected response from command '{}': {}", command, reply),
        };
        let parsed = Reply::deserialize(reply).map_err(|_| unexpected())?;

        if parsed.code != 0 {
            let error = parsed.error.ok_or_else(unexpected)?;
            return Err(Error::Api {
                host: self.host().to_string(),
                cmd: command,
                rsp_code: error.rsp_code,
                detail: error.detail,
            });
        }
        let rsp_code = parsed
            .value
            .get("rspCode")
            .and_then(Value::as_i64)
            .ok_or_else(unexpected)?;
        if rsp_code != 200 {
            return Err(Error::Api {
                host: self.host().to_string(),
                cmd: command,
                rsp_code,
                detail: parsed
                    .value
                    .get("detail")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            });
        }

        if let Some(name) = command.strip_prefix("Set") {
            self.get_state(&format!("Get{}", name)).await?;
        }
        Ok(())
    }

    /// The version of a newer firmware if the device found one
    pub async fn check_new_firmware(&self) -> Result<Option<String>> {
        let replies = self
            .query(&[json!({"cmd": "CheckFirmware"})], "CheckFirmware response")
            .await?;
        let new_firmware = replies[0]
            .get("value")
            .and_then(|value| value.get("newFirmware"))
            .ok_or_else(|| Error::UnexpectedData {
                host: self.host().to_string(),
                why: format!("CheckFirmware without newFirmware: {}", replies[0]),
            })?;
        Ok(match new_firmware {
            Value::Number(n) if n.as_i64() == Some(0) => None,
            Value::String(version) => Some(version.clone()),
            other => Some(other.to_string()),
        })
    }

    /// Starts the online upgrade to the firmware [`Host::check_new_firmware`] found
    pub async fn update_firmware(&self) -> Result<()> {
        self.send_setting(&[json!({"cmd": "UpgradeOnline"})]).await
    }

    /// Percentage of a running firmware upgrade, `None` when no upgrade runs
    pub async fn update_progress(&self) -> Result<Option<i64>> {
        let replies = self
            .query(&[json!({"cmd": "UpgradeStatus"})], "update progress response")
            .await?;
        let reply = &replies[0];
        if reply.get("code").and_then(Value::as_i64) != Some(0) {
            return Ok(None);
        }
        reply
            .pointer("/value/Status/Persent")
            .and_then(Value::as_i64)
            .map(Some)
            .ok_or_else(|| Error::UnexpectedData {
                host: self.host().to_string(),
                why: format!("UpgradeStatus without progress: {}", reply),
            })
    }
}
