//! Builders for the command objects of a request batch and the per family command versions
//!
//! Every command is `{"cmd": name, "action": 0, "param": {...}}`, a batch is an array of these
//! and the reply array mirrors the batch one to one.
//!
use serde_json::{json, Value};

/// A command addressed to one channel
pub(crate) fn channel_cmd(cmd: &str, channel: u8) -> Value {
    json!({"cmd": cmd, "action": 0, "param": {"channel": channel}})
}

/// A host level command without parameters
pub(crate) fn host_cmd(cmd: &str) -> Value {
    json!({"cmd": cmd, "action": 0, "param": {}})
}

/// The motion alarm settings of a channel
pub(crate) fn alarm_cmd(channel: u8) -> Value {
    json!({"cmd": "GetAlarm", "action": 0, "param": {"Alarm": {"channel": channel, "type": "md"}}})
}

/// The batch that reads the host settings and capabilities
pub(crate) fn host_data_batch(username: &str) -> Vec<Value> {
    vec![
        json!({"cmd": "Getchannelstatus"}),
        host_cmd("GetDevInfo"),
        host_cmd("GetLocalLink"),
        host_cmd("GetNetPort"),
        host_cmd("GetHddInfo"),
        host_cmd("GetUser"),
        host_cmd("GetNtp"),
        host_cmd("GetTime"),
        ability_cmd(username),
    ]
}

fn ability_cmd(username: &str) -> Value {
    json!({"cmd": "GetAbility", "action": 0, "param": {"User": {"userName": username}}})
}

/// Host level commands that [`super::Host::get_state`] knows how to build
pub(crate) fn host_state_cmd(cmd: &str, username: &str) -> Option<Value> {
    match cmd {
        "Getchannelstatus" | "GetChannelstatus" => Some(json!({"cmd": "Getchannelstatus"})),
        "GetDevInfo" | "GetLocalLink" | "GetNetPort" | "GetHddInfo" | "GetUser" | "GetNtp"
        | "GetTime" => Some(host_cmd(cmd)),
        "GetAbility" => Some(ability_cmd(username)),
        _ => None,
    }
}

/// The settings families that exist in a legacy and a `V20` variant
///
/// The legacy variant nests the switch as `X.schedule.enable`, the `V20` one has `X.enable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Family {
    Email,
    Push,
    Ftp,
    Rec,
    AudioAlarm,
}

impl Family {
    pub(crate) const ALL: [Family; 5] = [
        Family::Email,
        Family::Push,
        Family::Ftp,
        Family::Rec,
        Family::AudioAlarm,
    ];

    fn base(&self) -> &'static str {
        match self {
            Family::Email => "Email",
            Family::Push => "Push",
            Family::Ftp => "Ftp",
            Family::Rec => "Rec",
            Family::AudioAlarm => "AudioAlarm",
        }
    }

    /// The key of the settings block inside `value`
    pub(crate) fn key(&self) -> &'static str {
        match self {
            Family::AudioAlarm => "Audio",
            other => other.base(),
        }
    }

    pub(crate) fn get_cmd(&self, version: i64) -> String {
        if version >= 1 {
            format!("Get{}V20", self.base())
        } else {
            format!("Get{}", self.base())
        }
    }

    pub(crate) fn set_cmd(&self, version: i64) -> String {
        if version >= 1 {
            format!("Set{}V20", self.base())
        } else {
            format!("Set{}", self.base())
        }
    }

    /// Recognises the family and whether the command is the `V20` variant
    pub(crate) fn from_cmd(cmd: &str) -> Option<(Family, bool)> {
        let name = cmd.strip_prefix("Get").or_else(|| cmd.strip_prefix("Set"))?;
        let (base, v20) = match name.strip_suffix("V20") {
            Some(base) => (base, true),
            None => (name, false),
        };
        Family::ALL
            .iter()
            .find(|family| family.base() == base)
            .map(|family| (*family, v20))
    }
}

/// Which variant of the versioned commands a host speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiVersions {
    /// `GetEvents` is available when 1 or more
    pub getevents: i64,
    /// Email settings version
    pub email: i64,
    /// Recording settings version
    pub rec: i64,
    /// FTP settings version
    pub ftp: i64,
    /// Push settings version
    pub push: i64,
    /// Audio alarm settings version
    pub alarm: i64,
}

impl Default for ApiVersions {
    fn default() -> Self {
        Self {
            getevents: 0,
            email: 1,
            rec: 1,
            ftp: 1,
            push: 1,
            alarm: 1,
        }
    }
}

impl ApiVersions {
    /// The version of a settings family
    pub(crate) fn of(&self, family: Family) -> i64 {
        match family {
            Family::Email => self.email,
            Family::Push => self.push,
            Family::Ftp => self.ftp,
            Family::Rec => self.rec,
            Family::AudioAlarm => self.alarm,
        }
    }

    pub(crate) fn set(&mut self, family: Family, version: i64) {
        match family {
            Family::Email => self.email = version,
            Family::Push => self.push = version,
            Family::Ftp => self.ftp = version,
            Family::Rec => self.rec = version,
            Family::AudioAlarm => self.alarm = version,
        }
    }

    /// The `Get` command of a family this host answers
    pub(crate) fn get_cmd(&self, family: Family) -> String {
        family.get_cmd(self.of(family))
    }

    /// The `Set` command of a family this host answers
    pub(crate) fn set_cmd(&self, family: Family) -> String {
        family.set_cmd(self.of(family))
    }
}

/// Channel commands that [`super::Host::get_state`] knows how to build
pub(crate) fn channel_state_cmd(cmd: &str, channel: u8, versions: &ApiVersions) -> Option<Value> {
    match cmd {
        "GetEnc" | "GetIsp" | "GetIrLights" | "GetPowerLed" | "GetWhiteLed" | "GetPtzPreset"
        | "GetAutoFocus" | "GetZoomFocus" | "GetOsd" => Some(channel_cmd(cmd, channel)),
        "GetAlarm" => Some(alarm_cmd(channel)),
        _ => match Family::from_cmd(cmd) {
            Some((family, _)) if cmd.starts_with("Get") => {
                Some(channel_cmd(&versions.get_cmd(family), channel))
            }
            _ => None,
        },
    }
}

/// The first command name of a batch
pub(crate) fn batch_cmd(body: &[Value]) -> String {
    body.first()
        .and_then(|cmd| cmd.get("cmd"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_from_cmd() {
        assert_eq!(Family::from_cmd("GetEmailV20"), Some((Family::Email, true)));
        assert_eq!(Family::from_cmd("SetAudioAlarm"), Some((Family::AudioAlarm, false)));
        assert_eq!(Family::from_cmd("GetRec"), Some((Family::Rec, false)));
        assert_eq!(Family::from_cmd("GetEnc"), None);
        assert_eq!(Family::AudioAlarm.key(), "Audio");
    }

    #[test]
    fn test_version_selects_command() {
        let mut versions = ApiVersions::default();
        assert_eq!(versions.get_cmd(Family::Email), "GetEmailV20");
        versions.set(Family::Email, 0);
        assert_eq!(versions.get_cmd(Family::Email), "GetEmail");
        assert_eq!(versions.set_cmd(Family::Email), "SetEmail");
        assert_eq!(versions.set_cmd(Family::Ftp), "SetFtpV20");
    }

    #[test]
    fn test_channel_state_cmd() {
        let mut versions = ApiVersions::default();
        versions.push = 0;
        let cmd = channel_state_cmd("GetPushV20", 3, &versions).unwrap();
        assert_eq!(cmd["cmd"], "GetPush");
        assert_eq!(cmd["param"]["channel"], 3);

        let alarm = channel_state_cmd("GetAlarm", 1, &versions).unwrap();
        assert_eq!(alarm["param"]["Alarm"]["type"], "md");

        assert!(channel_state_cmd("GetNetPort", 0, &versions).is_none());
        assert!(channel_state_cmd("SetPush", 0, &versions).is_none());
    }
}
