use super::{Baichuan, BcRequest};
use crate::bc::{model::*, xml::*};
use crate::Result;

/// Identity of the device as reported over Baichuan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Model name e.g. `RLC-811A`
    pub model: Option<String>,
    /// Hardware version e.g. `IPC_523128M8MP`
    pub hardware_version: Option<String>,
    /// Firmware version e.g. `v3.1.0.989_22051908`
    pub sw_version: Option<String>,
    /// Item number
    pub item_number: Option<String>,
}

impl Baichuan {
    /// Get the device info of the host
    pub async fn get_info(&self) -> Result<DeviceInfo> {
        let reply = self.send(BcRequest::new(MSG_ID_DEVICE_INFO, "")).await?;
        let keys = get_keys_from_xml(
            &reply,
            &["type", "hardwareVersion", "firmwareVersion", "itemNo"],
        )?;
        let info = DeviceInfo {
            model: keys.get("type").cloned(),
            hardware_version: keys.get("hardwareVersion").cloned(),
            sw_version: keys.get("firmwareVersion").cloned(),
            item_number: keys.get("itemNo").cloned(),
        };
        *self.dev_info.write().unwrap_or_else(|e| e.into_inner()) = info.clone();
        Ok(info)
    }

    /// The device info fetched by the last [`Baichuan::get_info`]
    pub fn device_info(&self) -> DeviceInfo {
        self.dev_info.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Get a channel list containing the UIDs
    ///
    /// NVRs push this message on connect, requesting it is not always allowed
    pub async fn get_channel_uids(&self) -> Result<String> {
        self.send(BcRequest::new(MSG_ID_CHANNEL_UIDS, "")).await
    }

    /// Get the wifi signal of the host
    pub async fn get_wifi_signal(&self) -> Result<String> {
        self.send(BcRequest::new(MSG_ID_WIFI_SIGNAL, "")).await
    }
}
