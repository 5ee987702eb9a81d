//! Urls of live and recorded streams, snapshots and the recording search
use super::enums::{Protocol, RtmpAuth, StreamKind, VodRequestType};
use super::model::{Reply, SearchFile, SearchStatus, SearchValue};
use super::{Expect, Host, Request};
use crate::utils::{datetime_to_reolink_time, quote};
use crate::{Error, Result};
use bytes::Bytes;
use log::*;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use serde_json::{json, Value};
use time::PrimitiveDateTime;

const DEFAULT_RTMP_PORT: u16 = 1935;
const DEFAULT_RTSP_PORT: u16 = 554;

/// The mime type of every playback url
pub const VOD_MIME: &str = "application/x-mpegURL";

/// A playback url for a recording and the mime type to announce it with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VodSource {
    /// Mime type of the stream
    pub mime: &'static str,
    /// The url, credentials included
    pub url: String,
}

impl Host {
    fn stream_rtmp_port(&self) -> u16 {
        self.read_state()
            .net_port
            .as_ref()
            .map(|p| p.rtmp_port)
            .unwrap_or(DEFAULT_RTMP_PORT)
    }

    fn stream_rtsp_port(&self) -> u16 {
        self.read_state()
            .net_port
            .as_ref()
            .map(|p| p.rtsp_port)
            .unwrap_or(DEFAULT_RTSP_PORT)
    }

    fn is_known_channel(&self, channel: u8) -> bool {
        self.read_state().has_channel(channel)
    }

    /// `scheme://host:port` of the web port, optionally as seen from outside
    fn web_url(&self, external: bool) -> String {
        let endpoint = self.endpoint();
        let scheme = if endpoint.use_https.unwrap_or(false) {
            "https"
        } else {
            "http"
        };
        let config = &self.config;
        let host = match (&config.external_host, external) {
            (Some(host), true) => host.as_str(),
            _ => self.host(),
        };
        let port = match (config.external_port, external) {
            (Some(port), true) => Some(port),
            _ => endpoint.port,
        };
        match port {
            Some(port) => format!("{}://{}:{}", scheme, host, port),
            None => format!("{}://{}", scheme, host),
        }
    }

    /// HTTP-FLV url of a live stream, `None` for an unknown channel
    pub fn get_flv_stream_source(&self, channel: u8, stream: Option<StreamKind>) -> Option<String> {
        if !self.is_known_channel(channel) {
            return None;
        }
        let stream = stream.unwrap_or(self.config.stream);
        Some(format!(
            "{}/flv?port={}&app=bcs&stream=channel{}_{}.bcs&user={}&password={}",
            self.base_url(),
            self.stream_rtmp_port(),
            channel,
            stream,
            self.username(),
            quote(self.password())
        ))
    }

    ///
    /// Rtmp url of a live stream, `None` for an unknown channel
    ///
    /// With [`RtmpAuth::Token`] the url carries the current session token and stops working
    /// when the session ends.
    ///
    pub fn get_rtmp_stream_source(&self, channel: u8, stream: Option<StreamKind>) -> Option<String> {
        if !self.is_known_channel(channel) {
            return None;
        }
        let stream = stream.unwrap_or(self.config.stream);
        let auth = match self.config.rtmp_auth {
            RtmpAuth::Password => format!(
                "user={}&password={}",
                self.username(),
                quote(self.password())
            ),
            RtmpAuth::Token => format!("token={}", self.token().unwrap_or_default()),
        };
        Some(format!(
            "rtmp://{}:{}/bcs/channel{}_{}.bcs?channel={}&stream={}&{}",
            self.host(),
            self.stream_rtmp_port(),
            channel,
            stream,
            channel,
            stream.rtmp_index(),
            auth
        ))
    }

    ///
    /// Rtsp url of a live stream
    ///
    /// The urls reported by the device are preferred. Otherwise the url is built from the
    /// encoder settings, which name the codec of the stream.
    ///
    pub async fn get_rtsp_stream_source(
        &self,
        channel: u8,
        stream: Option<StreamKind>,
    ) -> Result<Option<String>> {
        let stream = stream.unwrap_or(self.config.stream);
        {
            let state = self.read_state();
            let reported = state.ch(channel).and_then(|ch| match stream {
                StreamKind::Main => ch.rtsp_main.clone(),
                StreamKind::Sub => ch.rtsp_sub.clone(),
                StreamKind::Ext => None,
            });
            if reported.is_some() {
                return Ok(reported);
            }
        }

        let has_enc = {
            let state = self.read_state();
            state.channel.values().any(|ch| ch.enc.is_some())
        };
        if !has_enc {
            if let Err(e) = self.get_state("GetEnc").await {
                debug!("{}: could not read the encoder settings: {}", self.host(), e);
                return Ok(None);
            }
        }
        if !self.is_known_channel(channel) {
            return Ok(None);
        }

        let encoding = {
            let state = self.read_state();
            let pointer = format!("/Enc/{}Stream", stream);
            let stream_enc = state
                .ch(channel)
                .and_then(|ch| ch.enc.as_ref())
                .and_then(|enc| enc.pointer(&pointer));
            match stream_enc {
                None => return Ok(None),
                Some(stream_enc) => stream_enc
                    .get("vType")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            }
        };

        Ok(Some(format!(
            "rtsp://{}:{}@{}:{}/{}Preview_{:02}_{}",
            self.username(),
            quote(self.password()),
            self.host(),
            self.stream_rtsp_port(),
            encoding,
            channel as u16 + 1,
            stream
        )))
    }

    /// The live stream url in the configured protocol, logs in first
    pub async fn get_stream_source(
        &self,
        channel: u8,
        stream: Option<StreamKind>,
    ) -> Result<Option<String>> {
        self.login().await?;
        match self.config.protocol {
            Protocol::Rtmp => Ok(self.get_rtmp_stream_source(channel, stream)),
            Protocol::Rtsp => self.get_rtsp_stream_source(channel, stream).await,
            Protocol::Flv => Ok(self.get_flv_stream_source(channel, stream)),
        }
    }

    ///
    /// A playback url for a recording found by [`Host::request_vod_files`]
    ///
    /// NVRs only play back over HTTP-FLV. Cameras use rtmp locally and the `Playback` command
    /// from outside, unless `request_type` picks one. `external` builds the url with the
    /// external host and port of the config.
    ///
    pub async fn get_vod_source(
        &self,
        channel: u8,
        filename: &str,
        external: bool,
        stream: Option<StreamKind>,
        request_type: Option<VodRequestType>,
    ) -> Result<Option<VodSource>> {
        if !self.is_known_channel(channel) {
            return Ok(None);
        }
        self.login().await?;

        let request_type = request_type.unwrap_or(if self.read_state().is_nvr {
            VodRequestType::Flv
        } else if external {
            VodRequestType::Playback
        } else {
            VodRequestType::Rtmp
        });
        let stream = stream.unwrap_or(self.config.stream);
        let user = self.username();
        let password = quote(self.password());

        let url = match request_type {
            // type=1 asks for mp4 inside the flv container
            VodRequestType::Flv => format!(
                "{}/flv?port={}&app=bcs&stream=playback.bcs&channel={}&type=1&start={}&seek=0&user={}&password={}",
                self.web_url(external),
                DEFAULT_RTMP_PORT,
                channel,
                filename,
                user,
                password
            ),
            VodRequestType::Playback => format!(
                "{}/cgi-bin/api.cgi?cmd=Playback&channel={}&source={}&user={}&password={}",
                self.web_url(external),
                channel,
                filename,
                user,
                password
            ),
            // Slashes in file names are sent as %20
            VodRequestType::Rtmp => format!(
                "rtmp://{}:{}/vod/{}?channel={}&stream={}&user={}&password={}",
                self.host(),
                self.stream_rtmp_port(),
                filename.replace('/', "%20"),
                channel,
                stream.rtmp_index(),
                user,
                password
            ),
        };
        Ok(Some(VodSource {
            mime: VOD_MIME,
            url,
        }))
    }

    ///
    /// Fetches a still image of a channel as JPEG
    ///
    /// `None` when the device answered with an empty image, the session is expired in that
    /// case since the devices do this when the session went bad.
    ///
    pub async fn get_snapshot(&self, channel: u8) -> Result<Option<Bytes>> {
        if !self.is_known_channel(channel) {
            return Err(self.invalid_parameter(format!(
                "get_snapshot: no camera connected to channel '{}'",
                channel
            )));
        }
        let rs: String = thread_rng()
            .sample_iter(&Alphanumeric)
            .take(16)
            .map(char::from)
            .collect();
        let request = Request::get(
            "Snap",
            vec![("channel", channel.to_string()), ("rs", rs)],
        )
        .expect(Expect::Mime("image/jpeg"));

        let data = self.send(&request).await?.into_bytes();
        if data.is_empty() {
            error!(
                "{}: error obtaining still image for channel {}",
                self.host(),
                channel
            );
            self.expire_session();
            return Ok(None);
        }
        Ok(Some(data))
    }

    ///
    /// Searches the recordings of a channel between `start` and `end`
    ///
    /// Returns the months and days that have recordings and, unless `status_only` is set,
    /// the recordings themselves.
    ///
    pub async fn request_vod_files(
        &self,
        channel: u8,
        start: PrimitiveDateTime,
        end: PrimitiveDateTime,
        status_only: bool,
        stream: Option<StreamKind>,
    ) -> Result<(Vec<SearchStatus>, Option<Vec<SearchFile>>)> {
        if !self.is_known_channel(channel) {
            return Err(self.invalid_parameter(format!(
                "request_vod_files: no camera connected to channel '{}'",
                channel
            )));
        }
        let stream = stream.unwrap_or(self.config.stream);
        let body = [json!({
            "cmd": "Search",
            "action": 0,
            "param": {"Search": {
                "channel": channel,
                "onlyStatus": if status_only { 1 } else { 0 },
                "streamType": stream.as_str(),
                "StartTime": datetime_to_reolink_time(&start),
                "EndTime": datetime_to_reolink_time(&end),
            }},
        })];

        let replies = self.send_json(&body).await?;
        let first = replies.into_iter().next().ok_or_else(|| Error::NoData {
            host: self.host().to_string(),
            why: "returned no data for the Search command".to_string(),
        })?;
        let reply: Reply = serde_json::from_value(first)?;
        if reply.code != 0 {
            let (rsp_code, detail) = reply
                .error
                .map(|e| (e.rsp_code, e.detail))
                .unwrap_or((-1, String::new()));
            return Err(Error::Api {
                host: self.host().to_string(),
                cmd: reply.cmd,
                rsp_code,
                detail,
            });
        }
        let value: SearchValue =
            serde_json::from_value(reply.value).map_err(|e| Error::UnexpectedData {
                host: self.host().to_string(),
                why: format!("unexpected reply to the Search command: {}", e),
            })?;
        let result = value.search_result;
        if status_only {
            Ok((result.status, None))
        } else {
            Ok((result.status, result.file))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{HostConfig, NetPort};

    fn host(config: HostConfig) -> Host {
        let host = Host::new(config);
        {
            let mut state = host.write_state();
            state.channels = vec![0];
            state.net_port = Some(NetPort {
                rtsp_port: 554,
                rtmp_port: 1935,
                onvif_port: 8000,
                rtsp_enable: 1,
                rtmp_enable: 1,
                onvif_enable: 1,
            });
        }
        host
    }

    #[test]
    fn test_rtmp_urls() {
        let host = host(HostConfig::new("cam", "admin", "p@ss").with_port(80, false));
        assert_eq!(
            host.get_rtmp_stream_source(0, None).as_deref(),
            Some("rtmp://cam:1935/bcs/channel0_sub.bcs?channel=0&stream=1&user=admin&password=p%40ss")
        );
        assert_eq!(
            host.get_rtmp_stream_source(0, Some(StreamKind::Main)).as_deref(),
            Some("rtmp://cam:1935/bcs/channel0_main.bcs?channel=0&stream=0&user=admin&password=p%40ss")
        );
        assert!(host.get_rtmp_stream_source(1, None).is_none());
    }

    #[test]
    fn test_flv_url() {
        let host = host(HostConfig::new("cam", "admin", "pw").with_port(443, true));
        assert_eq!(
            host.get_flv_stream_source(0, Some(StreamKind::Main)).as_deref(),
            Some("https://cam:443/flv?port=1935&app=bcs&stream=channel0_main.bcs&user=admin&password=pw")
        );
    }

    #[tokio::test]
    async fn test_rtsp_from_encoder() {
        let host = host(HostConfig::new("cam", "admin", "pw").with_port(80, false));
        host.write_state().ch_mut(0).enc = Some(json!({"Enc": {
            "channel": 0,
            "mainStream": {"vType": "h265"},
            "subStream": {"vType": "h264"},
        }}));
        assert_eq!(
            host.get_rtsp_stream_source(0, Some(StreamKind::Main))
                .await
                .unwrap()
                .as_deref(),
            Some("rtsp://admin:pw@cam:554/h265Preview_01_main")
        );
        host.write_state().ch_mut(0).rtsp_sub = Some("rtsp://admin:pw@cam:554/reported".to_string());
        assert_eq!(
            host.get_rtsp_stream_source(0, Some(StreamKind::Sub))
                .await
                .unwrap()
                .as_deref(),
            Some("rtsp://admin:pw@cam:554/reported")
        );
    }

    #[test]
    fn test_web_url_external() {
        let host = host(
            HostConfig::new("cam", "admin", "pw")
                .with_port(80, false)
                .with_external(Some("example.org".to_string()), Some(8080)),
        );
        assert_eq!(host.web_url(false), "http://cam:80");
        assert_eq!(host.web_url(true), "http://example.org:8080");
    }
}
