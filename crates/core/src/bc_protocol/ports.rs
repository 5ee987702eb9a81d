use super::{Baichuan, BcRequest};
use crate::bc::{model::*, xml::*};
use crate::Result;
use std::collections::BTreeMap;

/// The network services of a camera that can be switched on or off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortType {
    /// The HTTP API
    Http,
    /// The HTTPS API
    Https,
    /// RTMP streaming
    Rtmp,
    /// RTSP streaming
    Rtsp,
    /// ONVIF
    Onvif,
}

impl PortType {
    fn key(&self) -> &'static str {
        match self {
            PortType::Http => "http",
            PortType::Https => "https",
            PortType::Rtmp => "rtmp",
            PortType::Rtsp => "rtsp",
            PortType::Onvif => "onvif",
        }
    }

    /// The XML element of this service, e.g. `HttpPort`
    fn xml_tag(&self) -> String {
        let key = self.key();
        format!("{}{}Port", key[..1].to_uppercase(), &key[1..])
    }
}

/// Port number and on/off state of a service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PortState {
    /// The port the service listens on
    pub port: Option<u16>,
    /// Whether the service is switched on
    pub enabled: Option<bool>,
}

impl Baichuan {
    /// Get the HTTP(S)/RTSP/RTMP/ONVIF port state
    pub async fn get_ports(&self) -> Result<BTreeMap<String, PortState>> {
        let reply = self.send(BcRequest::new(MSG_ID_GET_PORTS, "")).await?;
        let ports = parse_ports(&reply)?;

        let states = ports
            .iter()
            .map(|(name, values)| (name.clone(), port_state(values)))
            .collect();
        *self.ports.write().unwrap_or_else(|e| e.into_inner()) = ports;
        Ok(states)
    }

    /// Switch one of the services on or off
    pub async fn set_port_enabled(&self, port: PortType, enable: bool) -> Result<()> {
        let xml = port_enable_xml(&port.xml_tag(), enable)?;
        let body = String::from_utf8_lossy(&xml);
        self.send(BcRequest::new(MSG_ID_SET_PORTS, &body)).await?;
        Ok(())
    }

    /// The last known state of a service, as fetched by [`Baichuan::get_ports`]
    pub fn port_state(&self, port: PortType) -> PortState {
        self.ports
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(port.key())
            .map(port_state)
            .unwrap_or_default()
    }
}

fn port_state(values: &BTreeMap<String, i64>) -> PortState {
    PortState {
        port: values.get("port").and_then(|p| u16::try_from(*p).ok()),
        enabled: values.get("enable").map(|e| *e == 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bc_protocol::tests::fake_camera;

    #[test]
    fn test_xml_tag() {
        assert_eq!(PortType::Https.xml_tag(), "HttpsPort");
        assert_eq!(PortType::Onvif.xml_tag(), "OnvifPort");
    }

    #[tokio::test]
    async fn test_get_and_set_ports() {
        let (port, camera) = fake_camera(
            "secret",
            vec![(
                MSG_ID_GET_PORTS,
                "<?xml version=\"1.0\" encoding=\"UTF-8\" ?><body><RtspPort version=\"1.1\"><rtspPort>554</rtspPort><enable>1</enable></RtspPort><OnvifPort version=\"1.1\"><onvifPort>8000</onvifPort><enable>0</enable></OnvifPort></body>",
            )],
        )
        .await;
        let client = Baichuan::new("127.0.0.1", "admin", "secret", port);

        let ports = client.get_ports().await.unwrap();
        assert_eq!(
            ports["rtsp"],
            PortState {
                port: Some(554),
                enabled: Some(true)
            }
        );
        assert_eq!(client.port_state(PortType::Onvif).enabled, Some(false));
        assert_eq!(client.port_state(PortType::Rtmp), PortState::default());

        client
            .set_port_enabled(PortType::Onvif, true)
            .await
            .unwrap();
        client.logout().await.unwrap();

        let seen = camera.await.unwrap();
        let (id, body) = &seen[3];
        assert_eq!(*id, MSG_ID_SET_PORTS);
        assert!(body.contains("<OnvifPort version=\"1.1\"><enable>1</enable></OnvifPort>"));
    }
}
