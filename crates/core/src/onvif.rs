//!
//! ONVIF push events
//!
//! The device posts a notification to a webhook whenever motion or an AI detection starts
//! or stops. A subscription lasts [`SUBSCRIPTION_TERMINATION_MINUTES`] and has to be renewed
//! before [`Host::renewtimer`] runs out, renewal is up to the caller.
//!
use crate::api::Host;
use crate::{Error, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use log::*;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Duration, OffsetDateTime};

/// How long a subscription lasts before it must be renewed
pub const SUBSCRIPTION_TERMINATION_MINUTES: i64 = 15;

const SOAP_CONTENT_TYPE: &str = "application/soap+xml;charset=UTF-8";
const SUBSCRIBE_ACTION: &str = "http://docs.oasis-open.org/wsn/bw-2/NotificationProducer/SubscribeRequest";
const RENEW_ACTION: &str = "http://docs.oasis-open.org/wsn/bw-2/SubscriptionManager/RenewRequest";
const UNSUBSCRIBE_ACTION: &str =
    "http://docs.oasis-open.org/wsn/bw-2/SubscriptionManager/UnsubscribeRequest";

// These NVRs keep up to three subscriptions alive after a restart of the client
const DEAD_SESSION_MODELS: [&str; 2] = ["RLN8-410", "RLN16-410"];

const AI_RULES: [(&str, &str); 4] = [
    ("FaceDetect", "face"),
    ("PeopleDetect", "people"),
    ("VehicleDetect", "vehicle"),
    ("DogCatDetect", "dog_cat"),
];

/// State of the ONVIF subscription of a host
#[derive(Debug, Default)]
pub(crate) struct Subscription {
    manager_url: Option<String>,
    /// Local time at which the device drops the subscription
    termination: Option<OffsetDateTime>,
    /// Device clock minus local clock, in seconds
    time_difference: Option<f64>,
    /// Set once a notification carried anything but plain motion
    rich_events: bool,
}

/// The WS-Security username token of one request
#[derive(Debug, Clone)]
pub struct OnvifDigest {
    /// Random id of the token
    pub username_token: String,
    /// The login user
    pub username: String,
    /// `base64(sha1(nonce + created + password))`
    pub password_digest: String,
    /// Base64 of the random nonce
    pub nonce: String,
    /// UTC creation time
    pub created: String,
}

impl OnvifDigest {
    fn new(
        username: &str,
        password: &str,
        now: OffsetDateTime,
    ) -> std::result::Result<Self, time::error::Format> {
        let created = now.format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].000Z"
        ))?;
        let raw_nonce = uuid::Uuid::new_v4();
        let mut hasher = Sha1::new();
        hasher.update(raw_nonce.as_bytes());
        hasher.update(created.as_bytes());
        hasher.update(password.as_bytes());

        Ok(Self {
            username_token: uuid::Uuid::new_v4().to_string(),
            username: username.to_string(),
            password_digest: STANDARD.encode(hasher.finalize()),
            nonce: STANDARD.encode(raw_nonce.as_bytes()),
            created,
        })
    }

    fn security_header(&self) -> String {
        format!(
            r#"<wsse:Security soap:mustUnderstand="true" xmlns:wsse="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd" xmlns:wsu="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd"><wsse:UsernameToken wsu:Id="UsernameToken-{}"><wsse:Username>{}</wsse:Username><wsse:Password Type="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-username-token-profile-1.0#PasswordDigest">{}</wsse:Password><wsse:Nonce EncodingType="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-soap-message-security-1.0#Base64Binary">{}</wsse:Nonce><wsu:Created>{}</wsu:Created></wsse:UsernameToken></wsse:Security>"#,
            self.username_token,
            escape(&self.username),
            self.password_digest,
            self.nonce,
            self.created
        )
    }
}

fn envelope(action: &str, to: Option<&str>, digest: &OnvifDigest, body: &str) -> String {
    let to = to
        .map(|to| format!("<add:To>{}</add:To>", escape(to)))
        .unwrap_or_default();
    format!(
        r#"<soap:Envelope xmlns:add="http://www.w3.org/2005/08/addressing" xmlns:b="http://docs.oasis-open.org/wsn/b-2" xmlns:soap="http://www.w3.org/2003/05/soap-envelope"><soap:Header><add:Action>{}</add:Action>{}{}</soap:Header><soap:Body>{}</soap:Body></soap:Envelope>"#,
        action,
        to,
        digest.security_header(),
        body
    )
}

fn subscribe_xml(digest: &OnvifDigest, webhook_url: &str) -> String {
    let body = format!(
        "<b:Subscribe><b:ConsumerReference><add:Address>{}</add:Address></b:ConsumerReference><b:InitialTerminationTime>PT{}M</b:InitialTerminationTime></b:Subscribe>",
        escape(webhook_url),
        SUBSCRIPTION_TERMINATION_MINUTES
    );
    envelope(SUBSCRIBE_ACTION, None, digest, &body)
}

fn renew_xml(digest: &OnvifDigest, manager_url: &str) -> String {
    let body = format!(
        "<b:Renew><b:TerminationTime>PT{}M</b:TerminationTime></b:Renew>",
        SUBSCRIPTION_TERMINATION_MINUTES
    );
    envelope(RENEW_ACTION, Some(manager_url), digest, &body)
}

fn unsubscribe_xml(digest: &OnvifDigest, manager_url: &str) -> String {
    envelope(UNSUBSCRIBE_ACTION, Some(manager_url), digest, "<b:Unsubscribe/>")
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn attribute(e: &BytesStart<'_>, name: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == name.as_bytes())
        .and_then(|a| a.unescape_value().ok())
        .map(|v| v.into_owned())
}

/// The text of the first element with each of the given local names
fn find_texts(xml: &str, names: &[&str]) -> Result<BTreeMap<String, String>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut found = BTreeMap::new();
    let mut current: Option<String> = None;
    loop {
        match reader.read_event()? {
            Event::Start(e) => current = Some(local_name(&e)),
            Event::End(_) => current = None,
            Event::Text(t) => {
                if let Some(name) = current.as_ref() {
                    if names.contains(&name.as_str()) && !found.contains_key(name) {
                        found.insert(name.clone(), t.unescape()?.into_owned());
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(found)
}

/// What the device answered to a subscribe or renew
#[derive(Debug, PartialEq)]
struct SubscribeResponse {
    manager_url: Option<String>,
    current_time: OffsetDateTime,
    termination_time: Option<OffsetDateTime>,
}

fn parse_time(text: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(text.trim(), &Rfc3339).ok()
}

fn parse_subscribe_response(xml: &str) -> Result<Option<SubscribeResponse>> {
    let texts = find_texts(xml, &["Address", "CurrentTime", "TerminationTime"])?;
    let current_time = match texts.get("CurrentTime").and_then(|t| parse_time(t)) {
        Some(time) => time,
        None => return Ok(None),
    };
    Ok(Some(SubscribeResponse {
        manager_url: texts.get("Address").cloned(),
        current_time,
        termination_time: texts.get("TerminationTime").and_then(|t| parse_time(t)),
    }))
}

/// One `NotificationMessage` of an event push
#[derive(Debug, Default, PartialEq)]
struct Notification {
    /// Last part of the topic, e.g. `Motion`
    rule: String,
    /// `Name` to `Value` of every `SimpleItem`
    items: BTreeMap<String, String>,
}

fn parse_notifications(xml: &str) -> Result<Vec<Notification>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut messages = vec![];
    let mut message: Option<Notification> = None;
    let mut in_topic = false;
    loop {
        let (e, empty) = match reader.read_event()? {
            Event::Start(e) => (e, false),
            Event::Empty(e) => (e, true),
            Event::Text(t) => {
                if let (true, Some(message)) = (in_topic, message.as_mut()) {
                    let topic = t.unescape()?;
                    message.rule = topic.rsplit('/').next().unwrap_or_default().to_string();
                }
                continue;
            }
            Event::End(e) => {
                match e.local_name().as_ref() {
                    b"NotificationMessage" => messages.extend(message.take()),
                    b"Topic" => in_topic = false,
                    _ => {}
                }
                continue;
            }
            Event::Eof => break,
            _ => continue,
        };

        match local_name(&e).as_str() {
            "NotificationMessage" if !empty => message = Some(Notification::default()),
            "Topic" if !empty => {
                in_topic = attribute(&e, "Dialect")
                    .map(|d| d.ends_with("ConcreteSet"))
                    .unwrap_or(false);
            }
            "SimpleItem" => {
                if let (Some(message), Some(name), Some(value)) = (
                    message.as_mut(),
                    attribute(&e, "Name"),
                    attribute(&e, "Value"),
                ) {
                    message.items.entry(name).or_insert(value);
                }
            }
            _ => {}
        }
    }
    Ok(messages)
}

impl Host {
    fn subscription_error<T: Into<String>>(&self, why: T) -> Error {
        Error::Subscription {
            host: self.host().to_string(),
            why: why.into(),
        }
    }

    fn lock_subscription(&self) -> std::sync::MutexGuard<'_, Subscription> {
        self.subscription.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// A fresh WS-Security token for the login user
    pub fn get_digest(&self) -> Result<OnvifDigest> {
        OnvifDigest::new(self.username(), self.password(), OffsetDateTime::now_utc())
            .map_err(|e| self.subscription_error(format!("could not format the creation time: {}", e)))
    }

    ///
    /// Posts a SOAP request to the event service
    ///
    /// `None` if the device could not be reached or did not answer with 200, failures are
    /// only logged at debug level when `expect_failure` is set.
    ///
    async fn subscription_send(&self, action: &str, xml: String, expect_failure: bool) -> Option<String> {
        let url = match self.subscribe_url() {
            Some(url) => url,
            None => {
                error!("{}: no ONVIF port known, read the host data first", self.host());
                return None;
            }
        };
        let client = match self.client() {
            Ok(client) => client,
            Err(e) => {
                error!("{}: {}", self.host(), e);
                return None;
            }
        };
        trace!("{}: subscription request data:\n{}", self.host(), self.hide_password(&xml));

        let result = {
            let _send = self.send_mutex.lock().await;
            match client
                .post(&url)
                .header(reqwest::header::CONTENT_TYPE, SOAP_CONTENT_TYPE)
                .header("action", action)
                .body(xml)
                .send()
                .await
            {
                Ok(response) => {
                    let status = response.status();
                    response.text().await.map(|text| (status, text))
                }
                Err(e) => Err(e),
            }
        };

        let (status, text) = match result {
            Ok(reply) => reply,
            Err(e) => {
                error!("{}: {}", self.host(), self.http_error(e));
                return None;
            }
        };
        trace!(
            "{}: subscription got response status {}:\n{}",
            self.host(),
            status,
            text
        );
        if status != reqwest::StatusCode::OK {
            if expect_failure {
                debug!(
                    "{}: unsubscribe of a dead session got status {}, this is expected",
                    self.host(),
                    status
                );
            } else {
                warn!(
                    "{}: subscription request got a response with wrong HTTP status {}",
                    self.host(),
                    status
                );
            }
            return None;
        }
        Some(text)
    }

    ///
    /// Subscribes to push events sent to `webhook_url`
    ///
    /// A failed attempt clears every subscription the device may still hold for this
    /// client and tries once more.
    ///
    pub async fn subscribe(&self, webhook_url: &str) -> Result<()> {
        match self.try_subscribe(webhook_url).await {
            Ok(()) => Ok(()),
            Err(e) => {
                debug!("{}: {}, retrying", self.host(), e);
                self.unsubscribe_all().await?;
                self.try_subscribe(webhook_url).await
            }
        }
    }

    async fn try_subscribe(&self, webhook_url: &str) -> Result<()> {
        let digest = self.get_digest()?;
        let local_time = OffsetDateTime::now_utc();
        let response = self
            .subscription_send(SUBSCRIBE_ACTION, subscribe_xml(&digest, webhook_url), false)
            .await
            .ok_or_else(|| self.subscription_error("failed to subscribe, no response"))?;

        let parsed = parse_subscribe_response(&response)?
            .ok_or_else(|| self.subscription_error("failed to subscribe, no current time"))?;
        let manager_url = parsed.manager_url.ok_or_else(|| {
            self.subscription_error("failed to subscribe, no subscription manager address")
        })?;
        let remote_termination = parsed.termination_time.ok_or_else(|| {
            self.subscription_error("failed to subscribe, no termination time")
        })?;
        let difference = (parsed.current_time - local_time).as_seconds_f64();
        let termination = remote_termination - Duration::seconds_f64(difference);

        debug!(
            "{}: local time {}, device time {} (difference {:.1}s), subscription ends {}",
            self.host(),
            local_time,
            parsed.current_time,
            difference,
            termination
        );
        let mut subscription = self.lock_subscription();
        subscription.manager_url = Some(manager_url);
        subscription.time_difference = Some(difference);
        subscription.termination = Some(termination);
        Ok(())
    }

    ///
    /// Extends the subscription by another [`SUBSCRIPTION_TERMINATION_MINUTES`]
    ///
    /// The device always answers with the initial termination time, the new one is counted
    /// from now. Any failure drops the subscription.
    ///
    pub async fn renew(&self) -> Result<()> {
        if !self.subscribed() {
            return Err(self.subscription_error("failed to renew, not previously subscribed"));
        }
        let manager_url = self.lock_subscription().manager_url.clone().unwrap_or_default();

        let digest = self.get_digest()?;
        let local_time = OffsetDateTime::now_utc();
        let response = self
            .subscription_send(RENEW_ACTION, renew_xml(&digest, &manager_url), false)
            .await;
        let parsed = match response.map(|r| parse_subscribe_response(&r)) {
            Some(Ok(Some(parsed))) => parsed,
            _ => {
                self.unsubscribe_all().await?;
                return Err(self.subscription_error("failed to renew subscription, unexpected response"));
            }
        };

        let difference = (parsed.current_time - local_time).as_seconds_f64();
        let mut subscription = self.lock_subscription();
        subscription.time_difference = Some(difference);
        subscription.termination =
            Some(local_time + Duration::minutes(SUBSCRIPTION_TERMINATION_MINUTES));
        Ok(())
    }

    /// Ends the subscription, the local state is cleared even if the device is unreachable
    pub async fn unsubscribe(&self) -> Result<()> {
        let manager_url = self.lock_subscription().manager_url.take();
        if let Some(manager_url) = manager_url {
            let digest = self.get_digest()?;
            self.subscription_send(
                UNSUBSCRIBE_ACTION,
                unsubscribe_xml(&digest, &manager_url),
                false,
            )
            .await;
        }
        let mut subscription = self.lock_subscription();
        subscription.termination = None;
        subscription.time_difference = None;
        Ok(())
    }

    /// Ends the subscription and any subscription a previous client left behind
    pub async fn unsubscribe_all(&self) -> Result<()> {
        self.unsubscribe().await?;

        let model = self.model().unwrap_or_default();
        if DEAD_SESSION_MODELS.contains(&model.as_str()) {
            debug!("{}: unsubscribing previous (dead) sessions", self.host());
            let port = self.onvif_port().unwrap_or_default();
            for idx in 0..3 {
                let to = format!(
                    "http://{}:{}/onvif/Notification?Idx=00_{}",
                    self.host(),
                    port,
                    idx
                );
                let digest = self.get_digest()?;
                self.subscription_send(UNSUBSCRIBE_ACTION, unsubscribe_xml(&digest, &to), true)
                    .await;
            }
        }
        Ok(())
    }

    /// Seconds until the subscription ends, negative when it already has
    pub fn renewtimer(&self) -> i64 {
        let subscription = self.lock_subscription();
        match (subscription.time_difference, subscription.termination) {
            (Some(_), Some(termination)) => {
                let remaining = (termination - OffsetDateTime::now_utc()).whole_seconds();
                trace!("{}: should renew in {} seconds", self.host(), remaining);
                remaining
            }
            _ => -1,
        }
    }

    /// True while a subscription exists and has not reached its termination time
    pub fn subscribed(&self) -> bool {
        let has_manager = self.lock_subscription().manager_url.is_some();
        has_manager && self.renewtimer() > 0
    }

    async fn poll_after_event(&self, why: &str) {
        match self.get_motion_state_all_ch().await {
            Ok(true) => {}
            Ok(false) => error!("{}: could not poll motion state after {}", self.host(), why),
            Err(e) => error!(
                "{}: could not poll motion state after {}: {}",
                self.host(),
                why,
                e
            ),
        }
    }

    ///
    /// Applies a notification the device pushed to the webhook
    ///
    /// Returns the channel whose states changed. `None` means the states of all channels
    /// were polled instead, because the notification did not say enough.
    ///
    pub async fn onvif_event_callback(&self, data: &str) -> Result<Option<u8>> {
        trace!("{}: ONVIF event callback received payload:\n{}", self.host(), data);

        let mut found_event = false;
        let mut last_channel = None;
        for message in parse_notifications(data)? {
            let rule = message.rule.as_str();
            if rule.is_empty() {
                continue;
            }

            let channels = self.channels();
            let channel = if channels.len() == 1 {
                Some(channels[0])
            } else {
                let source = message
                    .items
                    .get("Source")
                    .or_else(|| message.items.get("VideoSourceConfigurationToken"));
                match source {
                    Some(source) => match source.trim().parse::<u8>() {
                        Ok(channel) => Some(channel),
                        Err(_) => {
                            if self.log_once(&format!("ONVIF_{}_invalid_channel", rule)) {
                                warn!(
                                    "{}: ONVIF event '{}' contained invalid channel '{}', polling instead",
                                    self.host(),
                                    rule,
                                    source
                                );
                            }
                            None
                        }
                    },
                    None => None,
                }
            };

            let channel = match channel {
                Some(channel) => channel,
                None => {
                    if self.log_once(&format!("ONVIF_{}_no_channel", rule)) {
                        warn!("{}: ONVIF event '{}' does not contain a channel", self.host(), rule);
                    }
                    self.poll_after_event("an ONVIF event with unknown channel").await;
                    return Ok(None);
                }
            };
            if !channels.contains(&channel) {
                continue;
            }

            let key = if rule == "Motion" { "IsMotion" } else { "State" };
            let value = match message.items.get(key) {
                Some(value) => value,
                None => {
                    if self.log_once(&format!("ONVIF_{}_no_data", rule)) {
                        warn!("{}: ONVIF event '{}' did not contain data", self.host(), rule);
                    }
                    continue;
                }
            };

            let ai = AI_RULES.iter().find(|(r, _)| *r == rule).map(|(_, ai)| *ai);
            let known = matches!(rule, "Motion" | "MotionAlarm" | "Visitor") || ai.is_some();
            if !known {
                if self.log_once(&format!("ONVIF_unknown_{}", rule)) {
                    warn!("{}: ONVIF event with unknown rule '{}'", self.host(), rule);
                }
                continue;
            }

            found_event = true;
            let state = value == "true";
            info!("{}: ONVIF event {}: {}", self.host(), rule, state);
            {
                let mut host_state = self.write_state();
                let ch = host_state.ch_mut(channel);
                match (rule, ai) {
                    ("Motion" | "MotionAlarm", _) => ch.motion = Some(state),
                    ("Visitor", _) => ch.visitor = Some(state),
                    (_, Some(ai)) => {
                        ch.ai_state.insert(ai.to_string(), state);
                    }
                    _ => {}
                }
            }
            if rule != "Motion" && rule != "MotionAlarm" {
                self.lock_subscription().rich_events = true;
            }
            last_channel = Some(channel);
        }

        if !found_event {
            if self.log_once("ONVIF_no_known") {
                warn!(
                    "{}: ONVIF notification received without any known events:\n{}",
                    self.host(),
                    data
                );
            }
            self.poll_after_event("an ONVIF event without any known events")
                .await;
            return Ok(None);
        }

        if !self.lock_subscription().rich_events {
            // Only motion is pushed, the AI states have to be polled
            if self.log_once("ONVIF_only_motion") {
                debug!(
                    "{}: model '{}' appears to not support rich notifications",
                    self.host(),
                    self.model().unwrap_or_default()
                );
            }
            self.poll_after_event("an ONVIF event with only motion")
                .await;
            return Ok(None);
        }
        Ok(last_channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use time::macros::datetime;

    const NOTIFICATION: &str = indoc!(
        r#"
        <?xml version="1.0" encoding="UTF-8"?>
        <env:Envelope xmlns:env="http://www.w3.org/2003/05/soap-envelope" xmlns:wsnt="http://docs.oasis-open.org/wsn/b-2" xmlns:tt="http://www.onvif.org/ver10/schema">
        <env:Body>
        <wsnt:Notify>
        <wsnt:NotificationMessage>
        <wsnt:Topic Dialect="http://www.onvif.org/ver10/tev/topicExpression/ConcreteSet">tns1:RuleEngine/CellMotionDetector/Motion</wsnt:Topic>
        <wsnt:Message><tt:Message UtcTime="2023-01-01T10:00:00Z">
        <tt:Source><tt:SimpleItem Name="Source" Value="000"/></tt:Source>
        <tt:Data><tt:SimpleItem Name="IsMotion" Value="true"/></tt:Data>
        </tt:Message></wsnt:Message>
        </wsnt:NotificationMessage>
        <wsnt:NotificationMessage>
        <wsnt:Topic Dialect="http://www.onvif.org/ver10/tev/topicExpression/ConcreteSet">tns1:RuleEngine/MyRuleDetector/PeopleDetect</wsnt:Topic>
        <wsnt:Message><tt:Message UtcTime="2023-01-01T10:00:00Z">
        <tt:Source><tt:SimpleItem Name="Source" Value="1"/></tt:Source>
        <tt:Data><tt:SimpleItem Name="State" Value="false"/></tt:Data>
        </tt:Message></wsnt:Message>
        </wsnt:NotificationMessage>
        </wsnt:Notify>
        </env:Body>
        </env:Envelope>
        "#
    );

    #[test]
    fn test_parse_notifications() {
        let messages = parse_notifications(NOTIFICATION).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].rule, "Motion");
        assert_eq!(messages[0].items.get("Source").map(String::as_str), Some("000"));
        assert_eq!(messages[0].items.get("IsMotion").map(String::as_str), Some("true"));
        assert_eq!(messages[1].rule, "PeopleDetect");
        assert_eq!(messages[1].items.get("State").map(String::as_str), Some("false"));
    }

    #[test]
    fn test_parse_subscribe_response() {
        let sample = indoc!(
            r#"
            <?xml version="1.0" encoding="UTF-8"?>
            <SOAP-ENV:Envelope xmlns:SOAP-ENV="http://www.w3.org/2003/05/soap-envelope" xmlns:wsa5="http://www.w3.org/2005/08/addressing" xmlns:wsnt="http://docs.oasis-open.org/wsn/b-2">
            <SOAP-ENV:Body>
            <wsnt:SubscribeResponse>
            <wsnt:SubscriptionReference>
            <wsa5:Address>http://192.168.1.10:8000/onvif/Notification?Idx=00_0</wsa5:Address>
            </wsnt:SubscriptionReference>
            <wsnt:CurrentTime>2023-01-01T10:00:00Z</wsnt:CurrentTime>
            <wsnt:TerminationTime>2023-01-01T10:15:00Z</wsnt:TerminationTime>
            </wsnt:SubscribeResponse>
            </SOAP-ENV:Body>
            </SOAP-ENV:Envelope>
            "#
        );
        let parsed = parse_subscribe_response(sample).unwrap().unwrap();
        assert_eq!(
            parsed.manager_url.as_deref(),
            Some("http://192.168.1.10:8000/onvif/Notification?Idx=00_0")
        );
        assert_eq!(parsed.current_time, datetime!(2023-01-01 10:00:00 UTC));
        assert_eq!(
            parsed.termination_time,
            Some(datetime!(2023-01-01 10:15:00 UTC))
        );

        assert_eq!(parse_subscribe_response("<a><b>x</b></a>").unwrap(), None);
    }

    #[test]
    fn test_digest() {
        let digest = OnvifDigest::new("admin", "pw", datetime!(2023-01-01 10:00:00 UTC)).unwrap();
        assert_eq!(digest.created, "2023-01-01T10:00:00.000Z");
        let nonce = STANDARD.decode(&digest.nonce).unwrap();
        assert_eq!(nonce.len(), 16);

        let mut hasher = Sha1::new();
        hasher.update(&nonce);
        hasher.update(b"2023-01-01T10:00:00.000Z");
        hasher.update(b"pw");
        assert_eq!(digest.password_digest, STANDARD.encode(hasher.finalize()));
    }

    #[test]
    fn test_templates_escape() {
        let digest = OnvifDigest::new("admin", "pw", datetime!(2023-01-01 10:00:00 UTC)).unwrap();
        let xml = subscribe_xml(&digest, "http://hook/?a=1&b=2");
        assert!(xml.contains("<add:Address>http://hook/?a=1&amp;b=2</add:Address>"));
        assert!(xml.contains("<b:InitialTerminationTime>PT15M</b:InitialTerminationTime>"));
        let xml = unsubscribe_xml(&digest, "http://cam/onvif/Notification?Idx=00_0");
        assert!(xml.contains("<add:To>http://cam/onvif/Notification?Idx=00_0</add:To>"));
        assert!(xml.contains("<b:Unsubscribe/>"));
    }
}
