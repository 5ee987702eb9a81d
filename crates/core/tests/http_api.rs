// Session and command behaviour of `Host` against a mocked device

use assert_matches::assert_matches;
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use reolink_core::api::{Host, HostConfig};
use reolink_core::Error;

const API: &str = "/cgi-bin/api.cgi";

async fn setup() -> (MockServer, Host) {
    let _ = env_logger::builder().is_test(true).try_init();
    let server = MockServer::start().await;
    let config =
        HostConfig::new("127.0.0.1", "admin", "password").with_port(server.address().port(), false);
    (server, Host::new(config))
}

fn reply(body: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

fn login_ok() -> ResponseTemplate {
    reply(json!([{"cmd": "Login", "code": 0, "value": {"Token": {"leaseTime": 3600, "name": "abc123"}}}]))
}

async fn mount_login(server: &MockServer, expected: u64) {
    Mock::given(method("POST"))
        .and(path(API))
        .and(query_param("cmd", "Login"))
        .respond_with(login_ok())
        .expect(expected)
        .mount(server)
        .await;
}

async fn mount_logout(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(API))
        .and(query_param("cmd", "Logout"))
        .respond_with(reply(json!([{"cmd": "Logout", "code": 0, "value": {"rspCode": 200}}])))
        .mount(server)
        .await;
}

fn host_data(email_ver: i64) -> Value {
    json!([
        {"cmd": "GetDevInfo", "code": 0, "value": {"DevInfo": {
            "exactType": "IPC",
            "serial": "00000000001",
            "name": "Garden",
            "model": "RLC-811A",
            "hardVer": "IPC_523128M8MP",
            "firmVer": "v3.1.0.1162_2203",
            "channelNum": 1
        }}},
        {"cmd": "GetNetPort", "code": 0, "value": {"NetPort": {
            "rtspPort": 554, "rtmpPort": 1935, "onvifPort": 8000
        }}},
        {"cmd": "GetAbility", "code": 0, "value": {"Ability": {
            "email": {"ver": email_ver},
            "push": {"ver": 0},
            "abilityChn": [{"ptzType": {"ver": 0}}]
        }}}
    ])
}

fn not_answered(cmd: &str) -> Value {
    json!({"cmd": cmd, "code": 1, "error": {"rspCode": -9, "detail": "not support"}})
}

async fn mount_host_data(server: &MockServer, email_ver: i64) {
    Mock::given(method("POST"))
        .and(path(API))
        .and(query_param("cmd", "Getchannelstatus"))
        .respond_with(reply(host_data(email_ver)))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_login_reused_then_renewed_once() {
    let (server, host) = setup().await;
    mount_login(&server, 2).await;
    mount_logout(&server).await;
    Mock::given(method("POST"))
        .and(path(API))
        .and(query_param("cmd", "GetTime"))
        .and(query_param("token", "abc123"))
        .respond_with(reply(json!([{"cmd": "GetTime", "code": 0, "value": {"Time": {"hourFmt": 0}}}])))
        .expect(3)
        .mount(&server)
        .await;

    host.get_state("GetTime").await.unwrap();
    host.get_state("GetTime").await.unwrap();
    assert!(host.session_active());

    host.expire_session();
    assert!(!host.session_active());
    host.get_state("GetTime").await.unwrap();
    assert!(host.session_active());
}

#[tokio::test]
async fn test_bad_gateway_on_login_retried_once() {
    let (server, host) = setup().await;
    Mock::given(method("POST"))
        .and(path(API))
        .and(query_param("cmd", "Login"))
        .respond_with(ResponseTemplate::new(502))
        .expect(2)
        .mount(&server)
        .await;

    assert_matches!(host.login().await, Err(Error::Api { rsp_code: 502, .. }));
    assert!(!host.session_active());
    assert!(host.session_token().is_none());
}

#[tokio::test]
async fn test_invalid_credentials() {
    let (server, host) = setup().await;
    Mock::given(method("POST"))
        .and(path(API))
        .and(query_param("cmd", "Login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(r#"{ "detail" : "invalid user" }"#, "text/html"),
        )
        .expect(1)
        .mount(&server)
        .await;

    assert_matches!(host.login().await, Err(Error::CredentialsInvalid { .. }));
}

#[tokio::test]
async fn test_refused_token_logs_in_again() {
    let (server, host) = setup().await;
    mount_login(&server, 2).await;
    mount_logout(&server).await;
    Mock::given(method("POST"))
        .and(path(API))
        .and(query_param("cmd", "GetTime"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(r#""detail" : "please login first""#, "text/html"),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(API))
        .and(query_param("cmd", "GetTime"))
        .respond_with(reply(json!([{"cmd": "GetTime", "code": 0, "value": {"Time": {"hourFmt": 0}}}])))
        .expect(1)
        .mount(&server)
        .await;

    host.get_state("GetTime").await.unwrap();
}

#[tokio::test]
async fn test_malformed_json_retried_once() {
    let (server, host) = setup().await;
    mount_login(&server, 2).await;
    mount_logout(&server).await;
    Mock::given(method("POST"))
        .and(path(API))
        .and(query_param("cmd", "GetTime"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("[{\"cmd\": \"GetTi", "application/json"))
        .expect(2)
        .mount(&server)
        .await;

    assert_matches!(
        host.get_state("GetTime").await,
        Err(Error::InvalidContentType { .. })
    );
    assert!(!host.session_active());
}

#[tokio::test]
async fn test_transport_failure_expires_session() {
    let _ = env_logger::builder().is_test(true).try_init();
    let server = MockServer::start().await;
    let config = HostConfig::new("127.0.0.1", "admin", "password")
        .with_port(server.address().port(), false)
        .with_timeout(Duration::from_millis(300));
    let host = Host::new(config);
    mount_login(&server, 2).await;
    mount_logout(&server).await;
    Mock::given(method("POST"))
        .and(path(API))
        .and(query_param("cmd", "GetTime"))
        .respond_with(
            reply(json!([{"cmd": "GetTime", "code": 0, "value": {"Time": {"hourFmt": 0}}}]))
                .set_delay(Duration::from_secs(3)),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(API))
        .and(query_param("cmd", "GetTime"))
        .respond_with(reply(json!([{"cmd": "GetTime", "code": 0, "value": {"Time": {"hourFmt": 0}}}])))
        .expect(1)
        .mount(&server)
        .await;

    assert_matches!(host.get_state("GetTime").await, Err(Error::Timeout { .. }));
    assert!(!host.session_active());

    // The next command starts with a fresh login
    host.get_state("GetTime").await.unwrap();
    assert!(host.session_active());
}

#[tokio::test]
async fn test_v20_commands_selected() {
    let (server, host) = setup().await;
    mount_login(&server, 1).await;
    mount_host_data(&server, 1).await;
    Mock::given(method("POST"))
        .and(path(API))
        .and(query_param("cmd", "GetAiState"))
        .and(body_string_contains("\"GetEmailV20\""))
        .respond_with(reply(json!([
            not_answered("GetAiState"),
            not_answered("GetEvents"),
            not_answered("GetRtspUrl"),
            {"cmd": "GetEmailV20", "code": 0, "value": {"Email": {"enable": 1}}},
            not_answered("GetFtpV20"),
            not_answered("GetRecV20"),
            not_answered("GetAudioAlarmV20"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    host.get_host_data().await.unwrap();
    assert_eq!(host.channels(), vec![0]);
    assert_eq!(host.api_versions().email, 1);
    assert_eq!(host.api_versions().push, 0);
    assert!(host.email_enabled(Some(0)));
    assert_eq!(
        host.subscribe_url().as_deref(),
        Some("http://127.0.0.1:8000/onvif/event_service")
    );
}

#[tokio::test]
async fn test_legacy_commands_selected() {
    let (server, host) = setup().await;
    mount_login(&server, 1).await;
    mount_host_data(&server, 0).await;
    Mock::given(method("POST"))
        .and(path(API))
        .and(query_param("cmd", "GetAiState"))
        .and(body_string_contains("\"GetEmailV20\""))
        .respond_with(reply(json!([])))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(API))
        .and(query_param("cmd", "GetAiState"))
        .respond_with(reply(json!([not_answered("GetAiState")])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(API))
        .and(query_param("cmd", "GetEnc"))
        .and(body_string_contains("\"GetEmail\""))
        .respond_with(reply(json!([not_answered("GetEnc")])))
        .expect(1)
        .mount(&server)
        .await;

    host.get_host_data().await.unwrap();
    assert_eq!(host.api_versions().email, 0);
    host.get_states().await.unwrap();
}

#[tokio::test]
async fn test_channel_count_mismatch_keeps_cache() {
    let (server, host) = setup().await;
    mount_login(&server, 1).await;
    mount_host_data(&server, 0).await;
    Mock::given(method("POST"))
        .and(path(API))
        .and(query_param("cmd", "GetAiState"))
        .respond_with(reply(json!([not_answered("GetAiState")])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(API))
        .and(query_param("cmd", "GetIsp"))
        .respond_with(reply(json!([
            {"cmd": "GetIsp", "code": 0, "value": {"Isp": {"channel": 0, "dayNight": "Color", "backLight": "Off"}}}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(API))
        .and(query_param("cmd", "GetEnc"))
        .respond_with(reply(json!([
            {"cmd": "GetEnc", "code": 0, "value": {"Enc": {"channel": 0, "audio": 1}}},
            {"cmd": "GetIsp", "code": 0, "value": {"Isp": {"channel": 0, "dayNight": "Auto", "backLight": "Off"}}}
        ])))
        .mount(&server)
        .await;

    host.get_host_data().await.unwrap();
    host.get_state("GetIsp").await.unwrap();
    assert_eq!(host.daynight_state(0).as_deref(), Some("Color"));

    // Far fewer replies than commands, nothing may be applied
    host.get_states().await.unwrap();
    assert_eq!(host.daynight_state(0).as_deref(), Some("Color"));
    assert!(!host.audio_state(0));
}

#[tokio::test]
async fn test_set_sensitivity_inverts_value() {
    let (server, host) = setup().await;
    mount_login(&server, 1).await;
    mount_host_data(&server, 0).await;
    Mock::given(method("POST"))
        .and(path(API))
        .and(query_param("cmd", "GetAiState"))
        .respond_with(reply(json!([not_answered("GetAiState")])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(API))
        .and(query_param("cmd", "GetAlarm"))
        .respond_with(reply(json!([{"cmd": "GetAlarm", "code": 0, "value": {"Alarm": {
            "channel": 0,
            "type": "md",
            "enable": 1,
            "sens": [
                {"id": 0, "sensitivity": 10, "beginHour": 0, "beginMin": 0, "endHour": 6, "endMin": 0},
                {"id": 1, "sensitivity": "10", "beginHour": 6, "beginMin": 0, "endHour": 23, "endMin": 59}
            ]
        }}}])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(API))
        .and(query_param("cmd", "SetAlarm"))
        .and(body_partial_json(json!([{"cmd": "SetAlarm", "param": {"Alarm": {"sens": [
            {"id": 0, "sensitivity": 10},
            {"id": 1, "sensitivity": 41}
        ]}}}])))
        .respond_with(reply(json!([{"cmd": "SetAlarm", "code": 0, "value": {"rspCode": 200}}])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(API))
        .and(query_param("cmd", "SetAlarm"))
        .and(body_partial_json(json!([{"cmd": "SetAlarm", "param": {"Alarm": {"sens": [
            {"id": 0, "sensitivity": 21},
            {"id": 1, "sensitivity": 21}
        ]}}}])))
        .respond_with(reply(json!([{"cmd": "SetAlarm", "code": 0, "value": {"rspCode": 200}}])))
        .expect(1)
        .mount(&server)
        .await;

    host.get_host_data().await.unwrap();
    host.get_state("GetAlarm").await.unwrap();
    assert_eq!(host.sensitivity_presets(0).len(), 2);
    assert_eq!(host.motion_detection_enabled(0), Some(true));

    // Only the chosen preset changes
    host.set_sensitivity(0, 10, Some(1)).await.unwrap();
    // Without a preset every entry changes
    host.set_sensitivity(0, 30, None).await.unwrap();

    // Out of range channels never reach the device
    assert_matches!(
        host.set_sensitivity(4, 10, None).await,
        Err(Error::InvalidParameter { .. })
    );
}

#[tokio::test]
async fn test_setting_rejected() {
    let (server, host) = setup().await;
    mount_login(&server, 1).await;
    mount_host_data(&server, 0).await;
    Mock::given(method("POST"))
        .and(path(API))
        .and(query_param("cmd", "GetAiState"))
        .respond_with(reply(json!([not_answered("GetAiState")])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(API))
        .and(query_param("cmd", "PtzCtrl"))
        .respond_with(reply(json!([{"cmd": "PtzCtrl", "code": 1, "error": {"rspCode": -4, "detail": "param error"}}])))
        .expect(1)
        .mount(&server)
        .await;

    host.get_host_data().await.unwrap();
    let result = host
        .set_ptz_command(0, reolink_core::api::PtzCommand::Left, None, Some(10))
        .await;
    assert_matches!(result, Err(Error::Api { rsp_code: -4, ref detail, .. }) if detail == "param error");
}

#[tokio::test]
async fn test_snapshot() {
    let (server, host) = setup().await;
    mount_login(&server, 1).await;
    mount_host_data(&server, 0).await;
    Mock::given(method("POST"))
        .and(path(API))
        .and(query_param("cmd", "GetAiState"))
        .respond_with(reply(json!([not_answered("GetAiState")])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(API))
        .and(query_param("cmd", "Snap"))
        .and(query_param("channel", "0"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(vec![0xff_u8, 0xd8, 0xff, 0xe0], "image/jpeg"),
        )
        .expect(1)
        .mount(&server)
        .await;

    host.get_host_data().await.unwrap();
    let image = host.get_snapshot(0).await.unwrap().unwrap();
    assert_eq!(&image[..2], &[0xff, 0xd8]);
}
