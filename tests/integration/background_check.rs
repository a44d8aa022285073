//! Background check cycles with and without the persisted schedule.

use anyhow::Result;
use chrono::{Duration, Utc};
use firecommit::core::UpdateError;
use firecommit::test_utils::ReleaseFixture;
use firecommit::upgrade::schedule::ChannelCheckState;
use firecommit::upgrade::{BackgroundChecker, Channel, CheckSchedule, ReleaseSource};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::update_error;

async fn stable_server(tag: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/releases/latest"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(ReleaseFixture::stable(tag).to_json())
                .insert_header("ETag", "\"s1\""),
        )
        .expect(1)
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_first_check_persists_state() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/releases/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ReleaseFixture::stable("v1.0.0").to_json()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/releases/tags/dev"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let temp = TempDir::new()?;
    let schedule = CheckSchedule::new(temp.path().join("update-check.json"));
    let checker =
        BackgroundChecker::new(ReleaseSource::with_base_url(server.uri())?, schedule.clone());

    let now = Utc::now();
    let result = checker.run_cycle("v1.0.0", Channel::Latest, now).await;
    assert!(result.error.is_none());
    assert!(!result.has_update);
    assert_eq!(result.latest_version, "v1.0.0");

    let record = schedule.load().await.channel(Channel::Latest);
    assert_eq!(record.last_seen_version, "v1.0.0");
    assert_eq!(record.consecutive_no_update, 1);
    assert_eq!(record.next_check_at, Some(now + Duration::minutes(15)));
    assert_eq!(record.last_checked_at, Some(now));
    assert!(record.etag.is_some(), "composite token is stored even without provider ETags");
    Ok(())
}

#[tokio::test]
async fn test_not_due_check_uses_last_seen_version() -> Result<()> {
    let server = stable_server("v1.1.0").await;
    let temp = TempDir::new()?;
    let schedule = CheckSchedule::new(temp.path().join("update-check.json"));
    let checker =
        BackgroundChecker::new(ReleaseSource::with_base_url(server.uri())?, schedule.clone());

    let now = Utc::now();
    let first = checker.run_cycle("v1.0.0", Channel::Stable, now).await;
    assert!(first.has_update);

    // Within the 15 minute has-update interval: no request, same answer.
    let second = checker
        .run_cycle("v1.0.0", Channel::Stable, now + Duration::minutes(5))
        .await;
    assert!(second.has_update);
    assert_eq!(second.latest_version, "v1.1.0");

    let record = schedule.load().await.channel(Channel::Stable);
    assert_eq!(record.consecutive_no_update, 0);
    assert_eq!(record.next_check_at, Some(now + Duration::minutes(15)));
    Ok(())
}

#[tokio::test]
async fn test_not_modified_keeps_backing_off() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/releases/latest"))
        .respond_with(ResponseTemplate::new(304))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new()?;
    let schedule = CheckSchedule::new(temp.path().join("update-check.json"));
    let now = Utc::now();
    schedule
        .store_channel(
            Channel::Stable,
            ChannelCheckState {
                etag: Some("\"s1\"".to_string()),
                last_seen_version: "v1.0.0".to_string(),
                consecutive_no_update: 2,
                next_check_at: Some(now - Duration::minutes(1)),
                last_checked_at: Some(now - Duration::hours(4)),
            },
        )
        .await?;

    let checker =
        BackgroundChecker::new(ReleaseSource::with_base_url(server.uri())?, schedule.clone());
    let result = checker.run_cycle("v1.0.0", Channel::Stable, now).await;
    assert!(result.error.is_none());
    assert!(!result.has_update);

    let record = schedule.load().await.channel(Channel::Stable);
    assert_eq!(record.consecutive_no_update, 3);
    assert_eq!(record.next_check_at, Some(now + Duration::hours(8)));
    assert_eq!(record.etag.as_deref(), Some("\"s1\""));
    Ok(())
}

#[tokio::test]
async fn test_fetch_error_schedules_retry_without_resetting_backoff() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let temp = TempDir::new()?;
    let schedule = CheckSchedule::new(temp.path().join("update-check.json"));
    schedule
        .store_channel(
            Channel::Stable,
            ChannelCheckState {
                last_seen_version: "v1.0.0".to_string(),
                consecutive_no_update: 4,
                ..Default::default()
            },
        )
        .await?;

    let checker =
        BackgroundChecker::new(ReleaseSource::with_base_url(server.uri())?, schedule.clone());
    let now = Utc::now();
    let result = checker.run_cycle("v1.0.0", Channel::Stable, now).await;

    let err = result.error.as_ref().expect("fetch should fail");
    assert!(matches!(update_error(err), Some(UpdateError::NetworkError { .. })));
    assert!(!result.has_update);
    assert!(result.notice().is_none());

    let record = schedule.load().await.channel(Channel::Stable);
    assert_eq!(record.consecutive_no_update, 4);
    assert_eq!(record.last_seen_version, "v1.0.0");
    assert_eq!(record.next_check_at, Some(now + Duration::minutes(60)));
    Ok(())
}

#[tokio::test]
async fn test_uncached_checker_writes_nothing() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/releases/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ReleaseFixture::stable("v2.0.0").to_json()))
        .expect(2)
        .mount(&server)
        .await;

    let temp = TempDir::new()?;
    let checker = BackgroundChecker::uncached(ReleaseSource::with_base_url(server.uri())?);

    let now = Utc::now();
    for _ in 0..2 {
        let result = checker.run_cycle("v1.0.0", Channel::Stable, now).await;
        assert!(result.has_update);
        assert_eq!(result.latest_version, "v2.0.0");
    }
    assert_eq!(std::fs::read_dir(temp.path())?.count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_started_check_reports_through_handle() -> Result<()> {
    let server = stable_server("v0.4.0").await;
    let temp = TempDir::new()?;
    let schedule = CheckSchedule::new(temp.path().join("state").join("update-check.json"));
    let checker = BackgroundChecker::new(ReleaseSource::with_base_url(server.uri())?, schedule);

    let handle = checker.start("v0.3.2", Channel::Stable);
    let result = handle.wait().await;

    assert!(result.error.is_none());
    assert!(result.has_update);
    assert_eq!(result.current_version, "v0.3.2");
    assert!(temp.path().join("state").join("update-check.json").exists());
    Ok(())
}

#[tokio::test]
async fn test_unreachable_provider_fails_quietly() -> Result<()> {
    // Nothing listens on the discard port.
    let checker = BackgroundChecker::uncached(ReleaseSource::with_base_url("http://127.0.0.1:9")?);
    let result = checker.run_cycle("v1.0.0", Channel::Latest, Utc::now()).await;

    assert!(result.error.is_some());
    assert!(!result.has_update);
    assert!(result.latest_version.is_empty());
    Ok(())
}
