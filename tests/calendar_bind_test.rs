mod common;
use common::*;

use pretty_assertions::assert_eq;
use tzprobe::backend::Backend;
use tzprobe::probe::{ProbeSettings, TimestampRoundTripProbe};

#[tokio::test]
async fn test_calendar_bind_matches_zoned_string() {
    for backend in Backend::ALL {
        let server = ScriptedServer::new(backend);
        let mut conn = server.connection();
        let ny = zone("America/New_York");

        let report = test_probe()
            .probe_explicit_calendar_bind(&mut conn, &ny)
            .await
            .unwrap();

        // 16:00Z on the New York clock
        assert_eq!(report.bound.to_rfc3339(), "2021-07-04T12:00:00-04:00");
        assert_eq!(report.native_text.as_deref(), Some("2021-07-04 12:00:00"));
        assert_eq!(report.naive_text.as_deref(), Some("2021-07-04T12:00:00"));
        assert_eq!(
            report.zoned_text.as_deref(),
            Some("2021-07-04T12:00:00-04:00[America/New_York]")
        );
        assert!(report.native_matches_zoned(), "{backend}");
        assert_eq!(report.native_instant.map(|dt| dt.to_utc()), Some(client_now()));
    }
}

#[tokio::test]
async fn test_local_string_diverges_when_zones_differ() {
    let server = ScriptedServer::new(Backend::Postgres);
    let mut conn = server.connection();
    let ny = zone("America/New_York");

    let report = test_probe()
        .probe_explicit_calendar_bind(&mut conn, &ny)
        .await
        .unwrap();

    assert!(report.zones_differ());
    assert!(report.naive_diverges());
    // The local string is read in the Hong Kong session: 12:00+08:00 is 04:00Z
    assert_eq!(
        report.naive_instant.map(|dt| dt.to_rfc3339()).as_deref(),
        Some("2021-07-04T12:00:00+08:00")
    );
}

#[tokio::test]
async fn test_local_string_agrees_when_zones_match() {
    let settings = ProbeSettings {
        default_zone: zone("America/New_York"),
        ..default_settings()
    };
    let probe = TimestampRoundTripProbe::new(settings).with_clock(client_now);
    let server = ScriptedServer::new(Backend::MySql);
    let mut conn = server.connection();

    let report = probe
        .probe_explicit_calendar_bind(&mut conn, &settings.reference_zone)
        .await
        .unwrap();

    assert!(!report.zones_differ());
    assert!(!report.naive_diverges());
    assert!(report.native_matches_zoned());
}

#[tokio::test]
async fn test_bind_runs_in_default_zone_session() {
    let server = ScriptedServer::new(Backend::Oracle);
    let mut conn = server.connection();

    test_probe()
        .probe_explicit_calendar_bind(&mut conn, &zone("America/New_York"))
        .await
        .unwrap();

    let statements = server.statements();
    assert_eq!(statements[0], "ALTER SESSION SET TIME_ZONE = 'Asia/Hong_Kong'");
    assert!(statements[1].ends_with(" FROM DUAL"), "{}", statements[1]);
}
