//! End-to-end verification flows over an in-memory stream.

#![allow(clippy::expect_used, clippy::unwrap_used)]

mod common;

use common::{fast_config, TestClient};
use fallback_verifier::error::{ProtocolError, Rejection};
use fallback_verifier::protocol::packets::Intent;
use fallback_verifier::protocol::registry::PacketKind;
use fallback_verifier::protocol::ProtocolVersion;
use fallback_verifier::transport::{drive_connection, ConnectionOutcome};
use fallback_verifier::Engine;
use std::net::{IpAddr, Ipv4Addr};
use tokio::io::DuplexStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;

fn peer(last: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(192, 0, 2, last))
}

fn start(engine: &Engine, peer: IpAddr, version: ProtocolVersion) -> (TestClient, JoinHandle<ConnectionOutcome<DuplexStream>>) {
    let (client, server) = tokio::io::duplex(1 << 20);
    let engine = engine.clone();
    let task = tokio::spawn(async move { drive_connection(server, peer, &engine).await });
    (TestClient::new(client, version), task)
}

fn engine_with_ticks() -> (Engine, watch::Sender<bool>) {
    let engine = Engine::new(fast_config()).unwrap();
    let (tx, rx) = watch::channel(false);
    engine.spawn_ticks(rx);
    (engine, tx)
}

#[tokio::test]
async fn test_modern_client_passes_then_bypasses() {
    let (engine, _shutdown) = engine_with_ticks();

    let (mut client, task) = start(&engine, peer(1), ProtocolVersion::V1_21_4);
    assert_eq!(client.play_honestly("Steve").await, Some(PacketKind::Disconnect));
    let outcome = task.await.unwrap();
    assert!(outcome.is_verified(), "{outcome:?}");
    assert_eq!(engine.stats().snapshot().verifications_passed, 1);

    // Same name and address are remembered
    let (mut client, task) = start(&engine, peer(1), ProtocolVersion::V1_21_4);
    client.login("Steve", Intent::Login).await;
    match task.await.unwrap() {
        ConnectionOutcome::PassThrough { replay, .. } => assert!(!replay.is_empty()),
        other => panic!("expected pass-through, got {other:?}"),
    }
}

#[tokio::test]
async fn test_legacy_clients_pass() {
    let (engine, _shutdown) = engine_with_ticks();
    for (last, version) in [(2, ProtocolVersion::V1_7_6), (3, ProtocolVersion::V1_8), (4, ProtocolVersion::V1_16_4)] {
        let (mut client, task) = start(&engine, peer(last), version);
        assert_eq!(client.play_honestly("Alex").await, Some(PacketKind::Disconnect), "{version}");
        let outcome = task.await.unwrap();
        assert!(outcome.is_verified(), "{version}: {outcome:?}");
    }
}

#[tokio::test]
async fn test_status_ping_passes_through() {
    let (engine, _shutdown) = engine_with_ticks();
    let (mut client, task) = start(&engine, peer(5), ProtocolVersion::V1_20_5);
    client.login("", Intent::Status).await;
    match task.await.unwrap() {
        ConnectionOutcome::PassThrough { replay, .. } => {
            // Length prefix, handshake id 0x00, protocol id
            assert_eq!(replay[1], 0x00);
        }
        other => panic!("expected pass-through, got {other:?}"),
    }
    assert_eq!(engine.stats().snapshot().logins_total, 0);
}

#[tokio::test]
async fn test_blacklisted_address_refused() {
    let (engine, _shutdown) = engine_with_ticks();
    let threshold = engine.config().verification.blacklist_threshold;
    for _ in 0..threshold {
        engine.controller().blacklist.increment(peer(6));
    }

    let (mut client, task) = start(&engine, peer(6), ProtocolVersion::V1_20_2);
    client.login("Steve", Intent::Login).await;
    client.expect(PacketKind::Disconnect).await;
    let outcome = task.await.unwrap();
    assert!(matches!(outcome, ConnectionOutcome::Rejected(Rejection::Blacklisted)), "{outcome:?}");
}

#[tokio::test]
async fn test_long_username_is_penalized() {
    let (engine, _shutdown) = engine_with_ticks();
    let (mut client, task) = start(&engine, peer(7), ProtocolVersion::V1_12_2);
    client.login("a_name_far_too_long", Intent::Login).await;
    let outcome = task.await.unwrap();
    assert!(matches!(outcome, ConnectionOutcome::Failed(_)), "{outcome:?}");
    assert_eq!(engine.controller().blacklist.score(peer(7)), 1);
}

#[tokio::test]
async fn test_malformed_handshake_is_penalized() {
    let (engine, _shutdown) = engine_with_ticks();
    let (mut client, task) = start(&engine, peer(12), ProtocolVersion::V1_8);
    // Protocol 47, "localhost", port 25565, intent 9
    let mut body = vec![0x2F, 9];
    body.extend_from_slice(b"localhost");
    body.extend_from_slice(&[0x63, 0xDD, 9]);
    client.send_raw(PacketKind::Handshake, &body).await;

    let outcome = task.await.unwrap();
    assert!(
        matches!(outcome, ConnectionOutcome::Failed(ProtocolError::InvalidField(_))),
        "{outcome:?}"
    );
    assert_eq!(engine.controller().blacklist.score(peer(12)), 1);
    assert_eq!(engine.stats().snapshot().logins_total, 0);
}

#[tokio::test]
async fn test_wrong_teleport_fails_and_strikes() {
    let (engine, _shutdown) = engine_with_ticks();
    let (mut client, task) = start(&engine, peer(8), ProtocolVersion::V1_19_4);
    client.login("Steve", Intent::Login).await;
    client.expect(PacketKind::LoginSuccess).await;
    client.state = fallback_verifier::protocol::ConnectionState::Game;
    client.echo_keep_alive().await;
    let teleport = client.expect_teleport().await;
    client.confirm_teleport(teleport.id.wrapping_add(1)).await;

    client.expect(PacketKind::Disconnect).await;
    let outcome = task.await.unwrap();
    assert!(
        matches!(outcome, ConnectionOutcome::Failed(ProtocolError::InvalidField(_))),
        "{outcome:?}"
    );
    assert_eq!(engine.controller().blacklist.score(peer(8)), 1);
    assert_eq!(engine.controller().verifying_count(), 0);
}

#[tokio::test]
async fn test_leaving_midway_is_not_penalized() {
    let (engine, _shutdown) = engine_with_ticks();
    let (mut client, task) = start(&engine, peer(9), ProtocolVersion::V1_21);
    client.login("Steve", Intent::Login).await;
    client.expect(PacketKind::LoginSuccess).await;
    drop(client);

    let outcome = task.await.unwrap();
    assert!(matches!(outcome, ConnectionOutcome::Disconnected), "{outcome:?}");
    assert_eq!(engine.controller().blacklist.score(peer(9)), 0);
}

#[tokio::test]
async fn test_reconnecting_too_fast_is_refused() {
    let (engine, _shutdown) = engine_with_ticks();
    let (client, task) = start(&engine, peer(10), ProtocolVersion::V1_21);
    let mut client = client;
    client.login("Steve", Intent::Login).await;
    client.expect(PacketKind::LoginSuccess).await;
    drop(client);
    task.await.unwrap();

    let (mut client, task) = start(&engine, peer(10), ProtocolVersion::V1_21);
    client.login("Steve", Intent::Login).await;
    let outcome = task.await.unwrap();
    assert!(matches!(outcome, ConnectionOutcome::Rejected(Rejection::Ratelimited)), "{outcome:?}");
}

#[tokio::test]
async fn test_captcha_required_while_pool_is_empty() {
    let mut config = fast_config();
    config.captcha.during_attack_only = false;
    let engine = Engine::new(config).unwrap();
    let (_tx, rx) = watch::channel(false);
    engine.spawn_ticks(rx);

    let (mut client, task) = start(&engine, peer(11), ProtocolVersion::V1_20_5);
    client.login("Steve", Intent::Login).await;
    let outcome = task.await.unwrap();
    assert!(
        matches!(outcome, ConnectionOutcome::Rejected(Rejection::CaptchaPreparing)),
        "{outcome:?}"
    );
}
