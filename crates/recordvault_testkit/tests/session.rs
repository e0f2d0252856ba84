//! Session lifetime and concurrent use of one vault.

use recordvault_core::{CoreError, Passcode, SessionState, VaultConfig};
use recordvault_testkit::prelude::*;
use std::sync::Arc;
use std::time::Duration;

const WINDOW: Duration = Duration::from_secs(120);

fn short_session() -> TestVault {
    TestVault::with_config(VaultConfig::for_testing().session_timeout(WINDOW))
}

#[tokio::test]
async fn session_expires_after_window() {
    let fixture = short_session();
    fixture.unlock(Passcode::new("2580")).await.unwrap();
    fixture.set("profile", b"Ada").await.unwrap();

    fixture.clock.advance(WINDOW - Duration::from_secs(1));
    assert!(fixture.is_unlocked());
    assert_eq!(fixture.get("profile").await.unwrap().as_deref(), Some(&b"Ada"[..]));

    fixture.clock.advance(Duration::from_secs(1));
    assert!(!fixture.is_unlocked());
    assert_eq!(fixture.session_state(), SessionState::Locked);
    assert!(matches!(
        fixture.get("profile").await,
        Err(CoreError::KeyUnavailable)
    ));
    assert!(matches!(
        fixture.set("profile", b"Ada").await,
        Err(CoreError::KeyUnavailable)
    ));
    assert!(!fixture.check_status().unlocked);
}

#[tokio::test]
async fn unlock_restarts_window() {
    let fixture = short_session();
    fixture.unlock(Passcode::new("2580")).await.unwrap();
    fixture.clock.advance(WINDOW - Duration::from_secs(5));

    fixture.unlock(Passcode::new("2580")).await.unwrap();
    fixture.clock.advance(Duration::from_secs(60));
    assert!(fixture.is_unlocked());
}

#[tokio::test]
async fn activity_extends_when_configured() {
    let fixture = TestVault::with_config(
        VaultConfig::for_testing()
            .session_timeout(WINDOW)
            .extend_session_on_use(true),
    );
    fixture.unlock(Passcode::new("2580")).await.unwrap();

    for _ in 0..4 {
        fixture.clock.advance(WINDOW / 2);
        fixture.set("profile", b"Ada").await.unwrap();
    }
    assert!(fixture.is_unlocked());

    fixture.clock.advance(WINDOW);
    assert!(!fixture.is_unlocked());
}

#[tokio::test]
async fn lock_is_immediate() {
    let fixture = TestVault::unlocked("2580").await;
    fixture.lock();
    assert!(!fixture.is_unlocked());
    assert!(matches!(
        fixture.ensure_encrypted("profile").await,
        Ok(recordvault_core::MigrationStatus::Skipped)
    ));
}

#[tokio::test]
async fn concurrent_writers_leave_a_readable_record() {
    let fixture = Arc::new(TestVault::unlocked("2580").await);

    let mut tasks = Vec::new();
    for i in 0..16u8 {
        let fixture = Arc::clone(&fixture);
        tasks.push(tokio::spawn(async move {
            let key = if i % 2 == 0 { "shared" } else { "other" };
            fixture.set(key, &[i; 32]).await.unwrap();
            fixture.ensure_encrypted(key).await.unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    for key in ["shared", "other"] {
        let value = fixture.get(key).await.unwrap().unwrap();
        assert_eq!(value.len(), 32);
        assert!(value.iter().all(|b| *b == value[0]));
    }
    assert!(fixture.check_status().integrity_ok);
}

#[tokio::test]
async fn lock_during_bulk_work_never_fails_midway() {
    let fixture = Arc::new(TestVault::with_legacy(
        (0..20).map(|i| (format!("record-{i}"), format!("legacy {i}").into_bytes())),
    ));
    fixture.unlock(Passcode::new("2580")).await.unwrap();

    let worker = {
        let fixture = Arc::clone(&fixture);
        tokio::spawn(async move { fixture.migrate_all().await.unwrap() })
    };
    fixture.lock();
    let report = worker.await.unwrap();

    // The pass snapshots the secret once: it either migrated everything or
    // skipped everything.
    assert!(report.is_clean());
    assert_eq!(report.total(), 20);
    assert!(report.migrated.len() == 20 || report.skipped.len() == 20);
}
