//! Credential Manager Tests
//!
//! Lazy client initialization exercised with counting fake builders.
//! No real clients are built; the builder decides per group whether the
//! key is accepted.

use sherpa_common::{CredentialsConfig, ServiceCategory};
use sherpad::credentials::{CredentialGroup, CredentialManager};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct TestClient {
    group: String,
}

type BuildFuture = Pin<Box<dyn Future<Output = anyhow::Result<TestClient>> + Send>>;

fn manager(groups: &[(&str, &str)], prefs: &[(ServiceCategory, &[&str])]) -> CredentialManager {
    let mut config = CredentialsConfig::default();
    for (name, key) in groups {
        config.groups.insert(name.to_string(), key.to_string());
    }
    for (category, names) in prefs {
        config
            .preferences
            .insert(*category, names.iter().map(|n| n.to_string()).collect());
    }
    CredentialManager::from_config(&config)
}

/// Builder that accepts only the given key and counts every invocation.
fn picky_builder(
    accept_key: &'static str,
    calls: Arc<AtomicU32>,
) -> impl Fn(CredentialGroup) -> BuildFuture {
    move |group| {
        let calls = calls.clone();
        Box::pin(async move {
            calls.fetch_add(1, Ordering::SeqCst);
            if group.key != accept_key {
                anyhow::bail!("key rejected for group '{}'", group.name);
            }
            Ok(TestClient { group: group.name })
        })
    }
}

// ============================================================================
// Caching
// ============================================================================

/// The first successful build is cached; later calls never rebuild.
#[tokio::test]
async fn successful_build_is_cached() {
    let m = manager(&[("alpha", "ka")], &[]);
    let calls = Arc::new(AtomicU32::new(0));

    let first = m
        .initialize_client(
            ServiceCategory::Mapping,
            "probe",
            picky_builder("ka", calls.clone()),
        )
        .await
        .unwrap();
    let second = m
        .initialize_client(
            ServiceCategory::Mapping,
            "probe",
            picky_builder("ka", calls.clone()),
        )
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.group, "alpha");
}

/// Different service names cache independently, even in one category.
#[tokio::test]
async fn services_cache_per_name() {
    let m = manager(&[("alpha", "ka")], &[]);
    let calls = Arc::new(AtomicU32::new(0));

    let weather = m
        .initialize_client(
            ServiceCategory::Mapping,
            "weather",
            picky_builder("ka", calls.clone()),
        )
        .await
        .unwrap();
    let geocode = m
        .initialize_client(
            ServiceCategory::Mapping,
            "geocode",
            picky_builder("ka", calls.clone()),
        )
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(!Arc::ptr_eq(&weather, &geocode));

    let statuses = m.service_statuses().await;
    assert!(statuses["weather"].initialized);
    assert!(statuses["geocode"].initialized);
}

// ============================================================================
// Group iteration
// ============================================================================

/// Groups are tried in preference order, each at most once, until one
/// of them builds.
#[tokio::test]
async fn groups_are_tried_in_order_until_one_builds() {
    let m = manager(
        &[("alpha", "bad-a"), ("beta", "bad-b"), ("gamma", "good")],
        &[(ServiceCategory::ImageAnalysis, &["alpha", "beta", "gamma"])],
    );
    let calls = Arc::new(AtomicU32::new(0));

    let client = m
        .initialize_client(
            ServiceCategory::ImageAnalysis,
            "vision",
            picky_builder("good", calls.clone()),
        )
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(client.group, "gamma");

    let statuses = m.service_statuses().await;
    assert!(statuses["vision"].initialized);
    assert_eq!(statuses["vision"].assigned_group.as_deref(), Some("gamma"));
}

/// Exhausting every group disables the feature instead of failing.
#[tokio::test]
async fn exhaustion_degrades_to_none() {
    let m = manager(&[("alpha", "bad-a"), ("beta", "bad-b")], &[]);
    let calls = Arc::new(AtomicU32::new(0));

    let client = m
        .initialize_client(
            ServiceCategory::Translation,
            "translate",
            picky_builder("good", calls.clone()),
        )
        .await;

    assert!(client.is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let statuses = m.service_statuses().await;
    assert!(!statuses["translate"].initialized);
    assert!(statuses["translate"]
        .last_error
        .as_deref()
        .unwrap()
        .contains("key rejected"));
}

/// No groups at all records the missing credential and returns nothing.
#[tokio::test]
async fn no_groups_records_missing_credential() {
    let m = manager(&[], &[]);
    let calls = Arc::new(AtomicU32::new(0));

    let client = m
        .initialize_client(
            ServiceCategory::SpeechSynthesis,
            "tts",
            picky_builder("any", calls.clone()),
        )
        .await;

    assert!(client.is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let statuses = m.service_statuses().await;
    assert_eq!(
        statuses["tts"].last_error.as_deref(),
        Some("no credential available")
    );
}

/// A failed service is not cached, so a later call can bring it up.
#[tokio::test]
async fn failed_service_recovers_on_a_later_call() {
    let m = manager(&[("alpha", "ka")], &[]);
    let failing = Arc::new(AtomicU32::new(0));
    let working = Arc::new(AtomicU32::new(0));

    let down = m
        .initialize_client(
            ServiceCategory::ObjectStorage,
            "bucket",
            picky_builder("other", failing.clone()),
        )
        .await;
    assert!(down.is_none());
    assert!(!m.service_statuses().await["bucket"].initialized);

    let up = m
        .initialize_client(
            ServiceCategory::ObjectStorage,
            "bucket",
            picky_builder("ka", working.clone()),
        )
        .await;
    assert!(up.is_some());
    assert_eq!(working.load(Ordering::SeqCst), 1);

    let statuses = m.service_statuses().await;
    assert!(statuses["bucket"].initialized);
    assert_eq!(statuses["bucket"].assigned_group.as_deref(), Some("alpha"));
}
