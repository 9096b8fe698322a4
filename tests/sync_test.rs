use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use paylink_sync::checkpoint::{CheckpointStore, FileCheckpointStore};
use paylink_sync::config::SyncConfig;
use paylink_sync::provider::{CheckoutProvider, CheckoutSession, CustomerDetails, SessionPage};
use paylink_sync::snapshot::{list_snapshots, read_snapshot, FileSnapshotWriter};
use paylink_sync::{SyncError, SyncReport, SyncStatus, Synchronizer};
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Serves fixed per-link session lists in pages, optionally failing on a link.
#[derive(Default)]
struct ScriptedProvider {
    sessions: HashMap<String, Vec<CheckoutSession>>,
    failing_link: Option<String>,
    requests: Mutex<Vec<(String, Option<String>)>>,
}

impl ScriptedProvider {
    fn with_link(mut self, link: &str, sessions: Vec<CheckoutSession>) -> Self {
        self.sessions.insert(link.to_string(), sessions);
        self
    }

    fn failing_on(mut self, link: &str) -> Self {
        self.failing_link = Some(link.to_string());
        self
    }

    fn requested_links(&self) -> Vec<String> {
        self.requests.lock().unwrap().iter().map(|(l, _)| l.clone()).collect()
    }
}

#[async_trait]
impl CheckoutProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "Scripted"
    }

    async fn list_sessions(
        &self,
        payment_link: &str,
        starting_after: Option<&str>,
        limit: u32,
    ) -> anyhow::Result<SessionPage> {
        self.requests
            .lock()
            .unwrap()
            .push((payment_link.to_string(), starting_after.map(str::to_string)));

        if self.failing_link.as_deref() == Some(payment_link) {
            anyhow::bail!("Stripe API error: 502 Bad Gateway");
        }

        let all = self.sessions.get(payment_link).cloned().unwrap_or_default();
        let start = match starting_after {
            Some(cursor) => all.iter().position(|s| s.id == cursor).map_or(all.len(), |i| i + 1),
            None => 0,
        };
        let end = (start + limit as usize).min(all.len());
        Ok(SessionPage {
            data: all[start..end].to_vec(),
            has_more: end < all.len(),
        })
    }
}

fn session(id: &str, link: &str, status: &str, created: i64, amount: i64) -> CheckoutSession {
    CheckoutSession {
        id: id.to_string(),
        payment_link: Some(link.to_string()),
        payment_status: status.to_string(),
        created,
        amount_total: Some(amount),
        currency: Some("usd".to_string()),
        customer_details: Some(CustomerDetails {
            email: Some(format!("{}@example.com", id)),
            name: None,
        }),
    }
}

fn synchronizer(provider: Arc<ScriptedProvider>, dir: &Path, links: &[&str]) -> Synchronizer {
    Synchronizer::new(
        provider,
        Arc::new(FileCheckpointStore::in_dir(dir)),
        Arc::new(FileSnapshotWriter::new(dir)),
        links.iter().map(|l| l.to_string()).collect(),
    )
}

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

async fn stored_checkpoint(dir: &Path) -> i64 {
    FileCheckpointStore::in_dir(dir).read().await.unwrap()
}

#[tokio::test]
async fn exports_new_paid_sessions_and_advances_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    FileCheckpointStore::in_dir(dir.path()).write(1_700_000_000).await.unwrap();

    let provider = Arc::new(
        ScriptedProvider::default()
            .with_link(
                "A",
                vec![
                    session("cs_1", "A", "paid", 1_700_000_500, 1999),
                    session("cs_2", "A", "unpaid", 1_700_000_600, 500),
                ],
            )
            .with_link("B", Vec::new()),
    );
    let sync = synchronizer(provider.clone(), dir.path(), &["A", "B"]);

    let now = at(1_700_001_000);
    let report = sync.run_at(now).await.unwrap();

    assert_eq!(report.status, SyncStatus::Success);
    assert_eq!(report.data.len(), 1);
    let record = &report.data[0];
    assert_eq!(record.resource_id, "A");
    assert_eq!(record.amount, dec!(19.99));
    assert_eq!(record.currency, "USD");
    assert_eq!(record.customer_email.as_deref(), Some("cs_1@example.com"));
    assert_eq!(record.created, "2023-11-14 22:21");

    assert_eq!(stored_checkpoint(dir.path()).await, 1_700_001_000);
    assert_eq!(report.checkpoint, Some(1_700_001_000));

    let snapshots = list_snapshots(dir.path()).await.unwrap();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(report.snapshot.as_ref(), Some(&snapshots[0]));
    assert!(snapshots[0].ends_with("paid_sessions_2023-11-14_22-30.json"));
    assert_eq!(read_snapshot(&snapshots[0]).await.unwrap().len(), 1);

    assert_eq!(provider.requested_links(), vec!["A", "B"]);
}

#[tokio::test]
async fn second_run_without_new_data_reports_no_new_data() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(ScriptedProvider::default().with_link(
        "A",
        vec![session("cs_1", "A", "paid", 1_700_000_500, 1000)],
    ));
    let sync = synchronizer(provider, dir.path(), &["A"]);

    let first = sync.run_at(at(1_700_001_000)).await.unwrap();
    assert_eq!(first.status, SyncStatus::Success);

    let second = sync.run_at(at(1_700_001_030)).await.unwrap();
    assert_eq!(second.status, SyncStatus::NoNewData);
    assert!(second.data.is_empty());
    assert!(second.snapshot.is_none());

    assert_eq!(stored_checkpoint(dir.path()).await, 1_700_001_030);
    assert_eq!(list_snapshots(dir.path()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn failed_fetch_leaves_checkpoint_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    FileCheckpointStore::in_dir(dir.path()).write(1_700_000_000).await.unwrap();

    let provider = Arc::new(
        ScriptedProvider::default()
            .with_link("A", vec![session("cs_1", "A", "paid", 1_700_000_500, 1999)])
            .failing_on("B"),
    );
    let sync = synchronizer(provider, dir.path(), &["A", "B"]);

    let err = sync.run_at(at(1_700_001_000)).await.unwrap_err();
    match &err {
        SyncError::Fetch { link, .. } => assert_eq!(link, "B"),
        other => panic!("unexpected error: {:?}", other),
    }

    assert_eq!(stored_checkpoint(dir.path()).await, 1_700_000_000);
    assert!(list_snapshots(dir.path()).await.unwrap().is_empty());

    let report = SyncReport::failure(&anyhow::Error::from(err));
    assert!(report.is_error());
    assert!(report.data.is_empty());
    assert!(report.trace.unwrap().contains("502 Bad Gateway"));
}

#[tokio::test]
async fn records_concatenate_in_link_order_across_pages() {
    let dir = tempfile::tempdir().unwrap();
    let a: Vec<CheckoutSession> = (0..150)
        .map(|n| session(&format!("cs_a{}", n), "A", "paid", 1_000 + n, 100))
        .collect();
    let b = vec![session("cs_b0", "B", "paid", 5_000, 200)];
    let provider = Arc::new(ScriptedProvider::default().with_link("A", a).with_link("B", b));
    let sync = synchronizer(provider.clone(), dir.path(), &["A", "B"]);

    let report = sync.run_at(at(10_000)).await.unwrap();

    assert_eq!(report.data.len(), 151);
    assert!(report.data[..150].iter().all(|r| r.resource_id == "A"));
    assert_eq!(report.data[150].resource_id, "B");

    let requests = provider.requests.lock().unwrap().clone();
    assert_eq!(
        requests,
        vec![
            ("A".to_string(), None),
            ("A".to_string(), Some("cs_a99".to_string())),
            ("B".to_string(), None),
        ]
    );

    let stored = read_snapshot(report.snapshot.as_ref().unwrap()).await.unwrap();
    let emails: Vec<_> = stored.iter().map(|r| r.customer_email.clone()).collect();
    let expected: Vec<_> = report.data.iter().map(|r| r.customer_email.clone()).collect();
    assert_eq!(emails, expected);
}

#[tokio::test]
async fn blank_links_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(ScriptedProvider::default());
    let sync = synchronizer(provider.clone(), dir.path(), &["", "  ", "C"]);

    let report = sync.run_at(at(2_000)).await.unwrap();

    assert_eq!(report.status, SyncStatus::NoNewData);
    assert_eq!(provider.requested_links(), vec!["C"]);
    assert_eq!(stored_checkpoint(dir.path()).await, 2_000);
}

#[tokio::test]
async fn checkpoint_never_moves_backwards() {
    let dir = tempfile::tempdir().unwrap();
    FileCheckpointStore::in_dir(dir.path()).write(5_000).await.unwrap();
    let sync = synchronizer(Arc::new(ScriptedProvider::default()), dir.path(), &["A"]);

    let report = sync.run_at(at(4_000)).await.unwrap();

    assert_eq!(report.checkpoint, Some(5_000));
    assert_eq!(stored_checkpoint(dir.path()).await, 5_000);
}

#[tokio::test]
async fn unreadable_checkpoint_location_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocked");
    std::fs::write(&blocker, "not a directory").unwrap();

    let provider = Arc::new(ScriptedProvider::default().with_link(
        "A",
        vec![session("cs_1", "A", "paid", 1_500, 100)],
    ));
    let sync = synchronizer(provider.clone(), &blocker.join("exports"), &["A"]);

    let err = sync.run_at(at(2_000)).await.unwrap_err();
    assert!(matches!(err, SyncError::Storage { .. }));
    assert!(provider.requested_links().is_empty());
}

#[tokio::test]
async fn failed_snapshot_write_keeps_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state");
    FileCheckpointStore::in_dir(&state).write(1_000).await.unwrap();
    let blocker = dir.path().join("blocked");
    std::fs::write(&blocker, "not a directory").unwrap();

    let provider = Arc::new(ScriptedProvider::default().with_link(
        "A",
        vec![session("cs_1", "A", "paid", 1_500, 100)],
    ));
    let sync = Synchronizer::new(
        provider.clone(),
        Arc::new(FileCheckpointStore::in_dir(&state)),
        Arc::new(FileSnapshotWriter::new(blocker.join("snaps"))),
        vec!["A".to_string()],
    );

    let err = sync.run_at(at(2_000)).await.unwrap_err();
    match &err {
        SyncError::Storage { path, .. } => assert!(path.starts_with(&blocker)),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(provider.requested_links(), vec!["A"]);
    assert_eq!(stored_checkpoint(&state).await, 1_000);
}

#[tokio::test]
async fn mock_runs_leave_live_state_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let config = SyncConfig {
        data_dir: dir.path().to_path_buf(),
        ..SyncConfig::default()
    };

    let demo = Synchronizer::from_config(&config, true).unwrap();
    demo.run_at(at(2_000)).await.unwrap();

    assert_eq!(stored_checkpoint(&dir.path().join("mock")).await, 2_000);
    assert_eq!(stored_checkpoint(dir.path()).await, 0);
    assert!(list_snapshots(dir.path()).await.unwrap().is_empty());

    let provider = Arc::new(ScriptedProvider::default().with_link(
        "A",
        vec![session("cs_1", "A", "paid", 1_500, 100)],
    ));
    let live = synchronizer(provider, dir.path(), &["A"]);
    let report = live.run_at(at(3_000)).await.unwrap();

    assert_eq!(report.status, SyncStatus::Success);
    assert_eq!(report.data.len(), 1);
    assert_eq!(stored_checkpoint(dir.path()).await, 3_000);
}

#[tokio::test]
async fn live_config_without_links_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = SyncConfig {
        api_key: "sk_test".to_string(),
        payment_links: vec![String::new()],
        data_dir: dir.path().to_path_buf(),
        ..SyncConfig::default()
    };

    assert!(matches!(Synchronizer::from_config(&config, false), Err(SyncError::Config(_))));
    assert!(Synchronizer::from_config(&config, true).is_ok());
}

#[tokio::test]
async fn report_serializes_as_endpoint_payload() {
    let dir = tempfile::tempdir().unwrap();
    let sync = synchronizer(Arc::new(ScriptedProvider::default()), dir.path(), &["A"]);

    let report = sync.run_at(at(2_000)).await.unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["status"], "no_new_data");
    assert_eq!(json["data"], serde_json::json!([]));
    assert!(json.get("message").is_none());
    assert!(json.get("checkpoint").is_none());
}

#[tokio::test]
async fn success_payload_omits_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(ScriptedProvider::default().with_link(
        "A",
        vec![session("cs_1", "A", "paid", 1_500, 100)],
    ));
    let sync = synchronizer(provider, dir.path(), &["A"]);

    let report = sync.run_at(at(2_000)).await.unwrap();
    assert_eq!(report.checkpoint, Some(2_000));

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["status"], "success");
    assert_eq!(json["data"].as_array().map(Vec::len), Some(1));
    assert!(json.get("snapshot").is_some());
    assert!(json.get("checkpoint").is_none());
}
