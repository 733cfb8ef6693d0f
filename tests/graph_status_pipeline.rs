mod support;

use std::sync::Arc;
use std::time::Duration;

use graph_status_api::models::{MetaSnapshot, NodeKind, StatusEvent, StatusReport};
use graph_status_api::services::{GraphStatusService, RunOutcome};
use tokio::sync::mpsc;
use tokio::time::Instant;

use support::{allocations, collect_run, manifest, meta, source, sources, FakeSource};

fn report(events: &[StatusEvent]) -> &StatusReport {
    match events.last() {
        Some(StatusEvent::Done { data }) => data,
        other => panic!("run did not end with a done event: {:?}", other),
    }
}

fn messages(events: &[StatusEvent]) -> Vec<&str> {
    events
        .iter()
        .filter_map(|event| match event {
            StatusEvent::Status { message } => Some(message.as_str()),
            StatusEvent::Done { .. } => None,
        })
        .collect()
}

fn service(fake: &Arc<FakeSource>) -> GraphStatusService {
    GraphStatusService::new(fake.clone())
}

#[tokio::test]
async fn test_one_entry_per_enabled_source() {
    let mut fake = FakeSource::default();
    fake.metas.insert("QmPnl".into(), meta(150, "QmPnlDeployment"));
    fake.metas.insert("QmOrders".into(), meta(90, "QmOrdersDeployment"));
    let fake = Arc::new(fake);

    let config = sources(vec![
        ("pnl", source(true, "QmPnl", &[])),
        ("orders", source(true, "QmOrders", &[])),
        ("activity", source(true, "QmMissing", &[])),
        ("legacy", source(false, "QmLegacy", &[])),
    ]);

    let (events, outcome) = collect_run(&service(&fake), &config).await;
    assert_eq!(outcome, RunOutcome::Completed);

    let names: Vec<&str> = report(&events).sources.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["activity", "orders", "pnl"]);
    assert_eq!(fake.count_calls("meta:QmLegacy"), 0);
    assert_eq!(events.iter().filter(|e| e.is_done()).count(), 1);
}

#[tokio::test]
async fn test_meta_error_yields_zeroed_status() {
    let mut fake = FakeSource::default();
    fake.metas
        .insert("QmBroken".into(), MetaSnapshot::error("indexing failed"));
    let fake = Arc::new(fake);

    let config = sources(vec![(
        "positions",
        source(true, "QmBroken", &[("UserPosition", "positions_user_position")]),
    )]);

    let (events, _) = collect_run(&service(&fake), &config).await;
    let status = &report(&events).sources["positions"];

    assert_eq!(status.meta, MetaSnapshot::error("indexing failed"));
    assert!(status.contract_nodes.is_empty());
    assert!(status.output_entities.is_empty());
    assert_eq!(status.indexer_info.indexer_count, 0);
    assert!(status.indexer_info.error.is_none());
    assert_eq!(status.stats.progress, 0.0);
    assert_eq!(status.deployment_id, None);
    assert_eq!(status.configured_entities, vec!["UserPosition"]);
    assert_eq!(status.entity_stats["UserPosition"], 0);

    // No deployment means no manifest, allocation or chain lookups
    assert_eq!(fake.calls(), vec!["counts", "meta:QmBroken"]);
}

#[tokio::test]
async fn test_full_run_merges_all_sources_of_data() {
    let mut fake = FakeSource::default();
    fake.metas.insert("QmPnl".into(), meta(150, "QmPnlDeployment"));
    fake.manifests.insert(
        "QmPnlDeployment".into(),
        manifest("mainnet", 100, &["UserPosition", "Condition"]),
    );
    fake.allocations
        .insert("QmPnlDeployment".into(), allocations(14));
    fake.heads.insert("mainnet".into(), 200);
    fake.counts.insert("pnl/UserPosition".into(), 1234);
    fake.counts.insert("orders/UserPosition".into(), 99);
    let fake = Arc::new(fake);

    let config = sources(vec![(
        "pnl",
        source(
            true,
            "QmPnl",
            &[("UserPosition", "pnl_user_position"), ("Condition", "pnl_condition")],
        ),
    )]);

    let (events, outcome) = collect_run(&service(&fake), &config).await;
    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(
        messages(&events),
        vec![
            "Loading local entity counts...",
            "Querying 1 subgraph meta...",
            "Fetching manifests and indexer allocations...",
            "Querying block heights for 1 chains...",
            "Computing statistics...",
            "Done",
        ]
    );

    let status = &report(&events).sources["pnl"];
    assert_eq!(status.source_name, "pnl");
    assert_eq!(status.subgraph_id, "QmPnl");
    assert_eq!(status.deployment_id.as_deref(), Some("QmPnlDeployment"));
    assert_eq!(status.stats.progress, 50.0);
    assert_eq!(status.indexer_info.indexer_count, 14);
    assert_eq!(status.indexer_info.indexers.len(), 10);
    assert_eq!(
        status.output_entities,
        vec!["Condition", "Market", "UserPosition"]
    );
    assert_eq!(status.configured_entities, vec!["UserPosition", "Condition"]);
    assert_eq!(status.entity_stats["UserPosition"], 1234);
    assert_eq!(status.entity_stats["Condition"], 0);

    let nodes = &status.contract_nodes;
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0].kind, NodeKind::Static);
    assert_eq!(nodes[0].progress, Some(50.0));
    assert_eq!(nodes[0].behind, 50);
    assert_eq!(nodes[0].network_display, "Ethereum");
    assert_eq!(nodes[1].kind, NodeKind::Dynamic);
    assert_eq!(nodes[1].progress, None);
    assert_eq!(nodes[1].head, Some(200));
}

#[tokio::test]
async fn test_shared_network_head_fetched_once() {
    let mut fake = FakeSource::default();
    fake.metas.insert("QmA".into(), meta(150, "QmDeployA"));
    fake.metas.insert("QmB".into(), meta(180, "QmDeployB"));
    fake.manifests
        .insert("QmDeployA".into(), manifest("mainnet", 100, &["Trade"]));
    fake.manifests
        .insert("QmDeployB".into(), manifest("mainnet", 0, &["Split"]));
    fake.heads.insert("mainnet".into(), 200);
    let fake = Arc::new(fake);

    let config = sources(vec![
        ("trades", source(true, "QmA", &[])),
        ("splits", source(true, "QmB", &[])),
    ]);

    let (events, _) = collect_run(&service(&fake), &config).await;
    assert_eq!(fake.count_calls("head:mainnet"), 1);

    let report = report(&events);
    assert_eq!(report.sources["trades"].stats.progress, 50.0);
    assert_eq!(report.sources["splits"].stats.progress, 90.0);
}

#[tokio::test]
async fn test_zero_enabled_sources() {
    let fake = Arc::new(FakeSource::default());
    let config = sources(vec![("legacy", source(false, "QmLegacy", &[]))]);

    let (events, outcome) = collect_run(&service(&fake), &config).await;

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0], StatusEvent::status("no sources enabled"));
    let report = report(&events);
    assert!(report.sources.is_empty());
    assert!(report.generated_at.is_some());
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn test_missing_manifest_degrades_to_empty_nodes() {
    let mut fake = FakeSource::default();
    fake.metas.insert("QmPnl".into(), meta(150, "QmGone"));
    fake.allocations.insert("QmGone".into(), allocations(3));
    let fake = Arc::new(fake);

    let config = sources(vec![("pnl", source(true, "QmPnl", &[]))]);

    let (events, outcome) = collect_run(&service(&fake), &config).await;
    assert_eq!(outcome, RunOutcome::Completed);
    assert!(!messages(&events)
        .iter()
        .any(|m| m.starts_with("Querying block heights")));

    let status = &report(&events).sources["pnl"];
    assert_eq!(status.deployment_id.as_deref(), Some("QmGone"));
    assert!(status.contract_nodes.is_empty());
    assert!(status.output_entities.is_empty());
    assert_eq!(status.indexer_info.indexer_count, 3);
    assert_eq!(status.stats.progress, 0.0);
    assert_eq!(fake.count_calls("manifest:QmGone"), 1);
}

#[tokio::test]
async fn test_manifests_cached_across_runs_heads_are_not() {
    let mut fake = FakeSource::default();
    fake.metas.insert("QmPnl".into(), meta(150, "QmPnlDeployment"));
    fake.manifests
        .insert("QmPnlDeployment".into(), manifest("matic", 100, &["Trade"]));
    fake.heads.insert("matic".into(), 200);
    let fake = Arc::new(fake);

    let service = service(&fake);
    let config = sources(vec![("pnl", source(true, "QmPnl", &[]))]);

    collect_run(&service, &config).await;
    collect_run(&service, &config).await;

    assert_eq!(fake.count_calls("manifest:QmPnlDeployment"), 1);
    assert_eq!(fake.count_calls("head:matic"), 2);
    assert_eq!(fake.count_calls("meta:QmPnl"), 2);
    assert_eq!(service.manifest_cache().len(), 1);
}

#[tokio::test]
async fn test_failed_manifest_is_not_cached() {
    let mut fake = FakeSource::default();
    fake.metas.insert("QmPnl".into(), meta(150, "QmGone"));
    let fake = Arc::new(fake);

    let service = service(&fake);
    let config = sources(vec![("pnl", source(true, "QmPnl", &[]))]);

    collect_run(&service, &config).await;
    collect_run(&service, &config).await;

    assert_eq!(fake.count_calls("manifest:QmGone"), 2);
    assert!(service.manifest_cache().is_empty());
}

#[tokio::test]
async fn test_unknown_head_keeps_node_unranked() {
    let mut fake = FakeSource::default();
    fake.metas.insert("QmPnl".into(), meta(150, "QmPnlDeployment"));
    fake.manifests
        .insert("QmPnlDeployment".into(), manifest("gnosis", 100, &["Trade"]));
    let fake = Arc::new(fake);

    let config = sources(vec![("pnl", source(true, "QmPnl", &[]))]);
    let (events, _) = collect_run(&service(&fake), &config).await;

    let status = &report(&events).sources["pnl"];
    assert_eq!(status.contract_nodes[0].head, None);
    assert_eq!(status.contract_nodes[0].progress, Some(0.0));
    assert_eq!(status.stats.progress, 0.0);
    assert_eq!(fake.count_calls("head:gnosis"), 1);
}

#[tokio::test]
async fn test_disconnected_consumer_stops_run() {
    let mut fake = FakeSource::default();
    fake.metas.insert("QmPnl".into(), meta(150, "QmPnlDeployment"));
    let fake = Arc::new(fake);

    let config = sources(vec![("pnl", source(true, "QmPnl", &[]))]);
    let (tx, rx) = mpsc::channel(4);
    drop(rx);

    let outcome = service(&fake).run(&config, &tx).await;

    assert_eq!(outcome, RunOutcome::Disconnected);
    assert!(fake.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_stage_calls_run_concurrently() {
    let delay = Duration::from_millis(300);
    let mut fake = FakeSource::default();
    fake.delay = Some(delay);
    for (id, network) in [("QmPnl", "mainnet"), ("QmOrders", "base"), ("QmSplits", "matic")] {
        let deployment = format!("{}Deployment", id);
        fake.metas.insert(id.into(), meta(150, &deployment));
        fake.manifests
            .insert(deployment.clone(), manifest(network, 100, &["Trade"]));
        fake.allocations.insert(deployment, allocations(1));
        fake.heads.insert(network.into(), 200);
    }
    let fake = Arc::new(fake);

    let config = sources(vec![
        ("pnl", source(true, "QmPnl", &[])),
        ("orders", source(true, "QmOrders", &[])),
        ("splits", source(true, "QmSplits", &[])),
    ]);

    let started = Instant::now();
    let (events, outcome) = collect_run(&service(&fake), &config).await;
    let elapsed = started.elapsed();

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(report(&events).sources.len(), 3);
    assert_eq!(fake.calls().len(), 13);

    // counts, meta, manifest with allocations, chain heads: one delay each
    assert!(elapsed >= delay * 4, "elapsed {:?}", elapsed);
    assert!(elapsed < delay * 5, "elapsed {:?}", elapsed);
}
