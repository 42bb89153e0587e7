//! Integration tests for linkbase-store
//!
//! These tests load loader output into SQLite, complete networks from it and
//! persist and query the resulting relationships.

use linkbase_domain::arc::semantic_key;
use linkbase_domain::{
    AnalyserMode, Arc, ArcOrder, ArcUse, DocumentRecord, ExtendedLink, Fragment, FragmentIndex,
    FragmentKind, FragmentStore, Network, NetworkError, PersistedRelationship, RelationshipQuery,
    RelationshipStore,
};
use linkbase_store::{SqliteStore, StoreConfig, StoreError};
use std::collections::BTreeMap;
use std::time::Duration;

const LINK_ROLE: &str = "http://www.xbrl.org/2003/role/link";
const PARENT_CHILD: &str = "http://www.xbrl.org/2003/arcrole/parent-child";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn arc(index: &str, order: &str) -> Arc {
    let key = semantic_key(PARENT_CHILD, &ArcOrder::parse(order).unwrap(), &BTreeMap::new());
    Arc::new(index, PARENT_CHILD, key).with_order(order).unwrap()
}

fn member(link: &str, label: &str, fragment: &str) -> DocumentRecord {
    DocumentRecord::Member {
        link: link.into(),
        label: label.to_string(),
        fragment: fragment.into(),
    }
}

fn arc_record(link: &str, from: &str, to: &str, arc: Arc) -> DocumentRecord {
    DocumentRecord::Arc {
        link: link.into(),
        from: from.to_string(),
        to: to.to_string(),
        arc,
    }
}

/// A presentation link: Assets -> {Cash (1), Receivables (2)}, Cash -> CashOnHand (1)
fn presentation() -> Vec<DocumentRecord> {
    let mut records = vec![DocumentRecord::ExtendedLink(ExtendedLink::new("pre1", LINK_ROLE))];
    for concept in ["Assets", "Cash", "Receivables", "CashOnHand"] {
        records.push(DocumentRecord::Fragment(
            Fragment::new(concept, FragmentKind::Concept).with_name(format!("us-gaap:{concept}")),
        ));
        let locator = format!("loc_{concept}");
        records.push(DocumentRecord::Fragment(Fragment::locator(locator.as_str(), concept)));
        records.push(member("pre1", concept, &locator));
    }
    records.push(arc_record("pre1", "Assets", "Receivables", arc("pre_a1", "2")));
    records.push(arc_record("pre1", "Assets", "Cash", arc("pre_a2", "1")));
    records.push(arc_record("pre1", "Cash", "CashOnHand", arc("pre_a3", "1")));
    records
}

/// A second link with the same role prohibiting Assets -> Receivables
fn prohibition() -> Vec<DocumentRecord> {
    vec![
        DocumentRecord::ExtendedLink(ExtendedLink::new("pre2", LINK_ROLE)),
        DocumentRecord::Fragment(Fragment::locator("loc2_Assets", "Assets")),
        DocumentRecord::Fragment(Fragment::locator("loc2_Receivables", "Receivables")),
        member("pre2", "Assets", "loc2_Assets"),
        member("pre2", "Receivables", "loc2_Receivables"),
        arc_record(
            "pre2",
            "Assets",
            "Receivables",
            arc("pre_p1", "2").with_priority(1).with_use(ArcUse::Prohibited),
        ),
    ]
}

fn loaded(records: Vec<DocumentRecord>) -> SqliteStore {
    init_tracing();
    let mut store = SqliteStore::new(":memory:").unwrap();
    store.load(records).unwrap();
    store
}

fn names(relationships: &[linkbase_domain::Relationship]) -> Vec<String> {
    relationships
        .iter()
        .map(|r| r.target_index().to_string())
        .collect()
}

#[test]
fn test_store_initialization() {
    let store = SqliteStore::new(":memory:");
    assert!(store.is_ok(), "Store should initialize successfully");
}

#[test]
fn test_load_and_get_fragment() {
    let store = loaded(presentation());

    let cash = store.get_fragment(&"Cash".into()).unwrap().unwrap();
    assert_eq!(cash.kind, FragmentKind::Concept);
    assert_eq!(cash.name.as_deref(), Some("us-gaap:Cash"));

    let locator = store.get_fragment(&"loc_Cash".into()).unwrap().unwrap();
    assert_eq!(locator.kind.locator_target(), Some(&FragmentIndex::new("Cash")));

    assert!(store.get_fragment(&"Missing".into()).unwrap().is_none());
}

#[test]
fn test_roles_and_links() {
    let mut records = presentation();
    records.extend(prohibition());
    let store = loaded(records);

    assert_eq!(store.link_roles().unwrap(), vec![LINK_ROLE.to_string()]);
    assert_eq!(
        FragmentStore::arc_roles(&store).unwrap(),
        vec![PARENT_CHILD.to_string()]
    );

    let links = store.extended_links_with_role(LINK_ROLE).unwrap();
    let indexes: Vec<&str> = links.iter().map(|l| l.index.as_str()).collect();
    assert_eq!(indexes, vec!["pre1", "pre2"]);
    assert!(store.extended_links_with_role("other").unwrap().is_empty());
}

#[test]
fn test_arcs_keep_their_attributes() {
    let mut records = presentation();
    records.extend(prohibition());
    let store = loaded(records);

    let link = ExtendedLink::new("pre2", LINK_ROLE);
    let arcs = store.arcs_by_arcrole(&link, PARENT_CHILD).unwrap();
    assert_eq!(arcs.len(), 1);
    assert_eq!(arcs[0].order(), "2");
    assert_eq!(arcs[0].priority(), 1);
    assert!(arcs[0].is_prohibited());

    let sources = store.arc_sources(&arcs[0]).unwrap();
    assert_eq!(sources.len(), 1);
    assert!(sources[0].is_locator());
}

#[test]
fn test_unknown_arc_is_not_found() {
    let store = loaded(presentation());
    let err = store.arc_targets(&arc("nowhere", "1")).unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[test]
fn test_network_completes_from_sqlite() {
    let store = loaded(presentation());

    let mut network = Network::new(LINK_ROLE, PARENT_CHILD).unwrap();
    let added = network.complete(&store).unwrap();
    assert_eq!(added, 3);

    let visited: Vec<(String, usize)> = network
        .tree()
        .unwrap()
        .map(|node| (node.fragment.index.to_string(), node.depth))
        .collect();
    assert_eq!(
        visited,
        vec![
            ("Assets".to_string(), 0),
            ("Cash".to_string(), 1),
            ("CashOnHand".to_string(), 2),
            ("Receivables".to_string(), 1),
        ]
    );
}

#[test]
fn test_locator_chain_fails_completion() {
    let records = vec![
        DocumentRecord::ExtendedLink(ExtendedLink::new("pre1", LINK_ROLE)),
        DocumentRecord::Fragment(Fragment::new("A", FragmentKind::Concept)),
        DocumentRecord::Fragment(Fragment::new("B", FragmentKind::Concept)),
        DocumentRecord::Fragment(Fragment::locator("loc_B", "B")),
        DocumentRecord::Fragment(Fragment::locator("loc_loc", "loc_B")),
        DocumentRecord::Fragment(Fragment::locator("loc_A", "A")),
        member("pre1", "A", "loc_A"),
        member("pre1", "B", "loc_loc"),
        arc_record("pre1", "A", "B", arc("a1", "1")),
    ];
    let store = loaded(records);

    let mut network = Network::new(LINK_ROLE, PARENT_CHILD).unwrap();
    let err = network.complete(&store).unwrap_err();
    match err {
        NetworkError::Completion { source, .. } => {
            assert!(matches!(*source, NetworkError::UnsupportedLocatorChain { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_store_all_relationships_honours_prohibition() {
    let mut records = presentation();
    records.extend(prohibition());
    let mut store = loaded(records);

    let summary = store.store_all_relationships(None).unwrap();
    assert_eq!(summary.stored, 2);
    assert_eq!(summary.removed, 0);

    let analyser = store.analyser(AnalyserMode::ActiveOnly);
    let children = analyser
        .children(&"Assets".into(), LINK_ROLE, PARENT_CHILD)
        .unwrap();
    assert_eq!(names(&children), vec!["Cash"]);

    let roots = analyser.roots(LINK_ROLE, PARENT_CHILD).unwrap();
    assert!(roots.contains(&FragmentIndex::new("Assets")));
    assert_eq!(roots.len(), 1);

    assert_eq!(analyser.arc_roles().unwrap(), vec![PARENT_CHILD.to_string()]);
    assert_eq!(
        analyser.link_roles(PARENT_CHILD).unwrap(),
        vec![LINK_ROLE.to_string()]
    );
}

#[test]
fn test_restoring_removes_newly_prohibited() {
    let mut store = loaded(presentation());
    let first = store.store_all_relationships(None).unwrap();
    assert_eq!(first.stored, 3);

    store.load(prohibition()).unwrap();
    let second = store.store_all_relationships(None).unwrap();
    assert_eq!(second.stored, 2);
    assert_eq!(second.removed, 1);

    let all = store
        .query_relationships(&RelationshipQuery::for_arc_role(PARENT_CHILD))
        .unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.iter().all(|r| r.target_index.as_str() != "Receivables"));
}

#[test]
fn test_exhausted_timeout_fails() {
    let mut store = loaded(presentation());
    let err = store
        .store_all_relationships(Some(Duration::ZERO))
        .unwrap_err();
    assert!(matches!(err, StoreError::Network(_)));
    assert!(store
        .query_relationships(&RelationshipQuery::default())
        .unwrap()
        .is_empty());
}

#[test]
fn test_configured_timeout_applies_without_an_explicit_one() {
    let config = StoreConfig {
        completion_timeout_secs: 60,
        ..StoreConfig::in_memory()
    };
    let mut store = SqliteStore::open(&config).unwrap();
    store.load(presentation()).unwrap();

    let summary = store.store_all_relationships(None).unwrap();
    assert!(summary.stored > 0);

    let err = store
        .store_all_relationships(Some(Duration::ZERO))
        .unwrap_err();
    assert!(matches!(err, StoreError::Network(_)));
}

fn record(arc: &str, target: &str, priority: i32) -> PersistedRelationship {
    PersistedRelationship {
        arc_index: arc.into(),
        arc_role: PARENT_CHILD.to_string(),
        link_index: "pre1".into(),
        link_role: LINK_ROLE.to_string(),
        source_index: "Assets".into(),
        target_index: target.into(),
        order: "1".to_string(),
        priority,
        prohibited: false,
        semantic_key: "key".to_string(),
        root: true,
    }
}

#[test]
fn test_persist_replaces_by_key() {
    let mut store = SqliteStore::new(":memory:").unwrap();
    store.persist_relationship(&record("a1", "Cash", 0)).unwrap();
    store.persist_relationship(&record("a2", "Cash", 4)).unwrap();
    store.persist_relationship(&record("a3", "Receivables", 0)).unwrap();

    let cash = store
        .query_relationships(&RelationshipQuery::for_arc_role(PARENT_CHILD).target("Cash"))
        .unwrap();
    assert_eq!(cash.len(), 1);
    assert_eq!(cash[0].arc_index.as_str(), "a2");
    assert_eq!(cash[0].priority, 4);

    let key = record("a3", "Receivables", 0).key();
    assert!(store.delete_relationship(&key).unwrap());
    assert!(!store.delete_relationship(&key).unwrap());
}

#[test]
fn test_query_filters() {
    let mut store = SqliteStore::new(":memory:").unwrap();
    let mut prohibited = record("a1", "Cash", 0);
    prohibited.prohibited = true;
    store.persist_relationship(&prohibited).unwrap();
    let mut child = record("a2", "Receivables", 0);
    child.root = false;
    store.persist_relationship(&child).unwrap();

    let query = RelationshipQuery::for_arc_role(PARENT_CHILD);
    assert_eq!(store.query_relationships(&query).unwrap().len(), 2);
    assert_eq!(
        store
            .query_relationships(&query.clone().without_prohibited())
            .unwrap()
            .len(),
        1
    );
    let roots = store.query_relationships(&query.clone().roots_only()).unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].arc_index.as_str(), "a1");
    assert!(store
        .query_relationships(&query.link_role("other"))
        .unwrap()
        .is_empty());
}

#[test]
fn test_file_backed_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig {
        path: dir.path().join("filings.db"),
        analyser_mode: AnalyserMode::NonProhibited,
        ..StoreConfig::default()
    };

    {
        let mut store = SqliteStore::open(&config).unwrap();
        store.load(presentation()).unwrap();
        store.store_all_relationships(None).unwrap();
    }

    let store = SqliteStore::open(&config).unwrap();
    let analyser = store.default_analyser();
    assert_eq!(analyser.mode(), AnalyserMode::NonProhibited);
    let parents = analyser
        .parents(&"CashOnHand".into(), LINK_ROLE, PARENT_CHILD)
        .unwrap();
    assert_eq!(parents.len(), 1);
    assert_eq!(parents[0].source_index().as_str(), "Cash");
}
