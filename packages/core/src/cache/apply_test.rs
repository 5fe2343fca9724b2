//! Unit tests for the mutation applier, page upsert and flattener
//!
//! Most tests run against all four variants: the observable rows must not
//! depend on which optional components are enabled.

use crate::cache::{CacheError, TreeCache};
use crate::config::{CacheConfig, CacheVariant};
use crate::models::{Node, PageInfo, Row};
use crate::operations::{Applied, Operation};
use chrono::{DateTime, Duration, TimeZone, Utc};

fn ts(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes)
}

fn node(id: &str, parent: Option<&str>, minutes: i64) -> Node {
    Node::new(id, parent.map(str::to_string), id.to_uppercase(), ts(minutes))
}

fn rows(cache: &mut TreeCache) -> Vec<(String, usize)> {
    cache
        .flatten()
        .into_iter()
        .filter_map(|row| match row {
            Row::Node { id, depth } => Some((id, depth)),
            Row::LoadMore { .. } => None,
        })
        .collect()
}

fn pairs(expected: &[(&str, usize)]) -> Vec<(String, usize)> {
    expected.iter().map(|(id, d)| (id.to_string(), *d)).collect()
}

fn assert_valid(cache: &TreeCache) {
    if let Err(violations) = cache.check_invariants() {
        panic!("invariants violated: {violations:#?}");
    }
}

/// root r with children a (oldest), b, c (newest); c has child c1
fn sample(variant: CacheVariant) -> TreeCache {
    let mut cache = TreeCache::with_variant(variant);
    cache.upsert_page(None, vec![node("r", None, 0)], PageInfo::last());
    cache.upsert_page(
        Some("r"),
        vec![
            node("a", Some("r"), 1),
            node("b", Some("r"), 2),
            node("c", Some("r"), 3),
        ],
        PageInfo::last(),
    );
    cache.upsert_page(Some("c"), vec![node("c1", Some("c"), 4)], PageInfo::last());
    cache
}

fn insert(cache: &mut TreeCache, parent: Option<&str>, minutes: i64) -> String {
    cache
        .apply(Operation::Insert {
            parent_id: parent.map(str::to_string),
            created_at: ts(minutes),
        })
        .unwrap()
        .inserted_id()
        .unwrap()
        .to_string()
}

// =========================================================================
// Page upsert
// =========================================================================

#[test]
fn test_upsert_roots_newest_first() {
    for variant in CacheVariant::all() {
        let mut cache = TreeCache::with_variant(variant);
        cache.upsert_page(
            None,
            vec![node("A", None, 0), node("B", None, 1)],
            PageInfo::last(),
        );

        assert_eq!(rows(&mut cache), pairs(&[("B", 0), ("A", 0)]), "{variant}");
        assert_valid(&cache);
    }
}

#[test]
fn test_upsert_is_idempotent() {
    let mut cache = sample(CacheVariant::Both);
    let before = rows(&mut cache);
    let stats = cache.stats();

    let page = vec![node("a", Some("r"), 1), node("b", Some("r"), 2)];
    let outcome = cache.upsert_page(Some("r"), page.clone(), PageInfo::more("2"));
    assert!(outcome.is_noop());
    let outcome = cache.upsert_page(Some("r"), page, PageInfo::more("2"));
    assert!(outcome.is_noop());

    assert_eq!(rows(&mut cache), before);
    assert_eq!(cache.stats(), stats);
    assert_eq!(cache.page_state(Some("r")), Some(&PageInfo::more("2")));
}

#[test]
fn test_upsert_ignores_incoming_has_children() {
    let mut cache = TreeCache::with_variant(CacheVariant::Plain);
    let mut lying = node("a", None, 0);
    lying.has_children = true;
    cache.upsert_page(None, vec![lying], PageInfo::last());

    assert!(!cache.get("a").unwrap().has_children);
    assert_valid(&cache);
}

#[test]
fn test_upsert_relocates_changed_nodes() {
    for variant in CacheVariant::all() {
        let mut cache = sample(variant);

        // a becomes the newest child of r
        let outcome = cache.upsert_page(Some("r"), vec![node("a", Some("r"), 9)], PageInfo::last());
        assert_eq!(outcome.relocated, 1);
        assert_eq!(cache.children_of("r"), ["a", "c", "b"]);

        // c moves under b on the server, taking c1 along
        cache.upsert_page(Some("b"), vec![node("c", Some("b"), 3)], PageInfo::last());
        assert_eq!(
            rows(&mut cache),
            pairs(&[("r", 0), ("a", 1), ("b", 1), ("c", 2), ("c1", 3)]),
            "{variant}"
        );
        assert_valid(&cache);
    }
}

#[test]
fn test_upsert_title_change_is_update() {
    let mut cache = sample(CacheVariant::Plain);
    let mut renamed = node("a", Some("r"), 1);
    renamed.title = "Renamed".to_string();

    let outcome = cache.upsert_page(Some("r"), vec![renamed], PageInfo::last());
    assert_eq!(outcome.updated, 1);
    assert_eq!(cache.get("a").unwrap().title, "Renamed");
}

#[test]
fn test_pagination_for_unloaded_parent_survives_arrival() {
    let mut cache = TreeCache::with_variant(CacheVariant::Plain);
    cache.upsert_page(Some("p"), vec![node("c", Some("p"), 1)], PageInfo::more("1"));
    assert!(cache.flatten().is_empty());

    cache.upsert_page(None, vec![node("p", None, 0)], PageInfo::last());
    assert_eq!(
        cache.flatten(),
        vec![
            Row::Node { id: "p".to_string(), depth: 0 },
            Row::Node { id: "c".to_string(), depth: 1 },
            Row::LoadMore { parent_id: Some("p".to_string()), depth: 1 },
        ]
    );
    assert_valid(&cache);
}

// =========================================================================
// Dangling resolution
// =========================================================================

#[test]
fn test_insert_under_unknown_parent_parks_until_arrival() {
    for variant in CacheVariant::all() {
        let mut cache = TreeCache::with_variant(variant);
        let id = insert(&mut cache, Some("X"), 5);

        assert!(cache.flatten().is_empty());
        assert_eq!(cache.dangling_children_of("X"), [id.as_str()]);
        assert_valid(&cache);

        let outcome = cache.upsert_page(None, vec![node("X", None, 0)], PageInfo::last());
        assert_eq!(outcome.resolved, 1);
        assert_eq!(rows(&mut cache), pairs(&[("X", 0), (&id, 1)]), "{variant}");
        assert!(cache.get("X").unwrap().has_children);
        assert_eq!(cache.stats().dangling_buckets, 0);
        assert_valid(&cache);
    }
}

#[test]
fn test_parents_arriving_after_children() {
    for variant in CacheVariant::all() {
        let mut cache = TreeCache::with_variant(variant);
        // Deepest first; every parent arrives after its children
        cache.upsert_page(Some("c"), vec![node("d", Some("c"), 3)], PageInfo::last());
        assert_eq!(cache.dangling_children_of("c"), ["d"]);

        // c resolves d on arrival but is itself parked under b
        cache.upsert_page(Some("b"), vec![node("c", Some("b"), 2)], PageInfo::last());
        assert_eq!(cache.stats().dangling_nodes, 1);
        assert_eq!(cache.children_of("c"), ["d"]);

        cache.upsert_page(None, vec![node("a", None, 0)], PageInfo::last());
        cache.upsert_page(Some("a"), vec![node("b", Some("a"), 1)], PageInfo::last());

        assert_eq!(
            rows(&mut cache),
            pairs(&[("a", 0), ("b", 1), ("c", 2), ("d", 3)]),
            "{variant}"
        );
        if variant.config().depth_cache {
            assert_eq!(cache.depth_of("d"), Some(3));
        }
        assert_valid(&cache);
    }
}

#[test]
fn test_single_batch_resolves_every_generation() {
    for variant in CacheVariant::all() {
        let mut cache = TreeCache::with_variant(variant);
        let outcome = cache.upsert_page(
            None,
            vec![
                node("d", Some("c"), 3),
                node("c", Some("b"), 2),
                node("b", Some("a"), 1),
                node("a", None, 0),
            ],
            PageInfo::last(),
        );

        assert_eq!(outcome.inserted, 4);
        assert_eq!(outcome.resolved, 3);
        assert_eq!(
            rows(&mut cache),
            pairs(&[("a", 0), ("b", 1), ("c", 2), ("d", 3)]),
            "{variant}"
        );
        assert_eq!(cache.stats().dangling_buckets, 0);
        assert_valid(&cache);
    }
}

#[test]
fn test_dangling_depth_is_corrected_on_attach() {
    let mut cache = TreeCache::with_variant(CacheVariant::DepthCache);
    let id = insert(&mut cache, Some("p"), 5);
    assert_eq!(cache.depth_of(&id), Some(1));

    cache.upsert_page(None, vec![node("g", None, 0)], PageInfo::last());
    cache.upsert_page(Some("g"), vec![node("p", Some("g"), 1)], PageInfo::last());
    assert_eq!(cache.depth_of("p"), Some(1));
    assert_eq!(cache.depth_of(&id), Some(2));
    assert_valid(&cache);
}

// =========================================================================
// Parent loops
// =========================================================================

#[test]
fn test_stale_record_closing_a_loop_is_parked() {
    for variant in CacheVariant::all() {
        let mut cache = TreeCache::with_variant(variant);
        cache.upsert_page(None, vec![node("a", None, 0)], PageInfo::last());
        cache.upsert_page(Some("a"), vec![node("b", Some("a"), 1)], PageInfo::last());

        // The server moved a under b; our copy still has b under a
        let outcome = cache.upsert_page(Some("b"), vec![node("a", Some("b"), 0)], PageInfo::last());
        assert_eq!(outcome.relocated, 1);
        assert_eq!(outcome.cyclic, 1);
        assert_eq!(cache.dangling_children_of("b"), ["a"], "{variant}");
        assert!(cache.root_ids().is_empty());
        assert!(rows(&mut cache).is_empty());
        assert_valid(&cache);

        // b's own move arrives and the loop is gone
        let outcome = cache.upsert_page(None, vec![node("b", None, 1)], PageInfo::last());
        assert_eq!(outcome.resolved, 1);
        assert_eq!(rows(&mut cache), pairs(&[("b", 0), ("a", 1)]), "{variant}");
        if variant.config().depth_cache {
            assert_eq!(cache.depth_of("a"), Some(1));
        }
        assert_eq!(cache.stats().dangling_nodes, 0);
        assert_valid(&cache);
    }
}

#[test]
fn test_self_parented_record_is_parked() {
    for variant in CacheVariant::all() {
        let mut cache = TreeCache::with_variant(variant);
        cache.upsert_page(None, vec![node("r", None, 0)], PageInfo::last());

        let outcome = cache.upsert_page(Some("x"), vec![node("x", Some("x"), 1)], PageInfo::last());
        assert_eq!(outcome.inserted, 1);
        assert_eq!(outcome.cyclic, 1);
        assert_eq!(cache.dangling_children_of("x"), ["x"]);
        assert_eq!(rows(&mut cache), pairs(&[("r", 0)]), "{variant}");
        assert_valid(&cache);

        let again = cache.upsert_page(Some("x"), vec![node("x", Some("x"), 1)], PageInfo::last());
        assert!(again.is_noop());

        cache.upsert_page(None, vec![node("x", None, 1)], PageInfo::last());
        assert_eq!(rows(&mut cache), pairs(&[("x", 0), ("r", 0)]), "{variant}");
        assert_eq!(cache.stats().dangling_buckets, 0);
        assert_valid(&cache);
    }
}

#[test]
fn test_parked_records_forming_a_loop_wait_for_a_move() {
    for variant in CacheVariant::all() {
        let mut cache = TreeCache::with_variant(variant);
        cache.upsert_page(Some("a"), vec![node("b", Some("a"), 1)], PageInfo::last());
        let outcome = cache.upsert_page(Some("b"), vec![node("a", Some("b"), 0)], PageInfo::last());

        assert_eq!(outcome.cyclic, 1);
        assert_eq!(outcome.resolved, 0);
        assert_eq!(cache.stats().dangling_nodes, 2);
        assert!(cache.flatten().is_empty());
        assert_valid(&cache);

        // A local move out of the loop releases the other record
        let applied = cache
            .apply(Operation::Move {
                id: "b".to_string(),
                new_parent_id: None,
            })
            .unwrap();
        assert_eq!(applied, Applied::Done);
        assert_eq!(rows(&mut cache), pairs(&[("b", 0), ("a", 1)]), "{variant}");
        assert_eq!(cache.stats().dangling_nodes, 0);
        assert_valid(&cache);
    }
}

#[test]
fn test_unlisted_node_with_loaded_parents_is_reported() {
    let mut cache = sample(CacheVariant::Plain);
    cache.meta.get_mut("c").unwrap().children_ids.clear();
    cache.nodes.get_mut("c").unwrap().has_children = false;

    let violations = cache.check_invariants().unwrap_err();
    assert!(
        violations.iter().any(|v| v.contains("c1 is unreachable")),
        "{violations:#?}"
    );
}

// =========================================================================
// Insert
// =========================================================================

#[test]
fn test_insert_allocates_sequential_ids() {
    let mut cache = TreeCache::with_variant(CacheVariant::Plain);
    assert_eq!(insert(&mut cache, None, 0), "local-1");
    assert_eq!(insert(&mut cache, None, 1), "local-2");
}

#[test]
fn test_insert_skips_ids_already_loaded() {
    let mut cache = TreeCache::with_variant(CacheVariant::Plain);
    cache.upsert_page(None, vec![node("local-1", None, 0)], PageInfo::last());
    assert_eq!(insert(&mut cache, None, 1), "local-2");
}

#[test]
fn test_insert_uses_configured_prefix() {
    let config = CacheConfig {
        local_id_prefix: "tmp".to_string(),
        ..CacheConfig::default()
    };
    let mut cache = TreeCache::new(config).unwrap();
    assert_eq!(insert(&mut cache, None, 0), "tmp-1");
}

#[test]
fn test_new_rejects_invalid_config() {
    let config = CacheConfig {
        local_id_prefix: String::new(),
        ..CacheConfig::default()
    };
    assert!(matches!(
        TreeCache::new(config),
        Err(CacheError::InvalidConfig(_))
    ));
}

#[test]
fn test_new_and_with_variant_build_the_same_cache() {
    for variant in CacheVariant::all() {
        let from_config = TreeCache::new(variant.config()).unwrap();
        let from_variant = TreeCache::with_variant(variant);

        assert_eq!(from_config.config(), from_variant.config());
        assert_eq!(from_config.depth.is_some(), variant.config().depth_cache);
        assert_eq!(from_variant.depth.is_some(), variant.config().depth_cache);
        assert_eq!(from_config.eviction.is_some(), variant.config().eviction);
        assert_eq!(from_variant.eviction.is_some(), variant.config().eviction);
        assert_eq!(from_config.stats(), from_variant.stats());
    }
}

#[test]
fn test_insert_marks_parent_has_children() {
    for variant in CacheVariant::all() {
        let mut cache = sample(variant);
        assert!(!cache.get("a").unwrap().has_children);

        let id = insert(&mut cache, Some("a"), 10);
        assert!(cache.get("a").unwrap().has_children);
        assert_eq!(
            rows(&mut cache),
            pairs(&[("r", 0), ("c", 1), ("c1", 2), ("b", 1), ("a", 1), (&id, 2)]),
            "{variant}"
        );
        assert_valid(&cache);
    }
}

#[test]
fn test_insert_into_collapsed_parent() {
    let mut evicting = sample(CacheVariant::Eviction);
    let mut plain = sample(CacheVariant::Plain);

    for cache in [&mut evicting, &mut plain] {
        cache.apply(Operation::Collapse { id: "r".to_string() }).unwrap();
        insert(cache, Some("r"), 10);
        assert_eq!(rows(cache), pairs(&[("r", 0)]));
        assert!(cache.get("r").unwrap().has_children);
        assert_valid(cache);
    }

    // With eviction the new child waits in the store; without, in the child index
    assert_eq!(evicting.evicted_children_of("r").len(), 4);
    assert!(evicting.children_of("r").is_empty());
    assert_eq!(plain.children_of("r").len(), 4);
}

#[test]
fn test_insert_into_expanded_parent_restores_evicted_first() {
    let mut cache = sample(CacheVariant::Eviction);
    cache.apply(Operation::Collapse { id: "c".to_string() }).unwrap();
    assert_eq!(cache.evicted_children_of("c"), ["c1"]);

    // Bypass the applier to get an expanded parent that still holds evicted children
    cache.meta.get_mut("c").unwrap().is_expanded = true;
    let id = insert(&mut cache, Some("c"), 10);

    assert_eq!(cache.children_of("c"), [id.as_str(), "c1"]);
    assert!(cache.evicted_children_of("c").is_empty());
    assert_valid(&cache);
}

// =========================================================================
// Collapse / expand
// =========================================================================

#[test]
fn test_collapse_expand_round_trip() {
    for variant in CacheVariant::all() {
        let mut cache = sample(variant);
        let before = rows(&mut cache);

        cache.apply(Operation::Collapse { id: "r".to_string() }).unwrap();
        assert_eq!(rows(&mut cache), pairs(&[("r", 0)]), "{variant}");
        assert!(cache.get("r").unwrap().has_children);
        assert_valid(&cache);

        cache.apply(Operation::Expand { id: "r".to_string() }).unwrap();
        assert_eq!(rows(&mut cache), before, "{variant}");
        assert_valid(&cache);
    }
}

#[test]
fn test_collapse_evicts_only_with_eviction_enabled() {
    let mut cache = sample(CacheVariant::Both);
    cache.apply(Operation::Collapse { id: "r".to_string() }).unwrap();
    assert!(cache.children_of("r").is_empty());
    assert_eq!(cache.evicted_children_of("r"), ["c", "b", "a"]);
    assert_eq!(cache.stats().evicted_nodes, 3);
    // Depth entries of hidden nodes are kept current
    assert_eq!(cache.depth_of("c1"), Some(2));

    let mut plain = sample(CacheVariant::Plain);
    plain.apply(Operation::Collapse { id: "r".to_string() }).unwrap();
    assert_eq!(plain.children_of("r"), ["c", "b", "a"]);
    assert!(!plain.is_expanded("r"));
}

#[test]
fn test_nested_collapse_restores_exactly() {
    for variant in CacheVariant::all() {
        let mut cache = sample(variant);
        cache.apply(Operation::Collapse { id: "c".to_string() }).unwrap();
        cache.apply(Operation::Collapse { id: "r".to_string() }).unwrap();
        cache.apply(Operation::Expand { id: "r".to_string() }).unwrap();

        // c stays collapsed: its own child remains hidden
        assert_eq!(
            rows(&mut cache),
            pairs(&[("r", 0), ("c", 1), ("b", 1), ("a", 1)]),
            "{variant}"
        );

        cache.apply(Operation::Expand { id: "c".to_string() }).unwrap();
        assert_eq!(rows(&mut cache).len(), 5);
        assert_valid(&cache);
    }
}

#[test]
fn test_expand_is_noop_when_expanded() {
    let mut cache = sample(CacheVariant::Both);
    let before = rows(&mut cache);
    assert_eq!(
        cache.apply(Operation::Expand { id: "r".to_string() }).unwrap(),
        Applied::Done
    );
    assert_eq!(rows(&mut cache), before);
}

#[test]
fn test_flatten_promotes_evicted_children_of_expanded_node() {
    let mut cache = sample(CacheVariant::Both);
    cache.apply(Operation::Collapse { id: "c".to_string() }).unwrap();
    cache.meta.get_mut("c").unwrap().is_expanded = true;

    let visible = cache.visible_ids();
    assert!(visible.contains(&"c1".to_string()));
    assert_eq!(cache.children_of("c"), ["c1"]);
    assert_eq!(cache.stats().evicted_buckets, 0);
    assert_valid(&cache);
}

// =========================================================================
// Move
// =========================================================================

#[test]
fn test_move_reveals_destination_and_updates_depths() {
    for variant in CacheVariant::all() {
        let mut cache = sample(variant);
        cache.apply(Operation::Collapse { id: "a".to_string() }).unwrap();

        cache
            .apply(Operation::Move {
                id: "c".to_string(),
                new_parent_id: Some("a".to_string()),
            })
            .unwrap();

        assert!(cache.is_expanded("a"));
        assert!(cache.get("a").unwrap().has_children);
        assert_eq!(
            rows(&mut cache),
            pairs(&[("r", 0), ("b", 1), ("a", 1), ("c", 2), ("c1", 3)]),
            "{variant}"
        );
        if variant.config().depth_cache {
            assert_eq!(cache.depth_of("c1"), Some(3));
        }
        assert_valid(&cache);
    }
}

#[test]
fn test_move_to_root_and_old_parent_bookkeeping() {
    for variant in CacheVariant::all() {
        let mut cache = sample(variant);
        cache
            .apply(Operation::Move {
                id: "c1".to_string(),
                new_parent_id: None,
            })
            .unwrap();

        assert!(!cache.get("c").unwrap().has_children);
        assert_eq!(cache.root_ids(), ["c1", "r"]);
        assert_eq!(rows(&mut cache)[0], ("c1".to_string(), 0));
        assert_valid(&cache);
    }
}

#[test]
fn test_move_into_unknown_parent_parks() {
    let mut cache = sample(CacheVariant::Both);
    cache
        .apply(Operation::Move {
            id: "c".to_string(),
            new_parent_id: Some("later".to_string()),
        })
        .unwrap();

    assert_eq!(cache.dangling_children_of("later"), ["c"]);
    assert!(!cache.visible_ids().contains(&"c1".to_string()));
    assert_valid(&cache);

    cache.upsert_page(None, vec![node("later", None, 50)], PageInfo::last());
    assert_eq!(
        rows(&mut cache)[..3],
        pairs(&[("later", 0), ("c", 1), ("c1", 2)])[..]
    );
    assert_valid(&cache);
}

#[test]
fn test_cyclic_move_rejected() {
    for variant in CacheVariant::all() {
        let mut cache = sample(variant);
        let before = rows(&mut cache);

        let err = cache
            .apply(Operation::Move {
                id: "r".to_string(),
                new_parent_id: Some("c1".to_string()),
            })
            .unwrap_err();
        assert_eq!(err, CacheError::cyclic_move("r", "c1"));

        let err = cache
            .apply(Operation::Move {
                id: "c".to_string(),
                new_parent_id: Some("c".to_string()),
            })
            .unwrap_err();
        assert!(matches!(err, CacheError::CyclicMove { .. }));

        assert_eq!(rows(&mut cache), before);
        assert_valid(&cache);
    }
}

#[test]
fn test_move_deep_chain_updates_every_depth() {
    let mut cache = TreeCache::with_variant(CacheVariant::DepthCache);
    cache.upsert_page(None, vec![node("top", None, 0), node("n0", None, 1)], PageInfo::last());
    for i in 1..100 {
        let parent = format!("n{}", i - 1);
        let id = format!("n{i}");
        cache.upsert_page(Some(&parent), vec![node(&id, Some(&parent), i)], PageInfo::last());
    }
    assert_eq!(cache.depth_of("n99"), Some(99));

    cache
        .apply(Operation::Move {
            id: "n0".to_string(),
            new_parent_id: Some("top".to_string()),
        })
        .unwrap();

    assert_eq!(cache.depth_of("n99"), Some(100));
    assert_eq!(cache.structural_depth("n99"), Some(100));
    assert_valid(&cache);
}

// =========================================================================
// Remove
// =========================================================================

#[test]
fn test_remove_scrubs_and_orphans() {
    for variant in CacheVariant::all() {
        let mut cache = sample(variant);
        cache.apply(Operation::Remove { id: "c".to_string() }).unwrap();

        assert!(cache.get("c").is_none());
        assert!(cache.meta("c").is_none());
        assert_eq!(cache.depth_of("c"), None);
        assert_eq!(cache.children_of("r"), ["b", "a"]);
        // c1 is orphaned, not deleted, and waits for c to come back
        assert!(cache.get("c1").is_some());
        assert_eq!(cache.dangling_children_of("c"), ["c1"]);
        assert_eq!(
            rows(&mut cache),
            pairs(&[("r", 0), ("b", 1), ("a", 1)]),
            "{variant}"
        );
        assert_valid(&cache);
    }
}

#[test]
fn test_removed_parent_reloaded_takes_back_its_children() {
    for variant in CacheVariant::all() {
        let mut cache = sample(variant);
        cache.apply(Operation::Remove { id: "c".to_string() }).unwrap();

        let outcome = cache.upsert_page(
            Some("r"),
            vec![
                node("a", Some("r"), 1),
                node("b", Some("r"), 2),
                node("c", Some("r"), 3),
            ],
            PageInfo::last(),
        );
        assert_eq!(outcome.inserted, 1);
        assert_eq!(outcome.resolved, 1);
        assert_eq!(cache.children_of("c"), ["c1"], "{variant}");
        assert_valid(&cache);

        // Listing the child again changes nothing
        let outcome =
            cache.upsert_page(Some("c"), vec![node("c1", Some("c"), 4)], PageInfo::last());
        assert!(outcome.is_noop(), "{variant}: {outcome:?}");
        assert_eq!(
            rows(&mut cache),
            pairs(&[("r", 0), ("c", 1), ("c1", 2), ("b", 1), ("a", 1)]),
            "{variant}"
        );
        if variant.config().depth_cache {
            assert_eq!(cache.depth_of("c1"), Some(2));
        }
        assert_eq!(cache.stats().dangling_nodes, 0);
        assert_valid(&cache);
    }
}

#[test]
fn test_remove_collapsed_parent_orphans_evicted_children() {
    let mut cache = sample(CacheVariant::Both);
    cache.apply(Operation::Collapse { id: "c".to_string() }).unwrap();
    cache.apply(Operation::Remove { id: "c".to_string() }).unwrap();

    assert_eq!(cache.stats().evicted_buckets, 0);
    assert_eq!(cache.dangling_children_of("c"), ["c1"]);
    assert_valid(&cache);
}

#[test]
fn test_remove_last_child_clears_has_children() {
    let mut cache = sample(CacheVariant::Eviction);
    cache.apply(Operation::Collapse { id: "c".to_string() }).unwrap();
    cache.apply(Operation::Remove { id: "c1".to_string() }).unwrap();

    assert!(!cache.get("c").unwrap().has_children);
    assert_eq!(cache.stats().evicted_buckets, 0);
    assert_valid(&cache);
}

#[test]
fn test_remove_parked_child() {
    let mut cache = TreeCache::with_variant(CacheVariant::Plain);
    let id = insert(&mut cache, Some("ghost"), 0);
    cache.apply(Operation::Remove { id }).unwrap();
    assert_eq!(cache.stats().dangling_buckets, 0);
    assert!(cache.is_empty());
}

// =========================================================================
// Pagination and unknown ids
// =========================================================================

#[test]
fn test_set_has_more_emits_load_more_rows() {
    let mut cache = sample(CacheVariant::Plain);
    cache
        .apply(Operation::SetHasMore {
            parent_id: Some("c".to_string()),
            has_more: true,
        })
        .unwrap();
    cache
        .apply(Operation::SetHasMore {
            parent_id: None,
            has_more: true,
        })
        .unwrap();

    let flat = cache.flatten();
    assert_eq!(
        flat[2..4],
        [
            Row::Node { id: "c1".to_string(), depth: 2 },
            Row::LoadMore { parent_id: Some("c".to_string()), depth: 2 },
        ]
    );
    assert_eq!(
        flat.last(),
        Some(&Row::LoadMore { parent_id: None, depth: 0 })
    );
}

#[test]
fn test_unknown_ids_are_ignored() {
    for variant in CacheVariant::all() {
        let mut cache = sample(variant);
        let before = rows(&mut cache);
        let ops = [
            Operation::Move { id: "nope".to_string(), new_parent_id: None },
            Operation::Remove { id: "nope".to_string() },
            Operation::Collapse { id: "nope".to_string() },
            Operation::Expand { id: "nope".to_string() },
            Operation::SetHasMore { parent_id: Some("nope".to_string()), has_more: true },
        ];
        for op in ops {
            assert_eq!(cache.apply(op).unwrap(), Applied::Ignored);
        }
        assert_eq!(rows(&mut cache), before);
        assert_valid(&cache);
    }
}
