//! Integration tests for field mapping and the shared mapping cache.

use rowscan::db::{FieldMapping, MappingCache, Record};
use rowscan::record;
use std::sync::{Arc, Barrier};
use std::thread;

record! {
    #[derive(Debug, Clone, Default)]
    pub struct Order {
        pub id: u64,
        pub customer_id: i64,
        #[allow(non_snake_case)]
        pub TotalCents: i64,
        pub note: Option<String> => "remark",
        pub shipped_at: Option<chrono::NaiveDateTime> => "shipped",
        pub raw: Vec<u8> => "-",
        internal_flag: bool,
    }
}

record! {
    #[derive(Debug, Clone, Default)]
    pub struct Invoice {
        pub id: u64,
        pub amount: f64,
    }
}

#[test]
fn test_mapping_contains_public_unskipped_fields() {
    let cache = MappingCache::new();
    let mapping = cache.mapping::<Order>();

    let mut columns: Vec<(&str, usize)> = mapping.iter().collect();
    columns.sort_by_key(|(_, position)| *position);

    assert_eq!(
        columns,
        vec![
            ("id", 0),
            ("customerId", 1),
            ("totalCents", 2),
            ("remark", 3),
            ("shipped", 4),
        ]
    );
    assert_eq!(mapping.position("raw"), None);
    assert_eq!(mapping.position("internalFlag"), None);
    assert_eq!(mapping.position("customer_id"), None);
}

#[test]
fn test_second_request_reuses_cached_mapping() {
    let cache = MappingCache::new();

    let first = cache.mapping::<Order>();
    let second = cache.mapping::<Order>();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.computations(), 1);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_shapes_are_cached_separately() {
    let cache = MappingCache::new();

    let order = cache.mapping::<Order>();
    let invoice = cache.mapping::<Invoice>();

    assert!(!Arc::ptr_eq(&order, &invoice));
    assert_eq!(invoice.position("amount"), Some(1));
    assert_eq!(cache.len(), 2);
}

#[test]
fn test_cached_mapping_matches_fresh_build() {
    let cache = MappingCache::new();
    let cached = cache.mapping::<Order>();
    let fresh = FieldMapping::of::<Order>();

    assert_eq!(cached.len(), fresh.len());
    for (column, position) in fresh.iter() {
        assert_eq!(cached.position(column), Some(position));
    }
    assert_eq!(Order::fields().len(), 7);
}

#[test]
fn test_concurrent_first_requests_share_one_mapping() {
    const THREADS: usize = 8;

    let cache = Arc::new(MappingCache::new());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                cache.mapping::<Order>()
            })
        })
        .collect();

    let mappings: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let winner = cache.mapping::<Order>();
    for mapping in &mappings {
        assert!(Arc::ptr_eq(mapping, &winner));
        assert_eq!(mapping.len(), 5);
    }
    assert_eq!(cache.len(), 1);
    // racing threads may build redundantly, never more than once each
    assert!(cache.computations() >= 1);
    assert!(cache.computations() <= THREADS);
}
