//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the in-memory store against a plain HashMap model
//! and the value codec round-trips through the `Cache` handle.

use proptest::prelude::*;
use std::collections::HashMap;

use crate::cache::{Cache, CacheRegistry, NamedStore};
use crate::codec;
use crate::error::CacheError;
use crate::models::{CacheValue, Decoded};

// == Strategies ==
/// Generates valid cache keys
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,16}".prop_map(|s| s)
}

/// Generates payloads, including arbitrary bytes
fn payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..64)
}

/// Generates a sequence of cache operations for testing
#[derive(Debug, Clone)]
enum CacheOp {
    Put { key: String, value: Vec<u8> },
    PutIfAbsent { key: String, value: Vec<u8> },
    Replace { key: String, new: Vec<u8>, old: Vec<u8> },
    Get { key: String },
    Delete { key: String },
    Clear,
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    // A small key space makes collisions, and therefore conflicts, common
    let key = "[a-d]";
    prop_oneof![
        (key, payload_strategy()).prop_map(|(key, value)| CacheOp::Put { key, value }),
        (key, payload_strategy()).prop_map(|(key, value)| CacheOp::PutIfAbsent { key, value }),
        (key, payload_strategy(), payload_strategy())
            .prop_map(|(key, new, old)| CacheOp::Replace { key, new, old }),
        key.prop_map(|key| CacheOp::Get { key }),
        key.prop_map(|key| CacheOp::Delete { key }),
        Just(CacheOp::Clear),
    ]
}

/// JSON-safe values for handle-level round trips
fn json_value_strategy() -> impl Strategy<Value = serde_json::Value> {
    let leaf = prop_oneof![
        any::<bool>().prop_map(serde_json::Value::from),
        any::<i32>().prop_map(serde_json::Value::from),
        "[a-z ]{0,12}".prop_map(serde_json::Value::from),
    ];
    leaf.prop_recursive(3, 16, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(serde_json::Value::from),
            prop::collection::hash_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|m| serde_json::Value::Object(m.into_iter().collect())),
        ]
    })
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // The store agrees with a HashMap model and its live count never drifts
    #[test]
    fn prop_store_matches_model(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let mut store = NamedStore::new("model");
        let mut model: HashMap<String, Vec<u8>> = HashMap::new();

        for op in ops {
            match op {
                CacheOp::Put { key, value } => {
                    store.put(&key, value.clone(), None);
                    model.insert(key, value);
                }
                CacheOp::PutIfAbsent { key, value } => {
                    let result = store.put_if_absent(&key, value.clone(), None);
                    if model.contains_key(&key) {
                        prop_assert!(matches!(result, Err(CacheError::KeyAlreadyExists(_))));
                    } else {
                        prop_assert!(result.is_ok());
                        model.insert(key, value);
                    }
                }
                CacheOp::Replace { key, new, old } => {
                    let result = store.replace(&key, new.clone(), &old, None);
                    match model.get(&key) {
                        Some(current) if *current == old => {
                            prop_assert!(result.is_ok());
                            model.insert(key, new);
                        }
                        // Byte mismatch may still be a JSON-structural match
                        Some(_) if result.is_ok() => {
                            model.insert(key, new);
                        }
                        _ => prop_assert!(matches!(result, Err(CacheError::ValueMismatch(_)))),
                    }
                }
                CacheOp::Get { key } => {
                    prop_assert_eq!(store.get(&key), model.get(&key).cloned());
                }
                CacheOp::Delete { key } => {
                    let removed = store.delete(&key);
                    prop_assert_eq!(removed, model.remove(&key).is_some());
                }
                CacheOp::Clear => {
                    store.clear();
                    model.clear();
                }
            }
            prop_assert_eq!(store.len(), model.len(), "live count drifted from model");
        }

        let stats = store.stats();
        prop_assert_eq!(stats.count as usize, model.len());
        prop_assert_eq!(stats.size, stats.count * 4);
    }

    // put then get returns the same bytes when read as a blob
    #[test]
    fn prop_bytes_round_trip(key in valid_key_strategy(), value in payload_strategy()) {
        let cache = Cache::in_memory("bytes", &CacheRegistry::new()).unwrap();
        let decoded = block_on(async {
            cache.put(key.as_str(), value.clone(), None).await.unwrap();
            cache.get_as(key.as_str(), crate::models::TypeHint::Blob).await.unwrap()
        });
        prop_assert_eq!(decoded, Some(Decoded::Bytes(value)));
    }

    // Structured values survive the JSON text round trip
    #[test]
    fn prop_json_round_trip(key in valid_key_strategy(), value in json_value_strategy()) {
        let cache = Cache::in_memory("json", &CacheRegistry::new()).unwrap();
        let decoded = block_on(async {
            cache.put(key.as_str(), value.clone(), None).await.unwrap();
            cache.get(key.as_str()).await.unwrap()
        });
        prop_assert_eq!(decoded, Some(Decoded::Json(value)));
    }

    // Serializing text is the identity on its bytes
    #[test]
    fn prop_text_serialization_is_identity(text in ".{0,64}") {
        prop_assert_eq!(codec::serialize(CacheValue::Text(text.clone())), text.into_bytes());
    }

    // A second putIfAbsent never overwrites the first value
    #[test]
    fn prop_put_if_absent_keeps_first(
        key in valid_key_strategy(),
        first in payload_strategy(),
        second in payload_strategy()
    ) {
        let mut store = NamedStore::new("pia");
        store.put_if_absent(&key, first.clone(), None).unwrap();
        let result = store.put_if_absent(&key, second, None);

        prop_assert!(matches!(result, Err(CacheError::KeyAlreadyExists(_))));
        prop_assert_eq!(store.get(&key), Some(first));
    }
}
