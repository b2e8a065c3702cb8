//! Property tests for record IDs, primary-key uniqueness and validation.

use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use tabula_core::{
    Config, ConstraintMap, Database, DataType, ErrorKind, Principal, RecordId, Table, Value,
};
use tabula_storage::InMemoryBackend;

#[derive(Debug, Clone)]
enum Op {
    Insert(i64),
    Update(i64, i64),
    Delete(i64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    // A small key space forces collisions.
    let key = 0i64..8;
    prop_oneof![
        key.clone().prop_map(Op::Insert),
        (key.clone(), key.clone()).prop_map(|(from, to)| Op::Update(from, to)),
        key.prop_map(Op::Delete),
    ]
}

fn table() -> Table {
    Table::create(
        "t",
        &["k", "v"],
        &[DataType::Integer, DataType::Text],
        &ConstraintMap::new(),
    )
    .unwrap()
}

fn row(key: i64) -> Vec<Value> {
    vec![Value::Integer(key), Value::from(format!("v{key}"))]
}

fn assert_index_consistent(table: &Table) {
    let keys = table.primary_keys();
    let unique: HashSet<&Value> = keys.iter().collect();
    assert_eq!(unique.len(), keys.len(), "duplicate primary key: {keys:?}");
    for (id, row) in table.records() {
        assert_eq!(table.find(&row[0]).map(|(found, _)| found), Some(id));
    }
}

proptest! {
    #[test]
    fn primary_keys_stay_unique(ops in prop::collection::vec(op_strategy(), 1..64)) {
        let mut table = table();
        let mut live: HashSet<i64> = HashSet::new();

        for op in ops {
            match op {
                Op::Insert(k) => {
                    let result = table.insert(&row(k));
                    prop_assert_eq!(result.is_ok(), live.insert(k));
                }
                Op::Update(from, to) => {
                    let allowed = live.contains(&from) && (from == to || !live.contains(&to));
                    let result = table.update(&Value::Integer(from), &row(to));
                    prop_assert_eq!(result.is_ok(), allowed);
                    if allowed {
                        live.remove(&from);
                        live.insert(to);
                    }
                }
                Op::Delete(k) => {
                    let result = table.delete(&Value::Integer(k));
                    prop_assert_eq!(result.is_ok(), live.remove(&k));
                }
            }
            assert_index_consistent(&table);
            prop_assert_eq!(table.len(), live.len());
        }
    }

    #[test]
    fn record_ids_strictly_increase(count in 1usize..40, deletions in prop::collection::vec(any::<bool>(), 40)) {
        let backend = Arc::new(InMemoryBackend::new());
        let db = Database::create("p", &Principal::new("o"), backend.clone(), Config::default()).unwrap();
        db.create_table("t", &["k"], &[DataType::Integer], &ConstraintMap::new()).unwrap();

        let mut ids = Vec::new();
        for k in 0..count {
            let key = i64::try_from(k).unwrap();
            ids.push(db.insert("t", &[Value::Integer(key)]).unwrap().record_id);
        }
        prop_assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));

        for (k, delete) in deletions.iter().take(count).enumerate() {
            if *delete {
                let key = i64::try_from(k).unwrap();
                db.delete("t", &Value::Integer(key)).unwrap();
            }
        }
        let max_live = db.records("t").unwrap().last().map(|(id, _)| *id);
        drop(db);

        let reopened = Database::open("p", backend, Config::default()).unwrap();
        let next = reopened.insert("t", &[Value::Integer(-1)]).unwrap().record_id;
        prop_assert_eq!(next, max_live.map_or(RecordId::FIRST, RecordId::next));
    }

    #[test]
    fn wrong_arity_always_fails(len in 0usize..6) {
        prop_assume!(len != 2);
        let mut table = table();
        table.insert(&row(1)).unwrap();
        let before = table.records();

        let content: Vec<Value> = (0..len)
            .map(|i| Value::Integer(i64::try_from(i).unwrap()))
            .collect();
        let err = table.insert(&content).unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::Validation);
        prop_assert_eq!(table.records(), before);
    }
}
