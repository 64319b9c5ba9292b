//! Property tests for table put/get and declared-type enforcement.

use cyclelog_core::{LoggableType, Table, Value, ValueData};
use proptest::prelude::*;

fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        prop::collection::vec(any::<u8>(), 0..16).prop_map(Value::raw),
        any::<bool>().prop_map(Value::boolean),
        any::<i64>().prop_map(Value::integer),
        any::<f32>().prop_map(Value::float),
        any::<f64>().prop_map(Value::double),
        "[a-zA-Z0-9 ]{0,12}".prop_map(Value::string),
        prop::collection::vec(any::<bool>(), 0..8).prop_map(Value::from),
        prop::collection::vec(any::<i64>(), 0..8).prop_map(Value::from),
        prop::collection::vec(any::<f32>(), 0..8).prop_map(Value::from),
        prop::collection::vec(any::<f64>(), 0..8).prop_map(Value::from),
        prop::collection::vec("[a-z]{0,6}", 0..6).prop_map(Value::from),
    ]
}

fn same_shape(a: &Value, b: &Value) -> bool {
    std::mem::discriminant(a.data()) == std::mem::discriminant(b.data())
}

proptest! {
    #[test]
    fn put_then_get_round_trips(key in "[A-Za-z]{1,8}", v in arb_value(), unit in prop::sample::select(vec!["", "V", "m", "s"])) {
        let v = v.with_unit(unit);
        let table = Table::new(0);
        prop_assert!(table.put_value(&key, v.clone()));
        let got = table.get_value(&key).unwrap();
        prop_assert_eq!(&got, &v);
        prop_assert_eq!(got.unit(), v.unit());
    }

    #[test]
    fn second_write_of_other_shape_keeps_first(a in arb_value(), b in arb_value()) {
        let table = Table::new(0);
        table.put_value("K", a.clone());
        let applied = table.put_value("K", b.clone());
        prop_assert_eq!(applied, same_shape(&a, &b));
        let stored = table.get_value("K").unwrap();
        if applied {
            prop_assert_eq!(stored, b);
        } else {
            prop_assert_eq!(stored, a);
            prop_assert_eq!(table.rejected_writes(), 1);
        }
    }

    #[test]
    fn subtable_get_all_sees_only_its_keys(
        inside in prop::collection::btree_set("[a-z]{1,5}", 0..6),
        outside in prop::collection::btree_set("[a-z]{1,5}", 0..6),
    ) {
        let root = Table::new(0);
        let x = root.subtable("X");
        for k in &inside {
            x.put(k, 1i64);
        }
        for k in &outside {
            root.put(k, 2i64);
        }
        let scoped = x.get_all(true);
        let got: Vec<&String> = scoped.keys().collect();
        let want: Vec<&String> = inside.iter().collect();
        prop_assert_eq!(got, want);
    }
}

#[test]
fn every_shape_has_a_matching_value() {
    let samples = [
        Value::raw(vec![1]),
        Value::boolean(true),
        Value::integer(1),
        Value::float(1.0),
        Value::double(1.0),
        Value::string("s"),
        Value::from(vec![true]),
        Value::from(vec![1i64]),
        Value::from(vec![1.0f32]),
        Value::from(vec![1.0f64]),
        Value::from(vec!["s"]),
    ];
    let shapes: Vec<LoggableType> = samples.iter().map(Value::loggable_type).collect();
    assert_eq!(shapes, LoggableType::ALL.to_vec());
    assert!(matches!(samples[0].data(), ValueData::Raw(_)));
}
