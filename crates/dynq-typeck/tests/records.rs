//! Record interning under concurrency, and structural equality of
//! record instances.

use std::collections::HashSet;
use std::sync::Barrier;

use dynq_typeck::{FieldDescriptor, RecordTypeFactory, RecordValue, Ty, Value};

fn point_fields() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::new("X", Ty::Int32),
        FieldDescriptor::new("Y", Ty::Int32),
    ]
}

#[test]
fn racing_first_lookups_create_one_type() {
    let factory = RecordTypeFactory::new();
    let threads = 16;
    let barrier = Barrier::new(threads);

    let types = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    factory.get_or_create(&point_fields())
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("worker panicked"))
            .collect::<Vec<_>>()
    });

    assert_eq!(factory.len(), 1);
    assert!(types.iter().all(|t| *t == types[0]));
}

#[test]
fn concurrent_distinct_signatures_each_get_one_type() {
    let factory = RecordTypeFactory::new();
    let names: Vec<String> = (0..8).map(|i| format!("F{i}")).collect();

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for name in &names {
                    factory.get_or_create(&[FieldDescriptor::new(name.as_str(), Ty::String)]);
                }
            });
        }
    });

    assert_eq!(factory.len(), names.len());
    let distinct: HashSet<String> = names
        .iter()
        .map(|n| {
            factory
                .get_or_create(&[FieldDescriptor::new(n.as_str(), Ty::String)])
                .name()
                .to_string()
        })
        .collect();
    assert_eq!(distinct.len(), names.len());
}

#[test]
fn permuted_fields_are_a_different_type() {
    let factory = RecordTypeFactory::new();
    let xy = factory.get_or_create(&point_fields());
    let mut reversed = point_fields();
    reversed.reverse();
    let yx = factory.get_or_create(&reversed);
    assert_ne!(xy, yx);
    assert_eq!(factory.len(), 2);
}

#[test]
fn instances_compare_field_by_field() {
    let factory = RecordTypeFactory::new();
    let ty = factory.get_or_create(&point_fields());
    let a = RecordValue::new(ty.clone(), vec![Value::Int32(1), Value::Int32(2)]);
    let b = RecordValue::new(ty.clone(), vec![Value::Int32(1), Value::Int32(2)]);
    assert_eq!(a, b);

    let hash = |r: &RecordValue| {
        use std::hash::{Hash, Hasher};
        let mut h = std::collections::hash_map::DefaultHasher::new();
        r.hash(&mut h);
        h.finish()
    };
    assert_eq!(hash(&a), hash(&b));

    let mut c = b.clone();
    assert!(c.set("y", Value::Int32(3)));
    assert_ne!(a, c);
    assert_eq!(c.get("Y"), Some(&Value::Int32(3)));
    assert!(!c.set("Z", Value::Int32(0)));
}

#[test]
fn same_values_in_another_record_type_are_unequal() {
    let factory = RecordTypeFactory::new();
    let point = factory.get_or_create(&point_fields());
    let other = factory.get_or_create(&[
        FieldDescriptor::new("X", Ty::Int32),
        FieldDescriptor::new("Z", Ty::Int32),
    ]);
    let a = RecordValue::new(point, vec![Value::Int32(1), Value::Int32(2)]);
    let b = RecordValue::new(other, vec![Value::Int32(1), Value::Int32(2)]);
    assert_ne!(a, b);
}

#[test]
fn record_types_expose_field_accessors() {
    let factory = RecordTypeFactory::new();
    let ty = factory.get_or_create(&point_fields());
    let value = Value::Record(RecordValue::new(ty.clone(), vec![Value::Int32(4), Value::Int32(5)]));
    let prop = ty.def().property("x", false).expect("accessor");
    assert_eq!(prop.ty, Ty::Int32);
    assert_eq!((prop.get)(&value), Ok(Value::Int32(4)));
    assert_eq!(value.to_string(), "{X=4, Y=5}");
}
