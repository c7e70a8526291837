use super::*;

#[test]
fn test_enum_index() {
    let index = EnumIndex::new(10);
    assert_eq!(index.to_offset(), 10);
    assert_eq!(u32::from(index), 10);
    assert_eq!(format!("{:?}", index), "eidx<10>");
    assert_eq!(EnumIndex::from_offset(10).unwrap(), index);
    assert!(EnumIndex::new(1) < EnumIndex::new(2));
}

#[test]
fn test_footprint() {
    assert_eq!(10_u64.footprint().unwrap(), 8);
    assert_eq!(10_i32.footprint().unwrap(), 4);
    assert_eq!(1.0_f64.footprint().unwrap(), 8);

    let base = size_of::<String>() as u64;
    let mut s = String::with_capacity(1024);
    s.push_str("hello");
    assert_eq!(s.footprint().unwrap(), base + 5);
    assert_eq!(s.clone().footprint().unwrap(), s.footprint().unwrap());
}

#[test]
fn test_natural_order() {
    assert_eq!(NaturalOrder::compare(&1_u64, &2), Ordering::Less);
    assert_eq!(NaturalOrder::compare(&2_u64, &2), Ordering::Equal);
    assert_eq!(NaturalOrder::compare_folded(&3_u64, &2), Ordering::Greater);

    let (a, b) = ("Foo".to_string(), "foo".to_string());
    assert_eq!(NaturalOrder::compare(&a, &b), Ordering::Less);
}

#[test]
fn test_float_order() {
    assert_eq!(FloatOrder::compare(&1.0_f64, &2.0), Ordering::Less);
    assert_eq!(FloatOrder::compare(&-0.0_f64, &0.0), Ordering::Less);
    assert_eq!(FloatOrder::compare(&f64::NAN, &f64::NAN), Ordering::Equal);
    assert_eq!(FloatOrder::compare(&1.5_f32, &1.5), Ordering::Equal);
}

#[test]
fn test_folded_order() {
    let s = |x: &str| x.to_string();

    assert_eq!(FoldedOrder::compare(&s("apple"), &s("Banana")), Ordering::Less);
    assert_eq!(FoldedOrder::compare(&s("Foo"), &s("foo")), Ordering::Less);
    assert_eq!(FoldedOrder::compare(&s("foo"), &s("foo")), Ordering::Equal);
    assert_eq!(FoldedOrder::compare_folded(&s("FOO"), &s("foo")), Ordering::Equal);
    assert_eq!(FoldedOrder::compare_folded(&s("foo"), &s("fop")), Ordering::Less);

    let mut values = vec![s("b"), s("B"), s("a"), s("A"), s("c")];
    values.sort_by(FoldedOrder::compare);
    assert_eq!(values, vec![s("A"), s("a"), s("B"), s("b"), s("c")]);
}

#[test]
fn test_address_space_usage() {
    let usage = AddressSpaceUsage {
        used: 300,
        dead: 100,
        limit: 1000,
    };
    assert_eq!(usage.to_remaining(), 700);
    assert!((usage.to_usage() - 0.3).abs() < f64::EPSILON);
    assert_eq!(usage.to_string(), "{ used = 300, dead = 100, limit = 1000 }");

    assert_eq!(AddressSpaceUsage::default().to_usage(), 0.0);
}
