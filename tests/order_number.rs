use std::collections::HashSet;

use storefront_api::services::order_service::generate_order_number;

#[test]
fn order_numbers_have_expected_shape() {
    let number = generate_order_number();
    let parts: Vec<&str> = number.split('-').collect();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0], "ORD");
    assert!(parts[1].parse::<i64>().is_ok(), "timestamp prefix: {number}");
    assert_eq!(parts[2].len(), 8);
}

#[test]
fn ten_thousand_order_numbers_are_unique() {
    let mut seen = HashSet::new();
    for _ in 0..10_000 {
        let number = generate_order_number();
        assert!(seen.insert(number.clone()), "duplicate order number: {number}");
    }
}
