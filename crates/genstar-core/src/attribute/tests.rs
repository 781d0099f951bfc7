//! Tests for attributes and the attribute dictionary.

use super::*;
use crate::error::ConfigurationError;
use crate::value::{Value, ValueType};

fn age() -> Attribute {
    Attribute::direct("Age", ValueType::Range, ["0-18", "19-64", "65+"]).unwrap()
}

#[test]
fn test_direct_attribute_value_space() {
    let sex = Attribute::direct("Sex", ValueType::Nominal, ["M", "F"]).unwrap();
    assert_eq!(sex.kind(), &AttributeKind::Direct);
    assert_eq!(sex.index_of("F"), Some(1));
    assert_eq!(sex.value_of("M"), Some(&Value::Nominal("M".into())));
    assert!(sex.index_of("X").is_none());
}

#[test]
fn test_range_attribute_kind() {
    let age = age();
    assert_eq!(age.kind(), &AttributeKind::Range);
    assert_eq!(age.index_of("65+"), Some(2));
}

#[test]
fn test_invalid_integer_label() {
    let err = Attribute::direct("Size", ValueType::Integer, ["1", "two"]).unwrap_err();
    assert_eq!(
        err,
        ConfigurationError::InvalidValue {
            attribute: "Size".into(),
            value: "two".into(),
        }
    );
}

#[test]
fn test_mapped_attribute_translates_labels() {
    let age = age();
    let group = Attribute::mapped(
        "AgeGroup",
        ValueType::Nominal,
        &age,
        vec![
            ValueMapping::new(["minor"], ["0-18"]),
            ValueMapping::new(["adult"], ["19-64", "65+"]),
        ],
    )
    .unwrap();

    assert_eq!(group.referent(), Some("Age"));
    assert_eq!(group.values().len(), 2);
    assert_eq!(
        group.referent_labels("adult").map(|l| l.len()),
        Some(2)
    );
    assert!(group.referent_labels("senior").is_none());
}

#[test]
fn test_mapped_attribute_rejects_unknown_referent_label() {
    let err = Attribute::mapped(
        "AgeGroup",
        ValueType::Nominal,
        &age(),
        vec![ValueMapping::new(["old"], ["80+"])],
    )
    .unwrap_err();
    assert!(matches!(err, ConfigurationError::InvalidValue { .. }));
}

#[test]
fn test_link_is_symmetric() {
    let a = Attribute::direct("HhSize", ValueType::Integer, ["1", "2"]).unwrap();
    let b = Attribute::direct("Size", ValueType::Integer, ["1", "2"])
        .unwrap()
        .with_link("HhSize");
    assert!(a.is_linked(&b));
    assert!(b.is_linked(&a));
    assert!(!a.is_linked(&age()));
}

#[test]
fn test_dictionary_rejects_duplicate_names() {
    let mut dictionary = AttributeDictionary::new();
    dictionary.add(age()).unwrap();
    let err = dictionary.add(age()).unwrap_err();
    assert_eq!(err, ConfigurationError::DuplicateAttribute("Age".into()));
}

#[test]
fn test_mapped_before_referent_fails_then_succeeds() {
    let age = age();
    let group = Attribute::mapped(
        "AgeGroup",
        ValueType::Nominal,
        &age,
        vec![ValueMapping::new(["minor"], ["0-18"])],
    )
    .unwrap();

    let mut dictionary = AttributeDictionary::new();
    let err = dictionary.add(group.clone()).unwrap_err();
    assert_eq!(
        err,
        ConfigurationError::MissingReferent {
            attribute: "AgeGroup".into(),
            referent: "Age".into(),
        }
    );

    dictionary.add(age).unwrap();
    dictionary.add(group).unwrap();
    assert_eq!(dictionary.get("AgeGroup").map(|a| a.name()), Some("AgeGroup"));
    assert_eq!(dictionary.dimension_for("AgeGroup").map(|a| a.name()), Some("Age"));
}

#[test]
fn test_record_attribute_is_kept_apart() {
    let age = age();
    let count = Attribute::record("Count", ValueType::Integer, &age);

    let mut dictionary = AttributeDictionary::new();
    assert!(matches!(
        dictionary.add(count.clone()),
        Err(ConfigurationError::MissingReferent { .. })
    ));

    dictionary.add(age).unwrap();
    dictionary.add(count).unwrap();
    assert_eq!(dictionary.len(), 1);
    assert_eq!(dictionary.records().count(), 1);
    assert!(dictionary.get("Count").unwrap().is_record());
    assert_eq!(dictionary.names(), vec!["Age".to_string()]);
}

#[test]
fn test_derive_mapped_fills_from_referent() {
    let age = age();
    let group = Attribute::mapped(
        "AgeGroup",
        ValueType::Nominal,
        &age,
        vec![
            ValueMapping::new(["minor"], ["0-18"]),
            ValueMapping::new(["adult"], ["19-64", "65+"]),
        ],
    )
    .unwrap();
    let dictionary = AttributeDictionary::new().with(age).unwrap().with(group).unwrap();

    let mut values = indexmap::IndexMap::new();
    values.insert("Age".to_string(), dictionary.get("Age").unwrap().values()[2].clone());
    dictionary.derive_mapped(&mut values);
    assert_eq!(values.get("AgeGroup"), Some(&Value::Nominal("adult".into())));
}
