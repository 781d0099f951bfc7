//! Attribute fixtures.

use genstar_core::{Attribute, AttributeDictionary, ValueType};

/// `Sex` in {M, F}.
pub fn sex() -> Attribute {
    Attribute::direct("Sex", ValueType::Nominal, ["M", "F"]).unwrap()
}

/// `Age` in {0-18, 19-64, 65+}.
pub fn age() -> Attribute {
    Attribute::direct("Age", ValueType::Range, ["0-18", "19-64", "65+"]).unwrap()
}

/// Dictionary holding [`sex`] then [`age`].
///
/// # Example
///
/// ```
/// let dictionary = genstar_test::sex_age();
/// assert_eq!(dictionary.names(), vec!["Sex", "Age"]);
/// ```
pub fn sex_age() -> AttributeDictionary {
    AttributeDictionary::new()
        .with(sex())
        .unwrap()
        .with(age())
        .unwrap()
}
