//! Population fixtures.

use genstar_core::{Population, Value};
use indexmap::IndexMap;

use crate::dictionary::sex_age;

/// `size` entities cycling through every Sex / Age combination.
pub fn sex_age_sample(size: usize) -> Population {
    const SEXES: [&str; 2] = ["M", "F"];
    const AGES: [&str; 3] = ["0-18", "19-64", "65+"];

    let mut population = Population::new(sex_age());
    for i in 0..size {
        let values = IndexMap::from([
            ("Sex".to_string(), Value::Nominal(SEXES[i % 2].to_string())),
            ("Age".to_string(), Value::Nominal(AGES[i % 3].to_string())),
        ]);
        population.spawn(values);
    }
    population
}
