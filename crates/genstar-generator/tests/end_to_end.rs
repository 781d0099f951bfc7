//! Full generations from files on disk.

use std::collections::{BTreeMap, HashSet};

use genstar_config::GenerationConfig;
use genstar_core::Population;
use genstar_generator::{GenerationRequest, PopulationGenerator, RequestAssembler, LOCATION_KEY};
use genstar_test::{age, sex, sex_age, write_census_1000, write_sample};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tempfile::TempDir;

fn combinations(population: &Population) -> BTreeMap<(String, String), usize> {
    let mut counts = BTreeMap::new();
    for entity in population.entities() {
        let key = (
            entity.value("Sex").unwrap().label(),
            entity.value("Age").unwrap().label(),
        );
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
}

fn sample_rows(size: usize) -> Vec<(&'static str, &'static str)> {
    const AGES: [&str; 3] = ["0-18", "19-64", "65+"];
    (0..size)
        .map(|i| (if i % 2 == 0 { "M" } else { "F" }, AGES[i % 3]))
        .collect()
}

#[test]
fn test_direct_sampling_defaults_to_census_total() {
    let dir = TempDir::new().unwrap();
    write_census_1000(dir.path()).unwrap();
    let request = GenerationRequest::builder()
        .with_base_dir(dir.path())
        .with_seed(2024)
        .add_attribute(sex())
        .unwrap()
        .add_attribute(age())
        .unwrap()
        .add_input("census.csv", "ContingencyTable")
        .unwrap()
        .build()
        .unwrap();

    let outcome = PopulationGenerator::new()
        .generate(Some(&request), -1)
        .unwrap()
        .unwrap();

    assert_eq!(outcome.population.len(), 1000);
    for entity in outcome.population.entities() {
        assert!(sex().index_of(&entity.value("Sex").unwrap().label()).is_some());
        assert!(age().index_of(&entity.value("Age").unwrap().label()).is_some());
    }
}

#[test]
fn test_uniform_sampling_resamples_or_keeps_sample() {
    let dir = TempDir::new().unwrap();
    write_sample(dir.path(), "sample.csv", &sample_rows(50)).unwrap();
    let request = GenerationRequest::builder()
        .with_base_dir(dir.path())
        .with_algorithm("Uniform Sampling")
        .unwrap()
        .with_seed(7)
        .add_attribute(sex())
        .unwrap()
        .add_attribute(age())
        .unwrap()
        .add_input("sample.csv", "sample")
        .unwrap()
        .build()
        .unwrap();
    let generator = PopulationGenerator::new();

    let resampled = generator.generate(Some(&request), 200).unwrap().unwrap();
    assert_eq!(resampled.population.len(), 200);
    let seen: HashSet<_> = combinations(&resampled.population).into_keys().collect();
    assert!(seen.len() <= 6);

    let kept = generator.generate(Some(&request), -1).unwrap().unwrap();
    let zero = generator.generate(Some(&request), 0).unwrap().unwrap();
    assert_eq!(kept.population.len(), 50);
    assert_eq!(combinations(&kept.population), combinations(&zero.population));
    let total: usize = combinations(&kept.population).values().sum();
    assert_eq!(total, 50);
}

#[test]
fn test_records_reproduce_dictionary_names() {
    let dir = TempDir::new().unwrap();
    write_census_1000(dir.path()).unwrap();
    let request = GenerationRequest::builder()
        .with_base_dir(dir.path())
        .with_seed(3)
        .add_attribute(sex())
        .unwrap()
        .add_attribute(age())
        .unwrap()
        .add_input("census.csv", "contingency")
        .unwrap()
        .build()
        .unwrap();
    let outcome = PopulationGenerator::new()
        .generate(Some(&request), 25)
        .unwrap()
        .unwrap();

    let records = outcome
        .materializer()
        .as_records(10, &mut ChaCha8Rng::seed_from_u64(3));
    assert_eq!(records.len(), 10);
    let expected: HashSet<String> = sex_age().names().into_iter().collect();
    for record in &records {
        let names: HashSet<String> = record
            .keys()
            .filter(|k| k.as_str() != LOCATION_KEY)
            .cloned()
            .collect();
        assert_eq!(names, expected);
    }
}

#[test]
fn test_configuration_file_drives_generation() {
    let dir = TempDir::new().unwrap();
    write_census_1000(dir.path()).unwrap();
    let config = GenerationConfig::from_toml_str(&format!(
        r#"
        algorithm = "hierarchical sampling"
        seed = 11
        base_dir = "{}"

        [[input_files]]
        path = "census.csv"
        survey_type = "Contingency"

        [[attributes]]
        kind = "direct"
        name = "Sex"
        values = ["M", "F"]

        [[attributes]]
        kind = "range"
        name = "Age"
        values = ["0-18", "19-64", "65+"]

        [[networks]]
        name = "colleagues"
        engine = "ba"
        k = 2
        "#,
        dir.path().display().to_string().replace('\\', "/"),
    ))
    .unwrap();
    let request = RequestAssembler::from_config(&config).unwrap().build().unwrap();

    let outcome = PopulationGenerator::new()
        .generate(Some(&request), 120)
        .unwrap()
        .unwrap();
    assert_eq!(outcome.population.len(), 120);
    let network = outcome.population.network("colleagues").unwrap();
    assert_eq!(network.node_count(), 120);
    assert_eq!(outcome.report.networks, vec!["colleagues"]);
}

#[test]
fn test_missing_input_file_aborts_generation() {
    let dir = TempDir::new().unwrap();
    let request = GenerationRequest::builder()
        .with_base_dir(dir.path())
        .add_attribute(sex())
        .unwrap()
        .add_input("absent.csv", "contingency")
        .unwrap()
        .build()
        .unwrap();
    let err = PopulationGenerator::new()
        .generate(Some(&request), 10)
        .unwrap_err();
    assert!(matches!(err, genstar_core::GenstarError::InputLoad { .. }));
}
