//! Tests for the synthesis orchestrator.

use std::collections::BTreeMap;
use std::path::PathBuf;

use genstar_core::{
    Attribute, AttributeDictionary, ConfigurationError, Entity, EntityId, GenstarError, Population,
    Result, Value, ValueType,
};
use indexmap::IndexMap;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::*;
use crate::input::{SurveyFile, SurveyLoader};
use crate::request::GenerationRequestBuilder;

/// Serves prepared tables and samples, whatever the files.
#[derive(Default)]
struct MemoryLoader {
    tables: Vec<DataTable>,
    samples: Vec<Population>,
    layered: Vec<Population>,
}

impl SurveyLoader for MemoryLoader {
    fn load_tables(&self, _: &[SurveyFile], _: &AttributeDictionary) -> Result<Vec<DataTable>> {
        Ok(self.tables.clone())
    }

    fn load_samples(&self, _: &[SurveyFile], _: &AttributeDictionary) -> Result<Vec<Population>> {
        Ok(self.samples.clone())
    }

    fn load_multilayer_samples(
        &self,
        _: &[SurveyFile],
        _: &AttributeDictionary,
        _: &AttributeDictionary,
        _: &str,
    ) -> Result<Vec<Population>> {
        Ok(self.layered.clone())
    }
}

struct BrokenLoader;

impl SurveyLoader for BrokenLoader {
    fn load_tables(&self, _: &[SurveyFile], _: &AttributeDictionary) -> Result<Vec<DataTable>> {
        Err(GenstarError::input_load("census.csv", "unexpected end of file"))
    }

    fn load_samples(&self, _: &[SurveyFile], _: &AttributeDictionary) -> Result<Vec<Population>> {
        Err(GenstarError::input_load("sample.csv", "unexpected end of file"))
    }

    fn load_multilayer_samples(
        &self,
        _: &[SurveyFile],
        _: &AttributeDictionary,
        _: &AttributeDictionary,
        _: &str,
    ) -> Result<Vec<Population>> {
        Err(GenstarError::input_load("sample.csv", "unexpected end of file"))
    }
}

fn sex() -> Attribute {
    Attribute::direct("Sex", ValueType::Nominal, ["M", "F"]).unwrap()
}

fn age() -> Attribute {
    Attribute::direct("Age", ValueType::Range, ["0-18", "19-64", "65+"]).unwrap()
}

fn size() -> Attribute {
    Attribute::direct("Size", ValueType::Nominal, ["small", "large"]).unwrap()
}

fn census() -> DataTable {
    DataTable {
        source: PathBuf::from("census.csv"),
        survey_type: SurveyType::ContingencyTable,
        dimensions: vec!["Sex".into(), "Age".into()],
        cells: BTreeMap::from([
            (vec![0, 0], 200.0),
            (vec![0, 1], 250.0),
            (vec![0, 2], 50.0),
            (vec![1, 0], 180.0),
            (vec![1, 1], 270.0),
            (vec![1, 2], 50.0),
        ]),
    }
}

fn nominal(pairs: &[(&str, &str)]) -> IndexMap<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), Value::Nominal(v.to_string())))
        .collect()
}

fn sample(size: usize) -> Population {
    let dictionary = AttributeDictionary::new().with(sex()).unwrap();
    let mut population = Population::new(dictionary);
    for i in 0..size {
        let label = if i % 5 == 0 { "F" } else { "M" };
        population.spawn(nominal(&[("Sex", label)]));
    }
    population
}

/// Ten households: even ones hold two men, odd ones one woman.
fn households() -> Population {
    let households = AttributeDictionary::new().with(size()).unwrap();
    let individuals = AttributeDictionary::new().with(sex()).unwrap();
    let mut population = Population::multilevel(households, individuals);
    for i in 0..10 {
        let (label, members, member_sex) = if i % 2 == 0 {
            ("large", 2, "M")
        } else {
            ("small", 1, "F")
        };
        let mut household = Entity::with_values(EntityId(0), nominal(&[("Size", label)]));
        for _ in 0..members {
            household.add_child(Entity::with_values(EntityId(0), nominal(&[("Sex", member_sex)])));
        }
        population.push(household);
    }
    population
}

fn sr_request(algorithm: &str, ipf: bool) -> GenerationRequest {
    GenerationRequestBuilder::new()
        .with_algorithm(algorithm)
        .unwrap()
        .with_ipf(ipf)
        .add_attribute(sex())
        .unwrap()
        .add_attribute(age())
        .unwrap()
        .add_input("census.csv", "contingency")
        .unwrap()
        .build()
        .unwrap()
}

fn co_request(algorithm: &str) -> GenerationRequest {
    GenerationRequestBuilder::new()
        .with_algorithm(algorithm)
        .unwrap()
        .add_attribute(sex())
        .unwrap()
        .add_input("sample.csv", "sample")
        .unwrap()
        .build()
        .unwrap()
}

fn ml_request(algorithm: &str) -> GenerationRequest {
    GenerationRequestBuilder::new()
        .with_algorithm(algorithm)
        .unwrap()
        .add_attribute(sex())
        .unwrap()
        .add_household_attribute(size())
        .unwrap()
        .with_household_key("household")
        .add_input("households.csv", "sample")
        .unwrap()
        .build()
        .unwrap()
}

fn rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(11)
}

#[test]
fn test_unspecified_size_uses_contingency_total() {
    let orchestrator = SynthesisOrchestrator::new().with_loader(MemoryLoader {
        tables: vec![census()],
        ..Default::default()
    });
    let (run, population) = orchestrator.run(&sr_request("direct sampling", false), -1, &mut rng());
    let population = population.unwrap();

    assert_eq!(population.len(), 1000);
    for entity in population.entities() {
        assert!(sex().index_of(&entity.value("Sex").unwrap().label()).is_some());
        assert!(age().index_of(&entity.value("Age").unwrap().label()).is_some());
    }
    assert_eq!(
        run.history(),
        [
            SynthesisState::LoadInputs,
            SynthesisState::BuildDistribution,
            SynthesisState::SelectSampler,
            SynthesisState::Materialize,
            SynthesisState::Done,
        ]
    );
}

#[test]
fn test_hierarchical_sampling_draws_requested_size() {
    let orchestrator = SynthesisOrchestrator::new().with_loader(MemoryLoader {
        tables: vec![census()],
        ..Default::default()
    });
    let population = orchestrator
        .synthesize(&sr_request("HS", false), 50, &mut rng())
        .unwrap();
    assert_eq!(population.len(), 50);
}

#[test]
fn test_ipf_needs_a_sample() {
    let orchestrator = SynthesisOrchestrator::new().with_loader(MemoryLoader {
        tables: vec![census()],
        ..Default::default()
    });
    let (run, result) = orchestrator.run(&sr_request("DS", true), 10, &mut rng());

    let err = result.unwrap_err();
    assert!(matches!(
        err,
        GenstarError::Configuration(ConfigurationError::MissingSample(_))
    ));
    assert_eq!(run.state(), SynthesisState::Failed);
}

#[test]
fn test_ipf_fits_on_first_sample() {
    let mut seed = Population::new(AttributeDictionary::new().with(sex()).unwrap().with(age()).unwrap());
    for (s, a) in [("M", "0-18"), ("M", "19-64"), ("F", "19-64"), ("F", "65+")] {
        seed.spawn(nominal(&[("Sex", s), ("Age", a)]));
    }
    let orchestrator = SynthesisOrchestrator::new().with_loader(MemoryLoader {
        tables: vec![census()],
        samples: vec![seed],
        ..Default::default()
    });
    let population = orchestrator
        .synthesize(&sr_request("direct sampling", true), 200, &mut rng())
        .unwrap();

    assert_eq!(population.len(), 200);
    // the fitted distribution keeps the seed's support
    assert!(population.entities().iter().all(|e| {
        let combination = (e.value("Sex").unwrap().label(), e.value("Age").unwrap().label());
        combination != ("F".to_string(), "0-18".to_string())
    }));
}

#[test]
fn test_input_failure_aborts_synthesis() {
    let orchestrator = SynthesisOrchestrator::new().with_loader(BrokenLoader);
    let err = orchestrator
        .synthesize(&sr_request("direct sampling", false), 10, &mut rng())
        .unwrap_err();
    assert!(matches!(err, GenstarError::InputLoad { .. }));
}

#[test]
fn test_co_draws_value_copies() {
    let orchestrator = SynthesisOrchestrator::new().with_loader(MemoryLoader {
        samples: vec![sample(50)],
        ..Default::default()
    });
    let population = orchestrator
        .synthesize(&co_request("uniform sampling"), 200, &mut rng())
        .unwrap();

    assert_eq!(population.len(), 200);
    let original = sample(50);
    for entity in population.entities() {
        assert!(original.entities().iter().any(|o| o.same_values(entity)));
    }
}

#[test]
fn test_co_unspecified_size_keeps_sample() {
    let orchestrator = SynthesisOrchestrator::new().with_loader(MemoryLoader {
        samples: vec![sample(50), sample(5)],
        ..Default::default()
    });
    for requested in [-1, 0] {
        let population = orchestrator
            .synthesize(&co_request("US"), requested, &mut rng())
            .unwrap();
        assert_eq!(population.len(), 50);
        let women = population
            .entities()
            .iter()
            .filter(|e| e.value("Sex").unwrap().label() == "F")
            .count();
        assert_eq!(women, 10);
    }
}

#[test]
fn test_co_needs_a_sample() {
    let err = SynthesisOrchestrator::new()
        .with_loader(MemoryLoader::default())
        .synthesize(&co_request("uniform sampling"), 10, &mut rng())
        .unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_unported_algorithms_are_rejected() {
    let orchestrator = SynthesisOrchestrator::new().with_loader(MemoryLoader {
        samples: vec![sample(5)],
        ..Default::default()
    });
    for algorithm in ["random search", "tabu search", "SA", "mixture", "mlts", "mlsa"] {
        let (run, result) = orchestrator.run(&co_request(algorithm), 10, &mut rng());
        assert!(
            matches!(result, Err(GenstarError::NotImplemented(_))),
            "{algorithm} should not be implemented"
        );
        assert_eq!(run.history(), [SynthesisState::LoadInputs, SynthesisState::Failed]);
    }
}

#[test]
fn test_handler_table_covers_ported_algorithms() {
    use crate::algorithm::ALGORITHMS;

    let handled = ALGORITHMS
        .iter()
        .filter(|(id, _)| handler_for(*id).is_some())
        .count();
    assert_eq!(handled, HANDLERS.len());
    assert_eq!(handled, 5);
}

#[test]
fn test_multilevel_sampling_reaches_member_target() {
    let orchestrator = SynthesisOrchestrator::new().with_loader(MemoryLoader {
        layered: vec![households()],
        ..Default::default()
    });
    let population = orchestrator
        .synthesize(&ml_request("multilevel"), 30, &mut rng())
        .unwrap();

    assert!(population.member_count() >= 30);
    assert!(population.member_count() < 32);
    assert!(population.member_attributes().is_some());
}

#[test]
fn test_multilevel_unspecified_size_keeps_sample() {
    let orchestrator = SynthesisOrchestrator::new().with_loader(MemoryLoader {
        layered: vec![households()],
        ..Default::default()
    });
    let population = orchestrator
        .synthesize(&ml_request("ml"), -1, &mut rng())
        .unwrap();
    assert_eq!(population.len(), 10);
    assert_eq!(population.member_count(), 15);
}

#[test]
fn test_multilevel_search_targets_first_objective() {
    let table = DataTable {
        source: PathBuf::from("members.csv"),
        survey_type: SurveyType::ContingencyTable,
        dimensions: vec!["Sex".into()],
        cells: BTreeMap::from([(vec![0], 20.0), (vec![1], 20.0)]),
    };
    let orchestrator = SynthesisOrchestrator::new().with_loader(MemoryLoader {
        tables: vec![table],
        layered: vec![households()],
        ..Default::default()
    });
    let population = orchestrator
        .synthesize(&ml_request("multilevel random search"), -1, &mut rng())
        .unwrap();
    assert!(population.member_count() >= 40);
}

#[test]
fn test_multilevel_needs_household_attributes() {
    let request = GenerationRequestBuilder::new()
        .with_algorithm("multilevel")
        .unwrap()
        .add_attribute(sex())
        .unwrap()
        .build()
        .unwrap();
    let err = SynthesisOrchestrator::new()
        .with_loader(MemoryLoader {
            layered: vec![households()],
            ..Default::default()
        })
        .synthesize(&request, 10, &mut rng())
        .unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_objectives_keep_marginals_and_linked_dimensions() {
    let gender = Attribute::direct("Gender", ValueType::Nominal, ["male", "female"])
        .unwrap()
        .with_link("Sex");
    let request = GenerationRequestBuilder::new()
        .add_attribute(sex())
        .unwrap()
        .add_attribute(gender)
        .unwrap()
        .add_attribute(age())
        .unwrap()
        .add_household_attribute(size())
        .unwrap()
        .add_marginals(["Sex"])
        .unwrap()
        .build()
        .unwrap();
    let households = request.household_attributes().unwrap().clone();
    let dictionary = merged_dictionary(&households, request.attributes()).unwrap();

    let by_gender_and_age = DataTable {
        source: PathBuf::from("gender.csv"),
        survey_type: SurveyType::ContingencyTable,
        dimensions: vec!["Gender".into(), "Age".into()],
        cells: BTreeMap::from([(vec![0, 0], 4.0), (vec![1, 1], 6.0)]),
    };
    let by_age = DataTable {
        source: PathBuf::from("age.csv"),
        survey_type: SurveyType::ContingencyTable,
        dimensions: vec!["Age".into()],
        cells: BTreeMap::from([(vec![0], 10.0)]),
    };

    let objectives = objectives(&[by_gender_and_age, by_age], &request, &dictionary, &households).unwrap();
    assert_eq!(objectives.len(), 1);
    assert_eq!(objectives[0].dimensions, vec!["Gender".to_string()]);
    assert_eq!(objectives[0].total(), 10.0);
}
