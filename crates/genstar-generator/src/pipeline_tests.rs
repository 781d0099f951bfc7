use std::path::Path;

use genstar_core::{
    Attribute, AttributeDictionary, Feature, Geometry, GenstarError, Polygon, Population, Value,
    ValueType,
};
use indexmap::IndexMap;

use super::*;
use crate::input::{DataTable, SurveyFile, SurveyLoader};
use crate::request::GenerationRequestBuilder;
use crate::spatial::{Bound, GeoFile, GeometryReader};

fn sex() -> Attribute {
    Attribute::direct("Sex", ValueType::Nominal, ["M", "F"]).unwrap()
}

struct SampleLoader(usize);

impl SurveyLoader for SampleLoader {
    fn load_tables(&self, _: &[SurveyFile], _: &AttributeDictionary) -> Result<Vec<DataTable>> {
        Ok(Vec::new())
    }

    fn load_samples(&self, _: &[SurveyFile], attributes: &AttributeDictionary) -> Result<Vec<Population>> {
        let mut sample = Population::new(attributes.clone());
        for i in 0..self.0 {
            let label = if i % 3 == 0 { "F" } else { "M" };
            sample.spawn(IndexMap::from([(
                "Sex".to_string(),
                Value::Nominal(label.to_string()),
            )]));
        }
        Ok(vec![sample])
    }

    fn load_multilayer_samples(
        &self,
        _: &[SurveyFile],
        _: &AttributeDictionary,
        _: &AttributeDictionary,
        _: &str,
    ) -> Result<Vec<Population>> {
        Ok(Vec::new())
    }
}

/// Two unit squares, whatever the path.
struct TwoNests;

impl GeometryReader for TwoNests {
    fn read(&self, _: &Path) -> Result<GeoFile> {
        Ok(GeoFile::new(vec![
            Feature::new("a", Geometry::Polygon(Polygon::rectangle(0.0, 0.0, 1.0, 1.0))),
            Feature::new("b", Geometry::Polygon(Polygon::rectangle(5.0, 0.0, 6.0, 1.0))),
        ])
        .with_crs("EPSG:3857"))
    }
}

fn builder() -> GenerationRequestBuilder {
    GenerationRequestBuilder::new()
        .with_algorithm("uniform sampling")
        .unwrap()
        .with_seed(42)
        .add_attribute(sex())
        .unwrap()
        .add_input("sample.csv", "sample")
        .unwrap()
}

fn generator(sample_size: usize) -> PopulationGenerator {
    PopulationGenerator::new()
        .with_synthesis(SynthesisOrchestrator::new().with_loader(SampleLoader(sample_size)))
        .with_spatialization(SpatializationStage::new().with_reader(TwoNests))
}

#[test]
fn test_missing_request_generates_nothing() {
    assert!(generator(10).generate(None, 10).unwrap().is_none());
}

#[test]
fn test_seeded_runs_are_reproducible() {
    let request = builder().build().unwrap();
    let labels = |outcome: GenerationOutcome| -> Vec<String> {
        outcome
            .population
            .entities()
            .iter()
            .map(|e| e.value("Sex").unwrap().label())
            .collect()
    };
    let first = generator(30).generate(Some(&request), 100).unwrap().unwrap();
    let second = generator(30).generate(Some(&request), 100).unwrap().unwrap();
    assert_eq!(first.report.synthesized, 100);
    assert_eq!(labels(first), labels(second));
}

#[test]
fn test_dropped_entities_are_reported() {
    let request = builder()
        .localize_on_geometries("nests.geojson")
        .add_capacity_constraint(Bound::Constant(3.0), None, None, None)
        .build()
        .unwrap();
    let outcome = generator(10).generate(Some(&request), 10).unwrap().unwrap();

    assert_eq!(outcome.report.synthesized, 10);
    assert_eq!(outcome.report.dropped, 4);
    assert_eq!(outcome.population.len(), 6);
    assert!(outcome.population.is_spatialized());
    assert_eq!(outcome.population.crs(), Some("EPSG:3857"));
    assert_eq!(outcome.materializer().as_shapes(-1, &mut rand::rng()).len(), 6);
}

#[test]
fn test_networks_are_attached_after_localization() {
    let request = builder()
        .localize_on_geometries("nests.geojson")
        .add_network("neighbours", "spatial", Some(2.0), None)
        .unwrap()
        .add_network("family", "complete", None, None)
        .unwrap()
        .build()
        .unwrap();
    let outcome = generator(10).generate(Some(&request), 8).unwrap().unwrap();

    assert_eq!(outcome.report.networks, vec!["neighbours", "family"]);
    assert_eq!(outcome.population.network("family").unwrap().edge_count(), 28);
}

#[test]
fn test_synthesis_failure_aborts_generation() {
    let request = GenerationRequestBuilder::new()
        .with_algorithm("tabu search")
        .unwrap()
        .build()
        .unwrap();
    let err = generator(10).generate(Some(&request), 10).unwrap_err();
    assert!(matches!(err, GenstarError::NotImplemented(_)));
}

#[test]
fn test_associate_pairs_entities_in_order() {
    let request = builder().build().unwrap();
    let outcome = generator(5).generate(Some(&request), -1).unwrap().unwrap();
    let agents = outcome.associate(["ada", "bob", "cy"]);

    assert_eq!(agents.len(), 3);
    let first = outcome.population.entities()[0].id();
    assert_eq!(agents.get(&first), Some(&"ada"));
}
