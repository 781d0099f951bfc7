use std::collections::HashMap;
use std::path::{Path, PathBuf};

use approx::assert_abs_diff_eq;
use genstar_core::{
    AttributeDictionary, ConfigurationError, Feature, Geometry, GenstarError, Point, Polygon,
    Population, PropertyValue, Value,
};
use indexmap::IndexMap;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::*;

fn square(id: &str, x: f64, y: f64, side: f64) -> Feature {
    Feature::new(id, Geometry::Polygon(Polygon::rectangle(x, y, x + side, y + side)))
}

fn population(zones: &[&str]) -> Population {
    let mut population = Population::new(AttributeDictionary::new());
    for zone in zones {
        let mut values = IndexMap::new();
        values.insert("Zone".to_string(), Value::Nominal(zone.to_string()));
        population.spawn(values);
    }
    population
}

/// Serves geometry files from memory.
#[derive(Default)]
struct MemoryReader {
    files: HashMap<PathBuf, GeoFile>,
}

impl MemoryReader {
    fn with(mut self, path: &str, file: GeoFile) -> Self {
        self.files.insert(PathBuf::from(path), file);
        self
    }
}

impl GeometryReader for MemoryReader {
    fn read(&self, path: &Path) -> genstar_core::Result<GeoFile> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| GenstarError::geometry(path, "no such file"))
    }
}

#[test]
fn test_distribution_aliases_ignore_case() {
    assert_eq!(
        SpatialDistributionKind::resolve("AREA").unwrap(),
        SpatialDistributionKind::Area
    );
    assert_eq!(
        SpatialDistributionKind::resolve("uniform").unwrap(),
        SpatialDistributionKind::Default
    );
    assert_eq!(
        SpatialDistributionKind::resolve("Density").unwrap(),
        SpatialDistributionKind::Density
    );
    assert_eq!(
        SpatialDistributionKind::resolve("gravity"),
        Err(ConfigurationError::UnknownSpatialDistribution("gravity".into()))
    );
}

#[test]
fn test_relaxation_tries_each_threshold_in_order() {
    let nest = square("n", 0.0, 0.0, 1.0);
    let constraint = SpatialConstraint::capacity(Bound::Constant(5.0), Some(9.0), Some(2.0), 0);

    let mut tried = Vec::new();
    let found = constraint.relax(|increment| {
        tried.push(constraint.threshold(&nest, increment).unwrap());
        false
    });
    assert_eq!(found, None);
    assert_eq!(tried, vec![5.0, 7.0, 9.0]);
}

#[test]
fn test_relaxation_stops_at_first_admitting_threshold() {
    let nest = square("n", 0.0, 0.0, 1.0);
    let constraint = SpatialConstraint::capacity(Bound::Constant(5.0), Some(9.0), Some(2.0), 0);

    let mut tried = Vec::new();
    let found = constraint.relax(|increment| {
        let threshold = constraint.threshold(&nest, increment).unwrap();
        tried.push(threshold);
        threshold >= 7.0
    });
    assert_eq!(found, Some(2.0));
    assert_eq!(tried, vec![5.0, 7.0]);
}

#[test]
fn test_constraint_without_step_has_single_threshold() {
    let constraint = SpatialConstraint::density(Bound::Constant(0.5), None, None, 0);
    assert_eq!(constraint.increments(), vec![0.0]);

    let feature = SpatialConstraint::capacity(Bound::Feature("beds".into()), Some(4.0), Some(2.0), 0);
    assert_eq!(feature.increments(), vec![0.0, 2.0, 4.0]);
    assert_eq!(feature.feature(), Some("beds"));
}

#[test]
fn test_capacity_and_density_admission() {
    let nest = square("n", 0.0, 0.0, 2.0).with_property("beds", PropertyValue::Number(3.0));
    let capacity = SpatialConstraint::capacity(Bound::Feature("beds".into()), None, None, 0);
    assert!(capacity.admits(&nest, 2, None, 0.0));
    assert!(!capacity.admits(&nest, 3, None, 0.0));

    // area 4: a fourth entity makes density 1
    let density = SpatialConstraint::density(Bound::Constant(1.0), None, None, 0);
    assert!(density.admits(&nest, 3, None, 0.0));
    assert!(!density.admits(&nest, 4, None, 0.0));
}

#[test]
fn test_distance_constraint_measures_from_region() {
    let nest = square("n", 10.0, 0.0, 2.0);
    let region = square("r", 0.0, 0.0, 5.0);
    let constraint = SpatialConstraint::distance(0.0, Some(10.0), Some(3.0), 0);
    // nest centroid (11, 1) is 6 away from the region
    assert!(!constraint.admits(&nest, 0, Some(&region), 3.0));
    assert!(constraint.admits(&nest, 0, Some(&region), 6.0));
    assert!(constraint.admits(&nest, 0, None, 0.0));
}

#[test]
fn test_localizer_relaxes_capacity_then_drops() {
    let mut layout = SpatialLayout::new(vec![square("n", 0.0, 0.0, 10.0)]);
    layout.constraints = vec![SpatialConstraint::capacity(
        Bound::Constant(5.0),
        Some(9.0),
        Some(2.0),
        0,
    )];
    let mut population = population(&["a"; 10]);

    let dropped = NestLocalizer::new()
        .localize(&mut population, &layout, &mut ChaCha8Rng::seed_from_u64(1))
        .unwrap();
    assert_eq!(dropped, 1);
    assert_eq!(population.len(), 9);
    assert!(population.entities().iter().all(|e| e.nest() == Some("n")));
}

#[test]
fn test_area_distribution_places_every_entity_in_a_nest() {
    let nests = vec![square("small", 0.0, 0.0, 1.0), square("large", 5.0, 5.0, 4.0)];
    let mut layout = SpatialLayout::new(nests.clone());
    layout.distribution = SpatialDistributionKind::Area;
    let mut population = population(&["a"; 200]);

    let dropped = NestLocalizer::new()
        .localize(&mut population, &layout, &mut ChaCha8Rng::seed_from_u64(2))
        .unwrap();
    assert_eq!(dropped, 0);

    let mut large = 0;
    for entity in population.entities() {
        let location = entity.location().unwrap();
        let nest = nests.iter().find(|n| Some(n.id.as_str()) == entity.nest()).unwrap();
        assert!(nest.geometry.contains(&location));
        if nest.id == "large" {
            large += 1;
        }
    }
    // areas 1 and 16
    assert!(large > 160, "large = {large}");
}

#[test]
fn test_spatial_match_keeps_entities_in_their_region() {
    let regions = vec![
        square("r1", 0.0, 0.0, 10.0).with_property("code", PropertyValue::Text("A".into())),
        square("r2", 20.0, 0.0, 10.0).with_property("code", PropertyValue::Text("B".into())),
    ];
    let mut layout = SpatialLayout::new(vec![square("n1", 2.0, 2.0, 2.0), square("n2", 22.0, 2.0, 2.0)]);
    layout.regions = regions;
    layout.spatial_match = Some(SpatialMatch {
        attribute: "Zone".into(),
        census_id: "code".into(),
    });
    layout.constraints = vec![SpatialConstraint::distance(0.0, None, None, 0)];
    let mut population = population(&["A", "B", "A", "C"]);

    let dropped = NestLocalizer::new()
        .localize(&mut population, &layout, &mut ChaCha8Rng::seed_from_u64(3))
        .unwrap();
    assert_eq!(dropped, 1);
    for entity in population.entities() {
        let expected = match entity.value("Zone").unwrap().label().as_str() {
            "A" => "n1",
            _ => "n2",
        };
        assert_eq!(entity.nest(), Some(expected));
    }
}

#[test]
fn test_band_draw_stays_outside_without_overlaps() {
    let geometry = Geometry::Polygon(Polygon::rectangle(0.0, 0.0, 4.0, 4.0));
    let band = DistanceBand {
        min: 1.0,
        max: 3.0,
        overlaps: false,
    };
    let mut rng = ChaCha8Rng::seed_from_u64(4);
    for _ in 0..50 {
        let p = band.draw_around(&geometry, &mut rng).unwrap();
        assert!(!geometry.contains(&p));
        let d = geometry.distance_to(&p);
        assert!((1.0..=3.0).contains(&d), "distance {d}");
    }
}

#[test]
fn test_geojson_reader_parses_collection() {
    let json = r#"{
        "type": "FeatureCollection",
        "crs": {"type": "name", "properties": {"name": "EPSG:2154"}},
        "features": [
            {"type": "Feature", "id": "iris-1",
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[2,0],[2,2],[0,2],[0,0]]]},
             "properties": {"capacity": 12, "name": "north", "flag": null}},
            {"type": "Feature",
             "geometry": {"type": "Point", "coordinates": [1.5, 2.5, 10.0]},
             "properties": {}}
        ]
    }"#;
    let file = GeoJsonReader::new().parse(Path::new("nests.geojson"), json).unwrap();

    assert_eq!(file.crs.as_deref(), Some("EPSG:2154"));
    assert_eq!(file.features.len(), 2);
    let first = &file.features[0];
    assert_eq!(first.id, "iris-1");
    assert_abs_diff_eq!(first.geometry.area(), 4.0);
    assert_eq!(first.numeric("CAPACITY"), Some(12.0));
    assert!(first.property("flag").is_none());
    assert_eq!(file.features[1].id, "1");
    assert_eq!(file.features[1].geometry, Geometry::Point(Point::new(1.5, 2.5)));
}

#[test]
fn test_geojson_reader_reports_malformed_file() {
    let err = GeoJsonReader::new()
        .parse(Path::new("broken.geojson"), r#"{"features": [{"geometry": {"type": "Line"}}]}"#)
        .unwrap_err();
    assert!(matches!(err, GenstarError::Geometry { .. }));
}

#[test]
fn test_ols_recovers_linear_model() {
    let covariates: Vec<Vec<f64>> = (0..6).map(|i| vec![i as f64]).collect();
    let targets: Vec<f64> = (0..6).map(|i| 2.0 + 3.0 * i as f64).collect();

    let outcome = OlsRegression::new()
        .fit(&covariates, &targets, &Interrupt::none())
        .unwrap();
    let RefinementOutcome::Fitted { coefficients } = outcome else {
        panic!("expected a fit, got {outcome:?}");
    };
    assert_abs_diff_eq!(coefficients[0], 2.0, epsilon = 1e-9);
    assert_abs_diff_eq!(coefficients[1], 3.0, epsilon = 1e-9);
    assert_abs_diff_eq!(predict(&coefficients, &[10.0]), 32.0, epsilon = 1e-9);
}

#[test]
fn test_ols_zeroes_redundant_covariate() {
    let covariates: Vec<Vec<f64>> = (0..5).map(|i| vec![i as f64, 2.0 * i as f64]).collect();
    let targets: Vec<f64> = (0..5).map(|i| 1.0 + i as f64).collect();

    let RefinementOutcome::Fitted { coefficients } = OlsRegression::new()
        .fit(&covariates, &targets, &Interrupt::none())
        .unwrap()
    else {
        panic!("expected a fit");
    };
    for (i, x) in covariates.iter().enumerate() {
        assert_abs_diff_eq!(predict(&coefficients, x), targets[i], epsilon = 1e-9);
    }
}

#[test]
fn test_cancelled_regression_is_interrupted() {
    let token = CancellationToken::new();
    token.cancel();
    let outcome = OlsRegression::new()
        .fit(&[vec![1.0]], &[1.0], &Interrupt::none().with_token(token))
        .unwrap();
    assert_eq!(outcome, RefinementOutcome::Interrupted);
}

#[test]
fn test_regression_rejects_mismatched_inputs() {
    let err = OlsRegression::new()
        .fit(&[vec![1.0], vec![2.0]], &[1.0], &Interrupt::none())
        .unwrap_err();
    assert!(matches!(err, GenstarError::Regression(_)));
}

fn stage_reader() -> MemoryReader {
    MemoryReader::default()
        .with(
            "nests.geojson",
            GeoFile::new(vec![
                square("n1", 0.0, 0.0, 2.0).with_property("beds", PropertyValue::Number(50.0)),
                square("n2", 4.0, 0.0, 2.0).with_property("beds", PropertyValue::Number(50.0)),
            ])
            .with_crs("EPSG:3857"),
        )
        .with(
            "census.geojson",
            GeoFile::new(vec![square("c", 0.0, 0.0, 10.0)]).with_crs("EPSG:4326"),
        )
        .with(
            "landcover.geojson",
            GeoFile::new(vec![
                square("urban", 0.0, 0.0, 3.0).with_property("built", PropertyValue::Number(1.0)),
            ]),
        )
}

#[test]
fn test_stage_inherits_nest_crs() {
    let stage = SpatializationStage::new().with_reader(stage_reader());
    let request = SpatialRequest {
        nests: Some("nests.geojson".into()),
        census: Some("census.geojson".into()),
        ..SpatialRequest::default()
    };
    let mut population = population(&["a"; 5]);

    let report = stage
        .run(&mut population, &request, &Interrupt::none(), &mut ChaCha8Rng::seed_from_u64(5))
        .unwrap();
    assert_eq!(report.dropped, 0);
    assert_eq!(report.refinement, RefinementOutcome::NotRequested);
    assert_eq!(population.crs(), Some("EPSG:3857"));
    assert!(population.is_spatialized());
}

#[test]
fn test_stage_localizes_in_memory_nests() {
    // the reader knows no file; nests come from the request
    let stage = SpatializationStage::new().with_reader(MemoryReader::default());
    let request = SpatialRequest {
        nest_features: Some(GeoFile::new(vec![square("home", 10.0, 10.0, 1.0)]).with_crs("EPSG:2154")),
        ..SpatialRequest::default()
    };
    assert!(request.is_active());
    let mut population = population(&["a"; 4]);

    let report = stage
        .run(&mut population, &request, &Interrupt::none(), &mut ChaCha8Rng::seed_from_u64(11))
        .unwrap();
    assert_eq!(report.dropped, 0);
    assert_eq!(population.crs(), Some("EPSG:2154"));
    assert!(population.entities().iter().all(|e| e.nest() == Some("home")));
}

#[test]
fn test_area_distribution_over_points_draws_uniformly() {
    let points = GeoFile::new(vec![
        Feature::new("p1", Geometry::Point(Point::new(0.0, 0.0))),
        Feature::new("p2", Geometry::Point(Point::new(5.0, 5.0))),
    ]);
    let stage = SpatializationStage::new().with_reader(MemoryReader::default().with("points.geojson", points));
    let request = SpatialRequest {
        nests: Some("points.geojson".into()),
        distribution: SpatialDistributionKind::Area,
        ..SpatialRequest::default()
    };
    let mut population = population(&["a"; 40]);

    let report = stage
        .run(&mut population, &request, &Interrupt::none(), &mut ChaCha8Rng::seed_from_u64(12))
        .unwrap();
    assert_eq!(report.dropped, 0);
    assert_eq!(population.len(), 40);
    let in_first = population
        .entities()
        .iter()
        .filter(|e| e.nest() == Some("p1"))
        .count();
    assert!(in_first > 0 && in_first < 40);
}

#[test]
fn test_stage_keeps_caller_crs() {
    let stage = SpatializationStage::new().with_reader(stage_reader());
    let request = SpatialRequest {
        nests: Some("nests.geojson".into()),
        crs: Some("EPSG:2154".into()),
        ..SpatialRequest::default()
    };
    let mut population = population(&["a"]);
    stage
        .run(&mut population, &request, &Interrupt::none(), &mut ChaCha8Rng::seed_from_u64(6))
        .unwrap();
    assert_eq!(population.crs(), Some("EPSG:2154"));
}

#[test]
fn test_stage_reports_missing_spatial_feature() {
    let stage = SpatializationStage::new().with_reader(stage_reader());
    let request = SpatialRequest {
        nests: Some("nests.geojson".into()),
        constraints: vec![SpatialConstraint::capacity(
            Bound::Feature("rooms".into()),
            None,
            None,
            0,
        )],
        ..SpatialRequest::default()
    };
    let err = stage
        .run(&mut population(&["a"]), &request, &Interrupt::none(), &mut ChaCha8Rng::seed_from_u64(7))
        .unwrap_err();
    match err {
        GenstarError::Configuration(ConfigurationError::MissingSpatialFeature { feature, geometries }) => {
            assert_eq!(feature, "rooms");
            assert_eq!(geometries, vec!["n1".to_string(), "n2".to_string()]);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_stage_requires_feature_for_capacity_distribution() {
    let stage = SpatializationStage::new().with_reader(stage_reader());
    let request = SpatialRequest {
        nests: Some("nests.geojson".into()),
        distribution: SpatialDistributionKind::Capacity,
        ..SpatialRequest::default()
    };
    let err = stage
        .run(&mut population(&["a"]), &request, &Interrupt::none(), &mut ChaCha8Rng::seed_from_u64(8))
        .unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_stage_refines_with_ancillary_covariates() {
    let stage = SpatializationStage::new().with_reader(stage_reader());
    let request = SpatialRequest {
        nests: Some("nests.geojson".into()),
        census: Some("census.geojson".into()),
        distribution: SpatialDistributionKind::Capacity,
        distribution_feature: Some("beds".into()),
        ancillary_files: vec!["landcover.geojson".into()],
        ..SpatialRequest::default()
    };
    let mut population = population(&["a"; 20]);

    let report = stage
        .run(&mut population, &request, &Interrupt::none(), &mut ChaCha8Rng::seed_from_u64(9))
        .unwrap();
    assert!(matches!(report.refinement, RefinementOutcome::Fitted { .. }));
    assert_eq!(population.len(), 20);
}

#[test]
fn test_stage_skips_interrupted_refinement() {
    let stage = SpatializationStage::new().with_reader(stage_reader());
    let request = SpatialRequest {
        nests: Some("nests.geojson".into()),
        census: Some("census.geojson".into()),
        ancillary_files: vec!["landcover.geojson".into()],
        ..SpatialRequest::default()
    };
    let token = CancellationToken::new();
    token.cancel();
    let mut population = population(&["a"; 4]);

    let report = stage
        .run(
            &mut population,
            &request,
            &Interrupt::none().with_token(token),
            &mut ChaCha8Rng::seed_from_u64(10),
        )
        .unwrap();
    assert_eq!(report.refinement, RefinementOutcome::Interrupted);
    assert_eq!(population.len(), 4);
    assert!(population.entities().iter().all(|e| e.location().is_some()));
}

#[test]
fn test_stage_aborts_on_unreadable_covariates() {
    let stage = SpatializationStage::new().with_reader(stage_reader());
    let request = SpatialRequest {
        nests: Some("nests.geojson".into()),
        census: Some("census.geojson".into()),
        ancillary_files: vec!["missing.geojson".into()],
        ..SpatialRequest::default()
    };
    let err = stage
        .run(&mut population(&["a"]), &request, &Interrupt::none(), &mut ChaCha8Rng::seed_from_u64(11))
        .unwrap_err();
    assert!(matches!(err, GenstarError::Geometry { .. }));
}
