use std::collections::BTreeMap;
use std::path::PathBuf;

use approx::assert_relative_eq;
use genstar_core::{Attribute, AttributeDictionary, GenstarError, ValueType};

use super::*;
use crate::input::{DataTable, SurveyType};

fn dictionary() -> AttributeDictionary {
    AttributeDictionary::new()
        .with(Attribute::direct("Sex", ValueType::Nominal, ["M", "F"]).unwrap())
        .unwrap()
        .with(Attribute::direct("Age", ValueType::Range, ["0-18", "19-64", "65+"]).unwrap())
        .unwrap()
        .with(Attribute::direct("Work", ValueType::Boolean, ["true", "false"]).unwrap())
        .unwrap()
}

fn table(survey_type: SurveyType, dims: &[&str], cells: Vec<(Vec<usize>, f64)>) -> DataTable {
    DataTable {
        source: PathBuf::from(format!("{}.csv", dims.join("_"))),
        survey_type,
        dimensions: dims.iter().map(|d| d.to_string()).collect(),
        cells: cells.into_iter().collect(),
    }
}

#[test]
fn test_single_table_is_normalized() {
    let t = table(
        SurveyType::ContingencyTable,
        &["Sex", "Age"],
        vec![(vec![0, 0], 100.0), (vec![0, 1], 300.0), (vec![1, 0], 100.0), (vec![1, 2], 500.0)],
    );
    let d = TableCollapser::new().collapse(&[t], &dictionary()).unwrap();
    assert_eq!(d.dimensions().len(), 2);
    assert_relative_eq!(d.probability(&[1, 2]), 0.5);
    assert_relative_eq!(d.marginal(0)[0], 0.4);
    assert_relative_eq!(d.cells().values().sum::<f64>(), 1.0);
}

#[test]
fn test_chained_tables_condition_on_shared_dimension() {
    let sex_age = table(
        SurveyType::ContingencyTable,
        &["Sex", "Age"],
        vec![(vec![0, 1], 50.0), (vec![1, 1], 50.0)],
    );
    let sex_work = table(
        SurveyType::ContingencyTable,
        &["Sex", "Work"],
        vec![(vec![0, 0], 40.0), (vec![0, 1], 10.0), (vec![1, 0], 25.0), (vec![1, 1], 25.0)],
    );
    let d = TableCollapser::new()
        .collapse(&[sex_age, sex_work], &dictionary())
        .unwrap();
    assert_eq!(d.position("Work"), Some(2));
    assert_relative_eq!(d.probability(&[0, 1, 0]), 0.4);
    assert_relative_eq!(d.probability(&[1, 1, 1]), 0.25);
}

#[test]
fn test_local_table_conditions_on_first_dimension() {
    let sex = table(
        SurveyType::GlobalFrequencyTable,
        &["Sex"],
        vec![(vec![0], 0.5), (vec![1], 0.5)],
    );
    let local = table(
        SurveyType::LocalFrequencyTable,
        &["Sex", "Age"],
        vec![(vec![0, 0], 1.0), (vec![1, 0], 1.0), (vec![1, 2], 3.0)],
    );
    // Local tables are applied last whatever their declaration order.
    let d = TableCollapser::new()
        .collapse(&[local, sex], &dictionary())
        .unwrap();
    assert_relative_eq!(d.probability(&[0, 0]), 0.5);
    assert_relative_eq!(d.probability(&[1, 2]), 0.375);
}

#[test]
fn test_local_table_without_prior_dimension_fails() {
    let local = table(
        SurveyType::LocalFrequencyTable,
        &["Sex", "Age"],
        vec![(vec![0, 0], 1.0)],
    );
    let err = TableCollapser::new().collapse(&[local], &dictionary()).unwrap_err();
    assert!(matches!(err, GenstarError::Distribution(_)));
}

#[test]
fn test_inconsistent_control_totals() {
    let a = table(SurveyType::ContingencyTable, &["Sex"], vec![(vec![0], 500.0), (vec![1], 500.0)]);
    let b = table(
        SurveyType::ContingencyTable,
        &["Sex", "Age"],
        vec![(vec![0, 0], 600.0), (vec![1, 0], 600.0)],
    );
    let err = TableCollapser::new().collapse(&[a, b], &dictionary()).unwrap_err();
    assert!(err.to_string().contains("inconsistent control totals"));
}

#[test]
fn test_totals_within_tolerance_are_accepted() {
    let a = table(SurveyType::ContingencyTable, &["Sex"], vec![(vec![0], 500.0), (vec![1], 500.0)]);
    let b = table(
        SurveyType::ContingencyTable,
        &["Sex", "Age"],
        vec![(vec![0, 0], 503.0), (vec![1, 0], 502.0)],
    );
    assert!(TableCollapser::new().collapse(&[a, b], &dictionary()).is_ok());
}

#[test]
fn test_malformed_tables() {
    let collapser = TableCollapser::new();
    let dictionary = dictionary();
    assert!(collapser.collapse(&[], &dictionary).is_err());

    let empty = table(SurveyType::ContingencyTable, &["Sex"], vec![]);
    assert!(collapser.collapse(&[empty], &dictionary).is_err());

    let negative = table(SurveyType::ContingencyTable, &["Sex"], vec![(vec![0], -1.0), (vec![1], 5.0)]);
    assert!(collapser.collapse(&[negative], &dictionary).is_err());

    let zero = table(SurveyType::ContingencyTable, &["Sex"], vec![(vec![0], 0.0)]);
    assert!(collapser.collapse(&[zero], &dictionary).is_err());
}

#[test]
fn test_values_of_cell() {
    let d = Distribution::new(
        vec![dictionary().get("Sex").cloned().unwrap()],
        BTreeMap::from([(vec![1], 2.0)]),
    )
    .unwrap();
    let values = d.values_of(&[1]);
    assert_eq!(values.get("Sex").map(|v| v.label()), Some("F".to_string()));
}
