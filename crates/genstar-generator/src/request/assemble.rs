//! Requests from TOML or YAML configuration.

use genstar_config::{AttributeConfig, ConstraintConfig, GenerationConfig};
use genstar_core::{Attribute, AttributeDictionary, ConfigurationError, ValueType};

use super::builder::{mapped_attribute, record_attribute};
use super::GenerationRequestBuilder;
use crate::input::{SurveyFile, SurveyType};
use crate::spatial::Bound;

/// Turns a [`GenerationConfig`] into a request builder.
///
/// Every alias is resolved and every referent checked here, so a faulty
/// configuration file fails before any input is read.
///
/// # Example
///
/// ```
/// use genstar_config::GenerationConfig;
/// use genstar_generator::request::RequestAssembler;
///
/// let config = GenerationConfig::from_toml_str(r#"
///     algorithm = "US"
///
///     [[attributes]]
///     kind = "direct"
///     name = "Sex"
///     values = ["M", "F"]
/// "#).unwrap();
///
/// let request = RequestAssembler::from_config(&config).unwrap().build().unwrap();
/// assert_eq!(request.algorithm_name(), "uniform sampling");
/// assert_eq!(request.attribute_names(), vec!["Sex"]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestAssembler;

impl RequestAssembler {
    pub fn from_config(
        config: &GenerationConfig,
    ) -> Result<GenerationRequestBuilder, ConfigurationError> {
        let mut builder = GenerationRequestBuilder::new().with_ipf(config.ipf);
        if let Some(algorithm) = &config.algorithm {
            builder = builder.with_algorithm(algorithm)?;
        }
        if let Some(seed) = config.seed {
            builder = builder.with_seed(seed);
        }
        if let Some(base_dir) = &config.base_dir {
            builder = builder.with_base_dir(base_dir);
        }

        for file in &config.input_files {
            let survey_type = SurveyType::resolve(&file.survey_type)?;
            builder = builder.add_input_file(
                SurveyFile::new(&file.path, survey_type)
                    .with_separator(file.separator)
                    .with_offsets(file.first_row_index, file.first_column_index),
            );
        }

        for attribute in &config.attributes {
            let attribute = attribute_from_config(attribute, builder.attributes())?;
            builder = builder.add_attribute(attribute)?;
        }
        let empty = AttributeDictionary::new();
        for attribute in &config.household_attributes {
            let attribute =
                attribute_from_config(attribute, builder.household_attributes().unwrap_or(&empty))?;
            builder = builder.add_household_attribute(attribute)?;
        }
        if let Some(key) = &config.household_key {
            builder = builder.with_household_key(key);
        }
        if !config.marginals.is_empty() {
            builder = builder.add_marginals(config.marginals.iter().cloned())?;
        }
        builder = builder.with_co_search(config.co_search);

        if let Some(spatial) = &config.spatial {
            if let Some(nests) = &spatial.nests {
                builder = builder.localize_on_geometries(nests);
            }
            if let Some(census) = &spatial.census {
                builder = builder.localize_on_census(census);
            }
            if let Some(crs) = &spatial.crs {
                builder = builder.with_crs(crs);
            }
            if spatial.min_distance.is_some() || spatial.max_distance.is_some() {
                let min = spatial.min_distance.unwrap_or(0.0);
                let max = spatial.max_distance.unwrap_or(min);
                builder = builder.localize_around_at(min, max, spatial.overlaps)?;
            }
            if let Some(distribution) = &spatial.distribution {
                builder = builder.add_distribution(&distribution.kind, distribution.feature.as_deref())?;
            }
            for constraint in &spatial.constraints {
                builder = match constraint {
                    ConstraintConfig::Capacity(c) => {
                        builder.add_capacity_constraint(bound(c.value, &c.feature)?, c.max, c.step, c.priority)
                    }
                    ConstraintConfig::Density(c) => {
                        builder.add_density_constraint(bound(c.value, &c.feature)?, c.max, c.step, c.priority)
                    }
                    ConstraintConfig::Distance(c) => {
                        builder.add_distance_constraint(c.distance, c.max, c.step, c.priority)
                    }
                };
            }
            if let Some(matcher) = &spatial.spatial_match {
                builder = builder.add_spatial_match(
                    &matcher.attribute,
                    &matcher.census_id,
                    matcher.limit,
                    matcher.step,
                    matcher.priority,
                )?;
            }
            for file in &spatial.ancillary_files {
                builder = builder.add_ancillary_geofile(file);
            }
            if let Some(limit) = spatial.regression_time_limit() {
                builder = builder.with_regression_time_limit(limit);
            }
        }

        for network in &config.networks {
            builder = builder.add_network(&network.name, &network.engine, network.beta, network.k)?;
        }
        Ok(builder)
    }
}

fn attribute_from_config(
    config: &AttributeConfig,
    dictionary: &AttributeDictionary,
) -> Result<Attribute, ConfigurationError> {
    let (attribute, link) = match config {
        AttributeConfig::Direct {
            name,
            value_type,
            values,
            linked_to,
        } => (Attribute::direct(name, *value_type, values)?, linked_to),
        AttributeConfig::Range {
            name,
            values,
            linked_to,
        } => (Attribute::direct(name, ValueType::Range, values)?, linked_to),
        AttributeConfig::Mapped {
            name,
            referent,
            value_type,
            mapping,
            linked_to,
        } => (
            mapped_attribute(dictionary, name.as_deref(), referent, *value_type, mapping.clone())?,
            linked_to,
        ),
        AttributeConfig::Record {
            name,
            referent,
            value_type,
        } => return record_attribute(dictionary, name, referent, *value_type),
    };
    Ok(match link {
        Some(other) => attribute.with_link(other.clone()),
        None => attribute,
    })
}

fn bound(value: Option<f64>, feature: &Option<String>) -> Result<Bound, ConfigurationError> {
    match (feature, value) {
        (Some(feature), _) => Ok(Bound::Feature(feature.clone())),
        (None, Some(value)) => Ok(Bound::Constant(value)),
        (None, None) => Err(ConfigurationError::Invalid(
            "constraint needs a value or a feature".to_string(),
        )),
    }
}
