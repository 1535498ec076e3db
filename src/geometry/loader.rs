use std::{
    fs::File,
    io::{BufReader, Read},
    time::Duration,
};

use bevy::prelude::*;
use geojson::{GeoJson, PolygonType, Position};
use serde::{Deserialize, Serialize};
use ureq::Agent;

use crate::{
    error::{GlobeError, GlobeResult},
    types::{CountryFeature, CountryGeometry},
};

/// Upper bound on a downloaded boundary file.
const MAX_BODY_BYTES: u64 = 128 * 1024 * 1024;
/// Natural Earth marks countries without an assigned code this way.
const MISSING_CODE: &str = "-99";

/// Property names tried, in order, for the code and display name of a feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyKeys {
    pub code: Vec<String>,
    pub name: Vec<String>,
}

impl Default for PropertyKeys {
    fn default() -> Self {
        Self {
            code: vec!["ISO_A2".into(), "iso_a2".into(), "ISO_A2_EH".into()],
            name: vec!["ADMIN".into(), "NAME".into(), "name".into()],
        }
    }
}

/// Reads the boundary file from disk, or over http when `source` is a URL.
pub fn read_source(source: &str) -> GlobeResult<String> {
    if source.starts_with("http://") || source.starts_with("https://") {
        let config = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(30)))
            .build();
        let agent: Agent = config.into();
        let mut response = agent.get(source).call()?;
        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_BYTES)
            .read_to_string()?;
        Ok(body)
    } else {
        let file = File::open(source).map_err(|source_err| GlobeError::Io {
            path: source.to_string(),
            source: source_err,
        })?;
        let mut reader = BufReader::new(file);
        let mut body = String::new();
        reader
            .read_to_string(&mut body)
            .map_err(|source_err| GlobeError::Io {
                path: source.to_string(),
                source: source_err,
            })?;
        Ok(body)
    }
}

pub fn load_countries(source: &str, keys: &PropertyKeys) -> GlobeResult<Vec<CountryFeature>> {
    let data = read_source(source)?;
    parse_countries(&data, keys)
}

/// Parses a FeatureCollection into country features.
///
/// Features without geometry, or whose geometry is neither `Polygon` nor
/// `MultiPolygon`, are logged and skipped.
pub fn parse_countries(data: &str, keys: &PropertyKeys) -> GlobeResult<Vec<CountryFeature>> {
    let geojson = data.parse::<GeoJson>()?;
    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(GlobeError::NotFeatureCollection);
    };

    let mut features = Vec::with_capacity(collection.features.len());
    for (index, feature) in collection.features.into_iter().enumerate() {
        let properties = feature.properties.unwrap_or_default();
        let code = first_property(&properties, &keys.code).unwrap_or_default();
        let name = first_property(&properties, &keys.name).unwrap_or_else(|| code.clone());

        let Some(geometry) = feature.geometry else {
            warn!("Feature #{index} ({name}) has no geometry, skipping");
            continue;
        };

        let geometry = match geometry.value {
            geojson::Value::Polygon(rings) => match to_polygon(&rings) {
                Some(polygon) => CountryGeometry::Polygon(polygon),
                None => {
                    warn!("Feature #{index} ({name}) has an empty polygon, skipping");
                    continue;
                }
            },
            geojson::Value::MultiPolygon(parts) => {
                let polygons: Vec<geo::Polygon<f64>> =
                    parts.iter().filter_map(|rings| to_polygon(rings)).collect();
                if polygons.is_empty() {
                    warn!("Feature #{index} ({name}) has an empty multipolygon, skipping");
                    continue;
                }
                CountryGeometry::MultiPolygon(geo::MultiPolygon(polygons))
            }
            other => {
                warn!(
                    "Feature #{index} ({name}) has unsupported geometry type {}, skipping",
                    geometry_type(&other)
                );
                continue;
            }
        };

        features.push(CountryFeature {
            code,
            name,
            properties,
            geometry,
        });
    }

    Ok(features)
}

fn geometry_type(value: &geojson::Value) -> &'static str {
    match value {
        geojson::Value::Point(_) => "Point",
        geojson::Value::MultiPoint(_) => "MultiPoint",
        geojson::Value::LineString(_) => "LineString",
        geojson::Value::MultiLineString(_) => "MultiLineString",
        geojson::Value::Polygon(_) => "Polygon",
        geojson::Value::MultiPolygon(_) => "MultiPolygon",
        geojson::Value::GeometryCollection(_) => "GeometryCollection",
    }
}

fn first_property(
    properties: &serde_json::Map<String, serde_json::Value>,
    keys: &[String],
) -> Option<String> {
    keys.iter()
        .filter_map(|key| properties.get(key))
        .filter_map(|value| value.as_str())
        .find(|value| !value.is_empty() && *value != MISSING_CODE)
        .map(str::to_string)
}

fn to_ring(positions: &[Position]) -> geo::LineString<f64> {
    geo::LineString(
        positions
            .iter()
            .filter_map(|p| match (p.first(), p.get(1)) {
                (Some(&x), Some(&y)) => Some(geo::Coord { x, y }),
                _ => None,
            })
            .collect(),
    )
}

fn to_polygon(rings: &PolygonType) -> Option<geo::Polygon<f64>> {
    let (exterior, interiors) = rings.split_first()?;
    let exterior = to_ring(exterior);
    if exterior.0.is_empty() {
        return None;
    }
    Some(geo::Polygon::new(
        exterior,
        interiors.iter().map(|ring| to_ring(ring)).collect(),
    ))
}
