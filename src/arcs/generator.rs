use std::collections::BTreeMap;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    geometry::GeometryStore,
    types::{CountryId, GeoCoord},
};

/// Tuning for arc altitude and stroke width. Altitudes are fractions of the
/// globe radius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArcSettings {
    pub min_altitude: f32,
    pub max_altitude: f32,
    /// Distance at which arcs stop getting taller.
    pub max_distance_km: f64,
    pub min_stroke: f32,
    pub max_stroke: f32,
    /// Mention count at which the stroke saturates.
    pub max_mentions: u32,
    /// Fixed stroke used when the relationships come from a single article.
    pub article_stroke: f32,
}

impl Default for ArcSettings {
    fn default() -> Self {
        Self {
            min_altitude: 0.1,
            max_altitude: 0.5,
            max_distance_km: 20_000.0,
            min_stroke: 0.2,
            max_stroke: 1.2,
            max_mentions: 50,
            article_stroke: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlobeArc {
    pub target: CountryId,
    pub start: GeoCoord,
    pub end: GeoCoord,
    pub altitude: f32,
    pub stroke_width: f32,
}

pub fn arc_altitude(distance_km: f64, settings: &ArcSettings) -> f32 {
    let (min, max) = (settings.min_altitude, settings.max_altitude);
    if settings.max_distance_km <= 0.0 {
        return max;
    }
    let ratio = (distance_km.max(0.0).min(settings.max_distance_km) / settings.max_distance_km) as f32;
    (min + (max - min) * ratio).clamp(min.min(max), max.max(min))
}

pub fn arc_stroke_width(mentions: u32, is_article_context: bool, settings: &ArcSettings) -> f32 {
    if is_article_context {
        return settings.article_stroke;
    }
    if settings.max_mentions == 0 {
        return settings.max_stroke;
    }
    let ratio = mentions.min(settings.max_mentions) as f32 / settings.max_mentions as f32;
    settings.min_stroke + (settings.max_stroke - settings.min_stroke) * ratio
}

/// One arc per resolvable target. Empty when the source country is unknown.
pub fn generate_arcs(
    store: &GeometryStore,
    source_code: &str,
    relationships: &BTreeMap<String, u32>,
    is_article_context: bool,
    settings: &ArcSettings,
) -> Vec<GlobeArc> {
    let Some(start) = store
        .find_by_code(source_code)
        .and_then(|id| store.centroid(id))
    else {
        debug!("No arcs: source {source_code} has no centroid");
        return Vec::new();
    };

    relationships
        .iter()
        .filter_map(|(code, mentions)| {
            let Some(target) = store.find_by_code(code) else {
                debug!("Skipping arc to unknown country {code}");
                return None;
            };
            let Some(end) = store.centroid(target) else {
                debug!("Skipping arc to {code}: no centroid");
                return None;
            };
            Some(GlobeArc {
                target,
                start,
                end,
                altitude: arc_altitude(start.distance_km(&end), settings),
                stroke_width: arc_stroke_width(*mentions, is_article_context, settings),
            })
        })
        .collect()
}
