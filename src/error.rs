use thiserror::Error;

#[derive(Debug, Error)]
pub enum GlobeError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to fetch geometry: {0}")]
    Http(#[from] ureq::Error),
    #[error("invalid GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("geometry source is not a FeatureCollection")]
    NotFeatureCollection,
    #[error("could not tessellate {code}: {reason}")]
    Tessellation { code: String, reason: String },
}

pub type GlobeResult<T> = Result<T, GlobeError>;
