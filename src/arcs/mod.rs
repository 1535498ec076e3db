use std::collections::BTreeMap;

use bevy::prelude::*;

use crate::{
    geometry::{GeometryStore, GlobeLoadState},
    globe::GlobeSet,
    selection::{SelectionChanged, SelectionState},
    settings::GlobeConfig,
};

mod generator;
mod renderer;

pub use generator::*;
pub use renderer::*;

/// Request to replace the arc set with arcs from `source_code` to every
/// related country.
#[derive(Event, Debug, Clone, PartialEq, Eq)]
pub struct UpdateArcs {
    pub source_code: String,
    pub relationships: BTreeMap<String, u32>,
    pub is_article_context: bool,
}

/// The arcs currently drawn. Replaced as a whole, never edited in place.
#[derive(Resource, Default, Debug)]
pub struct ArcSet {
    source: Option<String>,
    arcs: Vec<GlobeArc>,
}

impl ArcSet {
    pub fn replace(&mut self, source: String, arcs: Vec<GlobeArc>) {
        self.source = Some(source);
        self.arcs = arcs;
    }

    pub fn clear(&mut self) {
        self.source = None;
        self.arcs.clear();
    }

    pub fn arcs(&self) -> &[GlobeArc] {
        &self.arcs
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}

/// Drops arcs that no longer belong to the selection.
pub fn clear_stale_arcs(
    mut changes: EventReader<SelectionChanged>,
    mut arc_set: ResMut<ArcSet>,
    store: Res<GeometryStore>,
) {
    let Some(change) = changes.read().last() else {
        return;
    };
    let keep = match change.current {
        SelectionState::Idle => false,
        SelectionState::Selected(id) => {
            let code = store.get(id).map(|feature| feature.code.as_str());
            arc_set.source().is_some() && arc_set.source() == code
        }
    };
    if !keep && arc_set.source().is_some() {
        arc_set.clear();
    }
}

pub fn handle_update_arcs(
    mut requests: EventReader<UpdateArcs>,
    mut arc_set: ResMut<ArcSet>,
    store: Res<GeometryStore>,
    config: Res<GlobeConfig>,
) {
    for request in requests.read() {
        let arcs = generate_arcs(
            &store,
            &request.source_code,
            &request.relationships,
            request.is_article_context,
            &config.arcs,
        );
        info!(
            "{} arcs from {} ({} relationships)",
            arcs.len(),
            request.source_code,
            request.relationships.len()
        );
        arc_set.replace(request.source_code.clone(), arcs);
    }
}

pub struct ArcPlugin;

impl Plugin for ArcPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ArcSet>()
            .add_event::<UpdateArcs>()
            .add_systems(Startup, setup_arc_material)
            .add_systems(
                Update,
                (clear_stale_arcs, handle_update_arcs, respawn_arcs)
                    .chain()
                    .in_set(GlobeSet::React)
                    .run_if(not(in_state(GlobeLoadState::Loading))),
            );
    }
}
