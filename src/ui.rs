use std::collections::{BTreeMap, HashMap};

use bevy::prelude::*;
use bevy_egui::{
    EguiContexts, EguiPreUpdateSet,
    egui::{self, Color32, RichText},
};

use crate::{
    arcs::{ArcSet, UpdateArcs, clear_stale_arcs},
    error::{GlobeError, GlobeResult},
    geometry::{GeometryStore, GlobeLoadState},
    globe::GlobeSet,
    selection::{CountrySelected, SelectionMachine, SelectionRequest},
    settings::GlobeConfig,
};

/// Overlay standing in for the page around the globe: a country picker plus
/// canned relationship data pushed as arcs.
pub struct OverlayUiPlugin;

impl Plugin for OverlayUiPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<OverlayState>()
            .add_systems(Startup, load_demo_relationships)
            .add_systems(Update, overlay_ui.after(EguiPreUpdateSet::InitContexts))
            .add_systems(
                Update,
                push_demo_arcs
                    .in_set(GlobeSet::React)
                    .before(clear_stale_arcs)
                    .run_if(in_state(GlobeLoadState::Ready)),
            );
    }
}

/// Source country code to `{ target code: mention count }`.
pub type RelationshipMap = HashMap<String, BTreeMap<String, u32>>;

#[derive(Resource, Default)]
pub struct DemoRelationships(pub RelationshipMap);

#[derive(Resource, Default)]
pub struct OverlayState {
    pub article_context: bool,
    /// Set when the article toggle flips so the arcs are rebuilt.
    pub refresh: bool,
}

pub fn parse_relationships(data: &str) -> GlobeResult<RelationshipMap> {
    serde_json::from_str(data).map_err(GlobeError::from)
}

fn load_demo_relationships(mut commands: Commands, config: Res<GlobeConfig>) {
    let Some(path) = &config.relationships_path else {
        commands.insert_resource(DemoRelationships::default());
        return;
    };
    let relationships = match std::fs::read_to_string(path) {
        Ok(data) => match parse_relationships(&data) {
            Ok(map) => {
                info!("Loaded relationships for {} countries from {path}", map.len());
                map
            }
            Err(err) => {
                warn!("Ignoring relationships file {path}: {err}");
                RelationshipMap::new()
            }
        },
        Err(err) => {
            info!("No relationships file at {path}: {err}");
            RelationshipMap::new()
        }
    };
    commands.insert_resource(DemoRelationships(relationships));
}

fn push_demo_arcs(
    mut selections: EventReader<CountrySelected>,
    mut overlay: ResMut<OverlayState>,
    machine: Res<SelectionMachine>,
    store: Res<GeometryStore>,
    demo: Res<DemoRelationships>,
    mut updates: EventWriter<UpdateArcs>,
) {
    let code = match selections.read().last() {
        Some(selected) => Some(selected.code.clone()),
        None if overlay.refresh => machine
            .state()
            .selected()
            .and_then(|id| store.get(id))
            .map(|feature| feature.code.clone()),
        None => None,
    };
    overlay.refresh = false;

    let Some(code) = code else {
        return;
    };
    let Some(relationships) = demo.0.get(&code) else {
        debug!("No demo relationships for {code}");
        return;
    };
    updates.write(UpdateArcs {
        source_code: code,
        relationships: relationships.clone(),
        is_article_context: overlay.article_context,
    });
}

fn overlay_ui(
    mut contexts: EguiContexts,
    mut overlay: ResMut<OverlayState>,
    load_state: Res<State<GlobeLoadState>>,
    store: Res<GeometryStore>,
    machine: Option<Res<SelectionMachine>>,
    arc_set: Res<ArcSet>,
    mut requests: EventWriter<SelectionRequest>,
) {
    let ctx = contexts.ctx_mut();
    let selected = machine.and_then(|machine| machine.state().selected());

    egui::Window::new("Countries")
        .anchor(egui::Align2::LEFT_TOP, egui::vec2(10.0, 10.0))
        .resizable(false)
        .collapsible(true)
        .show(ctx, |ui| {
            match load_state.get() {
                GlobeLoadState::Loading => {
                    ui.label("Loading boundaries...");
                    return;
                }
                GlobeLoadState::Failed => {
                    ui.label(RichText::new("Boundaries failed to load").color(Color32::RED));
                    return;
                }
                GlobeLoadState::Ready => {}
            }

            let selected_name = selected
                .and_then(|id| store.get(id))
                .map(|feature| feature.name.as_str())
                .unwrap_or("None");

            let mut countries: Vec<_> = store.iter().collect();
            countries.sort_by(|a, b| a.1.name.cmp(&b.1.name));

            egui::ComboBox::from_label("Country")
                .selected_text(selected_name)
                .height(400.0)
                .show_ui(ui, |ui| {
                    for (id, feature) in countries {
                        let label = format!("{} ({})", feature.name, feature.code);
                        if ui.selectable_label(selected == Some(id), label).clicked() {
                            requests.write(SelectionRequest::Select(id));
                        }
                    }
                });

            ui.horizontal(|ui| {
                if ui
                    .add_enabled(selected.is_some(), egui::Button::new("Clear"))
                    .clicked()
                {
                    requests.write(SelectionRequest::Deselect);
                }
                if ui
                    .checkbox(&mut overlay.article_context, "Article context")
                    .changed()
                {
                    overlay.refresh = true;
                }
            });

            ui.label(format!("{} countries, {} arcs", store.len(), arc_set.arcs().len()));
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relationships_parse_into_ordered_maps() {
        let map = parse_relationships(r#"{ "DE": { "FR": 5, "ES": 2 } }"#).unwrap();
        let germany = &map["DE"];
        assert_eq!(germany.keys().collect::<Vec<_>>(), ["ES", "FR"]);
        assert_eq!(germany["FR"], 5);
    }

    #[test]
    fn negative_counts_are_rejected() {
        assert!(matches!(
            parse_relationships(r#"{ "DE": { "FR": -1 } }"#),
            Err(GlobeError::Json(_))
        ));
    }

    #[test]
    fn repo_relationships_parse() {
        let map = parse_relationships(include_str!("../assets/relationships.json")).unwrap();
        assert!(!map.is_empty());
    }
}
