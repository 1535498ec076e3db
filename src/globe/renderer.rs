use std::time::Duration;

use bevy::prelude::*;

use crate::{
    animation::{AnimationSlot, Easing, Tween},
    geometry::GeometryStore,
    selection::{SelectionChanged, SelectionState},
    settings::{GlobeConfig, LookConfig, srgba},
    types::CountryId,
};

use super::build_country_meshes;

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountryMesh {
    pub id: CountryId,
}

/// Tweens for a country's lift above the globe and its fill colour.
#[derive(Component, Default)]
pub struct CountryHighlight {
    pub scale: AnimationSlot<f32>,
    pub color: AnimationSlot<LinearRgba>,
}

pub fn country_look(id: CountryId, selection: SelectionState, look: &LookConfig) -> (f32, LinearRgba) {
    if selection.selected() == Some(id) {
        (
            1.0 + look.selected_altitude,
            srgba(look.polygon_selected).to_linear(),
        )
    } else {
        (1.0 + look.polygon_altitude, srgba(look.polygon).to_linear())
    }
}

pub fn spawn_countries(
    mut commands: Commands,
    store: Res<GeometryStore>,
    config: Res<GlobeConfig>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let look = &config.look;
    let border_material = materials.add(StandardMaterial {
        base_color: srgba(look.border),
        unlit: true,
        ..default()
    });

    let mut drawn = 0;
    for (id, feature) in store.iter() {
        let country = match build_country_meshes(feature, config.globe_radius) {
            Ok(country) => country,
            Err(err) => {
                warn!("{err}");
                continue;
            }
        };
        let (scale, color) = country_look(id, SelectionState::Idle, look);
        let fill_material = materials.add(StandardMaterial {
            base_color: color.into(),
            alpha_mode: AlphaMode::Blend,
            double_sided: true,
            cull_mode: None,
            perceptual_roughness: 0.9,
            ..default()
        });

        commands
            .spawn((
                Mesh3d(meshes.add(country.fill)),
                MeshMaterial3d(fill_material),
                Transform::from_scale(Vec3::splat(scale)),
                CountryMesh { id },
                CountryHighlight::default(),
                Name::new(feature.name.clone()),
            ))
            .with_child((
                Mesh3d(meshes.add(country.border)),
                MeshMaterial3d(border_material.clone()),
            ));
        drawn += 1;
    }
    info!("Drawing {drawn} of {} countries", store.len());
}

/// Restarts every country's highlight tween towards the look of the new
/// selection state.
pub fn start_highlight(
    mut changes: EventReader<SelectionChanged>,
    config: Res<GlobeConfig>,
    materials: Res<Assets<StandardMaterial>>,
    mut query: Query<(
        &CountryMesh,
        &Transform,
        &MeshMaterial3d<StandardMaterial>,
        &mut CountryHighlight,
    )>,
) {
    let Some(change) = changes.read().last() else {
        return;
    };
    let duration = Duration::from_millis(config.look.highlight_duration_ms);

    for (country, transform, material, mut highlight) in &mut query {
        let (scale, color) = country_look(country.id, change.current, &config.look);
        let current_color = materials
            .get(&material.0)
            .map(|m| m.base_color.to_linear())
            .unwrap_or(color);

        if transform.scale.x != scale || highlight.scale.is_active() {
            highlight
                .scale
                .start(Tween::new(transform.scale.x, scale, duration, Easing::Linear));
        }
        if current_color != color || highlight.color.is_active() {
            highlight
                .color
                .start(Tween::new(current_color, color, duration, Easing::Linear));
        }
    }
}

pub fn animate_highlight(
    time: Res<Time>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut query: Query<(
        &mut Transform,
        &MeshMaterial3d<StandardMaterial>,
        &mut CountryHighlight,
    )>,
) {
    for (mut transform, material, mut highlight) in &mut query {
        if let Some(step) = highlight.scale.tick(time.delta()) {
            transform.scale = Vec3::splat(step.value);
        }
        if let Some(step) = highlight.color.tick(time.delta()) {
            if let Some(material) = materials.get_mut(&material.0) {
                material.base_color = step.value.into();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_selected_country_is_raised() {
        let look = LookConfig::default();
        let selection = SelectionState::Selected(CountryId(3));
        let (raised, highlight) = country_look(CountryId(3), selection, &look);
        let (flat, base) = country_look(CountryId(1), selection, &look);
        assert!(raised > flat);
        assert_ne!(highlight, base);
        assert_eq!(country_look(CountryId(3), SelectionState::Idle, &look).0, flat);
    }

    #[test]
    fn highlight_follows_selection_changes() {
        let mut app = App::new();
        app.init_resource::<Assets<StandardMaterial>>()
            .insert_resource(GlobeConfig::default())
            .add_event::<SelectionChanged>()
            .add_systems(Update, start_highlight);

        let look = LookConfig::default();
        let (scale, color) = country_look(CountryId(0), SelectionState::Idle, &look);
        let material = app
            .world_mut()
            .resource_mut::<Assets<StandardMaterial>>()
            .add(StandardMaterial::from(Color::from(color)));
        let entity = app
            .world_mut()
            .spawn((
                CountryMesh { id: CountryId(0) },
                Transform::from_scale(Vec3::splat(scale)),
                MeshMaterial3d(material),
                CountryHighlight::default(),
            ))
            .id();

        app.world_mut().send_event(SelectionChanged {
            previous: SelectionState::Idle,
            current: SelectionState::Selected(CountryId(0)),
        });
        app.update();

        let highlight = app.world().get::<CountryHighlight>(entity).unwrap();
        assert_eq!(highlight.scale.target(), Some(&(1.0 + look.selected_altitude)));
        assert!(highlight.color.is_active());
    }
}
