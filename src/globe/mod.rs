use bevy::prelude::*;

use crate::{
    geometry::GlobeLoadState,
    settings::{GlobeConfig, srgba},
};

mod mesh;
mod renderer;

pub use mesh::*;
pub use renderer::*;

/// Per-frame order of the globe's systems. Rendering follows in Bevy's own
/// schedules.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlobeSet {
    Load,
    Input,
    Selection,
    React,
    Camera,
}

pub struct GlobePlugin;

impl Plugin for GlobePlugin {
    fn build(&self, app: &mut App) {
        app.configure_sets(
            Update,
            (
                GlobeSet::Load,
                GlobeSet::Input,
                GlobeSet::Selection,
                GlobeSet::React,
                GlobeSet::Camera,
            )
                .chain(),
        )
        .add_systems(Startup, setup_globe)
        .add_systems(OnEnter(GlobeLoadState::Ready), spawn_countries)
        .add_systems(
            Update,
            (start_highlight, animate_highlight)
                .chain()
                .in_set(GlobeSet::React),
        );
    }
}

#[derive(Component)]
pub struct GlobeSphere;

fn setup_globe(
    mut commands: Commands,
    config: Res<GlobeConfig>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let look = &config.look;
    commands.insert_resource(ClearColor(srgba(look.background)));
    commands.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: look.ambient_brightness,
        ..default()
    });

    commands.spawn((
        Mesh3d(meshes.add(Sphere::new(config.globe_radius).mesh().uv(96, 48))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: srgba(look.globe),
            perceptual_roughness: 1.0,
            ..default()
        })),
        Transform::default(),
        GlobeSphere,
    ));
}
