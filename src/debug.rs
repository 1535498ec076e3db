use bevy::{
    color::palettes::css::GOLD,
    diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin},
    prelude::*,
};

use crate::{geometry::GeometryStore, selection::SelectionMachine};

pub struct DebugPlugin;

impl Plugin for DebugPlugin {
    fn build(&self, app: &mut App) {
        if cfg!(debug_assertions) {
            app.add_plugins(FrameTimeDiagnosticsPlugin::default())
                .add_systems(Startup, (debug_draw_fps, debug_draw_globe_stats))
                .add_systems(Update, (text_update_fps, text_update_globe_stats));
        }
    }
}

#[derive(Component)]
pub struct FpsText;

#[derive(Component)]
pub struct GlobeStatsText;

fn label(text: &str, top: bool) -> impl Bundle {
    (
        Text::new(text),
        TextFont {
            font_size: 21.0,
            ..default()
        },
        Node {
            position_type: PositionType::Absolute,
            top: if top { Val::Px(5.0) } else { Val::Auto },
            bottom: if top { Val::Auto } else { Val::Px(5.0) },
            right: Val::Px(5.0),
            ..default()
        },
    )
}

fn value_span() -> impl Bundle {
    (
        TextSpan::default(),
        TextFont {
            font_size: 18.0,
            ..default()
        },
        TextColor(GOLD.into()),
    )
}

pub fn debug_draw_fps(mut commands: Commands) {
    commands
        .spawn(label("FPS: ", true))
        .with_child((value_span(), FpsText));
}

pub fn text_update_fps(
    diagnostics: Res<DiagnosticsStore>,
    mut query: Query<&mut TextSpan, With<FpsText>>,
) {
    for mut span in &mut query {
        if let Some(value) = diagnostics
            .get(&FrameTimeDiagnosticsPlugin::FPS)
            .and_then(|fps| fps.smoothed())
        {
            **span = format!("{value:.2}");
        }
    }
}

pub fn debug_draw_globe_stats(mut commands: Commands) {
    commands
        .spawn(label("Countries: ", false))
        .with_child((value_span(), GlobeStatsText));
}

pub fn text_update_globe_stats(
    store: Res<GeometryStore>,
    machine: Option<Res<SelectionMachine>>,
    mut query: Query<&mut TextSpan, With<GlobeStatsText>>,
) {
    let selected = machine
        .and_then(|machine| machine.state().selected())
        .and_then(|id| store.get(id))
        .map(|feature| feature.code.as_str())
        .unwrap_or("-");
    for mut span in &mut query {
        **span = format!("{} (selected {selected})", store.len());
    }
}
