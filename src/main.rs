use bevy::{
    log::LogPlugin,
    prelude::*,
    winit::{UpdateMode, WinitSettings},
};

use arcs::ArcPlugin;
use bevy_egui::EguiPlugin;
use camera::CameraSystemPlugin;
use debug::DebugPlugin;
use geometry::GeometryPlugin;
use globe::GlobePlugin;
use interaction::InteractionSystemPlugin;
use settings::SettingsPlugin;
use ui::OverlayUiPlugin;

pub mod animation;
pub mod arcs;
pub mod camera;
pub mod debug;
pub mod error;
pub mod geometry;
pub mod globe;
pub mod interaction;
pub mod selection;
pub mod settings;
pub mod types;
pub mod ui;

fn main() {
    App::new()
        .add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "News Globe".to_string(),
                        ..Default::default()
                    }),
                    ..Default::default()
                })
                .set(LogPlugin {
                    filter: "info,wgpu=error,naga=warn,news_globe=debug".to_string(),
                    ..Default::default()
                }),
        )
        // Config first: every other plugin reads it during startup.
        .add_plugins(SettingsPlugin)
        .add_plugins(DebugPlugin)
        .add_plugins(EguiPlugin {
            enable_multipass_for_primary_context: false,
        })
        .insert_resource(EguiBlockInputState::default())
        .insert_resource(WinitSettings {
            unfocused_mode: UpdateMode::Reactive {
                wait: std::time::Duration::from_secs(1),
                react_to_device_events: true,
                react_to_user_events: true,
                react_to_window_events: true,
            },
            ..Default::default()
        })
        .add_plugins((
            GlobePlugin,
            GeometryPlugin,
            InteractionSystemPlugin,
            CameraSystemPlugin,
            ArcPlugin,
            OverlayUiPlugin,
        ))
        .add_systems(Update, absorb_egui_inputs.before(globe::GlobeSet::Input))
        .run();
}

#[derive(Resource, Default)]
pub struct EguiBlockInputState {
    pub block_input: bool,
}

fn absorb_egui_inputs(
    mut contexts: bevy_egui::EguiContexts,
    mut state: ResMut<EguiBlockInputState>,
) {
    let ctx = contexts.ctx_mut();
    let block_input = ctx.wants_pointer_input() || ctx.is_pointer_over_area();
    if state.block_input != block_input {
        state.block_input = block_input;
    }
}
