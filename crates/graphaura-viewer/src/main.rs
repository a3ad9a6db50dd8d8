mod app;
mod graph;
mod net;
mod render;
mod ui;
mod util;

use bevy::prelude::*;
use bevy_egui::EguiPlugin;

use crate::app::GraphAuraPlugin;
use crate::render::capability::{probe, RenderCapability};
use crate::render::fallback::run_headless;

fn main() {
    let adapter = match probe() {
        RenderCapability::Available(adapter) => adapter,
        RenderCapability::Unavailable(reason) => {
            if let Err(e) = run_headless(&reason) {
                eprintln!("graphaura: {e:#}");
                std::process::exit(1);
            }
            return;
        }
    };

    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "GraphAura".into(),
                ..default()
            }),
            ..default()
        }))
        .add_plugins(EguiPlugin)
        .add_plugins(GraphAuraPlugin { adapter })
        .run();
}
