use bevy::asset::AssetPlugin;
use bevy::prelude::*;
use bevy::window::{WindowLevel, WindowMode, WindowPosition, WindowResolution};
use std::path::PathBuf;

use desktop_waifu::config::DEFAULT_CONFIG_PATH;
use desktop_waifu::{PetConfig, PetPlugin};

fn main() -> AppExit {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let mut app = App::new();
    app.add_plugins(
        DefaultPlugins
            .set(AssetPlugin {
                file_path: ".".into(),
                ..default()
            })
            .set(WindowPlugin {
                primary_window: Some(Window {
                    title: "desktop-waifu".into(),
                    name: Some("desktop-waifu".into()),
                    resolution: WindowResolution::new(150., 200.), // resized once the config is applied
                    resizable: false,
                    decorations: false,
                    transparent: true,
                    window_level: WindowLevel::AlwaysOnTop,
                    position: WindowPosition::Centered(MonitorSelection::Primary),
                    mode: WindowMode::Windowed,
                    ..default()
                }),
                ..default()
            }),
    );

    // Config is read after DefaultPlugins so load messages reach the log.
    let config = PetConfig::load(&config_path);
    app.insert_resource(ClearColor(Color::srgba(0.0, 0.0, 0.0, 0.0)))
        .add_plugins(PetPlugin { config });
    app.run()
}
