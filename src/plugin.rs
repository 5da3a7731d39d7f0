//! Bevy host: a transparent always-on-top window that follows the pet
//! around the desktop.

use bevy::input::mouse::MouseMotion;
use bevy::prelude::*;
use bevy::window::{PrimaryWindow, WindowPosition};
use bevy::winit::WinitWindows;

use crate::animation::SheetLayout;
use crate::config::PetConfig;
use crate::pet::Pet;
use crate::platform::Monitor;
use crate::source::StaticSource;
use crate::telemetry::LogSink;

pub struct PetPlugin {
    pub config: PetConfig,
}

#[derive(Resource)]
struct SheetInfo {
    layout: SheetLayout,
    atlas_layout: Handle<TextureAtlasLayout>,
    texture: Handle<Image>,
    frame_size: Vec2,
    ready: bool,
}

#[derive(Component)]
struct PetSprite;

/// Screen-space pointer used for dragging. Over our window it is the OS
/// window origin plus the cursor; after a fast drag leaves the window it
/// is carried along by raw mouse motion until the window catches up.
#[derive(Resource, Default, Debug)]
struct PointerTracker {
    last: Option<Vec2>,
}

impl PointerTracker {
    fn locate(&mut self, origin: Option<Vec2>, cursor: Option<Vec2>, motion: Vec2) -> Option<Vec2> {
        let pointer = match (origin, cursor) {
            (Some(origin), Some(cursor)) => origin + cursor,
            _ => self.last? + motion,
        };
        self.last = Some(pointer);
        Some(pointer)
    }

    fn forget(&mut self) {
        self.last = None;
    }
}

impl Plugin for PetPlugin {
    fn build(&self, app: &mut App) {
        let layout = match self
            .config
            .validate()
            .and_then(|_| SheetLayout::from_config(&self.config.animation))
        {
            Ok(layout) => layout,
            Err(e) => {
                error!("Invalid pet configuration: {e}");
                app.add_systems(Startup, |mut exit: EventWriter<AppExit>| {
                    exit.send(AppExit::error());
                });
                return;
            }
        };
        app.insert_resource(self.config.clone())
            .insert_resource(SheetInfo {
                layout,
                atlas_layout: Handle::default(),
                texture: Handle::default(),
                frame_size: Vec2::ZERO,
                ready: false,
            })
            .init_resource::<PointerTracker>()
            .insert_resource(Time::<Fixed>::from_hz(self.config.jump.fps as f64))
            .add_systems(Startup, (setup_camera, load_assets, spawn_sprite).chain())
            .add_systems(Update, finalize_after_load)
            .add_systems(
                Update,
                (handle_pointer, apply_frame).run_if(resource_exists::<Pet>),
            )
            .add_systems(FixedUpdate, tick_pet.run_if(resource_exists::<Pet>));
    }
}

fn setup_camera(mut commands: Commands) {
    commands.spawn(Camera2dBundle::default());
}

fn load_assets(
    asset_server: Res<AssetServer>,
    config: Res<PetConfig>,
    mut layouts: ResMut<Assets<TextureAtlasLayout>>,
    mut sheet: ResMut<SheetInfo>,
) {
    sheet.texture = asset_server.load(config.animation.sheet.clone());
    // Placeholder cell size until the image is decoded.
    let layout = TextureAtlasLayout::from_grid(
        UVec2::ONE,
        sheet.layout.columns as u32,
        sheet.layout.row_count() as u32,
        None,
        None,
    );
    sheet.atlas_layout = layouts.add(layout);
}

fn spawn_sprite(mut commands: Commands, sheet: Res<SheetInfo>) {
    commands.spawn((
        SpriteBundle {
            texture: sheet.texture.clone(),
            ..default()
        },
        TextureAtlas {
            layout: sheet.atlas_layout.clone(),
            index: 0,
        },
        PetSprite,
    ));
}

/// Once the sheet is loaded: slice the atlas, size the window to the pet,
/// read the monitor layout and start the simulation.
#[allow(clippy::too_many_arguments)]
fn finalize_after_load(
    mut commands: Commands,
    mut sheet: ResMut<SheetInfo>,
    config: Res<PetConfig>,
    images: Res<Assets<Image>>,
    mut layouts: ResMut<Assets<TextureAtlasLayout>>,
    mut windows: Query<(Entity, &mut Window), With<PrimaryWindow>>,
    winit_windows: NonSend<WinitWindows>,
    mut exit: EventWriter<AppExit>,
) {
    if sheet.ready {
        return;
    }
    let Some(img) = images.get(&sheet.texture) else {
        return;
    };

    let columns = sheet.layout.columns as u32;
    let rows = sheet.layout.row_count() as u32;
    let frame = UVec2::new(img.width() / columns, img.height() / rows.max(1));
    sheet.frame_size = frame.as_vec2();
    if let Some(layout) = layouts.get_mut(&sheet.atlas_layout) {
        *layout = TextureAtlasLayout::from_grid(frame, columns, rows, None, None);
    }

    let mut monitors = Vec::new();
    if let Ok((entity, mut win)) = windows.get_single_mut() {
        win.resolution.set(config.width, config.height);
        if let Some(raw_win) = winit_windows.get_window(entity) {
            let primary = raw_win.primary_monitor();
            for handle in raw_win.available_monitors() {
                let pos = handle.position();
                let size = handle.size();
                monitors.push(Monitor {
                    x: pos.x as f32,
                    y: pos.y as f32,
                    width: size.width as f32,
                    height: size.height as f32,
                    is_primary: primary.as_ref() == Some(&handle),
                });
            }
        }
    }
    info!("Found {} monitor(s)", monitors.len());

    let source = StaticSource::from_monitors(monitors);
    match Pet::new(&config, Box::new(source), Box::new(LogSink)) {
        Ok(pet) => {
            commands.insert_resource(pet);
        }
        Err(e) => {
            error!("Failed to start pet: {e}");
            exit.send(AppExit::error());
        }
    }
    sheet.ready = true;
}

/// Mouse drag. The window only moves to the pet's position at the end of
/// the frame, so the cursor is measured against where the OS says the
/// window is right now.
fn handle_pointer(
    buttons: Res<ButtonInput<MouseButton>>,
    windows: Query<(Entity, &Window), With<PrimaryWindow>>,
    winit_windows: NonSend<WinitWindows>,
    mut motion: EventReader<MouseMotion>,
    mut tracker: ResMut<PointerTracker>,
    mut pet: ResMut<Pet>,
) {
    let moved: Vec2 = motion.read().map(|m| m.delta).sum();
    let Ok((entity, win)) = windows.get_single() else {
        return;
    };
    let origin = winit_windows
        .get_window(entity)
        .and_then(|raw_win| raw_win.inner_position().ok())
        .map(|pos| Vec2::new(pos.x as f32, pos.y as f32));
    let cursor = win.physical_cursor_position();
    if cursor.is_none() && !pet.is_dragging() {
        tracker.forget();
    }

    if let Some(pointer) = tracker.locate(origin, cursor, moved) {
        if buttons.just_pressed(MouseButton::Left) {
            pet.press(pointer);
        }
        if pet.is_dragging() {
            pet.drag_to(pointer);
        }
    }
    if buttons.just_released(MouseButton::Left) {
        pet.release();
    }
}

fn tick_pet(
    time: Res<Time>,
    mut pet: ResMut<Pet>,
    mut windows: Query<&mut Window, With<PrimaryWindow>>,
) {
    let pos = pet.tick(time.delta_seconds());
    if let Ok(mut win) = windows.get_single_mut() {
        win.position = WindowPosition::At(pos.round().as_ivec2());
    }
}

fn apply_frame(
    pet: Res<Pet>,
    sheet: Res<SheetInfo>,
    config: Res<PetConfig>,
    mut q: Query<(&mut TextureAtlas, &mut Transform), With<PetSprite>>,
) {
    if sheet.frame_size.x <= 0.0 || sheet.frame_size.y <= 0.0 {
        return;
    }
    let frame = pet.frame();
    let scale = Vec2::new(config.width, config.height) / sheet.frame_size;
    for (mut atlas, mut tf) in &mut q {
        atlas.index = frame.atlas_index;
        let sx = if frame.flip_x { -scale.x } else { scale.x };
        tf.scale = Vec3::new(sx, scale.y, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StaticSource;
    use crate::telemetry::NullSink;

    #[test]
    fn drag_follows_pointer_while_window_lags_a_frame() {
        let mut pet = Pet::seeded(
            &PetConfig::default(),
            Box::new(StaticSource::new(vec![])),
            Box::new(NullSink),
            1,
        )
        .unwrap();
        let mut tracker = PointerTracker::default();
        let grip = Vec2::new(20.0, 30.0);
        let step = Vec2::new(12.0, -4.0);

        // The OS window is wherever the previous frame left it.
        let mut window = pet.position();
        let mut global = window + grip;
        let pointer = tracker.locate(Some(window), Some(global - window), Vec2::ZERO);
        assert!(pet.press(pointer.unwrap()));

        for _ in 0..10 {
            global += step;
            let pointer = tracker.locate(Some(window), Some(global - window), step);
            pet.drag_to(pointer.unwrap());
            assert_eq!(pet.position(), global - grip);
            window = pet.position();
        }

        pet.release();
        assert_eq!(pet.body().velocity, step * 0.25);
    }

    #[test]
    fn pointer_outside_window_moves_by_raw_motion() {
        let mut tracker = PointerTracker::default();
        assert_eq!(tracker.locate(None, None, Vec2::ONE), None);

        let origin = Vec2::new(100.0, 100.0);
        let inside = tracker.locate(Some(origin), Some(Vec2::new(5.0, 5.0)), Vec2::ZERO);
        assert_eq!(inside, Some(Vec2::new(105.0, 105.0)));
        let outside = tracker.locate(Some(origin), None, Vec2::new(300.0, -10.0));
        assert_eq!(outside, Some(Vec2::new(405.0, 95.0)));

        tracker.forget();
        assert_eq!(tracker.locate(Some(origin), None, Vec2::ONE), None);
    }
}
