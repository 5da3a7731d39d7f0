pub mod ai;
pub mod animation;
pub mod config;
pub mod error;
pub mod interaction;
pub mod pet;
pub mod physics;
pub mod platform;
pub mod plugin;
pub mod source;
pub mod telemetry;

pub use config::PetConfig;
pub use error::PetError;
pub use pet::Pet;
pub use plugin::PetPlugin;
