pub mod media;
pub mod scenes;
