pub mod autosave;
pub mod model;
pub mod registry;
pub mod store;

pub use model::{MediaType, Scene, SceneSummary, Token, TokenPatch};
pub use registry::SceneRegistry;
pub use store::SceneStore;
