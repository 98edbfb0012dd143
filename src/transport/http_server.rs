use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::services::ServeDir;

use crate::{
    server::AppState,
    transport::{
        middleware::check_gm_auth,
        routes::{media, scenes},
    },
};

pub fn router(state: Arc<AppState>) -> Router {
    let gm_routes = Router::new()
        .route("/createScene", post(scenes::create_scene))
        .route("/updateScene", post(scenes::update_scene))
        .route("/deleteScene", post(scenes::delete_scene))
        .route("/updateSceneOrder", post(scenes::update_scene_order))
        .route("/upload", post(media::upload))
        .route("/uploadMusic", post(media::upload_music))
        .route("/deleteMusic", post(media::delete_music))
        .layer(middleware::from_fn_with_state(state.clone(), check_gm_auth));

    // Uploaded assets are served statically so broadcast URLs resolve for
    // every client.
    let uploads = ServeDir::new(&state.config.storage.upload_dir);
    let music = ServeDir::new(&state.config.storage.music_dir);

    Router::new()
        .route("/scenes", get(scenes::get_scenes))
        .route("/musicList", get(media::music_list))
        .merge(gm_routes)
        .nest_service("/uploads", uploads)
        .nest_service("/music", music)
        .with_state(state)
}
