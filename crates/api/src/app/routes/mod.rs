use axum::{Router, routing::get};

pub mod alerts;
pub mod assemblies;
pub mod bom;
pub mod parts;
pub mod system;

/// Router for every endpoint except `/health`.
pub fn router() -> Router {
    Router::new()
        .nest("/parts", parts::router())
        .nest("/bom", bom::router())
        .nest("/assemblies", assemblies::router())
        .nest("/alerts", alerts::router())
        .route("/", get(system::index))
}
