//! TRS route definitions

use axum::{routing::get, Router};

use crate::handlers::{
    get_container_zip, get_containerfile, get_descriptor, get_descriptor_relative,
    get_descriptor_v1, get_dockerfile_v1, get_entry_zip, get_files, get_tests, get_tool,
    get_tool_v1, get_version, get_workflow_zip, list_tool_classes, list_tools, list_tools_v1,
    list_versions, service_info, AppState,
};

/// Build the full read-only router: TRS v2, legacy v1, and zip export.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .nest("/ga4gh/trs/v2", v2_routes())
        .nest("/api/ga4gh/v1", v1_routes())
        .merge(zip_routes())
        .with_state(state)
}

fn v2_routes() -> Router<AppState> {
    Router::new()
        .route("/service-info", get(service_info))
        .route("/toolClasses", get(list_tool_classes))
        .route("/tools", get(list_tools))
        .route("/tools/:id", get(get_tool))
        .route("/tools/:id/versions", get(list_versions))
        .route("/tools/:id/versions/:version_id", get(get_version))
        .route(
            "/tools/:id/versions/:version_id/:type/descriptor",
            get(get_descriptor),
        )
        .route(
            "/tools/:id/versions/:version_id/:type/descriptor/*relative_path",
            get(get_descriptor_relative),
        )
        .route("/tools/:id/versions/:version_id/:type/tests", get(get_tests))
        .route("/tools/:id/versions/:version_id/:type/files", get(get_files))
        .route(
            "/tools/:id/versions/:version_id/containerfile",
            get(get_containerfile),
        )
}

fn v1_routes() -> Router<AppState> {
    Router::new()
        .route("/tools", get(list_tools_v1))
        .route("/tools/:id", get(get_tool_v1))
        .route(
            "/tools/:id/versions/:version_id/:type/descriptor",
            get(get_descriptor_v1),
        )
        .route(
            "/tools/:id/versions/:version_id/dockerfile",
            get(get_dockerfile_v1),
        )
}

fn zip_routes() -> Router<AppState> {
    Router::new()
        .route("/entries/:id/zip/:version_id", get(get_entry_zip))
        .route("/workflows/:id/zip/:version_id", get(get_workflow_zip))
        .route("/containers/:id/zip/:version_id", get(get_container_zip))
}
