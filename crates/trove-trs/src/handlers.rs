//! TRS request handlers

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument};
use trove_core::{Entry, EntryClass, Version};
use trove_service::ServiceRegistry;
use trove_store::EntryQuery;

use crate::{
    adapter,
    error::{ApiError, ApiResult},
    model::{FileWrapper, ServiceInfo, Tool, ToolClass, ToolFile, ToolVersion},
    zip::archive_version,
};

/// Header carrying the authenticated subject, set by the deployment's
/// auth layer in front of this service.
pub const SUBJECT_HEADER: &str = "x-trove-subject";

/// Default page size for `/tools`.
const DEFAULT_PAGE_LIMIT: usize = 1000;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Service registry
    pub services: Arc<ServiceRegistry>,
    /// External base URL of the TRS v2 surface, used in self-links
    pub base_url: String,
}

impl AppState {
    pub fn new(services: ServiceRegistry, base_url: impl Into<String>) -> Self {
        Self {
            services: Arc::new(services),
            base_url: base_url.into(),
        }
    }
}

fn subject(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SUBJECT_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Resolve a TRS id (already percent-decoded by routing) to a published
/// entry. Unpublished entries are invisible on this surface.
async fn resolve_tool(state: &AppState, id: &str) -> ApiResult<Entry> {
    let (class, path) = match id.strip_prefix("#workflow/") {
        Some(rest) => (EntryClass::Workflow, rest),
        None => (EntryClass::Tool, id),
    };
    let entry = state
        .services
        .store
        .find_by_path(class, path)
        .await?
        .filter(|e| e.published)
        .ok_or_else(|| ApiError::not_found(format!("Tool {id} not found")))?;
    Ok(entry)
}

fn resolve_version<'a>(entry: &'a Entry, version_id: &str) -> ApiResult<&'a Version> {
    entry
        .find_version(version_id)
        .filter(|v| !v.hidden)
        .ok_or_else(|| {
            ApiError::not_found(format!(
                "Version {version_id} not found on {}",
                entry.full_path()
            ))
        })
}

/// Parse a descriptor type path token. `PLAIN_` variants request raw text
/// bodies. The token must match the entry's descriptor language.
fn check_descriptor_type(entry: &Entry, token: &str) -> ApiResult<bool> {
    let (plain, bare) = match token.strip_prefix("PLAIN_") {
        Some(rest) => (true, rest),
        None => (false, token),
    };
    if bare != entry.descriptor_type.trs_token() {
        return Err(ApiError::not_found(format!(
            "Descriptor type {token} not available on {}",
            entry.full_path()
        )));
    }
    Ok(plain)
}

async fn checker_entry(state: &AppState, entry: &Entry) -> ApiResult<Option<Entry>> {
    match entry.checker_id {
        Some(id) => Ok(state.services.store.find_by_id(&id).await?),
        None => Ok(None),
    }
}

// ============================================================================
// TRS v2 handlers
// ============================================================================

/// Query parameters for `/tools`
#[derive(Debug, Default, Deserialize)]
pub struct ToolsQuery {
    #[serde(rename = "toolClass")]
    pub tool_class: Option<String>,
    pub organization: Option<String>,
    pub name: Option<String>,
    pub toolname: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub checker: Option<bool>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

#[instrument(skip(state))]
pub async fn list_tools(
    State(state): State<AppState>,
    Query(params): Query<ToolsQuery>,
) -> ApiResult<Response> {
    let mut query = EntryQuery::published();
    query.organization = params.organization;
    query.name = params.name;
    query.tool_name = params.toolname;
    query.description = params.description;
    query.author = params.author;
    query.checker = params.checker;
    if let Some(tool_class) = params.tool_class.as_deref() {
        query.class = Some(match tool_class {
            "CommandLineTool" => EntryClass::Tool,
            "Workflow" => EntryClass::Workflow,
            other => {
                return Err(ApiError::bad_request(format!("Unknown tool class {other}")))
            }
        });
    }

    let entries = state.services.store.list(&query).await?;
    // checker workflows ride along on their base entry, never standalone
    let listed: Vec<Entry> = entries.into_iter().filter(|e| !e.is_checker()).collect();

    let offset = params.offset.unwrap_or(0);
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    let total = listed.len();
    let page = listed.into_iter().skip(offset).take(limit);

    let mut tools = Vec::new();
    for entry in page {
        let checker = checker_entry(&state, &entry).await?;
        tools.push(adapter::tool(&state.base_url, &entry, checker.as_ref()));
    }
    debug!(total, returned = tools.len(), "listed tools");

    let mut headers = HeaderMap::new();
    headers.insert("x-total-count", HeaderValue::from(total as u64));
    headers.insert("x-offset", HeaderValue::from(offset as u64));
    headers.insert("x-limit", HeaderValue::from(limit as u64));
    Ok((headers, Json(tools)).into_response())
}

#[instrument(skip(state))]
pub async fn get_tool(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Tool>> {
    let entry = resolve_tool(&state, &id).await?;
    let checker = checker_entry(&state, &entry).await?;
    Ok(Json(adapter::tool(&state.base_url, &entry, checker.as_ref())))
}

#[instrument(skip(state))]
pub async fn list_versions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<ToolVersion>>> {
    let entry = resolve_tool(&state, &id).await?;
    let versions = entry
        .versions
        .iter()
        .filter(|v| !v.hidden)
        .map(|v| adapter::tool_version(&state.base_url, &entry, v))
        .collect();
    Ok(Json(versions))
}

#[instrument(skip(state))]
pub async fn get_version(
    State(state): State<AppState>,
    Path((id, version_id)): Path<(String, String)>,
) -> ApiResult<Json<ToolVersion>> {
    let entry = resolve_tool(&state, &id).await?;
    let version = resolve_version(&entry, &version_id)?;
    Ok(Json(adapter::tool_version(&state.base_url, &entry, version)))
}

fn descriptor_response(plain: bool, file: &trove_core::SourceFile) -> Response {
    if plain {
        (
            [(header::CONTENT_TYPE, "text/plain")],
            file.content.clone().unwrap_or_default(),
        )
            .into_response()
    } else {
        Json(adapter::file_wrapper(file)).into_response()
    }
}

#[instrument(skip(state))]
pub async fn get_descriptor(
    State(state): State<AppState>,
    Path((id, version_id, descriptor_type)): Path<(String, String, String)>,
) -> ApiResult<Response> {
    let entry = resolve_tool(&state, &id).await?;
    let plain = check_descriptor_type(&entry, &descriptor_type)?;
    let version = resolve_version(&entry, &version_id)?;
    let file = version.primary_descriptor().ok_or_else(|| {
        ApiError::not_found(format!("No primary descriptor on version {version_id}"))
    })?;
    Ok(descriptor_response(plain, file))
}

/// Resolve a path relative to the primary descriptor's directory into an
/// absolute catalog path, rejecting escapes above the root.
fn resolve_relative(primary: &str, relative: &str) -> ApiResult<String> {
    let mut segments: Vec<&str> = primary
        .trim_start_matches('/')
        .split('/')
        .collect();
    segments.pop();
    for part in relative.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(ApiError::bad_request(format!(
                        "Path {relative} escapes the catalog root"
                    )));
                }
            }
            other => segments.push(other),
        }
    }
    Ok(format!("/{}", segments.join("/")))
}

#[instrument(skip(state))]
pub async fn get_descriptor_relative(
    State(state): State<AppState>,
    Path((id, version_id, descriptor_type, relative_path)): Path<(String, String, String, String)>,
) -> ApiResult<Response> {
    let entry = resolve_tool(&state, &id).await?;
    let plain = check_descriptor_type(&entry, &descriptor_type)?;
    let version = resolve_version(&entry, &version_id)?;
    let primary = version
        .primary_descriptor()
        .map(|f| f.path.clone())
        .unwrap_or_else(|| version.descriptor_path.clone());
    let absolute = resolve_relative(&primary, &relative_path)?;
    let file = version.find_file(&absolute).ok_or_else(|| {
        ApiError::not_found(format!("File {relative_path} not found on version {version_id}"))
    })?;
    Ok(descriptor_response(plain, file))
}

#[instrument(skip(state))]
pub async fn get_tests(
    State(state): State<AppState>,
    Path((id, version_id, descriptor_type)): Path<(String, String, String)>,
) -> ApiResult<Json<Vec<FileWrapper>>> {
    let entry = resolve_tool(&state, &id).await?;
    check_descriptor_type(&entry, &descriptor_type)?;
    let version = resolve_version(&entry, &version_id)?;
    Ok(Json(version.test_files().map(adapter::file_wrapper).collect()))
}

#[derive(Debug, Default, Deserialize)]
pub struct FilesQuery {
    pub format: Option<String>,
}

#[instrument(skip(state, headers))]
pub async fn get_files(
    State(state): State<AppState>,
    Path((id, version_id, descriptor_type)): Path<(String, String, String)>,
    Query(params): Query<FilesQuery>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let entry = resolve_tool(&state, &id).await?;
    check_descriptor_type(&entry, &descriptor_type)?;
    let version = resolve_version(&entry, &version_id)?;

    match params.format.as_deref() {
        Some("zip") => {
            let accepts_json = headers
                .get(header::ACCEPT)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.contains("application/json"))
                .unwrap_or(false);
            if accepts_json {
                return Err(ApiError::bad_request(
                    "format=zip cannot satisfy Accept: application/json",
                ));
            }
            zip_response(&entry, version)
        }
        Some(other) => Err(ApiError::bad_request(format!("Unknown format {other}"))),
        None => {
            let files: Vec<ToolFile> = adapter::tool_files(version);
            Ok(Json(files).into_response())
        }
    }
}

#[instrument(skip(state))]
pub async fn get_containerfile(
    State(state): State<AppState>,
    Path((id, version_id)): Path<(String, String)>,
) -> ApiResult<Json<Vec<FileWrapper>>> {
    let entry = resolve_tool(&state, &id).await?;
    let version = resolve_version(&entry, &version_id)?;
    let containerfile = version.containerfile().ok_or_else(|| {
        ApiError::not_found(format!("No containerfile on version {version_id}"))
    })?;
    Ok(Json(vec![adapter::file_wrapper(containerfile)]))
}

pub async fn list_tool_classes() -> Json<Vec<ToolClass>> {
    Json(vec![ToolClass::command_line_tool(), ToolClass::workflow()])
}

pub async fn service_info() -> Json<ServiceInfo> {
    Json(ServiceInfo::current())
}

// ============================================================================
// Zip export
// ============================================================================

fn zip_response(entry: &Entry, version: &Version) -> ApiResult<Response> {
    let bytes = archive_version(version)?;
    let file_name = format!("{}_{}.zip", entry.kind.base_name(), version.name);
    Ok((
        [
            ("content-type", "application/zip".to_string()),
            (
                "content-disposition",
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

async fn entry_zip(
    state: &AppState,
    headers: &HeaderMap,
    id: &str,
    version_id: &str,
    class: Option<EntryClass>,
) -> ApiResult<Response> {
    let entry_id = id
        .parse::<trove_core::EntryId>()
        .map_err(|e| ApiError::bad_request(format!("Invalid entry id: {e}")))?;
    let entry = state
        .services
        .store
        .find_by_id(&entry_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Entry {id} not found")))?;
    if let Some(class) = class {
        if entry.class() != class {
            return Err(ApiError::not_found(format!("Entry {id} not found")));
        }
    }

    if !entry.published {
        match subject(headers) {
            None => return Err(ApiError::unauthorized("Authentication required")),
            Some(subject) if !entry.is_owner(&subject) => {
                return Err(ApiError::forbidden(format!(
                    "{subject} does not own {}",
                    entry.full_path()
                )))
            }
            Some(_) => {}
        }
    }

    let version = entry.find_version(version_id).ok_or_else(|| {
        ApiError::not_found(format!(
            "Version {version_id} not found on {}",
            entry.full_path()
        ))
    })?;
    zip_response(&entry, version)
}

#[instrument(skip(state, headers))]
pub async fn get_entry_zip(
    State(state): State<AppState>,
    Path((id, version_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    entry_zip(&state, &headers, &id, &version_id, None).await
}

#[instrument(skip(state, headers))]
pub async fn get_workflow_zip(
    State(state): State<AppState>,
    Path((id, version_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    entry_zip(&state, &headers, &id, &version_id, Some(EntryClass::Workflow)).await
}

#[instrument(skip(state, headers))]
pub async fn get_container_zip(
    State(state): State<AppState>,
    Path((id, version_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    entry_zip(&state, &headers, &id, &version_id, Some(EntryClass::Tool)).await
}

// ============================================================================
// Legacy TRS v1 handlers
// ============================================================================

#[instrument(skip(state))]
pub async fn list_tools_v1(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<crate::model::v1::Tool>>> {
    let entries = state.services.store.list(&EntryQuery::published()).await?;
    let tools = entries
        .iter()
        .filter(|e| !e.is_checker())
        .map(|e| adapter::tool_v1(&state.base_url, e))
        .collect();
    Ok(Json(tools))
}

#[instrument(skip(state))]
pub async fn get_tool_v1(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<crate::model::v1::Tool>> {
    let entry = resolve_tool(&state, &id).await?;
    Ok(Json(adapter::tool_v1(&state.base_url, &entry)))
}

#[instrument(skip(state))]
pub async fn get_descriptor_v1(
    State(state): State<AppState>,
    Path((id, version_id, descriptor_type)): Path<(String, String, String)>,
) -> ApiResult<Json<crate::model::v1::ToolDescriptor>> {
    let entry = resolve_tool(&state, &id).await?;
    check_descriptor_type(&entry, &descriptor_type)?;
    let version = resolve_version(&entry, &version_id)?;
    let file = version.primary_descriptor().ok_or_else(|| {
        ApiError::not_found(format!("No primary descriptor on version {version_id}"))
    })?;
    Ok(Json(crate::model::v1::ToolDescriptor {
        descriptor_type: entry.descriptor_type.trs_token().to_string(),
        descriptor: file.content.clone().unwrap_or_default(),
    }))
}

#[instrument(skip(state))]
pub async fn get_dockerfile_v1(
    State(state): State<AppState>,
    Path((id, version_id)): Path<(String, String)>,
) -> ApiResult<Json<crate::model::v1::ToolDockerfile>> {
    let entry = resolve_tool(&state, &id).await?;
    let version = resolve_version(&entry, &version_id)?;
    let file = version.containerfile().ok_or_else(|| {
        ApiError::not_found(format!("No dockerfile on version {version_id}"))
    })?;
    Ok(Json(crate::model::v1::ToolDockerfile {
        dockerfile: file.content.clone().unwrap_or_default(),
    }))
}
