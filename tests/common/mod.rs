//! Common test utilities and helpers
//!
//! Shared fixtures for integration tests: an in-memory catalog wired to
//! scripted source-control, parser, and registry fakes, plus the TRS
//! router for HTTP-level assertions.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use trove_core::{DescriptorType, Entry, EntryClass, EntryKind, FileType, SourceFile};
use trove_service::{
    CreateHostedRequest, DescriptorParser, ImageRegistryClient, ManifestInfo, ParsedDescriptor,
    RegisterToolRequest, RegisterWorkflowRequest, RepoRef, ServiceError, ServiceRegistry,
    ServiceResult, SourceCodeProvider,
};
use trove_store::{EntryRepository, InMemoryEntryStore};
use trove_trs::{AppState, SUBJECT_HEADER};

pub mod fixtures;

pub const BASE_URL: &str = "http://trove.test/ga4gh/trs/v2";

/// Scripted source-control provider: refs per repository, with optional
/// forced failures.
pub struct ScriptedProvider {
    refs: Mutex<HashMap<String, Vec<RepoRef>>>,
    failing: Mutex<HashSet<String>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            refs: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
        }
    }

    pub fn set_refs(&self, repository: &str, refs: Vec<RepoRef>) {
        self.refs
            .lock()
            .unwrap()
            .insert(repository.to_string(), refs);
    }

    pub fn fail(&self, repository: &str) {
        self.failing.lock().unwrap().insert(repository.to_string());
    }
}

#[async_trait]
impl SourceCodeProvider for ScriptedProvider {
    async fn list_refs(
        &self,
        _organization: &str,
        repository: &str,
    ) -> ServiceResult<Vec<RepoRef>> {
        if self.failing.lock().unwrap().contains(repository) {
            return Err(ServiceError::Upstream(format!(
                "{repository}: simulated outage"
            )));
        }
        Ok(self
            .refs
            .lock()
            .unwrap()
            .get(repository)
            .cloned()
            .unwrap_or_default())
    }
}

/// Scripted descriptor parser. Unscripted (repository, ref) pairs get a
/// valid primary descriptor with deterministic content.
pub struct ScriptedParser {
    scripts: Mutex<HashMap<(String, String), ParsedDescriptor>>,
    pub calls: AtomicUsize,
}

impl ScriptedParser {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn script(&self, repository: &str, reference: &str, parsed: ParsedDescriptor) {
        self.scripts
            .lock()
            .unwrap()
            .insert((repository.to_string(), reference.to_string()), parsed);
    }

    /// Script a valid parse that declares the given image references.
    pub fn script_images(&self, repository: &str, reference: &str, images: Vec<&str>) {
        let parsed = ParsedDescriptor {
            files: vec![SourceFile::new(
                "/Dockstore.cwl",
                FileType::PrimaryDescriptor,
                format!("descriptor {repository}@{reference}"),
            )
            .unwrap()],
            valid: true,
            author: Some("alice".to_string()),
            description: Some("a test entry".to_string()),
            license: Some("Apache-2.0".to_string()),
            image_references: images.into_iter().map(str::to_string).collect(),
        };
        self.script(repository, reference, parsed);
    }
}

#[async_trait]
impl DescriptorParser for ScriptedParser {
    async fn parse(
        &self,
        entry: &Entry,
        reference: &RepoRef,
        primary_path: &str,
    ) -> ServiceResult<ParsedDescriptor> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let repository = entry.kind.source_coordinates().2.to_string();
        if let Some(parsed) = self
            .scripts
            .lock()
            .unwrap()
            .get(&(repository.clone(), reference.name.clone()))
        {
            return Ok(parsed.clone());
        }
        Ok(ParsedDescriptor {
            files: vec![SourceFile::new(
                primary_path,
                FileType::PrimaryDescriptor,
                format!("descriptor {repository}@{}", reference.name),
            )
            .unwrap()],
            valid: true,
            author: Some("alice".to_string()),
            description: Some("a test entry".to_string()),
            license: Some("Apache-2.0".to_string()),
            image_references: Vec::new(),
        })
    }
}

pub fn digest(fill: char) -> String {
    format!("sha256:{}", fill.to_string().repeat(64))
}

/// Scripted image registry for `quay.io`.
pub struct ScriptedRegistry {
    token_missing: AtomicBool,
    by_tag: Mutex<HashMap<(String, String), Vec<ManifestInfo>>>,
}

impl ScriptedRegistry {
    pub fn new() -> Self {
        Self {
            token_missing: AtomicBool::new(false),
            by_tag: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_token_missing(&self, missing: bool) {
        self.token_missing.store(missing, Ordering::SeqCst);
    }

    pub fn set_manifests(&self, repository: &str, tag: &str, manifests: Vec<ManifestInfo>) {
        self.by_tag
            .lock()
            .unwrap()
            .insert((repository.to_string(), tag.to_string()), manifests);
    }
}

#[async_trait]
impl ImageRegistryClient for ScriptedRegistry {
    fn registry_host(&self) -> &str {
        "quay.io"
    }

    fn token_missing(&self) -> bool {
        self.token_missing.load(Ordering::SeqCst)
    }

    async fn list_manifests_by_digest(
        &self,
        _repository: &str,
        digest: &str,
    ) -> ServiceResult<Vec<ManifestInfo>> {
        Ok(vec![ManifestInfo {
            digest: digest.to_string(),
            architecture: Some("amd64".to_string()),
            size: Some(512),
        }])
    }

    async fn list_manifests_by_tag(
        &self,
        repository: &str,
        tag: &str,
    ) -> ServiceResult<Vec<ManifestInfo>> {
        Ok(self
            .by_tag
            .lock()
            .unwrap()
            .get(&(repository.to_string(), tag.to_string()))
            .cloned()
            .unwrap_or_else(|| {
                vec![ManifestInfo {
                    digest: digest('e'),
                    architecture: Some("amd64".to_string()),
                    size: Some(512),
                }]
            }))
    }
}

/// Test application: catalog services plus the TRS router.
pub struct TestApp {
    pub store: Arc<InMemoryEntryStore>,
    pub services: Arc<ServiceRegistry>,
    pub provider: Arc<ScriptedProvider>,
    pub parser: Arc<ScriptedParser>,
    pub registry: Arc<ScriptedRegistry>,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryEntryStore::new());
        let provider = Arc::new(ScriptedProvider::new());
        let parser = Arc::new(ScriptedParser::new());
        let registry = Arc::new(ScriptedRegistry::new());

        let services = ServiceRegistry::new(
            store.clone() as Arc<dyn EntryRepository>,
            vec![(
                "github.com".to_string(),
                provider.clone() as Arc<dyn SourceCodeProvider>,
            )],
            parser.clone() as Arc<dyn DescriptorParser>,
            vec![registry.clone() as Arc<dyn ImageRegistryClient>],
        );
        let services = Arc::new(services);
        let router = trove_trs::build_router(AppState {
            services: services.clone(),
            base_url: BASE_URL.to_string(),
        });

        Self {
            store,
            services,
            provider,
            parser,
            registry,
            router,
        }
    }

    pub async fn request(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.request(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn get_as(&self, uri: &str, subject: &str) -> Response<Body> {
        self.request(
            Request::get(uri)
                .header(SUBJECT_HEADER, subject)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn get_accept(&self, uri: &str, accept: &str) -> Response<Body> {
        self.request(
            Request::get(uri)
                .header("accept", accept)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub fn assert_status(response: &Response<Body>, expected: StatusCode) {
    assert_eq!(response.status(), expected);
}

/// Count published entries of both classes.
pub async fn published_count(app: &TestApp) -> usize {
    let query = trove_store::EntryQuery::published();
    app.store.list(&query).await.unwrap().len()
}

pub fn workflow_request(repo: &str) -> RegisterWorkflowRequest {
    RegisterWorkflowRequest {
        source_control: "github.com".to_string(),
        organization: "org".to_string(),
        repository: repo.to_string(),
        descriptor_path: "/Dockstore.cwl".to_string(),
        descriptor_type: DescriptorType::Cwl,
        workflow_name: None,
    }
}

pub fn tool_request(name: &str) -> RegisterToolRequest {
    RegisterToolRequest {
        registry: "quay.io".to_string(),
        namespace: "org".to_string(),
        name: name.to_string(),
        source_control: "github.com".to_string(),
        organization: "org".to_string(),
        repository: name.to_string(),
        tool_name: None,
        descriptor_type: DescriptorType::Cwl,
        descriptor_path: "/Dockstore.cwl".to_string(),
        dockerfile_path: Some("/Dockerfile".to_string()),
    }
}

pub fn hosted_request(name: &str, class: EntryClass) -> CreateHostedRequest {
    CreateHostedRequest {
        class,
        descriptor_type: DescriptorType::Cwl,
        name: name.to_string(),
        secondary_name: None,
    }
}

/// The TRS id of an entry, percent-encoded as one path segment.
pub fn encoded_trs_id(entry: &Entry) -> String {
    let id = match &entry.kind {
        EntryKind::Tool { .. } => entry.full_path(),
        EntryKind::Workflow { .. } => format!("#workflow/{}", entry.full_path()),
    };
    let mut out = String::new();
    for byte in id.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
