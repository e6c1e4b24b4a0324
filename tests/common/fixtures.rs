//! Higher-level catalog fixtures built on [`TestApp`]

use trove_core::{Entry, EntryClass};
use trove_service::{FilePatch, RepoRef};

use super::{hosted_request, tool_request, workflow_request, TestApp};

pub const OWNER: &str = "alice";

/// Register a workflow, give it one valid tag, refresh, and publish it.
pub async fn published_workflow(app: &TestApp, repo: &str) -> Entry {
    let entry = app
        .services
        .registration
        .register_workflow(OWNER, workflow_request(repo))
        .await
        .unwrap();
    app.provider
        .set_refs(repo, vec![RepoRef::tag("1.0", "c1")]);
    app.services.refresh.refresh(OWNER, &entry.id).await.unwrap();
    app.services.lifecycle.publish(OWNER, &entry.id).await.unwrap()
}

/// Register a tool, give it one valid tag, refresh, and publish it.
pub async fn published_tool(app: &TestApp, name: &str) -> Entry {
    let entry = app
        .services
        .registration
        .register_tool(OWNER, tool_request(name))
        .await
        .unwrap();
    app.provider
        .set_refs(name, vec![RepoRef::tag("1.0", "c1")]);
    app.services.refresh.refresh(OWNER, &entry.id).await.unwrap();
    app.services.lifecycle.publish(OWNER, &entry.id).await.unwrap()
}

/// Create a hosted workflow with one edited version.
pub async fn hosted_workflow(app: &TestApp, name: &str, patches: Vec<FilePatch>) -> Entry {
    let entry = app
        .services
        .registration
        .create_hosted(OWNER, hosted_request(name, EntryClass::Workflow))
        .await
        .unwrap();
    app.services
        .hosted
        .edit_version(OWNER, &entry.id, patches)
        .await
        .unwrap()
}
