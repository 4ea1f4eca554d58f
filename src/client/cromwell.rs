//! Cromwell Client Facade
//!
//! [`Cromwell`] is the caller-facing handle to one engine instance. It is
//! constructed by probing the engine's version endpoint once; the version
//! (and the label field name it implies) is then fixed for the client's
//! lifetime. All workflow operations go through this type.
//!
//! The remote engine owns all workflow state. This client only submits,
//! queries and relays; it never transitions a workflow itself.

use log::{error, info, warn};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_ENCODING};
use reqwest::multipart::{Form, Part};
use serde_json::{Map, Value};

use crate::workflow::explain::{explain_metadata, ExplainExtras, ExplainLogs, ExplainSummary};
use crate::workflow::labels::{process_labels, LabelSet};
use crate::workflow::metadata::{MetadataCache, MetadataSnapshot, METADATA_TTL_SECS};
use crate::workflow::submission::{DependenciesSource, WdlSource, WorkflowHandle, WorkflowSubmission};

use super::connection::{ApiVersion, Connection, EngineVersion};
use super::error::{ClientError, Result};
use super::query::{build_query_url, QueryValue};
use super::transport::{ApiResponse, RateLimiter, Transport, RATE_LIMIT_CALLS, RATE_LIMIT_WINDOW};

/// Attempts made when applying labels before giving up.
const LABEL_ATTEMPTS: usize = 4;

/// Builds a per-workflow endpoint URL under an API base.
fn endpoint_url(base: &str, workflow_id: Option<&str>, resource: &str) -> String {
    match workflow_id {
        Some(id) => format!("{}/{}/{}", base, id, resource),
        None => format!("{}/{}", base, resource),
    }
}

/// Builds the label-search query URL.
///
/// Label terms use the engine's `label=key%3Avalue` form and are emitted in
/// sorted key order so identical searches produce identical URLs. Time and
/// status constraints go in front of the label terms.
fn labels_query_url(
    base: &str,
    labels: &LabelSet,
    start_time: Option<&str>,
    status_filter: Option<&[String]>,
    running_only: bool,
) -> String {
    let mut prefix: Vec<String> = Vec::new();
    if let Some(start) = start_time {
        prefix.push(format!("start={}", start));
    }
    if let Some(statuses) = status_filter {
        for status in statuses {
            prefix.push(format!("status={}", status));
        }
    }
    if running_only {
        prefix.push("status=Running".to_string());
    }

    let mut base = base.to_string();
    if !prefix.is_empty() {
        base.push_str(&prefix.join("&"));
        base.push('&');
    }

    let mut keys: Vec<&String> = labels.keys().collect();
    keys.sort();
    let terms: Vec<(String, QueryValue)> = keys
        .into_iter()
        .map(|key| {
            (
                format!("label={}", key),
                QueryValue::Scalar(labels[key].clone()),
            )
        })
        .collect();

    build_query_url(&base, &terms, "%3A")
        .trim_end_matches('&')
        .to_string()
}

/// Client handle to one Cromwell engine instance.
///
/// Cheap to share behind a reference; all interior state (the rate-limit
/// window and the metadata cache) is synchronized.
pub struct Cromwell {
    connection: Connection,
    user: String,
    transport: Transport,
    version: EngineVersion,
    label_field: &'static str,
    metadata_limiter: RateLimiter,
    cache: MetadataCache,
}

impl Cromwell {
    /// Connects to the engine, exiting the process on failure.
    ///
    /// An unreachable engine or an unusable version response is fatal for
    /// the surrounding tool; library callers who want to handle the error
    /// themselves use [`Cromwell::try_connect`].
    pub async fn connect(connection: Connection, user: impl Into<String>) -> Self {
        match Self::try_connect(connection, user).await {
            Ok(client) => client,
            Err(e) => {
                error!("{}", e);
                std::process::exit(1);
            }
        }
    }

    /// Connects to the engine by probing its version endpoint.
    pub async fn try_connect(connection: Connection, user: impl Into<String>) -> Result<Self> {
        let transport = Transport::new(connection.credential.clone());
        let url = connection.version_url();

        let body = transport.get_json(&url).await?;
        let raw = body
            .get("cromwell")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let version = EngineVersion::parse(&raw).ok_or_else(|| ClientError::Version {
            url: url.clone(),
            raw: raw.clone(),
        })?;
        info!(
            "connected to {}:{}, engine version {}",
            connection.host, connection.port, raw
        );

        Ok(Self {
            connection,
            user: user.into(),
            transport,
            version,
            label_field: version.label_field(),
            metadata_limiter: RateLimiter::new(RATE_LIMIT_CALLS, RATE_LIMIT_WINDOW),
            cache: MetadataCache::new(),
        })
    }

    /// The engine version fixed at connection time.
    pub fn version(&self) -> EngineVersion {
        self.version
    }

    /// The identity injected into submissions and labels.
    pub fn user(&self) -> &str {
        &self.user
    }

    fn endpoint(&self, api: ApiVersion, workflow_id: Option<&str>, resource: &str) -> String {
        endpoint_url(&self.connection.api_url(api), workflow_id, resource)
    }

    async fn build_form(&self, submission: &WorkflowSubmission) -> Result<Form> {
        let source_part = match &submission.source {
            WdlSource::Path(path) => {
                let bytes = tokio::fs::read(path).await?;
                let file_name = path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .unwrap_or("workflow.wdl")
                    .to_string();
                Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str("application/octet-stream")?
            }
            WdlSource::Inline(text) => Part::text(text.clone())
                .file_name("workflow.wdl")
                .mime_str("application/text-plain")?,
        };

        let inputs = Value::Object(submission.final_inputs(&self.user)).to_string();
        let mut form = Form::new().part("wdlSource", source_part).part(
            "workflowInputs",
            Part::text(inputs)
                .file_name("inputs.json")
                .mime_str("application/json")?,
        );

        if let Some(dependencies) = &submission.dependencies {
            let bytes = match dependencies {
                DependenciesSource::Path(path) => tokio::fs::read(path).await?,
                DependenciesSource::Bytes(bytes) => bytes.clone(),
            };
            form = form.part(
                "wdlDependencies",
                Part::bytes(bytes)
                    .file_name("dependencies.zip")
                    .mime_str("application/zip")?,
            );
        }

        if !submission.labels.is_empty() {
            let labels: Map<String, Value> = submission
                .labels
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect();
            // Field name depends on the engine version probed at connect.
            form = form.part(
                self.label_field,
                Part::text(Value::Object(labels).to_string())
                    .file_name("labels.json")
                    .mime_str("application/json")?,
            );
        }

        if let Some(options) = submission.options_blob() {
            for (key, value) in &options {
                info!("with engine option {}: {}", key, value);
            }
            form = form.part(
                "workflowOptions",
                Part::text(Value::Object(options).to_string())
                    .file_name("options.json")
                    .mime_str("application/json")?,
            );
        }

        Ok(form)
    }

    async fn submit_with(
        &self,
        submission: &WorkflowSubmission,
        api: ApiVersion,
    ) -> Result<WorkflowHandle> {
        let url = self.connection.api_url(api);
        let form = self.build_form(submission).await?;

        let response = self.transport.post_multipart(&url, form).await?;
        if !response.is_success() {
            return Err(ClientError::Submission {
                status: response.status,
                body: response.body,
            });
        }

        let handle: WorkflowHandle =
            serde_json::from_str(&response.body).map_err(|e| ClientError::decode(&url, e))?;
        info!("workflow {} submitted, status {}", handle.id, handle.status);
        Ok(handle)
    }

    /// Submits a new workflow and returns its handle.
    pub async fn submit(&self, submission: &WorkflowSubmission) -> Result<WorkflowHandle> {
        self.submit_with(submission, ApiVersion::V1).await
    }

    /// Resubmits a finished workflow from its originally submitted files.
    ///
    /// Returns `Ok(None)` when the workflow's metadata carries no
    /// `submittedFiles` section; that workflow cannot be restarted and it
    /// is not an error. The carried-over labels are re-attributed to this
    /// client's user.
    pub async fn restart(
        &self,
        workflow_id: &str,
        disable_caching: bool,
    ) -> Result<Option<WorkflowHandle>> {
        let metadata = self.query_metadata(workflow_id, false).await?;
        let snapshot = MetadataSnapshot::new(workflow_id, metadata);

        let (workflow, inputs) = match snapshot.submitted_files() {
            Some(files) => files,
            None => {
                warn!(
                    "workflow {} carries no submitted files, nothing to restart",
                    workflow_id
                );
                return Ok(None);
            }
        };

        let metadata_url = self.endpoint(ApiVersion::V1, Some(workflow_id), "metadata");
        let inputs: Map<String, Value> =
            serde_json::from_str(inputs).map_err(|e| ClientError::decode(&metadata_url, e))?;

        let empty = Map::new();
        let labels = process_labels(snapshot.labels().unwrap_or(&empty), &self.user);

        info!("restarting workflow {}", workflow_id);
        let submission = WorkflowSubmission::new(WdlSource::Inline(workflow.to_string()), inputs)
            .with_labels(labels)
            .disable_caching(disable_caching);
        let handle = self.submit_with(&submission, ApiVersion::V2).await?;
        Ok(Some(handle))
    }

    /// Asks the engine to abort a workflow.
    ///
    /// The engine's decoded response is relayed as is. Aborting an unknown
    /// or already-terminal workflow comes back as the engine's own error
    /// document for the caller to inspect, not as a client error.
    pub async fn stop(&self, workflow_id: &str) -> Result<Value> {
        let url = self.endpoint(ApiVersion::V1, Some(workflow_id), "abort");
        info!("aborting workflow {}", workflow_id);
        self.transport.post_json(&url).await
    }

    /// Applies labels to a workflow, retrying transient rejections.
    ///
    /// Makes up to four immediate attempts; the first accepted response
    /// wins, otherwise the last response is returned for the caller to
    /// inspect.
    pub async fn label(&self, workflow_id: &str, labels: &LabelSet) -> Result<ApiResponse> {
        if workflow_id.is_empty() {
            return Err(ClientError::InvalidRequest(
                "workflow id can not be empty".to_string(),
            ));
        }

        let url = self.endpoint(ApiVersion::V1, Some(workflow_id), "labels");
        let payload = Value::Object(
            labels
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        );

        let mut response = self.transport.patch_json(&url, &payload).await?;
        for _ in 1..LABEL_ATTEMPTS {
            if response.status == 200 {
                break;
            }
            warn!(
                "labeling workflow {} rejected with status {}: {}",
                workflow_id,
                response.status,
                response.message()
            );
            info!("Retrying...");
            response = self.transport.patch_json(&url, &payload).await?;
        }

        if response.status == 200 {
            info!("workflow {} labeled", workflow_id);
        }
        Ok(response)
    }

    /// Fetches a workflow's current status document.
    pub async fn query_status(&self, workflow_id: &str) -> Result<Value> {
        let url = self.endpoint(ApiVersion::V1, Some(workflow_id), "status");
        info!("querying status of workflow {}", workflow_id);
        self.transport.get_json(&url).await
    }

    /// Fetches a workflow's per-call log locations.
    pub async fn query_logs(&self, workflow_id: &str) -> Result<Value> {
        let url = self.endpoint(ApiVersion::V1, Some(workflow_id), "logs");
        info!("querying logs of workflow {}", workflow_id);
        self.transport.get_json(&url).await
    }

    /// Fetches a workflow's outputs.
    pub async fn query_outputs(&self, workflow_id: &str) -> Result<Value> {
        let url = self.endpoint(ApiVersion::V1, Some(workflow_id), "outputs");
        info!("querying outputs of workflow {}", workflow_id);
        self.transport.get_json(&url).await
    }

    /// Fetches a workflow's full metadata document.
    ///
    /// This is the only throttled call: it passes through the shared
    /// rolling-window rate limiter before going out.
    pub async fn query_metadata(&self, workflow_id: &str, v2: bool) -> Result<Value> {
        self.metadata_limiter.acquire().await;

        let api = if v2 { ApiVersion::V2 } else { ApiVersion::V1 };
        let url = self.endpoint(api, Some(workflow_id), "metadata");

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

        self.transport.get_json_with(url.as_str(), headers).await
    }

    /// Fetches a workflow's metadata through the freshness cache.
    ///
    /// A snapshot fetched within the last [`METADATA_TTL_SECS`] seconds is
    /// returned without touching the network.
    pub async fn query_metadata_cached(&self, workflow_id: &str) -> Result<MetadataSnapshot> {
        self.query_metadata_cached_with_ttl(workflow_id, METADATA_TTL_SECS)
            .await
    }

    /// Fetches a workflow's metadata through the cache with a caller-chosen
    /// freshness window.
    pub async fn query_metadata_cached_with_ttl(
        &self,
        workflow_id: &str,
        ttl_secs: i64,
    ) -> Result<MetadataSnapshot> {
        if let Some(snapshot) = self.cache.fresh(workflow_id, ttl_secs) {
            return Ok(snapshot);
        }
        let value = self.query_metadata(workflow_id, true).await?;
        Ok(self.cache.store(workflow_id, value))
    }

    /// Runs a general workflow search from an ordered list of query terms.
    pub async fn query(&self, terms: &[(String, QueryValue)]) -> Result<Value> {
        let base = format!("{}/query?", self.connection.api_url(ApiVersion::V1));
        let url = build_query_url(&base, terms, "=");
        info!("querying workflows: {}", url);
        self.transport.get_json(&url).await
    }

    /// Searches workflows by label, optionally constrained by start time
    /// and status.
    pub async fn query_by_labels(
        &self,
        labels: &LabelSet,
        start_time: Option<&str>,
        status_filter: Option<&[String]>,
        running_only: bool,
    ) -> Result<Value> {
        let base = format!("{}/query?", self.connection.api_url(ApiVersion::V1));
        let url = labels_query_url(&base, labels, start_time, status_filter, running_only);
        info!("querying workflows by label: {}", url);
        self.transport.get_json(&url).await
    }

    /// Lists the backends the engine can run calls on.
    pub async fn query_backends(&self) -> Result<Value> {
        let url = self.endpoint(ApiVersion::V1, None, "backends");
        self.transport.get_json(&url).await
    }

    /// Fetches and condenses a workflow's metadata into its explanation.
    pub async fn explain(
        &self,
        workflow_id: &str,
        include_inputs: bool,
    ) -> Result<(ExplainSummary, ExplainExtras, ExplainLogs)> {
        let metadata = self.query_metadata(workflow_id, false).await?;
        Ok(explain_metadata(&metadata, include_inputs))
    }
}
