use aws_lambda_events::event::cloudformation::CloudFormationCustomResourceRequest;
use lambda_runtime::{tracing, Error, LambdaEvent};
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde_json::Value;

use crate::model::LifecycleRequest;
use crate::reconciler::Reconciler;
use crate::store::NotificationStore;
use crate::validator::{previous_configuration, validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum ResponseStatus {
    Success,
    Failed,
}

/// Body uploaded to the pre-signed `ResponseURL` to complete the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct CustomResourceResponse {
    pub status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
}

/// Envelope fields shared by all three request types.
struct Envelope<'a> {
    request_type: &'static str,
    request_id: &'a str,
    response_url: &'a str,
    stack_id: &'a str,
    logical_resource_id: &'a str,
    physical_resource_id: Option<&'a str>,
    resource_properties: &'a Value,
}

fn envelope(request: &CloudFormationCustomResourceRequest) -> Envelope<'_> {
    match request {
        CloudFormationCustomResourceRequest::Create(r) => Envelope {
            request_type: "Create",
            request_id: &r.request_id,
            response_url: &r.response_url,
            stack_id: &r.stack_id,
            logical_resource_id: &r.logical_resource_id,
            physical_resource_id: None,
            resource_properties: &r.resource_properties,
        },
        CloudFormationCustomResourceRequest::Update(r) => Envelope {
            request_type: "Update",
            request_id: &r.request_id,
            response_url: &r.response_url,
            stack_id: &r.stack_id,
            logical_resource_id: &r.logical_resource_id,
            physical_resource_id: Some(&r.physical_resource_id),
            resource_properties: &r.resource_properties,
        },
        CloudFormationCustomResourceRequest::Delete(r) => Envelope {
            request_type: "Delete",
            request_id: &r.request_id,
            response_url: &r.response_url,
            stack_id: &r.stack_id,
            logical_resource_id: &r.logical_resource_id,
            physical_resource_id: Some(&r.physical_resource_id),
            resource_properties: &r.resource_properties,
        },
    }
}

/// Create derives the id from the bucket; Update and Delete echo the id
/// CloudFormation already holds so the resource is never replaced.
fn physical_resource_id(envelope: &Envelope<'_>) -> String {
    if let Some(id) = envelope.physical_resource_id {
        return id.to_string();
    }
    match envelope
        .resource_properties
        .get("Bucket")
        .and_then(Value::as_str)
        .filter(|bucket| !bucket.is_empty())
    {
        Some(bucket) => format!("{}-{}", envelope.logical_resource_id, bucket),
        None => envelope.logical_resource_id.to_string(),
    }
}

async fn reconcile<S: NotificationStore>(
    request: &CloudFormationCustomResourceRequest,
    reconciler: &Reconciler<S>,
) -> crate::error::Result<()> {
    let previous = match request {
        CloudFormationCustomResourceRequest::Update(r) => Some(r.old_resource_properties.clone()),
        _ => None,
    };
    let lifecycle = LifecycleRequest::new(envelope(request).resource_properties.clone(), previous);
    let desired = validate(&lifecycle).map_err(|err| {
        tracing::warn!(field = err.field(), "Rejected invalid resource properties");
        err
    })?;

    // Validation guarantees both.
    let bucket = desired.bucket.as_deref().unwrap_or_default();
    let config = desired.notification_configuration.clone().unwrap_or_default();

    match request {
        CloudFormationCustomResourceRequest::Create(_) => {
            reconciler.on_create(bucket, &config).await?;
        }
        CloudFormationCustomResourceRequest::Update(_) => {
            let previous = previous_configuration(&lifecycle)?;
            reconciler.on_update(bucket, &previous, &config).await?;
        }
        CloudFormationCustomResourceRequest::Delete(_) => {
            reconciler.on_delete(bucket, &config).await?;
        }
    }
    Ok(())
}

/// Runs the reconciliation for one request and builds the response that
/// reports its outcome. Failures become a `FAILED` response, never an `Err`.
pub(crate) async fn handle_request<S: NotificationStore>(
    request: &CloudFormationCustomResourceRequest,
    reconciler: &Reconciler<S>,
) -> CustomResourceResponse {
    let envelope = envelope(request);
    tracing::info!(
        request_type = envelope.request_type,
        request_id = envelope.request_id,
        logical_resource_id = envelope.logical_resource_id,
        "Handling custom resource request"
    );

    let (status, reason) = match reconcile(request, reconciler).await {
        Ok(()) => (ResponseStatus::Success, None),
        Err(err) => {
            tracing::error!(kind = err.kind(), "{}", err);
            (ResponseStatus::Failed, Some(format!("{}: {}", err.kind(), err)))
        }
    };

    CustomResourceResponse {
        status,
        reason,
        physical_resource_id: physical_resource_id(&envelope),
        stack_id: envelope.stack_id.to_string(),
        request_id: envelope.request_id.to_string(),
        logical_resource_id: envelope.logical_resource_id.to_string(),
    }
}

async fn send_response(
    http_client: &reqwest::Client,
    response_url: &str,
    response: &CustomResourceResponse,
) -> Result<(), Error> {
    // The pre-signed URL is signed without a content type.
    let body = serde_json::to_vec(response)?;
    http_client
        .put(response_url)
        .header(CONTENT_TYPE, "")
        .body(body)
        .send()
        .await?
        .error_for_status()?;
    Ok(())
}

pub(crate) async fn function_handler<S: NotificationStore>(
    event: LambdaEvent<CloudFormationCustomResourceRequest>,
    reconciler: &Reconciler<S>,
    http_client: &reqwest::Client,
) -> Result<(), Error> {
    let request = event.payload;
    let response = handle_request(&request, reconciler).await;
    send_response(http_client, envelope(&request).response_url, &response).await?;
    tracing::info!(status = ?response.status, "Response sent to CloudFormation");
    Ok(())
}
