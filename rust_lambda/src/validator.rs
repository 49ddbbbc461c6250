use serde_json::Value;

use crate::error::ValidationError;
use crate::model::{LifecycleRequest, NotificationConfiguration, ResourceProperties, Subscription};

/// Checks the desired state of a lifecycle request, stopping at the first
/// violation, and returns it parsed.
///
/// Bucket presence, bucket immutability and configuration presence are read
/// from the raw properties, so they are reported before any shape error in
/// the entries. Previous state is only consulted for its bucket.
pub fn validate(request: &LifecycleRequest) -> Result<ResourceProperties, ValidationError> {
    let bucket = bucket_of(&request.desired)
        .ok_or_else(|| ValidationError::MissingProperty("Bucket".to_string()))?;

    let previous_bucket = request.previous.as_ref().and_then(bucket_of);
    if previous_bucket.is_some_and(|previous| previous != bucket) {
        return Err(ValidationError::ImmutableProperty("Bucket".to_string()));
    }

    if member(&request.desired, "NotificationConfiguration").is_none() {
        return Err(missing_configuration());
    }

    let desired: ResourceProperties =
        serde_json::from_value(request.desired.clone()).map_err(invalid)?;
    let config = desired
        .notification_configuration
        .as_ref()
        .ok_or_else(missing_configuration)?;

    validate_entries(config.lambda_function_configurations.as_deref())?;
    validate_entries(config.queue_configurations.as_deref())?;
    validate_entries(config.topic_configurations.as_deref())?;
    Ok(desired)
}

/// Notification configuration of the state an update replaces. Missing
/// previous state removes nothing.
pub fn previous_configuration(
    request: &LifecycleRequest,
) -> Result<NotificationConfiguration, ValidationError> {
    match request
        .previous
        .as_ref()
        .and_then(|previous| member(previous, "NotificationConfiguration"))
    {
        Some(config) => serde_json::from_value(config.clone()).map_err(invalid),
        None => Ok(NotificationConfiguration::default()),
    }
}

fn bucket_of(properties: &Value) -> Option<&str> {
    member(properties, "Bucket")
        .and_then(Value::as_str)
        .filter(|bucket| !bucket.is_empty())
}

fn member<'a>(properties: &'a Value, name: &str) -> Option<&'a Value> {
    properties.get(name).filter(|value| !value.is_null())
}

fn invalid(err: serde_json::Error) -> ValidationError {
    ValidationError::InvalidProperties(err.to_string())
}

fn missing_configuration() -> ValidationError {
    ValidationError::MissingProperty("NotificationConfiguration".to_string())
}

fn validate_entries<T: Subscription>(entries: Option<&[T]>) -> Result<(), ValidationError> {
    for entry in entries.unwrap_or_default() {
        // Presence only: an empty event list is accepted.
        if entry.events().is_none() {
            return Err(missing::<T>("Events"));
        }
        if entry.target_arn().is_none() {
            return Err(missing::<T>(T::ARN_PROPERTY));
        }
    }
    Ok(())
}

fn missing<T: Subscription>(property: &str) -> ValidationError {
    ValidationError::MissingProperty(format!("{}.{}", T::LIST_PROPERTY, property))
}
