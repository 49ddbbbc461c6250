//! Bucket notification store
//!
//! The remote side of a reconciliation: one call to read a bucket's full
//! notification configuration and one to replace it. S3 has no partial
//! update, so `persist` always sends the whole configuration.

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::operation::get_bucket_notification_configuration::{
    GetBucketNotificationConfigurationOutput,
};
use aws_sdk_s3::types as s3;
use aws_sdk_s3::Client as S3Client;
use lambda_runtime::tracing;

use crate::error::{Error, Result};
use crate::model::{
    EventBridgeConfiguration, FilterRule, KeyFilter, LambdaFunctionConfiguration,
    NotificationConfiguration, NotificationFilter, QueueConfiguration, TopicConfiguration,
};

#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Current notification configuration of `bucket`.
    async fn fetch(&self, bucket: &str) -> Result<NotificationConfiguration>;

    /// Replace the notification configuration of `bucket` with `config`.
    async fn persist(&self, bucket: &str, config: &NotificationConfiguration) -> Result<()>;
}

/// [`NotificationStore`] backed by the S3 bucket notification API.
#[derive(Clone, Debug)]
pub struct S3NotificationStore {
    client: S3Client,
}

impl S3NotificationStore {
    pub fn new(client: S3Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NotificationStore for S3NotificationStore {
    async fn fetch(&self, bucket: &str) -> Result<NotificationConfiguration> {
        tracing::debug!(bucket, "GetBucketNotificationConfiguration");
        let output = self
            .client
            .get_bucket_notification_configuration()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| Error::fetch(bucket, DisplayErrorContext(e).to_string()))?;
        Ok(from_output(&output))
    }

    async fn persist(&self, bucket: &str, config: &NotificationConfiguration) -> Result<()> {
        let notification_configuration =
            to_sdk(config).map_err(|message| Error::persist(bucket, message))?;
        tracing::debug!(
            bucket,
            entries = config.entry_count(),
            "PutBucketNotificationConfiguration"
        );
        self.client
            .put_bucket_notification_configuration()
            .bucket(bucket)
            .notification_configuration(notification_configuration)
            .send()
            .await
            .map_err(|e| Error::persist(bucket, DisplayErrorContext(e).to_string()))?;
        Ok(())
    }
}

/// Conversions between a model entry and the SDK type of the same name.
/// Target ARN and event list are required by the API, so the outbound
/// direction fails when either is missing.
macro_rules! sdk_conversion {
    ($kind:ident, $arn:ident, $set_arn:ident, $from_sdk:ident, $to_sdk:ident) => {
        fn $from_sdk(c: &s3::$kind) -> $kind {
            $kind {
                id: c.id().map(str::to_string),
                $arn: Some(c.$arn().to_string()),
                events: Some(events_from_sdk(c.events())),
                filter: c.filter().map(filter_from_sdk),
            }
        }

        fn $to_sdk(c: &$kind) -> std::result::Result<s3::$kind, String> {
            s3::$kind::builder()
                .set_id(c.id.clone())
                .$set_arn(c.$arn.clone())
                .set_events(events_to_sdk(c.events.as_ref()))
                .set_filter(filter_to_sdk(c.filter.as_ref()))
                .build()
                .map_err(|e| e.to_string())
        }
    };
}

sdk_conversion!(
    LambdaFunctionConfiguration,
    lambda_function_arn,
    set_lambda_function_arn,
    lambda_from_sdk,
    lambda_to_sdk
);
sdk_conversion!(QueueConfiguration, queue_arn, set_queue_arn, queue_from_sdk, queue_to_sdk);
sdk_conversion!(TopicConfiguration, topic_arn, set_topic_arn, topic_from_sdk, topic_to_sdk);

fn list_from_sdk<T, U>(entries: &[T], convert: fn(&T) -> U) -> Option<Vec<U>> {
    if entries.is_empty() {
        None
    } else {
        Some(entries.iter().map(convert).collect())
    }
}

fn list_to_sdk<T, U>(
    entries: Option<&Vec<T>>,
    convert: fn(&T) -> std::result::Result<U, String>,
) -> std::result::Result<Option<Vec<U>>, String> {
    entries
        .map(|entries| {
            entries
                .iter()
                .map(convert)
                .collect::<std::result::Result<Vec<U>, String>>()
        })
        .transpose()
}

fn from_output(output: &GetBucketNotificationConfigurationOutput) -> NotificationConfiguration {
    NotificationConfiguration {
        lambda_function_configurations: list_from_sdk(
            output.lambda_function_configurations(),
            lambda_from_sdk,
        ),
        queue_configurations: list_from_sdk(output.queue_configurations(), queue_from_sdk),
        topic_configurations: list_from_sdk(output.topic_configurations(), topic_from_sdk),
        event_bridge_configuration: output
            .event_bridge_configuration()
            .map(|_| EventBridgeConfiguration {}),
    }
}

fn events_from_sdk(events: &[s3::Event]) -> Vec<String> {
    events.iter().map(|e| e.as_str().to_string()).collect()
}

fn filter_from_sdk(filter: &s3::NotificationConfigurationFilter) -> NotificationFilter {
    NotificationFilter {
        key: filter.key().map(|key| KeyFilter {
            filter_rules: key
                .filter_rules()
                .iter()
                .map(|rule| FilterRule {
                    name: rule.name().map(|n| n.as_str().to_string()),
                    value: rule.value().map(str::to_string),
                })
                .collect(),
        }),
    }
}

fn events_to_sdk(events: Option<&Vec<String>>) -> Option<Vec<s3::Event>> {
    events.map(|events| events.iter().map(|e| s3::Event::from(e.as_str())).collect())
}

fn filter_to_sdk(
    filter: Option<&NotificationFilter>,
) -> Option<s3::NotificationConfigurationFilter> {
    filter.map(|filter| {
        s3::NotificationConfigurationFilter::builder()
            .set_key(filter.key.as_ref().map(|key| {
                s3::S3KeyFilter::builder()
                    .set_filter_rules(Some(
                        key.filter_rules
                            .iter()
                            .map(|rule| {
                                s3::FilterRule::builder()
                                    .set_name(rule.name.as_deref().map(s3::FilterRuleName::from))
                                    .set_value(rule.value.clone())
                                    .build()
                            })
                            .collect(),
                    ))
                    .build()
            }))
            .build()
    })
}

/// Converts the model into the SDK request type. Fails when an entry lacks
/// a member the API requires (target ARN or event list).
fn to_sdk(
    config: &NotificationConfiguration,
) -> std::result::Result<s3::NotificationConfiguration, String> {
    Ok(s3::NotificationConfiguration::builder()
        .set_lambda_function_configurations(list_to_sdk(
            config.lambda_function_configurations.as_ref(),
            lambda_to_sdk,
        )?)
        .set_queue_configurations(list_to_sdk(config.queue_configurations.as_ref(), queue_to_sdk)?)
        .set_topic_configurations(list_to_sdk(config.topic_configurations.as_ref(), topic_to_sdk)?)
        .set_event_bridge_configuration(
            config
                .event_bridge_configuration
                .as_ref()
                .map(|_| s3::EventBridgeConfiguration::builder().build()),
        )
        .build())
}
