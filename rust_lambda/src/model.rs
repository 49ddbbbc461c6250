//! Bucket notification configuration as it appears in CloudFormation
//! resource properties and in the S3 notification API.
//!
//! Member names use the PascalCase spelling of both sources. Target ARN and
//! event list are optional on every entry: a request may omit them (the
//! validator reports it) and an `Id` on its own is a valid removal key.
//! Unknown members are rejected rather than dropped, so a misspelled
//! `Filter` never turns into a subscription without one.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Single key-name filter rule (`prefix` or `suffix`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct FilterRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct KeyFilter {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filter_rules: Vec<FilterRule>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct NotificationFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<KeyFilter>,
}

/// Presence marker: when set, S3 also forwards every event to EventBridge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventBridgeConfiguration {}

/// Kind-generic view of a subscription entry, used by the merge routines.
pub trait Subscription {
    /// Name of the target ARN property for this kind.
    const ARN_PROPERTY: &'static str;
    /// Name of the list holding this kind inside a configuration.
    const LIST_PROPERTY: &'static str;

    fn id(&self) -> Option<&str>;
    fn target_arn(&self) -> Option<&str>;
    fn events(&self) -> Option<&[String]>;
}

macro_rules! subscription_entry {
    ($(#[$meta:meta])* $name:ident, $arn:ident, $arn_property:literal, $list_property:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "PascalCase", deny_unknown_fields)]
        pub struct $name {
            #[serde(default, skip_serializing_if = "Option::is_none")]
            pub id: Option<String>,
            #[serde(default, skip_serializing_if = "Option::is_none")]
            pub $arn: Option<String>,
            #[serde(default, skip_serializing_if = "Option::is_none")]
            pub events: Option<Vec<String>>,
            #[serde(default, skip_serializing_if = "Option::is_none")]
            pub filter: Option<NotificationFilter>,
        }

        impl Subscription for $name {
            const ARN_PROPERTY: &'static str = $arn_property;
            const LIST_PROPERTY: &'static str = $list_property;

            fn id(&self) -> Option<&str> {
                self.id.as_deref()
            }

            fn target_arn(&self) -> Option<&str> {
                self.$arn.as_deref()
            }

            fn events(&self) -> Option<&[String]> {
                self.events.as_deref()
            }
        }
    };
}

subscription_entry!(
    /// Delivery of bucket events to a Lambda function.
    LambdaFunctionConfiguration,
    lambda_function_arn,
    "LambdaFunctionArn",
    "LambdaFunctionConfigurations"
);
subscription_entry!(
    /// Delivery of bucket events to an SQS queue.
    QueueConfiguration,
    queue_arn,
    "QueueArn",
    "QueueConfigurations"
);
subscription_entry!(
    /// Delivery of bucket events to an SNS topic.
    TopicConfiguration,
    topic_arn,
    "TopicArn",
    "TopicConfigurations"
);

/// Complete notification configuration of a bucket.
///
/// An absent list and an empty list are kept apart so that a fetched
/// configuration is written back in the shape it was read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct NotificationConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lambda_function_configurations: Option<Vec<LambdaFunctionConfiguration>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_configurations: Option<Vec<QueueConfiguration>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_configurations: Option<Vec<TopicConfiguration>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_bridge_configuration: Option<EventBridgeConfiguration>,
}

impl NotificationConfiguration {
    /// Total number of subscription entries across all three kinds.
    pub fn entry_count(&self) -> usize {
        self.lambda_function_configurations.as_ref().map_or(0, Vec::len)
            + self.queue_configurations.as_ref().map_or(0, Vec::len)
            + self.topic_configurations.as_ref().map_or(0, Vec::len)
    }
}

/// Properties of the custom resource as declared in the template.
///
/// Unknown keys such as `ServiceToken` are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_configuration: Option<NotificationConfiguration>,
}

/// Raw property bags of a lifecycle event: the desired state and, on update,
/// the state it replaces. Typed parsing happens during validation so that
/// the checks run in a fixed order regardless of how malformed a bag is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LifecycleRequest {
    pub desired: Value,
    pub previous: Option<Value>,
}

impl LifecycleRequest {
    pub fn new(desired: Value, previous: Option<Value>) -> Self {
        Self { desired, previous }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_resource_properties() {
        let props: ResourceProperties = serde_json::from_value(json!({
            "ServiceToken": "arn:aws:lambda:us-east-1:123456789012:function:handler",
            "Bucket": "my-bucket",
            "NotificationConfiguration": {
                "LambdaFunctionConfigurations": [{
                    "Id": "on-upload",
                    "LambdaFunctionArn": "arn:aws:lambda:us-east-1:123456789012:function:f",
                    "Events": ["s3:ObjectCreated:*"],
                    "Filter": {"Key": {"FilterRules": [{"Name": "prefix", "Value": "uploads/"}]}}
                }],
                "QueueConfigurations": []
            }
        }))
        .unwrap();

        assert_eq!(props.bucket.as_deref(), Some("my-bucket"));
        let config = props.notification_configuration.unwrap();
        let lambdas = config.lambda_function_configurations.as_ref().unwrap();
        assert_eq!(lambdas[0].id(), Some("on-upload"));
        assert_eq!(
            lambdas[0].filter.as_ref().unwrap().key.as_ref().unwrap().filter_rules[0]
                .value
                .as_deref(),
            Some("uploads/")
        );
        assert_eq!(config.queue_configurations, Some(vec![]));
        assert_eq!(config.topic_configurations, None);
        assert_eq!(config.entry_count(), 1);
    }

    #[test]
    fn test_serialize_omits_absent_members() {
        let config = NotificationConfiguration {
            topic_configurations: Some(vec![TopicConfiguration {
                topic_arn: Some("arn:aws:sns:us-east-1:123456789012:t".to_string()),
                events: Some(vec!["s3:ObjectRemoved:*".to_string()]),
                ..Default::default()
            }]),
            event_bridge_configuration: Some(EventBridgeConfiguration {}),
            ..Default::default()
        };

        assert_eq!(
            serde_json::to_value(&config).unwrap(),
            json!({
                "TopicConfigurations": [{
                    "TopicArn": "arn:aws:sns:us-east-1:123456789012:t",
                    "Events": ["s3:ObjectRemoved:*"]
                }],
                "EventBridgeConfiguration": {}
            })
        );
    }

    #[test]
    fn test_unknown_members_rejected() {
        let misspelled_filter = serde_json::from_value::<LambdaFunctionConfiguration>(json!({
            "LambdaFunctionArn": "A",
            "Events": ["x"],
            "Filters": {"Key": {"FilterRules": [{"Name": "prefix", "Value": "uploads/"}]}}
        }));
        assert!(misspelled_filter.is_err());

        let misspelled_rule = serde_json::from_value::<NotificationFilter>(json!({
            "Key": {"FilterRules": [{"Name": "prefix", "Valeu": "uploads/"}]}
        }));
        assert!(misspelled_rule.is_err());

        let misspelled_list = serde_json::from_value::<NotificationConfiguration>(json!({
            "LambdaConfigurations": []
        }));
        assert!(misspelled_list.is_err());
    }

    #[test]
    fn test_subscription_property_names() {
        assert_eq!(LambdaFunctionConfiguration::ARN_PROPERTY, "LambdaFunctionArn");
        assert_eq!(QueueConfiguration::LIST_PROPERTY, "QueueConfigurations");
        assert_eq!(TopicConfiguration::ARN_PROPERTY, "TopicArn");
    }
}
