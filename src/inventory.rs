//! S3 bucket inventory reports: a daily CSV listing of the current objects
//! under a prefix, delivered to a destination bucket.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    InventoryConfiguration, InventoryDestination, InventoryFilter, InventoryFormat,
    InventoryFrequency, InventoryIncludedObjectVersions, InventoryOptionalField,
    InventoryS3BucketDestination, InventorySchedule,
};
use tracing::info;
use uuid::Uuid;

use crate::common::errors::{Error, Result};
use crate::common::utils::service_message;

pub const OPTIONAL_FIELDS: [InventoryOptionalField; 10] = [
    InventoryOptionalField::StorageClass,
    InventoryOptionalField::LastModifiedDate,
    InventoryOptionalField::ETag,
    InventoryOptionalField::IsMultipartUploaded,
    InventoryOptionalField::ReplicationStatus,
    InventoryOptionalField::EncryptionStatus,
    InventoryOptionalField::ObjectLockRetainUntilDate,
    InventoryOptionalField::ObjectLockMode,
    InventoryOptionalField::ObjectLockLegalHoldStatus,
    InventoryOptionalField::Size,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryTarget {
    pub bucket: String,
    pub prefix: String,
    pub destination_bucket: String,
    pub destination_prefix: String,
}

/// Object store calls needed to register an inventory report.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn put_marker(&self, bucket: &str, key: &str) -> Result<()>;

    async fn put_inventory_configuration(
        &self,
        bucket: &str,
        configuration: InventoryConfiguration,
    ) -> Result<()>;
}

#[async_trait]
impl InventoryStore for aws_sdk_s3::Client {
    async fn put_marker(&self, bucket: &str, key: &str) -> Result<()> {
        self.put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from_static(b""))
            .send()
            .await
            .map_err(|err| Error::Configuration(service_message(&err)))?;
        Ok(())
    }

    async fn put_inventory_configuration(
        &self,
        bucket: &str,
        configuration: InventoryConfiguration,
    ) -> Result<()> {
        self.put_bucket_inventory_configuration()
            .bucket(bucket)
            .id(configuration.id())
            .inventory_configuration(configuration)
            .send()
            .await
            .map_err(|err| Error::Configuration(service_message(&err)))?;
        Ok(())
    }
}

/// Configuration id: the source prefix followed by eight random hex digits.
pub fn configuration_id(prefix: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{prefix}{}", &suffix[..8])
}

pub fn destination_marker_key(destination_prefix: &str) -> String {
    format!("{}/", destination_prefix.trim_end_matches('/'))
}

pub fn inventory_configuration(id: &str, target: &InventoryTarget) -> Result<InventoryConfiguration> {
    let s3_destination = InventoryS3BucketDestination::builder()
        .bucket(format!("arn:aws:s3:::{}", target.destination_bucket))
        .prefix(&target.destination_prefix)
        .format(InventoryFormat::Csv)
        .build()?;
    let destination = InventoryDestination::builder()
        .s3_bucket_destination(s3_destination)
        .build();
    let filter = InventoryFilter::builder().prefix(&target.prefix).build()?;
    let schedule = InventorySchedule::builder()
        .frequency(InventoryFrequency::Daily)
        .build()?;

    let configuration = InventoryConfiguration::builder()
        .id(id)
        .is_enabled(true)
        .filter(filter)
        .destination(destination)
        .set_optional_fields(Some(OPTIONAL_FIELDS.to_vec()))
        .included_object_versions(InventoryIncludedObjectVersions::Current)
        .schedule(schedule)
        .build()?;

    Ok(configuration)
}

pub struct InventoryConfigurator<S> {
    store: S,
}

impl<S: InventoryStore> InventoryConfigurator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Writes the destination prefix marker, then registers a new inventory
    /// configuration on the source bucket. Returns the configuration id.
    #[tracing::instrument(skip(self))]
    pub async fn configure(&self, target: &InventoryTarget) -> Result<String> {
        let marker = destination_marker_key(&target.destination_prefix);
        info!("Creating destination prefix s3://{}/{}", target.destination_bucket, marker);
        self.store
            .put_marker(&target.destination_bucket, &marker)
            .await?;

        let id = configuration_id(&target.prefix);
        let configuration = inventory_configuration(&id, target)?;

        info!("Registering inventory configuration {}", id);
        self.store
            .put_inventory_configuration(&target.bucket, configuration)
            .await?;

        Ok(id)
    }
}
