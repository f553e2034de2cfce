//! Command-line and environment configuration for the binaries.

use clap::{Args, Parser, Subcommand};
use std::time::Duration;

use crate::common::REGION_DEFAULT;
use crate::inventory::InventoryTarget;
use crate::pricing::{PRICING_REGION_DEFAULT, PRODUCT_FAMILY_DEFAULT, REGION_CODE_DEFAULT};
use crate::query::{
    output_location, PollSettings, DATABASE_DEFAULT, MAX_POLL_ATTEMPTS_DEFAULT,
    POLL_INTERVAL_DEFAULT,
};
use crate::sql::InventoryLocation;

/// Run a query on Athena and print the result rows.
#[derive(Debug, Parser)]
#[command(name = "start-query", version)]
pub struct StartQueryArgs {
    #[arg(long, env = "AWS_REGION", default_value = REGION_DEFAULT)]
    pub region: String,

    /// Bucket that receives the query results.
    #[arg(long, env = "ATHENA_OUTPUT_BUCKET")]
    pub output_bucket: String,

    #[arg(long, env = "ATHENA_OUTPUT_PREFIX")]
    pub output_prefix: Option<String>,

    #[arg(long, env = "ATHENA_DATABASE", default_value = DATABASE_DEFAULT)]
    pub database: String,

    #[arg(long, default_value_t = POLL_INTERVAL_DEFAULT.as_millis() as u64)]
    pub poll_interval_ms: u64,

    /// Status checks before giving up on a query; 0 waits forever.
    #[arg(long, default_value_t = MAX_POLL_ATTEMPTS_DEFAULT)]
    pub max_poll_attempts: u32,

    /// Rows per result page (Athena allows at most 1000).
    #[arg(long, value_parser = clap::value_parser!(i32).range(1..=1000))]
    pub page_size: Option<i32>,

    #[command(subcommand)]
    pub command: QueryCommand,
}

impl StartQueryArgs {
    pub fn output_location(&self) -> String {
        output_location(&self.output_bucket, self.output_prefix.as_deref())
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_millis(self.poll_interval_ms),
            max_attempts: (self.max_poll_attempts > 0).then_some(self.max_poll_attempts),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum QueryCommand {
    /// Run an arbitrary SQL statement.
    Query {
        #[arg(long)]
        sql: String,
    },
    /// Create the Athena table over an inventory report.
    CreateTable(CreateTableArgs),
    /// Price the storage in an inventory table per storage class.
    CostReport(CostReportArgs),
}

#[derive(Debug, Args)]
pub struct CreateTableArgs {
    #[arg(long)]
    pub table: String,

    /// Bucket the inventory report describes.
    #[arg(long)]
    pub source_bucket: String,

    /// Prefix the report is delivered under in the output bucket.
    #[arg(long)]
    pub destination_prefix: String,

    #[arg(long)]
    pub configuration_id: String,

    /// First partition, as `yyyy-MM-dd-HH-mm`.
    #[arg(long)]
    pub start_date: String,
}

impl CreateTableArgs {
    /// Inventory reports are delivered to the same bucket queries write to.
    pub fn location(&self, destination_bucket: &str) -> InventoryLocation {
        InventoryLocation {
            destination_bucket: destination_bucket.to_owned(),
            destination_prefix: self.destination_prefix.clone(),
            source_bucket: self.source_bucket.clone(),
            configuration_id: self.configuration_id.clone(),
        }
    }
}

#[derive(Debug, Args)]
pub struct CostReportArgs {
    #[arg(long)]
    pub table: String,

    #[arg(long, default_value = REGION_CODE_DEFAULT)]
    pub region_code: String,

    #[arg(long, default_value = PRODUCT_FAMILY_DEFAULT)]
    pub product_family: String,

    /// Defaults to CNY in China regions and USD elsewhere.
    #[arg(long)]
    pub currency: Option<String>,

    #[arg(long, env = "PRICING_REGION", default_value = PRICING_REGION_DEFAULT)]
    pub pricing_region: String,
}

/// Register a daily S3 inventory report on a bucket prefix.
#[derive(Debug, Parser)]
#[command(name = "set-bucket-inventory", version)]
pub struct SetBucketInventoryArgs {
    #[arg(long, env = "AWS_REGION", default_value = REGION_DEFAULT)]
    pub region: String,

    /// Bucket to take the inventory of.
    #[arg(long)]
    pub bucket: String,

    /// Only objects under this prefix are listed.
    #[arg(long)]
    pub prefix: String,

    #[arg(long)]
    pub destination_bucket: String,

    #[arg(long)]
    pub destination_prefix: String,
}

impl SetBucketInventoryArgs {
    pub fn target(&self) -> InventoryTarget {
        InventoryTarget {
            bucket: self.bucket.clone(),
            prefix: self.prefix.clone(),
            destination_bucket: self.destination_bucket.clone(),
            destination_prefix: self.destination_prefix.clone(),
        }
    }
}
