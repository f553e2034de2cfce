use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};

use s3_inventory_analytics::common::utils::{init_tracing, load_aws_config};
use s3_inventory_analytics::config::SetBucketInventoryArgs;
use s3_inventory_analytics::inventory::InventoryConfigurator;
use s3_inventory_analytics::Result;

#[tracing::instrument(skip_all)]
async fn process_request(args: SetBucketInventoryArgs) -> Result<String> {
    let config = load_aws_config(&args.region).await;
    let configurator = InventoryConfigurator::new(aws_sdk_s3::Client::new(&config));

    configurator.configure(&args.target()).await
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let args = SetBucketInventoryArgs::parse();

    match process_request(args).await {
        Ok(id) => {
            info!("Inventory configuration id: {}", id);
            println!("Done!");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}
