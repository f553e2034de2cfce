use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};

use s3_inventory_analytics::common::utils::{init_tracing, interruptible, load_aws_config};
use s3_inventory_analytics::config::{QueryCommand, StartQueryArgs};
use s3_inventory_analytics::pricing::{default_currency, PricingLookup};
use s3_inventory_analytics::query::{AthenaQueryService, QueryRequest, QueryRunner, RunSummary};
use s3_inventory_analytics::sql::{cost_analytics_sql, create_inventory_table_sql};
use s3_inventory_analytics::Result;

/// Builds the query text for the chosen command. Only the cost report needs
/// a service call of its own.
async fn query_text(args: &StartQueryArgs) -> Result<String> {
    match &args.command {
        QueryCommand::Query { sql } => Ok(sql.clone()),
        QueryCommand::CreateTable(table) => Ok(create_inventory_table_sql(
            &table.table,
            &table.location(&args.output_bucket),
            &table.start_date,
        )),
        QueryCommand::CostReport(report) => {
            let config = load_aws_config(&report.pricing_region).await;
            let lookup = PricingLookup::new(aws_sdk_pricing::Client::new(&config));
            let currency = report
                .currency
                .as_deref()
                .unwrap_or_else(|| default_currency(&report.region_code));

            let prices = lookup
                .storage_prices(&report.product_family, &report.region_code, currency)
                .await?;
            if prices.is_empty() {
                warn!("No storage prices found, every storage class will cost 0");
            }

            Ok(cost_analytics_sql(&report.table, &prices))
        }
    }
}

async fn run_query(args: &StartQueryArgs) -> Result<RunSummary> {
    let request = QueryRequest::new(query_text(args).await?, args.output_location())
        .with_database(&args.database);

    let config = load_aws_config(&args.region).await;
    let service = AthenaQueryService::new(aws_sdk_athena::Client::new(&config))
        .with_page_size(args.page_size);
    let runner = QueryRunner::with_poll_settings(service, args.poll_settings());

    runner.run(&request, &mut std::io::stdout()).await
}

/// Ctrl-C anywhere in the run, price lookup included, ends it as interrupted.
#[tracing::instrument(skip_all)]
async fn process_request(args: StartQueryArgs) -> Result<RunSummary> {
    interruptible(run_query(&args), tokio::signal::ctrl_c()).await
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let args = StartQueryArgs::parse();

    match process_request(args).await {
        Ok(summary) => {
            info!(
                "Query {} returned {} rows in {} pages",
                summary.job_id, summary.rows, summary.pages
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}
