//! Athena statements over S3 inventory reports.

use crate::pricing::PriceTable;

/// Where S3 delivers the Hive-compatible symlinks of an inventory report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryLocation {
    pub destination_bucket: String,
    pub destination_prefix: String,
    pub source_bucket: String,
    pub configuration_id: String,
}

impl InventoryLocation {
    pub fn hive_uri(&self) -> String {
        format!(
            "s3://{}/{}/{}/{}/hive/",
            self.destination_bucket,
            self.destination_prefix.trim_matches('/'),
            self.source_bucket,
            self.configuration_id
        )
    }
}

/// External table over a CSV inventory report, with `dt` partitions
/// projected daily from `start_date` (`yyyy-MM-dd-HH-mm`) until now.
pub fn create_inventory_table_sql(
    table: &str,
    location: &InventoryLocation,
    start_date: &str,
) -> String {
    format!(
        "CREATE EXTERNAL TABLE {table}(\
         bucket string, \
         key string, \
         is_latest boolean, \
         size string, \
         last_modified_date string, \
         storage_class string\
         ) PARTITIONED BY (dt string) \
         ROW FORMAT SERDE 'org.apache.hadoop.hive.serde2.OpenCSVSerde' \
         STORED AS INPUTFORMAT 'org.apache.hadoop.hive.ql.io.SymlinkTextInputFormat' \
         OUTPUTFORMAT 'org.apache.hadoop.hive.ql.io.IgnoreKeyTextOutputFormat' \
         LOCATION '{location}' \
         TBLPROPERTIES (\
         \"projection.enabled\" = \"true\", \
         \"projection.dt.type\" = \"date\", \
         \"projection.dt.format\" = \"yyyy-MM-dd-HH-mm\", \
         \"projection.dt.range\" = \"{start_date},NOW\", \
         \"projection.dt.interval\" = \"1\", \
         \"projection.dt.interval.unit\" = \"DAYS\"\
         );",
        location = location.hive_uri(),
    )
}

/// Gigabytes, unit price and cost per storage class. Classes missing from
/// `prices` cost zero.
pub fn cost_analytics_sql(table: &str, prices: &PriceTable) -> String {
    let cases: String = prices
        .iter()
        .map(|(tag, price)| {
            format!(
                "when storage_class='{}' then {price:.6} ",
                tag.replace('\'', "''")
            )
        })
        .collect();

    format!(
        "select GB,storage_class, GB*price as cost, price from\n\
         (select GB,storage_class, case {cases}else 0 end as price\n    \
         from\n\
         (select sum(size)/1073741824 as GB, storage_class from {table} group by storage_class))"
    )
}
