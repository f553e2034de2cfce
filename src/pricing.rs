//! Storage-class unit prices from the AWS Pricing catalog.

use async_trait::async_trait;
use aws_sdk_pricing::types::{Filter, FilterType};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use crate::common::errors::{Error, Result};
use crate::common::utils::service_message;

pub const SERVICE_CODE: &str = "AmazonS3";
pub const PRODUCT_FAMILY_DEFAULT: &str = "Storage";
pub const REGION_CODE_DEFAULT: &str = "cn-north-1";
/// The Pricing API is only served from a few regions.
pub const PRICING_REGION_DEFAULT: &str = "us-east-1";

/// Currency the catalog quotes prices in for `region_code`.
pub fn default_currency(region_code: &str) -> &'static str {
    if region_code.starts_with("cn-") {
        "CNY"
    } else {
        "USD"
    }
}

/// `"Standard - Infrequent Access"` becomes `"STANDARD_-_INFREQUENT_ACCESS"`.
pub fn normalize_storage_tag(volume_type: &str) -> String {
    volume_type.replace(' ', "_").to_uppercase()
}

/// Unit price per normalized storage-class tag, ordered by tag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceTable(BTreeMap<String, f64>);

impl PriceTable {
    pub fn insert(&mut self, tag: String, price: f64) {
        self.0.insert(tag, price);
    }

    pub fn get(&self, tag: &str) -> Option<f64> {
        self.0.get(tag).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(tag, price)| (tag.as_str(), *price))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct PriceDescription {
    product: Product,
    #[serde(default)]
    terms: Terms,
}

#[derive(Debug, Deserialize)]
struct Product {
    #[serde(default)]
    attributes: HashMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
struct Terms {
    #[serde(rename = "OnDemand", default)]
    on_demand: BTreeMap<String, Term>,
}

#[derive(Debug, Deserialize)]
struct Term {
    #[serde(rename = "priceDimensions", default)]
    price_dimensions: BTreeMap<String, PriceDimension>,
}

#[derive(Debug, Deserialize)]
struct PriceDimension {
    #[serde(rename = "beginRange")]
    begin_range: Option<String>,
    #[serde(rename = "pricePerUnit", default)]
    price_per_unit: HashMap<String, String>,
}

/// Extracts `(tag, unit price)` from one catalog entry. Entries without a
/// volume type or without a price in `currency` yield `None`. With tiered
/// pricing the tier starting at zero wins.
pub fn parse_price_entry(blob: &str, currency: &str) -> Result<Option<(String, f64)>> {
    let description: PriceDescription =
        serde_json::from_str(blob).map_err(|err| Error::Pricing(err.to_string()))?;

    let Some(volume_type) = description.product.attributes.get("volumeType") else {
        return Ok(None);
    };

    let priced: Vec<&PriceDimension> = description
        .terms
        .on_demand
        .values()
        .flat_map(|term| term.price_dimensions.values())
        .filter(|dimension| dimension.price_per_unit.contains_key(currency))
        .collect();
    let Some(dimension) = priced
        .iter()
        .find(|dimension| dimension.begin_range.as_deref() == Some("0"))
        .or(priced.first())
    else {
        return Ok(None);
    };

    let Some(raw) = dimension.price_per_unit.get(currency) else {
        return Ok(None);
    };
    let price = raw
        .parse::<f64>()
        .map_err(|err| Error::Pricing(format!("invalid {currency} price {raw:?}: {err}")))?;

    Ok(Some((normalize_storage_tag(volume_type), price)))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductFilter {
    pub field: String,
    pub value: String,
}

impl ProductFilter {
    pub fn term_match(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductPage {
    pub price_list: Vec<String>,
    pub next_token: Option<String>,
}

/// A catalog of product price descriptions.
#[async_trait]
pub trait PriceCatalog: Send + Sync {
    async fn products_page(
        &self,
        service_code: &str,
        filters: &[ProductFilter],
        next_token: Option<String>,
    ) -> Result<ProductPage>;
}

#[async_trait]
impl PriceCatalog for aws_sdk_pricing::Client {
    async fn products_page(
        &self,
        service_code: &str,
        filters: &[ProductFilter],
        next_token: Option<String>,
    ) -> Result<ProductPage> {
        let filters = filters
            .iter()
            .map(|filter| {
                Filter::builder()
                    .r#type(FilterType::TermMatch)
                    .field(&filter.field)
                    .value(&filter.value)
                    .build()
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let output = self
            .get_products()
            .service_code(service_code)
            .set_filters(Some(filters))
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|err| Error::Pricing(service_message(&err)))?;

        Ok(ProductPage {
            price_list: output.price_list().to_vec(),
            next_token: output.next_token().map(str::to_owned),
        })
    }
}

pub struct PricingLookup<C> {
    catalog: C,
}

impl<C: PriceCatalog> PricingLookup<C> {
    pub fn new(catalog: C) -> Self {
        Self { catalog }
    }

    /// Builds the price table for one product family in one region, walking
    /// every page of the catalog.
    #[tracing::instrument(skip(self))]
    pub async fn storage_prices(
        &self,
        product_family: &str,
        region_code: &str,
        currency: &str,
    ) -> Result<PriceTable> {
        let filters = [
            ProductFilter::term_match("productFamily", product_family),
            ProductFilter::term_match("regionCode", region_code),
        ];

        let mut table = PriceTable::default();
        let mut next_token = None;
        loop {
            let page = self
                .catalog
                .products_page(SERVICE_CODE, &filters, next_token)
                .await?;

            for blob in &page.price_list {
                match parse_price_entry(blob, currency)? {
                    Some((tag, price)) => table.insert(tag, price),
                    None => debug!("Skipping catalog entry without a {currency} storage price"),
                }
            }

            next_token = page.next_token.filter(|token| !token.is_empty());
            if next_token.is_none() {
                break;
            }
        }

        info!("Loaded {} storage prices", table.len());
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn entry(volume_type: &str, currency: &str, price: &str) -> String {
        format!(
            r#"{{"product":{{"productFamily":"Storage","attributes":{{"volumeType":"{volume_type}","regionCode":"cn-north-1"}},"sku":"SKU1"}},
            "serviceCode":"AmazonS3",
            "terms":{{"OnDemand":{{"SKU1.TERM":{{"priceDimensions":{{"SKU1.TERM.RATE":{{"unit":"GB-Mo","beginRange":"0","endRange":"Inf","pricePerUnit":{{"{currency}":"{price}"}}}}}}}}}}}}}}"#
        )
    }

    #[test]
    fn infrequent_access_tag_is_normalized() {
        let blob = entry("Standard - Infrequent Access", "CNY", "0.02");

        let parsed = parse_price_entry(&blob, "CNY").unwrap();

        assert_eq!(
            parsed,
            Some(("STANDARD_-_INFREQUENT_ACCESS".to_owned(), 0.02))
        );
    }

    #[test]
    fn first_tier_wins_for_tiered_prices() {
        let blob = r#"{
            "product": {"attributes": {"volumeType": "Standard"}},
            "terms": {"OnDemand": {"T": {"priceDimensions": {
                "A": {"beginRange": "51200", "pricePerUnit": {"USD": "0.022"}},
                "B": {"beginRange": "0", "pricePerUnit": {"USD": "0.023"}}
            }}}}
        }"#;

        assert_eq!(
            parse_price_entry(blob, "USD").unwrap(),
            Some(("STANDARD".to_owned(), 0.023))
        );
    }

    #[test]
    fn entries_without_volume_type_or_currency_are_skipped() {
        let no_volume = r#"{"product": {"attributes": {"storageClass": "Tags"}}}"#;
        assert_eq!(parse_price_entry(no_volume, "CNY").unwrap(), None);

        let other_currency = entry("Standard", "USD", "0.023");
        assert_eq!(parse_price_entry(&other_currency, "CNY").unwrap(), None);
    }

    #[test]
    fn malformed_entries_are_pricing_errors() {
        assert!(matches!(
            parse_price_entry("not json", "CNY"),
            Err(Error::Pricing(_))
        ));
        assert!(matches!(
            parse_price_entry(&entry("Standard", "CNY", "cheap"), "CNY"),
            Err(Error::Pricing(msg)) if msg.contains("cheap")
        ));
    }

    #[test]
    fn currency_follows_partition() {
        assert_eq!(default_currency("cn-north-1"), "CNY");
        assert_eq!(default_currency("cn-northwest-1"), "CNY");
        assert_eq!(default_currency("us-west-2"), "USD");
    }

    struct PagedCatalog {
        pages: Vec<ProductPage>,
        requests: Mutex<Vec<(Vec<ProductFilter>, Option<String>)>>,
    }

    #[async_trait]
    impl PriceCatalog for PagedCatalog {
        async fn products_page(
            &self,
            service_code: &str,
            filters: &[ProductFilter],
            next_token: Option<String>,
        ) -> Result<ProductPage> {
            assert_eq!(service_code, SERVICE_CODE);
            let mut requests = self.requests.lock().unwrap();
            let page = self.pages[requests.len()].clone();
            requests.push((filters.to_vec(), next_token));
            Ok(page)
        }
    }

    #[tokio::test]
    async fn lookup_walks_all_pages_and_later_entries_win() {
        let catalog = PagedCatalog {
            pages: vec![
                ProductPage {
                    price_list: vec![
                        entry("Standard", "CNY", "0.1755"),
                        entry("Glacier", "CNY", "0.05"),
                    ],
                    next_token: Some("page-2".into()),
                },
                ProductPage {
                    price_list: vec![entry("Standard", "CNY", "0.17")],
                    next_token: None,
                },
            ],
            requests: Mutex::new(Vec::new()),
        };
        let lookup = PricingLookup::new(catalog);

        let table = lookup
            .storage_prices(PRODUCT_FAMILY_DEFAULT, REGION_CODE_DEFAULT, "CNY")
            .await
            .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.get("STANDARD"), Some(0.17));
        assert_eq!(table.get("GLACIER"), Some(0.05));

        let requests = lookup.catalog.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests[0].0,
            vec![
                ProductFilter::term_match("productFamily", "Storage"),
                ProductFilter::term_match("regionCode", "cn-north-1"),
            ]
        );
        assert_eq!(requests[0].1, None);
        assert_eq!(requests[1].1.as_deref(), Some("page-2"));
    }
}
