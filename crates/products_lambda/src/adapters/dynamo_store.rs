use std::collections::HashMap;
use std::future::Future;

use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use products_core::contract::{Product, ProductFields};
use products_core::store::{ProductStore, StoreUnavailable};

use crate::config::ProductsLambdaConfig;

pub const ID_ATTRIBUTE: &str = "id";
pub const PRODUCT_NAME_ATTRIBUTE: &str = "productName";
pub const CODE_ATTRIBUTE: &str = "code";
pub const PRICE_ATTRIBUTE: &str = "price";
pub const MODEL_ATTRIBUTE: &str = "model";

const KEY_EXISTS_CONDITION: &str = "attribute_exists(id)";
const REPLACE_FIELDS_EXPRESSION: &str =
    "SET productName = :productName, code = :code, price = :price, model = :model";

pub type Item = HashMap<String, AttributeValue>;

/// Product table keyed by the `id` string attribute.
pub struct DynamoProductStore {
    client: aws_sdk_dynamodb::Client,
    table_name: String,
}

impl DynamoProductStore {
    pub fn new(client: aws_sdk_dynamodb::Client, config: &ProductsLambdaConfig) -> Self {
        Self {
            client,
            table_name: config.table_name.clone(),
        }
    }

    fn key(id: &str) -> AttributeValue {
        AttributeValue::S(id.to_string())
    }
}

impl ProductStore for DynamoProductStore {
    /// Follows `LastEvaluatedKey` until the table is exhausted. A single
    /// stored item that fails to decode fails the whole listing as
    /// `StoreUnavailable`; no partial list is returned.
    fn scan_all(&self) -> Result<Vec<Product>, StoreUnavailable> {
        let items: Vec<Item> = block_on(
            self.client
                .scan()
                .table_name(&self.table_name)
                .into_paginator()
                .items()
                .send()
                .collect::<Result<Vec<_>, _>>(),
        )
        .map_err(|error| {
            StoreUnavailable::new(format!(
                "failed to scan products table: {}",
                DisplayErrorContext(&error)
            ))
        })?;

        items.iter().map(product_from_item).collect()
    }

    fn get(&self, id: &str) -> Result<Option<Product>, StoreUnavailable> {
        let output = block_on(
            self.client
                .get_item()
                .table_name(&self.table_name)
                .key(ID_ATTRIBUTE, Self::key(id))
                .send(),
        )
        .map_err(|error| {
            StoreUnavailable::new(format!(
                "failed to get product: {}",
                DisplayErrorContext(&error)
            ))
        })?;

        output.item().map(product_from_item).transpose()
    }

    fn put(&self, product: &Product) -> Result<(), StoreUnavailable> {
        block_on(
            self.client
                .put_item()
                .table_name(&self.table_name)
                .set_item(Some(product_to_item(product)))
                .send(),
        )
        .map(|_| ())
        .map_err(|error| {
            StoreUnavailable::new(format!(
                "failed to put product: {}",
                DisplayErrorContext(&error)
            ))
        })
    }

    fn update_existing(
        &self,
        id: &str,
        fields: &ProductFields,
    ) -> Result<Option<ProductFields>, StoreUnavailable> {
        let result = block_on(
            self.client
                .update_item()
                .table_name(&self.table_name)
                .key(ID_ATTRIBUTE, Self::key(id))
                .condition_expression(KEY_EXISTS_CONDITION)
                .update_expression(REPLACE_FIELDS_EXPRESSION)
                .set_expression_attribute_values(Some(update_values(fields)))
                .return_values(ReturnValue::UpdatedNew)
                .send(),
        );

        match result {
            Ok(output) => match output.attributes() {
                Some(attributes) => fields_from_item(attributes).map(Some),
                None => Ok(Some(fields.clone())),
            },
            Err(error)
                if error
                    .as_service_error()
                    .is_some_and(|service| service.is_conditional_check_failed_exception()) =>
            {
                Ok(None)
            }
            Err(error) => Err(StoreUnavailable::new(format!(
                "failed to update product: {}",
                DisplayErrorContext(&error)
            ))),
        }
    }

    fn delete_existing(&self, id: &str) -> Result<Option<Product>, StoreUnavailable> {
        let result = block_on(
            self.client
                .delete_item()
                .table_name(&self.table_name)
                .key(ID_ATTRIBUTE, Self::key(id))
                .condition_expression(KEY_EXISTS_CONDITION)
                .return_values(ReturnValue::AllOld)
                .send(),
        );

        match result {
            Ok(output) => match output.attributes() {
                Some(attributes) if !attributes.is_empty() => {
                    product_from_item(attributes).map(Some)
                }
                _ => Ok(None),
            },
            Err(error)
                if error
                    .as_service_error()
                    .is_some_and(|service| service.is_conditional_check_failed_exception()) =>
            {
                Ok(None)
            }
            Err(error) => Err(StoreUnavailable::new(format!(
                "failed to delete product: {}",
                DisplayErrorContext(&error)
            ))),
        }
    }
}

/// Runs an SDK future from the synchronous store trait. Requires the
/// multi-threaded runtime the Lambda entry point starts.
fn block_on<F: Future>(future: F) -> F::Output {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

pub fn product_to_item(product: &Product) -> Item {
    HashMap::from([
        (ID_ATTRIBUTE.to_string(), AttributeValue::S(product.id.clone())),
        (
            PRODUCT_NAME_ATTRIBUTE.to_string(),
            AttributeValue::S(product.fields.product_name.clone()),
        ),
        (
            CODE_ATTRIBUTE.to_string(),
            AttributeValue::S(product.fields.code.clone()),
        ),
        (
            PRICE_ATTRIBUTE.to_string(),
            AttributeValue::N(product.fields.price.to_string()),
        ),
        (
            MODEL_ATTRIBUTE.to_string(),
            AttributeValue::S(product.fields.model.clone()),
        ),
    ])
}

pub fn product_from_item(item: &Item) -> Result<Product, StoreUnavailable> {
    Ok(Product::new(
        string_attribute(item, ID_ATTRIBUTE)?,
        fields_from_item(item)?,
    ))
}

pub fn fields_from_item(item: &Item) -> Result<ProductFields, StoreUnavailable> {
    Ok(ProductFields {
        product_name: string_attribute(item, PRODUCT_NAME_ATTRIBUTE)?,
        code: string_attribute(item, CODE_ATTRIBUTE)?,
        price: number_attribute(item, PRICE_ATTRIBUTE)?,
        model: string_attribute(item, MODEL_ATTRIBUTE)?,
    })
}

fn update_values(fields: &ProductFields) -> Item {
    HashMap::from([
        (
            ":productName".to_string(),
            AttributeValue::S(fields.product_name.clone()),
        ),
        (":code".to_string(), AttributeValue::S(fields.code.clone())),
        (
            ":price".to_string(),
            AttributeValue::N(fields.price.to_string()),
        ),
        (":model".to_string(), AttributeValue::S(fields.model.clone())),
    ])
}

fn string_attribute(item: &Item, name: &str) -> Result<String, StoreUnavailable> {
    match item.get(name) {
        Some(AttributeValue::S(value)) => Ok(value.clone()),
        Some(_) => Err(StoreUnavailable::new(format!(
            "stored product attribute '{name}' is not a string"
        ))),
        None => Err(StoreUnavailable::new(format!(
            "stored product is missing attribute '{name}'"
        ))),
    }
}

fn number_attribute(item: &Item, name: &str) -> Result<f64, StoreUnavailable> {
    match item.get(name) {
        Some(AttributeValue::N(value)) => value.parse::<f64>().map_err(|error| {
            StoreUnavailable::new(format!(
                "stored product attribute '{name}' is not a valid number: {error}"
            ))
        }),
        Some(_) => Err(StoreUnavailable::new(format!(
            "stored product attribute '{name}' is not a number"
        ))),
        None => Err(StoreUnavailable::new(format!(
            "stored product is missing attribute '{name}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use aws_sdk_dynamodb::config::retry::RetryConfig;
    use aws_sdk_dynamodb::operation::delete_item::{DeleteItemError, DeleteItemOutput};
    use aws_sdk_dynamodb::operation::scan::ScanOutput;
    use aws_sdk_dynamodb::operation::update_item::{UpdateItemError, UpdateItemOutput};
    use aws_sdk_dynamodb::types::error::{
        ConditionalCheckFailedException, ProvisionedThroughputExceededException,
    };
    use aws_sdk_dynamodb::Client;
    use aws_smithy_mocks::{mock, mock_client, Rule, RuleMode};

    use super::*;

    fn sample_product() -> Product {
        Product::new(
            "3f1c",
            ProductFields {
                product_name: "Kettle".to_string(),
                code: "KT-9".to_string(),
                price: 29.99,
                model: "Steel".to_string(),
            },
        )
    }

    #[test]
    fn item_uses_camel_case_attribute_names() {
        let item = product_to_item(&sample_product());

        assert_eq!(item.len(), 5);
        assert_eq!(item["id"], AttributeValue::S("3f1c".to_string()));
        assert_eq!(item["productName"], AttributeValue::S("Kettle".to_string()));
        assert_eq!(item["price"], AttributeValue::N("29.99".to_string()));
    }

    #[test]
    fn item_decodes_back_into_product() {
        let product = sample_product();
        let decoded = product_from_item(&product_to_item(&product)).expect("item should decode");
        assert_eq!(decoded, product);
    }

    #[test]
    fn integral_prices_are_written_without_fraction() {
        let mut product = sample_product();
        product.fields.price = 10.0;
        let item = product_to_item(&product);
        assert_eq!(item["price"], AttributeValue::N("10".to_string()));
    }

    #[test]
    fn update_values_cover_every_mutable_attribute() {
        let values = update_values(&sample_product().fields);
        let mut names: Vec<&str> = values.keys().map(String::as_str).collect();
        names.sort_unstable();

        assert_eq!(names, vec![":code", ":model", ":price", ":productName"]);
        for name in names {
            assert!(REPLACE_FIELDS_EXPRESSION.contains(name));
        }
    }

    #[test]
    fn missing_attribute_is_reported_as_store_failure() {
        let mut item = product_to_item(&sample_product());
        item.remove(MODEL_ATTRIBUTE);

        let error = product_from_item(&item).expect_err("missing model should fail");
        assert_eq!(error.message(), "stored product is missing attribute 'model'");
    }

    #[test]
    fn wrongly_typed_price_is_reported_as_store_failure() {
        let mut item = product_to_item(&sample_product());
        item.insert(
            PRICE_ATTRIBUTE.to_string(),
            AttributeValue::S("cheap".to_string()),
        );

        let error = product_from_item(&item).expect_err("string price should fail");
        assert!(error.message().contains("'price' is not a number"));
    }

    fn mocked_store(rules: &[&Rule]) -> DynamoProductStore {
        let client = mock_client!(aws_sdk_dynamodb, RuleMode::Sequential, rules, |builder| {
            builder.retry_config(RetryConfig::disabled())
        });
        DynamoProductStore::new(
            client,
            &ProductsLambdaConfig {
                table_name: "products".to_string(),
            },
        )
    }

    fn targets(item_key: Option<&Item>, id: &str) -> bool {
        item_key.and_then(|key| key.get(ID_ATTRIBUTE)) == Some(&AttributeValue::S(id.to_string()))
    }

    fn conditional_check_failed() -> ConditionalCheckFailedException {
        ConditionalCheckFailedException::builder()
            .message("The conditional request failed")
            .build()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_of_missing_key_is_none_when_condition_fails() {
        let rule = mock!(Client::update_item)
            .match_requests(|input| {
                input.table_name() == Some("products")
                    && targets(input.key(), "missing")
                    && input.condition_expression() == Some("attribute_exists(id)")
                    && input.return_values() == Some(&ReturnValue::UpdatedNew)
            })
            .then_error(|| {
                UpdateItemError::ConditionalCheckFailedException(conditional_check_failed())
            });
        let store = mocked_store(&[&rule]);

        let result = store.update_existing("missing", &sample_product().fields);

        assert_eq!(result, Ok(None));
        assert_eq!(rule.num_calls(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_decodes_updated_new_attributes() {
        let rule = mock!(Client::update_item)
            .match_requests(|input| {
                targets(input.key(), "3f1c")
                    && input.condition_expression() == Some("attribute_exists(id)")
                    && input.update_expression() == Some(REPLACE_FIELDS_EXPRESSION)
            })
            .then_output(|| {
                let mut attributes = product_to_item(&sample_product());
                attributes.remove(ID_ATTRIBUTE);
                UpdateItemOutput::builder()
                    .set_attributes(Some(attributes))
                    .build()
            });
        let store = mocked_store(&[&rule]);

        let updated = store
            .update_existing("3f1c", &sample_product().fields)
            .expect("update should succeed");

        assert_eq!(updated, Some(sample_product().fields));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn throttled_update_is_store_unavailable() {
        let rule = mock!(Client::update_item).then_error(|| {
            UpdateItemError::ProvisionedThroughputExceededException(
                ProvisionedThroughputExceededException::builder()
                    .message("Rate exceeded")
                    .build(),
            )
        });
        let store = mocked_store(&[&rule]);

        let error = store
            .update_existing("3f1c", &sample_product().fields)
            .expect_err("throttling is not a missing key");

        assert!(error.message().starts_with("failed to update product"));
        assert!(error.message().contains("Rate exceeded"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn delete_of_missing_key_is_none_when_condition_fails() {
        let rule = mock!(Client::delete_item)
            .match_requests(|input| {
                targets(input.key(), "missing")
                    && input.condition_expression() == Some("attribute_exists(id)")
                    && input.return_values() == Some(&ReturnValue::AllOld)
            })
            .then_error(|| {
                DeleteItemError::ConditionalCheckFailedException(conditional_check_failed())
            });
        let store = mocked_store(&[&rule]);

        assert_eq!(store.delete_existing("missing"), Ok(None));
        assert_eq!(rule.num_calls(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn delete_returns_all_old_attributes() {
        let rule = mock!(Client::delete_item)
            .match_requests(|input| {
                targets(input.key(), "3f1c")
                    && input.condition_expression() == Some("attribute_exists(id)")
            })
            .then_output(|| {
                DeleteItemOutput::builder()
                    .set_attributes(Some(product_to_item(&sample_product())))
                    .build()
            });
        let store = mocked_store(&[&rule]);

        assert_eq!(store.delete_existing("3f1c"), Ok(Some(sample_product())));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn throttled_delete_is_store_unavailable() {
        let rule = mock!(Client::delete_item).then_error(|| {
            DeleteItemError::ProvisionedThroughputExceededException(
                ProvisionedThroughputExceededException::builder()
                    .message("Rate exceeded")
                    .build(),
            )
        });
        let store = mocked_store(&[&rule]);

        let error = store
            .delete_existing("3f1c")
            .expect_err("throttling is not a missing key");
        assert!(error.message().starts_with("failed to delete product"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn scan_follows_last_evaluated_key_across_pages() {
        let first = Product::new("first", sample_product().fields);
        let second = Product::new("second", sample_product().fields);
        let first_item = product_to_item(&first);
        let second_item = product_to_item(&second);

        let first_page = mock!(Client::scan)
            .match_requests(|input| {
                input.table_name() == Some("products") && input.exclusive_start_key().is_none()
            })
            .then_output(move || {
                ScanOutput::builder()
                    .items(first_item.clone())
                    .last_evaluated_key(ID_ATTRIBUTE, AttributeValue::S("first".to_string()))
                    .build()
            });
        let second_page = mock!(Client::scan)
            .match_requests(|input| targets(input.exclusive_start_key(), "first"))
            .then_output(move || ScanOutput::builder().items(second_item.clone()).build());
        let store = mocked_store(&[&first_page, &second_page]);

        let products = store.scan_all().expect("scan should succeed");

        assert_eq!(products, vec![first, second]);
        assert_eq!(first_page.num_calls(), 1);
        assert_eq!(second_page.num_calls(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn one_undecodable_item_fails_the_whole_scan() {
        let good = product_to_item(&sample_product());
        let mut bad = product_to_item(&Product::new("broken", sample_product().fields));
        bad.remove(PRICE_ATTRIBUTE);

        let rule = mock!(Client::scan).then_output(move || {
            ScanOutput::builder()
                .items(good.clone())
                .items(bad.clone())
                .build()
        });
        let store = mocked_store(&[&rule]);

        let error = store.scan_all().expect_err("listing should not be partial");
        assert_eq!(error.message(), "stored product is missing attribute 'price'");
    }
}
