use lambda_runtime::{service_fn, Error, LambdaEvent};
use products_core::ids::UuidV4Generator;
use products_core::service::ProductService;
use products_lambda::adapters::dynamo_store::DynamoProductStore;
use products_lambda::config::ProductsLambdaConfig;
use products_lambda::handlers::products::{
    handle_products_event, ApiGatewayProxyRequest, ApiGatewayResponse,
};
use products_lambda::logging::log_info;
use serde_json::{json, Value};

type DynamoProductService = ProductService<DynamoProductStore, UuidV4Generator>;

async fn handle_request(
    event: LambdaEvent<Value>,
    service: &DynamoProductService,
) -> Result<ApiGatewayResponse, Error> {
    let request = decode_proxy_event(event.payload)?;

    log_info(
        "invocation_started",
        json!({
            "api_request_id": request.api_request_id(),
            "lambda_request_id": event.context.request_id,
        }),
    );

    handle_products_event(&request, service).map_err(|error| Error::from(error.to_string()))
}

fn decode_proxy_event(payload: Value) -> Result<ApiGatewayProxyRequest, Error> {
    serde_json::from_value(payload)
        .map_err(|error| Error::from(format!("invalid api gateway proxy event: {error}")))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = ProductsLambdaConfig::from_env().map_err(Error::from)?;
    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let store = DynamoProductStore::new(aws_sdk_dynamodb::Client::new(&aws_config), &config);
    let service = ProductService::new(store, UuidV4Generator);
    let service = &service;

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_request(event, service).await
    }))
    .await
}
