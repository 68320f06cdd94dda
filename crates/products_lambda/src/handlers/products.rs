use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use products_core::contract::{
    decode_product_fields, MalformedInput, ProductFields, BAD_REQUEST_MESSAGE,
    PRODUCT_NOT_FOUND_MESSAGE,
};
use products_core::ids::IdGenerator;
use products_core::routing::{resolve_route, Operation, RouteRequest, ID_PATH_PARAMETER};
use products_core::service::{ProductError, ProductService};
use products_core::store::{ProductStore, StoreUnavailable};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::logging::{log_error, log_info};

/// The subset of an API Gateway REST proxy event the router consumes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiGatewayProxyRequest {
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub http_method: String,
    #[serde(default)]
    pub path_parameters: Option<HashMap<String, String>>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub is_base64_encoded: Option<bool>,
    #[serde(default)]
    pub request_context: Option<ProxyRequestContext>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRequestContext {
    #[serde(default)]
    pub request_id: Option<String>,
}

impl ApiGatewayProxyRequest {
    pub fn api_request_id(&self) -> Option<&str> {
        self.request_context
            .as_ref()
            .and_then(|context| context.request_id.as_deref())
    }

    fn route_request(&self) -> RouteRequest<'_> {
        RouteRequest {
            resource: self.resource.as_deref(),
            path: self.path.as_deref(),
            method: &self.http_method,
            id_parameter: self
                .path_parameters
                .as_ref()
                .and_then(|parameters| parameters.get(ID_PATH_PARAMETER))
                .map(String::as_str),
        }
    }

    fn decoded_body(&self) -> Result<Option<String>, MalformedInput> {
        let Some(body) = self.body.as_deref() else {
            return Ok(None);
        };
        if !self.is_base64_encoded.unwrap_or(false) {
            return Ok(Some(body.to_string()));
        }

        let bytes = BASE64_STANDARD
            .decode(body)
            .map_err(|error| MalformedInput::new(format!("invalid base64 body: {error}")))?;
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|error| MalformedInput::new(format!("body is not UTF-8: {error}")))
    }

    fn product_fields(&self) -> Result<ProductFields, MalformedInput> {
        let body = self.decoded_body()?;
        decode_product_fields(body.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiGatewayResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub headers: Value,
    pub body: String,
}

/// Routes one proxy event to exactly one product operation.
///
/// Not-found, bad-route and malformed-body outcomes become responses. A
/// store failure is returned as `Err` so the invocation itself fails.
pub fn handle_products_event<S: ProductStore, G: IdGenerator>(
    request: &ApiGatewayProxyRequest,
    service: &ProductService<S, G>,
) -> Result<ApiGatewayResponse, StoreUnavailable> {
    let route = match resolve_route(&request.route_request()) {
        Ok(value) => value,
        Err(error) => {
            log_info(
                "bad_route",
                json!({
                    "api_request_id": request.api_request_id(),
                    "message": error.to_string(),
                }),
            );
            return Ok(bad_request_response());
        }
    };

    log_info(
        "request_dispatched",
        json!({
            "api_request_id": request.api_request_id(),
            "operation": route.operation.as_str(),
            "request": route.describe(),
        }),
    );

    let product_id = route.product_id.as_deref().unwrap_or_default();
    let outcome = match route.operation {
        Operation::ListProducts => service
            .list()
            .map(|products| success_response(200, &products)),
        Operation::CreateProduct => match request.product_fields() {
            Ok(fields) => service
                .create(fields)
                .map(|product| success_response(201, &product)),
            Err(error) => return Ok(malformed_input_response(&error)),
        },
        Operation::GetProduct => service
            .get(product_id)
            .map(|product| success_response(200, &product)),
        Operation::UpdateProduct => match request.product_fields() {
            Ok(fields) => service
                .update(product_id, &fields)
                .map(|product| success_response(200, &product)),
            Err(error) => return Ok(malformed_input_response(&error)),
        },
        Operation::DeleteProduct => service
            .delete(product_id)
            .map(|product| success_response(200, &product)),
    };

    match outcome {
        Ok(response) => Ok(response),
        Err(ProductError::NotFound) => {
            log_error(
                "product_not_found",
                json!({
                    "api_request_id": request.api_request_id(),
                    "operation": route.operation.as_str(),
                    "product_id": product_id,
                    "message": PRODUCT_NOT_FOUND_MESSAGE,
                }),
            );
            Ok(not_found_response())
        }
        Err(ProductError::Unavailable(error)) => {
            log_error(
                "store_unavailable",
                json!({
                    "api_request_id": request.api_request_id(),
                    "operation": route.operation.as_str(),
                    "message": error.message(),
                }),
            );
            Err(error)
        }
    }
}

pub fn bad_request_response() -> ApiGatewayResponse {
    error_response(400, json!({ "message": BAD_REQUEST_MESSAGE }))
}

fn malformed_input_response(error: &MalformedInput) -> ApiGatewayResponse {
    log_info("malformed_input", json!({ "message": error.message() }));
    error_response(
        400,
        json!({ "message": format!("Malformed request: {}", error.message()) }),
    )
}

fn not_found_response() -> ApiGatewayResponse {
    ApiGatewayResponse {
        status_code: 404,
        headers: json!({"Content-Type": "text/plain"}),
        body: PRODUCT_NOT_FOUND_MESSAGE.to_string(),
    }
}

fn success_response(status_code: u16, payload: &impl Serialize) -> ApiGatewayResponse {
    match serde_json::to_string(payload) {
        Ok(body) => ApiGatewayResponse {
            status_code,
            headers: json!({"Content-Type": "application/json"}),
            body,
        },
        Err(error) => error_response(
            500,
            json!({
                "error": "serialization_error",
                "message": error.to_string(),
            }),
        ),
    }
}

fn error_response(status_code: u16, payload: Value) -> ApiGatewayResponse {
    ApiGatewayResponse {
        status_code,
        headers: json!({"Content-Type": "application/json"}),
        body: payload.to_string(),
    }
}
