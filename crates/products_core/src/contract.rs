use serde::{Deserialize, Serialize};

pub const PRODUCT_NOT_FOUND_MESSAGE: &str = "Product not found";
pub const BAD_REQUEST_MESSAGE: &str = "Bad request";

/// Mutable part of a product. An update always replaces all four fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductFields {
    pub product_name: String,
    pub code: String,
    pub price: f64,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: String,
    #[serde(flatten)]
    pub fields: ProductFields,
}

impl Product {
    pub fn new(id: impl Into<String>, fields: ProductFields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedInput {
    message: String,
}

impl MalformedInput {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for MalformedInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for MalformedInput {}

/// Decodes a create/update body into the mutable product fields.
///
/// Unknown keys are ignored, which includes any client-supplied `id`: ids
/// are assigned on create and taken from the path on update.
pub fn decode_product_fields(body: Option<&str>) -> Result<ProductFields, MalformedInput> {
    let Some(text) = body else {
        return Err(MalformedInput::new("Request body is required"));
    };

    serde_json::from_str(text).map_err(|error| MalformedInput::new(format!("{error}")))
}
