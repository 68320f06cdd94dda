pub const PRODUCT_TABLE_ENV: &str = "PRODUCT_DBD";

/// Settings resolved once per cold start and handed to the store adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductsLambdaConfig {
    pub table_name: String,
}

impl ProductsLambdaConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let table_name = lookup(PRODUCT_TABLE_ENV)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| format!("{PRODUCT_TABLE_ENV} must be configured"))?;

        Ok(Self { table_name })
    }
}
