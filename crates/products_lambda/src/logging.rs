use serde_json::{json, Value};

const COMPONENT: &str = "products_handler";

pub fn log_info(event: &str, details: Value) {
    eprintln!(
        "{}",
        json!({
            "component": COMPONENT,
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}

pub fn log_error(event: &str, details: Value) {
    eprintln!(
        "{}",
        json!({
            "component": COMPONENT,
            "level": "error",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}
