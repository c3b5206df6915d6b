use std::sync::Arc;

use resilient_http::{
    ClientOptions, Error, HttpClient, RequestInfo, RequestListener, RequestOptions,
};
use serde_json::{json, Value};

struct PrintRetries;

impl RequestListener for PrintRetries {
    fn on_retry(&self, error: &Error, info: &RequestInfo<'_>) {
        println!("retrying {} {}: {error}", info.method, info.url);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let options = ClientOptions::from_env()?
        .with_retry_attempts(3)
        .with_listener(Arc::new(PrintRetries));
    let client = HttpClient::new(options);

    let created: Option<Value> = client
        .post("items", RequestOptions::new().json(&json!({"name": "Kit"}))?)
        .await?;
    println!("created: {created:?}");

    let items: Option<Value> = client
        .get("items", RequestOptions::new().query("limit", "10"))
        .await?;
    println!("items: {items:?}");

    Ok(())
}
