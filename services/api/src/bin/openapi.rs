//! services/api/src/bin/openapi.rs
//!
//! Dumps the box and book REST document to `openapi.json`, or to the path
//! given as the first argument.

use api_lib::web::rest::ApiDoc;
use utoipa::OpenApi;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "openapi.json".to_string());
    let doc = ApiDoc::openapi().to_pretty_json()?;
    std::fs::write(&path, doc)?;
    println!("OpenAPI document written to {}", path);
    Ok(())
}
