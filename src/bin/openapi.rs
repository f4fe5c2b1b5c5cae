use anyhow::Result;

// Print the OpenAPI document, for client generation and docs.
fn main() -> Result<()> {
    let doc = tally::api::openapi();
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}
