//! Signs a JSON payload the way Expo does and posts it to a relay endpoint.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use expo_relay::webhook::{EXPO_SIGNATURE_HEADER, SIGNATURE_HEADER, sign};
use reqwest::header::CONTENT_TYPE;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON file to send as the body
    #[arg(long)]
    payload: PathBuf,

    /// Endpoint to send the payload to, e.g. http://localhost:8080/build
    #[arg(long)]
    endpoint: String,

    /// Secret to sign the payload with
    #[arg(long, env = "EXPO_HMAC_SECRET")]
    hmac_secret: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    anyhow::ensure!(!args.hmac_secret.is_empty(), "hmac-secret is required");

    let payload = tokio::fs::read(&args.payload)
        .await
        .with_context(|| format!("failed to read {}", args.payload.display()))?;
    let signature = sign(&args.hmac_secret, &payload).context("failed to sign payload")?;

    let response = reqwest::Client::new()
        .post(&args.endpoint)
        .header(CONTENT_TYPE, "application/json")
        .header(EXPO_SIGNATURE_HEADER, &signature)
        .header(SIGNATURE_HEADER, &signature)
        .body(payload)
        .send()
        .await
        .context("failed to post payload")?;

    let status = response.status();
    let body = response.text().await.context("failed to read response")?;
    println!("POST {}: {}", args.endpoint, status.as_u16());
    println!("{body}");
    Ok(())
}
