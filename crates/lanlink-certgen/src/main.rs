//! lanlink-certgen — issue and self-verify a self-signed certificate.
//!
//! Usage: lanlink-certgen [hostname] [output-dir]

use std::path::PathBuf;

use anyhow::Result;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let hostname = args.next().unwrap_or_else(|| "localhost".to_string());
    let out_dir = args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));

    let bundle = lanlink_certgen::generate(&hostname, "Lanlink")?;
    let (cert_path, key_path) = lanlink_certgen::write_to(&bundle, &out_dir)?;
    tracing::info!(
        cert = %cert_path.display(),
        key = %key_path.display(),
        "certificate written"
    );

    lanlink_certgen::verify_pem(&bundle.cert_pem(), &hostname)?;
    tracing::info!(%hostname, "certificate verified");

    Ok(())
}
