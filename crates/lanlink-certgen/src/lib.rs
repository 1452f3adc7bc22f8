//! Self-signed certificate issuance and self-verification.
//!
//! Standalone utility with no connection to the discovery subsystem:
//! generates a key pair and a self-signed server certificate, PEM-encodes
//! both, writes them to disk, and checks that the certificate actually
//! verifies for the requested hostname. A higher layer may consume the
//! artifacts; this crate only produces them.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use rcgen::{
    Certificate, CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose, KeyPair,
    KeyUsagePurpose,
};
use rustls::client::danger::ServerCertVerifier;
use rustls::client::WebPkiServerVerifier;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::RootCertStore;

/// Validity window for issued certificates.
const VALIDITY_DAYS: i64 = 365;

/// A freshly issued certificate with its private key.
pub struct CertBundle {
    pub cert: Certificate,
    pub key_pair: KeyPair,
}

impl CertBundle {
    pub fn cert_pem(&self) -> String {
        self.cert.pem()
    }

    pub fn key_pem(&self) -> String {
        self.key_pair.serialize_pem()
    }
}

/// Generate a self-signed server certificate for `hostname`.
pub fn generate(hostname: &str, organization: &str) -> Result<CertBundle> {
    let key_pair = KeyPair::generate().context("failed to generate key pair")?;

    let mut params = CertificateParams::new(vec![hostname.to_string()])
        .context("invalid subject alt name")?;

    let mut dn = DistinguishedName::new();
    dn.push(DnType::OrganizationName, organization);
    dn.push(DnType::CommonName, hostname);
    params.distinguished_name = dn;

    let now = time::OffsetDateTime::now_utc();
    params.not_before = now;
    params.not_after = now + time::Duration::days(VALIDITY_DAYS);

    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyEncipherment,
    ];
    params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];

    let cert = params
        .self_signed(&key_pair)
        .context("failed to self-sign certificate")?;

    Ok(CertBundle { cert, key_pair })
}

/// Write `cert.pem` and `key.pem` under `dir`. Returns both paths.
pub fn write_to(bundle: &CertBundle, dir: &Path) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;

    let cert_path = dir.join("cert.pem");
    let key_path = dir.join("key.pem");

    std::fs::write(&cert_path, bundle.cert_pem())
        .with_context(|| format!("failed to write {}", cert_path.display()))?;
    std::fs::write(&key_path, bundle.key_pem())
        .with_context(|| format!("failed to write {}", key_path.display()))?;

    Ok((cert_path, key_path))
}

/// Verify a PEM-encoded certificate for `hostname`, trusting only itself.
///
/// Decodes the PEM (the same round trip a consumer of the artifact would
/// perform) and delegates to [`verify_der`].
pub fn verify_pem(cert_pem: &str, hostname: &str) -> Result<()> {
    let cert = rustls_pemfile::certs(&mut cert_pem.as_bytes())
        .next()
        .context("no certificate found in PEM input")?
        .context("failed to decode PEM certificate")?;
    verify_der(&cert, hostname)
}

/// Verify a DER certificate for `hostname` against a trust store holding
/// only the certificate itself.
pub fn verify_der(cert: &CertificateDer<'_>, hostname: &str) -> Result<()> {
    let mut roots = RootCertStore::empty();
    roots
        .add(cert.clone().into_owned())
        .context("certificate rejected by trust store")?;

    let verifier = WebPkiServerVerifier::builder_with_provider(
        Arc::new(roots),
        Arc::new(rustls::crypto::aws_lc_rs::default_provider()),
    )
    .build()
    .context("failed to build certificate verifier")?;

    let server_name = ServerName::try_from(hostname.to_string())
        .with_context(|| format!("'{hostname}' is not a valid server name"))?;

    verifier
        .verify_server_cert(cert, &[], &server_name, &[], UnixTime::now())
        .with_context(|| format!("certificate does not verify for '{hostname}'"))?;

    Ok(())
}
