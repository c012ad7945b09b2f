//! Parsing for Azure storage connection strings (`AzureWebJobsStorage`).

use anyhow::{Context, Result, bail};

const DEV_ACCOUNT_NAME: &str = "devstoreaccount1";
/// Well-known key of the local storage emulator.
const DEV_ACCOUNT_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";
const DEV_BLOB_ENDPOINT: &str = "http://127.0.0.1:10000/devstoreaccount1";

/// The subset of connection string settings the blob client needs.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ConnectionString {
    pub account_name: Option<String>,
    pub account_key: Option<String>,
    pub blob_endpoint: Option<String>,
    pub endpoint_suffix: Option<String>,
    pub protocol: Option<String>,
    pub shared_access_signature: Option<String>,
}

impl std::fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionString")
            .field("account_name", &self.account_name)
            .field("account_key", &self.account_key.as_ref().map(|_| "<redacted>"))
            .field("blob_endpoint", &self.blob_endpoint)
            .field("endpoint_suffix", &self.endpoint_suffix)
            .field("protocol", &self.protocol)
            .field(
                "shared_access_signature",
                &self.shared_access_signature.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl ConnectionString {
    /// Parse `Key=Value;Key=Value` pairs. Keys are matched case-insensitively
    /// and values may themselves contain `=` (base64 padding, SAS tokens).
    pub fn parse(raw: &str) -> Result<Self> {
        let mut parsed = Self::default();

        for pair in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .with_context(|| format!("connection string segment `{}` has no `=`", key_only(pair)))?;
            let value = value.trim().to_string();

            match key.trim().to_ascii_lowercase().as_str() {
                "usedevelopmentstorage" => {
                    if value.eq_ignore_ascii_case("true") {
                        parsed.account_name = Some(DEV_ACCOUNT_NAME.into());
                        parsed.account_key = Some(DEV_ACCOUNT_KEY.into());
                        parsed.blob_endpoint = Some(DEV_BLOB_ENDPOINT.into());
                    }
                }
                "accountname" => parsed.account_name = Some(value),
                "accountkey" => parsed.account_key = Some(value),
                "blobendpoint" => parsed.blob_endpoint = Some(value),
                "endpointsuffix" => parsed.endpoint_suffix = Some(value),
                "defaultendpointsprotocol" => parsed.protocol = Some(value),
                "sharedaccesssignature" => parsed.shared_access_signature = Some(value),
                other => tracing::debug!("ignoring connection string key `{}`", other),
            }
        }

        if parsed.blob_endpoint.is_none() && parsed.account_name.is_none() {
            bail!("connection string needs either AccountName or BlobEndpoint");
        }
        if parsed.account_key.is_some() && parsed.account_name.is_none() {
            bail!("connection string has AccountKey but no AccountName");
        }

        Ok(parsed)
    }

    /// Blob service endpoint without a trailing slash.
    pub fn blob_endpoint(&self) -> Result<String> {
        if let Some(endpoint) = &self.blob_endpoint {
            return Ok(endpoint.trim_end_matches('/').to_string());
        }
        let account = self
            .account_name
            .as_deref()
            .context("connection string has no AccountName")?;
        let protocol = self.protocol.as_deref().unwrap_or("https");
        let suffix = self.endpoint_suffix.as_deref().unwrap_or("core.windows.net");
        Ok(format!("{protocol}://{account}.blob.{suffix}"))
    }
}

/// Keep secrets out of error messages for malformed segments.
fn key_only(pair: &str) -> &str {
    pair.split_once('=').map(|(k, _)| k).unwrap_or(pair)
}
