use crate::services::connection_string::ConnectionString;
use anyhow::{Context, Result, bail};
use clap::Parser;
use reqwest::Url;
use std::{env, path::PathBuf};

pub const DEFAULT_CONTAINER: &str = "healthcare-data";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub storage: StorageSettings,
    pub default_container: String,
    /// Empty means any valid container name is accepted.
    pub allowed_containers: Vec<String>,
    pub max_upload_bytes: usize,
}

/// Which blob backend to build, and how to authenticate against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageSettings {
    /// Nothing configured; datalake endpoints answer 500.
    None,
    Local {
        root: PathBuf,
    },
    Azure {
        /// Blob service endpoint without query string or trailing slash.
        endpoint: String,
        account: String,
        auth: AzureAuth,
    },
}

#[derive(Clone, PartialEq, Eq)]
pub enum AzureAuth {
    /// Storage account key (Shared Key signing).
    SharedKey(String),
    /// SAS query string without the leading `?`.
    Sas(String),
    /// Bearer tokens from the App Service identity endpoint when one is
    /// set, otherwise from the instance metadata service.
    ManagedIdentity {
        identity_endpoint: Option<String>,
        client_id: Option<String>,
    },
}

impl std::fmt::Debug for AzureAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SharedKey(_) => f.write_str("SharedKey(<redacted>)"),
            Self::Sas(_) => f.write_str("Sas(<redacted>)"),
            Self::ManagedIdentity {
                identity_endpoint,
                client_id,
            } => f
                .debug_struct("ManagedIdentity")
                .field("identity_endpoint", identity_endpoint)
                .field("client_id", client_id)
                .finish(),
        }
    }
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Basic Healthcare Functions HTTP service")]
pub struct Args {
    /// Host to bind to (overrides HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Deployment environment name (overrides ENVIRONMENT)
    #[arg(long)]
    pub environment: Option<String>,

    /// Blob service URL, or file:// path for local storage (overrides STORAGE_ACCOUNT_URL)
    #[arg(long)]
    pub storage_account_url: Option<String>,

    /// Container used when a request names none (overrides DEFAULT_CONTAINER)
    #[arg(long)]
    pub default_container: Option<String>,

    /// Largest accepted request body in bytes (overrides MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        let args = Args::parse();
        Self::resolve(args, |key| env::var(key).ok())
    }

    /// Merge CLI args over values from `lookup` (normally the process environment).
    pub fn resolve(args: Args, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let env_port = match lookup("PORT") {
            Some(value) => value
                .trim()
                .parse::<u16>()
                .with_context(|| format!("parsing PORT value `{}`", value))?,
            None => DEFAULT_PORT,
        };
        let env_max_upload = match lookup("MAX_UPLOAD_BYTES") {
            Some(value) => value
                .trim()
                .parse::<usize>()
                .with_context(|| format!("parsing MAX_UPLOAD_BYTES value `{}`", value))?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        let storage_url = args
            .storage_account_url
            .or_else(|| lookup("STORAGE_ACCOUNT_URL"));
        let storage = match storage_url {
            Some(url) => storage_from_url(&url, &lookup)?,
            None => match lookup("AzureWebJobsStorage") {
                Some(raw) => storage_from_connection_string(&raw)
                    .context("parsing AzureWebJobsStorage connection string")?,
                None => StorageSettings::None,
            },
        };

        let allowed_containers = lookup("ALLOWED_CONTAINERS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            host: args
                .host
                .or_else(|| lookup("HOST"))
                .unwrap_or_else(|| "0.0.0.0".into()),
            port: args.port.unwrap_or(env_port),
            environment: args
                .environment
                .or_else(|| lookup("ENVIRONMENT"))
                .unwrap_or_else(|| "development".into()),
            storage,
            default_container: args
                .default_container
                .or_else(|| lookup("DEFAULT_CONTAINER"))
                .unwrap_or_else(|| DEFAULT_CONTAINER.into()),
            allowed_containers,
            max_upload_bytes: args.max_upload_bytes.unwrap_or(env_max_upload),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// `file://` selects the local store; otherwise a SAS query string selects
/// SAS auth and a bare URL selects managed identity.
fn storage_from_url(
    url: &str,
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<StorageSettings> {
    let url = url.trim();
    if let Some(path) = url.strip_prefix("file://") {
        if path.is_empty() {
            bail!("STORAGE_ACCOUNT_URL `{}` has no path", url);
        }
        return Ok(StorageSettings::Local {
            root: PathBuf::from(path),
        });
    }

    // Only the part before `?` goes into messages; the query may be a SAS.
    let endpoint = endpoint_without_query(url);
    let parsed =
        Url::parse(url).with_context(|| format!("parsing STORAGE_ACCOUNT_URL `{}`", endpoint))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!(
            "STORAGE_ACCOUNT_URL must use http, https or file, got `{}`",
            parsed.scheme()
        );
    }
    let account = account_from_endpoint(&parsed)
        .with_context(|| format!("STORAGE_ACCOUNT_URL `{}` names no storage account", endpoint))?;

    let auth = match parsed.query().filter(|q| !q.is_empty()) {
        Some(sas) => AzureAuth::Sas(sas.to_string()),
        None => AzureAuth::ManagedIdentity {
            identity_endpoint: lookup("IDENTITY_ENDPOINT").or_else(|| lookup("MSI_ENDPOINT")),
            client_id: lookup("AZURE_CLIENT_ID"),
        },
    };
    Ok(StorageSettings::Azure {
        endpoint,
        account,
        auth,
    })
}

fn storage_from_connection_string(raw: &str) -> Result<StorageSettings> {
    let cs = ConnectionString::parse(raw)?;
    let endpoint = endpoint_without_query(&cs.blob_endpoint()?);
    let account = match &cs.account_name {
        Some(account) => account.clone(),
        None => {
            let parsed = Url::parse(&endpoint)
                .with_context(|| format!("parsing BlobEndpoint `{}`", endpoint))?;
            account_from_endpoint(&parsed)
                .with_context(|| format!("BlobEndpoint `{}` names no storage account", endpoint))?
        }
    };
    let auth = match (&cs.account_key, &cs.shared_access_signature) {
        (_, Some(sas)) => AzureAuth::Sas(sas.trim_start_matches('?').to_string()),
        (Some(key), None) => AzureAuth::SharedKey(key.clone()),
        _ => bail!("connection string needs AccountKey or SharedAccessSignature"),
    };
    Ok(StorageSettings::Azure {
        endpoint,
        account,
        auth,
    })
}

fn endpoint_without_query(url: &str) -> String {
    url.split('?')
        .next()
        .unwrap_or(url)
        .trim_end_matches('/')
        .to_string()
}

/// `hcdata.blob.core.windows.net` names `hcdata`. Path-style endpoints such
/// as the emulator's `http://127.0.0.1:10000/devstoreaccount1` name their
/// first path segment.
fn account_from_endpoint(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    if let Some((account, _)) = host.split_once(".blob.") {
        return Some(account.to_string());
    }
    url.path_segments()
        .and_then(|mut segments| segments.next())
        .filter(|segment| !segment.is_empty())
        .or_else(|| host.split('.').next())
        .map(str::to_string)
}
