//! S3-compatible bucket reached with SigV4-signed GET requests

use super::http::{pooled_client, read_body};
use super::DocumentStore;
use crate::config::S3Credentials;
use crate::error::AgentError;
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::{Client, Url};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::{debug, error};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SERVICE: &str = "s3";

/// Signs requests with AWS Signature Version 4
#[derive(Debug, Clone)]
pub struct SigV4Signer {
    credentials: S3Credentials,
}

impl SigV4Signer {
    pub fn new(credentials: S3Credentials) -> Self {
        Self { credentials }
    }

    /// Headers for an empty-body GET of `url`, `authorization` included.
    /// `extra` headers are signed along with the required ones. `host` is
    /// signed but not returned; the HTTP client sets it.
    pub fn sign_get(
        &self,
        url: &Url,
        extra: &[(&str, &str)],
        at: DateTime<Utc>,
    ) -> Result<Vec<(String, String)>> {
        let amz_date = at.format("%Y%m%dT%H%M%SZ").to_string();
        let date_stamp = at.format("%Y%m%d").to_string();
        let payload_hash = hex::encode(Sha256::digest(b""));

        let mut headers = BTreeMap::new();
        headers.insert("host".to_string(), host_header(url)?);
        for (name, value) in extra {
            headers.insert(name.to_ascii_lowercase(), value.trim().to_string());
        }
        headers.insert("x-amz-content-sha256".to_string(), payload_hash.clone());
        headers.insert("x-amz-date".to_string(), amz_date.clone());
        if let Some(token) = &self.credentials.session_token {
            headers.insert("x-amz-security-token".to_string(), token.clone());
        }

        let canonical_headers: String = headers
            .iter()
            .map(|(name, value)| format!("{}:{}\n", name, value))
            .collect();
        let signed_headers = headers
            .keys()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(";");

        let canonical_request = format!(
            "GET\n{}\n{}\n{}\n{}\n{}",
            url.path(),
            canonical_query(url),
            canonical_headers,
            signed_headers,
            payload_hash
        );

        let scope = format!(
            "{}/{}/{}/aws4_request",
            date_stamp, self.credentials.region, SERVICE
        );
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            amz_date,
            scope,
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let signature = hex::encode(hmac(
            &self.signing_key(&date_stamp)?,
            string_to_sign.as_bytes(),
        )?);

        headers.remove("host");
        headers.insert(
            "authorization".to_string(),
            format!(
                "{} Credential={}/{},SignedHeaders={},Signature={}",
                ALGORITHM, self.credentials.access_key_id, scope, signed_headers, signature
            ),
        );

        Ok(headers.into_iter().collect())
    }

    fn signing_key(&self, date_stamp: &str) -> Result<Vec<u8>> {
        let secret = format!("AWS4{}", self.credentials.secret_access_key);
        let k_date = hmac(secret.as_bytes(), date_stamp.as_bytes())?;
        let k_region = hmac(&k_date, self.credentials.region.as_bytes())?;
        let k_service = hmac(&k_region, SERVICE.as_bytes())?;
        hmac(&k_service, b"aws4_request")
    }
}

fn hmac(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| AgentError::DocumentError(format!("invalid signing key: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Host as the client will send it; default ports are omitted
fn host_header(url: &Url) -> Result<String> {
    let host = url
        .host_str()
        .ok_or_else(|| AgentError::DocumentError(format!("{} has no host", url)))?;

    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

fn canonical_query(url: &Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (urlencoding::encode(&k).into_owned(), urlencoding::encode(&v).into_owned()))
        .collect();
    pairs.sort();

    pairs
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// Private bucket; `base_url` is the virtual-host bucket URL
#[derive(Clone)]
pub struct S3DocumentStore {
    client: Client,
    base_url: Url,
    signer: SigV4Signer,
}

impl S3DocumentStore {
    pub fn new(base_url: &str, credentials: S3Credentials) -> Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/')).map_err(|e| {
            AgentError::ConfigError(format!("invalid bucket URL '{}': {}", base_url, e))
        })?;

        Ok(Self {
            client: pooled_client()?,
            base_url,
            signer: SigV4Signer::new(credentials),
        })
    }

    /// Each key segment is percent-encoded once, so the URL path is
    /// already the canonical URI.
    pub fn object_url(&self, key: &str) -> Result<Url> {
        let encoded = key
            .trim_start_matches('/')
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");

        let base = self.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{}/{}", base, encoded))
            .map_err(|e| AgentError::DocumentError(format!("invalid object key '{}': {}", key, e)))
    }
}

#[async_trait]
impl DocumentStore for S3DocumentStore {
    async fn fetch(&self, key: &str) -> Result<Vec<u8>> {
        let url = self.object_url(key)?;
        debug!(%url, "Fetching signed document");

        let headers = self.signer.sign_get(&url, &[], Utc::now())?;
        let mut request = self.client.get(url.clone());
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let response = request.send().await.map_err(|e| {
            error!(%url, "Signed document request failed: {}", e);
            AgentError::DocumentError(format!("request for {} failed: {}", key, e))
        })?;

        read_body(key, response).await
    }
}
