//! Brazilian postal code (CEP) → street address, via a ViaCEP-compatible API.

use std::future::Future;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{ClientBuildError, PostalError};
use crate::http::{build_client, normalize_base_url};

const DEFAULT_BASE_URL: &str = "https://viacep.com.br/ws";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PostalAddress {
    pub street: String,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
}

impl PostalAddress {
    /// Joins the non-empty parts with `", "`, street first.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        [&self.street, &self.neighborhood, &self.city, &self.state]
            .into_iter()
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Strips everything but digits and requires exactly eight of them.
///
/// # Errors
///
/// Returns [`PostalError::InvalidCode`] for anything that is not an 8-digit CEP.
pub fn normalize_postal_code(raw: &str) -> Result<String, PostalError> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() == 8 {
        Ok(digits)
    } else {
        Err(PostalError::InvalidCode(raw.trim().to_string()))
    }
}

pub trait PostalCodeLookup: Send + Sync {
    /// `Ok(None)` when the code is well-formed but unknown to the service.
    fn lookup(
        &self,
        postal_code: &str,
    ) -> impl Future<Output = Result<Option<PostalAddress>, PostalError>> + Send;
}

pub struct ViaCepClient {
    client: Client,
    base_url: String,
}

impl ViaCepClient {
    /// # Errors
    ///
    /// Returns [`ClientBuildError`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, ClientBuildError> {
        Self::with_base_url(DEFAULT_BASE_URL, timeout_secs, user_agent)
    }

    /// # Errors
    ///
    /// Returns [`ClientBuildError`] if the `reqwest::Client` cannot be built
    /// or `base_url` is not a valid base URL.
    pub fn with_base_url(
        base_url: &str,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, ClientBuildError> {
        Ok(Self {
            client: build_client(timeout_secs, user_agent)?,
            base_url: normalize_base_url(base_url)?,
        })
    }
}

impl PostalCodeLookup for ViaCepClient {
    async fn lookup(&self, postal_code: &str) -> Result<Option<PostalAddress>, PostalError> {
        let cep = normalize_postal_code(postal_code)?;
        let url = format!("{}/{cep}/json/", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(PostalError::Transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(PostalError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.text().await.map_err(PostalError::Transport)?;
        let parsed: ViaCepResponse =
            serde_json::from_str(&body).map_err(|e| PostalError::Deserialize {
                context: format!("lookup(cep={cep})"),
                source: e,
            })?;

        if parsed.is_error() {
            tracing::debug!(cep = %cep, "postal code not found");
            return Ok(None);
        }

        Ok(Some(PostalAddress {
            street: parsed.logradouro.unwrap_or_default(),
            neighborhood: parsed.bairro.unwrap_or_default(),
            city: parsed.localidade.unwrap_or_default(),
            state: parsed.uf.unwrap_or_default(),
        }))
    }
}

#[derive(Debug, Deserialize)]
struct ViaCepResponse {
    #[serde(default)]
    erro: Option<serde_json::Value>,
    logradouro: Option<String>,
    bairro: Option<String>,
    localidade: Option<String>,
    uf: Option<String>,
}

impl ViaCepResponse {
    /// The service flags unknown codes with `"erro": true` (older) or `"erro": "true"`.
    fn is_error(&self) -> bool {
        match &self.erro {
            Some(serde_json::Value::Bool(flag)) => *flag,
            Some(serde_json::Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }
}
