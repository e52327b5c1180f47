use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    error::UpstreamError,
    model::{LocalityResolution, PostalCode},
    provider::{Stage, truncate_body},
};

use super::LocalityResolver;

/// Postal code lookup against ViaCEP (`{base}{cep}/json/`).
#[derive(Debug, Clone)]
pub struct ViaCepResolver {
    base_url: String,
    http: Client,
}

impl ViaCepResolver {
    pub fn new(base_url: String) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: String, http: Client) -> Self {
        Self { base_url, http }
    }

    fn lookup_url(&self, postal_code: &PostalCode) -> String {
        format!("{}{}/json/", self.base_url, postal_code)
    }
}

#[derive(Debug, Deserialize)]
struct ViaCepEnvelope {
    #[serde(default)]
    localidade: Option<String>,
    #[serde(default)]
    estado: Option<String>,
    #[serde(default)]
    erro: Option<Value>,
}

impl ViaCepEnvelope {
    /// Only a JSON `true` counts. ViaCEP has sent `"true"` as a string at
    /// times; that and any other non-boolean value read as false.
    fn is_error(&self) -> bool {
        matches!(self.erro, Some(Value::Bool(true)))
    }

    fn into_resolution(self) -> LocalityResolution {
        let is_error = self.is_error();
        let locality = self.localidade.unwrap_or_default();
        if is_error || locality.is_empty() {
            return LocalityResolution::not_found();
        }
        LocalityResolution::found(locality, self.estado.unwrap_or_default())
    }
}

#[async_trait]
impl LocalityResolver for ViaCepResolver {
    async fn resolve(
        &self,
        postal_code: &PostalCode,
    ) -> Result<LocalityResolution, UpstreamError> {
        let unavailable = |source| UpstreamError::Unavailable {
            stage: Stage::LocalityResolver,
            source,
        };

        let res = self
            .http
            .get(self.lookup_url(postal_code))
            .send()
            .await
            .map_err(unavailable)?;

        let status = res.status();
        if status != StatusCode::OK {
            tracing::debug!(%status, %postal_code, "locality resolver answered without 200");
            return Ok(LocalityResolution::not_found());
        }

        let body = res.text().await.map_err(unavailable)?;

        let envelope: ViaCepEnvelope =
            serde_json::from_str(&body).map_err(|err| UpstreamError::Protocol {
                stage: Stage::LocalityResolver,
                detail: format!("{err}; body: {}", truncate_body(&body)),
            })?;

        Ok(envelope.into_resolution())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(body: &str) -> LocalityResolution {
        serde_json::from_str::<ViaCepEnvelope>(body)
            .expect("envelope should decode")
            .into_resolution()
    }

    #[test]
    fn decodes_found_locality() {
        let resolution = decode(r#"{"cep":"01001-000","localidade":"São Paulo","estado":"São Paulo","uf":"SP"}"#);
        assert_eq!(resolution, LocalityResolution::found("São Paulo", "São Paulo"));
    }

    #[test]
    fn boolean_error_flag_means_not_found() {
        assert!(!decode(r#"{"erro":true}"#).found);
        assert!(!decode(r#"{"erro":true,"localidade":"TesteCity"}"#).found);
    }

    #[test]
    fn empty_or_missing_locality_means_not_found() {
        assert!(!decode(r#"{"localidade":""}"#).found);
        assert!(!decode(r#"{"localidade":null}"#).found);
        assert!(!decode(r#"{}"#).found);
    }

    #[test]
    fn non_boolean_error_flag_is_ignored() {
        for erro in [r#""true""#, "1", "null", r#"{"x":1}"#, "false"] {
            let body = format!(r#"{{"localidade":"TesteCity","erro":{erro}}}"#);
            assert!(decode(&body).found, "erro={erro} should be treated as false");
        }
    }

    #[test]
    fn wrongly_typed_locality_is_a_protocol_error() {
        assert!(serde_json::from_str::<ViaCepEnvelope>(r#"{"localidade":42}"#).is_err());
        assert!(serde_json::from_str::<ViaCepEnvelope>("<html>").is_err());
    }

    #[test]
    fn lookup_url_appends_code_and_json_suffix() {
        let resolver = ViaCepResolver::new("https://viacep.com.br/ws/".to_string());
        let cep = PostalCode::parse("01001000").unwrap();
        assert_eq!(resolver.lookup_url(&cep), "https://viacep.com.br/ws/01001000/json/");
    }
}
