//! Concrete [`TokenCredential`] implementations.

use crate::agentlab::auth::{AccessToken, AuthenticationError, TokenCredential};
use crate::agentlab::clients::http_pool::{base_url_of, get_or_create_client};
use async_trait::async_trait;
use chrono::{Local, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use std::sync::Arc;

pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// OAuth2 client-credentials flow against Microsoft Entra ID.
///
/// ```rust,no_run
/// use agentlab::auth::{ClientSecretCredential, TokenCredential};
///
/// # async {
/// let credential = ClientSecretCredential::new("tenant-id", "client-id", "secret");
/// let token = credential.get_token("https://dynamicsessions.io/.default").await?;
/// println!("expires at {}", token.expires_on);
/// # Ok::<(), agentlab::auth::AuthenticationError>(())
/// # };
/// ```
#[derive(Clone)]
pub struct ClientSecretCredential {
    tenant_id: String,
    client_id: String,
    client_secret: String,
    authority_host: String,
}

#[derive(Deserialize)]
struct TokenEndpointResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Deserialize)]
struct TokenEndpointError {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: String,
}

impl ClientSecretCredential {
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
        }
    }

    /// Reads `AZURE_TENANT_ID`, `AZURE_CLIENT_ID` and `AZURE_CLIENT_SECRET`.
    /// Returns `None` when any of them is unset.
    pub fn from_env() -> Option<Self> {
        let tenant_id = std::env::var("AZURE_TENANT_ID").ok()?;
        let client_id = std::env::var("AZURE_CLIENT_ID").ok()?;
        let client_secret = std::env::var("AZURE_CLIENT_SECRET").ok()?;
        Some(Self::new(tenant_id, client_id, client_secret))
    }

    pub fn with_authority_host(mut self, authority_host: impl Into<String>) -> Self {
        self.authority_host = authority_host.into().trim_end_matches('/').to_string();
        self
    }

    fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host, self.tenant_id
        )
    }
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    async fn get_token(&self, scope: &str) -> Result<AccessToken, AuthenticationError> {
        let url = self.token_url();
        let client = get_or_create_client(base_url_of(&url));
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", scope),
        ];

        let response = client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthenticationError::new(self.credential_name(), e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthenticationError::new(self.credential_name(), e.to_string()))?;

        if !status.is_success() {
            let messages = match serde_json::from_str::<TokenEndpointError>(&body) {
                Ok(err) if !err.error_description.is_empty() => {
                    vec![err.error, err.error_description]
                }
                _ => vec![format!("token endpoint returned {}: {}", status, body)],
            };
            return Err(AuthenticationError::with_messages(
                self.credential_name(),
                messages,
            ));
        }

        let parsed: TokenEndpointResponse = serde_json::from_str(&body).map_err(|e| {
            AuthenticationError::new(
                self.credential_name(),
                format!("unreadable token response: {}", e),
            )
        })?;

        Ok(AccessToken::new(
            parsed.access_token,
            Utc::now().timestamp() + parsed.expires_in,
        ))
    }

    fn credential_name(&self) -> &str {
        "ClientSecretCredential"
    }
}

/// Uses the signed-in Azure CLI account (`az account get-access-token`).
#[derive(Clone, Default)]
pub struct AzureCliCredential;

#[derive(Deserialize)]
struct CliTokenOutput {
    #[serde(rename = "accessToken")]
    access_token: String,
    #[serde(default)]
    expires_on: Option<i64>,
    #[serde(rename = "expiresOn", default)]
    expires_on_local: Option<String>,
}

/// Parse the JSON printed by `az account get-access-token --output json`.
///
/// Newer CLI versions emit `expires_on` as a unix timestamp; older ones only emit
/// `expiresOn` as a local `YYYY-MM-DD HH:MM:SS[.ffffff]` string.
pub fn parse_cli_token_output(stdout: &str) -> Result<AccessToken, String> {
    let output: CliTokenOutput =
        serde_json::from_str(stdout).map_err(|e| format!("unreadable az output: {}", e))?;

    let expires_on = match (output.expires_on, output.expires_on_local) {
        (Some(ts), _) => ts,
        (None, Some(local)) => {
            let naive = NaiveDateTime::parse_from_str(&local, "%Y-%m-%d %H:%M:%S%.f")
                .map_err(|e| format!("unreadable expiresOn '{}': {}", local, e))?;
            Local
                .from_local_datetime(&naive)
                .earliest()
                .ok_or_else(|| format!("expiresOn '{}' does not exist locally", local))?
                .timestamp()
        }
        (None, None) => return Err("az output carries no expiry".to_string()),
    };

    Ok(AccessToken::new(output.access_token, expires_on))
}

#[async_trait]
impl TokenCredential for AzureCliCredential {
    async fn get_token(&self, scope: &str) -> Result<AccessToken, AuthenticationError> {
        let resource = scope.trim_end_matches("/.default");
        let output = tokio::process::Command::new("az")
            .args([
                "account",
                "get-access-token",
                "--output",
                "json",
                "--resource",
                resource,
            ])
            .output()
            .await
            .map_err(|e| {
                AuthenticationError::new(
                    self.credential_name(),
                    format!("Azure CLI not found on path: {}", e),
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(AuthenticationError::new(self.credential_name(), stderr));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_cli_token_output(&stdout)
            .map_err(|message| AuthenticationError::new(self.credential_name(), message))
    }

    fn credential_name(&self) -> &str {
        "AzureCliCredential"
    }
}

/// Tries each credential in order and returns the first token issued.
///
/// When every link fails, the returned error carries all their messages, prefixed
/// with the failing credential's name.
pub struct DefaultCredential {
    chain: Vec<Arc<dyn TokenCredential>>,
}

impl DefaultCredential {
    pub fn new(chain: Vec<Arc<dyn TokenCredential>>) -> Self {
        Self { chain }
    }

    /// Environment service principal first (when configured), then the Azure CLI.
    pub fn from_env() -> Self {
        let mut chain: Vec<Arc<dyn TokenCredential>> = Vec::new();
        if let Some(secret) = ClientSecretCredential::from_env() {
            chain.push(Arc::new(secret));
        }
        chain.push(Arc::new(AzureCliCredential));
        Self::new(chain)
    }
}

#[async_trait]
impl TokenCredential for DefaultCredential {
    async fn get_token(&self, scope: &str) -> Result<AccessToken, AuthenticationError> {
        let mut messages = Vec::new();
        for credential in &self.chain {
            match credential.get_token(scope).await {
                Ok(token) => {
                    log::debug!(
                        "DefaultCredential::get_token(...): token issued by {}",
                        credential.credential_name()
                    );
                    return Ok(token);
                }
                Err(err) => {
                    for message in err.messages {
                        messages.push(format!("{}: {}", credential.credential_name(), message));
                    }
                }
            }
        }
        if messages.is_empty() {
            messages.push("no credentials configured".to_string());
        }
        Err(AuthenticationError::with_messages(
            self.credential_name(),
            messages,
        ))
    }

    fn credential_name(&self) -> &str {
        "DefaultCredential"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Result<AccessToken, &'static str>, &'static str);

    #[async_trait]
    impl TokenCredential for Fixed {
        async fn get_token(&self, _scope: &str) -> Result<AccessToken, AuthenticationError> {
            self.0
                .clone()
                .map_err(|m| AuthenticationError::new(self.1, m))
        }

        fn credential_name(&self) -> &str {
            self.1
        }
    }

    fn fixed(
        result: Result<AccessToken, &'static str>,
        name: &'static str,
    ) -> Arc<dyn TokenCredential> {
        Arc::new(Fixed(result, name))
    }

    #[test]
    fn test_parse_cli_output_prefers_unix_expiry() {
        let json = r#"{"accessToken":"tok","expiresOn":"2030-01-01 00:00:00.000000","expires_on":1893456000,"tokenType":"Bearer"}"#;
        let token = parse_cli_token_output(json).unwrap();
        assert_eq!(token.token, "tok");
        assert_eq!(token.expires_on, 1_893_456_000);
    }

    #[test]
    fn test_parse_cli_output_falls_back_to_local_expiry() {
        let json = r#"{"accessToken":"tok","expiresOn":"2030-01-01 00:00:00.000000"}"#;
        let token = parse_cli_token_output(json).unwrap();
        let expected = Local
            .with_ymd_and_hms(2030, 1, 1, 0, 0, 0)
            .earliest()
            .unwrap()
            .timestamp();
        assert_eq!(token.expires_on, expected);
    }

    #[test]
    fn test_parse_cli_output_without_expiry_is_rejected() {
        assert!(parse_cli_token_output(r#"{"accessToken":"tok"}"#).is_err());
    }

    #[tokio::test]
    async fn test_chain_returns_first_success() {
        let chain = DefaultCredential::new(vec![
            fixed(Err("no env"), "First"),
            fixed(Ok(AccessToken::new("second", 10)), "Second"),
        ]);
        let token = chain.get_token("scope").await.unwrap();
        assert_eq!(token.token, "second");
    }

    #[tokio::test]
    async fn test_chain_aggregates_every_failure() {
        let chain = DefaultCredential::new(vec![
            fixed(Err("no env"), "First"),
            fixed(Err("not logged in"), "Second"),
        ]);
        let err = chain.get_token("scope").await.unwrap_err();
        assert_eq!(
            err.messages,
            vec!["First: no env".to_string(), "Second: not logged in".to_string()]
        );
        assert!(err.to_string().contains("DefaultCredential"));
    }
}
