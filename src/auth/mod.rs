//! Wallet-signature login
//!
//! `GET /auth/nonce/{address}` -> sign the nonce -> `POST /auth/wallet-login`.
//! The returned bearer token is stored through [`TokenStore`] and reused
//! until the backend rejects it.

pub mod signature;
pub mod token_store;

use std::sync::Arc;

use ethers::signers::{LocalWallet, Signer};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::chain::{ChainError, checksummed};
use crate::ledger::types::{LoginResponse, NonceResponse, User, WalletLoginRequest};
use crate::ledger::{LedgerClient, LedgerError};

pub use signature::{sign_nonce, verify_signature};
pub use token_store::TokenStore;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Failed to get nonce: {0}")]
    Nonce(String),

    #[error("Failed to sign login message: {0}")]
    Signing(#[from] ChainError),

    #[error("Login failed: {0}")]
    Login(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Nonce(_) => "NONCE_FAILED",
            AuthError::Signing(_) => "SIGNING_FAILED",
            AuthError::Login(_) => "LOGIN_FAILED",
            AuthError::Ledger(e) => e.code(),
        }
    }
}

/// Result of a login attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The stored token was still valid, no new signature was made
    Resumed { user: Option<User> },
    LoggedIn { user: Option<User> },
}

impl LoginOutcome {
    pub fn user(&self) -> Option<&User> {
        match self {
            LoginOutcome::Resumed { user } | LoginOutcome::LoggedIn { user } => user.as_ref(),
        }
    }
}

pub struct WalletAuth {
    client: Arc<LedgerClient>,
}

impl WalletAuth {
    pub fn new(client: Arc<LedgerClient>) -> Self {
        Self { client }
    }

    pub async fn login(&self, wallet: &LocalWallet) -> Result<LoginOutcome, AuthError> {
        if self.client.has_token() {
            match self.verify().await {
                Ok(Some(user)) => {
                    info!(userid = user.userid, "Resumed existing session");
                    return Ok(LoginOutcome::Resumed { user: Some(user) });
                }
                Ok(None) => {
                    info!("Resumed existing session");
                    return Ok(LoginOutcome::Resumed { user: None });
                }
                Err(e) => warn!(error = %e, "Stored token rejected, logging in again"),
            }
        }

        let address = checksummed(&wallet.address());
        let nonce: NonceResponse = self
            .client
            .get_data(&format!("/auth/nonce/{}", address))
            .await
            .map_err(|e| AuthError::Nonce(e.user_message()))?;
        if nonce.nonce.is_empty() {
            return Err(AuthError::Nonce("empty nonce".to_string()));
        }

        let signature = sign_nonce(wallet, &nonce.nonce).await?;
        let request = WalletLoginRequest {
            wallet_address: address.clone(),
            signature,
            message: nonce.nonce,
        };

        let response: LoginResponse = self
            .client
            .post_data("/auth/wallet-login", &request)
            .await
            .map_err(|e| AuthError::Login(e.user_message()))?;
        if response.token.is_empty() {
            return Err(AuthError::Login("no token in response".to_string()));
        }

        self.client.set_token(response.token)?;
        info!(
            wallet = %address,
            userid = response.user.as_ref().map(|u| u.userid),
            "Logged in"
        );
        Ok(LoginOutcome::LoggedIn {
            user: response.user,
        })
    }

    /// `GET /auth/verify`; the user is returned when the backend includes one.
    pub async fn verify(&self) -> Result<Option<User>, AuthError> {
        let body: Value = self.client.get("/auth/verify").await?;
        let user = body
            .get("user")
            .or_else(|| body.get("data").and_then(|d| d.get("user")))
            .and_then(|u| serde_json::from_value(u.clone()).ok());
        Ok(user)
    }

    /// Tell the backend, then forget the token whatever it answered.
    pub async fn logout(&self) -> Result<(), AuthError> {
        if self.client.has_token()
            && let Err(e) = self
                .client
                .post::<_, Value>("/auth/logout", &serde_json::json!({}))
                .await
        {
            warn!(error = %e, "Logout request failed, clearing token anyway");
        }
        self.client.clear_token();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::ledger::test_server::{StubLedger, spawn_stub};
    use crate::settlement::mock::user_wallet;
    use serde_json::json;

    async fn setup(stub: &StubLedger) -> Arc<LedgerClient> {
        let base_url = spawn_stub(stub.clone()).await;
        Arc::new(
            LedgerClient::new(&LedgerConfig {
                base_url,
                timeout_ms: 2_000,
            })
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_login_signs_nonce_and_stores_token() {
        let stub = StubLedger::default();
        let wallet = user_wallet();
        let address = checksummed(&wallet.address());
        stub.respond(
            &format!("/auth/nonce/{}", address),
            200,
            json!({"nonce": "Login nonce 42"}),
        );
        stub.respond(
            "/auth/wallet-login",
            200,
            json!({"token": "jwt-1", "user": {"userid": 7, "wallet_address": address}}),
        );
        let client = setup(&stub).await;

        let outcome = WalletAuth::new(client.clone()).login(&wallet).await.unwrap();

        assert!(matches!(outcome, LoginOutcome::LoggedIn { .. }));
        assert_eq!(outcome.user().map(|u| u.userid), Some(7));
        assert_eq!(client.token().as_deref(), Some("jwt-1"));

        let login = stub
            .calls()
            .into_iter()
            .find(|c| c.path == "/auth/wallet-login")
            .unwrap();
        assert_eq!(login.body["walletAddress"], address.as_str());
        assert_eq!(login.body["message"], "Login nonce 42");
        let sig = login.body["signature"].as_str().unwrap();
        assert!(verify_signature("Login nonce 42", sig, wallet.address()));
    }

    #[tokio::test]
    async fn test_valid_token_short_circuits_login() {
        let stub = StubLedger::default();
        stub.respond(
            "/auth/verify",
            200,
            json!({"success": true, "user": {"userid": 3, "wallet_address": "0xabc"}}),
        );
        let client = setup(&stub).await;
        client.set_token("still-good".to_string()).unwrap();

        let outcome = WalletAuth::new(client).login(&user_wallet()).await.unwrap();

        assert!(matches!(outcome, LoginOutcome::Resumed { .. }));
        assert_eq!(outcome.user().map(|u| u.userid), Some(3));
        assert_eq!(stub.calls_to("/auth/wallet-login"), 0);
    }

    #[tokio::test]
    async fn test_missing_nonce_is_error() {
        let stub = StubLedger::default();
        let address = checksummed(&user_wallet().address());
        stub.respond(
            &format!("/auth/nonce/{}", address),
            404,
            json!({"error": "Wallet not registered"}),
        );
        let client = setup(&stub).await;

        let err = WalletAuth::new(client).login(&user_wallet()).await.unwrap_err();
        assert!(matches!(err, AuthError::Nonce(ref m) if m == "Wallet not registered"));
        assert_eq!(stub.calls_to("/auth/wallet-login"), 0);
    }

    #[tokio::test]
    async fn test_logout_clears_token_even_on_error() {
        let stub = StubLedger::default();
        stub.respond("/auth/logout", 500, json!({"error": "boom"}));
        let client = setup(&stub).await;
        client.set_token("t".to_string()).unwrap();

        WalletAuth::new(client.clone()).logout().await.unwrap();

        assert!(!client.has_token());
        let call = &stub.calls()[0];
        assert_eq!(call.bearer.as_deref(), Some("t"));
    }
}
