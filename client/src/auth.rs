use anyhow::{Context, Result};
use quill_protocol::client::DIGEST_ALGORITHM;
use quill_protocol::{ClientCommand, LoginPassword, LoginRequest, LoginResponse, LoginUser};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::{Session, SessionError};

/// Lowercase hex SHA-256 of the password, as the login method expects
pub fn digest(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn login_request(username: &str, email: &str, password: &str) -> LoginRequest {
    LoginRequest {
        user: LoginUser {
            email: email.to_string(),
            username: username.to_string(),
        },
        password: LoginPassword {
            digest: digest(password),
            algorithm: DIGEST_ALGORITHM.to_string(),
        },
    }
}

impl Session {
    /// Authenticate, load the room list and start listening for events.
    ///
    /// Either `username` or `email` may be empty; the server decides whether
    /// the credentials are acceptable. On failure the session is left logged
    /// out with an empty cache and no open subscriptions. A repeated login
    /// releases the previous login's subscriptions first.
    pub async fn login(&self, username: &str, email: &str, password: &str) -> Result<()> {
        self.ensure_open()?;
        let _guard = self
            .inner
            .login_lock
            .try_lock()
            .map_err(|_| SessionError::LoginInProgress)?;

        if let Some(previous) = self.take_listener() {
            previous.stop().await;
        }
        self.release_subscriptions().await;
        self.reset();

        info!(username = %username, "Logging in");

        match self.authenticate(username, email, password).await {
            Ok(user_id) => {
                info!(user_id = %user_id, rooms = self.inner.state.room_count(), "Logged in");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Login failed");
                if let Some(listener) = self.take_listener() {
                    listener.stop().await;
                }
                self.release_subscriptions().await;
                self.reset();
                Err(e)
            }
        }
    }

    async fn authenticate(&self, username: &str, email: &str, password: &str) -> Result<String> {
        let command = ClientCommand::Login(login_request(username, email, password));
        let result = self.call(&command).await?;

        let response: LoginResponse =
            serde_json::from_value(result).context("Failed to decode login response")?;

        let rooms = self.get_channels().await?;

        self.set_user_id(Some(response.id.clone()));
        self.inner.state.replace_rooms(rooms);

        self.start_listener(&response.id).await?;
        Ok(response.id)
    }

    fn reset(&self) {
        self.set_user_id(None);
        self.inner.state.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_hex_sha256() {
        assert_eq!(
            digest("password"),
            "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8"
        );
    }

    #[test]
    fn test_digest_empty_input() {
        assert_eq!(
            digest(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_login_request_carries_algorithm() {
        let request = login_request("bot", "", "password");

        assert_eq!(request.user.username, "bot");
        assert!(request.user.email.is_empty());
        assert_eq!(request.password.algorithm, "sha-256");
        assert_eq!(request.password.digest.len(), 64);
    }
}
