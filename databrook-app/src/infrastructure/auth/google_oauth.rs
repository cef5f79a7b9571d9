use crate::domain::User;
use databrook_errors::AppError;
use oauth2::{
    basic::BasicClient, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken,
    PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use serde::Deserialize;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

#[derive(Debug, Deserialize)]
pub struct GoogleUserInfo {
    /// Google's stable account id
    pub sub: String,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
}

impl GoogleUserInfo {
    pub fn into_user(self) -> User {
        User::new(self.sub, self.email, self.name, self.picture)
    }
}

/// What the caller must keep (in the session) between redirect and callback.
pub struct SignInRequest {
    pub auth_url: String,
    pub csrf_state: String,
    pub pkce_verifier: String,
}

type ConfiguredClient = oauth2::Client<
    oauth2::basic::BasicErrorResponse,
    oauth2::basic::BasicTokenResponse,
    oauth2::basic::BasicTokenIntrospectionResponse,
    oauth2::StandardRevocableToken,
    oauth2::basic::BasicRevocationErrorResponse,
    oauth2::EndpointSet,
    oauth2::EndpointNotSet,
    oauth2::EndpointNotSet,
    oauth2::EndpointNotSet,
    oauth2::EndpointSet,
>;

#[derive(Clone)]
pub struct GoogleOAuth {
    client: ConfiguredClient,
    redirect_uri: RedirectUrl,
    http_client: reqwest::Client,
}

impl GoogleOAuth {
    pub fn new(client_id: &str, client_secret: &str, redirect_uri: &str) -> Result<Self, AppError> {
        let invalid = |e: oauth2::url::ParseError| AppError::InvalidInput(e.to_string());
        let auth_url = AuthUrl::new(GOOGLE_AUTH_URL.to_string()).map_err(invalid)?;
        let token_url = TokenUrl::new(GOOGLE_TOKEN_URL.to_string()).map_err(invalid)?;
        let redirect = RedirectUrl::new(redirect_uri.to_string()).map_err(invalid)?;

        let client = BasicClient::new(ClientId::new(client_id.to_string()))
            .set_client_secret(ClientSecret::new(client_secret.to_string()))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url);

        Ok(Self {
            client,
            redirect_uri: redirect,
            http_client: reqwest::Client::new(),
        })
    }

    /// Start a sign-in: the Google consent URL plus the CSRF state and PKCE verifier.
    pub fn begin_sign_in(&self) -> SignInRequest {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let (auth_url, csrf_token) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .set_redirect_uri(std::borrow::Cow::Borrowed(&self.redirect_uri))
            .add_scope(Scope::new("openid".to_string()))
            .add_scope(Scope::new("email".to_string()))
            .add_scope(Scope::new("profile".to_string()))
            .set_pkce_challenge(pkce_challenge)
            .url();

        SignInRequest {
            auth_url: auth_url.to_string(),
            csrf_state: csrf_token.secret().clone(),
            pkce_verifier: pkce_verifier.secret().clone(),
        }
    }

    /// Exchange the callback code for tokens and fetch the Google profile.
    pub async fn complete_sign_in(&self, code: &str, pkce_verifier: String) -> Result<GoogleUserInfo, AppError> {
        let http_client = oauth2::reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        let token_result = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_redirect_uri(std::borrow::Cow::Borrowed(&self.redirect_uri))
            .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier))
            .request_async(&http_client)
            .await
            .map_err(|e| AppError::Internal(format!("Token exchange failed: {:?}", e)))?;

        let access_token = token_result.access_token().secret();

        self.http_client
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(access_token)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| AppError::Internal(format!("Failed to fetch user info: {}", e)))?
            .json::<GoogleUserInfo>()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to parse user info: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_in_url_carries_pkce_and_state() {
        let oauth = GoogleOAuth::new("client", "secret", "http://localhost:3000/auth/callback").unwrap();

        let request = oauth.begin_sign_in();

        assert!(request.auth_url.starts_with(GOOGLE_AUTH_URL));
        assert!(request.auth_url.contains("code_challenge="));
        assert!(request.auth_url.contains(&format!("state={}", request.csrf_state)));
        assert!(!request.pkce_verifier.is_empty());
    }

    #[test]
    fn test_rejects_bad_redirect() {
        assert!(GoogleOAuth::new("client", "secret", "not a url").is_err());
    }
}
