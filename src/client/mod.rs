//! HTTP identity backend for the hosted identity service (GoTrue-compatible
//! `/auth/v1` REST API).
//!
//! Session tokens stay in memory inside [`HttpBackend`] for the lifetime of the
//! process and are never persisted or logged. Every request carries the public
//! project key in the `apikey` header; user-scoped calls add the access token as
//! a bearer token.
//!
//! Federated sign-in uses PKCE: the authorize URL carries an S256 challenge and
//! the verifier waits here until the provider callback brings back the
//! authorization code. Callbacks that carry tokens in the fragment (implicit
//! grant) are accepted as well.

mod types;

use crate::{
    APP_USER_AGENT,
    auth::{
        BackendError, CurrentSession, FederatedRedirect, IdentityBackend, OneTimeCode,
        ProfileUpdate, Provider, RequestCodeOptions, SessionSnapshot,
    },
};
use async_trait::async_trait;
use base64::Engine;
use rand::{RngCore, rngs::OsRng};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use std::{collections::HashMap, time::Duration};
use tokio::sync::Mutex;
use tracing::{debug, instrument};
use types::{
    ErrorResponse, OtpRequest, PkceTokenRequest, ProfileData, RefreshTokenRequest,
    SessionResponse, UpdateUserRequest, UserResponse, VerifyOtpRequest,
};
use url::Url;

/// Request timeout applied by the client; the flow controller adds none.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Maximum number of error characters surfaced to the user.
const MAX_ERROR_CHARS: usize = 200;

const OTP_PATH: &str = "/auth/v1/otp";
const VERIFY_PATH: &str = "/auth/v1/verify";
const AUTHORIZE_PATH: &str = "/auth/v1/authorize";
const TOKEN_PATH: &str = "/auth/v1/token";
const USER_PATH: &str = "/auth/v1/user";

struct SessionTokens {
    access_token: SecretString,
    refresh_token: SecretString,
}

#[derive(Default)]
struct ClientState {
    tokens: Option<SessionTokens>,
    pkce_verifier: Option<SecretString>,
}

pub struct HttpBackend {
    client: Client,
    base_url: String,
    api_key: SecretString,
    state: Mutex<ClientState>,
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .finish_non_exhaustive()
    }
}

impl HttpBackend {
    /// Build a backend for the identity service at `base_url`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: &Url, api_key: SecretString) -> Result<Self, BackendError> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|err| BackendError::Config(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            api_key,
            state: Mutex::new(ClientState::default()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("apikey", self.api_key.expose_secret())
    }

    async fn access_token(&self) -> Result<SecretString, BackendError> {
        self.state
            .lock()
            .await
            .tokens
            .as_ref()
            .map(|tokens| tokens.access_token.clone())
            .ok_or(BackendError::NotSignedIn)
    }

    async fn store_session(&self, session: SessionResponse) -> SessionSnapshot {
        let mut state = self.state.lock().await;
        state.tokens = Some(SessionTokens {
            access_token: SecretString::from(session.access_token),
            refresh_token: SecretString::from(session.refresh_token),
        });
        SessionSnapshot::from(session.user)
    }

    async fn exchange_code(&self, auth_code: &str) -> Result<(), BackendError> {
        let verifier = self
            .state
            .lock()
            .await
            .pkce_verifier
            .take()
            .ok_or_else(|| {
                BackendError::Provider("no federated sign-in is in progress".to_string())
            })?;

        let body = PkceTokenRequest {
            auth_code,
            code_verifier: verifier.expose_secret(),
        };
        let response = send(
            self.request(self.client.post(self.url(TOKEN_PATH)))
                .query(&[("grant_type", "pkce")])
                .json(&body),
        )
        .await?;
        let session: SessionResponse = handle_json_response(response).await?;
        self.store_session(session).await;
        Ok(())
    }
}

#[async_trait]
impl IdentityBackend for HttpBackend {
    #[instrument(skip_all)]
    async fn request_one_time_code(
        &self,
        email: &str,
        options: RequestCodeOptions,
    ) -> Result<(), BackendError> {
        let body = OtpRequest {
            email,
            create_user: options.allow_create,
        };
        let response = send(self.request(self.client.post(self.url(OTP_PATH))).json(&body)).await?;
        handle_empty_response(response).await
    }

    #[instrument(skip_all)]
    async fn verify_one_time_code(
        &self,
        email: &str,
        code: &OneTimeCode,
    ) -> Result<SessionSnapshot, BackendError> {
        let body = VerifyOtpRequest {
            kind: "email",
            email,
            token: code.expose(),
        };
        let response =
            send(self.request(self.client.post(self.url(VERIFY_PATH))).json(&body)).await?;
        let session: SessionResponse = handle_json_response(response).await?;
        Ok(self.store_session(session).await)
    }

    #[instrument(skip_all, fields(%provider))]
    async fn begin_federated_sign_in(
        &self,
        provider: Provider,
        callback_url: &Url,
    ) -> Result<FederatedRedirect, BackendError> {
        let verifier = generate_pkce_verifier()?;
        let challenge = pkce_challenge(&verifier);

        let mut url = Url::parse(&self.url(AUTHORIZE_PATH))
            .map_err(|err| BackendError::Config(format!("invalid identity service URL: {err}")))?;
        url.query_pairs_mut()
            .append_pair("provider", provider.as_str())
            .append_pair("redirect_to", callback_url.as_str())
            .append_pair("code_challenge", &challenge)
            .append_pair("code_challenge_method", "s256");

        self.state.lock().await.pkce_verifier = Some(SecretString::from(verifier));
        debug!("authorize URL prepared");

        Ok(FederatedRedirect { provider, url })
    }

    #[instrument(skip_all)]
    async fn complete_federated_sign_in(&self, callback_url: &Url) -> Result<(), BackendError> {
        let params = callback_params(callback_url);

        if let Some(message) = ["error_description", "error"]
            .iter()
            .find_map(|key| params.get(*key).filter(|value| !value.trim().is_empty()))
        {
            return Err(BackendError::Provider(sanitize_message(message)));
        }

        if let Some(code) = params.get("code") {
            return self.exchange_code(code).await;
        }

        match (params.get("access_token"), params.get("refresh_token")) {
            (Some(access_token), Some(refresh_token)) => {
                let mut state = self.state.lock().await;
                state.pkce_verifier = None;
                state.tokens = Some(SessionTokens {
                    access_token: SecretString::from(access_token.clone()),
                    refresh_token: SecretString::from(refresh_token.clone()),
                });
                Ok(())
            }
            _ => Err(BackendError::Provider(
                "callback URL carries no session".to_string(),
            )),
        }
    }

    #[instrument(skip_all)]
    async fn update_profile(&self, update: &ProfileUpdate) -> Result<(), BackendError> {
        let access_token = self.access_token().await?;
        let body = UpdateUserRequest {
            data: ProfileData {
                full_name: &update.display_name,
                phone_number: update.phone_number.as_str(),
            },
        };
        let response = send(
            self.request(self.client.put(self.url(USER_PATH)))
                .bearer_auth(access_token.expose_secret())
                .json(&body),
        )
        .await?;
        handle_empty_response(response).await
    }

    #[instrument(skip_all)]
    async fn refresh_session(&self) -> Result<SessionSnapshot, BackendError> {
        let refresh_token = self
            .state
            .lock()
            .await
            .tokens
            .as_ref()
            .map(|tokens| tokens.refresh_token.clone())
            .ok_or(BackendError::NotSignedIn)?;

        let body = RefreshTokenRequest {
            refresh_token: refresh_token.expose_secret(),
        };
        let response = send(
            self.request(self.client.post(self.url(TOKEN_PATH)))
                .query(&[("grant_type", "refresh_token")])
                .json(&body),
        )
        .await?;
        let session: SessionResponse = handle_json_response(response).await?;
        Ok(self.store_session(session).await)
    }

    #[instrument(skip_all)]
    async fn get_current_session(&self) -> Result<CurrentSession, BackendError> {
        let access_token = match self.access_token().await {
            Ok(token) => token,
            Err(BackendError::NotSignedIn) => return Ok(CurrentSession::Unauthenticated),
            Err(err) => return Err(err),
        };

        let response = send(
            self.request(self.client.get(self.url(USER_PATH)))
                .bearer_auth(access_token.expose_secret()),
        )
        .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            debug!("access token rejected; treating as signed out");
            self.state.lock().await.tokens = None;
            return Ok(CurrentSession::Unauthenticated);
        }

        let user: UserResponse = handle_json_response(response).await?;
        Ok(CurrentSession::Authenticated(SessionSnapshot::from(user)))
    }
}

/// Query and fragment parameters of a callback URL; fragment values win.
fn callback_params(callback_url: &Url) -> HashMap<String, String> {
    let mut params: HashMap<String, String> = callback_url.query_pairs().into_owned().collect();
    if let Some(fragment) = callback_url.fragment() {
        params.extend(url::form_urlencoded::parse(fragment.as_bytes()).into_owned());
    }
    params
}

/// Random PKCE verifier, 43 URL-safe characters.
fn generate_pkce_verifier() -> Result<String, BackendError> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|err| BackendError::Config(format!("failed to generate PKCE verifier: {err}")))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// S256 challenge for a PKCE verifier.
fn pkce_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest)
}

async fn send(builder: RequestBuilder) -> Result<Response, BackendError> {
    builder.send().await.map_err(map_request_error)
}

/// Maps transport errors into user-facing variants with timeout detection.
fn map_request_error(err: reqwest::Error) -> BackendError {
    if err.is_timeout() {
        BackendError::Timeout
    } else {
        BackendError::Network(err.to_string())
    }
}

async fn handle_json_response<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    if response.status().is_success() {
        response
            .json::<T>()
            .await
            .map_err(|err| BackendError::Parse(format!("Failed to decode response: {err}")))
    } else {
        Err(error_from_response(response).await)
    }
}

async fn handle_empty_response(response: Response) -> Result<(), BackendError> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(error_from_response(response).await)
    }
}

async fn error_from_response(response: Response) -> BackendError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .ok()
        .and_then(ErrorResponse::into_message)
        .unwrap_or(body);

    BackendError::Http {
        status,
        message: sanitize_message(&message),
    }
}

/// Trims and truncates service messages before they reach the user.
fn sanitize_message(message: &str) -> String {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        "Request failed.".to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_CHARS).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::auth::validator::normalize_phone;
    use serde_json::json;
    use std::net::TcpListener;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    fn backend(server: &MockServer) -> HttpBackend {
        let base = Url::parse(&server.uri()).unwrap();
        HttpBackend::new(&base, SecretString::from("anon-key".to_string())).unwrap()
    }

    /// The browser location after the provider redirects back to the app.
    fn returned_to(suffix: &str) -> Url {
        Url::parse(&format!("https://app.example.com/auth/callback{suffix}")).unwrap()
    }

    fn session_body(full_name: Option<&str>) -> serde_json::Value {
        json!({
            "access_token": "access-1",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "refresh-1",
            "user": {
                "id": "user-1",
                "email": "a@b.com",
                "user_metadata": { "full_name": full_name }
            }
        })
    }

    #[tokio::test]
    async fn request_code_posts_email_with_create_flag() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(OTP_PATH))
            .and(header("apikey", "anon-key"))
            .and(body_json(json!({ "email": "a@b.com", "create_user": true })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let result = backend(&server)
            .request_one_time_code("a@b.com", RequestCodeOptions { allow_create: true })
            .await;
        assert_eq!(result, Ok(()));
    }

    #[tokio::test]
    async fn verify_stores_tokens_and_returns_snapshot() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(VERIFY_PATH))
            .and(body_json(json!({ "type": "email", "email": "a@b.com", "token": "123456" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body(Some("Jane"))))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(USER_PATH))
            .and(header("authorization", "Bearer access-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "user-1",
                "user_metadata": { "full_name": "Jane" }
            })))
            .mount(&server)
            .await;

        let backend = backend(&server);
        let snapshot = backend
            .verify_one_time_code("a@b.com", &OneTimeCode::new("123456"))
            .await
            .unwrap();
        assert_eq!(snapshot, SessionSnapshot::authenticated(Some("Jane")));

        let current = backend.get_current_session().await.unwrap();
        assert_eq!(
            current,
            CurrentSession::Authenticated(SessionSnapshot::authenticated(Some("Jane")))
        );
    }

    #[tokio::test]
    async fn verify_failure_surfaces_service_message() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(VERIFY_PATH))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "code": 403,
                "error_code": "otp_expired",
                "msg": "Token has expired or is invalid"
            })))
            .mount(&server)
            .await;

        let result = backend(&server)
            .verify_one_time_code("a@b.com", &OneTimeCode::new("000000"))
            .await;
        assert_eq!(
            result,
            Err(BackendError::Http {
                status: 403,
                message: "Token has expired or is invalid".to_string()
            })
        );
    }

    #[tokio::test]
    async fn plain_text_errors_are_truncated() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(OTP_PATH))
            .respond_with(ResponseTemplate::new(502).set_body_string("x".repeat(500)))
            .mount(&server)
            .await;

        let result = backend(&server)
            .request_one_time_code("a@b.com", RequestCodeOptions { allow_create: true })
            .await;
        match result {
            Err(BackendError::Http { status, message }) => {
                assert_eq!(status, 502);
                assert_eq!(message.len(), MAX_ERROR_CHARS);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn signed_out_backend_reports_unauthenticated() {
        let base = Url::parse("http://127.0.0.1:9").unwrap();
        let backend = HttpBackend::new(&base, SecretString::from("anon-key".to_string())).unwrap();

        assert_eq!(
            backend.get_current_session().await,
            Ok(CurrentSession::Unauthenticated)
        );
        assert_eq!(
            backend.refresh_session().await,
            Err(BackendError::NotSignedIn)
        );
        let update = ProfileUpdate {
            display_name: "Jane".to_string(),
            phone_number: normalize_phone("12345678", "+506", 8).unwrap(),
        };
        assert_eq!(
            backend.update_profile(&update).await,
            Err(BackendError::NotSignedIn)
        );
    }

    #[tokio::test]
    async fn unreachable_service_is_a_network_error() {
        let base = Url::parse("http://127.0.0.1:9").unwrap();
        let backend = HttpBackend::new(&base, SecretString::from("anon-key".to_string())).unwrap();

        let result = backend
            .request_one_time_code("a@b.com", RequestCodeOptions { allow_create: true })
            .await;
        assert!(matches!(result, Err(BackendError::Network(_))), "{result:?}");
    }

    #[tokio::test]
    async fn authorize_url_carries_provider_callback_and_challenge() {
        let base = Url::parse("https://id.example.com/").unwrap();
        let backend = HttpBackend::new(&base, SecretString::from("anon-key".to_string())).unwrap();
        let callback = Url::parse("https://app.example.com/auth/callback").unwrap();

        let redirect = backend
            .begin_federated_sign_in(Provider::Github, &callback)
            .await
            .unwrap();
        assert_eq!(redirect.url.path(), AUTHORIZE_PATH);

        let params: HashMap<String, String> = redirect.url.query_pairs().into_owned().collect();
        assert_eq!(params["provider"], "github");
        assert_eq!(params["redirect_to"], "https://app.example.com/auth/callback");
        assert_eq!(params["code_challenge_method"], "s256");

        let verifier = backend.state.lock().await.pkce_verifier.clone().unwrap();
        assert_eq!(
            params["code_challenge"],
            pkce_challenge(verifier.expose_secret())
        );
    }

    #[tokio::test]
    async fn pkce_callback_exchanges_code() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(query_param("grant_type", "pkce"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body(None)))
            .expect(1)
            .mount(&server)
            .await;

        let backend = backend(&server);
        let callback = Url::parse("https://app.example.com/auth/callback").unwrap();
        backend
            .begin_federated_sign_in(Provider::Google, &callback)
            .await
            .unwrap();

        let returned = returned_to("?code=auth-code-1");
        assert_eq!(backend.complete_federated_sign_in(&returned).await, Ok(()));
        assert!(backend.state.lock().await.tokens.is_some());
        assert!(backend.state.lock().await.pkce_verifier.is_none());
    }

    #[tokio::test]
    async fn code_callback_without_pending_sign_in_is_rejected() {
        let base = Url::parse("https://id.example.com").unwrap();
        let backend = HttpBackend::new(&base, SecretString::from("anon-key".to_string())).unwrap();
        let returned = returned_to("?code=auth-code-1");

        assert!(matches!(
            backend.complete_federated_sign_in(&returned).await,
            Err(BackendError::Provider(_))
        ));
    }

    #[tokio::test]
    async fn fragment_tokens_are_adopted() {
        let base = Url::parse("https://id.example.com").unwrap();
        let backend = HttpBackend::new(&base, SecretString::from("anon-key".to_string())).unwrap();
        let returned = returned_to("#access_token=a1&refresh_token=r1&token_type=bearer");

        assert_eq!(backend.complete_federated_sign_in(&returned).await, Ok(()));
        let access = backend.access_token().await.unwrap();
        assert_eq!(access.expose_secret(), "a1");
    }

    #[tokio::test]
    async fn provider_errors_in_callback_are_surfaced() {
        let base = Url::parse("https://id.example.com").unwrap();
        let backend = HttpBackend::new(&base, SecretString::from("anon-key".to_string())).unwrap();
        let returned =
            returned_to("?error=access_denied&error_description=User+denied+access");

        assert_eq!(
            backend.complete_federated_sign_in(&returned).await,
            Err(BackendError::Provider("User denied access".to_string()))
        );
    }

    #[tokio::test]
    async fn expired_access_token_reads_as_signed_out() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(USER_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "msg": "JWT expired" })))
            .mount(&server)
            .await;

        let backend = backend(&server);
        let returned = returned_to("#access_token=a1&refresh_token=r1");
        backend.complete_federated_sign_in(&returned).await.unwrap();

        assert_eq!(
            backend.get_current_session().await,
            Ok(CurrentSession::Unauthenticated)
        );
        assert_eq!(
            backend.refresh_session().await,
            Err(BackendError::NotSignedIn)
        );
    }

    #[tokio::test]
    async fn profile_update_and_refresh_use_session_tokens() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(USER_PATH))
            .and(header("authorization", "Bearer a1"))
            .and(body_json(json!({
                "data": { "full_name": "Jane Doe", "phone_number": "+50612345678" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "user-1" })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(query_param("grant_type", "refresh_token"))
            .and(body_json(json!({ "refresh_token": "r1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body(Some("Jane Doe"))))
            .expect(1)
            .mount(&server)
            .await;

        let backend = backend(&server);
        let returned = returned_to("#access_token=a1&refresh_token=r1");
        backend.complete_federated_sign_in(&returned).await.unwrap();

        let update = ProfileUpdate {
            display_name: "Jane Doe".to_string(),
            phone_number: normalize_phone("12345678", "+506", 8).unwrap(),
        };
        assert_eq!(backend.update_profile(&update).await, Ok(()));

        let snapshot = backend.refresh_session().await.unwrap();
        assert_eq!(snapshot.display_name.as_deref(), Some("Jane Doe"));
        assert_eq!(backend.access_token().await.unwrap().expose_secret(), "access-1");
    }

    #[test]
    fn pkce_challenge_matches_rfc_example() {
        // RFC 7636 appendix B
        assert_eq!(
            pkce_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn generated_verifier_is_url_safe() {
        let verifier = generate_pkce_verifier().unwrap();
        assert_eq!(verifier.len(), 43);
        assert!(
            verifier
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn sanitize_message_handles_empty_and_long_bodies() {
        assert_eq!(sanitize_message("  "), "Request failed.");
        assert_eq!(sanitize_message(" oops "), "oops");
        assert_eq!(sanitize_message(&"y".repeat(300)).len(), MAX_ERROR_CHARS);
    }
}
