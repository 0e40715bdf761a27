//! Account endpoints: login, registration, logout and the user profile

use super::to_body;
use crate::auth::{SessionEvent, TokenResponse};
use crate::client::{ApiClient, ApiRequest, AuthMode, FormPart};
use crate::Result;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

const LOGIN_PATH: &str = "/auth/login/";
const REGISTER_PATH: &str = "/auth/register/";
const LOGOUT_PATH: &str = "/auth/logout/";
const PROFILE_PATH: &str = "/auth/profile/";

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

/// The signed-in account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl User {
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(first), None) => first.clone(),
            _ => self.email.clone(),
        }
    }
}

/// Image uploaded with a profile update
#[derive(Debug, Clone)]
pub struct Avatar {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Profile fields to change; unset fields are left alone
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip)]
    pub avatar: Option<Avatar>,
}

impl ProfileUpdate {
    fn into_request(self) -> Result<ApiRequest> {
        let request = ApiRequest::patch(PROFILE_PATH).auth(AuthMode::Required);

        let Some(avatar) = self.avatar.clone() else {
            return Ok(request.json(to_body(&self)?));
        };

        let mut parts: Vec<FormPart> = [
            ("first_name", self.first_name),
            ("last_name", self.last_name),
            ("phone", self.phone),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| FormPart::text(name, v)))
        .collect();

        let mut file = FormPart::file("avatar", avatar.filename, avatar.bytes);
        if let Some(mime) = avatar.content_type {
            file = file.with_content_type(mime);
        }
        parts.push(file);

        Ok(request.multipart(parts))
    }
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(flatten)]
    tokens: TokenResponse,
    #[serde(default)]
    user: Option<User>,
}

pub struct Auth<'a> {
    client: &'a ApiClient,
}

impl<'a> Auth<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Sign in and persist the issued tokens.
    ///
    /// Clears the response cache, since cached reads may have been made
    /// anonymously or as another user.
    pub async fn login(&self, credentials: &Credentials) -> Result<User> {
        let request = ApiRequest::post(LOGIN_PATH)
            .json(to_body(credentials)?)
            .auth(AuthMode::Skip);
        let response: LoginResponse = self.client.send_as(request).await?;

        let storage = self.client.storage();
        storage.store_login(&response.tokens.into_pair())?;
        self.client.clear_cache();
        info!(email = %credentials.email, "Logged in");
        self.client.emit(SessionEvent::LoggedIn);

        match response.user {
            Some(user) => {
                storage.store_user(&serde_json::to_value(&user)?)?;
                Ok(user)
            }
            None => self.profile().await,
        }
    }

    /// Create an account; does not sign in
    pub async fn register(&self, registration: &Registration) -> Result<User> {
        let request = ApiRequest::post(REGISTER_PATH)
            .json(to_body(registration)?)
            .auth(AuthMode::Skip);
        Ok(self.client.send_as(request).await?)
    }

    /// Force a token refresh
    pub async fn refresh(&self) -> Result<()> {
        self.client.refresh_session().await?;
        Ok(())
    }

    /// Sign out and forget all client state.
    ///
    /// The server-side revoke is best effort; local state is cleared either
    /// way.
    pub async fn logout(&self) -> Result<()> {
        let storage = self.client.storage();
        if let Some(refresh) = storage.refresh_token()? {
            let request = ApiRequest::post(LOGOUT_PATH).json(json!({ "refresh": refresh }));
            if let Err(e) = self.client.send(request).await {
                warn!(error = %e, "Server-side logout failed, clearing local session anyway");
            }
        }

        storage.clear_all()?;
        self.client.clear_cache();
        info!("Logged out");
        self.client.emit(SessionEvent::LoggedOut);
        Ok(())
    }

    /// Current user; refreshes the stored copy
    pub async fn profile(&self) -> Result<User> {
        let request = ApiRequest::get(PROFILE_PATH).auth(AuthMode::Required);
        let user: User = self.client.send_as(request).await?;
        self.client
            .storage()
            .store_user(&serde_json::to_value(&user)?)?;
        Ok(user)
    }

    /// Last stored profile, without a network call
    pub fn cached_profile(&self) -> Result<Option<User>> {
        Ok(self
            .client
            .storage()
            .cached_user()?
            .and_then(|value| serde_json::from_value(value).ok()))
    }

    /// Update the profile; sent as multipart when an avatar is attached
    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<User> {
        let user: User = self.client.send_as(update.into_request()?).await?;
        self.client.invalidate(PROFILE_PATH);
        self.client
            .storage()
            .store_user(&serde_json::to_value(&user)?)?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::REFRESH_PATH;
    use crate::client::testing::{client_with, ScriptedTransport, BASE};
    use crate::client::Body;
    use crate::error::ApiError;
    use crate::StorefrontError;
    use reqwest::Method;
    use std::sync::Arc;

    fn user_json() -> serde_json::Value {
        json!({"id": 7, "email": "ada@example.com", "first_name": "Ada"})
    }

    fn credentials() -> Credentials {
        Credentials {
            email: "ada@example.com".into(),
            password: "secret".into(),
        }
    }

    #[tokio::test]
    async fn test_login_stores_session() {
        let transport = Arc::new(ScriptedTransport::new(BASE));
        transport.always(
            Method::POST,
            LOGIN_PATH,
            200,
            json!({"access": "a1", "refresh": "r1", "expires_in": 900, "user": user_json()}),
        );
        transport.always(Method::GET, "/books/", 200, json!({"count": 0, "results": []}));
        let client = client_with(transport.clone());
        client.get("/books/").await.unwrap();
        let mut events = client.subscribe();

        let user = client.auth().login(&credentials()).await.unwrap();
        assert_eq!(user.display_name(), "Ada");

        let storage = client.storage();
        assert_eq!(storage.access_token().unwrap().as_deref(), Some("a1"));
        assert_eq!(storage.refresh_token().unwrap().as_deref(), Some("r1"));
        assert!(storage.expires_at().unwrap().is_some());
        assert!(storage.login_at().unwrap().is_some());
        assert_eq!(client.auth().cached_profile().unwrap(), Some(user));
        assert_eq!(client.cached_entries(), 0);
        assert_eq!(events.recv().await.unwrap(), SessionEvent::LoggedIn);

        // Credentials never travel with a bearer token
        assert_eq!(transport.sent()[1].header("authorization"), None);
    }

    #[tokio::test]
    async fn test_login_without_user_fetches_profile() {
        let transport = Arc::new(ScriptedTransport::new(BASE));
        transport.always(Method::POST, LOGIN_PATH, 200, json!({"access": "a1", "refresh": "r1"}));
        transport.always(Method::GET, PROFILE_PATH, 200, user_json());
        let client = client_with(transport.clone());

        let user = client.auth().login(&credentials()).await.unwrap();
        assert_eq!(user.id, 7);
        let profile_call = &transport.sent()[1];
        assert_eq!(profile_call.header("authorization"), Some("Bearer a1"));
    }

    #[tokio::test]
    async fn test_login_with_out_of_range_lifetime() {
        let transport = Arc::new(ScriptedTransport::new(BASE));
        transport.always(
            Method::POST,
            LOGIN_PATH,
            200,
            json!({"access": "a1", "refresh": "r1", "expires_in": 9_000_000_000_000_000i64, "user": user_json()}),
        );
        let client = client_with(transport.clone());

        let user = client.auth().login(&credentials()).await.unwrap();
        assert_eq!(user.id, 7);
        let storage = client.storage();
        assert_eq!(storage.access_token().unwrap().as_deref(), Some("a1"));
        assert_eq!(storage.expires_at().unwrap(), None);
    }

    #[tokio::test]
    async fn test_bad_credentials() {
        let transport = Arc::new(ScriptedTransport::new(BASE));
        transport.always(
            Method::POST,
            LOGIN_PATH,
            401,
            json!({"detail": "No active account found with the given credentials"}),
        );
        let client = client_with(transport.clone());

        let err = client.auth().login(&credentials()).await.unwrap_err();
        match err {
            StorefrontError::Api(api) => {
                assert_eq!(api.status(), Some(401));
                assert!(api.normalized().message.starts_with("No active account"));
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(transport.calls_to(REFRESH_PATH), 0);
        assert!(!client.storage().has_credentials().unwrap());
    }

    #[tokio::test]
    async fn test_logout_clears_state_even_if_server_fails() {
        let transport = Arc::new(ScriptedTransport::new(BASE));
        transport.always(Method::POST, LOGIN_PATH, 200, json!({"access": "a1", "refresh": "r1", "user": user_json()}));
        transport.always(Method::POST, LOGOUT_PATH, 500, json!({}));
        let client = client_with(transport.clone());
        client.auth().login(&credentials()).await.unwrap();
        client
            .storage()
            .store_liked_books(&["dune".to_string()])
            .unwrap();
        let mut events = client.subscribe();

        client.auth().logout().await.unwrap();

        let logout = transport.sent().pop().unwrap();
        assert_eq!(logout.body, Body::Json(json!({"refresh": "r1"})));
        assert!(!client.storage().has_credentials().unwrap());
        assert_eq!(client.auth().cached_profile().unwrap(), None);
        assert!(client.storage().liked_books().unwrap().is_empty());
        assert_eq!(events.recv().await.unwrap(), SessionEvent::LoggedOut);
    }

    #[tokio::test]
    async fn test_profile_requires_login() {
        let transport = Arc::new(ScriptedTransport::new(BASE));
        let client = client_with(transport.clone());

        let err = client.auth().profile().await.unwrap_err();
        assert!(matches!(err, StorefrontError::Api(ApiError::Unauthenticated)));
        assert_eq!(transport.calls(), 0);
    }

    #[test]
    fn test_profile_update_body() {
        let update = ProfileUpdate {
            first_name: Some("Ada".into()),
            ..Default::default()
        };
        let request = update.into_request().unwrap();
        assert_eq!(request.body, Body::Json(json!({"first_name": "Ada"})));

        let update = ProfileUpdate {
            phone: Some("+998901234567".into()),
            avatar: Some(Avatar {
                filename: "me.png".into(),
                content_type: Some("image/png".into()),
                bytes: Bytes::from_static(b"png"),
            }),
            ..Default::default()
        };
        match update.into_request().unwrap().body {
            Body::Multipart(parts) => {
                let names: Vec<&str> = parts.iter().map(|p| p.name()).collect();
                assert_eq!(names, vec!["phone", "avatar"]);
            }
            other => panic!("unexpected body {:?}", other),
        }
    }
}
