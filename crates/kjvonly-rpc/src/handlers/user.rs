// crates/kjvonly-rpc/src/handlers/user.rs
//
// UserService: user management and login.
//
// Every method except Authenticate requires the ADMIN role. Business
// failures (validation, not found, duplicates) are reported in the
// response's `error` field; the HTTP status stays 200.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kjvonly_auth::{hash_password, TokenService};
use kjvonly_core::user::normalize_email;
use kjvonly_core::{Claims, NewUser, RequestContext, Role, StoreError, UpdateUser, User, UserStore};

use crate::registry::{Endpoint, RpcService};

pub const INVALID_EMAIL: &str = "invalid email format";
pub const AUTHENTICATION_FAILED: &str = "authentication failed";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request for `UserService.CreateUser`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    #[serde(rename = "newUser")]
    pub new_user: NewUser,
}

/// Request for `UserService.UpdateUser`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    pub user: UpdateUser,
}

/// Request for `UserService.DeleteUser`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteUserRequest {
    pub email: String,
}

/// Request for `UserService.QueryUser`. Takes no parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryUserRequest {}

/// Request for `UserService.QueryUserByID`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryUserByIdRequest {
    pub id: String,
}

/// Request for `UserService.QueryUserByEmail`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryUserByEmailRequest {
    pub email: String,
}

/// Request for `UserService.Authenticate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticateRequest {
    pub username: String,
    pub password: String,
}

/// Response carrying a single user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UserResponse {
    fn ok(user: User) -> Self {
        Self {
            user: Some(user),
            error: None,
        }
    }

    fn err(message: impl Into<String>) -> Self {
        Self {
            user: None,
            error: Some(message.into()),
        }
    }
}

impl From<Result<User, StoreError>> for UserResponse {
    fn from(result: Result<User, StoreError>) -> Self {
        match result {
            Ok(user) => Self::ok(user),
            Err(e) => Self::err(store_error_message(&e)),
        }
    }
}

/// Response for `UserService.QueryUser`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsersResponse {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response for `UserService.Authenticate`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthenticateResponse {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Message shown to the caller for a store failure. Backend faults are
/// logged and reported generically.
fn store_error_message(err: &StoreError) -> String {
    match err {
        StoreError::Backend(_) | StoreError::InvalidRecord(_) => {
            tracing::warn!("User store failure: {}", err);
            "internal storage error".to_string()
        }
        other => other.to_string(),
    }
}

/// Hash on the blocking pool.
async fn hash_off_thread(password: String) -> Result<String, String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| e.to_string())?
        .map_err(|e| e.to_string())
}

fn check_new_password(password: &str, confirm: &str) -> Result<(), &'static str> {
    if password.is_empty() {
        return Err("password must not be empty");
    }
    if password != confirm {
        return Err("passwords do not match");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// UserService
// ---------------------------------------------------------------------------

/// User management RPC service.
pub struct UserService {
    store: Arc<dyn UserStore>,
    tokens: Arc<TokenService>,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>, tokens: Arc<TokenService>) -> Self {
        Self { store, tokens }
    }

    /// Create a user from `newUser`.
    pub async fn create_user(self: Arc<Self>, req: CreateUserRequest, ctx: RequestContext) -> UserResponse {
        let new_user = req.new_user;
        let Some(email) = normalize_email(&new_user.email) else {
            return UserResponse::err(INVALID_EMAIL);
        };
        if new_user.name.trim().is_empty() {
            return UserResponse::err("name must not be empty");
        }
        if let Err(msg) = check_new_password(&new_user.password, &new_user.password_confirm) {
            return UserResponse::err(msg);
        }
        let password_hash = match hash_off_thread(new_user.password).await {
            Ok(hash) => hash,
            Err(e) => {
                tracing::error!("Password hashing failed: {}", e);
                return UserResponse::err("could not hash password");
            }
        };

        let mut roles = new_user.roles;
        roles.sort();
        roles.dedup();

        let user = User {
            id: Uuid::now_v7(),
            name: new_user.name.trim().to_string(),
            email,
            roles,
            password_hash,
            department: new_user.department,
            enabled: true,
            date_created: ctx.now,
            date_updated: ctx.now,
        };
        self.store.create(&ctx, user).await.into()
    }

    /// Apply a partial update to the user named by `user.email`.
    pub async fn update_user(self: Arc<Self>, req: UpdateUserRequest, ctx: RequestContext) -> UserResponse {
        let mut update = req.user;
        let Some(email) = normalize_email(&update.email) else {
            return UserResponse::err(INVALID_EMAIL);
        };
        update.email = email;

        let password_hash = match update.password.take() {
            Some(password) => {
                let confirm = update.password_confirm.take().unwrap_or_default();
                if let Err(msg) = check_new_password(&password, &confirm) {
                    return UserResponse::err(msg);
                }
                match hash_off_thread(password).await {
                    Ok(hash) => Some(hash),
                    Err(e) => {
                        tracing::error!("Password hashing failed: {}", e);
                        return UserResponse::err("could not hash password");
                    }
                }
            }
            None => None,
        };
        if let Some(roles) = update.roles.as_mut() {
            roles.sort();
            roles.dedup();
        }

        self.store.update(&ctx, update, password_hash).await.into()
    }

    pub async fn delete_user(self: Arc<Self>, req: DeleteUserRequest, ctx: RequestContext) -> UserResponse {
        let Some(email) = normalize_email(&req.email) else {
            return UserResponse::err(INVALID_EMAIL);
        };
        self.store.delete(&ctx, &email).await.into()
    }

    pub async fn query_user(self: Arc<Self>, _req: QueryUserRequest, ctx: RequestContext) -> UsersResponse {
        match self.store.query_all(&ctx).await {
            Ok(users) => UsersResponse { users, error: None },
            Err(e) => UsersResponse {
                users: Vec::new(),
                error: Some(store_error_message(&e)),
            },
        }
    }

    pub async fn query_user_by_id(
        self: Arc<Self>,
        req: QueryUserByIdRequest,
        ctx: RequestContext,
    ) -> UserResponse {
        let Ok(id) = Uuid::parse_str(req.id.trim()) else {
            return UserResponse::err("invalid user id");
        };
        self.store.query_by_id(&ctx, &id).await.into()
    }

    pub async fn query_user_by_email(
        self: Arc<Self>,
        req: QueryUserByEmailRequest,
        ctx: RequestContext,
    ) -> UserResponse {
        let Some(email) = normalize_email(&req.email) else {
            return UserResponse::err(INVALID_EMAIL);
        };
        self.store.query_by_email(&ctx, &email).await.into()
    }

    /// Check credentials and issue a session token.
    ///
    /// Unknown user, wrong password and disabled account all produce the
    /// same response.
    pub async fn authenticate(
        self: Arc<Self>,
        req: AuthenticateRequest,
        ctx: RequestContext,
    ) -> AuthenticateResponse {
        let Some(email) = normalize_email(&req.username) else {
            return AuthenticateResponse {
                token: String::new(),
                error: Some(INVALID_EMAIL.to_string()),
            };
        };

        let user = match self.store.authenticate(&ctx, &email, &req.password).await {
            Ok(user) => user,
            Err(StoreError::Cancelled) => {
                return AuthenticateResponse {
                    token: String::new(),
                    error: Some(StoreError::Cancelled.to_string()),
                };
            }
            Err(e) => {
                if !matches!(e, StoreError::AuthenticationFailed) {
                    tracing::warn!("Credential check error: {}", e);
                }
                return AuthenticateResponse {
                    token: String::new(),
                    error: Some(AUTHENTICATION_FAILED.to_string()),
                };
            }
        };

        let claims = Claims::for_subject(user.id.to_string(), user.roles.iter().copied());
        match self.tokens.issue(&claims, ctx.now) {
            Ok(token) => {
                tracing::info!(subject = %user.id, "Issued session token");
                AuthenticateResponse { token, error: None }
            }
            Err(e) => {
                tracing::error!(subject = %user.id, "Token issuance failed: {}", e);
                AuthenticateResponse {
                    token: String::new(),
                    error: Some("could not issue token".to_string()),
                }
            }
        }
    }
}

impl RpcService for UserService {
    const NAME: &'static str = "UserService";

    fn endpoints(self: Arc<Self>) -> Vec<(&'static str, Endpoint)> {
        let admin = &[Role::Admin];
        vec![
            ("CreateUser", Endpoint::bound(admin, &self, Self::create_user)),
            ("UpdateUser", Endpoint::bound(admin, &self, Self::update_user)),
            ("DeleteUser", Endpoint::bound(admin, &self, Self::delete_user)),
            ("QueryUser", Endpoint::bound(admin, &self, Self::query_user)),
            ("QueryUserByID", Endpoint::bound(admin, &self, Self::query_user_by_id)),
            ("QueryUserByEmail", Endpoint::bound(admin, &self, Self::query_user_by_email)),
            ("Authenticate", Endpoint::bound(&[], &self, Self::authenticate)),
        ]
    }
}
