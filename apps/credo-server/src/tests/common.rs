//! Shared helpers for handler tests: in-memory server, caller contexts, a
//! recording/failing email provider, and a deterministic token generator.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use credo_storage::{Account, AccountId, Store, VerificationStatus};
use credo_store_sqlite::SqliteStore;

use crate::auth::{AuthContext, HmacAuthenticator, Scope, UserIdentity};
use crate::config::ServerConfig;
use crate::email::{EmailError, EmailProvider, TokenGenerator};
use crate::handlers::accounts::{self, CreateAccountBody};
use crate::retry::RetryPolicy;
use crate::server::{CredoServer, Mailer};

pub struct SentEmail {
    pub to: String,
    pub verify_url: String,
}

/// Records every dispatch; fails the first `fail_remaining` attempts.
pub struct MockEmailProvider {
    pub sent: Mutex<Vec<SentEmail>>,
    attempts: AtomicUsize,
    fail_remaining: AtomicUsize,
}

impl MockEmailProvider {
    pub fn new() -> Arc<Self> {
        Self::failing(0)
    }

    pub fn failing(times: usize) -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
            fail_remaining: AtomicUsize::new(times),
        })
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl EmailProvider for MockEmailProvider {
    async fn send_verification(
        &self,
        to: &str,
        _name: &str,
        verify_url: &str,
        _from_address: &str,
        _from_name: Option<&str>,
    ) -> Result<(), EmailError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self
            .fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(EmailError::SendFailed("connection refused".to_string()));
        }
        self.sent.lock().unwrap().push(SentEmail {
            to: to.to_string(),
            verify_url: verify_url.to_string(),
        });
        Ok(())
    }
}

/// Deterministic token sequence: verify-token-0000, verify-token-0001, …
pub struct SeqTokenGenerator(AtomicUsize);

impl SeqTokenGenerator {
    pub fn new() -> Self {
        Self(AtomicUsize::new(0))
    }
}

impl TokenGenerator for SeqTokenGenerator {
    fn generate(&self) -> String {
        format!("verify-token-{:04}", self.0.fetch_add(1, Ordering::SeqCst))
    }
}

pub async fn test_server() -> (CredoServer, Arc<MockEmailProvider>) {
    test_server_with_provider(MockEmailProvider::new()).await
}

pub async fn test_server_with_provider(
    provider: Arc<MockEmailProvider>,
) -> (CredoServer, Arc<MockEmailProvider>) {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let config = ServerConfig {
        auth_secret: Some("test-secret".to_string()),
        email: None,
        verify_base_url: "http://localhost:8080".to_string(),
        retry: RetryPolicy::default(),
    };
    let server = CredoServer::new(
        Arc::new(store),
        Arc::new(HmacAuthenticator::new("test-secret")),
        Some(Arc::new(Mailer {
            provider: provider.clone(),
            from_address: "noreply@credo.test".to_string(),
            from_name: Some("Credo".to_string()),
        })),
        Arc::new(SeqTokenGenerator::new()),
        Arc::new(config),
    );
    (server, provider)
}

pub fn client_ctx() -> AuthContext {
    AuthContext::Client
}

pub fn user_ctx(account: &Account, scopes: &[Scope]) -> AuthContext {
    AuthContext::User(UserIdentity {
        account_id: account.id.clone(),
        scopes: scopes.iter().copied().collect(),
    })
}

pub fn manage_ctx(account: &Account) -> AuthContext {
    user_ctx(account, &[Scope::ManageAccount])
}

pub fn create_body(name: &str, email: &str, password: &str) -> CreateAccountBody {
    CreateAccountBody {
        name: Some(name.to_string()),
        email: Some(email.to_string()),
        password: Some(password.to_string()),
        password_confirmation: Some(password.to_string()),
    }
}

/// Create an account through the handler and return the stored record.
pub async fn create_account(server: &CredoServer, name: &str, email: &str) -> Account {
    let (status, Json(resp)) = accounts::create(
        State(server.clone()),
        client_ctx(),
        Json(create_body(name, email, "secret1")),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);

    let id = AccountId(Uuid::try_parse(&resp.identifier).unwrap());
    server.store.get_account(&id).await.unwrap()
}

pub async fn refresh(server: &CredoServer, account: &Account) -> Account {
    server.store.get_account(&account.id).await.unwrap()
}

pub async fn mark_verified(server: &CredoServer, account: &Account) -> Account {
    let mut verified = account.clone();
    verified.verified = VerificationStatus::Verified;
    verified.verification_token = None;
    server.store.update_account(&verified).await.unwrap()
}

pub async fn make_admin(server: &CredoServer, account: &Account) -> Account {
    let mut admin = account.clone();
    admin.verified = VerificationStatus::Verified;
    admin.verification_token = None;
    admin.is_admin = true;
    server.store.update_account(&admin).await.unwrap()
}
