use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use uuid::Uuid;

use credo_storage::{
    Account, AccountFilter, AccountId, NewAccount, Store, StoreError, VerificationStatus,
};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub struct SqliteStore {
    pool: SqlitePool,
}

// (id, name, email, password_hash, is_admin, verified, verification_token,
//  created_at, updated_at, deleted_at)
type AccountRow = (
    String,
    String,
    String,
    String,
    i64,
    i64,
    Option<String>,
    i64,
    i64,
    Option<i64>,
);

const ACCOUNT_COLUMNS: &str = "id,name,email,password_hash,is_admin,verified,\
     verification_token,created_at,updated_at,deleted_at";

fn ts(secs: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| StoreError::Backend(format!("invalid timestamp: {secs}")))
}

fn row_to_account(row: AccountRow) -> Result<Account, StoreError> {
    let (id, name, email, password_hash, is_admin, verified, token, created, updated, deleted) =
        row;
    let id = Uuid::try_parse(&id).map_err(|e| StoreError::Backend(e.to_string()))?;
    Ok(Account {
        id: AccountId(id),
        name,
        email,
        password_hash,
        is_admin: is_admin != 0,
        verified: if verified != 0 {
            VerificationStatus::Verified
        } else {
            VerificationStatus::Unverified
        },
        verification_token: token,
        created_at: ts(created)?,
        updated_at: ts(updated)?,
        deleted_at: deleted.map(ts).transpose()?,
    })
}

fn map_unique(e: sqlx::Error) -> StoreError {
    let s = e.to_string();
    if s.contains("UNIQUE") {
        StoreError::AlreadyExists
    } else {
        StoreError::Backend(s)
    }
}

impl SqliteStore {
    /// `~/.credo/store.db` (creates dir with 0700 perms on unix)
    pub async fn open_default() -> Result<Self, StoreError> {
        let dir = dirs::home_dir()
            .ok_or_else(|| StoreError::Backend("no home dir".into()))?
            .join(".credo");
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::Backend(e.to_string()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o700))
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        let path = dir.join("store.db");
        let url = format!("sqlite://{}?mode=rwc", path.to_string_lossy());
        Self::open(&url).await
    }

    pub async fn open_in_memory() -> Result<Self, StoreError> {
        Self::open("sqlite::memory:").await
    }

    pub async fn open(url: &str) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(Self { pool })
    }
}

#[async_trait::async_trait]
impl Store for SqliteStore {
    async fn create_account(&self, params: &NewAccount) -> Result<Account, StoreError> {
        let id = Uuid::now_v7();
        let now = Utc::now().timestamp();
        sqlx::query(
            "INSERT INTO accounts(id,name,email,password_hash,is_admin,verified,\
             verification_token,created_at,updated_at)
             VALUES(?,?,?,?,0,0,?,?,?)",
        )
        .bind(id.to_string())
        .bind(&params.name)
        .bind(&params.email)
        .bind(&params.password_hash)
        .bind(&params.verification_token)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_unique)?;

        Ok(Account {
            id: AccountId(id),
            name: params.name.clone(),
            email: params.email.clone(),
            password_hash: params.password_hash.clone(),
            is_admin: false,
            verified: VerificationStatus::Unverified,
            verification_token: Some(params.verification_token.clone()),
            created_at: ts(now)?,
            updated_at: ts(now)?,
            deleted_at: None,
        })
    }

    async fn get_account(&self, id: &AccountId) -> Result<Account, StoreError> {
        let sql =
            format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id=? AND deleted_at IS NULL");
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(id.0.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        match row {
            Some(row) => row_to_account(row),
            None => Err(StoreError::NotFound),
        }
    }

    async fn get_account_by_verification_token(
        &self,
        token: &str,
    ) -> Result<Account, StoreError> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts \
             WHERE verification_token=? AND deleted_at IS NULL"
        );
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        match row {
            Some(row) => row_to_account(row),
            None => Err(StoreError::NotFound),
        }
    }

    async fn list_accounts(&self, filter: &AccountFilter) -> Result<Vec<Account>, StoreError> {
        let mut sql =
            format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE deleted_at IS NULL");
        if filter.verified.is_some() {
            sql.push_str(" AND verified=?");
        }
        if filter.is_admin.is_some() {
            sql.push_str(" AND is_admin=?");
        }
        sql.push_str(" ORDER BY created_at, id");

        let mut query = sqlx::query_as::<_, AccountRow>(&sql);
        if let Some(verified) = filter.verified {
            query = query.bind(verified as i64);
        }
        if let Some(is_admin) = filter.is_admin {
            query = query.bind(is_admin as i64);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        rows.into_iter().map(row_to_account).collect()
    }

    async fn email_in_use(
        &self,
        email: &str,
        exclude: Option<&AccountId>,
    ) -> Result<bool, StoreError> {
        let row = match exclude {
            Some(id) => {
                sqlx::query_as::<_, (i64,)>(
                    "SELECT 1 FROM accounts \
                     WHERE email=? AND deleted_at IS NULL AND id<>? LIMIT 1",
                )
                .bind(email)
                .bind(id.0.to_string())
                .fetch_optional(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, (i64,)>(
                    "SELECT 1 FROM accounts WHERE email=? AND deleted_at IS NULL LIMIT 1",
                )
                .bind(email)
                .fetch_optional(&self.pool)
                .await
            }
        }
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(row.is_some())
    }

    async fn update_account(&self, account: &Account) -> Result<Account, StoreError> {
        let now = Utc::now().timestamp();
        let result = sqlx::query(
            "UPDATE accounts SET name=?,email=?,password_hash=?,is_admin=?,verified=?,\
             verification_token=?,updated_at=?
             WHERE id=? AND deleted_at IS NULL",
        )
        .bind(&account.name)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.is_admin as i64)
        .bind(account.verified.is_verified() as i64)
        .bind(&account.verification_token)
        .bind(now)
        .bind(account.id.0.to_string())
        .execute(&self.pool)
        .await
        .map_err(map_unique)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        let mut updated = account.clone();
        updated.updated_at = ts(now)?;
        Ok(updated)
    }

    async fn delete_account(&self, id: &AccountId) -> Result<(), StoreError> {
        let now = Utc::now().timestamp();
        let result = sqlx::query(
            "UPDATE accounts SET deleted_at=?, updated_at=? WHERE id=? AND deleted_at IS NULL",
        )
        .bind(now)
        .bind(now)
        .bind(id.0.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
