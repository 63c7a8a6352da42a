//! SurrealDB implementation of [`AccountRepository`].
//!
//! Password hashing uses Argon2id with OWASP-recommended parameters
//! (memory: 19 MiB, iterations: 2, parallelism: 1). Salt is randomly
//! generated per hash. An optional pepper (server-side secret) can be
//! provided at construction time.

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher};
use chrono::{DateTime, NaiveDate, Utc};
use idhub_core::error::HubResult;
use idhub_core::models::account::{Account, AccountStatus, CreateAccount, UpdateAccount};
use idhub_core::repository::AccountRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct AccountRow {
    owner_id: String,
    name: String,
    status: String,
    password_hash: String,
    expire_date: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `record::id(id)`.
#[derive(Debug, SurrealValue)]
struct AccountRowWithId {
    record_id: String,
    owner_id: String,
    name: String,
    status: String,
    password_hash: String,
    expire_date: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_status(s: &str) -> Result<AccountStatus, DbError> {
    match s {
        "Active" => Ok(AccountStatus::Active),
        "Expired" => Ok(AccountStatus::Expired),
        "Quarantined" => Ok(AccountStatus::Quarantined),
        other => Err(DbError::Decode(format!("unknown account status: {other}"))),
    }
}

fn status_to_string(s: AccountStatus) -> &'static str {
    match s {
        AccountStatus::Active => "Active",
        AccountStatus::Expired => "Expired",
        AccountStatus::Quarantined => "Quarantined",
    }
}

fn parse_expire_date(s: Option<String>) -> Result<Option<NaiveDate>, DbError> {
    s.map(|d| {
        NaiveDate::parse_from_str(&d, "%Y-%m-%d")
            .map_err(|e| DbError::Decode(format!("invalid expire date '{d}': {e}")))
    })
    .transpose()
}

impl AccountRow {
    fn into_account(self, id: Uuid) -> Result<Account, DbError> {
        let owner_id = Uuid::parse_str(&self.owner_id)
            .map_err(|e| DbError::Decode(format!("invalid owner UUID: {e}")))?;
        Ok(Account {
            id,
            owner_id,
            name: self.name,
            status: parse_status(&self.status)?,
            password_hash: self.password_hash,
            expire_date: parse_expire_date(self.expire_date)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl AccountRowWithId {
    fn try_into_account(self) -> Result<Account, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Decode(format!("invalid UUID: {e}")))?;
        let owner_id = Uuid::parse_str(&self.owner_id)
            .map_err(|e| DbError::Decode(format!("invalid owner UUID: {e}")))?;
        Ok(Account {
            id,
            owner_id,
            name: self.name,
            status: parse_status(&self.status)?,
            password_hash: self.password_hash,
            expire_date: parse_expire_date(self.expire_date)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Hash a password with Argon2id using OWASP-recommended parameters.
///
/// If a pepper is provided, it is prepended to the password before
/// hashing. The salt is randomly generated for each call.
fn hash_password(password: &str, pepper: Option<&str>) -> Result<String, DbError> {
    // OWASP ASVS recommended: m=19456 (19 MiB), t=2, p=1
    let params = argon2::Params::new(19456, 2, 1, None)
        .map_err(|e| DbError::Decode(format!("argon2 params error: {e}")))?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let peppered: String;
    let input = match pepper {
        Some(p) => {
            peppered = format!("{p}{password}");
            peppered.as_bytes()
        }
        None => password.as_bytes(),
    };

    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    let hash = argon2
        .hash_password(input, &salt)
        .map_err(|e| DbError::Decode(format!("password hash error: {e}")))?;

    Ok(hash.to_string())
}

/// Verify a password against an Argon2id hash.
pub fn verify_password(password: &str, hash: &str, pepper: Option<&str>) -> Result<bool, DbError> {
    use argon2::PasswordVerifier;

    let peppered: String;
    let input = match pepper {
        Some(p) => {
            peppered = format!("{p}{password}");
            peppered.as_bytes()
        }
        None => password.as_bytes(),
    };

    let parsed_hash = argon2::PasswordHash::new(hash)
        .map_err(|e| DbError::Decode(format!("invalid hash format: {e}")))?;

    let argon2 = Argon2::default();
    match argon2.verify_password(input, &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(DbError::Decode(format!("verify error: {e}"))),
    }
}

/// SurrealDB implementation of the account repository.
#[derive(Clone)]
pub struct SurrealAccountRepository<C: Connection> {
    db: Surreal<C>,
    /// Optional server-side pepper for password hashing.
    pepper: Option<String>,
}

impl<C: Connection> SurrealAccountRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db, pepper: None }
    }

    pub fn with_pepper(db: Surreal<C>, pepper: String) -> Self {
        Self {
            db,
            pepper: Some(pepper),
        }
    }
}

impl<C: Connection> AccountRepository for SurrealAccountRepository<C> {
    async fn create(&self, input: CreateAccount) -> HubResult<Account> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let password_hash = hash_password(&input.password, self.pepper.as_deref())?;

        let result = self
            .db
            .query(
                "CREATE type::record('account', $id) SET \
                 owner_id = $owner_id, \
                 name = $name, \
                 status = $status, \
                 password_hash = $password_hash, \
                 expire_date = $expire_date",
            )
            .bind(("id", id_str.clone()))
            .bind(("owner_id", input.owner_id.to_string()))
            .bind(("name", input.name))
            .bind(("status", "Active".to_string()))
            .bind(("password_hash", password_hash))
            .bind((
                "expire_date",
                input.expire_date.map(|d| d.format("%Y-%m-%d").to_string()),
            ))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Decode(e.to_string()))?;

        let rows: Vec<AccountRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "account".into(),
            id: id_str,
        })?;

        Ok(row.into_account(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> HubResult<Account> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('account', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AccountRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "account".into(),
            id: id_str,
        })?;

        Ok(row.into_account(id)?)
    }

    async fn get_by_name(&self, name: &str) -> HubResult<Account> {
        let mut result = self
            .db
            .query(
                "SELECT record::id(id) AS record_id, * FROM account \
                 WHERE name = $name",
            )
            .bind(("name", name.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AccountRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "account".into(),
            id: format!("name={name}"),
        })?;

        Ok(row.try_into_account()?)
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> HubResult<Vec<Account>> {
        let mut result = self
            .db
            .query(
                "SELECT record::id(id) AS record_id, * FROM account \
                 WHERE owner_id = $owner_id ORDER BY name ASC",
            )
            .bind(("owner_id", owner_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AccountRowWithId> = result.take(0).map_err(DbError::from)?;

        let accounts = rows
            .into_iter()
            .map(|row| row.try_into_account())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(accounts)
    }

    async fn update(&self, id: Uuid, input: UpdateAccount) -> HubResult<Account> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.status.is_some() {
            sets.push("status = $status");
        }
        if input.expire_date.is_some() {
            sets.push("expire_date = $expire_date");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('account', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(status) = input.status {
            builder = builder.bind(("status", status_to_string(status).to_string()));
        }
        if let Some(expire_date) = input.expire_date {
            // expire_date is Option<Option<NaiveDate>>: Some(Some(d)) = set, Some(None) = clear
            builder = builder.bind((
                "expire_date",
                expire_date.map(|d| d.format("%Y-%m-%d").to_string()),
            ));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Decode(e.to_string()))?;

        let rows: Vec<AccountRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "account".into(),
            id: id_str,
        })?;

        Ok(row.into_account(id)?)
    }

    async fn set_password(&self, id: Uuid, password: &str) -> HubResult<()> {
        let id_str = id.to_string();

        let password_hash = hash_password(password, self.pepper.as_deref())?;

        self.db
            .query(
                "UPDATE type::record('account', $id) SET \
                 password_hash = $password_hash, \
                 updated_at = time::now()",
            )
            .bind(("id", id_str))
            .bind(("password_hash", password_hash))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }
}
