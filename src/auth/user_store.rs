//! User Storage
//! Mission: Store and look up user identities with SQLite

use crate::auth::{
    models::{UpdateUserRequest, User, UserRole},
    password,
};
use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use tracing::{info, warn};

const USER_COLUMNS: &str =
    "id, username, email, password_hash, role, is_active, created_at, updated_at";

/// Store failures callers need to tell apart
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("username or email already exists")]
    Conflict,
    #[error("user not found")]
    NotFound,
    #[error("the last active admin cannot be demoted or deactivated")]
    LastAdmin,
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoreError {
    fn from_write(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ref e, _) if e.code == ErrorCode::ConstraintViolation => {
                StoreError::Conflict
            }
            other => StoreError::Database(other),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// User storage with SQLite backend
pub struct UserStore {
    db_path: String,
    hash_cost: u32,
    decoy_hash: String,
}

impl UserStore {
    /// Create a new user store and initialize database
    pub fn new(db_path: &str, hash_cost: u32) -> StoreResult<Self> {
        let store = Self {
            db_path: db_path.to_string(),
            hash_cost,
            decoy_hash: password::hash_password("decoy-credential", hash_cost)?,
        };
        store.init_db()?;
        Ok(store)
    }

    /// A hash at the store's cost with no matching account, checked against
    /// when a login names an unknown user so both paths cost the same.
    pub fn decoy_hash(&self) -> &str {
        &self.decoy_hash
    }

    fn connect(&self) -> StoreResult<Connection> {
        Ok(Connection::open(&self.db_path)?)
    }

    /// Initialize database schema
    fn init_db(&self) -> StoreResult<()> {
        let conn = self.connect()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT UNIQUE NOT NULL,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    /// Create the `admin` account when no admin exists yet.
    ///
    /// Returns whether an account was created.
    pub fn ensure_default_admin(&self, password: &str) -> StoreResult<bool> {
        let conn = self.connect()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE role = ?1",
            params![UserRole::Admin.as_str()],
            |row| row.get(0),
        )?;

        if count > 0 {
            return Ok(false);
        }

        match self.create_user("admin", "admin@example.com", password, UserRole::Admin) {
            Ok(_) => {}
            Err(StoreError::Conflict) => {
                warn!("⚠️  No admin exists but the `admin` account is taken; not seeding");
                return Ok(false);
            }
            Err(e) => return Err(e),
        }
        info!("🔐 Default admin user created (username: admin)");
        warn!("⚠️  Change the bootstrap admin password outside development");

        Ok(true)
    }

    /// Get user by username
    pub fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let conn = self.connect()?;
        let user = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
                params![username],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    /// Get user by id
    pub fn get_user_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        let conn = self.connect()?;
        let user = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    /// Create a new user; the password is hashed before it reaches the table.
    pub fn create_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: UserRole,
    ) -> StoreResult<User> {
        let password_hash = password::hash_password(password, self.hash_cost)?;
        let now = Utc::now().to_rfc3339();

        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO users (username, email, password_hash, role, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)",
            params![username, email, password_hash, role.as_str(), now],
        )
        .map_err(StoreError::from_write)?;

        let user = User {
            id: conn.last_insert_rowid(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            role,
            is_active: true,
            created_at: now.clone(),
            updated_at: now,
        };

        info!("✅ Created user: {} ({})", user.username, user.role.as_str());

        Ok(user)
    }

    /// Apply a partial update and return the stored result
    pub fn update_user(&self, id: i64, update: &UpdateUserRequest) -> StoreResult<User> {
        let mut user = self.get_user_by_id(id)?.ok_or(StoreError::NotFound)?;
        let was_active_admin = user.role == UserRole::Admin && user.is_active;

        if let Some(username) = &update.username {
            user.username = username.clone();
        }
        if let Some(email) = &update.email {
            user.email = email.clone();
        }
        if let Some(role) = update.role {
            user.role = role;
        }
        if let Some(is_active) = update.is_active {
            user.is_active = is_active;
        }
        user.updated_at = Utc::now().to_rfc3339();

        let conn = self.connect()?;

        if was_active_admin && (user.role != UserRole::Admin || !user.is_active) {
            let others: i64 = conn.query_row(
                "SELECT COUNT(*) FROM users WHERE role = ?1 AND is_active = 1 AND id != ?2",
                params![UserRole::Admin.as_str(), id],
                |row| row.get(0),
            )?;
            if others == 0 {
                return Err(StoreError::LastAdmin);
            }
        }

        let rows_affected = conn
            .execute(
                "UPDATE users
                 SET username = ?1, email = ?2, role = ?3, is_active = ?4, updated_at = ?5
                 WHERE id = ?6",
                params![
                    user.username,
                    user.email,
                    user.role.as_str(),
                    user.is_active,
                    user.updated_at,
                    id,
                ],
            )
            .map_err(StoreError::from_write)?;

        if rows_affected == 0 {
            return Err(StoreError::NotFound);
        }

        info!("✏️  Updated user: {} ({})", user.username, user.id);
        Ok(user)
    }

    /// One page of users ordered by id, plus the total count.
    pub fn list_users(&self, offset: u64, limit: u32) -> StoreResult<(Vec<User>, u64)> {
        let conn = self.connect()?;

        let total: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id LIMIT ?1 OFFSET ?2"
        ))?;
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        let users = stmt
            .query_map(params![i64::from(limit), offset], user_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((users, total.max(0) as u64))
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let role_str: String = row.get(4)?;
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        // Unknown tags in the table get the least privilege
        role: UserRole::parse(&role_str).unwrap_or(UserRole::User),
        is_active: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}
