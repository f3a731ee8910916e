//! User repository: registration, authentication, and ladder scores.

use super::DbError;
use crate::protocol::ProfileBody;
use sqlx::SqlitePool;
use tracing::warn;

/// Stable numeric user identity, assigned by the store on registration and
/// never reused.
pub type UserId = u64;

/// Default ladder score for a fresh account.
const INITIAL_SCORE: i64 = 1000;

/// Score delta applied per decided game.
const SCORE_STEP: i64 = 30;

/// A registered user row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub score: i64,
    pub total_count: i64,
    pub win_count: i64,
}

impl From<&UserProfile> for ProfileBody {
    fn from(profile: &UserProfile) -> Self {
        Self {
            id: profile.id,
            score: profile.score,
            total_count: profile.total_count,
            win_count: profile.win_count,
        }
    }
}

type ProfileRow = (i64, String, i64, i64, i64);

fn row_to_profile((id, username, score, total_count, win_count): ProfileRow) -> UserProfile {
    UserProfile {
        id: id as UserId,
        username,
        score,
        total_count,
        win_count,
    }
}

/// Repository for user operations.
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Register a new user with the default ladder profile.
    pub async fn register(&self, username: &str, password: &str) -> Result<UserProfile, DbError> {
        if username.is_empty() || password.is_empty() {
            return Err(DbError::MissingCredentials);
        }
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            "INSERT INTO users (username, password, score, total_count, win_count, created_at) \
             VALUES (?, ?, ?, 0, 0, ?)",
        )
        .bind(username)
        .bind(password)
        .bind(INITIAL_SCORE)
        .bind(now)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return DbError::UserExists(username.to_string());
            }
            DbError::from(e)
        })?;

        Ok(UserProfile {
            id: result.last_insert_rowid() as UserId,
            username: username.to_string(),
            score: INITIAL_SCORE,
            total_count: 0,
            win_count: 0,
        })
    }

    /// Verify credentials and return the matching profile.
    ///
    /// Exactly one row may match both fields. Zero matches is a failed
    /// login; more than one is a data-integrity fault and is reported as a
    /// failed login too, never as an arbitrary row.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<UserProfile, DbError> {
        if username.is_empty() || password.is_empty() {
            return Err(DbError::MissingCredentials);
        }

        let mut rows = sqlx::query_as::<_, ProfileRow>(
            "SELECT id, username, score, total_count, win_count FROM users \
             WHERE username = ? AND password = ?",
        )
        .bind(username)
        .bind(password)
        .fetch_all(self.pool)
        .await?;

        if rows.len() > 1 {
            warn!(username = %username, matches = rows.len(), "credential lookup matched multiple rows");
            return Err(DbError::BadCredentials);
        }
        match rows.pop() {
            Some(row) => Ok(row_to_profile(row)),
            None => Err(DbError::BadCredentials),
        }
    }

    /// Find a user by name.
    pub async fn find_by_name(&self, username: &str) -> Result<Option<UserProfile>, DbError> {
        let mut rows = sqlx::query_as::<_, ProfileRow>(
            "SELECT id, username, score, total_count, win_count FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_all(self.pool)
        .await?;

        if rows.len() > 1 {
            warn!(username = %username, matches = rows.len(), "user lookup matched multiple rows");
            return Ok(None);
        }
        Ok(rows.pop().map(row_to_profile))
    }

    /// Find a user by id.
    pub async fn find_by_id(&self, id: UserId) -> Result<Option<UserProfile>, DbError> {
        let mut rows = sqlx::query_as::<_, ProfileRow>(
            "SELECT id, username, score, total_count, win_count FROM users WHERE id = ?",
        )
        .bind(id as i64)
        .fetch_all(self.pool)
        .await?;

        if rows.len() > 1 {
            warn!(id, matches = rows.len(), "user lookup matched multiple rows");
            return Ok(None);
        }
        Ok(rows.pop().map(row_to_profile))
    }

    /// Record a win: score +30, one more game played, one more game won.
    /// The arithmetic happens in the UPDATE itself, not read-modify-write.
    pub async fn record_win(&self, id: UserId) -> Result<(), DbError> {
        let result = sqlx::query(
            "UPDATE users SET score = score + ?, total_count = total_count + 1, \
             win_count = win_count + 1 WHERE id = ?",
        )
        .bind(SCORE_STEP)
        .bind(id as i64)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::UserNotFound(id));
        }
        Ok(())
    }

    /// Record a loss: score -30, one more game played, wins unchanged.
    /// The score has no floor and may go negative.
    pub async fn record_lose(&self, id: UserId) -> Result<(), DbError> {
        let result = sqlx::query(
            "UPDATE users SET score = score - ?, total_count = total_count + 1 WHERE id = ?",
        )
        .bind(SCORE_STEP)
        .bind(id as i64)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::UserNotFound(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    async fn test_db() -> Database {
        Database::new(":memory:").await.expect("test database")
    }

    #[tokio::test]
    async fn register_then_authenticate_then_win() {
        let db = test_db().await;
        let users = db.users();

        let alice = users.register("alice", "pw1").await.expect("register");
        assert!(alice.id > 0);

        let profile = users.authenticate("alice", "pw1").await.expect("login");
        assert_eq!(profile.id, alice.id);
        assert_eq!(profile.score, 1000);
        assert_eq!(profile.total_count, 0);
        assert_eq!(profile.win_count, 0);

        users.record_win(alice.id).await.expect("win");

        let after = users
            .find_by_id(alice.id)
            .await
            .expect("lookup")
            .expect("profile");
        assert_eq!(after.score, 1030);
        assert_eq!(after.total_count, 1);
        assert_eq!(after.win_count, 1);
    }

    #[tokio::test]
    async fn register_rejects_empty_fields() {
        let db = test_db().await;
        let users = db.users();

        assert!(matches!(
            users.register("", "pw").await,
            Err(DbError::MissingCredentials)
        ));
        assert!(matches!(
            users.register("alice", "").await,
            Err(DbError::MissingCredentials)
        ));
    }

    #[tokio::test]
    async fn register_rejects_duplicate_username() {
        let db = test_db().await;
        let users = db.users();

        users.register("alice", "pw1").await.expect("register");
        let err = users.register("alice", "other").await.expect_err("dup");
        assert!(matches!(err, DbError::UserExists(name) if name == "alice"));
    }

    #[tokio::test]
    async fn authenticate_rejects_wrong_password() {
        let db = test_db().await;
        let users = db.users();

        users.register("alice", "pw1").await.expect("register");
        assert!(matches!(
            users.authenticate("alice", "wrong").await,
            Err(DbError::BadCredentials)
        ));
        assert!(matches!(
            users.authenticate("nobody", "pw1").await,
            Err(DbError::BadCredentials)
        ));
    }

    #[tokio::test]
    async fn duplicate_rows_never_authenticate() {
        let db = test_db().await;
        let users = db.users();

        // Simulate an integrity fault: remove the uniqueness index and
        // store two identical credential rows.
        sqlx::query("DROP INDEX idx_users_username")
            .execute(db.pool())
            .await
            .expect("drop index");
        for _ in 0..2 {
            sqlx::query(
                "INSERT INTO users (username, password, score, total_count, win_count, created_at) \
                 VALUES ('dup', 'pw', 1000, 0, 0, 0)",
            )
            .execute(db.pool())
            .await
            .expect("insert");
        }

        assert!(matches!(
            users.authenticate("dup", "pw").await,
            Err(DbError::BadCredentials)
        ));
        assert!(users.find_by_name("dup").await.expect("lookup").is_none());
    }

    #[tokio::test]
    async fn find_by_name_and_missing_user() {
        let db = test_db().await;
        let users = db.users();

        users.register("bob", "pw2").await.expect("register");

        let bob = users
            .find_by_name("bob")
            .await
            .expect("lookup")
            .expect("profile");
        assert_eq!(bob.username, "bob");
        assert_eq!(bob.score, 1000);

        assert!(users.find_by_name("ghost").await.expect("lookup").is_none());
        assert!(users.find_by_id(9999).await.expect("lookup").is_none());
    }

    #[tokio::test]
    async fn lose_decrements_and_has_no_floor() {
        let db = test_db().await;
        let users = db.users();

        let carol = users.register("carol", "pw3").await.expect("register");

        users.record_lose(carol.id).await.expect("lose");
        let after = users
            .find_by_id(carol.id)
            .await
            .expect("lookup")
            .expect("profile");
        assert_eq!(after.score, 970);
        assert_eq!(after.total_count, 1);
        assert_eq!(after.win_count, 0);

        for _ in 0..34 {
            users.record_lose(carol.id).await.expect("lose");
        }
        let broke = users
            .find_by_id(carol.id)
            .await
            .expect("lookup")
            .expect("profile");
        assert!(broke.score < 0);
        assert_eq!(broke.total_count, 35);
        assert_eq!(broke.win_count, 0);
    }

    #[tokio::test]
    async fn mixed_results_keep_win_count_bounded() {
        let db = test_db().await;
        let users = db.users();

        let dave = users.register("dave", "pw4").await.expect("register");
        users.record_win(dave.id).await.expect("win");
        users.record_lose(dave.id).await.expect("lose");
        users.record_win(dave.id).await.expect("win");

        let after = users
            .find_by_id(dave.id)
            .await
            .expect("lookup")
            .expect("profile");
        assert_eq!(after.score, 1030);
        assert_eq!(after.total_count, 3);
        assert_eq!(after.win_count, 2);
        assert!(after.win_count <= after.total_count);
    }

    #[tokio::test]
    async fn score_updates_require_existing_user() {
        let db = test_db().await;
        let users = db.users();

        assert!(matches!(
            users.record_win(42).await,
            Err(DbError::UserNotFound(42))
        ));
        assert!(matches!(
            users.record_lose(42).await,
            Err(DbError::UserNotFound(42))
        ));
    }
}
