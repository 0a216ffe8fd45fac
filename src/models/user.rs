use anyhow::Result;
use rusqlite::{Row, Transaction, types::Value};

use crate::auth::{self, AuthError};
use crate::db::{Insertable, Query};

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub email: String,
    pub password_hash: String,
    pub verified: bool,
}

impl User {
    /// Builds an unverified user, normalizing the email and hashing the
    /// password.
    ///
    /// # Examples
    ///
    /// ```
    /// use pathfork::models::User;
    ///
    /// let user = User::new("  Writer@Example.COM ", "hunter22").unwrap();
    /// assert_eq!(user.email, "writer@example.com");
    /// assert!(!user.verified);
    /// assert_ne!(user.password_hash, "hunter22");
    /// ```
    pub fn new(email: &str, raw_password: &str) -> Result<Self, AuthError> {
        Ok(Self {
            email: Self::normalize_email(email),
            password_hash: auth::hash_password(raw_password)?,
            verified: false,
        })
    }

    /// Lowercases and trims an email address.
    pub fn normalize_email(email: &str) -> String {
        email.trim().to_lowercase()
    }

    /// Checks a raw password against the stored hash.
    pub fn check_password(&self, raw_password: &str) -> bool {
        auth::verify_password(raw_password, &self.password_hash)
    }

    pub fn by_email(email: &str) -> Query<User> {
        Query::new(
            "SELECT email, pw, verified FROM tbl_user WHERE email = ?1",
            vec![Value::Text(Self::normalize_email(email))],
            user_from_row,
        )
    }

    /// Marks the account as verified.
    pub fn mark_verified(tx: &Transaction<'_>, email: &str) -> Result<()> {
        tx.execute(
            "UPDATE tbl_user SET verified = 1 WHERE email = ?1",
            [email],
        )?;
        Ok(())
    }

    /// Removes an account that was never verified. Verified accounts are
    /// left alone.
    pub fn delete_unverified(tx: &Transaction<'_>, email: &str) -> Result<()> {
        tx.execute(
            "DELETE FROM tbl_user WHERE email = ?1 AND verified = 0",
            [email],
        )?;
        Ok(())
    }

    /// Replaces the account's password with a fresh hash of `raw_password`.
    pub fn update_password(tx: &Transaction<'_>, email: &str, raw_password: &str) -> Result<()> {
        let hashed = auth::hash_password(raw_password)?;
        tx.execute(
            "UPDATE tbl_user SET pw = ?1 WHERE email = ?2",
            (hashed, email),
        )?;
        Ok(())
    }
}

impl Insertable for User {
    fn insert_sql(&self) -> &str {
        "INSERT INTO tbl_user (email, pw, verified) VALUES (?1, ?2, ?3) RETURNING user_id"
    }

    fn insert_args(&self) -> Vec<Value> {
        vec![
            Value::Text(self.email.clone()),
            Value::Text(self.password_hash.clone()),
            Value::from(self.verified),
        ]
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        email: row.get(0)?,
        password_hash: row.get(1)?,
        verified: row.get(2)?,
    })
}
