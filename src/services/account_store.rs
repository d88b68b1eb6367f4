//! Account Store: reads, row locks and column writes on `accounts`.
//!
//! Functions take `&mut PgConnection` so they run inside whatever database
//! transaction the caller has open. Ownership checks always filter by
//! `user_id` so one customer can never reach another's account by id.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::account::{Account, AccountSnapshot},
};

const ACCOUNT_COLUMNS: &str = "id, user_id, account_number, balance, cashback_balance, daily_limit, monthly_limit, is_locked, pin_hash, created_at, updated_at";

/// Fetch an account owned by `user_id`.
///
/// With `account_id` absent this is the caller's primary (oldest) account.
pub async fn find_owned(
    conn: &mut PgConnection,
    user_id: Uuid,
    account_id: Option<Uuid>,
) -> Result<Account, AppError> {
    let account = match account_id {
        Some(id) => {
            sqlx::query_as::<_, Account>(&format!(
                "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1 AND user_id = $2"
            ))
            .bind(id)
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await?
        }
        None => primary_for_user(conn, user_id).await?,
    };

    account.ok_or(AppError::NotFound("Account"))
}

/// The oldest account of a user, if they have any.
pub async fn primary_for_user(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> Result<Option<Account>, AppError> {
    let account = sqlx::query_as::<_, Account>(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE user_id = $1 ORDER BY created_at, id LIMIT 1"
    ))
    .bind(user_id)
    .fetch_optional(conn)
    .await?;

    Ok(account)
}

pub async fn list_for_user(conn: &mut PgConnection, user_id: Uuid) -> Result<Vec<Account>, AppError> {
    let accounts = sqlx::query_as::<_, Account>(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE user_id = $1 ORDER BY created_at, id"
    ))
    .bind(user_id)
    .fetch_all(conn)
    .await?;

    Ok(accounts)
}

pub async fn find_by_number(
    conn: &mut PgConnection,
    account_number: &str,
) -> Result<Option<Account>, AppError> {
    let account = sqlx::query_as::<_, Account>(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_number = $1"
    ))
    .bind(account_number)
    .fetch_optional(conn)
    .await?;

    Ok(account)
}

/// Lock the given accounts for the rest of the transaction.
///
/// Rows are locked in id order so two transactions touching the same pair of
/// accounts always acquire the locks in the same sequence and cannot deadlock.
/// Missing ids are simply absent from the result.
pub async fn lock_many(
    conn: &mut PgConnection,
    account_ids: &[Uuid],
) -> Result<Vec<AccountSnapshot>, AppError> {
    let mut ids = account_ids.to_vec();
    ids.sort();
    ids.dedup();

    let snapshots = sqlx::query_as::<_, AccountSnapshot>(
        "SELECT id, balance, is_locked FROM accounts WHERE id = ANY($1) ORDER BY id FOR UPDATE",
    )
    .bind(&ids)
    .fetch_all(conn)
    .await?;

    Ok(snapshots)
}

pub async fn set_balance(conn: &mut PgConnection, account_id: Uuid, balance: i64) -> Result<(), AppError> {
    sqlx::query("UPDATE accounts SET balance = $1, updated_at = NOW() WHERE id = $2")
        .bind(balance)
        .bind(account_id)
        .execute(conn)
        .await?;

    Ok(())
}

/// Add `delta` to the cashback balance and return the new value.
pub async fn adjust_cashback(conn: &mut PgConnection, account_id: Uuid, delta: i64) -> Result<i64, AppError> {
    let cashback = sqlx::query_scalar::<_, i64>(
        r#"
        UPDATE accounts
        SET cashback_balance = cashback_balance + $1,
            updated_at = NOW()
        WHERE id = $2
        RETURNING cashback_balance
        "#,
    )
    .bind(delta)
    .bind(account_id)
    .fetch_optional(conn)
    .await?
    .ok_or(AppError::NotFound("Account"))?;

    Ok(cashback)
}

pub async fn set_locked(conn: &mut PgConnection, account_id: Uuid, locked: bool) -> Result<(), AppError> {
    sqlx::query("UPDATE accounts SET is_locked = $1, updated_at = NOW() WHERE id = $2")
        .bind(locked)
        .bind(account_id)
        .execute(conn)
        .await?;

    Ok(())
}

pub async fn set_limits(
    conn: &mut PgConnection,
    account_id: Uuid,
    daily_limit: i64,
    monthly_limit: i64,
) -> Result<Account, AppError> {
    let account = sqlx::query_as::<_, Account>(&format!(
        r#"
        UPDATE accounts
        SET daily_limit = $1, monthly_limit = $2, updated_at = NOW()
        WHERE id = $3
        RETURNING {ACCOUNT_COLUMNS}
        "#
    ))
    .bind(daily_limit)
    .bind(monthly_limit)
    .bind(account_id)
    .fetch_one(conn)
    .await?;

    Ok(account)
}

pub async fn set_pin_hash(conn: &mut PgConnection, account_id: Uuid, pin_hash: &str) -> Result<(), AppError> {
    sqlx::query("UPDATE accounts SET pin_hash = $1, updated_at = NOW() WHERE id = $2")
        .bind(pin_hash)
        .bind(account_id)
        .execute(&mut *conn)
        .await?;

    sqlx::query("INSERT INTO pin_change_history (account_id) VALUES ($1)")
        .bind(account_id)
        .execute(conn)
        .await?;

    Ok(())
}

/// Insert a new account with a zero balance and a fresh 12-digit number.
pub async fn insert(conn: &mut PgConnection, user_id: Uuid) -> Result<Account, AppError> {
    // A clash on the unique account number is vanishingly rare; draw again a few times.
    for _ in 0..5 {
        let number = generate_account_number();
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM accounts WHERE account_number = $1)")
                .bind(&number)
                .fetch_one(&mut *conn)
                .await?;
        if exists {
            continue;
        }

        let account = sqlx::query_as::<_, Account>(&format!(
            r#"
            INSERT INTO accounts (user_id, account_number)
            VALUES ($1, $2)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(&number)
        .fetch_one(&mut *conn)
        .await?;

        return Ok(account);
    }

    Err(AppError::Conflict(
        "Could not allocate an account number, please retry".to_string(),
    ))
}

/// `9704` bank prefix followed by eight random digits.
fn generate_account_number() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let suffix: String = (0..8)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect();
    format!("9704{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::policy::is_account_number;

    #[test]
    fn generated_numbers_are_account_numbers() {
        for _ in 0..100 {
            let number = generate_account_number();
            assert!(is_account_number(&number), "{number}");
            assert!(number.starts_with("9704"));
        }
    }
}
