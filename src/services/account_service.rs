//! Account lifecycle: opening (with the one-time welcome bonus), lock and
//! unlock, transfer limits and PIN management.

use chrono::Utc;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        account::Account,
        transaction::{NewEntry, TransactionKind},
    },
    services::{
        account_store,
        ledger::{self, Posting},
        policy, security,
    },
};

/// Open an account for `user_id` on the caller's transaction.
///
/// If this is the user's first account it is credited [`policy::WELCOME_BONUS`]
/// through the balance mutator as a DEPOSIT entry. Returns the account as it
/// stands after the bonus and the bonus amount (zero for later accounts).
pub async fn open_account(conn: &mut PgConnection, user_id: Uuid) -> Result<(Account, i64), AppError> {
    // Serializes concurrent account openings for the same user, so exactly one
    // of them can observe "no accounts yet".
    sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    let is_first = account_store::primary_for_user(conn, user_id).await?.is_none();
    let account = account_store::insert(conn, user_id).await?;

    if !is_first {
        return Ok((account, 0));
    }

    let entry = NewEntry::credit(TransactionKind::Deposit, account.id, policy::WELCOME_BONUS)
        .with_description(Some("Welcome bonus".to_string()));
    let applied = ledger::apply(
        conn,
        entry,
        &[Posting::credit(account.id, policy::WELCOME_BONUS)],
    )
    .await?;

    tracing::info!(%user_id, account_id = %account.id, "welcome bonus credited");

    let account = Account {
        balance: applied.balance_of(account.id),
        ..account
    };
    Ok((account, policy::WELCOME_BONUS))
}

/// Open an additional account in its own transaction.
pub async fn create_account(pool: &DbPool, user_id: Uuid) -> Result<(Account, i64), AppError> {
    let mut tx = pool.begin().await?;
    let opened = open_account(&mut tx, user_id).await?;
    tx.commit().await?;

    Ok(opened)
}

/// Require the PIN when the account has one. Accounts without a PIN pass.
pub fn verify_pin(account: &Account, pin: Option<&str>) -> Result<(), AppError> {
    match (&account.pin_hash, pin) {
        (None, _) => Ok(()),
        (Some(_), None) => Err(AppError::validation("PIN is required")),
        (Some(hash), Some(pin)) if security::verify_secret(pin, hash) => Ok(()),
        (Some(_), Some(_)) => Err(AppError::precondition("Incorrect PIN")),
    }
}

/// Reject an outgoing debit that would exceed the account's daily or monthly limit.
///
/// Call after the account row is locked so concurrent debits see each other.
pub async fn ensure_within_limits(
    conn: &mut PgConnection,
    account: &Account,
    debit: i64,
) -> Result<(), AppError> {
    let now = Utc::now();
    let day_start = policy::utc_day_start(now);
    let month_start = policy::utc_month_start(now);

    let today = ledger::outgoing_since(conn, account.id, day_start).await?;
    if today + debit > account.daily_limit {
        return Err(AppError::precondition("Daily transaction limit exceeded"));
    }

    let this_month = ledger::outgoing_since(conn, account.id, month_start).await?;
    if this_month + debit > account.monthly_limit {
        return Err(AppError::precondition("Monthly transaction limit exceeded"));
    }

    Ok(())
}

pub async fn lock_account(pool: &DbPool, user_id: Uuid, account_id: Uuid) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;
    let account = account_store::find_owned(&mut tx, user_id, Some(account_id)).await?;
    account_store::set_locked(&mut tx, account.id, true).await?;
    tx.commit().await?;

    tracing::info!(%account_id, "account locked");
    Ok(())
}

pub async fn unlock_account(
    pool: &DbPool,
    user_id: Uuid,
    account_id: Uuid,
    pin: Option<&str>,
) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;
    let account = account_store::find_owned(&mut tx, user_id, Some(account_id)).await?;
    verify_pin(&account, pin)?;
    account_store::set_locked(&mut tx, account.id, false).await?;
    tx.commit().await?;

    tracing::info!(%account_id, "account unlocked");
    Ok(())
}

pub async fn update_limits(
    pool: &DbPool,
    user_id: Uuid,
    account_id: Uuid,
    daily_limit: i64,
    monthly_limit: i64,
) -> Result<Account, AppError> {
    policy::ensure_limits(daily_limit, monthly_limit)?;

    let mut tx = pool.begin().await?;
    let account = account_store::find_owned(&mut tx, user_id, Some(account_id)).await?;
    let account = account_store::set_limits(&mut tx, account.id, daily_limit, monthly_limit).await?;
    tx.commit().await?;

    Ok(account)
}

/// Set a first PIN, or change an existing one given the current PIN.
pub async fn set_pin(
    pool: &DbPool,
    user_id: Uuid,
    account_id: Uuid,
    current_pin: Option<&str>,
    new_pin: &str,
) -> Result<(), AppError> {
    policy::ensure_pin_format(new_pin)?;

    let mut tx = pool.begin().await?;
    let account = account_store::find_owned(&mut tx, user_id, Some(account_id)).await?;
    if account.pin_hash.is_some() {
        verify_pin(&account, current_pin)?;
    }
    account_store::set_pin_hash(&mut tx, account.id, &security::hash_secret(new_pin)).await?;
    tx.commit().await?;

    tracing::info!(%account_id, "account PIN changed");
    Ok(())
}
