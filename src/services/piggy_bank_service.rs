//! Piggy banks: named goals funded from and returned to the owning account.
//!
//! Every change to `current_amount` is mirrored by an opposite change to the
//! account balance in the same unit of work.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        piggy_bank::{CreatePiggyBankRequest, PiggyBank},
        transaction::{NewEntry, TransactionKind},
    },
    services::{
        account_store,
        ledger::{self, Posting},
        policy,
    },
};

const PIGGY_COLUMNS: &str = "id, account_id, name, target_amount, current_amount, icon, color, is_active, created_at, updated_at";

pub async fn create_piggy_bank(
    pool: &DbPool,
    user_id: Uuid,
    request: CreatePiggyBankRequest,
) -> Result<PiggyBank, AppError> {
    let name = request.name.trim();
    if name.is_empty() || name.chars().count() > 100 {
        return Err(AppError::validation("Piggy bank name must be 1-100 characters"));
    }
    policy::ensure_amount_in_range(request.target_amount, policy::MIN_PIGGY_TARGET)?;

    let mut conn = pool.acquire().await?;
    let account = account_store::find_owned(&mut conn, user_id, request.account_id).await?;

    let piggy = sqlx::query_as::<_, PiggyBank>(&format!(
        r#"
        INSERT INTO piggy_banks (account_id, name, target_amount, icon, color)
        VALUES ($1, $2, $3, COALESCE($4, 'piggy'), COALESCE($5, '#f472b6'))
        RETURNING {PIGGY_COLUMNS}
        "#
    ))
    .bind(account.id)
    .bind(name)
    .bind(request.target_amount)
    .bind(request.icon)
    .bind(request.color)
    .fetch_one(&mut *conn)
    .await?;

    Ok(piggy)
}

pub async fn list_piggy_banks(pool: &DbPool, user_id: Uuid) -> Result<Vec<PiggyBank>, AppError> {
    let piggies = sqlx::query_as::<_, PiggyBank>(&format!(
        r#"
        SELECT {PIGGY_COLUMNS}
        FROM piggy_banks p
        WHERE EXISTS (SELECT 1 FROM accounts a WHERE a.id = p.account_id AND a.user_id = $1)
        ORDER BY p.created_at DESC
        "#
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(piggies)
}

async fn lock_owned(
    conn: &mut PgConnection,
    user_id: Uuid,
    piggy_id: Uuid,
) -> Result<PiggyBank, AppError> {
    let piggy = sqlx::query_as::<_, PiggyBank>(&format!(
        r#"
        SELECT {PIGGY_COLUMNS}
        FROM piggy_banks p
        WHERE p.id = $1
          AND EXISTS (SELECT 1 FROM accounts a WHERE a.id = p.account_id AND a.user_id = $2)
        FOR UPDATE
        "#
    ))
    .bind(piggy_id)
    .bind(user_id)
    .fetch_optional(conn)
    .await?
    .ok_or(AppError::NotFound("Piggy bank"))?;

    if !piggy.is_active {
        return Err(AppError::precondition("Piggy bank is no longer active"));
    }

    Ok(piggy)
}

async fn store_amount(
    conn: &mut PgConnection,
    piggy_id: Uuid,
    current_amount: i64,
    is_active: bool,
) -> Result<PiggyBank, AppError> {
    let piggy = sqlx::query_as::<_, PiggyBank>(&format!(
        r#"
        UPDATE piggy_banks
        SET current_amount = $1, is_active = $2, updated_at = NOW()
        WHERE id = $3
        RETURNING {PIGGY_COLUMNS}
        "#
    ))
    .bind(current_amount)
    .bind(is_active)
    .bind(piggy_id)
    .fetch_one(conn)
    .await?;

    Ok(piggy)
}

/// Move `amount` from the owning account into the piggy bank.
pub async fn deposit(
    pool: &DbPool,
    user_id: Uuid,
    piggy_id: Uuid,
    amount: i64,
) -> Result<(PiggyBank, i64), AppError> {
    policy::ensure_amount_in_range(amount, policy::MIN_PIGGY_DEPOSIT)?;

    let mut tx = pool.begin().await?;
    let piggy = lock_owned(&mut tx, user_id, piggy_id).await?;

    let entry = NewEntry::debit(TransactionKind::PiggyDeposit, piggy.account_id, amount)
        .with_description(Some(format!("Piggy bank deposit: {}", piggy.name)));
    let applied = ledger::apply(
        &mut tx,
        entry,
        &[Posting::debit(piggy.account_id, amount)],
    )
    .await?;

    let updated = store_amount(&mut tx, piggy.id, piggy.current_amount + amount, true).await?;

    tx.commit().await?;

    tracing::info!(piggy_id = %piggy.id, amount, "piggy bank deposit");

    Ok((updated, applied.balance_of(piggy.account_id)))
}

/// Move money from the piggy bank back to its account.
///
/// `None` withdraws everything. Emptying the piggy bank deactivates it.
pub async fn withdraw(
    pool: &DbPool,
    user_id: Uuid,
    piggy_id: Uuid,
    amount: Option<i64>,
) -> Result<(PiggyBank, i64), AppError> {
    if let Some(amount) = amount {
        policy::ensure_amount_in_range(amount, 1)?;
    }

    let mut tx = pool.begin().await?;
    let piggy = lock_owned(&mut tx, user_id, piggy_id).await?;

    let amount = amount.unwrap_or(piggy.current_amount);
    if amount <= 0 {
        return Err(AppError::precondition("Piggy bank is empty"));
    }
    if amount > piggy.current_amount {
        return Err(AppError::InsufficientBalance);
    }

    let entry = NewEntry::credit(TransactionKind::PiggyWithdraw, piggy.account_id, amount)
        .with_description(Some(format!("Piggy bank withdrawal: {}", piggy.name)));
    let applied = ledger::apply(
        &mut tx,
        entry,
        &[Posting::credit(piggy.account_id, amount)],
    )
    .await?;

    let remaining = piggy.current_amount - amount;
    let updated = store_amount(&mut tx, piggy.id, remaining, remaining > 0).await?;

    tx.commit().await?;

    tracing::info!(piggy_id = %piggy.id, amount, remaining, "piggy bank withdrawal");

    Ok((updated, applied.balance_of(piggy.account_id)))
}
