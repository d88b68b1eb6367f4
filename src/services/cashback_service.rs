//! Cashback accrual and redemption.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        cashback::CashbackEntry,
        transaction::{NewEntry, Transaction, TransactionKind},
    },
    services::{
        account_store,
        ledger::{self, Posting},
        policy,
    },
};

#[derive(Debug)]
pub struct RedeemOutcome {
    pub amount: i64,
    pub new_balance: i64,
    pub transaction: Transaction,
}

/// Accrue cashback for `amount_charged` on the caller's transaction.
///
/// Adds to the account's cashback balance and records a PENDING history row
/// pointing at the ledger entry that earned it. Returns the accrued amount.
pub async fn accrue(
    conn: &mut PgConnection,
    account_id: Uuid,
    transaction_id: Uuid,
    amount_charged: i64,
) -> Result<i64, AppError> {
    let cashback = policy::cashback_for(amount_charged);
    if cashback == 0 {
        return Ok(0);
    }

    account_store::adjust_cashback(conn, account_id, cashback).await?;

    sqlx::query(
        r#"
        INSERT INTO cashback_history (account_id, transaction_id, amount, status)
        VALUES ($1, $2, $3, 'PENDING')
        "#,
    )
    .bind(account_id)
    .bind(transaction_id)
    .bind(cashback)
    .execute(conn)
    .await?;

    Ok(cashback)
}

/// Move the whole cashback balance into the main balance.
///
/// Only allowed once the cashback balance reaches
/// [`policy::CASHBACK_REDEEM_THRESHOLD`]. The credit, the reset of the
/// cashback balance and the PENDING -> REDEEMED flip commit together.
pub async fn redeem(
    pool: &DbPool,
    user_id: Uuid,
    account_id: Option<Uuid>,
) -> Result<RedeemOutcome, AppError> {
    let mut tx = pool.begin().await?;

    let account = account_store::find_owned(&mut tx, user_id, account_id).await?;

    let cashback: i64 =
        sqlx::query_scalar("SELECT cashback_balance FROM accounts WHERE id = $1 FOR UPDATE")
            .bind(account.id)
            .fetch_one(&mut *tx)
            .await?;

    if cashback < policy::CASHBACK_REDEEM_THRESHOLD {
        return Err(AppError::precondition(format!(
            "Cashback balance is below the redemption threshold of {} VND",
            policy::CASHBACK_REDEEM_THRESHOLD
        )));
    }

    let entry = NewEntry::credit(TransactionKind::CashbackRedeem, account.id, cashback)
        .with_description(Some("Cashback redemption".to_string()));
    let applied = ledger::apply(&mut tx, entry, &[Posting::credit(account.id, cashback)]).await?;

    account_store::adjust_cashback(&mut tx, account.id, -cashback).await?;

    sqlx::query(
        r#"
        UPDATE cashback_history
        SET status = 'REDEEMED', redeemed_at = NOW()
        WHERE account_id = $1 AND status = 'PENDING'
        "#,
    )
    .bind(account.id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(account_id = %account.id, amount = cashback, "cashback redeemed");

    Ok(RedeemOutcome {
        amount: cashback,
        new_balance: applied.balance_of(account.id),
        transaction: applied.entry,
    })
}

/// Current cashback balance and the most recent accruals.
pub async fn summary(
    pool: &DbPool,
    user_id: Uuid,
    account_id: Option<Uuid>,
) -> Result<(i64, Vec<CashbackEntry>), AppError> {
    let mut conn = pool.acquire().await?;
    let account = account_store::find_owned(&mut conn, user_id, account_id).await?;

    let history = sqlx::query_as::<_, CashbackEntry>(
        r#"
        SELECT id, account_id, transaction_id, amount, status, created_at, redeemed_at
        FROM cashback_history
        WHERE account_id = $1
        ORDER BY created_at DESC
        LIMIT 50
        "#,
    )
    .bind(account.id)
    .fetch_all(&mut *conn)
    .await?;

    Ok((account.cashback_balance, history))
}
