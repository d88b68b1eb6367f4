//! Term savings: open from the main balance, withdraw with maturity-dependent interest.

use chrono::Utc;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        savings::SavingsAccount,
        transaction::{NewEntry, TransactionKind},
    },
    services::{
        account_store,
        ledger::{self, Posting},
        policy,
    },
};

const SAVINGS_COLUMNS: &str = "id, account_id, name, principal, term_months, interest_rate_bp, maturity_date, is_active, payout, withdrawn_at, created_at";

#[derive(Debug)]
pub struct SavingsWithdrawal {
    pub principal: i64,
    pub interest: i64,
    pub total_amount: i64,
    pub matured: bool,
    pub balance: i64,
}

/// Open a term deposit funded by debiting `amount` from the account.
pub async fn create_savings(
    pool: &DbPool,
    user_id: Uuid,
    account_id: Option<Uuid>,
    amount: i64,
    term_months: i32,
    name: &str,
) -> Result<(SavingsAccount, i64), AppError> {
    policy::ensure_amount_in_range(amount, policy::MIN_SAVINGS_PRINCIPAL)?;
    let rate_bp = policy::savings_rate_bp(term_months)
        .ok_or_else(|| AppError::validation("Unsupported savings term"))?;
    let name = name.trim();
    if name.is_empty() || name.chars().count() > 100 {
        return Err(AppError::validation("Savings name must be 1-100 characters"));
    }

    let now = Utc::now();
    let maturity = policy::maturity_date(now, term_months)
        .ok_or_else(|| AppError::validation("Unsupported savings term"))?;

    let mut tx = pool.begin().await?;
    let account = account_store::find_owned(&mut tx, user_id, account_id).await?;

    let entry = NewEntry::debit(TransactionKind::SavingsDeposit, account.id, amount)
        .with_description(Some(format!("Savings deposit: {name}")));
    let applied = ledger::apply(&mut tx, entry, &[Posting::debit(account.id, amount)]).await?;

    let savings = sqlx::query_as::<_, SavingsAccount>(&format!(
        r#"
        INSERT INTO savings_accounts (account_id, name, principal, term_months, interest_rate_bp, maturity_date, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {SAVINGS_COLUMNS}
        "#
    ))
    .bind(account.id)
    .bind(name)
    .bind(amount)
    .bind(term_months)
    .bind(rate_bp)
    .bind(maturity)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(savings_id = %savings.id, account_id = %account.id, amount, term_months, "savings opened");

    Ok((savings, applied.balance_of(account.id)))
}

/// Close a term deposit, paying principal plus interest back to its account.
///
/// A deposit can be withdrawn once; afterwards it stays inactive.
pub async fn withdraw_savings(
    pool: &DbPool,
    user_id: Uuid,
    savings_id: Uuid,
) -> Result<SavingsWithdrawal, AppError> {
    let mut tx = pool.begin().await?;

    let savings = sqlx::query_as::<_, SavingsAccount>(&format!(
        r#"
        SELECT {SAVINGS_COLUMNS}
        FROM savings_accounts s
        WHERE s.id = $1
          AND EXISTS (SELECT 1 FROM accounts a WHERE a.id = s.account_id AND a.user_id = $2)
        FOR UPDATE
        "#
    ))
    .bind(savings_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("Savings account"))?;

    if !savings.is_active {
        return Err(AppError::precondition("Savings account is no longer active"));
    }

    let now = Utc::now();
    let (interest, matured) = policy::savings_interest(
        savings.principal,
        savings.interest_rate_bp,
        savings.created_at,
        savings.maturity_date,
        now,
    );
    let total = savings.principal + interest;

    let entry = NewEntry::credit(TransactionKind::SavingsWithdraw, savings.account_id, total)
        .with_description(Some(format!("Savings withdrawal: {}", savings.name)));
    let applied = ledger::apply(
        &mut tx,
        entry,
        &[Posting::credit(savings.account_id, total)],
    )
    .await?;

    sqlx::query(
        "UPDATE savings_accounts SET is_active = false, payout = $1, withdrawn_at = $2 WHERE id = $3",
    )
    .bind(total)
    .bind(now)
    .bind(savings.id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(savings_id = %savings.id, interest, matured, "savings withdrawn");

    Ok(SavingsWithdrawal {
        principal: savings.principal,
        interest,
        total_amount: total,
        matured,
        balance: applied.balance_of(savings.account_id),
    })
}

pub async fn list_savings(pool: &DbPool, user_id: Uuid) -> Result<Vec<SavingsAccount>, AppError> {
    let savings = sqlx::query_as::<_, SavingsAccount>(&format!(
        r#"
        SELECT {SAVINGS_COLUMNS}
        FROM savings_accounts s
        WHERE EXISTS (SELECT 1 FROM accounts a WHERE a.id = s.account_id AND a.user_id = $1)
        ORDER BY s.created_at DESC
        "#
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(savings)
}
