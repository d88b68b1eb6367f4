//! Balance mutator and ledger entry writer.
//!
//! Every money-moving operation funnels through [`apply`]:
//!
//! 1. validate the entry draft against its kind
//! 2. lock every touched account (`FOR UPDATE`, id order)
//! 3. check existence, lock flags and resulting balances against the locked rows
//! 4. write the new balances and append exactly one ledger row
//!
//! `apply` runs on the caller's open transaction. The caller writes any
//! feature-specific side rows on the same connection and commits; an error
//! anywhere drops the transaction and PostgreSQL rolls everything back.

use std::collections::HashMap;

use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        account::AccountSnapshot,
        transaction::{NewEntry, Transaction},
    },
    services::account_store,
};

const TRANSACTION_COLUMNS: &str = "id, transaction_type, status, amount, fee, description, from_account_id, to_account_id, created_at";

/// A signed balance change on one account. Positive credits, negative debits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub account_id: Uuid,
    pub delta: i64,
}

impl Posting {
    pub fn credit(account_id: Uuid, amount: i64) -> Self {
        Self {
            account_id,
            delta: amount,
        }
    }

    pub fn debit(account_id: Uuid, amount: i64) -> Self {
        Self {
            account_id,
            delta: -amount,
        }
    }
}

/// Outcome of a committed-to-be mutation.
#[derive(Debug, Clone)]
pub struct Applied {
    pub entry: Transaction,
    balances: HashMap<Uuid, i64>,
}

impl Applied {
    /// Balance of a touched account after the mutation.
    pub fn balance_of(&self, account_id: Uuid) -> i64 {
        self.balances.get(&account_id).copied().unwrap_or_default()
    }
}

/// Compute post-mutation balances from locked snapshots, or explain why not.
///
/// Postings on the same account are summed. Checks, in order: every account
/// exists, none is locked, no resulting balance is negative.
pub fn plan(
    snapshots: &[AccountSnapshot],
    postings: &[Posting],
) -> Result<Vec<(Uuid, i64)>, AppError> {
    let mut deltas: Vec<(Uuid, i64)> = Vec::with_capacity(postings.len());
    for posting in postings {
        match deltas.iter_mut().find(|(id, _)| *id == posting.account_id) {
            Some((_, delta)) => {
                *delta = delta
                    .checked_add(posting.delta)
                    .ok_or_else(|| AppError::validation("Amount out of range"))?;
            }
            None => deltas.push((posting.account_id, posting.delta)),
        }
    }

    let mut balances = Vec::with_capacity(deltas.len());
    for (account_id, delta) in deltas {
        let snapshot = snapshots
            .iter()
            .find(|s| s.id == account_id)
            .ok_or(AppError::NotFound("Account"))?;

        if snapshot.is_locked {
            return Err(AppError::AccountLocked);
        }

        let balance = snapshot
            .balance
            .checked_add(delta)
            .ok_or_else(|| AppError::validation("Amount out of range"))?;
        if balance < 0 {
            return Err(AppError::InsufficientBalance);
        }

        balances.push((account_id, balance));
    }

    Ok(balances)
}

/// Atomically apply `postings` and append `entry` on the caller's transaction.
pub async fn apply(
    conn: &mut PgConnection,
    entry: NewEntry,
    postings: &[Posting],
) -> Result<Applied, AppError> {
    entry.validate()?;
    if postings.is_empty() {
        return Err(AppError::validation("Mutation has no postings"));
    }

    let ids: Vec<Uuid> = postings.iter().map(|p| p.account_id).collect();
    let snapshots = account_store::lock_many(conn, &ids).await?;

    let balances = plan(&snapshots, postings)?;
    for (account_id, balance) in &balances {
        account_store::set_balance(conn, *account_id, *balance).await?;
    }

    let entry = append(conn, &entry).await?;

    tracing::debug!(
        transaction_id = %entry.id,
        kind = ?entry.transaction_type,
        amount = entry.amount,
        "ledger entry appended"
    );

    Ok(Applied {
        entry,
        balances: balances.into_iter().collect(),
    })
}

/// Append a ledger row. Rows are never updated afterwards.
async fn append(conn: &mut PgConnection, entry: &NewEntry) -> Result<Transaction, AppError> {
    let transaction = sqlx::query_as::<_, Transaction>(&format!(
        r#"
        INSERT INTO transactions (
            transaction_type,
            amount,
            fee,
            description,
            from_account_id,
            to_account_id,
            status
        )
        VALUES ($1, $2, $3, $4, $5, $6, 'SUCCESS')
        RETURNING {TRANSACTION_COLUMNS}
        "#
    ))
    .bind(entry.kind)
    .bind(entry.amount)
    .bind(entry.fee)
    .bind(&entry.description)
    .bind(entry.from_account_id)
    .bind(entry.to_account_id)
    .fetch_one(conn)
    .await?;

    Ok(transaction)
}

/// Ledger rows touching `account_id`, newest first.
pub async fn history(
    conn: &mut PgConnection,
    account_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<Transaction>, AppError> {
    let rows = sqlx::query_as::<_, Transaction>(&format!(
        r#"
        SELECT {TRANSACTION_COLUMNS}
        FROM transactions
        WHERE from_account_id = $1 OR to_account_id = $1
        ORDER BY created_at DESC, id
        LIMIT $2 OFFSET $3
        "#
    ))
    .bind(account_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(conn)
    .await?;

    Ok(rows)
}

/// A ledger row, if it touches one of `user_id`'s accounts.
pub async fn find_visible(
    conn: &mut PgConnection,
    user_id: Uuid,
    transaction_id: Uuid,
) -> Result<Option<Transaction>, AppError> {
    let row = sqlx::query_as::<_, Transaction>(&format!(
        r#"
        SELECT {TRANSACTION_COLUMNS}
        FROM transactions t
        WHERE t.id = $1
          AND EXISTS (
              SELECT 1 FROM accounts a
              WHERE a.user_id = $2
                AND (a.id = t.from_account_id OR a.id = t.to_account_id)
          )
        "#
    ))
    .bind(transaction_id)
    .bind(user_id)
    .fetch_optional(conn)
    .await?;

    Ok(row)
}

/// Outgoing transfer and withdrawal volume (amount plus fee) since `since`.
pub async fn outgoing_since(
    conn: &mut PgConnection,
    account_id: Uuid,
    since: chrono::DateTime<chrono::Utc>,
) -> Result<i64, AppError> {
    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(amount + fee), 0)::BIGINT
        FROM transactions
        WHERE from_account_id = $1
          AND transaction_type IN ('TRANSFER', 'WITHDRAW')
          AND created_at >= $2
        "#,
    )
    .bind(account_id)
    .bind(since)
    .fetch_one(conn)
    .await?;

    Ok(total)
}
