//! Transaction service - transfers, deposits, withdrawals and bill payments.
//!
//! Each operation validates its input before opening a database
//! transaction, resolves the accounts involved, computes fees, and hands the
//! balance change to [`ledger::apply`]. Nothing is retried: any error rolls
//! the whole unit of work back and is returned to the caller.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        account::Account,
        directory::{BillProvider, DepositLocation},
        transaction::{
            DepositRequest, NewEntry, PayBillRequest, Transaction, TransactionKind,
            TransferRequest, WithdrawRequest,
        },
    },
    services::{
        account_service, account_store, cashback_service,
        ledger::{self, Posting},
        policy,
    },
};

const MAX_MESSAGE_LEN: usize = 200;

#[derive(Debug)]
pub struct TransferOutcome {
    pub transaction: Transaction,
    pub new_balance: i64,
    pub fee: i64,
    pub recipient_account_number: String,
}

#[derive(Debug)]
pub struct BalanceOutcome {
    pub transaction: Transaction,
    pub balance: i64,
}

#[derive(Debug)]
pub struct BillOutcome {
    pub transaction: Transaction,
    pub balance: i64,
    pub cashback: i64,
    pub provider_name: String,
}

/// Transfer money from the caller's account to another customer.
///
/// The sender is debited `amount + fee`, the recipient credited `amount`, and
/// a single TRANSFER entry referencing both accounts is written.
///
/// # Errors
///
/// - `Validation`: amount out of range, message too long, missing PIN
/// - `NotFound`: sender account or recipient does not exist
/// - `Precondition`: self-transfer, wrong PIN, limit exceeded
/// - `AccountLocked` / `InsufficientBalance`: from the balance mutator
pub async fn transfer(
    pool: &DbPool,
    user_id: Uuid,
    request: TransferRequest,
) -> Result<TransferOutcome, AppError> {
    policy::ensure_amount_in_range(request.amount, policy::MIN_TRANSFER)?;
    let message = normalize_text(request.message, MAX_MESSAGE_LEN)?;

    let mut tx = pool.begin().await?;

    let sender = account_store::find_owned(&mut tx, user_id, request.account_id).await?;
    let recipient = resolve_recipient(&mut tx, user_id, request.recipient.trim()).await?;

    if recipient.id == sender.id {
        return Err(AppError::precondition("Cannot transfer to the same account"));
    }

    let fee = policy::fee_for(request.amount);
    let total = request.amount + fee;

    account_store::lock_many(&mut tx, &[sender.id, recipient.id]).await?;
    // Re-read under the row lock so the PIN and limits checked are the committed ones
    let sender = account_store::find_owned(&mut tx, user_id, Some(sender.id)).await?;
    account_service::verify_pin(&sender, request.pin.as_deref())?;
    account_service::ensure_within_limits(&mut tx, &sender, total).await?;

    let description =
        message.unwrap_or_else(|| format!("Transfer to {}", recipient.account_number));
    let entry = NewEntry::transfer(sender.id, recipient.id, request.amount)
        .with_fee(fee)
        .with_description(Some(description));

    let applied = ledger::apply(
        &mut tx,
        entry,
        &[
            Posting::debit(sender.id, total),
            Posting::credit(recipient.id, request.amount),
        ],
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        transaction_id = %applied.entry.id,
        from = %sender.id,
        to = %recipient.id,
        amount = request.amount,
        fee,
        "transfer completed"
    );

    Ok(TransferOutcome {
        new_balance: applied.balance_of(sender.id),
        transaction: applied.entry,
        fee,
        recipient_account_number: recipient.account_number,
    })
}

/// Resolve a transfer recipient by account number or username.
///
/// A username that belongs to the caller is rejected outright.
async fn resolve_recipient(
    conn: &mut PgConnection,
    caller: Uuid,
    recipient: &str,
) -> Result<Account, AppError> {
    if recipient.is_empty() {
        return Err(AppError::validation("Recipient is required"));
    }

    if policy::is_account_number(recipient) {
        return account_store::find_by_number(conn, recipient)
            .await?
            .ok_or(AppError::NotFound("Recipient"));
    }

    let recipient_user: Uuid = sqlx::query_scalar("SELECT id FROM users WHERE username = $1")
        .bind(recipient)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(AppError::NotFound("Recipient"))?;

    if recipient_user == caller {
        return Err(AppError::precondition("Cannot transfer to yourself"));
    }

    account_store::primary_for_user(conn, recipient_user)
        .await?
        .ok_or(AppError::NotFound("Recipient"))
}

/// Credit cash handed in at a branch or ATM (also used for top-ups).
pub async fn deposit(
    pool: &DbPool,
    user_id: Uuid,
    request: DepositRequest,
) -> Result<BalanceOutcome, AppError> {
    policy::ensure_amount_in_range(request.amount, policy::MIN_DEPOSIT)?;
    let description = normalize_text(request.description, MAX_MESSAGE_LEN)?;

    let mut tx = pool.begin().await?;

    let location = match request.location_id {
        Some(id) => Some(find_location(&mut tx, id).await?),
        None => None,
    };
    let account = account_store::find_owned(&mut tx, user_id, request.account_id).await?;

    let description = description.unwrap_or_else(|| match &location {
        Some(location) => format!("Cash deposit at {}", location.name),
        None => "Deposit".to_string(),
    });
    let entry = NewEntry::credit(TransactionKind::Deposit, account.id, request.amount)
        .with_description(Some(description));

    let applied = ledger::apply(
        &mut tx,
        entry,
        &[Posting::credit(account.id, request.amount)],
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        transaction_id = %applied.entry.id,
        account_id = %account.id,
        amount = request.amount,
        "deposit completed"
    );

    Ok(BalanceOutcome {
        balance: applied.balance_of(account.id),
        transaction: applied.entry,
    })
}

/// Withdraw cash. The account is debited `amount + fee`.
pub async fn withdraw(
    pool: &DbPool,
    user_id: Uuid,
    request: WithdrawRequest,
) -> Result<BalanceOutcome, AppError> {
    policy::ensure_withdraw_amount(request.amount)?;
    let description = normalize_text(request.description, MAX_MESSAGE_LEN)?;

    let mut tx = pool.begin().await?;

    let location = match request.location_id {
        Some(id) => Some(find_location(&mut tx, id).await?),
        None => None,
    };
    let account = account_store::find_owned(&mut tx, user_id, request.account_id).await?;

    let fee = policy::fee_for(request.amount);
    let total = request.amount + fee;

    account_store::lock_many(&mut tx, &[account.id]).await?;
    let account = account_store::find_owned(&mut tx, user_id, Some(account.id)).await?;
    account_service::verify_pin(&account, request.pin.as_deref())?;
    account_service::ensure_within_limits(&mut tx, &account, total).await?;

    let description = description.unwrap_or_else(|| match &location {
        Some(location) => format!("Cash withdrawal at {}", location.name),
        None => "Withdrawal".to_string(),
    });
    let entry = NewEntry::debit(TransactionKind::Withdraw, account.id, request.amount)
        .with_fee(fee)
        .with_description(Some(description));

    let applied = ledger::apply(&mut tx, entry, &[Posting::debit(account.id, total)]).await?;

    tx.commit().await?;

    tracing::info!(
        transaction_id = %applied.entry.id,
        account_id = %account.id,
        amount = request.amount,
        fee,
        "withdrawal completed"
    );

    Ok(BalanceOutcome {
        balance: applied.balance_of(account.id),
        transaction: applied.entry,
    })
}

/// Pay a utility bill. Accrues cashback on the amount charged.
pub async fn pay_bill(
    pool: &DbPool,
    user_id: Uuid,
    request: PayBillRequest,
) -> Result<BillOutcome, AppError> {
    policy::ensure_amount_in_range(request.amount, policy::MIN_BILL_PAYMENT)?;
    let customer_code = request.customer_code.trim();
    if customer_code.is_empty()
        || customer_code.len() > 32
        || !customer_code.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return Err(AppError::validation("Invalid customer code"));
    }

    let mut tx = pool.begin().await?;

    let provider = sqlx::query_as::<_, BillProvider>(
        "SELECT id, code, name, category, is_active FROM bill_providers WHERE id = $1 AND is_active = true",
    )
    .bind(request.provider_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("Bill provider"))?;

    let account = account_store::find_owned(&mut tx, user_id, request.account_id).await?;

    let entry = NewEntry::debit(TransactionKind::BillPayment, account.id, request.amount)
        .with_description(Some(format!("{} bill {}", provider.name, customer_code)));
    let applied = ledger::apply(
        &mut tx,
        entry,
        &[Posting::debit(account.id, request.amount)],
    )
    .await?;

    let cashback =
        cashback_service::accrue(&mut tx, account.id, applied.entry.id, request.amount).await?;

    tx.commit().await?;

    tracing::info!(
        transaction_id = %applied.entry.id,
        account_id = %account.id,
        provider = %provider.code,
        amount = request.amount,
        cashback,
        "bill paid"
    );

    Ok(BillOutcome {
        balance: applied.balance_of(account.id),
        transaction: applied.entry,
        cashback,
        provider_name: provider.name,
    })
}

async fn find_location(conn: &mut PgConnection, location_id: Uuid) -> Result<DepositLocation, AppError> {
    sqlx::query_as::<_, DepositLocation>(
        "SELECT id, name, address, kind, is_active FROM deposit_locations WHERE id = $1 AND is_active = true",
    )
    .bind(location_id)
    .fetch_optional(conn)
    .await?
    .ok_or(AppError::NotFound("Deposit location"))
}

/// Trim free text; blank becomes `None`, overlong is rejected.
fn normalize_text(text: Option<String>, max_len: usize) -> Result<Option<String>, AppError> {
    match text.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) if text.chars().count() > max_len => Err(AppError::validation(format!(
            "Text must be at most {max_len} characters"
        ))),
        Some(text) => Ok(Some(text.to_string())),
    }
}

/// Ledger rows touching one of the caller's accounts, newest first.
pub async fn history(
    pool: &DbPool,
    user_id: Uuid,
    account_id: Option<Uuid>,
    limit: i64,
    offset: i64,
) -> Result<Vec<Transaction>, AppError> {
    if !(1..=100).contains(&limit) || offset < 0 {
        return Err(AppError::validation(
            "limit must be 1-100 and offset non-negative",
        ));
    }

    let mut conn = pool.acquire().await?;
    let account = account_store::find_owned(&mut conn, user_id, account_id).await?;
    ledger::history(&mut conn, account.id, limit, offset).await
}

/// Get one ledger row, hidden unless it touches one of the caller's accounts.
pub async fn get_transaction(
    pool: &DbPool,
    user_id: Uuid,
    transaction_id: Uuid,
) -> Result<Transaction, AppError> {
    let mut conn = pool.acquire().await?;
    ledger::find_visible(&mut conn, user_id, transaction_id)
        .await?
        .ok_or(AppError::NotFound("Transaction"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_becomes_none() {
        assert_eq!(normalize_text(Some("   ".to_string()), 10).unwrap(), None);
        assert_eq!(normalize_text(None, 10).unwrap(), None);
    }

    #[test]
    fn text_is_trimmed() {
        assert_eq!(
            normalize_text(Some("  lunch ".to_string()), 10).unwrap(),
            Some("lunch".to_string())
        );
    }

    #[test]
    fn overlong_text_is_rejected() {
        assert!(normalize_text(Some("x".repeat(11)), 10).is_err());
    }
}
