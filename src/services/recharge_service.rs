//! Mobile airtime recharge.

use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        mobile::{MobileProvider, MobileRecharge, RechargeRequest},
        transaction::{NewEntry, TransactionKind},
    },
    services::{
        account_store, cashback_service,
        ledger::{self, Posting},
        policy,
    },
};

#[derive(Debug)]
pub struct RechargeOutcome {
    pub recharge: MobileRecharge,
    pub balance: i64,
    pub cashback: i64,
}

/// Top up a phone number. The phone prefix must belong to the chosen carrier.
///
/// The debit, the MobileRecharge row and the cashback accrual share one unit of work.
pub async fn recharge(
    pool: &DbPool,
    user_id: Uuid,
    request: RechargeRequest,
) -> Result<RechargeOutcome, AppError> {
    policy::ensure_recharge_amount(request.amount)?;
    let phone = policy::normalize_phone(&request.phone_number)?;

    let mut tx = pool.begin().await?;

    let provider = sqlx::query_as::<_, MobileProvider>(
        "SELECT id, code, name, prefixes, is_active FROM mobile_providers WHERE id = $1 AND is_active = true",
    )
    .bind(request.provider_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("Mobile provider"))?;

    if !provider.prefixes.iter().any(|prefix| phone.starts_with(prefix.as_str())) {
        return Err(AppError::validation(format!(
            "Phone number does not belong to {}",
            provider.name
        )));
    }

    let account = account_store::find_owned(&mut tx, user_id, request.account_id).await?;

    let entry = NewEntry::debit(TransactionKind::MobileRecharge, account.id, request.amount)
        .with_description(Some(format!("{} recharge {}", provider.name, phone)));
    let applied = ledger::apply(
        &mut tx,
        entry,
        &[Posting::debit(account.id, request.amount)],
    )
    .await?;

    let recharge = sqlx::query_as::<_, MobileRecharge>(
        r#"
        INSERT INTO mobile_recharges (account_id, provider_id, phone_number, amount, transaction_id)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, account_id, provider_id, phone_number, amount, transaction_id, created_at
        "#,
    )
    .bind(account.id)
    .bind(provider.id)
    .bind(&phone)
    .bind(request.amount)
    .bind(applied.entry.id)
    .fetch_one(&mut *tx)
    .await?;

    let cashback =
        cashback_service::accrue(&mut tx, account.id, applied.entry.id, request.amount).await?;

    tx.commit().await?;

    tracing::info!(
        transaction_id = %applied.entry.id,
        provider = %provider.code,
        amount = request.amount,
        "mobile recharge completed"
    );

    Ok(RechargeOutcome {
        recharge,
        balance: applied.balance_of(account.id),
        cashback,
    })
}
