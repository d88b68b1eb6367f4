//! End-to-end money scenarios against a real PostgreSQL database.
//!
//! Each test gets a fresh database from `#[sqlx::test]` with the migrations
//! applied. Run with `DATABASE_URL=postgres://... cargo test -- --ignored`.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        account::Account,
        mobile::RechargeRequest,
        piggy_bank::CreatePiggyBankRequest,
        transaction::{
            DepositRequest, PayBillRequest, TransactionKind, TransferRequest, WithdrawRequest,
        },
        user::User,
    },
    services::{
        account_service, auth_service, card_service, cashback_service, piggy_bank_service,
        policy, recharge_service, savings_service, security, transaction_service,
    },
};

async fn customer(pool: &PgPool, username: &str) -> (User, Account) {
    auth_service::register(pool, username, "Test Customer", None, "password123")
        .await
        .unwrap()
}

async fn fund(pool: &PgPool, user_id: Uuid, amount: i64) {
    transaction_service::deposit(
        pool,
        user_id,
        DepositRequest {
            amount,
            description: None,
            account_id: None,
            location_id: None,
        },
    )
    .await
    .unwrap();
}

fn transfer_to(recipient: &str, amount: i64) -> TransferRequest {
    TransferRequest {
        recipient: recipient.to_string(),
        amount,
        message: None,
        account_id: None,
        pin: None,
    }
}

fn withdrawal(amount: i64) -> WithdrawRequest {
    WithdrawRequest {
        amount,
        description: None,
        account_id: None,
        location_id: None,
        pin: None,
    }
}

async fn balance(pool: &PgPool, account_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT balance FROM accounts WHERE id = $1")
        .bind(account_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn entry_count(pool: &PgPool, account_id: Uuid) -> i64 {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM transactions WHERE from_account_id = $1 OR to_account_id = $1",
    )
    .bind(account_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn welcome_bonus_is_credited_once(pool: PgPool) {
    let (user, first) = customer(&pool, "lan").await;
    assert_eq!(first.balance, 100_000);

    let (second, bonus) = account_service::create_account(&pool, user.id).await.unwrap();
    assert_eq!(bonus, 0);
    assert_eq!(balance(&pool, second.id).await, 0);

    let bonuses: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM transactions t
        JOIN accounts a ON a.id = t.to_account_id
        WHERE a.user_id = $1 AND t.transaction_type = 'DEPOSIT'
        "#,
    )
    .bind(user.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(bonuses, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn transfer_charges_exact_fee(pool: PgPool) {
    let (alice, alice_account) = customer(&pool, "alice").await;
    let (_, bob_account) = customer(&pool, "bob").await;
    fund(&pool, alice.id, 1_000_000).await;

    let outcome = transaction_service::transfer(
        &pool,
        alice.id,
        transfer_to(&bob_account.account_number, 100_000),
    )
    .await
    .unwrap();

    assert_eq!(outcome.fee, 500);
    assert_eq!(outcome.new_balance, 999_500);
    assert_eq!(outcome.transaction.amount, 100_000);
    assert_eq!(outcome.transaction.fee, 500);
    assert_eq!(outcome.transaction.from_account_id, Some(alice_account.id));
    assert_eq!(outcome.transaction.to_account_id, Some(bob_account.id));
    assert_eq!(balance(&pool, alice_account.id).await, 999_500);
    assert_eq!(balance(&pool, bob_account.id).await, 200_000);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn transfer_by_username_reaches_primary_account(pool: PgPool) {
    let (alice, _) = customer(&pool, "alice").await;
    let (_, bob_account) = customer(&pool, "bob").await;

    transaction_service::transfer(&pool, alice.id, transfer_to("bob", 10_000))
        .await
        .unwrap();

    assert_eq!(balance(&pool, bob_account.id).await, 110_000);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn failed_transfer_changes_nothing(pool: PgPool) {
    let (alice, alice_account) = customer(&pool, "alice").await;
    let (_, bob_account) = customer(&pool, "bob").await;

    // 100,000 + 500 fee is more than the welcome bonus
    let result = transaction_service::transfer(
        &pool,
        alice.id,
        transfer_to(&bob_account.account_number, 100_000),
    )
    .await;

    assert!(matches!(result, Err(AppError::InsufficientBalance)));
    assert_eq!(balance(&pool, alice_account.id).await, 100_000);
    assert_eq!(balance(&pool, bob_account.id).await, 100_000);
    assert_eq!(entry_count(&pool, alice_account.id).await, 1);
    assert_eq!(entry_count(&pool, bob_account.id).await, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn concurrent_withdrawals_never_overdraw(pool: PgPool) {
    let (alice, account) = customer(&pool, "alice").await;
    fund(&pool, alice.id, 100_000).await;

    let (first, second) = tokio::join!(
        transaction_service::withdraw(&pool, alice.id, withdrawal(100_000)),
        transaction_service::withdraw(&pool, alice.id, withdrawal(100_000)),
    );

    let succeeded = [first.is_ok(), second.is_ok()]
        .iter()
        .filter(|ok| **ok)
        .count();
    assert_eq!(succeeded, 1);
    assert!(
        matches!(first, Err(AppError::InsufficientBalance))
            || matches!(second, Err(AppError::InsufficientBalance))
    );
    assert_eq!(balance(&pool, account.id).await, 99_500);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn every_balance_change_has_one_entry(pool: PgPool) {
    let (alice, account) = customer(&pool, "alice").await;
    fund(&pool, alice.id, 500_000).await;
    transaction_service::withdraw(&pool, alice.id, withdrawal(50_000))
        .await
        .unwrap();

    let (credits, debits): (i64, i64) = sqlx::query_as(
        r#"
        SELECT
            COALESCE(SUM(amount) FILTER (WHERE to_account_id = $1), 0)::BIGINT,
            COALESCE(SUM(amount + fee) FILTER (WHERE from_account_id = $1), 0)::BIGINT
        FROM transactions
        "#,
    )
    .bind(account.id)
    .fetch_one(&pool)
    .await
    .unwrap();

    assert_eq!(entry_count(&pool, account.id).await, 3);
    assert_eq!(credits - debits, balance(&pool, account.id).await);
    assert_eq!(balance(&pool, account.id).await, 549_750);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn bill_payment_accrues_cashback(pool: PgPool) {
    let (alice, account) = customer(&pool, "alice").await;
    fund(&pool, alice.id, 200_000).await;

    let provider_id: Uuid = sqlx::query_scalar("SELECT id FROM bill_providers WHERE code = 'EVN'")
        .fetch_one(&pool)
        .await
        .unwrap();

    let outcome = transaction_service::pay_bill(
        &pool,
        alice.id,
        PayBillRequest {
            provider_id,
            customer_code: "PE0123456789".to_string(),
            amount: 200_000,
            account_id: None,
        },
    )
    .await
    .unwrap();

    assert_eq!(outcome.cashback, 1_000);
    assert_eq!(outcome.balance, 100_000);

    let (cashback, history) = cashback_service::summary(&pool, alice.id, None)
        .await
        .unwrap();
    assert_eq!(cashback, 1_000);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].transaction_id, Some(outcome.transaction.id));
    assert_eq!(balance(&pool, account.id).await, 100_000);
}

async fn pay_evn_bill(pool: &PgPool, user_id: Uuid, amount: i64) -> i64 {
    let provider_id: Uuid = sqlx::query_scalar("SELECT id FROM bill_providers WHERE code = 'EVN'")
        .fetch_one(pool)
        .await
        .unwrap();

    transaction_service::pay_bill(
        pool,
        user_id,
        PayBillRequest {
            provider_id,
            customer_code: "PE0123456789".to_string(),
            amount,
            account_id: None,
        },
    )
    .await
    .unwrap()
    .cashback
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn cashback_redemption_settles_pending_accruals(pool: PgPool) {
    let (alice, account) = customer(&pool, "alice").await;
    fund(&pool, alice.id, 20_000_000).await;

    assert_eq!(pay_evn_bill(&pool, alice.id, 10_000_000).await, 50_000);

    let early = cashback_service::redeem(&pool, alice.id, None).await;
    assert!(matches!(early, Err(AppError::Precondition(_))));
    let pending: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM cashback_history WHERE account_id = $1 AND status = 'PENDING'",
    )
    .bind(account.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(pending, 1);

    assert_eq!(pay_evn_bill(&pool, alice.id, 10_000_000).await, 50_000);

    let outcome = cashback_service::redeem(&pool, alice.id, None).await.unwrap();
    assert_eq!(outcome.amount, 100_000);
    // 100,000 bonus + 20,000,000 funded - 20,000,000 in bills + 100,000 redeemed
    assert_eq!(outcome.new_balance, 200_000);
    assert_eq!(balance(&pool, account.id).await, 200_000);

    let (settled, unsettled): (i64, i64) = sqlx::query_as(
        r#"
        SELECT
            COUNT(*) FILTER (WHERE status = 'REDEEMED' AND redeemed_at IS NOT NULL),
            COUNT(*) FILTER (WHERE status <> 'REDEEMED' OR redeemed_at IS NULL)
        FROM cashback_history WHERE account_id = $1
        "#,
    )
    .bind(account.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!((settled, unsettled), (2, 0));

    let (cashback, _) = cashback_service::summary(&pool, alice.id, None)
        .await
        .unwrap();
    assert_eq!(cashback, 0);

    let redemptions: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM transactions WHERE to_account_id = $1 AND transaction_type = 'CASHBACK_REDEEM'",
    )
    .bind(account.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(redemptions, 1);
    assert_eq!(outcome.transaction.transaction_type, TransactionKind::CashbackRedeem);
}

async fn mobile_provider(pool: &PgPool, code: &str) -> Uuid {
    sqlx::query_scalar("SELECT id FROM mobile_providers WHERE code = $1")
        .bind(code)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn recharge_rejects_number_from_another_carrier(pool: PgPool) {
    let (alice, account) = customer(&pool, "alice").await;
    let vinaphone = mobile_provider(&pool, "VINAPHONE").await;

    let result = recharge_service::recharge(
        &pool,
        alice.id,
        RechargeRequest {
            provider_id: vinaphone,
            phone_number: "0961234567".to_string(),
            amount: 50_000,
            account_id: None,
        },
    )
    .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(balance(&pool, account.id).await, 100_000);
    // Only the welcome bonus
    assert_eq!(entry_count(&pool, account.id).await, 1);
    let recharges: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM mobile_recharges")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(recharges, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn recharge_debits_links_and_accrues_cashback(pool: PgPool) {
    let (alice, account) = customer(&pool, "alice").await;
    let viettel = mobile_provider(&pool, "VIETTEL").await;

    let outcome = recharge_service::recharge(
        &pool,
        alice.id,
        RechargeRequest {
            provider_id: viettel,
            phone_number: "0961234567".to_string(),
            amount: 50_000,
            account_id: None,
        },
    )
    .await
    .unwrap();

    assert_eq!(outcome.balance, 50_000);
    assert_eq!(outcome.cashback, 250);
    assert_eq!(balance(&pool, account.id).await, 50_000);

    let entries: Vec<(Uuid, i64)> = sqlx::query_as(
        "SELECT id, amount FROM transactions WHERE from_account_id = $1 AND transaction_type = 'MOBILE_RECHARGE'",
    )
    .bind(account.id)
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(entries.len(), 1);
    let (entry_id, amount) = entries[0];
    assert_eq!(amount, 50_000);

    let linked: Uuid =
        sqlx::query_scalar("SELECT transaction_id FROM mobile_recharges WHERE id = $1")
            .bind(outcome.recharge.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(linked, entry_id);
    assert_eq!(outcome.recharge.transaction_id, entry_id);

    let accruals: Vec<(i64, Option<Uuid>)> = sqlx::query_as(
        "SELECT amount, transaction_id FROM cashback_history WHERE account_id = $1 AND status = 'PENDING'",
    )
    .bind(account.id)
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(accruals, vec![(250, Some(entry_id))]);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn savings_pay_full_interest_at_maturity(pool: PgPool) {
    let (alice, account) = customer(&pool, "alice").await;
    fund(&pool, alice.id, 1_000_000).await;

    let (savings, after_open) =
        savings_service::create_savings(&pool, alice.id, None, 1_000_000, 12, "Tet fund")
            .await
            .unwrap();
    assert_eq!(after_open, 100_000);
    assert_eq!(savings.interest_rate_bp, 750);

    sqlx::query(
        "UPDATE savings_accounts SET created_at = NOW() - INTERVAL '370 days', maturity_date = NOW() - INTERVAL '5 days' WHERE id = $1",
    )
    .bind(savings.id)
    .execute(&pool)
    .await
    .unwrap();

    let payout = savings_service::withdraw_savings(&pool, alice.id, savings.id)
        .await
        .unwrap();

    assert!(payout.matured);
    assert_eq!(payout.interest, 75_000);
    assert_eq!(payout.total_amount, 1_075_000);
    assert_eq!(balance(&pool, account.id).await, 1_175_000);

    let again = savings_service::withdraw_savings(&pool, alice.id, savings.id).await;
    assert!(matches!(again, Err(AppError::Precondition(_))));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn early_savings_withdrawal_pays_half_rate(pool: PgPool) {
    let (alice, _) = customer(&pool, "alice").await;
    fund(&pool, alice.id, 1_000_000).await;

    let (savings, _) =
        savings_service::create_savings(&pool, alice.id, None, 1_000_000, 12, "Laptop")
            .await
            .unwrap();

    sqlx::query("UPDATE savings_accounts SET created_at = NOW() - INTERVAL '95 days' WHERE id = $1")
        .bind(savings.id)
        .execute(&pool)
        .await
        .unwrap();

    let payout = savings_service::withdraw_savings(&pool, alice.id, savings.id)
        .await
        .unwrap();

    assert!(!payout.matured);
    assert_eq!(payout.interest, 9_375);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn transfers_to_self_are_rejected(pool: PgPool) {
    let (alice, account) = customer(&pool, "alice").await;

    let by_name = transaction_service::transfer(&pool, alice.id, transfer_to("alice", 10_000)).await;
    assert!(matches!(by_name, Err(AppError::Precondition(_))));

    let by_number =
        transaction_service::transfer(&pool, alice.id, transfer_to(&account.account_number, 10_000))
            .await;
    assert!(matches!(by_number, Err(AppError::Precondition(_))));

    assert_eq!(balance(&pool, account.id).await, 100_000);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn locked_accounts_cannot_move_money(pool: PgPool) {
    let (alice, alice_account) = customer(&pool, "alice").await;
    let (bob, bob_account) = customer(&pool, "bob").await;

    account_service::lock_account(&pool, bob.id, bob_account.id)
        .await
        .unwrap();

    let inbound = transaction_service::transfer(&pool, alice.id, transfer_to("bob", 10_000)).await;
    assert!(matches!(inbound, Err(AppError::AccountLocked)));

    let outbound = transaction_service::transfer(&pool, bob.id, transfer_to("alice", 10_000)).await;
    assert!(matches!(outbound, Err(AppError::AccountLocked)));

    assert_eq!(balance(&pool, alice_account.id).await, 100_000);
    assert_eq!(balance(&pool, bob_account.id).await, 100_000);

    account_service::unlock_account(&pool, bob.id, bob_account.id, None)
        .await
        .unwrap();
    transaction_service::transfer(&pool, bob.id, transfer_to("alice", 10_000))
        .await
        .unwrap();
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn pin_guards_withdrawals(pool: PgPool) {
    let (alice, account) = customer(&pool, "alice").await;
    account_service::set_pin(&pool, alice.id, account.id, None, "123456")
        .await
        .unwrap();

    let missing = transaction_service::withdraw(&pool, alice.id, withdrawal(50_000)).await;
    assert!(matches!(missing, Err(AppError::Validation(_))));

    let wrong = transaction_service::withdraw(
        &pool,
        alice.id,
        WithdrawRequest {
            pin: Some("654321".to_string()),
            ..withdrawal(50_000)
        },
    )
    .await;
    assert!(matches!(wrong, Err(AppError::Precondition(_))));

    let outcome = transaction_service::withdraw(
        &pool,
        alice.id,
        WithdrawRequest {
            pin: Some("123456".to_string()),
            ..withdrawal(50_000)
        },
    )
    .await
    .unwrap();
    assert_eq!(outcome.balance, 49_750);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn daily_limit_counts_fees(pool: PgPool) {
    let (alice, account) = customer(&pool, "alice").await;
    let (_, _) = customer(&pool, "bob").await;
    fund(&pool, alice.id, 1_000_000).await;
    account_service::update_limits(&pool, alice.id, account.id, 150_000, 1_000_000)
        .await
        .unwrap();

    transaction_service::transfer(&pool, alice.id, transfer_to("bob", 100_000))
        .await
        .unwrap();

    // 100,500 already sent today; 50,000 + 250 would make 150,750
    let result = transaction_service::transfer(&pool, alice.id, transfer_to("bob", 50_000)).await;
    assert!(matches!(result, Err(AppError::Precondition(_))));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn piggy_bank_round_trip_restores_balance(pool: PgPool) {
    let (alice, account) = customer(&pool, "alice").await;

    let piggy = piggy_bank_service::create_piggy_bank(
        &pool,
        alice.id,
        CreatePiggyBankRequest {
            name: "Bike".to_string(),
            target_amount: 2_000_000,
            icon: None,
            color: None,
            account_id: None,
        },
    )
    .await
    .unwrap();

    let (piggy, balance_after_deposit) = piggy_bank_service::deposit(&pool, alice.id, piggy.id, 40_000)
        .await
        .unwrap();
    assert_eq!(piggy.current_amount, 40_000);
    assert_eq!(balance_after_deposit, 60_000);

    let overdraw = piggy_bank_service::withdraw(&pool, alice.id, piggy.id, Some(40_001)).await;
    assert!(matches!(overdraw, Err(AppError::InsufficientBalance)));

    let (piggy, balance_after_withdraw) = piggy_bank_service::withdraw(&pool, alice.id, piggy.id, None)
        .await
        .unwrap();
    assert_eq!(piggy.current_amount, 0);
    assert!(!piggy.is_active);
    assert_eq!(balance_after_withdraw, 100_000);
    assert_eq!(balance(&pool, account.id).await, 100_000);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn cards_are_capped_per_day(pool: PgPool) {
    let (alice, _) = customer(&pool, "alice").await;

    for _ in 0..3 {
        card_service::issue_card(&pool, alice.id, None).await.unwrap();
    }

    let fourth = card_service::issue_card(&pool, alice.id, None).await;
    assert!(matches!(fourth, Err(AppError::Precondition(_))));
    assert_eq!(card_service::list_cards(&pool, alice.id).await.unwrap().len(), 3);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn card_quota_resets_at_utc_midnight(pool: PgPool) {
    let (alice, account) = customer(&pool, "alice").await;

    for _ in 0..3 {
        card_service::issue_card(&pool, alice.id, None).await.unwrap();
    }

    // One second before today's UTC midnight counts as yesterday
    let yesterday = policy::utc_day_start(Utc::now()) - Duration::seconds(1);
    sqlx::query("UPDATE cards SET created_at = $1 WHERE account_id = $2")
        .bind(yesterday)
        .bind(account.id)
        .execute(&pool)
        .await
        .unwrap();

    card_service::issue_card(&pool, alice.id, None).await.unwrap();
    assert_eq!(card_service::list_cards(&pool, alice.id).await.unwrap().len(), 4);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn withdrawal_sees_pin_committed_while_it_waited(pool: PgPool) {
    let (alice, account) = customer(&pool, "alice").await;

    // Another session sets a PIN and holds the row lock until it commits
    let mut other = pool.begin().await.unwrap();
    sqlx::query("UPDATE accounts SET pin_hash = $1 WHERE id = $2")
        .bind(security::hash_secret("123456"))
        .bind(account.id)
        .execute(&mut *other)
        .await
        .unwrap();

    let withdrawal_task = tokio::spawn({
        let pool = pool.clone();
        async move { transaction_service::withdraw(&pool, alice.id, withdrawal(50_000)).await }
    });

    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    other.commit().await.unwrap();

    let result = withdrawal_task.await.unwrap();
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(balance(&pool, account.id).await, 100_000);
}
