//! Integration tests for fintrack-core services
//!
//! Every test runs against a real DuckDB file in a temporary directory,
//! wired through `FintrackContext` exactly as the CLI wires it.
//!
//! Run with: cargo test --test integration_tests -- --nocapture

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use tempfile::TempDir;

use fintrack_core::domain::category::{DEFAULT_EXPENSE_CATEGORIES, DEFAULT_INCOME_CATEGORIES};
use fintrack_core::services::AuthService;
use fintrack_core::{
    Category, CategoryType, CategoryUpdate, Currency, DateWindow, Error, FintrackContext,
    NewTransaction, NewUser, Transaction, TransactionUpdate, User, UserUpdate,
};

// ============================================================================
// Test Helpers
// ============================================================================

/// Placeholder hash; only the auth tests need a real argon2 hash
const FAKE_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHQ$aGFzaGhhc2hoYXNoaGFzaA";

fn create_test_context(temp_dir: &TempDir) -> FintrackContext {
    FintrackContext::new(temp_dir.path()).expect("Failed to create context")
}

async fn create_test_user(ctx: &FintrackContext, email: &str) -> User {
    ctx.user_service
        .create_user(NewUser::new("Test User", email, FAKE_HASH))
        .await
        .expect("Failed to create user")
}

async fn category_named(
    ctx: &FintrackContext,
    user_id: i64,
    name: &str,
    category_type: CategoryType,
) -> Category {
    ctx.category_service
        .find_by_user(user_id)
        .await
        .unwrap()
        .into_iter()
        .find(|c| c.name == name && c.category_type == category_type)
        .expect("default category missing")
}

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

fn new_tx(
    user_id: i64,
    category_id: i64,
    amount: i64,
    currency: Currency,
    date: DateTime<Utc>,
) -> NewTransaction {
    NewTransaction {
        user_id,
        category_id,
        amount: Decimal::new(amount, 0),
        currency,
        description: "test entry".to_string(),
        date,
    }
}

async fn add_tx(
    ctx: &FintrackContext,
    user_id: i64,
    category_id: i64,
    amount: i64,
    currency: Currency,
    date: DateTime<Utc>,
) -> Transaction {
    ctx.transaction_service
        .create_transaction(new_tx(user_id, category_id, amount, currency, date))
        .await
        .expect("Failed to create transaction")
}

// ============================================================================
// Identity Store
// ============================================================================

#[tokio::test]
async fn test_create_user_seeds_default_categories_in_order() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);

    let user = create_test_user(&ctx, "ada@example.com").await;
    let categories = ctx.category_service.find_by_user(user.id).await.unwrap();

    assert_eq!(categories.len(), 15);
    let expected: Vec<(&str, CategoryType)> = DEFAULT_INCOME_CATEGORIES
        .iter()
        .map(|n| (*n, CategoryType::Income))
        .chain(DEFAULT_EXPENSE_CATEGORIES.iter().map(|n| (*n, CategoryType::Expense)))
        .collect();
    let actual: Vec<(&str, CategoryType)> = categories
        .iter()
        .map(|c| (c.name.as_str(), c.category_type))
        .collect();
    assert_eq!(actual, expected);
    assert!(categories.iter().all(|c| c.user_id == user.id));
}

#[tokio::test]
async fn test_duplicate_email_is_conflict() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);

    create_test_user(&ctx, "dup@example.com").await;
    let err = ctx
        .user_service
        .create_user(NewUser::new("Other", "dup@example.com", FAKE_HASH))
        .await
        .unwrap_err();

    assert!(err.is_conflict());
    assert_eq!(ctx.user_service.list_users().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_email_match_is_case_sensitive() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);

    create_test_user(&ctx, "case@example.com").await;
    create_test_user(&ctx, "Case@example.com").await;

    assert!(ctx
        .user_service
        .find_by_email("CASE@example.com")
        .await
        .unwrap()
        .is_none());
    assert_eq!(ctx.user_service.list_users().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_find_user_misses() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);

    assert!(ctx.user_service.find_by_id(404).await.unwrap_err().is_not_found());
    assert!(ctx
        .user_service
        .find_by_email("nobody@example.com")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_update_user_partial_and_conflicts() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);

    let ada = create_test_user(&ctx, "ada@example.com").await;
    let bob = create_test_user(&ctx, "bob@example.com").await;

    let renamed = ctx
        .user_service
        .update_user(
            ada.id,
            UserUpdate {
                name: Some("Ada L.".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "Ada L.");
    assert_eq!(renamed.email, "ada@example.com");
    assert_eq!(renamed.password_hash, FAKE_HASH);

    // Keeping one's own email is not a collision
    ctx.user_service
        .update_user(
            ada.id,
            UserUpdate {
                email: Some("ada@example.com".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let err = ctx
        .user_service
        .update_user(
            bob.id,
            UserUpdate {
                email: Some("ada@example.com".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    let bob_after = ctx.user_service.find_by_id(bob.id).await.unwrap();
    assert_eq!(bob_after.email, "bob@example.com");

    let err = ctx
        .user_service
        .update_user(999, UserUpdate::default())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_delete_user_cascades_and_reports_missing() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);

    let user = create_test_user(&ctx, "gone@example.com").await;
    let other = create_test_user(&ctx, "stays@example.com").await;
    let rent = category_named(&ctx, user.id, "Rent/Mortgage", CategoryType::Expense).await;
    let tx = add_tx(&ctx, user.id, rent.id, 900, Currency::Usd, at(2024, 1, 1)).await;

    ctx.user_service.delete_user(user.id).await.unwrap();

    assert!(ctx.user_service.find_by_id(user.id).await.unwrap_err().is_not_found());
    assert!(ctx.category_service.find_by_user(user.id).await.unwrap().is_empty());
    assert!(ctx
        .transaction_service
        .find_by_id(tx.id)
        .await
        .unwrap_err()
        .is_not_found());
    assert_eq!(ctx.category_service.find_by_user(other.id).await.unwrap().len(), 15);

    let err = ctx.user_service.delete_user(user.id).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_invalid_user_input_is_validation_error() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);

    let err = ctx
        .user_service
        .create_user(NewUser::new("No At", "not-an-email", FAKE_HASH))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert!(ctx.user_service.list_users().await.unwrap().is_empty());
}

// ============================================================================
// Category Ledger
// ============================================================================

#[tokio::test]
async fn test_category_slot_uniqueness() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);
    let user = create_test_user(&ctx, "cat@example.com").await;

    ctx.category_service
        .create_category(user.id, "Books", CategoryType::Expense)
        .await
        .unwrap();
    let err = ctx
        .category_service
        .create_category(user.id, "Books", CategoryType::Expense)
        .await
        .unwrap_err();
    assert!(err.is_conflict());

    // Same name, other type is a different slot
    ctx.category_service
        .create_category(user.id, "Books", CategoryType::Income)
        .await
        .unwrap();

    // Same slot for another user is fine
    let other = create_test_user(&ctx, "other@example.com").await;
    ctx.category_service
        .create_category(other.id, "Books", CategoryType::Expense)
        .await
        .unwrap();

    // Default names are slots too
    let err = ctx
        .category_service
        .create_category(user.id, "Groceries", CategoryType::Expense)
        .await
        .unwrap_err();
    assert!(err.is_conflict());
}

#[tokio::test]
async fn test_create_category_for_unknown_user() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);

    let err = ctx
        .category_service
        .create_category(77, "Books", CategoryType::Expense)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_category_lookups() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);
    let ada = create_test_user(&ctx, "ada@example.com").await;
    let bob = create_test_user(&ctx, "bob@example.com").await;
    let salary = category_named(&ctx, ada.id, "Salary", CategoryType::Income).await;

    let found = ctx.category_service.find_by_id(salary.id).await.unwrap();
    assert_eq!(found, salary);
    assert!(ctx.category_service.find_by_id(9999).await.unwrap_err().is_not_found());

    assert!(ctx
        .category_service
        .find_by_id_and_user(salary.id, bob.id)
        .await
        .unwrap_err()
        .is_not_found());
    assert!(ctx.category_service.belongs_to_user(ada.id, salary.id).await.unwrap());
    assert!(!ctx.category_service.belongs_to_user(bob.id, salary.id).await.unwrap());
}

#[tokio::test]
async fn test_update_category_rechecks_uniqueness() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);
    let user = create_test_user(&ctx, "upd@example.com").await;
    let travel = category_named(&ctx, user.id, "Travel", CategoryType::Expense).await;

    let err = ctx
        .category_service
        .update_category(
            travel.id,
            CategoryUpdate {
                name: Some("Groceries".to_string()),
                category_type: None,
            },
        )
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(ctx.category_service.find_by_id(travel.id).await.unwrap().name, "Travel");

    // Moving to the other type frees the slot
    let moved = ctx
        .category_service
        .update_category(
            travel.id,
            CategoryUpdate {
                name: Some("Groceries".to_string()),
                category_type: Some(CategoryType::Income),
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.name, "Groceries");
    assert_eq!(moved.category_type, CategoryType::Income);

    // A no-op update does not collide with itself
    ctx.category_service
        .update_category(moved.id, CategoryUpdate::default())
        .await
        .unwrap();

    let err = ctx
        .category_service
        .update_category(4242, CategoryUpdate::default())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_delete_category_is_restricted_while_referenced() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);
    let user = create_test_user(&ctx, "del@example.com").await;
    let dining = category_named(&ctx, user.id, "Dining Out", CategoryType::Expense).await;
    let tx = add_tx(&ctx, user.id, dining.id, 25, Currency::Eur, at(2024, 2, 2)).await;

    let err = ctx.category_service.delete_category(dining.id).await.unwrap_err();
    assert!(err.is_conflict());

    ctx.transaction_service.delete_transaction(tx.id).await.unwrap();
    ctx.category_service.delete_category(dining.id).await.unwrap();
    assert!(ctx.category_service.find_by_id(dining.id).await.unwrap_err().is_not_found());

    let err = ctx.category_service.delete_category(dining.id).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_remove_category_for_user_checks_ownership() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);
    let ada = create_test_user(&ctx, "ada@example.com").await;
    let bob = create_test_user(&ctx, "bob@example.com").await;
    let gift = category_named(&ctx, ada.id, "Gift Income", CategoryType::Income).await;

    let err = ctx.category_service.remove_for_user(bob.id, gift.id).await.unwrap_err();
    assert!(err.is_conflict());
    assert!(ctx.category_service.find_by_id(gift.id).await.is_ok());

    let err = ctx.category_service.remove_for_user(bob.id, 31337).await.unwrap_err();
    assert!(err.is_not_found());

    ctx.category_service.remove_for_user(ada.id, gift.id).await.unwrap();
}

#[tokio::test]
async fn test_best_effort_seeding_stops_on_existing_slot() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);
    let user = create_test_user(&ctx, "seed@example.com").await;

    // The first default already exists, so the first insert fails
    let err = ctx
        .category_service
        .seed_default_categories(&user)
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(ctx.category_service.find_by_user(user.id).await.unwrap().len(), 15);

    // The atomic variant leaves nothing behind on failure
    let err = ctx
        .category_service
        .seed_default_categories_atomic(&user)
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(ctx.category_service.find_by_user(user.id).await.unwrap().len(), 15);
}

// ============================================================================
// Transaction Ledger
// ============================================================================

#[tokio::test]
async fn test_transaction_with_foreign_category_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);
    let ada = create_test_user(&ctx, "ada@example.com").await;
    let bob = create_test_user(&ctx, "bob@example.com").await;
    let bobs = category_named(&ctx, bob.id, "Groceries", CategoryType::Expense).await;

    let err = ctx
        .transaction_service
        .create_transaction(new_tx(ada.id, bobs.id, 10, Currency::Usd, at(2024, 3, 1)))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(ctx.transaction_service.find_by_user(ada.id).await.unwrap().is_empty());

    let err = ctx
        .transaction_service
        .create_transaction(new_tx(999, bobs.id, 10, Currency::Usd, at(2024, 3, 1)))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_transaction_amount_must_be_positive() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);
    let user = create_test_user(&ctx, "amt@example.com").await;
    let cat = category_named(&ctx, user.id, "Utilities", CategoryType::Expense).await;

    for amount in [0, -5] {
        let err = ctx
            .transaction_service
            .create_transaction(new_tx(user.id, cat.id, amount, Currency::Usd, at(2024, 3, 1)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}

#[tokio::test]
async fn test_amounts_are_stored_exactly_or_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);
    let user = create_test_user(&ctx, "scale@example.com").await;
    let cat = category_named(&ctx, user.id, "Gifts", CategoryType::Income).await;

    let with_amount = |amount: Decimal| NewTransaction {
        amount,
        ..new_tx(user.id, cat.id, 1, Currency::Usd, at(2024, 4, 2))
    };

    // More decimals than stored, below the smallest unit, 10^14
    for amount in [
        Decimal::new(123456, 5),
        Decimal::new(1, 5),
        Decimal::new(100_000_000_000_000, 0),
    ] {
        let err = ctx
            .transaction_service
            .create_transaction(with_amount(amount))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)), "{}: {}", amount, err);
    }
    assert!(ctx.transaction_service.find_by_user(user.id).await.unwrap().is_empty());

    for amount in [Decimal::new(12346, 4), Decimal::new(99_999_999_999_999_9999, 4)] {
        let created = ctx
            .transaction_service
            .create_transaction(with_amount(amount))
            .await
            .unwrap();
        let found = ctx.transaction_service.find_by_id(created.id).await.unwrap();
        assert_eq!(created.amount, amount);
        assert_eq!(found, created);
    }

    let target = ctx
        .transaction_service
        .find_by_user(user.id)
        .await
        .unwrap()[0]
        .transaction
        .clone();
    let err = ctx
        .transaction_service
        .update_transaction(
            target.id,
            TransactionUpdate {
                amount: Some(Decimal::new(123456, 5)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let updated = ctx
        .transaction_service
        .update_transaction(
            target.id,
            TransactionUpdate {
                amount: Some(Decimal::new(5_000_000, 6)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.amount.to_string(), "5");
    assert_eq!(
        ctx.transaction_service.find_by_id(target.id).await.unwrap(),
        updated
    );
}

#[tokio::test]
async fn test_transaction_round_trip_keeps_values() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);
    let user = create_test_user(&ctx, "rt@example.com").await;
    let cat = category_named(&ctx, user.id, "Health Care", CategoryType::Expense).await;

    let created = ctx
        .transaction_service
        .create_transaction(NewTransaction {
            user_id: user.id,
            category_id: cat.id,
            amount: Decimal::new(1234, 2),
            currency: Currency::Chf,
            description: "Pharmacy".to_string(),
            date: Utc.with_ymd_and_hms(2024, 5, 17, 8, 30, 15).unwrap(),
        })
        .await
        .unwrap();

    let found = ctx.transaction_service.find_by_id(created.id).await.unwrap();
    assert_eq!(found, created);
    assert_eq!(found.amount.to_string(), "12.34");
    assert_eq!(found.currency, Currency::Chf);
    assert_eq!(found.description, "Pharmacy");

    let listed = ctx.transaction_service.find_by_user(user.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].category, cat);
}

#[tokio::test]
async fn test_update_transaction_rejects_owner_change() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);
    let ada = create_test_user(&ctx, "ada@example.com").await;
    let bob = create_test_user(&ctx, "bob@example.com").await;
    let cat = category_named(&ctx, ada.id, "Travel", CategoryType::Expense).await;
    let tx = add_tx(&ctx, ada.id, cat.id, 300, Currency::Gbp, at(2024, 4, 4)).await;

    let err = ctx
        .transaction_service
        .update_transaction(
            tx.id,
            TransactionUpdate {
                user_id: Some(bob.id),
                amount: Some(Decimal::new(1, 0)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(err.is_conflict());

    let stored = ctx.transaction_service.find_by_id(tx.id).await.unwrap();
    assert_eq!(stored, tx);

    // Naming the current owner is allowed
    let updated = ctx
        .transaction_service
        .update_transaction(
            tx.id,
            TransactionUpdate {
                user_id: Some(ada.id),
                description: Some("Train".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.description, "Train");
    assert_eq!(updated.amount, tx.amount);
    assert_eq!(updated.currency, Currency::Gbp);
}

#[tokio::test]
async fn test_update_transaction_category_is_scoped_to_owner() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);
    let ada = create_test_user(&ctx, "ada@example.com").await;
    let bob = create_test_user(&ctx, "bob@example.com").await;
    let mine = category_named(&ctx, ada.id, "Education", CategoryType::Expense).await;
    let also_mine = category_named(&ctx, ada.id, "Insurance", CategoryType::Expense).await;
    let theirs = category_named(&ctx, bob.id, "Insurance", CategoryType::Expense).await;
    let tx = add_tx(&ctx, ada.id, mine.id, 50, Currency::Usd, at(2024, 6, 1)).await;

    let err = ctx
        .transaction_service
        .update_transaction(
            tx.id,
            TransactionUpdate {
                category_id: Some(theirs.id),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(
        ctx.transaction_service.find_by_id(tx.id).await.unwrap().category_id,
        mine.id
    );

    let moved = ctx
        .transaction_service
        .update_transaction(
            tx.id,
            TransactionUpdate {
                category_id: Some(also_mine.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.category_id, also_mine.id);

    let err = ctx
        .transaction_service
        .update_transaction(8080, TransactionUpdate::default())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_delete_transaction_and_ownership_checks() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);
    let ada = create_test_user(&ctx, "ada@example.com").await;
    let bob = create_test_user(&ctx, "bob@example.com").await;
    let cat = category_named(&ctx, ada.id, "Entertainment", CategoryType::Expense).await;
    let tx = add_tx(&ctx, ada.id, cat.id, 15, Currency::Usd, at(2024, 7, 7)).await;

    assert!(ctx.transaction_service.belongs_to_user(ada.id, tx.id).await.unwrap());
    assert!(!ctx.transaction_service.belongs_to_user(bob.id, tx.id).await.unwrap());

    let err = ctx.transaction_service.remove_for_user(bob.id, tx.id).await.unwrap_err();
    assert!(err.is_conflict());

    ctx.transaction_service.remove_for_user(ada.id, tx.id).await.unwrap();
    assert!(ctx.transaction_service.find_by_id(tx.id).await.unwrap_err().is_not_found());

    let err = ctx.transaction_service.delete_transaction(tx.id).await.unwrap_err();
    assert!(err.is_not_found());
    let err = ctx.transaction_service.remove_for_user(ada.id, tx.id).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_recent_transactions_limit_and_order() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);
    let user = create_test_user(&ctx, "recent@example.com").await;
    let cat = category_named(&ctx, user.id, "Groceries", CategoryType::Expense).await;

    for day in [3, 9, 1, 7, 5, 8, 2] {
        add_tx(&ctx, user.id, cat.id, 10, Currency::Usd, at(2024, 1, day)).await;
    }
    // Two on the same latest date: storage order decides
    let first_tie = add_tx(&ctx, user.id, cat.id, 11, Currency::Usd, at(2024, 1, 20)).await;
    let second_tie = add_tx(&ctx, user.id, cat.id, 12, Currency::Usd, at(2024, 1, 20)).await;

    let recent = ctx.transaction_service.find_recent(user.id, 5).await.unwrap();
    assert_eq!(recent.len(), 5);
    assert!(recent
        .windows(2)
        .all(|w| w[0].transaction.date >= w[1].transaction.date));
    assert_eq!(recent[0].transaction.id, first_tie.id);
    assert_eq!(recent[1].transaction.id, second_tie.id);
    assert_eq!(recent[2].transaction.date, at(2024, 1, 9));

    let fewer = ctx.transaction_service.find_recent(user.id, 50).await.unwrap();
    assert_eq!(fewer.len(), 9);

    let unbounded = ctx.transaction_service.find_recent(user.id, usize::MAX).await.unwrap();
    assert_eq!(unbounded.len(), 9);
}

#[tokio::test]
async fn test_window_query_is_inclusive() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);
    let user = create_test_user(&ctx, "window@example.com").await;
    let other = create_test_user(&ctx, "else@example.com").await;
    let cat = category_named(&ctx, user.id, "Transportation", CategoryType::Expense).await;
    let other_cat = category_named(&ctx, other.id, "Transportation", CategoryType::Expense).await;

    let before = add_tx(&ctx, user.id, cat.id, 1, Currency::Usd, at(2024, 2, 28)).await;
    let start = add_tx(&ctx, user.id, cat.id, 2, Currency::Usd, at(2024, 3, 1)).await;
    let end = add_tx(&ctx, user.id, cat.id, 3, Currency::Usd, at(2024, 3, 31)).await;
    add_tx(&ctx, other.id, other_cat.id, 4, Currency::Usd, at(2024, 3, 15)).await;

    let window = DateWindow::new(at(2024, 3, 1), at(2024, 3, 31)).unwrap();
    let hits = ctx.transaction_service.find_in_window(user.id, &window).await.unwrap();
    let ids: Vec<i64> = hits.iter().map(|e| e.transaction.id).collect();

    assert_eq!(ids, vec![start.id, end.id]);
    assert!(!ids.contains(&before.id));
}

#[tokio::test]
async fn test_last_months_window() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);
    let user = create_test_user(&ctx, "months@example.com").await;
    let cat = category_named(&ctx, user.id, "Salary", CategoryType::Income).await;

    let now = Utc::now();
    let fresh = add_tx(&ctx, user.id, cat.id, 1000, Currency::Usd, now - Duration::days(10)).await;
    add_tx(&ctx, user.id, cat.id, 1000, Currency::Usd, now - Duration::days(200)).await;

    let hits = ctx.transaction_service.find_last_months(user.id, 3).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].transaction.id, fresh.id);

    let err = ctx
        .transaction_service
        .find_last_months(user.id, u32::MAX)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

// ============================================================================
// Aggregation Engine
// ============================================================================

#[tokio::test]
async fn test_totals_by_currency_and_type() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);
    let user = create_test_user(&ctx, "totals@example.com").await;
    let expense = category_named(&ctx, user.id, "Groceries", CategoryType::Expense).await;
    let income = category_named(&ctx, user.id, "Freelance Income", CategoryType::Income).await;

    add_tx(&ctx, user.id, expense.id, 100, Currency::Usd, at(2024, 1, 1)).await;
    add_tx(&ctx, user.id, expense.id, 50, Currency::Usd, at(2024, 1, 2)).await;
    add_tx(&ctx, user.id, income.id, 30, Currency::Eur, at(2024, 1, 3)).await;

    let totals = ctx.report_service.totals_by_currency_and_type(user.id).await.unwrap();
    let rows: Vec<(CategoryType, Currency, Decimal)> = totals
        .iter()
        .map(|t| (t.category_type, t.currency, t.total_amount))
        .collect();

    assert_eq!(
        rows,
        vec![
            (CategoryType::Expense, Currency::Usd, Decimal::new(150, 0)),
            (CategoryType::Income, Currency::Eur, Decimal::new(30, 0)),
        ]
    );
}

#[tokio::test]
async fn test_totals_keep_currencies_apart() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);
    let user = create_test_user(&ctx, "fx@example.com").await;
    let cat = category_named(&ctx, user.id, "Travel", CategoryType::Expense).await;

    add_tx(&ctx, user.id, cat.id, 10, Currency::Jpy, at(2024, 1, 1)).await;
    add_tx(&ctx, user.id, cat.id, 10, Currency::Usd, at(2024, 1, 2)).await;
    add_tx(&ctx, user.id, cat.id, 5, Currency::Jpy, at(2024, 1, 3)).await;

    let totals = ctx.report_service.totals_by_currency_and_type(user.id).await.unwrap();
    assert_eq!(totals.len(), 2);
    assert_eq!(totals[0].currency, Currency::Jpy);
    assert_eq!(totals[0].total_amount, Decimal::new(15, 0));
    assert_eq!(totals[1].currency, Currency::Usd);
}

#[tokio::test]
async fn test_most_common_categories_income_then_expense() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);
    let user = create_test_user(&ctx, "common@example.com").await;
    let a = category_named(&ctx, user.id, "Groceries", CategoryType::Expense).await;
    let b = category_named(&ctx, user.id, "Utilities", CategoryType::Expense).await;
    let c = category_named(&ctx, user.id, "Salary", CategoryType::Income).await;

    for _ in 0..3 {
        add_tx(&ctx, user.id, a.id, 10, Currency::Usd, at(2024, 1, 1)).await;
    }
    add_tx(&ctx, user.id, b.id, 10, Currency::Usd, at(2024, 1, 1)).await;
    for _ in 0..2 {
        add_tx(&ctx, user.id, c.id, 10, Currency::Usd, at(2024, 1, 1)).await;
    }

    let top = ctx.report_service.most_common_categories(user.id, 1).await.unwrap();
    let ids: Vec<i64> = top.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![c.id, a.id]);

    // Unused categories never appear, however large the limit
    let all = ctx.report_service.most_common_categories(user.id, 10).await.unwrap();
    let ids: Vec<i64> = all.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![c.id, a.id, b.id]);

    let expenses = ctx
        .report_service
        .most_common_categories_by_type(user.id, CategoryType::Expense, 5)
        .await
        .unwrap();
    assert_eq!(expenses.len(), 2);
    assert_eq!(expenses[0].id, a.id);
}

#[tokio::test]
async fn test_reports_for_user_without_transactions() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);
    let user = create_test_user(&ctx, "empty@example.com").await;

    assert!(ctx.report_service.totals_by_currency_and_type(user.id).await.unwrap().is_empty());
    assert!(ctx.report_service.most_common_categories(user.id, 5).await.unwrap().is_empty());
    assert_eq!(ctx.report_service.list_currencies().len(), 10);
    assert_eq!(ctx.report_service.list_currencies()[0], Currency::Usd);
}

// ============================================================================
// Credential Boundary
// ============================================================================

#[tokio::test]
async fn test_login_and_authenticate() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);

    let hash = AuthService::hash_password("correct horse").unwrap();
    let user = ctx
        .user_service
        .create_user(NewUser::new("Grace", "grace@example.com", hash))
        .await
        .unwrap();

    let token = ctx
        .auth_service
        .login("grace@example.com", "correct horse")
        .await
        .unwrap();
    assert_eq!(token.token_type, "Bearer");
    assert_eq!(token.expires_in, 10 * 3600);

    let user_id = ctx.auth_service.authenticate(&token.access_token).await.unwrap();
    assert_eq!(user_id, user.id);

    // Wrong password and unknown email are indistinguishable
    let wrong = ctx
        .auth_service
        .login("grace@example.com", "battery staple")
        .await
        .unwrap_err();
    let unknown = ctx
        .auth_service
        .login("nobody@example.com", "correct horse")
        .await
        .unwrap_err();
    assert!(matches!(wrong, Error::Unauthorized(_)));
    assert_eq!(wrong.to_string(), unknown.to_string());

    // Tokens die with their user
    ctx.user_service.delete_user(user.id).await.unwrap();
    let err = ctx
        .auth_service
        .authenticate(&token.access_token)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Unauthorized(_)));
}

#[tokio::test]
async fn test_authenticate_rejects_garbage() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);

    let err = ctx.auth_service.authenticate("not.a.token").await.unwrap_err();
    assert!(matches!(err, Error::Unauthorized(_)));
}

#[tokio::test]
async fn test_serialized_user_never_carries_hash() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);
    let user = create_test_user(&ctx, "json@example.com").await;

    let json = serde_json::to_value(&user).unwrap();
    assert!(json.get("passwordHash").is_none());
    assert_eq!(json["email"], "json@example.com");
}

// ============================================================================
// Persistence
// ============================================================================

#[tokio::test]
async fn test_ledger_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let (user_id, tx_id) = {
        let ctx = create_test_context(&temp_dir);
        let user = create_test_user(&ctx, "durable@example.com").await;
        let cat = category_named(&ctx, user.id, "Investments", CategoryType::Income).await;
        let tx = add_tx(&ctx, user.id, cat.id, 42, Currency::Aud, at(2023, 12, 31)).await;
        (user.id, tx.id)
    };

    let ctx = create_test_context(&temp_dir);
    let user = ctx.user_service.find_by_id(user_id).await.unwrap();
    assert_eq!(user.email, "durable@example.com");
    let tx = ctx.transaction_service.find_by_id(tx_id).await.unwrap();
    assert_eq!(tx.amount, Decimal::new(42, 0));
    assert_eq!(tx.currency, Currency::Aud);

    // Ids keep counting after reopen
    let next = create_test_user(&ctx, "next@example.com").await;
    assert!(next.id > user_id);
}
