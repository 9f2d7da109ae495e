//! Property-based tests for ledger invariants
//!
//! These tests use proptest to verify critical invariants:
//! - Unit conservation: every log entry carries the credit's immutable units
//! - Identity resolution is idempotent per name
//! - Retirement is one-way and blocks further transfers
//! - Ownership only moves through recorded transfers

use green_ledger::{
    Config, Error, Ledger, LoginRequest, MintRequest, Party, RetireRequest, TransactionKind,
    TransferRequest,
};
use proptest::prelude::*;
use rust_decimal::Decimal;

/// Strategy for generating valid unit amounts (positive decimals)
fn units_strategy() -> impl Strategy<Value = Decimal> {
    (1u64..1_000_000_00u64).prop_map(|cents| Decimal::new(cents as i64, 2))
}

/// Strategy for generating identity names
fn name_strategy() -> impl Strategy<Value = String> {
    "[a-z]{3,12}"
}

/// Create test ledger with temp directory
async fn create_test_ledger() -> (Ledger, tempfile::TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.data_dir = temp_dir.path().to_path_buf();

    (Ledger::open(config).await.unwrap(), temp_dir)
}

fn login(name: &str, role: &str) -> LoginRequest {
    LoginRequest {
        name: name.to_string(),
        role: role.to_string(),
    }
}

fn mint_request(units: Decimal) -> MintRequest {
    MintRequest {
        batch_id: "B1".to_string(),
        units,
        production_date: chrono::Utc::now(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(25))]

    /// Property: positive unit amounts always mint; the genesis entry
    /// matches the credit exactly
    #[test]
    fn prop_positive_units_mint(units in units_strategy()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (ledger, _temp) = create_test_ledger().await;

            let producer = ledger
                .login(login("producer", "producer"))
                .await
                .unwrap();
            let credit = ledger.mint(producer.id, mint_request(units)).await.unwrap();

            prop_assert_eq!(credit.units, units);
            prop_assert_eq!(credit.owner_id, producer.id);

            let history = ledger.credit_history(credit.id).unwrap();
            prop_assert_eq!(history.len(), 1);
            prop_assert_eq!(history[0].kind, TransactionKind::Mint);
            prop_assert_eq!(history[0].to, Party::Identity(producer.id));
            prop_assert_eq!(history[0].units, units);

            ledger.shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: non-positive unit amounts are always rejected with a
    /// validation error and leave no state behind
    #[test]
    fn prop_non_positive_units_rejected(cents in 0i64..1_000_000) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (ledger, _temp) = create_test_ledger().await;

            let producer = ledger
                .login(login("producer", "producer"))
                .await
                .unwrap();
            let result = ledger
                .mint(producer.id, mint_request(Decimal::new(-cents, 2)))
                .await;

            prop_assert!(matches!(result, Err(Error::Validation(_))));
            prop_assert_eq!(ledger.credit_summary().unwrap().total, 0);

            ledger.shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: resolving the same name any number of times yields one
    /// identity
    #[test]
    fn prop_identity_resolution_idempotent(name in name_strategy(), repeats in 1usize..5) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (ledger, _temp) = create_test_ledger().await;

            let first = ledger.login(login(&name, "buyer")).await.unwrap();
            for _ in 0..repeats {
                let again = ledger.login(login(&name, "buyer")).await.unwrap();
                prop_assert_eq!(again.id, first.id);
            }

            let stats = ledger.stats().unwrap();
            prop_assert_eq!(stats.total_identities, 1);

            ledger.shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: after any chain of whole-credit transfers, every log entry
    /// for the credit carries its immutable unit count, and ownership sits
    /// with the last receiver
    #[test]
    fn prop_unit_conservation_across_transfers(
        units in units_strategy(),
        hops in 1usize..5,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (ledger, _temp) = create_test_ledger().await;

            let producer = ledger
                .login(login("producer", "producer"))
                .await
                .unwrap();
            let credit = ledger.mint(producer.id, mint_request(units)).await.unwrap();

            let mut owner = producer.id;
            for hop in 0..hops {
                let buyer = ledger
                    .login(login(&format!("buyer{}", hop), "buyer"))
                    .await
                    .unwrap();
                let tx = ledger
                    .transfer(TransferRequest {
                        credit_id: credit.id,
                        buyer_id: buyer.id,
                        units,
                    })
                    .await
                    .unwrap();
                prop_assert_eq!(tx.from, Party::Identity(owner));
                owner = buyer.id;
            }

            let final_credit = ledger.get_credit(credit.id).unwrap();
            prop_assert_eq!(final_credit.owner_id, owner);
            prop_assert_eq!(final_credit.producer_id, producer.id);

            let history = ledger.credit_history(credit.id).unwrap();
            prop_assert_eq!(history.len(), hops + 1);
            for tx in &history {
                prop_assert_eq!(tx.units, units);
            }

            ledger.shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: a retired credit rejects every transfer attempt, whatever
    /// the requested units
    #[test]
    fn prop_retired_credit_rejects_transfers(
        units in units_strategy(),
        attempt_units in units_strategy(),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (ledger, _temp) = create_test_ledger().await;

            let producer = ledger
                .login(login("producer", "producer"))
                .await
                .unwrap();
            let buyer = ledger.login(login("buyer", "buyer")).await.unwrap();

            let credit = ledger.mint(producer.id, mint_request(units)).await.unwrap();
            ledger
                .retire(RetireRequest {
                    credit_id: credit.id,
                    requester_id: producer.id,
                })
                .await
                .unwrap();

            let result = ledger
                .transfer(TransferRequest {
                    credit_id: credit.id,
                    buyer_id: buyer.id,
                    units: attempt_units,
                })
                .await;
            prop_assert!(matches!(result, Err(Error::Conflict(_))));

            // State unchanged
            let unchanged = ledger.get_credit(credit.id).unwrap();
            prop_assert_eq!(unchanged.owner_id, producer.id);
            prop_assert!(unchanged.is_retired);

            ledger.shutdown().await.unwrap();
            Ok(())
        })?;
    }
}
