//! End-to-end integration tests
//!
//! Each fixture under tests/fixtures/ holds:
//! - `accounts.csv` - opening balances
//! - `transfers.csv` - instructions to apply
//! - `expected.csv` - final balances
//!
//! Every fixture runs with both strategies. Fixtures are written so that
//! the result does not depend on how the async strategy interleaves
//! different senders.

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use std::fs;
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use tempfile::NamedTempFile;
    use wallet_ledger::cli::StrategyType;
    use wallet_ledger::config::WalletConfig;
    use wallet_ledger::core::{ChannelPublisher, LogPublisher};
    use wallet_ledger::strategy::{create_strategy, load_service, write_balances};
    use wallet_ledger::types::{AccountId, TransactionStatus};

    fn fixture(name: &str, file: &str) -> PathBuf {
        let path = Path::new("tests/fixtures").join(name).join(file);
        assert!(path.exists(), "Fixture file not found: {}", path.display());
        path
    }

    fn run_test_fixture(fixture_name: &str, strategy_type: StrategyType) {
        let service = load_service(
            &WalletConfig::default(),
            &fixture(fixture_name, "accounts.csv"),
            Arc::new(LogPublisher),
        )
        .unwrap_or_else(|e| panic!("Failed to load accounts: {}", e));

        let strategy = create_strategy(strategy_type, None);
        let summary = strategy
            .process(&service, &fixture(fixture_name, "transfers.csv"))
            .unwrap_or_else(|e| panic!("Failed to process transfers: {}", e));

        // One record per attempt that reached the funds check.
        assert_eq!(
            service.ledger().transactions().len(),
            summary.completed + summary.failed
        );

        let mut temp_output = NamedTempFile::new().expect("Failed to create temp file");
        write_balances(&service, &mut temp_output).unwrap();
        temp_output.flush().expect("Failed to flush temp file");

        let actual_output = fs::read_to_string(temp_output.path()).unwrap();
        let expected_output = fs::read_to_string(fixture(fixture_name, "expected.csv")).unwrap();

        assert_eq!(
            actual_output, expected_output,
            "\n\nOutput mismatch for fixture: {} (strategy: {:?})\n\nActual output:\n{}\n\nExpected output:\n{}\n",
            fixture_name, strategy_type, actual_output, expected_output
        );
    }

    #[rstest]
    #[case("happy_path")]
    #[case("insufficient_funds")]
    #[case("boundary_values")]
    #[case("precision_testing")]
    #[case("malformed_data")]
    #[case("commission_account_created")]
    #[case("multiple_senders")]
    fn test_fixtures(
        #[case] fixture: &str,
        #[values(StrategyType::Sync, StrategyType::Async)] strategy: StrategyType,
    ) {
        run_test_fixture(fixture, strategy);
    }

    #[rstest]
    #[case("malformed_data")]
    #[case("insufficient_funds")]
    #[case("happy_path")]
    fn test_strategies_agree_on_summary(#[case] fixture_name: &str) {
        let summaries: Vec<_> = [StrategyType::Sync, StrategyType::Async]
            .into_iter()
            .map(|strategy_type| {
                let service = load_service(
                    &WalletConfig::default(),
                    &fixture(fixture_name, "accounts.csv"),
                    Arc::new(LogPublisher),
                )
                .unwrap();
                create_strategy(strategy_type, None)
                    .process(&service, &fixture(fixture_name, "transfers.csv"))
                    .unwrap()
            })
            .collect();

        assert_eq!(summaries[0], summaries[1]);
    }

    #[test]
    fn test_history_after_processing() {
        let service = load_service(
            &WalletConfig::default(),
            &fixture("insufficient_funds", "accounts.csv"),
            Arc::new(LogPublisher),
        )
        .unwrap();
        create_strategy(StrategyType::Sync, None)
            .process(&service, &fixture("insufficient_funds", "transfers.csv"))
            .unwrap();

        let history = service.history(AccountId(2), 1).unwrap();

        assert_eq!(history.balance, "99.2600");
        assert_eq!(history.transactions.total, 2);
        let statuses: Vec<_> = history
            .transactions
            .data
            .iter()
            .map(|view| view.transaction.status)
            .collect();
        assert_eq!(statuses, vec![TransactionStatus::Completed, TransactionStatus::Failed]);
        let failed = &history.transactions.data[1];
        assert_eq!(failed.transaction.commission_fee.to_string(), "0.0000");
        assert_eq!(failed.receiver.as_ref().unwrap().email, "user_b@email.com");
    }

    #[test]
    fn test_events_published_for_each_completed_transfer() {
        let (publisher, mut events) = ChannelPublisher::channel();
        let service = load_service(
            &WalletConfig::default(),
            &fixture("happy_path", "accounts.csv"),
            Arc::new(publisher),
        )
        .unwrap();

        let summary = create_strategy(StrategyType::Sync, None)
            .process(&service, &fixture("happy_path", "transfers.csv"))
            .unwrap();

        let mut delivered = Vec::new();
        while let Ok(event) = events.try_recv() {
            delivered.push(event);
        }
        assert_eq!(delivered.len(), summary.completed * 2);
        assert_eq!(delivered[0].channel(), "private-user.2");
        assert_eq!(delivered[0].balance.to_string(), "898.5000");
        assert_eq!(delivered[1].channel(), "private-user.3");
    }

    #[test]
    fn test_commission_account_from_config() {
        let config = WalletConfig {
            commission_account_email: "user_c@email.com".to_string(),
            ..WalletConfig::default()
        };
        let service = load_service(
            &config,
            &fixture("happy_path", "accounts.csv"),
            Arc::new(LogPublisher),
        )
        .unwrap();

        assert_eq!(service.engine().commission_account(), AccountId(4));
    }
}
