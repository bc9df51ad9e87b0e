//! Concurrent ledger access tests
//!
//! Many threads withdraw from the same ledger at once. Every withdrawal
//! must be applied exactly once, no account may go negative, and the file
//! on disk must match memory when the dust settles.
//!
//! Run with: cargo test --test concurrent_access_test -- --nocapture

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Instant;

use rust_decimal::Decimal;
use tempfile::TempDir;

use teller_core::adapters::flat_file::parse_ledger;
use teller_core::adapters::FlatFileStorage;
use teller_core::services::LedgerService;
use teller_core::Error;

/// Number of concurrent threads for stress tests.
const THREAD_COUNT: usize = 8;

/// Number of iterations per thread
const ITERATIONS_PER_THREAD: usize = 10;

/// Create a ledger file and load it through the flat-file adapter
fn create_ledger(temp_dir: &TempDir, content: &str) -> Arc<LedgerService> {
    let path = temp_dir.path().join("accounts.dat");
    std::fs::write(&path, content).unwrap();
    let ledger = LedgerService::load(Box::new(FlatFileStorage::new(&path)))
        .expect("Failed to load ledger");
    Arc::new(ledger)
}

fn read_ledger_file(temp_dir: &TempDir) -> String {
    std::fs::read_to_string(temp_dir.path().join("accounts.dat")).unwrap()
}

/// Test: every thread withdraws 1 from the same account, repeatedly.
///
/// With enough funds for all of them, the final balance must reflect every
/// single withdrawal, in memory and on disk.
#[test]
fn test_concurrent_withdrawals_lose_no_updates() {
    let temp_dir = TempDir::new().unwrap();
    let ledger = create_ledger(&temp_dir, "1001 9999 1000.0\n1002 1234 5\n");

    let barrier = Arc::new(Barrier::new(THREAD_COUNT));
    let success_count = Arc::new(AtomicUsize::new(0));
    let mut handles = vec![];

    for thread_id in 0..THREAD_COUNT {
        let barrier = Arc::clone(&barrier);
        let ledger = Arc::clone(&ledger);
        let success_count = Arc::clone(&success_count);

        handles.push(thread::spawn(move || {
            barrier.wait();
            let start = Instant::now();

            for i in 0..ITERATIONS_PER_THREAD {
                match ledger.withdraw("1001", Decimal::ONE) {
                    Ok(_) => {
                        success_count.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(e) => {
                        eprintln!(
                            "Thread {}: withdraw failed at iteration {}: {}",
                            thread_id, i, e
                        );
                    }
                }
            }

            println!(
                "Thread {}: Completed {} withdrawals in {:?}",
                thread_id,
                ITERATIONS_PER_THREAD,
                start.elapsed()
            );
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    let expected = THREAD_COUNT * ITERATIONS_PER_THREAD;
    assert_eq!(success_count.load(Ordering::SeqCst), expected);

    let expected_balance = Decimal::new(1000, 0) - Decimal::from(expected as u64);
    assert_eq!(ledger.balance("1001").unwrap(), expected_balance);

    let on_disk = parse_ledger(&read_ledger_file(&temp_dir)).unwrap();
    let card = on_disk.iter().find(|a| a.card_id == "1001").unwrap();
    assert_eq!(card.balance, expected_balance);
    let other = on_disk.iter().find(|a| a.card_id == "1002").unwrap();
    assert_eq!(other.balance, Decimal::new(5, 0));
}

/// Test: more withdrawals are attempted than the balance can cover.
///
/// Exactly as many succeed as the funds allow; the rest fail with
/// insufficient funds and the balance lands on zero, never below.
#[test]
fn test_concurrent_withdrawals_never_overdraw() {
    let temp_dir = TempDir::new().unwrap();
    let funds = 25;
    let ledger = create_ledger(&temp_dir, &format!("1001 9999 {}\n", funds));

    let barrier = Arc::new(Barrier::new(THREAD_COUNT));
    let success_count = Arc::new(AtomicUsize::new(0));
    let refused_count = Arc::new(AtomicUsize::new(0));
    let mut handles = vec![];

    for _ in 0..THREAD_COUNT {
        let barrier = Arc::clone(&barrier);
        let ledger = Arc::clone(&ledger);
        let success_count = Arc::clone(&success_count);
        let refused_count = Arc::clone(&refused_count);

        handles.push(thread::spawn(move || {
            barrier.wait();
            for _ in 0..ITERATIONS_PER_THREAD {
                match ledger.withdraw("1001", Decimal::ONE) {
                    Ok(_) => {
                        success_count.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(Error::InsufficientFunds { .. }) => {
                        refused_count.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(e) => panic!("unexpected error: {}", e),
                }
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(success_count.load(Ordering::SeqCst), funds);
    assert_eq!(
        refused_count.load(Ordering::SeqCst),
        THREAD_COUNT * ITERATIONS_PER_THREAD - funds
    );
    assert_eq!(ledger.balance("1001").unwrap(), Decimal::ZERO);
    assert_eq!(read_ledger_file(&temp_dir), "1001 9999 0.0\n");
}

/// Test: threads hammer different accounts at the same time.
///
/// Withdrawals on one card must not clobber another card's persisted
/// balance (each write is a whole-ledger snapshot).
#[test]
fn test_concurrent_withdrawals_on_different_accounts() {
    let temp_dir = TempDir::new().unwrap();
    let content: String = (0..THREAD_COUNT)
        .map(|i| format!("{} 0000 100\n", 2000 + i))
        .collect();
    let ledger = create_ledger(&temp_dir, &content);

    let barrier = Arc::new(Barrier::new(THREAD_COUNT));
    let mut handles = vec![];

    for thread_id in 0..THREAD_COUNT {
        let barrier = Arc::clone(&barrier);
        let ledger = Arc::clone(&ledger);

        handles.push(thread::spawn(move || {
            let card = (2000 + thread_id).to_string();
            barrier.wait();
            for _ in 0..ITERATIONS_PER_THREAD {
                ledger.withdraw(&card, Decimal::new(25, 1)).unwrap();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    let withdrawn = Decimal::new(25, 1) * Decimal::from(ITERATIONS_PER_THREAD as u64);
    let expected = Decimal::new(100, 0) - withdrawn;
    let on_disk = parse_ledger(&read_ledger_file(&temp_dir)).unwrap();
    assert_eq!(on_disk.len(), THREAD_COUNT);
    for account in on_disk {
        assert_eq!(account.balance, expected, "card {}", account.card_id);
        assert_eq!(ledger.balance(&account.card_id).unwrap(), expected);
    }
}
