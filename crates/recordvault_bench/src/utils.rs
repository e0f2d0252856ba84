//! Benchmark utilities.

use rand::Rng;
use recordvault_core::{Passcode, RecordVault, VaultConfig};
use recordvault_storage::InMemoryGateway;

/// Payload sizes used across benchmarks: a form field, a profile, a document.
pub const PAYLOAD_SIZES: [usize; 3] = [64, 4 * 1024, 256 * 1024];

/// Iteration count used where the KDF itself is not under test.
pub const FAST_ITERATIONS: u32 = 1_000;

/// Generate random record data of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Generate a batch of legacy records with the specified payload size.
pub fn legacy_records(count: usize, payload_size: usize) -> Vec<(String, Vec<u8>)> {
    (0..count)
        .map(|i| (format!("record-{i}"), random_data(payload_size)))
        .collect()
}

/// Builds an unlocked in-memory vault using `iterations`.
pub async fn unlocked_vault(
    records: Vec<(String, Vec<u8>)>,
    iterations: u32,
) -> RecordVault<InMemoryGateway> {
    let config = VaultConfig::for_testing().kdf_iterations(iterations);
    let vault = RecordVault::new(InMemoryGateway::with_records(records), config)
        .expect("Invalid bench configuration");
    vault
        .unlock(Passcode::new("bench-passcode"))
        .await
        .expect("Failed to unlock bench vault");
    vault
}
