use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Length of the random seed mixed into each identifier
const SEED_LEN: usize = 25;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Generate a token that tells apart lines written by different process runs
///
/// Format: `<sha256 hex>-<os pid>`. The digest covers a random seed, the
/// current time in nanoseconds and a per-process sequence number.
pub fn generate_process_identifier() -> String {
    let seed: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SEED_LEN)
        .map(char::from)
        .collect();

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);

    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(nanos.to_le_bytes());
    hasher.update(sequence.to_le_bytes());

    format!("{}-{}", hex::encode(hasher.finalize()), std::process::id())
}
