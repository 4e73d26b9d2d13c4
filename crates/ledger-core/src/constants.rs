pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
/// Leading zero hex characters required of a proof attempt hash.
pub const POW_TARGET_DIFFICULTY: usize = 4;
/// Attempts between cancellation checks in the sequential solver.
pub const CANCEL_CHECK_INTERVAL: u64 = 1024;
/// Nonces handed to rayon per parallel search round.
pub const PARALLEL_BATCH: u64 = 1 << 16;

pub const GENESIS_PREVIOUS_HASH: &str = "1";
pub const GENESIS_PROOF: u64 = 100;
pub const GENESIS_TIMESTAMP: u64 = 0;
pub const GENESIS_PAYLOAD: &[u8] = b"genesis";
