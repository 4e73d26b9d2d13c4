use crate::constants::PARALLEL_BATCH;
use crate::pow::{CancelToken, ProofOfWork};
use crate::{LedgerError, Result};
use rayon::prelude::*;
use tracing::debug;

impl ProofOfWork {
    /// Same answer as [`ProofOfWork::solve`], searched across the rayon pool.
    ///
    /// Nonces are scanned in consecutive batches; `find_first` inside a batch
    /// keeps the result equal to the smallest valid proof.
    pub fn solve_parallel(&self, previous_proof: u64, cancel: &CancelToken) -> Result<u64> {
        let mut start = 0u64;
        loop {
            if cancel.is_cancelled() {
                return Err(LedgerError::Cancelled);
            }
            let len = PARALLEL_BATCH.min(u64::MAX - start);
            let found = (0..len)
                .into_par_iter()
                .map(|offset| start + offset)
                .find_first(|proof| self.verify(previous_proof, *proof));

            if let Some(proof) = found {
                debug!(previous_proof, proof, "parallel search found proof");
                return Ok(proof);
            }
            if len < PARALLEL_BATCH {
                return Err(LedgerError::NonceSpaceExhausted);
            }
            start += len;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parallel_matches_sequential() {
        let pow = ProofOfWork::new(3);
        for previous in [0u64, 100, 35293, 123_456_789] {
            let seq = pow.solve(previous, &CancelToken::new()).unwrap();
            let par = pow.solve_parallel(previous, &CancelToken::new()).unwrap();
            assert_eq!(seq, par, "previous proof {previous}");
        }
    }

    #[test]
    fn parallel_known_proof() {
        let pow = ProofOfWork::new(4);
        assert_eq!(pow.solve_parallel(100, &CancelToken::new()).unwrap(), 35293);
    }

    #[test]
    fn parallel_search_honours_cancel() {
        let pow = ProofOfWork::new(65);
        let cancel = CancelToken::new();
        cancel.cancel();
        assert_eq!(pow.solve_parallel(1, &cancel), Err(LedgerError::Cancelled));
    }
}
