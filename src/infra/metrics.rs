// ============================================================
// Layer 6 — Loss Log
// ============================================================
// Persists the (train_loss, valid_loss) history of a run as a
// 2-D f64 .npy array, one row per inner epoch:
//
//   log_<timestamp>.npy    shape [rows, 2]
//   column 0 = training loss, column 1 = validation loss
//
// The whole history is rewritten after every inner epoch, so a
// run killed at any point leaves a complete, readable log of
// everything it finished.

use anyhow::{Context, Result};
use ndarray::Array2;
use ndarray_npy::write_npy;
use std::path::{Path, PathBuf};

/// Writes the loss history of one run.
#[derive(Debug, Clone)]
pub struct LossLog {
    path: PathBuf,
}

impl LossLog {
    /// `log_<timestamp>.npy` inside `dir`.
    pub fn new(dir: &Path, timestamp: &str) -> Self {
        Self { path: dir.join(format!("log_{timestamp}.npy")) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the file with the full history so far.
    pub fn write(&self, rows: &[[f64; 2]]) -> Result<()> {
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        let array          = Array2::from_shape_vec((rows.len(), 2), flat)?;

        write_npy(&self.path, &array)
            .with_context(|| format!("Cannot write loss log '{}'", self.path.display()))?;

        tracing::debug!("Wrote {} log rows to '{}'", rows.len(), self.path.display());
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use ndarray_npy::read_npy;

    use crate::data::corpus::test_dirs::fresh_dir;

    #[test]
    fn test_log_file_name() {
        let log = LossLog::new(Path::new("/runs"), "20240102030405");
        assert_eq!(log.path(), Path::new("/runs/log_20240102030405.npy"));
    }

    #[test]
    fn test_rewrite_keeps_full_history() {
        let dir = fresh_dir("loss_log");
        let log = LossLog::new(&dir, "ts");

        log.write(&[[0.3, 0.2]]).unwrap();
        log.write(&[[0.3, 0.2], [0.25, 0.21]]).unwrap();

        let back: Array2<f64> = read_npy(log.path()).unwrap();
        assert_eq!(back.dim(), (2, 2));
        assert_eq!(back[[1, 0]], 0.25);
        assert_eq!(back[[1, 1]], 0.21);
    }

    #[test]
    fn test_empty_history_is_valid() {
        let dir = fresh_dir("loss_log_empty");
        let log = LossLog::new(&dir, "ts");
        log.write(&[]).unwrap();
        let back: Array2<f64> = read_npy(log.path()).unwrap();
        assert_eq!(back.dim(), (0, 2));
    }
}
