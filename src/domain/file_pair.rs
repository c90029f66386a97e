// ============================================================
// Layer 3 — FilePair Domain Type
// ============================================================
// One training example on disk: a mixture recording and the
// instrumental recording it was paired with.
//
// Serialises as a two element JSON array so validation
// manifests read as `[["mix/a.wav", "inst/a.wav"], ...]`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A (mixture, instrumental) path pair. Equality is exact path equality,
/// which is what manifest membership tests rely on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilePair(pub PathBuf, pub PathBuf);

impl FilePair {
    pub fn new(mixture: impl Into<PathBuf>, instrumental: impl Into<PathBuf>) -> Self {
        Self(mixture.into(), instrumental.into())
    }

    pub fn mixture(&self) -> &Path {
        &self.0
    }

    pub fn instrumental(&self) -> &Path {
        &self.1
    }

    /// True when both files share a file stem. Pairing is positional, so a
    /// false here usually means the two directories are not aligned.
    pub fn stems_match(&self) -> bool {
        self.0.file_stem() == self.1.file_stem()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialises_as_array() {
        let pair = FilePair::new("mix/a.wav", "inst/a.wav");
        let json = serde_json::to_string(&pair).unwrap();
        assert_eq!(json, r#"["mix/a.wav","inst/a.wav"]"#);

        let back: FilePair = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pair);
    }

    #[test]
    fn test_stems_match() {
        assert!(FilePair::new("mix/song.wav", "inst/song.wav").stems_match());
        assert!(!FilePair::new("mix/song.wav", "inst/other.wav").stems_match());
    }
}
