// ============================================================
// Layer 4 — Corpus Listing
// ============================================================
// Builds the ordered list of (mixture, instrumental) pairs from
// two directories.
//
// Pairing is POSITIONAL: each directory listing is filtered by
// extension, sorted on its own, and the Nth mixture is zipped
// with the Nth instrumental. Nothing checks that the names
// correspond, so the two directories must be aligned by the
// caller. Listings of different lengths can only be mis-paired
// and are rejected outright.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::domain::{error::DataError, file_pair::FilePair};

/// Extensions (without the dot) accepted as audio input.
pub const AUDIO_EXTENSIONS: [&str; 6] = ["wav", "m4a", "3gp", "oma", "mp3", "mp4"];

/// True if `path` has one of the whitelisted extensions (case-sensitive).
pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| AUDIO_EXTENSIONS.contains(&e))
        .unwrap_or(false)
}

/// List the audio files directly inside `dir`, sorted by path.
pub fn list_audio_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)
        .with_context(|| format!("Cannot read directory '{}'", dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() && is_audio_file(&path) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// List both directories and zip them into pairs by position.
pub fn build_corpus(mixture_dir: &Path, instrumental_dir: &Path) -> Result<Vec<FilePair>> {
    let mixtures      = list_audio_files(mixture_dir)?;
    let instrumentals = list_audio_files(instrumental_dir)?;

    if mixtures.len() != instrumentals.len() {
        return Err(DataError::MismatchedCorpusLength {
            mixtures:      mixtures.len(),
            instrumentals: instrumentals.len(),
        }
        .into());
    }

    let corpus: Vec<FilePair> = mixtures
        .into_iter()
        .zip(instrumentals)
        .map(|(x, y)| FilePair::new(x, y))
        .collect();

    for pair in corpus.iter().filter(|p| !p.stems_match()) {
        tracing::warn!(
            "Positional pairing joins '{}' with '{}'",
            pair.mixture().display(),
            pair.instrumental().display()
        );
    }

    tracing::debug!("Corpus of {} pairs", corpus.len());
    Ok(corpus)
}

#[cfg(test)]
pub(crate) mod test_dirs {
    use std::{
        fs,
        path::PathBuf,
        sync::atomic::{AtomicUsize, Ordering},
    };

    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    /// A fresh, empty directory under the system temp dir.
    pub fn fresh_dir(tag: &str) -> PathBuf {
        let n   = COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!(
            "vocal-remover-{tag}-{}-{n}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Create empty files with the given names inside `dir`.
    pub fn touch(dir: &PathBuf, names: &[&str]) {
        for name in names {
            fs::write(dir.join(name), b"").unwrap();
        }
    }
}
