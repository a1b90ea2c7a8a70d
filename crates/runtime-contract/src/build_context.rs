use sha2::{Digest, Sha256};

/// One file of an image build context, embedded at compile time.
#[derive(Debug, Clone, Copy)]
pub struct BuildFile {
    /// Path relative to the context root.
    pub path: &'static str,
    pub contents: &'static str,
}

pub(crate) const PYTHON: &[BuildFile] = &[
    BuildFile {
        path: "Dockerfile",
        contents: include_str!("../runtimes/python/Dockerfile"),
    },
    BuildFile {
        path: "entrypoint.py",
        contents: include_str!("../runtimes/python/entrypoint.py"),
    },
];

pub(crate) const JAVASCRIPT: &[BuildFile] = &[
    BuildFile {
        path: "Dockerfile",
        contents: include_str!("../runtimes/javascript/Dockerfile"),
    },
    BuildFile {
        path: "entrypoint.js",
        contents: include_str!("../runtimes/javascript/entrypoint.js"),
    },
];

/// Number of hex characters of the SHA-256 kept in image tags.
const HASH_LEN: usize = 12;

/// Short SHA-256 fingerprint over every file's path and contents.
pub(crate) fn context_hash(files: &[BuildFile]) -> String {
    let mut hasher = Sha256::new();
    for file in files {
        hasher.update(b"path:");
        hasher.update(file.path.as_bytes());
        hasher.update(b"contents:");
        hasher.update(file.contents.as_bytes());
    }
    let digest = format!("{:x}", hasher.finalize());
    digest.chars().take(HASH_LEN).collect()
}
