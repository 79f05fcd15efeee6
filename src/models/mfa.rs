use rand::Rng;
use sha2::{Digest, Sha256};

/// Characters used for backup codes. 0/O and 1/I/L are excluded so the
/// printed codes can be read back without ambiguity.
pub const BACKUP_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub const BACKUP_CODE_COUNT: usize = 10;
pub const BACKUP_CODE_LEN: usize = 8;

/// Result of checking a candidate backup code against the stored hash
/// set. `remaining` is the set the caller must persist: on a match the
/// consumed hash has been removed, otherwise it is unchanged.
#[derive(Debug, Clone)]
pub struct BackupCodeCheck {
    pub valid: bool,
    pub remaining: Vec<String>,
}

/// Generate a fresh set of plaintext backup codes (unformatted, 8 chars
/// each). These are shown to the user once; only hashes are stored.
#[must_use]
pub fn generate_backup_codes() -> Vec<String> {
    let mut rng = rand::rng();

    (0..BACKUP_CODE_COUNT)
        .map(|_| {
            (0..BACKUP_CODE_LEN)
                .map(|_| {
                    let idx = rng.random_range(0..BACKUP_CODE_ALPHABET.len());
                    BACKUP_CODE_ALPHABET[idx] as char
                })
                .collect()
        })
        .collect()
}

/// Display form shown to the user: `XXXX-XXXX`.
#[must_use]
pub fn format_backup_code(code: &str) -> String {
    if code.len() == BACKUP_CODE_LEN {
        format!("{}-{}", &code[..4], &code[4..])
    } else {
        code.to_string()
    }
}

/// Uppercase and strip separators/whitespace so `xxxx-xxxx`, `XXXX XXXX`
/// and `XXXXXXXX` all normalize to the same value.
#[must_use]
pub fn normalize_backup_code(code: &str) -> String {
    code.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// SHA-256 hex digest over the normalized code. Codes are high-entropy
/// and single-use, so an unsalted digest is sufficient.
#[must_use]
pub fn hash_backup_code(code: &str) -> String {
    let digest = Sha256::digest(normalize_backup_code(code).as_bytes());

    digest.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

/// Membership test against the stored hash set. Single-use: a matching
/// hash is removed from the returned `remaining` set.
#[must_use]
pub fn verify_backup_code(stored_hashes: &[String], candidate: &str) -> BackupCodeCheck {
    let candidate_hash = hash_backup_code(candidate);

    match stored_hashes.iter().position(|h| *h == candidate_hash) {
        Some(idx) => {
            let mut remaining = stored_hashes.to_vec();
            remaining.remove(idx);
            BackupCodeCheck {
                valid: true,
                remaining,
            }
        }
        None => BackupCodeCheck {
            valid: false,
            remaining: stored_hashes.to_vec(),
        },
    }
}
