use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::settings::SecretGuardSettings;

/// Human-readable prefix of bech32-encoded secret keys.
pub const SECRET_KEY_HRP: &str = "nsec";

const BECH32_CHARSET: &str = "qpzry9x8gf2tvdw0s3jn54khce6mua7l";
const BECH32_GENERATOR: [u32; 5] = [
    0x3b6a_57b2,
    0x2650_8e6d,
    0x1ea1_19fa,
    0x3d42_33dd,
    0x2a14_62b3,
];
const BECH32_CHECKSUM_LEN: usize = 6;

// 32 key bytes encode to 52 data characters plus the 6-character checksum.
static SECRET_KEY_CANDIDATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)nsec1[02-9ac-hj-np-z]{58}").expect("secret key pattern is valid")
});

/// Recognizer for the protocol's secret-key text encoding.
pub trait SecretRecognizer: Send + Sync {
    fn contains_secret(&self, text: &str) -> bool;
}

/// Matches `nsec1…` strings, optionally requiring a valid bech32 checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nip19SecretRecognizer {
    require_checksum: bool,
}

impl Nip19SecretRecognizer {
    pub const fn new(require_checksum: bool) -> Self {
        Self { require_checksum }
    }
}

impl Default for Nip19SecretRecognizer {
    fn default() -> Self {
        Self::new(true)
    }
}

impl SecretRecognizer for Nip19SecretRecognizer {
    fn contains_secret(&self, text: &str) -> bool {
        SECRET_KEY_CANDIDATE
            .find_iter(text)
            .any(|candidate| !self.require_checksum || bech32_checksum_valid(candidate.as_str()))
    }
}

/// Pre-submit scan for pasted secret keys.
///
/// A hit only asks the user to confirm; it never blocks the post on its own.
#[derive(Clone)]
pub struct PrivateKeyGuard {
    recognizer: Arc<dyn SecretRecognizer>,
}

impl PrivateKeyGuard {
    pub fn new(recognizer: Arc<dyn SecretRecognizer>) -> Self {
        Self { recognizer }
    }

    pub fn from_settings(settings: &SecretGuardSettings) -> Self {
        Self::new(Arc::new(Nip19SecretRecognizer::new(settings.require_checksum)))
    }

    pub fn contains_leaked_secret(&self, text: &str) -> bool {
        self.recognizer.contains_secret(text)
    }
}

impl Default for PrivateKeyGuard {
    fn default() -> Self {
        Self::new(Arc::new(Nip19SecretRecognizer::default()))
    }
}

impl fmt::Debug for PrivateKeyGuard {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("PrivateKeyGuard").finish_non_exhaustive()
    }
}

/// Scans `text` with the default recognizer.
pub fn contains_leaked_secret(text: &str) -> bool {
    Nip19SecretRecognizer::default().contains_secret(text)
}

fn bech32_checksum_valid(candidate: &str) -> bool {
    let has_lower = candidate.chars().any(|ch| ch.is_ascii_lowercase());
    let has_upper = candidate.chars().any(|ch| ch.is_ascii_uppercase());
    if has_lower && has_upper {
        return false;
    }

    let candidate = candidate.to_ascii_lowercase();
    let Some((hrp, data)) = candidate.rsplit_once('1') else {
        return false;
    };
    let Some(data) = data
        .chars()
        .map(|ch| BECH32_CHARSET.find(ch).map(|index| index as u8))
        .collect::<Option<Vec<_>>>()
    else {
        return false;
    };
    if data.len() < BECH32_CHECKSUM_LEN {
        return false;
    }

    let mut values = hrp_expand(hrp);
    values.extend(data);
    bech32_polymod(&values) == 1
}

fn hrp_expand(hrp: &str) -> Vec<u8> {
    let mut expanded = hrp.bytes().map(|byte| byte >> 5).collect::<Vec<_>>();
    expanded.push(0);
    expanded.extend(hrp.bytes().map(|byte| byte & 0x1f));
    expanded
}

fn bech32_polymod(values: &[u8]) -> u32 {
    let mut checksum: u32 = 1;
    for value in values {
        let top = checksum >> 25;
        checksum = ((checksum & 0x01ff_ffff) << 5) ^ u32::from(*value);
        for (bit, generator) in BECH32_GENERATOR.iter().enumerate() {
            if (top >> bit) & 1 == 1 {
                checksum ^= generator;
            }
        }
    }
    checksum
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_NSEC: &str = "nsec1vl029mgpspedva04g90vltkh6fvh240zqtv9k0t9af8935ke9laqsnlfe5";
    // Same key with the final checksum character altered.
    const CORRUPT_NSEC: &str = "nsec1vl029mgpspedva04g90vltkh6fvh240zqtv9k0t9af8935ke9laqsnlfeq";

    #[test]
    fn embedded_secret_key_is_detected() {
        assert!(contains_leaked_secret(VALID_NSEC));
        assert!(contains_leaked_secret(&format!(
            "my key is {VALID_NSEC} don't tell"
        )));
        assert!(contains_leaked_secret(&VALID_NSEC.to_uppercase()));
    }

    #[test]
    fn ordinary_text_is_not_flagged() {
        assert!(!contains_leaked_secret("gm nostr"));
        assert!(!contains_leaked_secret("nsec1 is how secret keys start"));
        assert!(!contains_leaked_secret(
            "npub1vl029mgpspedva04g90vltkh6fvh240zqtv9k0t9af8935ke9laqsnlfe5"
        ));
    }

    #[test]
    fn checksum_requirement_is_configurable() {
        assert!(!Nip19SecretRecognizer::new(true).contains_secret(CORRUPT_NSEC));
        assert!(Nip19SecretRecognizer::new(false).contains_secret(CORRUPT_NSEC));

        let lenient = PrivateKeyGuard::from_settings(&SecretGuardSettings {
            require_checksum: false,
        });
        assert!(lenient.contains_leaked_secret(CORRUPT_NSEC));
    }

    #[test]
    fn mixed_case_encoding_fails_the_checksum() {
        let mixed = format!("NSEC1{}", &VALID_NSEC[5..]);
        assert!(!contains_leaked_secret(&mixed));
    }

    #[test]
    fn guard_delegates_to_its_recognizer() {
        struct Always;

        impl SecretRecognizer for Always {
            fn contains_secret(&self, _text: &str) -> bool {
                true
            }
        }

        assert!(PrivateKeyGuard::new(Arc::new(Always)).contains_leaked_secret("anything"));
    }
}
