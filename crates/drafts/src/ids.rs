use std::fmt;
use std::str::FromStr;

use snafu::ResultExt;

use super::error::{DraftError, DraftResult, InvalidIdSnafu};

/// Byte length shared by note ids and public keys.
pub const KEY_ID_LEN: usize = 32;

// Macro keeps all 32-byte protocol ids structurally identical.
macro_rules! define_key_id {
    ($name:ident, $id_type:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub [u8; KEY_ID_LEN]);

        impl $name {
            pub const fn new(raw: [u8; KEY_ID_LEN]) -> Self {
                Self(raw)
            }

            pub fn parse(raw: &str) -> DraftResult<Self> {
                let mut bytes = [0u8; KEY_ID_LEN];
                hex::decode_to_slice(raw.trim(), &mut bytes).context(InvalidIdSnafu {
                    stage: "parse-key-id",
                    id_type: $id_type,
                    raw: raw.to_string(),
                })?;
                Ok(Self(bytes))
            }

            pub fn as_bytes(&self) -> &[u8; KEY_ID_LEN] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(formatter, "{}", self.to_hex())
            }
        }

        impl From<[u8; KEY_ID_LEN]> for $name {
            fn from(value: [u8; KEY_ID_LEN]) -> Self {
                Self::new(value)
            }
        }

        impl FromStr for $name {
            type Err = DraftError;

            fn from_str(raw: &str) -> DraftResult<Self> {
                Self::parse(raw)
            }
        }
    };
}

define_key_id!(NoteId, "note-id");
define_key_id!(PubkeyId, "pubkey-id");
