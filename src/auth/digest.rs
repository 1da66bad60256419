//! Password digests found in htpasswd files.
//!
//! Supported formats:
//! - bcrypt: `$2a$`, `$2b$`, `$2x$`, `$2y$`
//! - `{SHA}` followed by base64 SHA-1
//! - `$apr1$salt$hash` (Apache MD5-crypt) and `$1$salt$hash` (MD5-crypt)

use base64::{engine::general_purpose, Engine as _};
use md5::{Digest as _, Md5};
use sha1::Sha1;
use subtle::ConstantTimeEq;
use thiserror::Error;

const SHA_PREFIX: &str = "{SHA}";
const APR1_MAGIC: &str = "$apr1$";
const MD5_MAGIC: &str = "$1$";
const BCRYPT_PREFIXES: [&str; 4] = ["$2a$", "$2b$", "$2x$", "$2y$"];
const MD5_SALT_MAX: usize = 8;
const MD5_ROUNDS: usize = 1000;
const CRYPT_ALPHABET: &[u8; 64] =
    b"./0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DigestError {
    #[error("unsupported digest format")]
    Unsupported,
    #[error("malformed {0} digest")]
    Malformed(&'static str),
}

/// A stored secret digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordDigest {
    Bcrypt(String),
    Sha1(Vec<u8>),
    /// MD5-crypt; `magic` is `$apr1$` or `$1$` and is mixed into the hash.
    Md5Crypt {
        magic: &'static str,
        salt: String,
        hash: String,
    },
}

impl PasswordDigest {
    pub fn parse(raw: &str) -> Result<Self, DigestError> {
        if let Some(encoded) = raw.strip_prefix(SHA_PREFIX) {
            let bytes = general_purpose::STANDARD
                .decode(encoded)
                .map_err(|_| DigestError::Malformed("{SHA}"))?;
            if bytes.len() != 20 {
                return Err(DigestError::Malformed("{SHA}"));
            }
            return Ok(Self::Sha1(bytes));
        }

        for (magic, label) in [(APR1_MAGIC, "apr1"), (MD5_MAGIC, "md5-crypt")] {
            if let Some(rest) = raw.strip_prefix(magic) {
                let (salt, hash) = rest.split_once('$').ok_or(DigestError::Malformed(label))?;
                if salt.is_empty() || hash.is_empty() {
                    return Err(DigestError::Malformed(label));
                }
                return Ok(Self::Md5Crypt {
                    magic,
                    salt: salt.to_string(),
                    hash: hash.to_string(),
                });
            }
        }

        if BCRYPT_PREFIXES.iter().any(|p| raw.starts_with(p)) {
            return Ok(Self::Bcrypt(raw.to_string()));
        }

        Err(DigestError::Unsupported)
    }

    /// Check `secret` against this digest.
    pub fn verify(&self, secret: &str) -> bool {
        match self {
            Self::Bcrypt(hash) => match bcrypt::verify(secret, hash) {
                Ok(matched) => matched,
                Err(e) => {
                    tracing::warn!(error = %e, "bcrypt verification failed");
                    false
                }
            },
            Self::Sha1(expected) => {
                let actual = Sha1::digest(secret.as_bytes());
                expected.as_slice().ct_eq(actual.as_slice()).into()
            }
            Self::Md5Crypt { magic, salt, hash } => {
                let actual = md5_crypt(secret.as_bytes(), salt.as_bytes(), magic);
                hash.as_bytes().ct_eq(actual.as_bytes()).into()
            }
        }
    }
}

/// MD5-crypt under `magic` (`$1$` or Apache's `$apr1$`). Returns the encoded
/// hash without the `<magic>salt$` prefix.
fn md5_crypt(password: &[u8], salt: &[u8], magic: &str) -> String {
    let salt = &salt[..salt.len().min(MD5_SALT_MAX)];

    let mut ctx = Md5::new();
    ctx.update(password);
    ctx.update(magic.as_bytes());
    ctx.update(salt);

    let mut alt = Md5::new();
    alt.update(password);
    alt.update(salt);
    alt.update(password);
    let alt = alt.finalize();

    let mut remaining = password.len();
    while remaining > 0 {
        let n = remaining.min(16);
        ctx.update(&alt[..n]);
        remaining -= n;
    }

    let mut bits = password.len();
    while bits > 0 {
        if bits & 1 == 1 {
            ctx.update([0u8]);
        } else {
            ctx.update(&password[..1]);
        }
        bits >>= 1;
    }

    let mut digest = ctx.finalize();
    for round in 0..MD5_ROUNDS {
        let mut c = Md5::new();
        if round & 1 == 1 {
            c.update(password);
        } else {
            c.update(digest.as_slice());
        }
        if round % 3 != 0 {
            c.update(salt);
        }
        if round % 7 != 0 {
            c.update(password);
        }
        if round & 1 == 1 {
            c.update(digest.as_slice());
        } else {
            c.update(password);
        }
        digest = c.finalize();
    }

    let mut out = String::with_capacity(22);
    for (a, b, c) in [(0, 6, 12), (1, 7, 13), (2, 8, 14), (3, 9, 15), (4, 10, 5)] {
        let v =
            (u32::from(digest[a]) << 16) | (u32::from(digest[b]) << 8) | u32::from(digest[c]);
        encode_crypt64(&mut out, v, 4);
    }
    encode_crypt64(&mut out, u32::from(digest[11]), 2);
    out
}

fn encode_crypt64(out: &mut String, mut v: u32, n: usize) {
    for _ in 0..n {
        out.push(char::from(CRYPT_ALPHABET[(v & 0x3f) as usize]));
        v >>= 6;
    }
}
