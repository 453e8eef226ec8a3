use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

pub const CODE_LENGTH: usize = 6;

/// Uppercase letters and digits without the look-alikes `I`, `L`, `O`, `0` and `1`.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Upper bound of generation attempts before the issuer gives up on collisions.
pub const MAX_CODE_ATTEMPTS: u32 = 10;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CodeError {
    #[error("Invite code is missing")]
    Empty,
    #[error("Invite code must be {CODE_LENGTH} characters long, got {0}")]
    Length(usize),
    #[error("Invite code contains invalid character {0:?}")]
    Character(char),
}

/// Case-normalized invite code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InviteCode(String);

impl InviteCode {
    /// Trims and upper-cases user input before checking its shape.
    ///
    /// Any ASCII letter or digit is accepted here, only generated codes are
    /// restricted to [`CODE_ALPHABET`].
    pub fn parse(raw: &str) -> Result<Self, CodeError> {
        let normalized = raw.trim().to_ascii_uppercase();
        if normalized.is_empty() {
            return Err(CodeError::Empty);
        }
        if let Some(c) = normalized.chars().find(|c| !c.is_ascii_alphanumeric()) {
            return Err(CodeError::Character(c));
        }
        if normalized.len() != CODE_LENGTH {
            return Err(CodeError::Length(normalized.chars().count()));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for InviteCode {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for InviteCode {
    type Error = CodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<InviteCode> for String {
    fn from(code: InviteCode) -> Self {
        code.0
    }
}

impl Display for InviteCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Produces the candidate code for the `n`-th allocation attempt.
///
/// Uniqueness is not this trait's concern; the issuer checks every candidate
/// against storage and asks again on collision.
pub trait CodeGenerator: Send + Sync {
    fn attempt(&self, n: u32) -> InviteCode;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RandomCodes;

impl CodeGenerator for RandomCodes {
    fn attempt(&self, _n: u32) -> InviteCode {
        let mut rng = rand::thread_rng();
        let code = (0..CODE_LENGTH)
            .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
            .collect();
        InviteCode(code)
    }
}
