//! Random password generation.
//!
//! [`PasswordPolicy`] mirrors the knobs of the secret store's random password
//! facility so the same policy can be sent to the store or generated locally.

use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::types::SecretString;
use crate::errors::{Error, Result};

const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";
const PUNCTUATION: &[u8] = br##"!"#$%&'()*+,-./:;<=>?@[\]^_`{|}~"##;
const SPACE: &[u8] = b" ";

/// Password generation policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct PasswordPolicy {
    #[validate(range(min = 1, max = 4096, message = "Password length must be between 1 and 4096"))]
    pub length: usize,
    pub exclude_lowercase: bool,
    pub exclude_uppercase: bool,
    pub exclude_numbers: bool,
    pub exclude_punctuation: bool,
    pub include_space: bool,
    /// Guarantee at least one character from every included class
    pub require_each_included_type: bool,
}

impl Default for PasswordPolicy {
    /// 32 characters of letters and digits, at least one of each class.
    fn default() -> Self {
        Self {
            length: 32,
            exclude_lowercase: false,
            exclude_uppercase: false,
            exclude_numbers: false,
            exclude_punctuation: true,
            include_space: false,
            require_each_included_type: true,
        }
    }
}

impl PasswordPolicy {
    /// Check field ranges and that the enabled classes fit in `length`
    pub fn check(&self) -> Result<()> {
        Validate::validate(self).map_err(Error::from)?;

        let required = self.required_classes().len();
        if required == 0 {
            return Err(Error::config("Password policy excludes every character class"));
        }
        if self.require_each_included_type && self.length < required {
            return Err(Error::config(format!(
                "Password length {} cannot hold one character from each of {} classes",
                self.length, required
            )));
        }
        Ok(())
    }

    /// Character classes that must each appear when
    /// `require_each_included_type` is set.
    fn required_classes(&self) -> Vec<&'static [u8]> {
        let mut classes = Vec::with_capacity(4);
        if !self.exclude_lowercase {
            classes.push(LOWERCASE);
        }
        if !self.exclude_uppercase {
            classes.push(UPPERCASE);
        }
        if !self.exclude_numbers {
            classes.push(DIGITS);
        }
        if !self.exclude_punctuation {
            classes.push(PUNCTUATION);
        }
        classes
    }

    fn alphabet(&self) -> Vec<u8> {
        let mut alphabet: Vec<u8> = self.required_classes().concat();
        if self.include_space {
            alphabet.extend_from_slice(SPACE);
        }
        alphabet
    }

    /// Generate a password from the OS random source
    pub fn generate(&self) -> Result<SecretString> {
        self.check()?;

        let mut rng = OsRng;
        let alphabet = self.alphabet();
        let mut chars: Vec<u8> = Vec::with_capacity(self.length);

        if self.require_each_included_type {
            for class in self.required_classes() {
                chars.push(class[rng.gen_range(0..class.len())]);
            }
        }
        while chars.len() < self.length {
            chars.push(alphabet[rng.gen_range(0..alphabet.len())]);
        }
        chars.shuffle(&mut rng);

        Ok(SecretString::new(chars.into_iter().map(char::from).collect::<String>()))
    }

    /// Check a candidate password against the policy
    pub fn is_satisfied_by(&self, candidate: &str) -> bool {
        if candidate.chars().count() != self.length {
            return false;
        }
        let alphabet = self.alphabet();
        if !candidate.bytes().all(|b| alphabet.contains(&b)) {
            return false;
        }
        !self.require_each_included_type
            || self
                .required_classes()
                .iter()
                .all(|class| candidate.bytes().any(|b| class.contains(&b)))
    }
}
