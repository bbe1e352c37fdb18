//! Password hashing

use crate::errors::Result;

pub struct PasswordService;

impl PasswordService {
    pub fn hash_password(password: &str) -> Result<String> {
        Self::hash_password_with_cost(password, bcrypt::DEFAULT_COST)
    }

    pub fn hash_password_with_cost(password: &str, cost: u32) -> Result<String> {
        let hash = bcrypt::hash(password, cost)?;
        Ok(hash)
    }

    /// A malformed stored hash counts as a mismatch
    pub fn verify_password(hash: &str, password: &str) -> bool {
        bcrypt::verify(password, hash).unwrap_or(false)
    }
}
