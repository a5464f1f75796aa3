use bcrypt::BcryptError;

/// Hash a plaintext password with the configured work factor. Plaintext never
/// reaches storage; only the hash is persisted.
pub fn hash(plain: &str, cost: u32) -> Result<String, BcryptError> {
    bcrypt::hash(plain, cost)
}

/// Constant-style comparison of a plaintext candidate against a stored hash.
pub fn verify(plain: &str, hashed: &str) -> Result<bool, BcryptError> {
    bcrypt::verify(plain, hashed)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimum bcrypt cost keeps these fast; production cost comes from config.
    const TEST_COST: u32 = 4;

    #[test]
    fn hash_then_verify_succeeds() {
        let hashed = hash("password123", TEST_COST).unwrap();
        assert_ne!(hashed, "password123");
        assert!(verify("password123", &hashed).unwrap());
    }

    #[test]
    fn wrong_password_fails_verification() {
        let hashed = hash("password123", TEST_COST).unwrap();
        assert!(!verify("password124", &hashed).unwrap());
    }

    #[test]
    fn same_password_hashes_differently() {
        let a = hash("password123", TEST_COST).unwrap();
        let b = hash("password123", TEST_COST).unwrap();
        assert_ne!(a, b);
    }
}
