use bcrypt::BcryptError;
use rand::{distributions::Alphanumeric, Rng};

/// Work factor range bcrypt accepts.
pub const MIN_BCRYPT_COST: u32 = 4;
pub const MAX_BCRYPT_COST: u32 = 31;

/// bcrypt wrapper holding the work factor.
///
/// Keeps a hash of a random throwaway secret so that a lookup miss can burn
/// the same amount of work as a real verification.
pub struct PasswordHasher {
    cost: u32,
    decoy_hash: String,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Result<Self, BcryptError> {
        let decoy: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        let decoy_hash = bcrypt::hash(decoy, cost)?;
        Ok(Self { cost, decoy_hash })
    }

    pub fn hash(&self, plain: &str) -> Result<String, BcryptError> {
        bcrypt::hash(plain, self.cost)
    }

    /// A malformed stored hash counts as a failed verification.
    pub fn verify(&self, plain: &str, hashed: &str) -> bool {
        bcrypt::verify(plain, hashed).unwrap_or(false)
    }

    /// Burns the same work as `verify` for a lookup that found nothing.
    pub fn verify_decoy(&self, plain: &str) {
        let _ = bcrypt::verify(plain, &self.decoy_hash);
    }
}
