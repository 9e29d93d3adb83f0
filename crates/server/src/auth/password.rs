use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

const ALGORITHM: &str = "pbkdf2_sha256";
const DEFAULT_ITERATIONS: u32 = 100_000;
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

/// 密码哈希(PBKDF2-HMAC-SHA256)
///
/// 存储格式: `pbkdf2_sha256$<iterations>$<salt hex>$<hash hex>`
#[derive(Debug, Clone)]
pub struct CredentialHasher {
    iterations: u32,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

impl CredentialHasher {
    pub fn with_iterations(iterations: u32) -> Self {
        Self {
            iterations: iterations.max(1),
        }
    }

    pub fn hash(&self, password: &str) -> String {
        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);

        let digest = Self::derive(password, &salt, self.iterations);
        format!(
            "{}${}${}${}",
            ALGORITHM,
            self.iterations,
            hex::encode(salt),
            hex::encode(digest)
        )
    }

    /// 格式不合法的哈希一律视为校验失败
    pub fn verify(&self, password: &str, stored: &str) -> bool {
        let parts: Vec<&str> = stored.split('$').collect();
        let [algorithm, iterations, salt, expected] = parts.as_slice() else {
            return false;
        };
        if *algorithm != ALGORITHM {
            return false;
        }

        let (Ok(iterations), Ok(salt), Ok(expected)) =
            (iterations.parse::<u32>(), hex::decode(salt), hex::decode(expected))
        else {
            return false;
        };
        if iterations == 0 || expected.len() != HASH_LEN {
            return false;
        }

        let digest = Self::derive(password, &salt, iterations);
        // 常量时间比较
        digest
            .iter()
            .zip(expected.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }

    fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; HASH_LEN] {
        let mut digest = [0u8; HASH_LEN];
        pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut digest);
        digest
    }
}
