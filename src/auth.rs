use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};

pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    hash(password.as_bytes(), DEFAULT_COST)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password.as_bytes(), hash)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // 用户ID
    pub iat: i64,    // 签发时间
    pub exp: i64,    // 过期时间
}

/// 签发与校验会话 token。密钥进程级只读，启动时构建一次。
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime_ms: i64,
    validation: Validation,
}

/// HMAC 密钥最少需要的原始字节数
const MIN_SECRET_LEN: usize = 32;

impl TokenService {
    pub fn new(secret: &[u8], lifetime_ms: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // 过期判定不留余量，exp 在当前时刻之前即失效
        validation.leeway = 0;

        TokenService {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            lifetime_ms,
            validation,
        }
    }

    /// 按配置构建。密钥缺失或过短时换成随机临时密钥并告警，
    /// 绝不直接用弱密钥签名。临时密钥重启后失效，所有会话作废。
    pub fn from_config(config: &Config) -> Self {
        let secret = config.jwt_secret.as_bytes();
        if secret.len() >= MIN_SECRET_LEN {
            return Self::new(secret, config.jwt_expiration_ms);
        }

        tracing::warn!(
            "JWT_SECRET missing or shorter than {} bytes, using a random ephemeral key; \
             all tokens will be invalidated on restart",
            MIN_SECRET_LEN
        );
        let mut key = [0u8; MIN_SECRET_LEN];
        rand::thread_rng().fill_bytes(&mut key);
        Self::new(&key, config.jwt_expiration_ms)
    }

    /// 签发 token，返回 (token, 过期时间戳秒)
    pub fn issue(&self, user_id: Uuid) -> AppResult<(String, i64)> {
        let now = Utc::now();
        // exp 只有秒粒度，向上取整保证有效期不被截短
        let expiry_ms = now.timestamp_millis() + self.lifetime_ms;
        let exp = expiry_ms / 1000 + (expiry_ms % 1000 > 0) as i64;

        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp,
        };

        let token =
            encode(&Header::default(), &claims, &self.encoding).map_err(AppError::internal)?;
        Ok((token, exp))
    }

    /// 校验 token 并解析出用户ID。格式错误、签名不符、已过期
    /// 一律返回 Unauthenticated，不把库错误抛给调用方。
    pub fn verify(&self, token: &str) -> AppResult<Uuid> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|_| AppError::Unauthenticated)?;
        Uuid::parse_str(&data.claims.sub).map_err(|_| AppError::Unauthenticated)
    }
}
