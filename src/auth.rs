//! Credential store: Argon2id password hashing and HS256 token handling.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::config::Settings;
use crate::error::ApiError;
use crate::models::{TipoUsuario, TokenPayload, Usuario};

/// Reset links expire quickly; they travel by email.
const RESET_TOKEN_TTL_MINUTES: i64 = 15;

pub fn hash_password(plain: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| ApiError::Internal(format!("falha ao gerar hash de senha: {err}")))
}

pub fn verify_password(plain: &str, hashed: &str) -> bool {
    match PasswordHash::new(hashed) {
        Ok(parsed) => Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Random alphanumeric password for staff accounts created without one.
pub fn generate_random_password(tamanho: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(tamanho)
        .map(char::from)
        .collect()
}

pub fn create_access_token(
    settings: &Settings,
    usuario: &Usuario,
    id_especifico: i64,
    tipo_usuario: TipoUsuario,
) -> Result<String, ApiError> {
    let expire = OffsetDateTime::now_utc() + Duration::minutes(settings.access_token_expire_minutes);
    let claims = TokenPayload {
        sub: usuario.id,
        id_especifico,
        email: usuario.email.clone(),
        tipo_usuario,
        nome: usuario.nome.clone(),
        exp: expire.unix_timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.secret_key.as_bytes()),
    )
    .map_err(|err| ApiError::Internal(format!("falha ao assinar token: {err}")))
}

pub fn decode_access_token(settings: &Settings, token: &str) -> Result<TokenPayload, ApiError> {
    decode::<TokenPayload>(
        token,
        &DecodingKey::from_secret(settings.secret_key.as_bytes()),
        &validation(),
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::credentials())
}

#[derive(Debug, Serialize, Deserialize)]
struct ResetTokenPayload {
    user_id: i64,
    exp: i64,
}

pub fn create_reset_token(settings: &Settings, usuario_id: i64) -> Result<String, ApiError> {
    let expire = OffsetDateTime::now_utc() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
    let claims = ResetTokenPayload {
        user_id: usuario_id,
        exp: expire.unix_timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.secret_key.as_bytes()),
    )
    .map_err(|err| ApiError::Internal(format!("falha ao assinar token: {err}")))
}

/// Returns the user id carried by a reset token, or a 400 when the link
/// is invalid or expired.
pub fn decode_reset_token(settings: &Settings, token: &str) -> Result<i64, ApiError> {
    decode::<ResetTokenPayload>(
        token,
        &DecodingKey::from_secret(settings.secret_key.as_bytes()),
        &validation(),
    )
    .map(|data| data.claims.user_id)
    .map_err(|_| {
        ApiError::BadRequest(
            "Link inválido ou expirado. Solicite a recuperação de senha novamente.".to_string(),
        )
    })
}

fn validation() -> Validation {
    let mut validation = Validation::default();
    // No clock leeway: an expired token is expired.
    validation.leeway = 0;
    validation
}
