//! Access guard. Extractors decode the bearer token, re-load the user by
//! the claimed email and, for the role-scoped variants, require the
//! matching role record. A bad token is an authentication failure; a
//! valid identity with the wrong role is an authorization failure.

use std::future::Future;
use std::pin::Pin;

use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::web::Data;
use actix_web::{FromRequest, HttpRequest};

use crate::auth::decode_access_token;
use crate::error::ApiError;
use crate::identity::{resolve_role_as, RoleRecord};
use crate::models::{Administrador, Aluno, AppState, Professor, Tecnico, TipoUsuario, Usuario};
use crate::usuario::get_usuario_by_email;

type ExtractorFuture<T> = Pin<Box<dyn Future<Output = Result<T, ApiError>>>>;

fn bearer_token(req: &HttpRequest) -> Result<String, ApiError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(ApiError::credentials)?;
    match header.strip_prefix("Bearer ") {
        Some(token) if !token.is_empty() => Ok(token.to_string()),
        _ => Err(ApiError::credentials()),
    }
}

fn state(req: &HttpRequest) -> Result<AppState, ApiError> {
    req.app_data::<Data<AppState>>()
        .map(|data| data.get_ref().clone())
        .ok_or_else(|| ApiError::Internal("AppState não registrado".to_string()))
}

async fn authenticate_request(req: HttpRequest) -> Result<(AppState, Usuario), ApiError> {
    let state = state(&req)?;
    let token = bearer_token(&req)?;
    let claims = decode_access_token(&state.settings, &token)?;
    let usuario = get_usuario_by_email(&state.database, &claims.email)
        .await?
        .ok_or_else(|| ApiError::NotFound("Usuário não encontrado".to_string()))?;
    Ok((state, usuario))
}

async fn authorize_role(req: HttpRequest, tipo: TipoUsuario) -> Result<RoleRecord, ApiError> {
    let (state, usuario) = authenticate_request(req).await?;
    resolve_role_as(&state.database, usuario.id, tipo)
        .await?
        .ok_or_else(|| ApiError::Authorization("Usuário não autorizado.".to_string()))
}

/// The authenticated caller, regardless of role.
pub struct CurrentUsuario(pub Usuario);

impl FromRequest for CurrentUsuario {
    type Error = ApiError;
    type Future = ExtractorFuture<Self>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            let (_, usuario) = authenticate_request(req).await?;
            Ok(CurrentUsuario(usuario))
        })
    }
}

macro_rules! role_guard {
    ($guard:ident, $record:ident, $tipo:expr) => {
        pub struct $guard(pub $record);

        impl FromRequest for $guard {
            type Error = ApiError;
            type Future = ExtractorFuture<Self>;

            fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
                let req = req.clone();
                Box::pin(async move {
                    match authorize_role(req, $tipo).await? {
                        RoleRecord::$record(record) => Ok($guard(record)),
                        _ => Err(ApiError::Authorization("Usuário não autorizado.".to_string())),
                    }
                })
            }
        }
    };
}

role_guard!(CurrentAdministrador, Administrador, TipoUsuario::Administrador);
role_guard!(CurrentTecnico, Tecnico, TipoUsuario::Tecnico);
role_guard!(CurrentProfessor, Professor, TipoUsuario::Professor);
role_guard!(CurrentAluno, Aluno, TipoUsuario::Aluno);
