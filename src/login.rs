use actix_web::web::{Data, Form, Json};
use actix_web::{post, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use sqlx::query;
use utoipa::ToSchema;

use crate::auth::{
    create_access_token, create_reset_token, decode_reset_token, hash_password, verify_password,
};
use crate::error::ApiError;
use crate::guard::CurrentUsuario;
use crate::identity::resolve_role;
use crate::models::{
    AppState, Db, EsqueciSenha, NovaSenha, RecuperacaoSenha, Token, TrocaSenha, Usuario,
    UsuarioPublic,
};
use crate::usuario::{get_usuario, get_usuario_by_email};

/// OAuth2 password-grant form, as sent by the frontend login screen.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

async fn authenticate(db: &Db, email: &str, senha: &str) -> Result<Option<Usuario>, ApiError> {
    let usuario = match get_usuario_by_email(db, email).await? {
        Some(usuario) => usuario,
        None => return Ok(None),
    };
    let confere = usuario
        .senha_hash
        .as_deref()
        .map(|hash| verify_password(senha, hash))
        .unwrap_or(false);
    Ok(confere.then_some(usuario))
}

async fn set_senha(db: &Db, usuario_id: i64, nova_senha: &str) -> Result<(), ApiError> {
    let senha_hash = hash_password(nova_senha)?;
    query("UPDATE usuario SET senha_hash = ? WHERE id = ?")
        .bind(senha_hash)
        .bind(usuario_id)
        .execute(db)
        .await?;
    Ok(())
}

// --------------------------------------------------------------------------------
// Handlers

/// OAuth2 compatible token login, get an access token for future requests.
#[utoipa::path(
    context_path = "/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "A signed bearer token", body = Token),
        (status = 400, description = "Unknown email, wrong password or roleless user"),
        (status = 500, description = "An internal server error occurred")
    )
)]
#[post("/access-token")]
pub async fn login_access_token(
    data: Data<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<HttpResponse, ApiError> {
    let usuario = authenticate(&data.database, &form.username, &form.password)
        .await?
        .ok_or_else(|| ApiError::BadRequest("Email ou senha incorretos.".to_string()))?;
    let record = resolve_role(&data.database, usuario.id)
        .await?
        .ok_or_else(|| ApiError::BadRequest("Usuário sem perfil associado.".to_string()))?;

    let token = create_access_token(&data.settings, &usuario, record.id(), record.kind())?;
    Ok(HttpResponse::Ok().json(Token::bearer(token)))
}

/// Replaces a user's password, refusing a password identical to the
/// current one.
#[post("/atualizar-senha")]
pub async fn atualizar_senha(
    data: Data<AppState>,
    Json(dados): Json<NovaSenha>,
) -> Result<HttpResponse, ApiError> {
    let usuario = get_usuario(&data.database, dados.usuario_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Usuário não encontrado".to_string()))?;
    let identica = usuario
        .senha_hash
        .as_deref()
        .map(|hash| verify_password(&dados.senha, hash))
        .unwrap_or(false);
    if identica {
        return Err(ApiError::BadRequest("Senha idêntica à anterior.".to_string()));
    }
    set_senha(&data.database, usuario.id, &dados.senha).await?;
    Ok(HttpResponse::Ok().json(UsuarioPublic::from(usuario)))
}

/// The acknowledgement never reveals whether the email is registered;
/// when it is, the mailer seam receives a short-lived reset link.
#[utoipa::path(
    context_path = "/login",
    request_body = EsqueciSenha,
    responses(
        (status = 200, description = "Generic acknowledgement, whether or not the email exists"),
        (status = 500, description = "An internal server error occurred")
    )
)]
#[post("/esqueci-senha")]
pub async fn esqueci_senha(
    data: Data<AppState>,
    Json(dados): Json<EsqueciSenha>,
) -> Result<HttpResponse, ApiError> {
    if let Some(usuario) = get_usuario_by_email(&data.database, &dados.email).await? {
        let token = create_reset_token(&data.settings, usuario.id)?;
        let link = format!("{}/recuperar-senha?token={token}", data.settings.base_url);
        data.mailer.send_recovery_email(&usuario.email, &link);
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Se o email estiver cadastrado, você receberá instruções para recuperar a senha."
    })))
}

/// Resets a password from the emailed recovery link; the logged-in flow
/// uses `/trocar-senha` instead.
#[utoipa::path(
    context_path = "/login",
    request_body = RecuperacaoSenha,
    responses(
        (status = 200, description = "Password reset"),
        (status = 400, description = "Invalid or expired reset token"),
        (status = 500, description = "An internal server error occurred")
    )
)]
#[post("/redefinir-senha")]
pub async fn redefinir_senha(
    data: Data<AppState>,
    Json(dados): Json<RecuperacaoSenha>,
) -> Result<HttpResponse, ApiError> {
    let usuario_id = decode_reset_token(&data.settings, &dados.token)?;
    let usuario = get_usuario(&data.database, usuario_id)
        .await?
        .ok_or_else(|| ApiError::BadRequest("Token inválido ou expirado.".to_string()))?;
    set_senha(&data.database, usuario.id, &dados.nova_senha).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Senha redefinida com sucesso." })))
}

/// Changes the password of the logged-in caller.
#[utoipa::path(
    context_path = "/login",
    request_body = TrocaSenha,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "The current password does not match"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 500, description = "An internal server error occurred")
    )
)]
#[post("/trocar-senha")]
pub async fn trocar_senha(
    data: Data<AppState>,
    current: CurrentUsuario,
    Json(dados): Json<TrocaSenha>,
) -> Result<HttpResponse, ApiError> {
    let usuario = current.0;
    let confere = usuario
        .senha_hash
        .as_deref()
        .map(|hash| verify_password(&dados.senha_atual, hash))
        .unwrap_or(false);
    if !confere {
        return Err(ApiError::BadRequest("Senha atual incorreta.".to_string()));
    }
    set_senha(&data.database, usuario.id, &dados.nova_senha).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Senha alterada com sucesso." })))
}

/// Test access token.
#[post("/test-token")]
pub async fn test_token(current: CurrentUsuario) -> HttpResponse {
    HttpResponse::Ok().json(UsuarioPublic::from(current.0))
}

pub fn configure(cfg: &mut actix_web::web::ServiceConfig) {
    cfg.service(login_access_token)
        .service(atualizar_senha)
        .service(esqueci_senha)
        .service(redefinir_senha)
        .service(trocar_senha)
        .service(test_token);
}
