use actix_web::web::{Data, Json, Path};
use actix_web::{get, post, HttpResponse};
use sqlx::query_as;

use crate::error::ApiError;
use crate::models::{AppState, Db, Status, StatusComputador, StatusCreate};

// --------------------------------------------------------------------------------
// Repository helpers

/// The (nome, descricao) pair is the effective identity of a status row.
pub async fn get_status_by_nome_descricao(
    db: &Db,
    nome: StatusComputador,
    descricao: &str,
) -> Result<Option<Status>, ApiError> {
    let status = query_as::<_, Status>("SELECT * FROM status WHERE nome = ? AND descricao = ?")
        .bind(nome)
        .bind(descricao)
        .fetch_optional(db)
        .await?;
    Ok(status)
}

pub async fn get_status(db: &Db, status_id: i64) -> Result<Option<Status>, ApiError> {
    let status = query_as::<_, Status>("SELECT * FROM status WHERE id = ?")
        .bind(status_id)
        .fetch_optional(db)
        .await?;
    Ok(status)
}

// --------------------------------------------------------------------------------
// Handlers

#[utoipa::path(
    context_path = "/status",
    request_body(content = StatusCreate, content_type = "application/json", example = json!({
        "nome": "Em manutenção",
        "descricao": "Aguardando peça"
    })),
    responses(
        (status = 200, description = "The created status", body = Status),
        (status = 409, description = "A status with this name and description already exists"),
        (status = 500, description = "An internal server error occurred")
    )
)]
#[post("/")]
pub async fn create_status(
    data: Data<AppState>,
    Json(status): Json<StatusCreate>,
) -> Result<HttpResponse, ApiError> {
    if get_status_by_nome_descricao(&data.database, status.nome, &status.descricao)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict(
            "Status com este nome e descrição já existe.".to_string(),
        ));
    }

    let criado = query_as::<_, Status>(
        "INSERT INTO status (nome, descricao) VALUES (?, ?) RETURNING *",
    )
    .bind(status.nome)
    .bind(&status.descricao)
    .fetch_one(&data.database)
    .await?;
    Ok(HttpResponse::Ok().json(criado))
}

#[utoipa::path(
    context_path = "/status",
    responses(
        (status = 200, description = "All statuses sharing the given name", body = Vec<Status>),
        (status = 500, description = "An internal server error occurred")
    )
)]
#[get("/{status_nome}/")]
pub async fn listar_status(
    data: Data<AppState>,
    path: Path<StatusComputador>,
) -> Result<HttpResponse, ApiError> {
    let status_nome = path.into_inner();
    let status = query_as::<_, Status>("SELECT * FROM status WHERE nome = ?")
        .bind(status_nome)
        .fetch_all(&data.database)
        .await?;
    Ok(HttpResponse::Ok().json(status))
}

#[utoipa::path(
    context_path = "/status",
    responses(
        (status = 200, description = "The requested status", body = Status),
        (status = 404, description = "The requested status was not found"),
        (status = 500, description = "An internal server error occurred")
    )
)]
#[get("/{status_nome}/{status_descricao}/")]
pub async fn obter_status(
    data: Data<AppState>,
    path: Path<(StatusComputador, String)>,
) -> Result<HttpResponse, ApiError> {
    let (status_nome, status_descricao) = path.into_inner();
    let status = get_status_by_nome_descricao(&data.database, status_nome, &status_descricao)
        .await?
        .ok_or_else(|| ApiError::NotFound("Status não encontrado".to_string()))?;
    Ok(HttpResponse::Ok().json(status))
}

pub fn configure(cfg: &mut actix_web::web::ServiceConfig) {
    cfg.service(create_status)
        .service(obter_status)
        .service(listar_status);
}
