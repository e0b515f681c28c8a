use actix_web::web::{Data, Json, Path};
use actix_web::{get, post, put, HttpResponse};
use sqlx::query_as;

use crate::error::ApiError;
use crate::models::{
    Administrador, AppState, Computador, Db, Laboratorio, LaboratorioCreate, LaboratorioPublic,
};

// --------------------------------------------------------------------------------
// Repository helpers

pub async fn get_laboratorio(db: &Db, laboratorio_id: i64) -> Result<Option<Laboratorio>, ApiError> {
    let laboratorio = query_as::<_, Laboratorio>("SELECT * FROM laboratorio WHERE id = ?")
        .bind(laboratorio_id)
        .fetch_optional(db)
        .await?;
    Ok(laboratorio)
}

pub async fn get_laboratorio_by_nome_local(
    db: &Db,
    nome: &str,
    local: &str,
) -> Result<Option<Laboratorio>, ApiError> {
    let laboratorio =
        query_as::<_, Laboratorio>("SELECT * FROM laboratorio WHERE nome = ? AND local = ?")
            .bind(nome)
            .bind(local)
            .fetch_optional(db)
            .await?;
    Ok(laboratorio)
}

pub async fn laboratorio_public(db: &Db, laboratorio: Laboratorio) -> Result<LaboratorioPublic, ApiError> {
    let computadores = query_as::<_, Computador>("SELECT * FROM computador WHERE laboratorio_id = ?")
        .bind(laboratorio.id)
        .fetch_all(db)
        .await?;
    let administrador = query_as::<_, Administrador>("SELECT * FROM administrador WHERE id = ?")
        .bind(laboratorio.administrador_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Administrador não encontrado".to_string()))?;
    Ok(LaboratorioPublic {
        id: laboratorio.id,
        nome: laboratorio.nome,
        local: laboratorio.local,
        computadores,
        administrador,
    })
}

// --------------------------------------------------------------------------------
// Handlers

#[utoipa::path(
    context_path = "/laboratorios",
    request_body(content = LaboratorioCreate, content_type = "application/json", example = json!({
        "nome": "Lab de Extensão 1",
        "local": "STI",
        "administrador_id": 1
    })),
    responses(
        (status = 200, description = "The created lab", body = LaboratorioPublic),
        (status = 404, description = "The owning administrator was not found"),
        (status = 500, description = "An internal server error occurred")
    )
)]
#[post("/")]
pub async fn create_laboratorio(
    data: Data<AppState>,
    Json(laboratorio): Json<LaboratorioCreate>,
) -> Result<HttpResponse, ApiError> {
    if !crate::usuario::is_administrador_present(&data.database, laboratorio.administrador_id).await? {
        return Err(ApiError::NotFound("Administrador não encontrado".to_string()));
    }

    let criado = query_as::<_, Laboratorio>(
        "INSERT INTO laboratorio (nome, local, administrador_id) VALUES (?, ?, ?) RETURNING *",
    )
    .bind(&laboratorio.nome)
    .bind(&laboratorio.local)
    .bind(laboratorio.administrador_id)
    .fetch_one(&data.database)
    .await?;

    let public = laboratorio_public(&data.database, criado).await?;
    Ok(HttpResponse::Ok().json(public))
}

/// Renames or relocates a lab; ownership cannot be transferred here.
#[utoipa::path(
    context_path = "/laboratorios",
    request_body = LaboratorioCreate,
    responses(
        (status = 200, description = "The updated lab", body = LaboratorioPublic),
        (status = 404, description = "The requested lab was not found"),
        (status = 500, description = "An internal server error occurred")
    )
)]
#[put("/{laboratorio_id}")]
pub async fn update_laboratorio(
    data: Data<AppState>,
    path: Path<i64>,
    Json(laboratorio): Json<LaboratorioCreate>,
) -> Result<HttpResponse, ApiError> {
    let laboratorio_id = path.into_inner();

    let atualizado = query_as::<_, Laboratorio>(
        "UPDATE laboratorio SET nome = ?, local = ? WHERE id = ? RETURNING *",
    )
    .bind(&laboratorio.nome)
    .bind(&laboratorio.local)
    .bind(laboratorio_id)
    .fetch_optional(&data.database)
    .await?
    .ok_or_else(|| ApiError::NotFound("Laboratório não encontrado".to_string()))?;

    let public = laboratorio_public(&data.database, atualizado).await?;
    Ok(HttpResponse::Ok().json(public))
}

#[utoipa::path(
    context_path = "/laboratorios",
    responses(
        (status = 200, description = "Lists all labs", body = Vec<LaboratorioPublic>),
        (status = 500, description = "An internal server error occurred")
    )
)]
#[get("/")]
pub async fn get_laboratorios(data: Data<AppState>) -> Result<HttpResponse, ApiError> {
    let laboratorios = query_as::<_, Laboratorio>("SELECT * FROM laboratorio")
        .fetch_all(&data.database)
        .await?;
    let mut publics = Vec::with_capacity(laboratorios.len());
    for laboratorio in laboratorios {
        publics.push(laboratorio_public(&data.database, laboratorio).await?);
    }
    Ok(HttpResponse::Ok().json(publics))
}

#[utoipa::path(
    context_path = "/laboratorios",
    responses(
        (status = 200, description = "The requested lab", body = LaboratorioPublic),
        (status = 404, description = "The requested lab was not found"),
        (status = 500, description = "An internal server error occurred")
    )
)]
#[get("/{laboratorio_id}")]
pub async fn get_laboratorio_by_id(
    data: Data<AppState>,
    path: Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let laboratorio_id = path.into_inner();
    let laboratorio = get_laboratorio(&data.database, laboratorio_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Laboratório não encontrado".to_string()))?;
    let public = laboratorio_public(&data.database, laboratorio).await?;
    Ok(HttpResponse::Ok().json(public))
}

pub fn configure(cfg: &mut actix_web::web::ServiceConfig) {
    cfg.service(create_laboratorio)
        .service(update_laboratorio)
        .service(get_laboratorios)
        .service(get_laboratorio_by_id);
}
