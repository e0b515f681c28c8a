use actix_web::web::{Data, Json, Path};
use actix_web::{get, post, put, HttpResponse};
use sqlx::query_as;

use crate::computador::get_computador;
use crate::db::today;
use crate::error::ApiError;
use crate::laboratorio::get_laboratorio;
use crate::models::{
    AppState, Db, RelatoProblema, RelatoProblemaCreate, RelatoProblemaPublic, RelatoProblemaUpdate,
};
use crate::usuario::{get_tecnico, usuario_public};

// --------------------------------------------------------------------------------
// Repository helpers

pub async fn get_relato(db: &Db, relato_id: i64) -> Result<Option<RelatoProblema>, ApiError> {
    let relato = query_as::<_, RelatoProblema>("SELECT * FROM relato_problema WHERE id = ?")
        .bind(relato_id)
        .fetch_optional(db)
        .await?;
    Ok(relato)
}

pub async fn relato_public(db: &Db, relato: RelatoProblema) -> Result<RelatoProblemaPublic, ApiError> {
    let computador = get_computador(db, relato.computador_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Computador não encontrado".to_string()))?;
    let usuario = usuario_public(db, relato.usuario_id).await?;
    let tecnico = match relato.tecnico_id {
        Some(tecnico_id) => Some(
            get_tecnico(db, tecnico_id)
                .await?
                .ok_or_else(|| ApiError::NotFound("Técnico não encontrado".to_string()))?,
        ),
        None => None,
    };
    Ok(RelatoProblemaPublic {
        id: relato.id,
        data_relato: relato.data_relato,
        descricao: relato.descricao,
        auditada: relato.auditada,
        aceita: relato.aceita,
        data_auditada: relato.data_auditada,
        computador,
        usuario,
        tecnico,
    })
}

async fn listar_por_auditada(db: &Db, auditada: bool) -> Result<Vec<RelatoProblemaPublic>, ApiError> {
    let relatos = query_as::<_, RelatoProblema>("SELECT * FROM relato_problema WHERE auditada = ?")
        .bind(auditada)
        .fetch_all(db)
        .await?;
    let mut publics = Vec::with_capacity(relatos.len());
    for relato in relatos {
        publics.push(relato_public(db, relato).await?);
    }
    Ok(publics)
}

// --------------------------------------------------------------------------------
// Handlers

/// New reports always start unaudited, unassigned and undecided.
#[utoipa::path(
    context_path = "/relato-problemas",
    request_body(content = RelatoProblemaCreate, content_type = "application/json", example = json!({
        "descricao": "Monitor não liga",
        "computador_id": 1,
        "usuario_id": 7
    })),
    responses(
        (status = 200, description = "The created problem report", body = RelatoProblemaPublic),
        (status = 404, description = "Computer, its lab or the reporting user was not found"),
        (status = 500, description = "An internal server error occurred")
    )
)]
#[post("/")]
pub async fn criar_relato(
    data: Data<AppState>,
    Json(relato): Json<RelatoProblemaCreate>,
) -> Result<HttpResponse, ApiError> {
    let db = &data.database;

    let computador = get_computador(db, relato.computador_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Computador não encontrado".to_string()))?;
    if get_laboratorio(db, computador.laboratorio_id).await?.is_none() {
        return Err(ApiError::NotFound("Laboratório não encontrado".to_string()));
    }
    usuario_public(db, relato.usuario_id).await?;

    let criado = query_as::<_, RelatoProblema>(
        "INSERT INTO relato_problema
            (data_relato, usuario_id, descricao, computador_id, tecnico_id, auditada, aceita, data_auditada)
         VALUES (?, ?, ?, ?, NULL, FALSE, NULL, NULL)
         RETURNING *",
    )
    .bind(relato.data_relato.unwrap_or_else(today))
    .bind(relato.usuario_id)
    .bind(&relato.descricao)
    .bind(relato.computador_id)
    .fetch_one(db)
    .await?;

    let public = relato_public(db, criado).await?;
    Ok(HttpResponse::Ok().json(public))
}

/// Audit update, the single mutation a report supports. A report can be
/// audited once; a second attempt is a conflict.
#[utoipa::path(
    context_path = "/relato-problemas",
    request_body = RelatoProblemaUpdate,
    responses(
        (status = 200, description = "The audited problem report", body = RelatoProblemaPublic),
        (status = 404, description = "Report or assigned technician was not found"),
        (status = 409, description = "The report has already been audited"),
        (status = 500, description = "An internal server error occurred")
    )
)]
#[put("/{relato_id}")]
pub async fn atualizar_relato(
    data: Data<AppState>,
    path: Path<i64>,
    Json(dados): Json<RelatoProblemaUpdate>,
) -> Result<HttpResponse, ApiError> {
    let db = &data.database;
    let relato_id = path.into_inner();

    let relato = get_relato(db, relato_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Relato não encontrado".to_string()))?;
    if relato.auditada {
        return Err(ApiError::Conflict("Relato já auditado.".to_string()));
    }
    if get_tecnico(db, dados.tecnico_id).await?.is_none() {
        return Err(ApiError::NotFound("Técnico não encontrado".to_string()));
    }

    let atualizado = query_as::<_, RelatoProblema>(
        "UPDATE relato_problema
         SET auditada = ?, aceita = ?, tecnico_id = ?, data_auditada = ?
         WHERE id = ?
         RETURNING *",
    )
    .bind(dados.auditada)
    .bind(dados.aceita)
    .bind(dados.tecnico_id)
    .bind(dados.data_auditada)
    .bind(relato_id)
    .fetch_one(db)
    .await?;

    let public = relato_public(db, atualizado).await?;
    Ok(HttpResponse::Ok().json(public))
}

#[utoipa::path(
    context_path = "/relato-problemas",
    responses(
        (status = 200, description = "Lists the reports still waiting for audit", body = Vec<RelatoProblemaPublic>),
        (status = 500, description = "An internal server error occurred")
    )
)]
#[get("/")]
pub async fn obter_relatos(data: Data<AppState>) -> Result<HttpResponse, ApiError> {
    let publics = listar_por_auditada(&data.database, false).await?;
    Ok(HttpResponse::Ok().json(publics))
}

#[utoipa::path(
    context_path = "/relato-problemas",
    responses(
        (status = 200, description = "Lists the audited reports", body = Vec<RelatoProblemaPublic>),
        (status = 500, description = "An internal server error occurred")
    )
)]
#[get("/auditados")]
pub async fn obter_relatos_auditados(data: Data<AppState>) -> Result<HttpResponse, ApiError> {
    let publics = listar_por_auditada(&data.database, true).await?;
    Ok(HttpResponse::Ok().json(publics))
}

#[utoipa::path(
    context_path = "/relato-problemas",
    responses(
        (status = 200, description = "The requested problem report", body = RelatoProblemaPublic),
        (status = 404, description = "The requested report was not found"),
        (status = 500, description = "An internal server error occurred")
    )
)]
#[get("/{relato_id}")]
pub async fn obter_relato(data: Data<AppState>, path: Path<i64>) -> Result<HttpResponse, ApiError> {
    let relato_id = path.into_inner();
    let relato = get_relato(&data.database, relato_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Relato não encontrado".to_string()))?;
    let public = relato_public(&data.database, relato).await?;
    Ok(HttpResponse::Ok().json(public))
}

pub fn configure(cfg: &mut actix_web::web::ServiceConfig) {
    // "/auditados" must register ahead of the "/{relato_id}" matcher.
    cfg.service(criar_relato)
        .service(atualizar_relato)
        .service(obter_relatos)
        .service(obter_relatos_auditados)
        .service(obter_relato);
}
