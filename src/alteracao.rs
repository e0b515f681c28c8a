use actix_web::web::{Data, Json, Path};
use actix_web::{get, post, HttpResponse};
use sqlx::{query, query_as};

use crate::computador::get_computador;
use crate::error::ApiError;
use crate::models::{
    AppState, Db, HistoricoAlteracao, HistoricoAlteracaoCreate, HistoricoAlteracaoPublic,
};
use crate::status::get_status;
use crate::usuario::get_tecnico;

// --------------------------------------------------------------------------------
// Repository helpers

pub async fn historico_public(
    db: &Db,
    historico: HistoricoAlteracao,
) -> Result<HistoricoAlteracaoPublic, ApiError> {
    let computador = get_computador(db, historico.computador_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Computador não encontrado".to_string()))?;
    let tecnico = get_tecnico(db, historico.tecnico_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Técnico não encontrado".to_string()))?;
    let status = get_status(db, historico.status_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Status não encontrado".to_string()))?;
    Ok(HistoricoAlteracaoPublic {
        id: historico.id,
        tipo_alteracao: historico.tipo_alteracao,
        data_alteracao: historico.data_alteracao,
        observacao: historico.observacao,
        computador,
        tecnico,
        status,
    })
}

// --------------------------------------------------------------------------------
// Handlers

/// Creating a change record also moves the referenced computer to the
/// record's status; both writes share one transaction.
#[utoipa::path(
    context_path = "/alteracoes",
    request_body(content = HistoricoAlteracaoCreate, content_type = "application/json", example = json!({
        "tipo_alteracao": "Manutenção",
        "data_alteracao": "2024-03-01",
        "observacao": "Troca de fonte",
        "computador_id": 1,
        "tecnico_id": 1,
        "status_id": 2
    })),
    responses(
        (status = 200, description = "The created change record", body = HistoricoAlteracaoPublic),
        (status = 404, description = "Computer, technician or status was not found"),
        (status = 500, description = "An internal server error occurred")
    )
)]
#[post("/")]
pub async fn criar_alteracao(
    data: Data<AppState>,
    Json(historico): Json<HistoricoAlteracaoCreate>,
) -> Result<HttpResponse, ApiError> {
    let db = &data.database;

    if get_computador(db, historico.computador_id).await?.is_none() {
        return Err(ApiError::NotFound("Computador não encontrado".to_string()));
    }
    if get_status(db, historico.status_id).await?.is_none() {
        return Err(ApiError::NotFound("Status não encontrado".to_string()));
    }
    if get_tecnico(db, historico.tecnico_id).await?.is_none() {
        return Err(ApiError::NotFound("Técnico não encontrado".to_string()));
    }

    let mut tx = db.begin().await?;
    let criado = query_as::<_, HistoricoAlteracao>(
        "INSERT INTO historico_alteracao
            (tipo_alteracao, data_alteracao, observacao, computador_id, tecnico_id, status_id)
         VALUES (?, ?, ?, ?, ?, ?)
         RETURNING *",
    )
    .bind(historico.tipo_alteracao)
    .bind(historico.data_alteracao)
    .bind(&historico.observacao)
    .bind(historico.computador_id)
    .bind(historico.tecnico_id)
    .bind(historico.status_id)
    .fetch_one(&mut tx)
    .await?;

    query("UPDATE computador SET status_id = ? WHERE id = ?")
        .bind(historico.status_id)
        .bind(historico.computador_id)
        .execute(&mut tx)
        .await?;
    tx.commit().await?;

    let public = historico_public(db, criado).await?;
    Ok(HttpResponse::Ok().json(public))
}

#[utoipa::path(
    context_path = "/alteracoes",
    responses(
        (status = 200, description = "Lists every change record", body = Vec<HistoricoAlteracaoPublic>),
        (status = 500, description = "An internal server error occurred")
    )
)]
#[get("/")]
pub async fn listar_alteracoes(data: Data<AppState>) -> Result<HttpResponse, ApiError> {
    let alteracoes = query_as::<_, HistoricoAlteracao>("SELECT * FROM historico_alteracao")
        .fetch_all(&data.database)
        .await?;
    let mut publics = Vec::with_capacity(alteracoes.len());
    for alteracao in alteracoes {
        publics.push(historico_public(&data.database, alteracao).await?);
    }
    Ok(HttpResponse::Ok().json(publics))
}

#[utoipa::path(
    context_path = "/alteracoes",
    responses(
        (status = 200, description = "The requested change record", body = HistoricoAlteracaoPublic),
        (status = 404, description = "The requested change record was not found"),
        (status = 500, description = "An internal server error occurred")
    )
)]
#[get("/{alteracao_id}")]
pub async fn obter_alteracao(data: Data<AppState>, path: Path<i64>) -> Result<HttpResponse, ApiError> {
    let alteracao_id = path.into_inner();
    let alteracao = query_as::<_, HistoricoAlteracao>("SELECT * FROM historico_alteracao WHERE id = ?")
        .bind(alteracao_id)
        .fetch_optional(&data.database)
        .await?
        .ok_or_else(|| ApiError::NotFound("Alteração não encontrada".to_string()))?;
    let public = historico_public(&data.database, alteracao).await?;
    Ok(HttpResponse::Ok().json(public))
}

pub fn configure(cfg: &mut actix_web::web::ServiceConfig) {
    cfg.service(criar_alteracao)
        .service(listar_alteracoes)
        .service(obter_alteracao);
}
