use actix_web::web::{Data, Json, Path};
use actix_web::{get, post, put, HttpResponse};
use sqlx::{query, query_as};

use crate::db::today;
use crate::error::ApiError;
use crate::laboratorio::{get_laboratorio, get_laboratorio_by_nome_local};
use crate::models::{
    AppState, Computador, ComputadorCreate, ComputadorPublic, ComputadorUpdate, Db,
};
use crate::status::{get_status, get_status_by_nome_descricao};
use crate::usuario::get_tecnico;

// --------------------------------------------------------------------------------
// Repository helpers

pub async fn get_computador(db: &Db, computador_id: i64) -> Result<Option<Computador>, ApiError> {
    let computador = query_as::<_, Computador>("SELECT * FROM computador WHERE id = ?")
        .bind(computador_id)
        .fetch_optional(db)
        .await?;
    Ok(computador)
}

pub async fn computador_public(db: &Db, computador: Computador) -> Result<ComputadorPublic, ApiError> {
    let status = get_status(db, computador.status_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Status não encontrado".to_string()))?;
    let laboratorio = get_laboratorio(db, computador.laboratorio_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Laboratório não encontrado".to_string()))?;
    let tecnico = get_tecnico(db, computador.tecnico_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Técnico não encontrado".to_string()))?;
    Ok(ComputadorPublic {
        id: computador.id,
        patrimonio: computador.patrimonio,
        hostname: computador.hostname,
        marca: computador.marca,
        ano_aquisicao: computador.ano_aquisicao,
        sistema_operacional: computador.sistema_operacional,
        data_ultima_alteracao: computador.data_ultima_alteracao,
        dias_desde_alteracao: computador.dias_desde_alteracao,
        status,
        laboratorio,
        tecnico,
    })
}

// --------------------------------------------------------------------------------
// Handlers

#[utoipa::path(
    context_path = "/computadores",
    request_body(content = ComputadorCreate, content_type = "application/json", example = json!({
        "patrimonio": "12345",
        "hostname": "PC01",
        "marca": "Dell",
        "ano_aquisicao": 2020,
        "sistema_operacional": "windows",
        "data_ultima_alteracao": "2024-03-01",
        "status_nome": "Disponível",
        "status_descricao": "Disponível",
        "laboratorio_nome": "Lab de Extensão 1",
        "laboratorio_local": "STI",
        "tecnico_id": 1
    })),
    responses(
        (status = 200, description = "The created computer", body = ComputadorPublic),
        (status = 404, description = "Lab, status or technician was not found"),
        (status = 409, description = "A computer with this asset tag already exists"),
        (status = 500, description = "An internal server error occurred")
    )
)]
#[post("/")]
pub async fn create_computador(
    data: Data<AppState>,
    Json(dados): Json<ComputadorCreate>,
) -> Result<HttpResponse, ApiError> {
    let db = &data.database;

    let laboratorio =
        get_laboratorio_by_nome_local(db, &dados.laboratorio_nome, &dados.laboratorio_local)
            .await?
            .ok_or_else(|| ApiError::NotFound("Laboratório não encontrado".to_string()))?;
    let status = get_status_by_nome_descricao(db, dados.status_nome, &dados.status_descricao)
        .await?
        .ok_or_else(|| ApiError::NotFound("Status não encontrado".to_string()))?;
    if get_tecnico(db, dados.tecnico_id).await?.is_none() {
        return Err(ApiError::NotFound("Técnico não encontrado".to_string()));
    }

    let existente = query_as::<_, Computador>("SELECT * FROM computador WHERE patrimonio = ?")
        .bind(&dados.patrimonio)
        .fetch_optional(db)
        .await?;
    if existente.is_some() {
        return Err(ApiError::Conflict(format!(
            "Um computador com o patrimônio {} já existe.",
            dados.patrimonio
        )));
    }

    let criado = query_as::<_, Computador>(
        "INSERT INTO computador
            (patrimonio, hostname, marca, ano_aquisicao, sistema_operacional,
             data_ultima_alteracao, dias_desde_alteracao, status_id, laboratorio_id, tecnico_id)
         VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?, ?)
         RETURNING *",
    )
    .bind(&dados.patrimonio)
    .bind(&dados.hostname)
    .bind(&dados.marca)
    .bind(dados.ano_aquisicao)
    .bind(dados.sistema_operacional)
    .bind(dados.data_ultima_alteracao)
    .bind(status.id)
    .bind(laboratorio.id)
    .bind(dados.tecnico_id)
    .fetch_one(db)
    .await?;

    let public = computador_public(db, criado).await?;
    Ok(HttpResponse::Ok().json(public))
}

/// Moves the computer to another status and stamps the change date.
#[utoipa::path(
    context_path = "/computadores",
    request_body = ComputadorUpdate,
    responses(
        (status = 200, description = "The updated computer", body = ComputadorPublic),
        (status = 404, description = "Computer or status was not found"),
        (status = 500, description = "An internal server error occurred")
    )
)]
#[put("/{computador_id}")]
pub async fn alterar_computador(
    data: Data<AppState>,
    path: Path<i64>,
    Json(dados): Json<ComputadorUpdate>,
) -> Result<HttpResponse, ApiError> {
    let db = &data.database;
    let computador_id = path.into_inner();

    if get_computador(db, computador_id).await?.is_none() {
        return Err(ApiError::NotFound("Computador não encontrado.".to_string()));
    }
    let status = get_status_by_nome_descricao(db, dados.status_nome, &dados.status_descricao)
        .await?
        .ok_or_else(|| ApiError::NotFound("Status não encontrado.".to_string()))?;

    let atualizado = query_as::<_, Computador>(
        "UPDATE computador SET status_id = ?, data_ultima_alteracao = ? WHERE id = ? RETURNING *",
    )
    .bind(status.id)
    .bind(today())
    .bind(computador_id)
    .fetch_one(db)
    .await?;

    let public = computador_public(db, atualizado).await?;
    Ok(HttpResponse::Ok().json(public))
}

#[utoipa::path(
    context_path = "/computadores",
    responses(
        (status = 200, description = "Lists all computers", body = Vec<ComputadorPublic>),
        (status = 500, description = "An internal server error occurred")
    )
)]
#[get("/")]
pub async fn get_computadores(data: Data<AppState>) -> Result<HttpResponse, ApiError> {
    let computadores = query_as::<_, Computador>("SELECT * FROM computador")
        .fetch_all(&data.database)
        .await?;
    let mut publics = Vec::with_capacity(computadores.len());
    for computador in computadores {
        publics.push(computador_public(&data.database, computador).await?);
    }
    Ok(HttpResponse::Ok().json(publics))
}

/// Single-computer read. Recomputes `dias_desde_alteracao` from today's
/// date and persists it, so the stored column tracks the last read.
#[utoipa::path(
    context_path = "/computadores",
    responses(
        (status = 200, description = "The requested computer", body = ComputadorPublic),
        (status = 404, description = "The requested computer was not found"),
        (status = 500, description = "An internal server error occurred")
    )
)]
#[get("/{computador_id}")]
pub async fn get_computador_by_id(
    data: Data<AppState>,
    path: Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let db = &data.database;
    let computador_id = path.into_inner();

    let computador = get_computador(db, computador_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Computador não encontrado".to_string()))?;

    let dias = (today() - computador.data_ultima_alteracao).whole_days();
    query("UPDATE computador SET dias_desde_alteracao = ? WHERE id = ?")
        .bind(dias)
        .bind(computador_id)
        .execute(db)
        .await?;

    let public = computador_public(
        db,
        Computador {
            dias_desde_alteracao: dias,
            ..computador
        },
    )
    .await?;
    Ok(HttpResponse::Ok().json(public))
}

pub fn configure(cfg: &mut actix_web::web::ServiceConfig) {
    cfg.service(create_computador)
        .service(alterar_computador)
        .service(get_computadores)
        .service(get_computador_by_id);
}
