//! Role resolution: maps a generic `Usuario` to the role record it owns.

use sqlx::query_as;

use crate::error::ApiError;
use crate::models::{Administrador, Aluno, Db, Professor, Tecnico, TipoUsuario};

#[derive(Debug, Clone)]
pub enum RoleRecord {
    Administrador(Administrador),
    Aluno(Aluno),
    Tecnico(Tecnico),
    Professor(Professor),
}

impl RoleRecord {
    pub fn id(&self) -> i64 {
        match self {
            RoleRecord::Administrador(a) => a.id,
            RoleRecord::Aluno(a) => a.id,
            RoleRecord::Tecnico(t) => t.id,
            RoleRecord::Professor(p) => p.id,
        }
    }

    pub fn kind(&self) -> TipoUsuario {
        match self {
            RoleRecord::Administrador(_) => TipoUsuario::Administrador,
            RoleRecord::Aluno(_) => TipoUsuario::Aluno,
            RoleRecord::Tecnico(_) => TipoUsuario::Tecnico,
            RoleRecord::Professor(_) => TipoUsuario::Professor,
        }
    }

    pub fn matricula(&self) -> &str {
        match self {
            RoleRecord::Administrador(a) => &a.matricula,
            RoleRecord::Aluno(a) => &a.matricula,
            RoleRecord::Tecnico(t) => &t.matricula,
            RoleRecord::Professor(p) => &p.matricula,
        }
    }
}

/// Probes the role tables in a fixed order: Administrador, Aluno,
/// Tecnico, Professor. If a user erroneously owns more than one role
/// record, the first table in this order wins; the order is part of the
/// observable behavior and must not be changed.
pub async fn resolve_role(db: &Db, usuario_id: i64) -> Result<Option<RoleRecord>, ApiError> {
    for tipo in [
        TipoUsuario::Administrador,
        TipoUsuario::Aluno,
        TipoUsuario::Tecnico,
        TipoUsuario::Professor,
    ] {
        if let Some(record) = resolve_role_as(db, usuario_id, tipo).await? {
            return Ok(Some(record));
        }
    }
    Ok(None)
}

/// Direct lookup in a single role table, for callers that already know
/// (or require) the role kind.
pub async fn resolve_role_as(
    db: &Db,
    usuario_id: i64,
    tipo: TipoUsuario,
) -> Result<Option<RoleRecord>, ApiError> {
    let record = match tipo {
        TipoUsuario::Administrador => {
            query_as::<_, Administrador>("SELECT * FROM administrador WHERE usuario_id = ?")
                .bind(usuario_id)
                .fetch_optional(db)
                .await?
                .map(RoleRecord::Administrador)
        }
        TipoUsuario::Aluno => query_as::<_, Aluno>("SELECT * FROM aluno WHERE usuario_id = ?")
            .bind(usuario_id)
            .fetch_optional(db)
            .await?
            .map(RoleRecord::Aluno),
        TipoUsuario::Tecnico => query_as::<_, Tecnico>("SELECT * FROM tecnico WHERE usuario_id = ?")
            .bind(usuario_id)
            .fetch_optional(db)
            .await?
            .map(RoleRecord::Tecnico),
        TipoUsuario::Professor => {
            query_as::<_, Professor>("SELECT * FROM professor WHERE usuario_id = ?")
                .bind(usuario_id)
                .fetch_optional(db)
                .await?
                .map(RoleRecord::Professor)
        }
    };
    Ok(record)
}

/// Registration-code probe across the staff tables only (Tecnico,
/// Administrador, Professor); student codes live in a separate scope.
pub async fn find_funcionario_by_matricula(
    db: &Db,
    matricula: &str,
) -> Result<Option<RoleRecord>, ApiError> {
    if let Some(tecnico) = query_as::<_, Tecnico>("SELECT * FROM tecnico WHERE matricula = ?")
        .bind(matricula)
        .fetch_optional(db)
        .await?
    {
        return Ok(Some(RoleRecord::Tecnico(tecnico)));
    }
    if let Some(admin) = query_as::<_, Administrador>("SELECT * FROM administrador WHERE matricula = ?")
        .bind(matricula)
        .fetch_optional(db)
        .await?
    {
        return Ok(Some(RoleRecord::Administrador(admin)));
    }
    if let Some(professor) = query_as::<_, Professor>("SELECT * FROM professor WHERE matricula = ?")
        .bind(matricula)
        .fetch_optional(db)
        .await?
    {
        return Ok(Some(RoleRecord::Professor(professor)));
    }
    Ok(None)
}
