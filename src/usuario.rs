use actix_web::web::{Data, Json};
use actix_web::{get, post, HttpResponse};
use sqlx::{query_as, Sqlite, Transaction};

use crate::auth::{generate_random_password, hash_password};
use crate::error::ApiError;
use crate::guard::CurrentUsuario;
use crate::identity::{find_funcionario_by_matricula, resolve_role, RoleRecord};
use crate::models::{
    Administrador, AdministradorCreate, AdministradorPublic, Aluno, AlunoCreate, AlunoPublic,
    AppState, Db, PerfilPublic, Professor, ProfessorCreate, ProfessorPublic, Tecnico,
    TecnicoCreate, TecnicoPublic, TipoUsuario, Usuario, UsuarioCreate, UsuarioPublic,
};

// --------------------------------------------------------------------------------
// Repository helpers

pub async fn get_usuario_by_email(db: &Db, email: &str) -> Result<Option<Usuario>, ApiError> {
    let usuario = query_as::<_, Usuario>("SELECT * FROM usuario WHERE email = ?")
        .bind(email)
        .fetch_optional(db)
        .await?;
    Ok(usuario)
}

pub async fn get_usuario(db: &Db, usuario_id: i64) -> Result<Option<Usuario>, ApiError> {
    let usuario = query_as::<_, Usuario>("SELECT * FROM usuario WHERE id = ?")
        .bind(usuario_id)
        .fetch_optional(db)
        .await?;
    Ok(usuario)
}

pub async fn usuario_public(db: &Db, usuario_id: i64) -> Result<UsuarioPublic, ApiError> {
    get_usuario(db, usuario_id)
        .await?
        .map(UsuarioPublic::from)
        .ok_or_else(|| ApiError::NotFound("Usuário não encontrado".to_string()))
}

async fn check_email_disponivel(db: &Db, email: &str) -> Result<(), ApiError> {
    if get_usuario_by_email(db, email).await?.is_some() {
        return Err(ApiError::Conflict(format!(
            "Um usuário com o email {email} já existe."
        )));
    }
    Ok(())
}

async fn check_matricula_disponivel(db: &Db, matricula: &str) -> Result<(), ApiError> {
    if find_funcionario_by_matricula(db, matricula).await?.is_some() {
        return Err(ApiError::Conflict("Matrícula já cadastrada.".to_string()));
    }
    Ok(())
}

async fn insert_usuario(
    tx: &mut Transaction<'_, Sqlite>,
    nome: &str,
    email: &str,
    senha: Option<&str>,
) -> Result<Usuario, ApiError> {
    let senha_hash = match senha {
        Some(senha) => Some(hash_password(senha)?),
        None => None,
    };
    let usuario = query_as::<_, Usuario>(
        "INSERT INTO usuario (nome, email, senha_hash) VALUES (?, ?, ?) RETURNING *",
    )
    .bind(nome)
    .bind(email)
    .bind(senha_hash)
    .fetch_one(&mut *tx)
    .await?;
    Ok(usuario)
}

struct FuncionarioSpec<'a> {
    tipo: TipoUsuario,
    nome: &'a str,
    email: &'a str,
    matricula: &'a str,
    administrador_id: Option<i64>,
}

/// Creates the user row and its staff role row in one transaction, so a
/// failed create never leaves a roleless user behind. Staff accounts get
/// a random generated password and recover a real one by email.
async fn create_funcionario(
    db: &Db,
    spec: FuncionarioSpec<'_>,
) -> Result<(RoleRecord, UsuarioPublic), ApiError> {
    check_matricula_disponivel(db, spec.matricula).await?;
    check_email_disponivel(db, spec.email).await?;
    if let Some(administrador_id) = spec.administrador_id {
        if !is_administrador_present(db, administrador_id).await? {
            return Err(ApiError::NotFound("Administrador não encontrado".to_string()));
        }
    }

    let senha = generate_random_password(8);
    let mut tx = db.begin().await?;
    let usuario = insert_usuario(&mut tx, spec.nome, spec.email, Some(&senha)).await?;

    let record = match spec.tipo {
        TipoUsuario::Administrador => {
            let admin = query_as::<_, Administrador>(
                "INSERT INTO administrador (matricula, usuario_id) VALUES (?, ?) RETURNING *",
            )
            .bind(spec.matricula)
            .bind(usuario.id)
            .fetch_one(&mut *tx)
            .await?;
            RoleRecord::Administrador(admin)
        }
        TipoUsuario::Tecnico => {
            let tecnico = query_as::<_, Tecnico>(
                "INSERT INTO tecnico (matricula, usuario_id, administrador_id) VALUES (?, ?, ?) RETURNING *",
            )
            .bind(spec.matricula)
            .bind(usuario.id)
            .bind(spec.administrador_id)
            .fetch_one(&mut *tx)
            .await?;
            RoleRecord::Tecnico(tecnico)
        }
        TipoUsuario::Professor => {
            let professor = query_as::<_, Professor>(
                "INSERT INTO professor (matricula, usuario_id, administrador_id) VALUES (?, ?, ?) RETURNING *",
            )
            .bind(spec.matricula)
            .bind(usuario.id)
            .bind(spec.administrador_id)
            .fetch_one(&mut *tx)
            .await?;
            RoleRecord::Professor(professor)
        }
        TipoUsuario::Aluno => {
            return Err(ApiError::Internal("aluno não é funcionário".to_string()));
        }
    };
    tx.commit().await?;

    Ok((record, UsuarioPublic::from(usuario)))
}

pub async fn is_administrador_present(db: &Db, administrador_id: i64) -> Result<bool, ApiError> {
    let admin = query_as::<_, Administrador>("SELECT * FROM administrador WHERE id = ?")
        .bind(administrador_id)
        .fetch_optional(db)
        .await?;
    Ok(admin.is_some())
}

pub async fn get_tecnico(db: &Db, tecnico_id: i64) -> Result<Option<Tecnico>, ApiError> {
    let tecnico = query_as::<_, Tecnico>("SELECT * FROM tecnico WHERE id = ?")
        .bind(tecnico_id)
        .fetch_optional(db)
        .await?;
    Ok(tecnico)
}

pub async fn perfil_public(db: &Db, record: RoleRecord) -> Result<PerfilPublic, ApiError> {
    let perfil = match record {
        RoleRecord::Administrador(a) => {
            let usuario = usuario_public(db, a.usuario_id).await?;
            PerfilPublic::Administrador(AdministradorPublic {
                id: a.id,
                matricula: a.matricula,
                usuario,
            })
        }
        RoleRecord::Aluno(a) => {
            let usuario = usuario_public(db, a.usuario_id).await?;
            PerfilPublic::Aluno(AlunoPublic {
                id: a.id,
                matricula: a.matricula,
                usuario,
            })
        }
        RoleRecord::Tecnico(t) => {
            let usuario = usuario_public(db, t.usuario_id).await?;
            PerfilPublic::Tecnico(TecnicoPublic {
                id: t.id,
                matricula: t.matricula,
                administrador_id: t.administrador_id,
                usuario,
            })
        }
        RoleRecord::Professor(p) => {
            let usuario = usuario_public(db, p.usuario_id).await?;
            PerfilPublic::Professor(ProfessorPublic {
                id: p.id,
                matricula: p.matricula,
                administrador_id: p.administrador_id,
                usuario,
            })
        }
    };
    Ok(perfil)
}

// --------------------------------------------------------------------------------
// Handlers

#[utoipa::path(
    context_path = "/usuarios",
    responses(
        (status = 200, description = "Lists every registered user", body = Vec<UsuarioPublic>),
        (status = 500, description = "An internal server error occurred")
    )
)]
#[get("/")]
pub async fn read_usuarios(data: Data<AppState>) -> Result<HttpResponse, ApiError> {
    let usuarios = query_as::<_, Usuario>("SELECT * FROM usuario")
        .fetch_all(&data.database)
        .await?;
    let publics: Vec<UsuarioPublic> = usuarios.into_iter().map(UsuarioPublic::from).collect();
    Ok(HttpResponse::Ok().json(publics))
}

#[utoipa::path(
    context_path = "/usuarios",
    request_body = UsuarioCreate,
    responses(
        (status = 200, description = "The created user", body = UsuarioPublic),
        (status = 409, description = "A user with this email already exists"),
        (status = 500, description = "An internal server error occurred")
    )
)]
#[post("/")]
pub async fn post_usuario(
    data: Data<AppState>,
    Json(usuario): Json<UsuarioCreate>,
) -> Result<HttpResponse, ApiError> {
    check_email_disponivel(&data.database, &usuario.email).await?;
    let mut tx = data.database.begin().await?;
    let criado = insert_usuario(&mut tx, &usuario.nome, &usuario.email, usuario.senha.as_deref()).await?;
    tx.commit().await?;
    Ok(HttpResponse::Ok().json(UsuarioPublic::from(criado)))
}

/// Returns the caller's role-specific profile, resolved via the fixed
/// probe order.
#[get("/perfil")]
pub async fn read_usuario_perfil(
    data: Data<AppState>,
    current: CurrentUsuario,
) -> Result<HttpResponse, ApiError> {
    let record = resolve_role(&data.database, current.0.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Perfil não encontrado".to_string()))?;
    let perfil = perfil_public(&data.database, record).await?;
    Ok(HttpResponse::Ok().json(perfil))
}

#[utoipa::path(
    context_path = "/usuarios",
    request_body = TecnicoCreate,
    responses(
        (status = 200, description = "The created technician", body = TecnicoPublic),
        (status = 404, description = "The managing administrator was not found"),
        (status = 409, description = "Duplicate email or registration code"),
        (status = 500, description = "An internal server error occurred")
    )
)]
#[post("/tecnicos/")]
pub async fn create_tecnico(
    data: Data<AppState>,
    Json(tecnico): Json<TecnicoCreate>,
) -> Result<HttpResponse, ApiError> {
    let (record, usuario) = create_funcionario(
        &data.database,
        FuncionarioSpec {
            tipo: TipoUsuario::Tecnico,
            nome: &tecnico.nome,
            email: &tecnico.email,
            matricula: &tecnico.matricula,
            administrador_id: Some(tecnico.administrador_id),
        },
    )
    .await?;
    match record {
        RoleRecord::Tecnico(t) => Ok(HttpResponse::Ok().json(TecnicoPublic {
            id: t.id,
            matricula: t.matricula,
            administrador_id: t.administrador_id,
            usuario,
        })),
        _ => Err(ApiError::Internal("papel inesperado".to_string())),
    }
}

#[utoipa::path(
    context_path = "/usuarios",
    request_body = AdministradorCreate,
    responses(
        (status = 200, description = "The created administrator", body = AdministradorPublic),
        (status = 409, description = "Duplicate email or registration code"),
        (status = 500, description = "An internal server error occurred")
    )
)]
#[post("/administradores/")]
pub async fn create_administrador(
    data: Data<AppState>,
    Json(administrador): Json<AdministradorCreate>,
) -> Result<HttpResponse, ApiError> {
    let (record, usuario) = create_funcionario(
        &data.database,
        FuncionarioSpec {
            tipo: TipoUsuario::Administrador,
            nome: &administrador.nome,
            email: &administrador.email,
            matricula: &administrador.matricula,
            administrador_id: None,
        },
    )
    .await?;
    match record {
        RoleRecord::Administrador(a) => Ok(HttpResponse::Ok().json(AdministradorPublic {
            id: a.id,
            matricula: a.matricula,
            usuario,
        })),
        _ => Err(ApiError::Internal("papel inesperado".to_string())),
    }
}

#[utoipa::path(
    context_path = "/usuarios",
    request_body = ProfessorCreate,
    responses(
        (status = 200, description = "The created professor", body = ProfessorPublic),
        (status = 404, description = "The managing administrator was not found"),
        (status = 409, description = "Duplicate email or registration code"),
        (status = 500, description = "An internal server error occurred")
    )
)]
#[post("/professores/")]
pub async fn create_professor(
    data: Data<AppState>,
    Json(professor): Json<ProfessorCreate>,
) -> Result<HttpResponse, ApiError> {
    let (record, usuario) = create_funcionario(
        &data.database,
        FuncionarioSpec {
            tipo: TipoUsuario::Professor,
            nome: &professor.nome,
            email: &professor.email,
            matricula: &professor.matricula,
            administrador_id: Some(professor.administrador_id),
        },
    )
    .await?;
    match record {
        RoleRecord::Professor(p) => Ok(HttpResponse::Ok().json(ProfessorPublic {
            id: p.id,
            matricula: p.matricula,
            administrador_id: p.administrador_id,
            usuario,
        })),
        _ => Err(ApiError::Internal("papel inesperado".to_string())),
    }
}

/// Students keep the password they sign up with; their registration code
/// lives outside the staff uniqueness scope.
#[utoipa::path(
    context_path = "/usuarios",
    request_body = AlunoCreate,
    responses(
        (status = 200, description = "The created student", body = AlunoPublic),
        (status = 409, description = "A user with this email already exists"),
        (status = 500, description = "An internal server error occurred")
    )
)]
#[post("/alunos/")]
pub async fn create_aluno(
    data: Data<AppState>,
    Json(aluno): Json<AlunoCreate>,
) -> Result<HttpResponse, ApiError> {
    check_email_disponivel(&data.database, &aluno.email).await?;

    let mut tx = data.database.begin().await?;
    let usuario = insert_usuario(&mut tx, &aluno.nome, &aluno.email, aluno.senha.as_deref()).await?;
    let aluno_db = query_as::<_, Aluno>(
        "INSERT INTO aluno (matricula, usuario_id) VALUES (?, ?) RETURNING *",
    )
    .bind(&aluno.matricula)
    .bind(usuario.id)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    Ok(HttpResponse::Ok().json(AlunoPublic {
        id: aluno_db.id,
        matricula: aluno_db.matricula,
        usuario: UsuarioPublic::from(usuario),
    }))
}

#[get("/tecnicos")]
pub async fn get_tecnicos(data: Data<AppState>) -> Result<HttpResponse, ApiError> {
    let tecnicos = query_as::<_, Tecnico>("SELECT * FROM tecnico")
        .fetch_all(&data.database)
        .await?;
    if tecnicos.is_empty() {
        return Err(ApiError::NotFound("Nenhum técnico encontrado.".to_string()));
    }
    let mut publics = Vec::with_capacity(tecnicos.len());
    for t in tecnicos {
        publics.push(TecnicoPublic {
            id: t.id,
            matricula: t.matricula,
            administrador_id: t.administrador_id,
            usuario: usuario_public(&data.database, t.usuario_id).await?,
        });
    }
    Ok(HttpResponse::Ok().json(publics))
}

#[get("/administradores")]
pub async fn get_administradores(data: Data<AppState>) -> Result<HttpResponse, ApiError> {
    let administradores = query_as::<_, Administrador>("SELECT * FROM administrador")
        .fetch_all(&data.database)
        .await?;
    if administradores.is_empty() {
        return Err(ApiError::NotFound("Nenhum administrador encontrado.".to_string()));
    }
    let mut publics = Vec::with_capacity(administradores.len());
    for a in administradores {
        publics.push(AdministradorPublic {
            id: a.id,
            matricula: a.matricula,
            usuario: usuario_public(&data.database, a.usuario_id).await?,
        });
    }
    Ok(HttpResponse::Ok().json(publics))
}

#[get("/professores")]
pub async fn get_professores(data: Data<AppState>) -> Result<HttpResponse, ApiError> {
    let professores = query_as::<_, Professor>("SELECT * FROM professor")
        .fetch_all(&data.database)
        .await?;
    if professores.is_empty() {
        return Err(ApiError::NotFound("Nenhum professor encontrado.".to_string()));
    }
    let mut publics = Vec::with_capacity(professores.len());
    for p in professores {
        publics.push(ProfessorPublic {
            id: p.id,
            matricula: p.matricula,
            administrador_id: p.administrador_id,
            usuario: usuario_public(&data.database, p.usuario_id).await?,
        });
    }
    Ok(HttpResponse::Ok().json(publics))
}

pub fn configure(cfg: &mut actix_web::web::ServiceConfig) {
    cfg.service(read_usuarios)
        .service(post_usuario)
        .service(read_usuario_perfil)
        .service(create_tecnico)
        .service(create_administrador)
        .service(create_professor)
        .service(create_aluno)
        .service(get_tecnicos)
        .service(get_administradores)
        .service(get_professores);
}
