pub mod alteracao;
pub mod auth;
pub mod computador;
pub mod config;
pub mod db;
pub mod error;
pub mod guard;
pub mod identity;
pub mod laboratorio;
pub mod login;
pub mod mailer;
pub mod models;
pub mod relato_problema;
pub mod status;
pub mod usuario;

use actix_web::web::{self, ServiceConfig};
use utoipa::OpenApi;

/// Mounts every route group; `main` and the integration tests share this.
pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(web::scope("/login").configure(login::configure))
        .service(web::scope("/usuarios").configure(usuario::configure))
        .service(web::scope("/computadores").configure(computador::configure))
        .service(web::scope("/laboratorios").configure(laboratorio::configure))
        .service(web::scope("/relato-problemas").configure(relato_problema::configure))
        .service(web::scope("/status").configure(status::configure))
        .service(web::scope("/alteracoes").configure(alteracao::configure));
}

#[derive(OpenApi)]
#[openapi(
    paths(
        login::login_access_token,
        login::esqueci_senha,
        login::redefinir_senha,
        login::trocar_senha,
        usuario::read_usuarios,
        usuario::post_usuario,
        usuario::create_tecnico,
        usuario::create_administrador,
        usuario::create_professor,
        usuario::create_aluno,
        laboratorio::create_laboratorio,
        laboratorio::update_laboratorio,
        laboratorio::get_laboratorios,
        laboratorio::get_laboratorio_by_id,
        computador::create_computador,
        computador::alterar_computador,
        computador::get_computadores,
        computador::get_computador_by_id,
        status::create_status,
        status::listar_status,
        status::obter_status,
        alteracao::criar_alteracao,
        alteracao::listar_alteracoes,
        alteracao::obter_alteracao,
        relato_problema::criar_relato,
        relato_problema::atualizar_relato,
        relato_problema::obter_relatos,
        relato_problema::obter_relatos_auditados,
        relato_problema::obter_relato,
    ),
    components(schemas(
        models::TipoUsuario,
        models::TipoSistemaOperacional,
        models::StatusComputador,
        models::TipoAlteracao,
        models::UsuarioPublic,
        models::UsuarioCreate,
        models::Administrador,
        models::Tecnico,
        models::Professor,
        models::Aluno,
        models::AdministradorPublic,
        models::TecnicoPublic,
        models::ProfessorPublic,
        models::AlunoPublic,
        models::AdministradorCreate,
        models::TecnicoCreate,
        models::ProfessorCreate,
        models::AlunoCreate,
        models::Laboratorio,
        models::LaboratorioCreate,
        models::LaboratorioPublic,
        models::Status,
        models::StatusCreate,
        models::Computador,
        models::ComputadorCreate,
        models::ComputadorUpdate,
        models::ComputadorPublic,
        models::HistoricoAlteracao,
        models::HistoricoAlteracaoCreate,
        models::HistoricoAlteracaoPublic,
        models::RelatoProblemaCreate,
        models::RelatoProblemaUpdate,
        models::RelatoProblemaPublic,
        models::Token,
        models::EsqueciSenha,
        models::RecuperacaoSenha,
        models::TrocaSenha,
        models::NovaSenha,
        login::LoginForm,
    ))
)]
pub struct ApiDoc;
