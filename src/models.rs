use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Pool, Sqlite, Type};
use time::Date;
use utoipa::ToSchema;

use crate::config::Settings;
use crate::mailer::RecoveryMailer;

pub type Db = Pool<Sqlite>;

#[derive(Clone)]
pub struct AppState {
    pub database: Db,
    pub settings: Settings,
    pub mailer: Arc<dyn RecoveryMailer>,
}

// --------------------------------------------------------------------------------
// Enums

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TipoUsuario {
    Aluno,
    Professor,
    Administrador,
    Tecnico,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type, ToSchema)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum TipoSistemaOperacional {
    Macos,
    Linux,
    Windows,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type, ToSchema)]
pub enum StatusComputador {
    #[serde(rename = "Disponível")]
    #[sqlx(rename = "Disponível")]
    Disponivel,
    #[serde(rename = "Em manutenção")]
    #[sqlx(rename = "Em manutenção")]
    EmManutencao,
    Reservado,
    Desativado,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type, ToSchema)]
pub enum TipoAlteracao {
    Cadastro,
    #[serde(rename = "Manutenção")]
    #[sqlx(rename = "Manutenção")]
    Manutencao,
    #[serde(rename = "Alteração")]
    #[sqlx(rename = "Alteração")]
    Alteracao,
    #[serde(rename = "Exclusão")]
    #[sqlx(rename = "Exclusão")]
    Exclusao,
}

// --------------------------------------------------------------------------------
// Usuário

#[derive(Debug, Clone, FromRow)]
pub struct Usuario {
    pub id: i64,
    pub nome: String,
    pub email: String,
    pub senha_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UsuarioPublic {
    pub id: i64,
    pub nome: String,
    pub email: String,
}

impl From<Usuario> for UsuarioPublic {
    fn from(usuario: Usuario) -> Self {
        UsuarioPublic {
            id: usuario.id,
            nome: usuario.nome,
            email: usuario.email,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UsuarioCreate {
    pub nome: String,
    pub email: String,
    pub senha: Option<String>,
}

// --------------------------------------------------------------------------------
// Papéis (Administrador, Técnico, Professor, Aluno)

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Administrador {
    pub id: i64,
    pub matricula: String,
    pub usuario_id: i64,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Tecnico {
    pub id: i64,
    pub matricula: String,
    pub usuario_id: i64,
    pub administrador_id: i64,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Professor {
    pub id: i64,
    pub matricula: String,
    pub usuario_id: i64,
    pub administrador_id: i64,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Aluno {
    pub id: i64,
    pub matricula: String,
    pub usuario_id: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AdministradorPublic {
    pub id: i64,
    pub matricula: String,
    pub usuario: UsuarioPublic,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TecnicoPublic {
    pub id: i64,
    pub matricula: String,
    pub administrador_id: i64,
    pub usuario: UsuarioPublic,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProfessorPublic {
    pub id: i64,
    pub matricula: String,
    pub administrador_id: i64,
    pub usuario: UsuarioPublic,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AlunoPublic {
    pub id: i64,
    pub matricula: String,
    pub usuario: UsuarioPublic,
}

/// Projection returned by `/usuarios/perfil`, shaped by the caller's role.
#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum PerfilPublic {
    Administrador(AdministradorPublic),
    Aluno(AlunoPublic),
    Tecnico(TecnicoPublic),
    Professor(ProfessorPublic),
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdministradorCreate {
    pub nome: String,
    pub email: String,
    pub senha: Option<String>,
    pub matricula: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TecnicoCreate {
    pub nome: String,
    pub email: String,
    pub senha: Option<String>,
    pub matricula: String,
    pub administrador_id: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProfessorCreate {
    pub nome: String,
    pub email: String,
    pub senha: Option<String>,
    pub matricula: String,
    pub administrador_id: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AlunoCreate {
    pub nome: String,
    pub email: String,
    pub senha: Option<String>,
    pub matricula: String,
}

// --------------------------------------------------------------------------------
// Laboratório

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Laboratorio {
    pub id: i64,
    pub nome: String,
    pub local: String,
    pub administrador_id: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LaboratorioCreate {
    pub nome: String,
    pub local: String,
    pub administrador_id: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LaboratorioPublic {
    pub id: i64,
    pub nome: String,
    pub local: String,
    pub computadores: Vec<Computador>,
    pub administrador: Administrador,
}

// --------------------------------------------------------------------------------
// Status

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Status {
    pub id: i64,
    pub nome: StatusComputador,
    pub descricao: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusCreate {
    pub nome: StatusComputador,
    pub descricao: String,
}

// --------------------------------------------------------------------------------
// Computador

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Computador {
    pub id: i64,
    pub patrimonio: String,
    pub hostname: String,
    pub marca: String,
    pub ano_aquisicao: i64,
    pub sistema_operacional: TipoSistemaOperacional,
    pub data_ultima_alteracao: Date,
    pub dias_desde_alteracao: i64,
    pub status_id: i64,
    pub laboratorio_id: i64,
    pub tecnico_id: i64,
}

/// Creation payload: the lab is named by (nome, local) and the status by
/// (nome, descricao), both of which must already exist.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ComputadorCreate {
    pub patrimonio: String,
    pub hostname: String,
    pub marca: String,
    pub ano_aquisicao: i64,
    pub sistema_operacional: TipoSistemaOperacional,
    pub data_ultima_alteracao: Date,
    pub status_nome: StatusComputador,
    pub status_descricao: String,
    pub laboratorio_nome: String,
    pub laboratorio_local: String,
    pub tecnico_id: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ComputadorUpdate {
    pub status_nome: StatusComputador,
    pub status_descricao: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ComputadorPublic {
    pub id: i64,
    pub patrimonio: String,
    pub hostname: String,
    pub marca: String,
    pub ano_aquisicao: i64,
    pub sistema_operacional: TipoSistemaOperacional,
    pub data_ultima_alteracao: Date,
    pub dias_desde_alteracao: i64,
    pub status: Status,
    pub laboratorio: Laboratorio,
    pub tecnico: Tecnico,
}

// --------------------------------------------------------------------------------
// Histórico de alteração

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct HistoricoAlteracao {
    pub id: i64,
    pub tipo_alteracao: TipoAlteracao,
    pub data_alteracao: Date,
    pub observacao: Option<String>,
    pub computador_id: i64,
    pub tecnico_id: i64,
    pub status_id: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct HistoricoAlteracaoCreate {
    pub tipo_alteracao: TipoAlteracao,
    pub data_alteracao: Date,
    pub observacao: Option<String>,
    pub computador_id: i64,
    pub tecnico_id: i64,
    pub status_id: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HistoricoAlteracaoPublic {
    pub id: i64,
    pub tipo_alteracao: TipoAlteracao,
    pub data_alteracao: Date,
    pub observacao: Option<String>,
    pub computador: Computador,
    pub tecnico: Tecnico,
    pub status: Status,
}

// --------------------------------------------------------------------------------
// Relato de problema

#[derive(Debug, Clone, FromRow)]
pub struct RelatoProblema {
    pub id: i64,
    pub data_relato: Date,
    pub usuario_id: i64,
    pub descricao: Option<String>,
    pub computador_id: i64,
    pub tecnico_id: Option<i64>,
    pub auditada: bool,
    pub aceita: Option<bool>,
    pub data_auditada: Option<Date>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RelatoProblemaCreate {
    pub descricao: Option<String>,
    pub computador_id: i64,
    pub usuario_id: i64,
    pub data_relato: Option<Date>,
}

/// Audit update: the only operation allowed to mutate a report.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RelatoProblemaUpdate {
    pub aceita: bool,
    pub tecnico_id: i64,
    pub auditada: bool,
    pub data_auditada: Date,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RelatoProblemaPublic {
    pub id: i64,
    pub data_relato: Date,
    pub descricao: Option<String>,
    pub auditada: bool,
    pub aceita: Option<bool>,
    pub data_auditada: Option<Date>,
    pub computador: Computador,
    pub usuario: UsuarioPublic,
    pub tecnico: Option<Tecnico>,
}

// --------------------------------------------------------------------------------
// Auth

/// Payload JSON contendo o access token.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
}

impl Token {
    pub fn bearer(access_token: String) -> Self {
        Token {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPayload {
    pub sub: i64,
    pub id_especifico: i64,
    pub email: String,
    pub tipo_usuario: TipoUsuario,
    pub nome: String,
    pub exp: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NovaSenha {
    pub usuario_id: i64,
    pub senha: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EsqueciSenha {
    pub email: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecuperacaoSenha {
    pub nova_senha: String,
    pub token: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TrocaSenha {
    pub senha_atual: String,
    pub nova_senha: String,
}
