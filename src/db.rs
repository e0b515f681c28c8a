//! Schema creation and first-run seed data.

use log::info;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{query, query_scalar};
use time::{Date, OffsetDateTime};

use crate::auth::hash_password;
use crate::error::ApiError;
use crate::models::Db;

pub fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

pub async fn connect(database_url: &str) -> Result<Db, sqlx::Error> {
    SqlitePoolOptions::new().connect(database_url).await
}

/// Single-connection in-memory database. SQLite gives every connection
/// its own `:memory:` store, so the pool must not grow past one.
pub async fn connect_memory() -> Result<Db, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
}

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS usuario (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        nome TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        senha_hash TEXT
    )",
    "CREATE TABLE IF NOT EXISTS administrador (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        matricula TEXT NOT NULL,
        usuario_id INTEGER NOT NULL UNIQUE REFERENCES usuario(id)
    )",
    "CREATE TABLE IF NOT EXISTS tecnico (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        matricula TEXT NOT NULL,
        usuario_id INTEGER NOT NULL UNIQUE REFERENCES usuario(id),
        administrador_id INTEGER NOT NULL REFERENCES administrador(id)
    )",
    "CREATE TABLE IF NOT EXISTS professor (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        matricula TEXT NOT NULL,
        usuario_id INTEGER NOT NULL UNIQUE REFERENCES usuario(id),
        administrador_id INTEGER NOT NULL REFERENCES administrador(id)
    )",
    "CREATE TABLE IF NOT EXISTS aluno (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        matricula TEXT NOT NULL,
        usuario_id INTEGER NOT NULL UNIQUE REFERENCES usuario(id)
    )",
    "CREATE TABLE IF NOT EXISTS laboratorio (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        nome TEXT NOT NULL,
        local TEXT NOT NULL,
        administrador_id INTEGER NOT NULL REFERENCES administrador(id)
    )",
    "CREATE TABLE IF NOT EXISTS status (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        nome TEXT NOT NULL,
        descricao TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS computador (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        patrimonio TEXT NOT NULL UNIQUE,
        hostname TEXT NOT NULL,
        marca TEXT NOT NULL,
        ano_aquisicao INTEGER NOT NULL,
        sistema_operacional TEXT NOT NULL,
        data_ultima_alteracao DATE NOT NULL,
        dias_desde_alteracao INTEGER NOT NULL DEFAULT 0,
        status_id INTEGER NOT NULL REFERENCES status(id),
        laboratorio_id INTEGER NOT NULL REFERENCES laboratorio(id),
        tecnico_id INTEGER NOT NULL REFERENCES tecnico(id)
    )",
    "CREATE TABLE IF NOT EXISTS historico_alteracao (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        tipo_alteracao TEXT NOT NULL,
        data_alteracao DATE NOT NULL,
        observacao TEXT,
        computador_id INTEGER NOT NULL REFERENCES computador(id),
        tecnico_id INTEGER NOT NULL REFERENCES tecnico(id),
        status_id INTEGER NOT NULL REFERENCES status(id)
    )",
    "CREATE TABLE IF NOT EXISTS relato_problema (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        data_relato DATE NOT NULL,
        usuario_id INTEGER NOT NULL REFERENCES usuario(id),
        descricao TEXT,
        computador_id INTEGER NOT NULL REFERENCES computador(id),
        tecnico_id INTEGER REFERENCES tecnico(id),
        auditada BOOLEAN NOT NULL DEFAULT FALSE,
        aceita BOOLEAN,
        data_auditada DATE
    )",
];

/// Creates every table; idempotent.
pub async fn create_schema(db: &Db) -> Result<(), ApiError> {
    for statement in SCHEMA {
        query(statement).execute(db).await?;
    }
    Ok(())
}

/// Creates the schema and, on an empty database, loads the demo fixture.
pub async fn init_db(db: &Db) -> Result<(), ApiError> {
    create_schema(db).await?;

    let computadores: i64 = query_scalar("SELECT COUNT(id) FROM computador")
        .fetch_one(db)
        .await?;
    if computadores == 0 {
        populate_db(db).await?;
        info!("database seeded with demo fixture");
    }
    Ok(())
}

async fn insert_usuario(db: &Db, nome: &str, email: &str, senha: &str) -> Result<i64, ApiError> {
    let senha_hash = hash_password(senha)?;
    let id = query_scalar("INSERT INTO usuario (nome, email, senha_hash) VALUES (?, ?, ?) RETURNING id")
        .bind(nome)
        .bind(email)
        .bind(senha_hash)
        .fetch_one(db)
        .await?;
    Ok(id)
}

async fn insert_papel(
    db: &Db,
    tabela: &str,
    matricula: &str,
    usuario_id: i64,
    administrador_id: Option<i64>,
) -> Result<i64, ApiError> {
    let id = match administrador_id {
        Some(admin_id) => {
            let sql = format!(
                "INSERT INTO {tabela} (matricula, usuario_id, administrador_id) VALUES (?, ?, ?) RETURNING id"
            );
            query_scalar(&sql)
                .bind(matricula)
                .bind(usuario_id)
                .bind(admin_id)
                .fetch_one(db)
                .await?
        }
        None => {
            let sql = format!("INSERT INTO {tabela} (matricula, usuario_id) VALUES (?, ?) RETURNING id");
            query_scalar(&sql)
                .bind(matricula)
                .bind(usuario_id)
                .fetch_one(db)
                .await?
        }
    };
    Ok(id)
}

/// Demo fixture: two administrators, two technicians, two professors, one
/// student, three labs, two statuses and two computers.
async fn populate_db(db: &Db) -> Result<(), ApiError> {
    let rodolfo = insert_usuario(db, "Rodolfo Botto", "rodolfo@exemplo.com", "rodolfo").await?;
    let ivone = insert_usuario(db, "Ivone Lara", "ivone@exemplo.com", "ivone").await?;
    let patricia = insert_usuario(db, "Patrícia Menezes", "patricia@exemplo.com", "patricia").await?;
    let nilton = insert_usuario(db, "José Nilton", "nilton@exemplo.com", "nilton").await?;
    let julio = insert_usuario(db, "Júlio César", "julio@exemplo.com", "julio").await?;
    let caio = insert_usuario(db, "Caio Conceição", "caio@exemplo.com", "caio").await?;
    insert_usuario(db, "Gustavo Paiva", "gustavo@exemplo.com", "gustavo").await?;
    let luisa = insert_usuario(db, "Luísa Mahin", "luisa@exemplo.com", "luisa").await?;

    let admin_1 = insert_papel(db, "administrador", "4444", julio, None).await?;
    let admin_2 = insert_papel(db, "administrador", "3333", caio, None).await?;
    let tecnico_1 = insert_papel(db, "tecnico", "2021", nilton, Some(admin_1)).await?;
    let tecnico_2 = insert_papel(db, "tecnico", "1010", patricia, Some(admin_2)).await?;
    insert_papel(db, "professor", "8964", rodolfo, Some(admin_1)).await?;
    insert_papel(db, "professor", "5252", ivone, Some(admin_2)).await?;
    insert_papel(db, "aluno", "7777", luisa, None).await?;

    let disponivel: i64 =
        query_scalar("INSERT INTO status (nome, descricao) VALUES ('Disponível', 'Disponível') RETURNING id")
            .fetch_one(db)
            .await?;
    let em_manutencao: i64 = query_scalar(
        "INSERT INTO status (nome, descricao) VALUES ('Em manutenção', 'Em Manutenção') RETURNING id",
    )
    .fetch_one(db)
    .await?;

    let mut laboratorios = Vec::new();
    for (nome, local, admin_id) in [
        ("Lab de Extensão 1", "STI", admin_1),
        ("Lab de Hardware", "CCET", admin_1),
        ("Lab de Extensão 2", "STI", admin_2),
    ] {
        let id: i64 = query_scalar(
            "INSERT INTO laboratorio (nome, local, administrador_id) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(nome)
        .bind(local)
        .bind(admin_id)
        .fetch_one(db)
        .await?;
        laboratorios.push(id);
    }

    let hoje = today();
    for (patrimonio, hostname, marca, ano, so, status_id, lab_id, tecnico_id) in [
        ("12345", "PC01", "Dell", 2020, "windows", disponivel, laboratorios[0], tecnico_1),
        ("67890", "PC02", "HP", 2019, "linux", em_manutencao, laboratorios[1], tecnico_2),
    ] {
        query(
            "INSERT INTO computador
                (patrimonio, hostname, marca, ano_aquisicao, sistema_operacional,
                 data_ultima_alteracao, dias_desde_alteracao, status_id, laboratorio_id, tecnico_id)
             VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?, ?)",
        )
        .bind(patrimonio)
        .bind(hostname)
        .bind(marca)
        .bind(ano)
        .bind(so)
        .bind(hoje)
        .bind(status_id)
        .bind(lab_id)
        .bind(tecnico_id)
        .execute(db)
        .await?;
    }

    Ok(())
}
