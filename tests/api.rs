use std::sync::{Arc, Mutex};

use actix_web::http::StatusCode;
use actix_web::test;
use actix_web::web::Data;
use actix_web::App;
use serde_json::{json, Value};
use time::Duration;

use lab_inventory_api::auth;
use lab_inventory_api::config::Settings;
use lab_inventory_api::db;
use lab_inventory_api::identity;
use lab_inventory_api::mailer::LogMailer;
use lab_inventory_api::models::AppState;
use lab_inventory_api::usuario;

// The demo fixture loaded by `init_db` on an empty database provides:
// two administrators (julio/4444, caio/3333), two technicians
// (nilton/2021, patricia/1010), two professors, one student
// (luisa/7777), one roleless user (gustavo), two statuses, three labs
// and two computers. Every user's password is their first name.

async fn test_state() -> Data<AppState> {
    let pool = db::connect_memory().await.unwrap();
    db::init_db(&pool).await.unwrap();
    Data::new(AppState {
        database: pool,
        settings: Settings::for_tests(),
        mailer: Arc::new(LogMailer),
    })
}

macro_rules! init_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data($state.clone())
                .configure(lab_inventory_api::configure),
        )
        .await
    };
}

/// Mints a token directly, skipping the login round trip.
async fn token_for(state: &Data<AppState>, email: &str) -> String {
    let usuario = usuario::get_usuario_by_email(&state.database, email)
        .await
        .unwrap()
        .unwrap();
    let record = identity::resolve_role(&state.database, usuario.id)
        .await
        .unwrap()
        .unwrap();
    auth::create_access_token(&state.settings, &usuario, record.id(), record.kind()).unwrap()
}

// --------------------------------------------------------------------------------
// Login

#[actix_web::test]
async fn login_issues_bearer_token_and_perfil_matches() {
    let state = test_state().await;
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/login/access-token")
        .set_form([("username", "luisa@exemplo.com"), ("password", "luisa")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["token_type"], "bearer");
    let token = body["access_token"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri("/usuarios/perfil")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let perfil: Value = test::read_body_json(resp).await;
    assert_eq!(perfil["matricula"], "7777");
    assert_eq!(perfil["usuario"]["email"], "luisa@exemplo.com");

    let req = test::TestRequest::post()
        .uri("/login/test-token")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let eu: Value = test::read_body_json(resp).await;
    assert_eq!(eu["email"], "luisa@exemplo.com");
    assert!(eu.get("senha_hash").is_none());
}

#[actix_web::test]
async fn login_rejects_wrong_password() {
    let state = test_state().await;
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/login/access-token")
        .set_form([("username", "luisa@exemplo.com"), ("password", "errada")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], "Email ou senha incorretos.");
}

#[actix_web::test]
async fn login_rejects_roleless_user() {
    let state = test_state().await;
    let app = init_app!(state);

    // gustavo exists in the fixture but owns no role record.
    let req = test::TestRequest::post()
        .uri("/login/access-token")
        .set_form([("username", "gustavo@exemplo.com"), ("password", "gustavo")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], "Usuário sem perfil associado.");
}

#[actix_web::test]
async fn trocar_senha_requires_current_password() {
    let state = test_state().await;
    let app = init_app!(state);
    let token = token_for(&state, "luisa@exemplo.com").await;

    let req = test::TestRequest::post()
        .uri("/login/trocar-senha")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .set_json(json!({ "senha_atual": "errada", "nova_senha": "nova-senha-123" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], "Senha atual incorreta.");

    let req = test::TestRequest::post()
        .uri("/login/trocar-senha")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .set_json(json!({ "senha_atual": "luisa", "nova_senha": "nova-senha-123" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // The old password must no longer log in; the new one must.
    let req = test::TestRequest::post()
        .uri("/login/access-token")
        .set_form([("username", "luisa@exemplo.com"), ("password", "luisa")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/login/access-token")
        .set_form([
            ("username", "luisa@exemplo.com"),
            ("password", "nova-senha-123"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn esqueci_senha_acknowledgement_never_reveals_registration() {
    let state = test_state().await;
    let app = init_app!(state);

    let mut bodies = Vec::new();
    for email in ["luisa@exemplo.com", "ninguem@exemplo.com"] {
        let req = test::TestRequest::post()
            .uri("/login/esqueci-senha")
            .set_json(json!({ "email": email }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        bodies.push(body);
    }
    assert_eq!(bodies[0], bodies[1]);
}

/// Recovery mail transport that captures deliveries instead of sending.
#[derive(Default)]
struct RecordingMailer {
    enviados: Mutex<Vec<(String, String)>>,
}

impl lab_inventory_api::mailer::RecoveryMailer for RecordingMailer {
    fn send_recovery_email(&self, destinatario: &str, link: &str) {
        self.enviados
            .lock()
            .unwrap()
            .push((destinatario.to_string(), link.to_string()));
    }
}

#[actix_web::test]
async fn esqueci_senha_mails_a_working_reset_link() {
    let pool = db::connect_memory().await.unwrap();
    db::init_db(&pool).await.unwrap();
    let mailer = Arc::new(RecordingMailer::default());
    let state = Data::new(AppState {
        database: pool,
        settings: Settings::for_tests(),
        mailer: mailer.clone(),
    });
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/login/esqueci-senha")
        .set_json(json!({ "email": "luisa@exemplo.com" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let luisa = usuario::get_usuario_by_email(&state.database, "luisa@exemplo.com")
        .await
        .unwrap()
        .unwrap();
    {
        let enviados = mailer.enviados.lock().unwrap();
        assert_eq!(enviados.len(), 1);
        let (destinatario, link) = &enviados[0];
        assert_eq!(destinatario, "luisa@exemplo.com");
        // The link points at the configured base URL and carries a token
        // that resolves back to the requesting user.
        let prefixo = "http://localhost:8000/recuperar-senha?token=";
        assert!(link.starts_with(prefixo), "link inesperado: {link}");
        let token = &link[prefixo.len()..];
        let usuario_id = auth::decode_reset_token(&state.settings, token).unwrap();
        assert_eq!(usuario_id, luisa.id);
    }

    // An unknown email produces no delivery at all.
    let req = test::TestRequest::post()
        .uri("/login/esqueci-senha")
        .set_json(json!({ "email": "ninguem@exemplo.com" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(mailer.enviados.lock().unwrap().len(), 1);
}

#[actix_web::test]
async fn redefinir_senha_resets_with_a_valid_token() {
    let state = test_state().await;
    let app = init_app!(state);

    let luisa = usuario::get_usuario_by_email(&state.database, "luisa@exemplo.com")
        .await
        .unwrap()
        .unwrap();
    let token = auth::create_reset_token(&state.settings, luisa.id).unwrap();

    let req = test::TestRequest::post()
        .uri("/login/redefinir-senha")
        .set_json(json!({ "token": token, "nova_senha": "recuperada-456" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/login/access-token")
        .set_form([
            ("username", "luisa@exemplo.com"),
            ("password", "recuperada-456"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn redefinir_senha_rejects_garbage_token() {
    let state = test_state().await;
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/login/redefinir-senha")
        .set_json(json!({ "token": "rabisco", "nova_senha": "tanto-faz" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn atualizar_senha_refuses_identical_password() {
    let state = test_state().await;
    let app = init_app!(state);

    let luisa = usuario::get_usuario_by_email(&state.database, "luisa@exemplo.com")
        .await
        .unwrap()
        .unwrap();

    let req = test::TestRequest::post()
        .uri("/login/atualizar-senha")
        .set_json(json!({ "usuario_id": luisa.id, "senha": "luisa" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], "Senha idêntica à anterior.");

    let req = test::TestRequest::post()
        .uri("/login/atualizar-senha")
        .set_json(json!({ "usuario_id": luisa.id, "senha": "outra-senha" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

// --------------------------------------------------------------------------------
// Access guard

#[actix_web::test]
async fn perfil_requires_a_bearer_token() {
    let state = test_state().await;
    let app = init_app!(state);

    let req = test::TestRequest::get().uri("/usuarios/perfil").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        resp.headers().get("WWW-Authenticate").unwrap(),
        "Bearer"
    );

    let req = test::TestRequest::get()
        .uri("/usuarios/perfil")
        .insert_header(("Authorization", "Bearer nao-e-um-jwt"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

mod guarda_de_papel {
    use super::*;
    use actix_web::{get, HttpResponse};
    use lab_inventory_api::guard::CurrentAdministrador;

    #[get("/somente-admin")]
    async fn somente_admin(admin: CurrentAdministrador) -> HttpResponse {
        HttpResponse::Ok().json(admin.0)
    }

    #[actix_web::test]
    async fn role_extractor_rejects_other_roles() {
        let state = test_state().await;
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .service(somente_admin)
                .configure(lab_inventory_api::configure),
        )
        .await;

        let admin_token = token_for(&state, "julio@exemplo.com").await;
        let req = test::TestRequest::get()
            .uri("/somente-admin")
            .insert_header(("Authorization", format!("Bearer {admin_token}")))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let admin: Value = test::read_body_json(resp).await;
        assert_eq!(admin["matricula"], "4444");

        // A technician authenticates fine but is not authorized here.
        let tecnico_token = token_for(&state, "nilton@exemplo.com").await;
        let req = test::TestRequest::get()
            .uri("/somente-admin")
            .insert_header(("Authorization", format!("Bearer {tecnico_token}")))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}

// --------------------------------------------------------------------------------
// Usuários

#[actix_web::test]
async fn post_usuario_rejects_duplicate_email() {
    let state = test_state().await;
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/usuarios/")
        .set_json(json!({
            "nome": "Outro Júlio",
            "email": "julio@exemplo.com",
            "senha": "qualquer"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body["detail"],
        "Um usuário com o email julio@exemplo.com já existe."
    );
}

#[actix_web::test]
async fn staff_matricula_is_unique_across_staff_tables() {
    let state = test_state().await;
    let app = init_app!(state);

    // "4444" already belongs to an administrator; a new technician may
    // not reuse it even though the tables differ.
    let req = test::TestRequest::post()
        .uri("/usuarios/tecnicos/")
        .set_json(json!({
            "nome": "Técnico Novo",
            "email": "novo@exemplo.com",
            "matricula": "4444",
            "administrador_id": 1
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], "Matrícula já cadastrada.");

    // Student codes live outside the staff scope, so a student may use
    // a code that collides with a technician's.
    let req = test::TestRequest::post()
        .uri("/usuarios/alunos/")
        .set_json(json!({
            "nome": "Aluno Novo",
            "email": "aluno-novo@exemplo.com",
            "senha": "aluno",
            "matricula": "2021"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn create_tecnico_requires_existing_administrador() {
    let state = test_state().await;
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/usuarios/tecnicos/")
        .set_json(json!({
            "nome": "Técnico Sem Chefe",
            "email": "sem-chefe@exemplo.com",
            "matricula": "9090",
            "administrador_id": 99
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // The failed create must not leave a roleless user behind.
    let sobra = usuario::get_usuario_by_email(&state.database, "sem-chefe@exemplo.com")
        .await
        .unwrap();
    assert!(sobra.is_none());

    let req = test::TestRequest::post()
        .uri("/usuarios/tecnicos/")
        .set_json(json!({
            "nome": "Técnico Novo",
            "email": "tecnico-novo@exemplo.com",
            "matricula": "9090",
            "administrador_id": 1
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["matricula"], "9090");
    assert_eq!(body["administrador_id"], 1);
    assert_eq!(body["usuario"]["email"], "tecnico-novo@exemplo.com");
}

#[actix_web::test]
async fn staff_listings_return_the_fixture_rows() {
    let state = test_state().await;
    let app = init_app!(state);

    for (uri, esperado) in [
        ("/usuarios/tecnicos", 2),
        ("/usuarios/administradores", 2),
        ("/usuarios/professores", 2),
    ] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let corpo: Value = test::read_body_json(resp).await;
        assert_eq!(corpo.as_array().unwrap().len(), esperado);
    }
}

#[actix_web::test]
async fn staff_listings_are_not_found_when_empty() {
    // Schema only, no fixture: every role table is empty.
    let pool = db::connect_memory().await.unwrap();
    db::create_schema(&pool).await.unwrap();
    let state = Data::new(AppState {
        database: pool,
        settings: Settings::for_tests(),
        mailer: Arc::new(LogMailer),
    });
    let app = init_app!(state);

    for uri in [
        "/usuarios/tecnicos",
        "/usuarios/administradores",
        "/usuarios/professores",
    ] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

// --------------------------------------------------------------------------------
// Laboratórios

#[actix_web::test]
async fn laboratorio_create_requires_existing_administrador() {
    let state = test_state().await;
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/laboratorios/")
        .set_json(json!({ "nome": "Lab Fantasma", "local": "STI", "administrador_id": 99 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::post()
        .uri("/laboratorios/")
        .set_json(json!({ "nome": "Lab de Redes", "local": "CCET", "administrador_id": 1 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["nome"], "Lab de Redes");
    assert_eq!(body["administrador"]["id"], 1);
    assert_eq!(body["computadores"].as_array().unwrap().len(), 0);
}

#[actix_web::test]
async fn laboratorio_update_renames_and_keeps_owner() {
    let state = test_state().await;
    let app = init_app!(state);

    let req = test::TestRequest::put()
        .uri("/laboratorios/1")
        .set_json(json!({ "nome": "Lab Renomeado", "local": "Prédio B", "administrador_id": 2 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["nome"], "Lab Renomeado");
    assert_eq!(body["local"], "Prédio B");
    // Ownership cannot be transferred through this endpoint.
    assert_eq!(body["administrador"]["id"], 1);
    // The fixture parks one computer in this lab.
    assert_eq!(body["computadores"].as_array().unwrap().len(), 1);

    let req = test::TestRequest::put()
        .uri("/laboratorios/99")
        .set_json(json!({ "nome": "x", "local": "y", "administrador_id": 1 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --------------------------------------------------------------------------------
// Status

#[actix_web::test]
async fn status_identity_is_the_nome_descricao_pair() {
    let state = test_state().await;
    let app = init_app!(state);

    // Same pair as the fixture row: conflict.
    let req = test::TestRequest::post()
        .uri("/status/")
        .set_json(json!({ "nome": "Disponível", "descricao": "Disponível" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // Same name, different description: a distinct status.
    let req = test::TestRequest::post()
        .uri("/status/")
        .set_json(json!({ "nome": "Disponível", "descricao": "Reservado para aula" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/status/Dispon%C3%ADvel/")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let lista: Value = test::read_body_json(resp).await;
    assert_eq!(lista.as_array().unwrap().len(), 2);

    let req = test::TestRequest::get()
        .uri("/status/Dispon%C3%ADvel/Reservado%20para%20aula/")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let status: Value = test::read_body_json(resp).await;
    assert_eq!(status["descricao"], "Reservado para aula");

    let req = test::TestRequest::get()
        .uri("/status/Reservado/inexistente/")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --------------------------------------------------------------------------------
// Computadores

#[actix_web::test]
async fn computador_create_resolves_lab_and_status_by_name() {
    let state = test_state().await;
    let app = init_app!(state);

    // Unknown lab: nothing is created.
    let req = test::TestRequest::post()
        .uri("/computadores/")
        .set_json(json!({
            "patrimonio": "55555",
            "hostname": "PC03",
            "marca": "Lenovo",
            "ano_aquisicao": 2023,
            "sistema_operacional": "linux",
            "data_ultima_alteracao": db::today().to_string(),
            "status_nome": "Disponível",
            "status_descricao": "Disponível",
            "laboratorio_nome": "Lab Fantasma",
            "laboratorio_local": "STI",
            "tecnico_id": 1
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get().uri("/computadores/").to_request();
    let resp = test::call_service(&app, req).await;
    let lista: Value = test::read_body_json(resp).await;
    assert_eq!(lista.as_array().unwrap().len(), 2);

    // Known name, unknown description: the (nome, descricao) pair must
    // match an existing status row.
    let req = test::TestRequest::post()
        .uri("/computadores/")
        .set_json(json!({
            "patrimonio": "55555",
            "hostname": "PC03",
            "marca": "Lenovo",
            "ano_aquisicao": 2023,
            "sistema_operacional": "linux",
            "data_ultima_alteracao": db::today().to_string(),
            "status_nome": "Disponível",
            "status_descricao": "inexistente",
            "laboratorio_nome": "Lab de Extensão 1",
            "laboratorio_local": "STI",
            "tecnico_id": 1
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::post()
        .uri("/computadores/")
        .set_json(json!({
            "patrimonio": "55555",
            "hostname": "PC03",
            "marca": "Lenovo",
            "ano_aquisicao": 2023,
            "sistema_operacional": "linux",
            "data_ultima_alteracao": db::today().to_string(),
            "status_nome": "Disponível",
            "status_descricao": "Disponível",
            "laboratorio_nome": "Lab de Extensão 1",
            "laboratorio_local": "STI",
            "tecnico_id": 1
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["patrimonio"], "55555");
    assert_eq!(body["dias_desde_alteracao"], 0);
    assert_eq!(body["status"]["nome"], "Disponível");
    assert_eq!(body["laboratorio"]["nome"], "Lab de Extensão 1");
    assert_eq!(body["tecnico"]["id"], 1);

    // Asset tags are unique.
    let req = test::TestRequest::post()
        .uri("/computadores/")
        .set_json(json!({
            "patrimonio": "55555",
            "hostname": "PC04",
            "marca": "Lenovo",
            "ano_aquisicao": 2023,
            "sistema_operacional": "linux",
            "data_ultima_alteracao": db::today().to_string(),
            "status_nome": "Disponível",
            "status_descricao": "Disponível",
            "laboratorio_nome": "Lab de Extensão 1",
            "laboratorio_local": "STI",
            "tecnico_id": 1
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn computador_read_recomputes_days_since_change() {
    let state = test_state().await;
    let app = init_app!(state);

    let tres_dias_atras = (db::today() - Duration::days(3)).to_string();
    let req = test::TestRequest::post()
        .uri("/computadores/")
        .set_json(json!({
            "patrimonio": "77777",
            "hostname": "PC05",
            "marca": "Dell",
            "ano_aquisicao": 2022,
            "sistema_operacional": "windows",
            "data_ultima_alteracao": tres_dias_atras,
            "status_nome": "Disponível",
            "status_descricao": "Disponível",
            "laboratorio_nome": "Lab de Hardware",
            "laboratorio_local": "CCET",
            "tecnico_id": 2
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let criado: Value = test::read_body_json(resp).await;
    assert_eq!(criado["dias_desde_alteracao"], 0);
    let id = criado["id"].as_i64().unwrap();

    let req = test::TestRequest::get()
        .uri(&format!("/computadores/{id}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let lido: Value = test::read_body_json(resp).await;
    assert_eq!(lido["dias_desde_alteracao"], 3);

    // The recomputed value is persisted, so the list shows it too.
    let req = test::TestRequest::get().uri("/computadores/").to_request();
    let resp = test::call_service(&app, req).await;
    let lista: Value = test::read_body_json(resp).await;
    let persistido = lista
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["id"].as_i64() == Some(id))
        .unwrap();
    assert_eq!(persistido["dias_desde_alteracao"], 3);
}

#[actix_web::test]
async fn computador_update_moves_status_and_stamps_date() {
    let state = test_state().await;
    let app = init_app!(state);

    let req = test::TestRequest::put()
        .uri("/computadores/1")
        .set_json(json!({ "status_nome": "Em manutenção", "status_descricao": "Em Manutenção" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"]["nome"], "Em manutenção");
    assert_eq!(body["data_ultima_alteracao"], db::today().to_string());

    let req = test::TestRequest::put()
        .uri("/computadores/1")
        .set_json(json!({ "status_nome": "Reservado", "status_descricao": "inexistente" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --------------------------------------------------------------------------------
// Alterações

#[actix_web::test]
async fn alteracao_create_also_moves_the_computer() {
    let state = test_state().await;
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/alteracoes/")
        .set_json(json!({
            "tipo_alteracao": "Manutenção",
            "data_alteracao": db::today().to_string(),
            "observacao": "Troca de fonte",
            "computador_id": 1,
            "tecnico_id": 1,
            "status_id": 2
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["tipo_alteracao"], "Manutenção");
    assert_eq!(body["status"]["id"], 2);
    let alteracao_id = body["id"].as_i64().unwrap();

    let req = test::TestRequest::get().uri("/computadores/1").to_request();
    let resp = test::call_service(&app, req).await;
    let computador: Value = test::read_body_json(resp).await;
    assert_eq!(computador["status"]["id"], 2);

    let req = test::TestRequest::get()
        .uri(&format!("/alteracoes/{alteracao_id}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get().uri("/alteracoes/").to_request();
    let resp = test::call_service(&app, req).await;
    let lista: Value = test::read_body_json(resp).await;
    assert_eq!(lista.as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn alteracao_create_checks_references() {
    let state = test_state().await;
    let app = init_app!(state);

    for payload in [
        json!({ "tipo_alteracao": "Cadastro", "data_alteracao": db::today().to_string(),
                "computador_id": 99, "tecnico_id": 1, "status_id": 1 }),
        json!({ "tipo_alteracao": "Cadastro", "data_alteracao": db::today().to_string(),
                "computador_id": 1, "tecnico_id": 99, "status_id": 1 }),
        json!({ "tipo_alteracao": "Cadastro", "data_alteracao": db::today().to_string(),
                "computador_id": 1, "tecnico_id": 1, "status_id": 99 }),
    ] {
        let req = test::TestRequest::post()
            .uri("/alteracoes/")
            .set_json(payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}

// --------------------------------------------------------------------------------
// Relatos de problema

#[actix_web::test]
async fn relato_starts_unaudited_and_is_audited_once() {
    let state = test_state().await;
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/relato-problemas/")
        .set_json(json!({
            "descricao": "Monitor não liga",
            "computador_id": 1,
            "usuario_id": 8
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let criado: Value = test::read_body_json(resp).await;
    assert_eq!(criado["auditada"], false);
    assert_eq!(criado["aceita"], Value::Null);
    assert_eq!(criado["tecnico"], Value::Null);
    assert_eq!(criado["data_relato"], db::today().to_string());
    assert_eq!(criado["usuario"]["email"], "luisa@exemplo.com");
    let relato_id = criado["id"].as_i64().unwrap();

    let auditoria = json!({
        "aceita": true,
        "tecnico_id": 1,
        "auditada": true,
        "data_auditada": db::today().to_string()
    });
    let req = test::TestRequest::put()
        .uri(&format!("/relato-problemas/{relato_id}"))
        .set_json(&auditoria)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let auditado: Value = test::read_body_json(resp).await;
    assert_eq!(auditado["auditada"], true);
    assert_eq!(auditado["aceita"], true);
    assert_eq!(auditado["tecnico"]["id"], 1);
    assert_eq!(auditado["data_auditada"], db::today().to_string());
    // The audit leaves the report's own fields untouched.
    assert_eq!(auditado["descricao"], "Monitor não liga");

    // A second audit is a conflict.
    let req = test::TestRequest::put()
        .uri(&format!("/relato-problemas/{relato_id}"))
        .set_json(&auditoria)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], "Relato já auditado.");
}

#[actix_web::test]
async fn relato_listings_split_by_audit_state() {
    let state = test_state().await;
    let app = init_app!(state);

    for descricao in ["Teclado com defeito", "Sem acesso à rede"] {
        let req = test::TestRequest::post()
            .uri("/relato-problemas/")
            .set_json(json!({
                "descricao": descricao,
                "computador_id": 2,
                "usuario_id": 8
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let req = test::TestRequest::put()
        .uri("/relato-problemas/1")
        .set_json(json!({
            "aceita": false,
            "tecnico_id": 2,
            "auditada": true,
            "data_auditada": db::today().to_string()
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get().uri("/relato-problemas/").to_request();
    let resp = test::call_service(&app, req).await;
    let pendentes: Value = test::read_body_json(resp).await;
    assert_eq!(pendentes.as_array().unwrap().len(), 1);
    assert_eq!(pendentes[0]["auditada"], false);

    let req = test::TestRequest::get()
        .uri("/relato-problemas/auditados")
        .to_request();
    let resp = test::call_service(&app, req).await;
    let auditados: Value = test::read_body_json(resp).await;
    assert_eq!(auditados.as_array().unwrap().len(), 1);
    assert_eq!(auditados[0]["auditada"], true);
    assert_eq!(auditados[0]["aceita"], false);
}

#[actix_web::test]
async fn relato_create_checks_computer_and_user() {
    let state = test_state().await;
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/relato-problemas/")
        .set_json(json!({ "descricao": "x", "computador_id": 99, "usuario_id": 8 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::post()
        .uri("/relato-problemas/")
        .set_json(json!({ "descricao": "x", "computador_id": 1, "usuario_id": 99 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn relato_with_dangling_tecnico_reference_is_not_found() {
    let state = test_state().await;
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/relato-problemas/")
        .set_json(json!({ "descricao": "x", "computador_id": 1, "usuario_id": 8 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let criado: Value = test::read_body_json(resp).await;
    let relato_id = criado["id"].as_i64().unwrap();

    // Corrupt the row so it points at a technician that does not exist.
    // The single-connection pool keeps the pragma in effect.
    sqlx::query("PRAGMA foreign_keys = OFF")
        .execute(&state.database)
        .await
        .unwrap();
    sqlx::query("UPDATE relato_problema SET tecnico_id = 99 WHERE id = ?")
        .bind(relato_id)
        .execute(&state.database)
        .await
        .unwrap();

    let req = test::TestRequest::get()
        .uri(&format!("/relato-problemas/{relato_id}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], "Técnico não encontrado");
}
