//! End-to-end store tests. These need a real Postgres; point DATABASE_URL at
//! an empty database and run `cargo test -- --ignored`. The embedded
//! migrator brings the schema up first.

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use chrono::{Duration, Utc};
use ghcrm_api::handlers;
use ghcrm_api::handlers::auth::{generate_jwt, Claims};
use ghcrm_api::middlewares::auth::Auth;
use ghcrm_api::models::project::ProjectError;
use ghcrm_api::models::user::user_dao::{IUser, UserInsertError};
use ghcrm_api::persisters::project::{ProjectById, ProjectCreate, ProjectList, ProjectSync};
use ghcrm_api::persisters::{Persist, Query};
use ghcrm_api::state::{AppStateRaw, PoolOptions, State};

use sqlx::types::Uuid;
use std::sync::Arc;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

fn default_env(key: &str, value: &str) {
    if std::env::var(key).is_err() {
        std::env::set_var(key, value);
    }
}

async fn pg_state() -> AppStateRaw {
    // Only DATABASE_URL has to be real; the rest just satisfies config.
    default_env("PORT", "8080");
    default_env("JWT_SECRET", "pg-test-secret");
    default_env("GH_CLIENT_ID", "test-client-id");
    default_env("GH_CLIENT_SECRET", "test-client-secret");

    let config = ghcrm_api::config::Config::parse_from_env();
    let db_conn = PoolOptions::new()
        .connect(&config.database_url)
        .await
        .expect("could not connect to DATABASE_URL");

    MIGRATOR.run(&db_conn).await.expect("migrations failed");

    Arc::new(State { config, db_conn })
}

fn auth_for(user_id: Uuid) -> Auth {
    Auth {
        claims: Claims {
            sub: user_id,
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
            gh: None,
        },
    }
}

async fn create_user(state: &AppStateRaw) -> Uuid {
    let db = &state;
    db.insert_credentials(
        &format!("{}@example.com", Uuid::new_v4()),
        "$2b$12$not.a.real.hash",
    )
    .await
    .expect("could not create test user")
}

fn sample_project(owner: &str, name: &str) -> ProjectCreate {
    ProjectCreate {
        owner: owner.to_string(),
        name: name.to_string(),
        url: format!("https://github.com/{}/{}", owner, name),
        stars: 10,
        forks: 2,
        issues: 1,
        gh_id: 42,
        description: Some("a test repository".to_string()),
        language: Some("Rust".to_string()),
    }
}

#[actix_rt::test]
#[ignore]
async fn duplicate_email_registration_conflicts() {
    let state = pg_state().await;
    let db = &state;

    let email = format!("{}@example.com", Uuid::new_v4());
    db.insert_credentials(&email, "hash-one").await.unwrap();

    let res = db.insert_credentials(&email, "hash-two").await;
    assert!(matches!(res, Err(UserInsertError::AlreadyExists)));
}

#[actix_rt::test]
#[ignore]
async fn repo_pair_is_unique_per_user_only() {
    let state = pg_state().await;

    let alice = create_user(&state).await;
    let bob = create_user(&state).await;

    sample_project("rust-lang", "rust")
        .persist(Some(&auth_for(alice)), &state)
        .await
        .unwrap();

    // Same repo, same user: conflict.
    let dup = sample_project("rust-lang", "rust")
        .persist(Some(&auth_for(alice)), &state)
        .await;
    assert!(matches!(dup, Err(ProjectError::AlreadyAdded)));

    // Same repo, different user: fine.
    sample_project("rust-lang", "rust")
        .persist(Some(&auth_for(bob)), &state)
        .await
        .unwrap();
}

#[actix_rt::test]
#[ignore]
async fn sync_overwrites_stats_and_refreshes_updated_at() {
    let state = pg_state().await;
    let user = create_user(&state).await;
    let auth = auth_for(user);

    let project = sample_project("rust-lang", "cargo")
        .persist(Some(&auth), &state)
        .await
        .unwrap();

    actix_rt::time::sleep(std::time::Duration::from_millis(50)).await;

    let updated = ProjectSync {
        id: project.id,
        stars: 999,
        forks: 100,
        issues: 7,
        description: None,
        language: Some("Rust".to_string()),
    }
    .persist(Some(&auth), &state)
    .await
    .unwrap();

    assert_eq!(updated.stars, 999);
    assert_eq!(updated.forks, 100);
    assert_eq!(updated.issues, 7);
    assert!(updated.description.is_none());
    assert!(updated.updated_at > project.updated_at);
    assert_eq!(updated.created_at, project.created_at);
}

#[actix_rt::test]
#[ignore]
async fn sync_is_scoped_to_the_owner() {
    let state = pg_state().await;

    let alice = create_user(&state).await;
    let bob = create_user(&state).await;

    let project = sample_project("rust-lang", "rustup")
        .persist(Some(&auth_for(alice)), &state)
        .await
        .unwrap();

    let res = ProjectSync {
        id: project.id,
        stars: 0,
        forks: 0,
        issues: 0,
        description: None,
        language: None,
    }
    .persist(Some(&auth_for(bob)), &state)
    .await;

    assert!(matches!(res, Err(ProjectError::NotFound)));

    // Untouched.
    let fresh = ProjectById(project.id)
        .fetch(Some(&auth_for(alice)), &state)
        .await
        .unwrap();
    assert_eq!(fresh.stars, project.stars);
}

#[actix_rt::test]
#[ignore]
async fn delete_endpoint_forbids_non_owner() {
    let state = pg_state().await;

    let alice = create_user(&state).await;
    let bob = create_user(&state).await;

    let project = sample_project("tokio-rs", "tokio")
        .persist(Some(&auth_for(alice)), &state)
        .await
        .unwrap();

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .service(web::scope("/api/projects").configure(handlers::project::init)),
    )
    .await;

    let secret = state.config.jwt_secret.as_bytes();
    let alice_token = generate_jwt(alice, None, secret).unwrap();
    let bob_token = generate_jwt(bob, None, secret).unwrap();

    let req = test::TestRequest::delete()
        .uri(&format!("/api/projects/{}", project.id))
        .insert_header(("Authorization", format!("Bearer {}", bob_token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/projects/{}", project.id))
        .insert_header(("Authorization", format!("Bearer {}", alice_token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let gone = ProjectById(project.id)
        .fetch(Some(&auth_for(alice)), &state)
        .await;
    assert!(matches!(gone, Err(ProjectError::NotFound)));
}

#[actix_rt::test]
#[ignore]
async fn deleting_a_user_cascades_to_their_projects() {
    let state = pg_state().await;
    let user = create_user(&state).await;
    let auth = auth_for(user);

    sample_project("serde-rs", "serde")
        .persist(Some(&auth), &state)
        .await
        .unwrap();
    sample_project("serde-rs", "json")
        .persist(Some(&auth), &state)
        .await
        .unwrap();

    let db = &state;
    let removed = db.delete_user(&user).await.unwrap();
    assert_eq!(removed, 1);

    let left = ProjectList.fetch(Some(&auth), &state).await.unwrap();
    assert!(left.is_empty());
}
