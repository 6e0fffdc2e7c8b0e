// ABOUTME: End-to-end tests for tenant context resolution through the data plane
// ABOUTME: Control-plane lookup, credential opening, migration gate and pooled handle
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use common::{
    init_test_logging, sqlite_dsn, temp_dir, test_config, write_migrations, ControlPlane,
};
use std::sync::Arc;
use tempfile::TempDir;
use tenant_dataplane::context::DataPlane;
use tenant_dataplane::database_plugins::DataPlaneProvider;
use tenant_dataplane::errors::{AppError, ErrorCategory};
use tenant_dataplane::migrations::MigrationState;
use tenant_dataplane::models::{TenantId, TenantIdentity};
use tenant_dataplane::tenant::{AuthenticatedPrincipal, TenantRole};
use uuid::Uuid;

const SCHEMA: &[(&str, &str)] = &[
    (
        "0001_members.sql",
        "CREATE TABLE members (id TEXT PRIMARY KEY, email TEXT NOT NULL);",
    ),
    (
        "0002_reports.sql",
        "CREATE TABLE reports (id TEXT PRIMARY KEY, title TEXT NOT NULL);",
    ),
];

struct Fixture {
    dir: TempDir,
    control_plane: ControlPlane,
    data_plane: DataPlane,
}

async fn fixture(auto_migrate: bool) -> Fixture {
    init_test_logging();
    let dir = temp_dir();
    let migrations = write_migrations(dir.path(), SCHEMA);
    let control_plane = ControlPlane::create(dir.path()).await;
    let config = test_config(&control_plane, &migrations).with_auto_migrate(auto_migrate);
    let data_plane = DataPlane::connect(&config).await.unwrap();
    Fixture {
        dir,
        control_plane,
        data_plane,
    }
}

fn principal(tenant: TenantIdentity) -> AuthenticatedPrincipal {
    AuthenticatedPrincipal::new(tenant, Uuid::new_v4(), TenantRole::Admin)
}

async fn table_names(
    handle: &tenant_dataplane::database_plugins::factory::Database,
) -> Vec<String> {
    sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name IN ('members', 'reports') ORDER BY name",
    )
    .fetch_all(handle.sqlite_pool().unwrap())
    .await
    .unwrap()
}

#[tokio::test]
async fn test_resolve_by_slug_returns_migrated_handle() {
    let fx = fixture(true).await;
    let tenant_dsn = sqlite_dsn(fx.dir.path(), "tenant_acme");
    let tenant = fx.control_plane.provision("acme", &tenant_dsn).await;
    let caller = principal(TenantIdentity::Slug("acme".into()));

    let context = fx.data_plane.resolve(&caller).await.unwrap();

    assert_eq!(context.tenant, tenant);
    assert_eq!(context.principal_id, caller.principal_id);
    assert_eq!(context.role, TenantRole::Admin);
    assert_eq!(table_names(&context.handle).await, vec!["members", "reports"]);
    let ledger = context.handle.applied_migrations().await.unwrap();
    assert_eq!(ledger.len(), 2);
    assert_eq!(
        fx.data_plane.coordinator().state(&tenant_dsn).unwrap(),
        MigrationState::Migrated
    );

    fx.data_plane.shutdown().await;
}

#[tokio::test]
async fn test_resolve_by_id_reuses_cached_handle() {
    let fx = fixture(true).await;
    let tenant = fx
        .control_plane
        .provision("globex", &sqlite_dsn(fx.dir.path(), "tenant_globex"))
        .await;

    let by_id = fx
        .data_plane
        .resolve(&principal(TenantIdentity::Id(tenant.id)))
        .await
        .unwrap();
    let by_slug = fx
        .data_plane
        .resolve(&principal(TenantIdentity::Slug("globex".into())))
        .await
        .unwrap();

    assert!(Arc::ptr_eq(&by_id.handle, &by_slug.handle));
    assert_eq!(fx.data_plane.cache().len(), 1);
}

#[tokio::test]
async fn test_tenants_get_isolated_databases() {
    let fx = fixture(true).await;
    fx.control_plane
        .provision("acme", &sqlite_dsn(fx.dir.path(), "tenant_acme"))
        .await;
    fx.control_plane
        .provision("globex", &sqlite_dsn(fx.dir.path(), "tenant_globex"))
        .await;

    let acme = fx
        .data_plane
        .resolve(&principal(TenantIdentity::Slug("acme".into())))
        .await
        .unwrap();
    let globex = fx
        .data_plane
        .resolve(&principal(TenantIdentity::Slug("globex".into())))
        .await
        .unwrap();

    assert!(!Arc::ptr_eq(&acme.handle, &globex.handle));
    sqlx::query("INSERT INTO members (id, email) VALUES ('m1', 'a@acme.test')")
        .execute(acme.handle.sqlite_pool().unwrap())
        .await
        .unwrap();
    let globex_members: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM members")
        .fetch_one(globex.handle.sqlite_pool().unwrap())
        .await
        .unwrap();
    assert_eq!(globex_members, 0);
}

#[tokio::test]
async fn test_unknown_tenant_is_not_found() {
    let fx = fixture(true).await;

    let by_slug = fx
        .data_plane
        .resolve(&principal(TenantIdentity::Slug("nobody".into())))
        .await
        .unwrap_err();
    let by_id = fx
        .data_plane
        .resolve(&principal(TenantIdentity::Id(TenantId::new())))
        .await
        .unwrap_err();

    assert_eq!(by_slug, AppError::not_found("Tenant"));
    assert_eq!(by_id.category(), ErrorCategory::NotFound);
    assert!(fx.data_plane.cache().is_empty());
}

#[tokio::test]
async fn test_tenant_without_credential_is_not_found() {
    let fx = fixture(true).await;
    fx.control_plane.insert_tenant("pending").await;

    let err = fx
        .data_plane
        .resolve(&principal(TenantIdentity::Slug("pending".into())))
        .await
        .unwrap_err();

    assert_eq!(err, AppError::not_found("Tenant credential"));
}

#[tokio::test]
async fn test_invalid_slug_is_rejected_before_lookup() {
    let fx = fixture(true).await;

    let err = fx
        .data_plane
        .resolve(&principal(TenantIdentity::Slug("acme'; DROP TABLE tenants;--".into())))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InvalidInput(_)));
}

#[tokio::test]
async fn test_tampered_credential_fails_authentication() {
    let fx = fixture(true).await;
    let tenant = fx.control_plane.insert_tenant("mallory").await;
    let sealed = tenant_dataplane::security::SecretCipher::encrypt(
        &common::test_key(),
        &format!("sqlite:{}", fx.dir.path().join("tenant_mallory.db").display()),
    )
    .unwrap();
    let mut segments: Vec<String> = sealed.split('.').map(str::to_owned).collect();
    // swap the tag for a valid-length but wrong one
    segments[2] = "AAAAAAAAAAAAAAAAAAAAAA==".to_owned();
    fx.control_plane
        .insert_ciphertext(&tenant, &segments.join("."))
        .await;

    let err = fx
        .data_plane
        .resolve(&principal(TenantIdentity::Slug("mallory".into())))
        .await
        .unwrap_err();

    assert_eq!(err, AppError::AuthenticationFailure);
    assert!(fx.data_plane.cache().is_empty(), "no handle for a failed resolution");
}

#[tokio::test]
async fn test_malformed_credential_is_invalid_payload() {
    let fx = fixture(true).await;
    let tenant = fx.control_plane.insert_tenant("broken").await;
    fx.control_plane
        .insert_ciphertext(&tenant, "only.two")
        .await;

    let err = fx
        .data_plane
        .resolve(&principal(TenantIdentity::Slug("broken".into())))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InvalidPayloadFormat(_)));
}

#[tokio::test]
async fn test_failed_migration_blocks_context() {
    init_test_logging();
    let dir = temp_dir();
    let migrations = write_migrations(
        dir.path(),
        &[
            ("0001_ok.sql", "CREATE TABLE ok (id INTEGER);"),
            ("0002_bad.sql", "INSERT INTO missing VALUES (1);"),
        ],
    );
    let control_plane = ControlPlane::create(dir.path()).await;
    let tenant_dsn = sqlite_dsn(dir.path(), "tenant_acme");
    control_plane.provision("acme", &tenant_dsn).await;
    let data_plane = DataPlane::connect(&test_config(&control_plane, &migrations))
        .await
        .unwrap();

    let err = data_plane
        .resolve(&principal(TenantIdentity::Slug("acme".into())))
        .await
        .unwrap_err();

    assert!(
        matches!(err, AppError::MigrationApplyFailed { ref file, .. } if file == "0002_bad.sql")
    );
    assert_eq!(
        data_plane.coordinator().state(&tenant_dsn).unwrap(),
        MigrationState::Unknown
    );

    // fixed file: the next resolution retries and succeeds
    std::fs::write(migrations.join("0002_bad.sql"), "CREATE TABLE fixed (id INTEGER);").unwrap();
    let context = data_plane
        .resolve(&principal(TenantIdentity::Slug("acme".into())))
        .await
        .unwrap();
    let ledger = context.handle.applied_migrations().await.unwrap();
    assert_eq!(ledger.len(), 2);
}

#[tokio::test]
async fn test_auto_migrate_disabled_skips_schema() {
    let fx = fixture(false).await;
    fx.control_plane
        .provision("acme", &sqlite_dsn(fx.dir.path(), "tenant_acme"))
        .await;

    let context = fx
        .data_plane
        .resolve(&principal(TenantIdentity::Slug("acme".into())))
        .await
        .unwrap();

    assert!(table_names(&context.handle).await.is_empty());
    assert!(!fx.data_plane.coordinator().is_enabled());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_resolutions_migrate_once() {
    let fx = Arc::new(fixture(true).await);
    fx.control_plane
        .provision("acme", &sqlite_dsn(fx.dir.path(), "tenant_acme"))
        .await;

    let handles = (0..8).map(|_| {
        let fx = Arc::clone(&fx);
        tokio::spawn(async move {
            fx.data_plane
                .resolve(&principal(TenantIdentity::Slug("acme".into())))
                .await
        })
    });
    let contexts: Vec<_> = futures_util::future::join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    let ledger = contexts[0].handle.applied_migrations().await.unwrap();
    assert_eq!(ledger.len(), 2);
    assert!(contexts
        .windows(2)
        .all(|pair| Arc::ptr_eq(&pair[0].handle, &pair[1].handle)));
}
