/// Application context and dependency injection
use crate::{
    account::AccountManager,
    admin::AdminRoleManager,
    auth::TokenVerifier,
    config::ServerConfig,
    counters::CounterReconciler,
    db,
    error::{AppError, AppResult},
    publication::PublicationService,
    reactions::ReactionService,
    search::{DisabledIndex, ElasticsearchIndex, IndexNotifier, SearchIndex},
    storage::{DiskObjectStore, ObjectStore, UploadSigner},
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub storage: Arc<dyn ObjectStore>,
    pub upload_signer: UploadSigner,
    pub token_verifier: Arc<TokenVerifier>,
    pub accounts: Arc<AccountManager>,
    pub roles: Arc<AdminRoleManager>,
    pub publication: Arc<PublicationService>,
    pub reactions: Arc<ReactionService>,
    pub counters: Arc<CounterReconciler>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> AppResult<Self> {
        config.validate()?;

        Self::ensure_directories(&config).await?;

        let db = db::create_pool(&config.storage.database, db::DatabaseOptions::default()).await?;
        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        let upload_signer = UploadSigner::new(&config.storage.upload_signing_secret);
        let storage: Arc<dyn ObjectStore> = Arc::new(DiskObjectStore::new(
            config.storage.object_directory.clone(),
            config.service.public_url.clone(),
            upload_signer.clone(),
            config.storage.upload_url_ttl,
        ));

        let index: Arc<dyn SearchIndex> = if config.search.enabled {
            tracing::info!(url = %config.search.base_url, "search indexing enabled");
            Arc::new(ElasticsearchIndex::new(&config.search)?)
        } else {
            tracing::info!("search indexing disabled");
            Arc::new(DisabledIndex)
        };
        let notifier = IndexNotifier::new(index, config.search.notify_timeout);

        let roles = AdminRoleManager::new(db.clone(), config.authentication.admin_uids.clone());

        Ok(Self {
            token_verifier: Arc::new(TokenVerifier::new(&config.authentication.jwt_secret)),
            accounts: Arc::new(AccountManager::new(db.clone(), notifier.clone())),
            publication: Arc::new(PublicationService::new(
                db.clone(),
                Arc::clone(&storage),
                notifier,
                roles.clone(),
            )),
            reactions: Arc::new(ReactionService::new(db.clone(), roles.clone())),
            counters: Arc::new(CounterReconciler::new(db.clone())),
            roles: Arc::new(roles),
            config: Arc::new(config),
            db,
            storage,
            upload_signer,
        })
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> AppResult<()> {
        let dirs = [
            &config.storage.data_directory,
            &config.storage.object_directory,
        ];

        for dir in dirs {
            if !dir.exists() {
                tokio::fs::create_dir_all(dir).await.map_err(|e| {
                    AppError::Internal(format!("Failed to create directory {:?}: {}", dir, e))
                })?;
            }
        }

        Ok(())
    }
}
