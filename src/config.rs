// src/config.rs

use std::sync::Arc;
use std::{env, time::Duration};

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{
        ClientRepository, NotificationRepository, OrderRepository, ProductRepository,
        UserRepository,
    },
    services::{
        AuthService, DbNotifier, InventoryService, Notifier, OrderService, WorkflowService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt_secret: String,
    pub auth_service: AuthService,
    pub user_repo: UserRepository,
    pub client_repo: ClientRepository,
    pub product_repo: ProductRepository,
    pub notification_repo: NotificationRepository,
    pub inventory_service: InventoryService,
    pub order_service: OrderService,
    pub workflow_service: WorkflowService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL deve ser definida");
        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET deve ser definido");

        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let user_repo = UserRepository::new(db_pool.clone());
        let client_repo = ClientRepository::new(db_pool.clone());
        let product_repo = ProductRepository::new(db_pool.clone());
        let order_repo = OrderRepository::new(db_pool.clone());
        let notification_repo = NotificationRepository::new(db_pool.clone());

        let auth_service = AuthService::new(user_repo.clone(), jwt_secret.clone());
        let notifier: Arc<dyn Notifier> = Arc::new(DbNotifier::new(notification_repo.clone()));
        let inventory_service = InventoryService::new(db_pool.clone(), product_repo.clone());
        let order_service = OrderService::new(
            db_pool.clone(),
            order_repo.clone(),
            client_repo.clone(),
            product_repo.clone(),
            user_repo.clone(),
            notifier.clone(),
        );
        let workflow_service = WorkflowService::new(
            db_pool.clone(),
            order_repo,
            product_repo.clone(),
            inventory_service.clone(),
            notifier,
        );

        Ok(Self {
            db_pool,
            jwt_secret,
            auth_service,
            user_repo,
            client_repo,
            product_repo,
            notification_repo,
            inventory_service,
            order_service,
            workflow_service,
        })
    }

    // Primeiro boot: se nenhum owner existir e as variáveis ADMIN_* estiverem
    // definidas, cria a conta inicial. Chamado DEPOIS das migrações.
    pub async fn bootstrap_owner(&self) -> anyhow::Result<()> {
        let (Ok(username), Ok(password)) =
            (env::var("ADMIN_USERNAME"), env::var("ADMIN_PASSWORD"))
        else {
            return Ok(());
        };
        let full_name = env::var("ADMIN_FULL_NAME").unwrap_or_else(|_| username.clone());

        self.auth_service
            .ensure_bootstrap_owner(&username, &full_name, &password)
            .await?;
        Ok(())
    }
}
