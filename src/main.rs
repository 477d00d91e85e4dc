//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// Declaração dos nossos módulos
mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

// Importações principais
use crate::config::AppState;
use crate::middleware::auth::auth_guard;

#[tokio::main]
async fn main() {
    // Inicializa o logger, que movemos para o main.
    tracing_subscriber::fmt().with_target(false).compact().init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    // Roda as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Owner inicial a partir das variáveis ADMIN_* (somente no primeiro boot).
    app_state
        .bootstrap_owner()
        .await
        .expect("Falha ao criar o owner inicial.");

    // Cada domínio tem o seu router; todos passam pelo auth_guard.
    let user_routes = Router::new()
        .route(
            "/",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route(
            "/{id}",
            get(handlers::users::get_user)
                .put(handlers::users::update_user)
                .delete(handlers::users::delete_user),
        );

    let client_routes = Router::new()
        .route(
            "/",
            get(handlers::clients::list_clients).post(handlers::clients::create_client),
        )
        .route(
            "/{id}",
            put(handlers::clients::update_client).delete(handlers::clients::delete_client),
        );

    let product_routes = Router::new()
        .route(
            "/",
            get(handlers::products::list_products).post(handlers::products::create_product),
        )
        .route("/raw-materials", get(handlers::products::list_raw_materials))
        .route("/recipe", post(handlers::products::save_recipe))
        .route("/recipe/{product_id}", get(handlers::products::get_recipe))
        .route(
            "/{id}",
            put(handlers::products::update_product).delete(handlers::products::delete_product),
        )
        .route("/{id}/stock/add", post(handlers::products::add_stock))
        .route("/{id}/stock/reduce", post(handlers::products::reduce_stock))
        .route("/{id}/stock/history", get(handlers::products::stock_history));

    let order_routes = Router::new()
        .route(
            "/",
            get(handlers::orders::list_orders).post(handlers::orders::create_order),
        )
        .route(
            "/{id}",
            get(handlers::orders::get_order).put(handlers::orders::update_order),
        )
        .route("/{id}/timeline", get(handlers::orders::order_timeline));

    let order_item_routes = Router::new()
        .route(
            "/{id}",
            put(handlers::orders::update_item).delete(handlers::orders::delete_item),
        )
        .route("/{id}/status", put(handlers::orders::update_item_status));

    let design_routes = Router::new()
        .route("/", get(handlers::workflow::design_queue))
        .route("/kerjakan", post(handlers::workflow::start_design))
        .route("/kirim/{item_id}", post(handlers::workflow::finish_design))
        .route("/batal/{item_id}", delete(handlers::workflow::cancel_design));

    let operator_routes = Router::new()
        .route("/jobs", get(handlers::workflow::job_queue))
        .route("/kerjakan", post(handlers::workflow::start_job))
        .route("/kirim/{item_id}", post(handlers::workflow::finish_job))
        .route("/batal/{item_id}", delete(handlers::workflow::cancel_job))
        .route(
            "/{item_id}/materials",
            get(handlers::workflow::list_production_materials)
                .post(handlers::workflow::add_production_material),
        );

    let notification_routes = Router::new()
        .route("/", get(handlers::notifications::list_notifications))
        .route(
            "/unread-count",
            get(handlers::notifications::unread_count),
        )
        .route("/read-all", put(handlers::notifications::mark_all_read))
        .route("/send", post(handlers::notifications::send_notification))
        .route(
            "/{id}",
            delete(handlers::notifications::delete_notification),
        )
        .route("/{id}/read", put(handlers::notifications::mark_read));

    let protected_routes = Router::new()
        .route("/api/auth/profile", get(handlers::auth::profile))
        .nest("/api/users", user_routes)
        .nest("/api/clients", client_routes)
        .nest("/api/products", product_routes)
        .nest("/api/orders", order_routes)
        .nest("/api/order-items", order_item_routes)
        .nest("/api/designs", design_routes)
        .nest("/api/operator", operator_routes)
        .nest("/api/notifications", notification_routes)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Combina tudo no router principal
    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/auth/login", post(handlers::auth::login))
        .merge(protected_routes)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
        .with_state(app_state);

    // Inicia o servidor
    let addr = "0.0.0.0:3000";
    let listener = TcpListener::bind(addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr().unwrap());
    axum::serve(listener, app)
        .await
        .expect("Erro no servidor Axum");
}
