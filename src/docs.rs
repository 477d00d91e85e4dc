// src/docs.rs

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::login,
        handlers::auth::profile,

        // --- Users ---
        handlers::users::list_users,
        handlers::users::get_user,
        handlers::users::create_user,
        handlers::users::update_user,
        handlers::users::delete_user,

        // --- Clients ---
        handlers::clients::list_clients,
        handlers::clients::create_client,
        handlers::clients::update_client,
        handlers::clients::delete_client,

        // --- Products / estoque / receita ---
        handlers::products::list_products,
        handlers::products::list_raw_materials,
        handlers::products::create_product,
        handlers::products::update_product,
        handlers::products::delete_product,
        handlers::products::get_recipe,
        handlers::products::save_recipe,
        handlers::products::add_stock,
        handlers::products::reduce_stock,
        handlers::products::stock_history,

        // --- Orders ---
        handlers::orders::list_orders,
        handlers::orders::create_order,
        handlers::orders::get_order,
        handlers::orders::update_order,
        handlers::orders::order_timeline,
        handlers::orders::update_item_status,
        handlers::orders::update_item,
        handlers::orders::delete_item,

        // --- Workflow (bancadas) ---
        handlers::workflow::design_queue,
        handlers::workflow::start_design,
        handlers::workflow::finish_design,
        handlers::workflow::cancel_design,
        handlers::workflow::job_queue,
        handlers::workflow::start_job,
        handlers::workflow::finish_job,
        handlers::workflow::cancel_job,
        handlers::workflow::add_production_material,
        handlers::workflow::list_production_materials,

        // --- Notifications ---
        handlers::notifications::list_notifications,
        handlers::notifications::unread_count,
        handlers::notifications::mark_read,
        handlers::notifications::mark_all_read,
        handlers::notifications::delete_notification,
        handlers::notifications::send_notification,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::Role,
            models::auth::User,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,
            models::auth::CreateUserPayload,
            models::auth::UpdateUserPayload,

            // --- Clients ---
            models::clients::Client,
            models::clients::CreateClientPayload,
            models::clients::UpdateClientPayload,

            // --- Inventory ---
            models::inventory::ProductType,
            models::inventory::MovementDirection,
            models::inventory::Product,
            models::inventory::StockMovement,
            models::inventory::RecipeEntry,
            models::inventory::RecipeEntryDetail,
            models::inventory::ProductionMaterialDetail,

            // --- Orders ---
            models::orders::ItemStatus,
            models::orders::PaymentStatus,
            models::orders::Order,
            models::orders::OrderItem,
            models::orders::OrderItemDetail,
            models::orders::OrderSummary,
            models::orders::OrderDetail,
            models::orders::HistoryEntry,
            models::orders::ProductionQueueItem,
            models::orders::NewOrderItemInput,
            models::orders::CreateOrderPayload,
            models::orders::UpdateOrderPayload,
            models::orders::UpdateOrderItemPayload,
            models::orders::UpdateItemStatusPayload,
            models::orders::ClaimItemPayload,

            // --- Notifications ---
            models::notifications::Notification,

            // --- Payloads dos handlers ---
            handlers::products::CreateProductPayload,
            handlers::products::UpdateProductPayload,
            handlers::products::RecipeEntryInput,
            handlers::products::SaveRecipePayload,
            handlers::products::StockAdjustPayload,
            handlers::workflow::AddMaterialPayload,
            handlers::notifications::SendNotificationPayload,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação e perfil"),
        (name = "Users", description = "Gestão de usuários e papéis"),
        (name = "Clients", description = "Cadastro de clientes"),
        (name = "Products", description = "Catálogo, receitas e estoque"),
        (name = "Orders", description = "Pedidos (invoice + itens) e histórico"),
        (name = "Workflow", description = "Filas de desenho e impressão"),
        (name = "Notifications", description = "Caixa de entrada por papel")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}
