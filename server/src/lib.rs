use axum::{
    middleware as axum_mw,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use cache::Cache;
use config::Config;
use middleware::rate_limit::RateLimiter;
use services::stripe_service::StripeClient;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub cache: Option<Cache>,
    pub config: Arc<Config>,
    pub stripe: Option<StripeClient>,
    pub rate_limiter: RateLimiter,
    pub login_rate_limiter: RateLimiter,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // --- Auth routes (login/refresh issue the session cookies) ---
    let auth_routes = Router::new()
        .route(
            "/login",
            post(routes::auth::login).layer(axum_mw::from_fn_with_state(
                state.clone(),
                middleware::rate_limit::login_rate_limit,
            )),
        )
        .route("/logout", post(routes::auth::logout))
        .route("/refresh", post(routes::auth::refresh))
        .route(
            "/me",
            get(routes::auth::me).layer(axum_mw::from_fn_with_state(
                state.clone(),
                middleware::auth::authenticate,
            )),
        )
        .route(
            "/register",
            post(routes::auth::register)
                .layer(axum_mw::from_fn_with_state(
                    state.clone(),
                    middleware::role::require_admin,
                ))
                .layer(axum_mw::from_fn_with_state(
                    state.clone(),
                    middleware::auth::authenticate,
                )),
        );

    // --- Webhook routes (raw body, no auth) ---
    let webhook_routes = Router::new().route("/stripe", post(routes::webhooks::stripe_webhook));

    // Reads are open to any session; mutating methods carry the admin layer.
    let client_routes = Router::new()
        .route(
            "/",
            post(routes::clients::create_client)
                .layer(axum_mw::from_fn_with_state(
                    state.clone(),
                    middleware::role::require_admin,
                ))
                .get(routes::clients::list_clients),
        )
        .route(
            "/:id",
            put(routes::clients::update_client)
                .delete(routes::clients::delete_client)
                .layer(axum_mw::from_fn_with_state(
                    state.clone(),
                    middleware::role::require_admin,
                ))
                .get(routes::clients::get_client),
        )
        .route("/:id/licenses", get(routes::clients::get_client_licenses))
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate,
        ));

    let product_routes = Router::new()
        .route(
            "/",
            post(routes::products::create_product)
                .layer(axum_mw::from_fn_with_state(
                    state.clone(),
                    middleware::role::require_admin,
                ))
                .get(routes::products::list_products),
        )
        .route(
            "/:id",
            put(routes::products::update_product)
                .delete(routes::products::delete_product)
                .layer(axum_mw::from_fn_with_state(
                    state.clone(),
                    middleware::role::require_admin,
                ))
                .get(routes::products::get_product),
        )
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate,
        ));

    let license_routes = Router::new()
        .route(
            "/",
            post(routes::licenses::create_license)
                .layer(axum_mw::from_fn_with_state(
                    state.clone(),
                    middleware::role::require_admin,
                ))
                .get(routes::licenses::list_licenses),
        )
        .route(
            "/:id",
            put(routes::licenses::update_license)
                .delete(routes::licenses::delete_license)
                .layer(axum_mw::from_fn_with_state(
                    state.clone(),
                    middleware::role::require_admin,
                ))
                .get(routes::licenses::get_license),
        )
        .route("/:id/full", get(routes::licenses::get_license_full))
        .route(
            "/:id/status",
            put(routes::licenses::update_license_status).layer(axum_mw::from_fn_with_state(
                state.clone(),
                middleware::role::require_admin,
            )),
        )
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate,
        ));

    let customer_routes = Router::new()
        .route("/", get(routes::customers::list_customers))
        .route(
            "/crear",
            post(routes::customers::create_customer).layer(axum_mw::from_fn_with_state(
                state.clone(),
                middleware::role::require_admin,
            )),
        )
        .route("/stats", get(routes::customers::customer_stats))
        .route(
            "/import",
            post(routes::customers::import_customers).layer(axum_mw::from_fn_with_state(
                state.clone(),
                middleware::role::require_admin,
            )),
        )
        .route(
            "/:id",
            put(routes::customers::update_customer)
                .delete(routes::customers::delete_customer)
                .layer(axum_mw::from_fn_with_state(
                    state.clone(),
                    middleware::role::require_admin,
                ))
                .get(routes::customers::get_customer),
        )
        .route("/:id/tags", get(routes::customers::get_customer_tags))
        .route(
            "/:id/tags/:tag_id",
            post(routes::customers::add_customer_tag)
                .delete(routes::customers::remove_customer_tag)
                .layer(axum_mw::from_fn_with_state(
                    state.clone(),
                    middleware::role::require_admin,
                )),
        )
        .route(
            "/:id/interactions",
            post(routes::customers::create_customer_interaction)
                .layer(axum_mw::from_fn_with_state(
                    state.clone(),
                    middleware::role::require_admin,
                ))
                .get(routes::customers::get_customer_interactions),
        )
        .route(
            "/:id/opportunities",
            get(routes::customers::get_customer_opportunities),
        )
        .route("/:id/tasks", get(routes::customers::get_customer_tasks))
        .route(
            "/:id/score",
            put(routes::customers::update_customer_score).layer(axum_mw::from_fn_with_state(
                state.clone(),
                middleware::role::require_admin,
            )),
        )
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate,
        ));

    let tag_routes = Router::new()
        .route(
            "/",
            post(routes::tags::create_tag)
                .layer(axum_mw::from_fn_with_state(
                    state.clone(),
                    middleware::role::require_admin,
                ))
                .get(routes::tags::list_tags),
        )
        .route(
            "/:id",
            put(routes::tags::update_tag)
                .delete(routes::tags::delete_tag)
                .layer(axum_mw::from_fn_with_state(
                    state.clone(),
                    middleware::role::require_admin,
                )),
        )
        .route("/:id/contacts", get(routes::tags::get_tag_contacts))
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate,
        ));

    let opportunity_routes = Router::new()
        .route("/metrics", get(routes::opportunities::opportunity_metrics))
        .route("/board", get(routes::opportunities::pipeline_board))
        .route(
            "/",
            post(routes::opportunities::create_opportunity)
                .layer(axum_mw::from_fn_with_state(
                    state.clone(),
                    middleware::role::require_admin,
                ))
                .get(routes::opportunities::list_opportunities),
        )
        .route(
            "/:id",
            put(routes::opportunities::update_opportunity)
                .delete(routes::opportunities::delete_opportunity)
                .layer(axum_mw::from_fn_with_state(
                    state.clone(),
                    middleware::role::require_admin,
                ))
                .get(routes::opportunities::get_opportunity),
        )
        .route(
            "/:id/stage",
            put(routes::opportunities::move_opportunity_stage).layer(
                axum_mw::from_fn_with_state(state.clone(), middleware::role::require_admin),
            ),
        )
        .route(
            "/:id/won",
            post(routes::opportunities::mark_opportunity_won).layer(
                axum_mw::from_fn_with_state(state.clone(), middleware::role::require_admin),
            ),
        )
        .route(
            "/:id/lost",
            post(routes::opportunities::mark_opportunity_lost).layer(
                axum_mw::from_fn_with_state(state.clone(), middleware::role::require_admin),
            ),
        )
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate,
        ));

    let task_routes = Router::new()
        .route("/pending", get(routes::tasks::pending_tasks))
        .route("/overdue", get(routes::tasks::overdue_tasks))
        .route("/today", get(routes::tasks::today_tasks))
        .route("/stats", get(routes::tasks::task_stats))
        .route(
            "/",
            post(routes::tasks::create_task)
                .layer(axum_mw::from_fn_with_state(
                    state.clone(),
                    middleware::role::require_admin,
                ))
                .get(routes::tasks::list_tasks),
        )
        .route(
            "/:id",
            put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task)
                .layer(axum_mw::from_fn_with_state(
                    state.clone(),
                    middleware::role::require_admin,
                ))
                .get(routes::tasks::get_task),
        )
        .route(
            "/:id/complete",
            post(routes::tasks::complete_task).layer(axum_mw::from_fn_with_state(
                state.clone(),
                middleware::role::require_admin,
            )),
        )
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate,
        ));

    let dashboard_routes = Router::new()
        .route("/dashboard/stats", get(routes::dashboard::dashboard_stats))
        .route("/sales/data", get(routes::dashboard::sales_data))
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate,
        ));

    // Creating a checkout session touches Stripe, not our rows; cancelling
    // a subscription deactivates the license, so only that one is admin.
    let billing_routes = Router::new()
        .route("/create-checkout", post(routes::billing::create_checkout))
        .route("/session/:id", get(routes::billing::get_checkout_session))
        .route(
            "/subscriptions/:id/cancel",
            post(routes::billing::cancel_subscription).layer(axum_mw::from_fn_with_state(
                state.clone(),
                middleware::role::require_admin,
            )),
        )
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate,
        ));

    // --- Compose full API ---
    let api = Router::new()
        .nest("/auth", auth_routes)
        .nest("/clients", client_routes)
        .nest("/products", product_routes)
        .nest("/licenses", license_routes)
        .nest("/customers", customer_routes)
        .nest("/tags", tag_routes)
        .nest("/opportunities", opportunity_routes)
        .nest("/tasks", task_routes)
        .nest("/stripe", billing_routes)
        .nest("/webhooks", webhook_routes)
        .merge(dashboard_routes);

    Router::new()
        .nest("/api/v1", api)
        .route("/health", get(routes::health::health))
        // Global middleware
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::rate_limit::rate_limit,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}
