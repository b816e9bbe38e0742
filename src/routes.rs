// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{
        admin, attempt, auth, comment, event, me, notification, quiz, quiz_set, subscription,
        tournament, user,
    },
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, optional_auth_middleware},
};

/// Assembles the main application router.
///
/// * Every resource gets its own sub-router under `/api`.
/// * Protected routes pass `auth_middleware`; admin routes also `admin_middleware`.
/// * Trace and CORS layers wrap everything.
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    // Layers run outside in: auth first, then the role check.
    let authed = || middleware::from_fn_with_state(state.clone(), auth_middleware);
    let viewer = || middleware::from_fn_with_state(state.clone(), optional_auth_middleware);
    let admin_only = |router: Router<AppState>| {
        router
            .layer(middleware::from_fn(admin_middleware))
            .layer(authed())
    };

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .merge(
            Router::new()
                .route("/me", get(auth::me))
                .route("/change-password", post(auth::change_password))
                .layer(authed()),
        );

    let user_routes = Router::new()
        .merge(
            Router::new()
                .route("/{id}", get(user::get_user).put(user::update_user))
                .layer(authed()),
        )
        .merge(admin_only(
            Router::new()
                .route("/", get(user::list_users))
                .route("/{id}", delete(user::delete_user))
                .route("/{id}/restore", post(user::restore_user))
                .route("/{id}/role", put(user::change_role)),
        ));

    let quiz_set_routes = Router::new()
        .route("/", get(quiz_set::list_quiz_sets))
        .merge(
            Router::new()
                .route("/{id}", get(quiz_set::get_quiz_set))
                .route("/{id}/quizzes", get(quiz_set::list_quizzes))
                .layer(viewer()),
        )
        .route("/{id}/comments", get(quiz_set::list_comments))
        .route("/{id}/leaderboard", get(quiz_set::leaderboard))
        .merge(
            Router::new()
                .route("/", post(quiz_set::create_quiz_set))
                .route(
                    "/{id}",
                    put(quiz_set::update_quiz_set).delete(quiz_set::delete_quiz_set),
                )
                .route("/{id}/publish", post(quiz_set::publish_quiz_set))
                .route("/{id}/unpublish", post(quiz_set::unpublish_quiz_set))
                .route("/{id}/quizzes", post(quiz_set::create_quiz))
                .route(
                    "/{id}/quizzes/{quiz_id}",
                    post(quiz_set::attach_quiz).delete(quiz_set::detach_quiz),
                )
                .route("/{id}/comments", post(quiz_set::create_comment))
                .route(
                    "/{id}/like",
                    get(quiz_set::like_status).post(quiz_set::toggle_like),
                )
                .route("/{id}/favorite", post(quiz_set::toggle_favorite))
                .layer(authed()),
        )
        .merge(admin_only(
            Router::new().route("/{id}/restore", post(quiz_set::restore_quiz_set)),
        ));

    let quiz_routes = Router::new()
        .route(
            "/{id}",
            get(quiz::get_quiz)
                .put(quiz::update_quiz)
                .delete(quiz::delete_quiz),
        )
        .layer(authed());

    let attempt_routes = Router::new()
        .route("/", post(attempt::start_attempt))
        .route("/me", get(attempt::my_attempts))
        .route("/me/stats", get(attempt::my_stats))
        .route("/me/best/{quiz_set_id}", get(attempt::my_best_attempt))
        .route("/{id}", get(attempt::get_attempt))
        .route("/{id}/submit", post(attempt::submit_attempt))
        .route("/{id}/abandon", post(attempt::abandon_attempt))
        .layer(authed());

    let event_routes = Router::new()
        .route("/", get(event::list_events))
        .route("/{id}", get(event::get_event))
        .route("/{id}/leaderboard", get(event::leaderboard))
        .merge(
            Router::new()
                .route("/", post(event::create_event))
                .route("/{id}", put(event::update_event).delete(event::delete_event))
                .route("/{id}/start", post(event::start_event))
                .route("/{id}/end", post(event::end_event))
                .route("/{id}/join", post(event::join_event))
                .route("/{id}/leave", post(event::leave_event))
                .route("/{id}/results", post(event::record_result))
                .layer(authed()),
        );

    let tournament_routes = Router::new()
        .route("/", get(tournament::list_tournaments))
        .route("/{id}", get(tournament::get_tournament))
        .route("/{id}/leaderboard", get(tournament::leaderboard))
        .merge(
            Router::new()
                .route("/{id}/join", post(tournament::join_tournament))
                .route("/{id}/leave", post(tournament::leave_tournament))
                .layer(authed()),
        )
        .merge(admin_only(
            Router::new()
                .route("/", post(tournament::create_tournament))
                .route(
                    "/{id}",
                    put(tournament::update_tournament).delete(tournament::delete_tournament),
                )
                .route("/{id}/quiz-sets", post(tournament::add_quiz_set))
                .route(
                    "/{id}/quiz-sets/{quiz_set_id}",
                    delete(tournament::remove_quiz_set),
                )
                .route("/{id}/start", post(tournament::start_tournament))
                .route("/{id}/end", post(tournament::end_tournament)),
        ));

    let subscription_routes = Router::new()
        .route("/plans", get(subscription::list_plans))
        .merge(
            Router::new()
                .route("/me", get(subscription::my_subscription))
                .route("/subscribe", post(subscription::subscribe))
                .route("/{id}/cancel", post(subscription::cancel))
                .layer(authed()),
        )
        .merge(admin_only(
            Router::new()
                .route("/plans", post(subscription::create_plan))
                .route(
                    "/plans/{id}",
                    put(subscription::update_plan).delete(subscription::deactivate_plan),
                ),
        ));

    let comment_routes = Router::new()
        .route("/{id}/replies", get(comment::list_replies))
        .merge(
            Router::new()
                .route(
                    "/{id}",
                    put(comment::update_comment).delete(comment::delete_comment),
                )
                .layer(authed()),
        );

    let me_routes = Router::new()
        .route("/favorites", get(me::favorites))
        .route("/mistakes", get(me::mistakes))
        .route("/mistakes/{id}", delete(me::delete_mistake))
        .route("/weak-points", get(me::weak_points))
        .route("/weak-points/refresh", post(me::refresh_weak_points))
        .route("/dashboard", get(me::dashboard))
        .layer(authed());

    let notification_routes = Router::new()
        .route("/", get(notification::list_notifications))
        .route("/unread-count", get(notification::unread_count))
        .route("/read-all", post(notification::mark_all_read))
        .route("/{id}/read", post(notification::mark_read))
        .route("/{id}", delete(notification::delete_notification))
        .layer(authed());

    let admin_routes = admin_only(Router::new().route("/overview", get(admin::overview)));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/users", user_routes)
        .nest("/api/quiz-sets", quiz_set_routes)
        .nest("/api/quizzes", quiz_routes)
        .nest("/api/attempts", attempt_routes)
        .nest("/api/events", event_routes)
        .nest("/api/tournaments", tournament_routes)
        .nest("/api/subscriptions", subscription_routes)
        .nest("/api/comments", comment_routes)
        .nest("/api/me", me_routes)
        .nest("/api/notifications", notification_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
