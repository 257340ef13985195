use std::sync::Arc;

use axum::routing::post;
use axum::{Extension, Router, middleware};
use gateway_auth::Authenticator;
use gateway_auth::axum_ext::{ScopeGuardState, require_scope};

use crate::api::rest::dto::PromptName;
use crate::api::rest::handlers;
use crate::domain::service::Service;

pub const CONTINUE_PATH: &str = "/v1/continue";

#[must_use]
pub fn prompt_path(name: &str) -> String {
    format!("/v1/prompt/{name}")
}

/// One guarded route per configured prompt, plus the continuation route.
#[must_use]
pub fn register_routes(svc: Arc<Service>, authenticator: Authenticator) -> Router {
    let mut router = Router::new().route(CONTINUE_PATH, post(handlers::continue_conversation));

    for (name, spec) in svc.prompts() {
        let guard = ScopeGuardState::new(authenticator.clone(), &spec.required_scope);
        tracing::debug!(prompt = name, scope = guard.required_scope(), "registering prompt route");
        router = router.route(
            &prompt_path(name),
            post(handlers::run_prompt)
                .layer(Extension(PromptName(Arc::from(name))))
                .layer(middleware::from_fn_with_state(guard, require_scope)),
        );
    }

    router.layer(Extension(svc)).layer(Extension(authenticator))
}
