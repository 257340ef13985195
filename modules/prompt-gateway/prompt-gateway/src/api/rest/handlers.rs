use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::Query;
use axum::extract::rejection::{FormRejection, QueryRejection};
use axum::{Extension, Form, Json};
use gateway_auth::{AuthError, AuthenticatedUser, Authenticator};
use http::HeaderMap;

use crate::api::rest::dto::{CompletionResponse, ContinueForm, PromptName};
use crate::api::rest::error::ApiError;
use crate::domain::service::Service;

type Fields = BTreeMap<String, String>;

/// `POST /v1/prompt/{name}`; the scope guard has already run.
///
/// Variables come from the query string and the form body, the body winning.
/// A request without a form body is valid: absent variables render as "".
#[tracing::instrument(skip_all, fields(prompt = %name.0, user_id = %user.user_id()))]
pub async fn run_prompt(
    Extension(svc): Extension<Arc<Service>>,
    Extension(name): Extension<PromptName>,
    user: AuthenticatedUser,
    query: Result<Query<Fields>, QueryRejection>,
    form: Result<Form<Fields>, FormRejection>,
) -> Result<Json<CompletionResponse>, ApiError> {
    let supplied = merge_fields(query, form)?;
    let completion = svc.start(user.user_id(), &name.0, &supplied).await?;
    Ok(Json(completion.into()))
}

/// `POST /v1/continue`.
///
/// The required scope is only known once the continuation is opened, so the
/// token is authenticated up front and authorized against the prompt it names.
#[tracing::instrument(skip_all)]
pub async fn continue_conversation(
    Extension(svc): Extension<Arc<Service>>,
    Extension(authenticator): Extension<Authenticator>,
    headers: HeaderMap,
    form: Result<Form<ContinueForm>, FormRejection>,
) -> Result<Json<CompletionResponse>, ApiError> {
    let claims = authenticator.authenticate(&headers).await?;

    let Form(form) = form?;
    let token = form
        .context
        .filter(|c| !c.is_empty())
        .ok_or(ApiError::MissingField("CONTEXT"))?;
    let user_text = form.user_text.ok_or(ApiError::MissingField("USER_TEXT"))?;

    let (continuation, spec) = svc.open_continuation(&token)?;
    let user = claims
        .authorize(&spec.required_scope)
        .map_err(AuthError::from_claims)?;

    let completion = svc
        .resume(user.user_id(), continuation, &user_text)
        .await?;
    Ok(Json(completion.into()))
}

fn merge_fields(
    query: Result<Query<Fields>, QueryRejection>,
    form: Result<Form<Fields>, FormRejection>,
) -> Result<Fields, ApiError> {
    let Query(mut fields) = query?;
    match form {
        Ok(Form(body)) => fields.extend(body),
        Err(FormRejection::InvalidFormContentType(_)) => {}
        Err(e) => return Err(e.into()),
    }
    Ok(fields)
}
