use axum::{debug_handler, extract::{Path, Query, State}, response::{IntoResponse, Redirect}};
use oauth2::{AuthorizationCode, CsrfToken, PkceCodeVerifier, TokenResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_sessions::Session;
use tracing::info;

use crate::{session::{self, User, CSRF_STATE, PKCE_VERIFIER, RETURN_URL, USER}, AppError, AppResult, GetField};

use super::{clients::ClientProvider, Clients};

#[derive(Deserialize)]
pub struct LockinQuery {
    pub state: Option<String>,
    pub code: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FirebaseRequest {
    post_body: String,
    request_uri: String,
    return_idp_credential: bool,
    return_secure_token: bool,
}

/// Pulls the identity out of a `signInWithIdp` response.
pub(crate) fn user_from_idp(body: &Value) -> AppResult<User> {
    let id = body.get_str_field("localId")?;

    let name = body.get("displayName").and_then(Value::as_str);
    let avatar = body.get("photoUrl").and_then(Value::as_str);
    let (Some(name), Some(avatar)) = (name, avatar) else {
        return Err(AppError::BadRequest("Missing information from the account.".to_owned()));
    };

    Ok(User {
        id,
        name: name.to_owned(),
        avatar: avatar.to_owned(),
    })
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn lockin(
    Path(provider): Path<ClientProvider>,
    Query(LockinQuery { state, code }): Query<LockinQuery>,
    State(clients): State<Clients>,
    session: Session,
) -> AppResult<impl IntoResponse> {
    let state = CsrfToken::new(state.ok_or(AppError::BadRequest("OAuth: without state".to_owned()))?);
    let code = AuthorizationCode::new(code.ok_or(AppError::BadRequest("OAuth: without code".to_owned()))?);

    let Some(stored_state) = session.remove::<String>(CSRF_STATE).await? else {
        return Err(AppError::BadRequest("no csrf_state".to_owned()));
    };

    if state.secret().as_str() != stored_state.as_str() {
        return Err(AppError::BadRequest("csrf tokens don't match".to_owned()));
    }

    let Some(pkce_verifier) = session.remove::<String>(PKCE_VERIFIER).await? else {
        return Err(AppError::BadRequest("no pkce_verifier".to_owned()));
    };

    let client = clients.get_client(provider)?;
    let http_client = reqwest::ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;
    let token_result = client
        .exchange_code(code)
        .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier))
        .request_async(&http_client)
        .await?;

    let access_token = token_result.access_token().secret();
    let body: Value = http_client.post(&clients.firebase_idpurl)
        .json(&FirebaseRequest {
            post_body: format!("access_token={access_token}&providerId={}", provider.id()),
            request_uri: clients.public_url.clone(),
            return_idp_credential: true,
            return_secure_token: true,
        })
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let user = user_from_idp(&body)?;
    info!("welcome u/{}, {}", user.id, user.name);

    // fresh id for the signed-in session
    session.cycle_id().await?;
    session.insert(USER, &user).await?;

    let return_url = session.remove::<String>(RETURN_URL).await?;
    Ok(Redirect::to(&session::local_path(return_url)))
}
