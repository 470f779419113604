use axum::{debug_handler, extract::{Path, Query, State}, response::{Html, IntoResponse, Redirect, Response}};
use oauth2::{url::form_urlencoded, CsrfToken, PkceCodeChallenge, Scope};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::debug;

use crate::{include_res, res, session::{self, CSRF_STATE, PKCE_VERIFIER, RETURN_URL}, AppResult};

use super::{clients::ClientProvider, Clients};

#[derive(Deserialize)]
pub(crate) struct LoginQuery {
    pub(crate) return_url: Option<String>,
}

fn encode(return_url: &str) -> String {
    form_urlencoded::byte_serialize(return_url.as_bytes()).collect()
}

/// Straight to one provider, coming back to `return_url` afterwards.
pub fn login_url(provider: ClientProvider, return_url: &str) -> String {
    format!("/login/{}?return_url={}", provider.slug(), encode(return_url))
}

/// The provider picker, coming back to `return_url` afterwards.
pub fn login_page_url(return_url: &str) -> String {
    format!("/login?return_url={}", encode(return_url))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn login_page(
    Query(LoginQuery { return_url }): Query<LoginQuery>,
    State(clients): State<Clients>,
) -> impl IntoResponse {
    let return_url = session::local_path(return_url);

    let mut providers = String::new();
    for provider in ClientProvider::ALL {
        if !clients.has(provider) {
            continue;
        }
        providers += &include_res!(str, "/pages/provider_item.html")
            .replace("{href}", &res::escape(&login_url(provider, &return_url)))
            .replace("{slug}", provider.slug())
            .replace("{name}", &provider.to_string());
    }

    Html(
        include_res!(str, "/pages/login.html")
            .replace("{providers}", &providers)
    )
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn login(
    Path(provider): Path<ClientProvider>,
    Query(LoginQuery { return_url }): Query<LoginQuery>,
    State(clients): State<Clients>,
    session: Session,
) -> AppResult<Response> {
    let client = clients.get_client(provider)?;

    let (pkce_code_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

    let (authorize_url, csrf_state) = client.authorize_url(CsrfToken::new_random)
        .add_scopes(provider.scopes().iter().map(|scope| Scope::new(scope.to_string())))
        .set_pkce_challenge(pkce_code_challenge)
        .url();

    session.insert(CSRF_STATE, csrf_state.secret()).await?;
    session.insert(PKCE_VERIFIER, pkce_verifier.secret()).await?;
    session.insert(RETURN_URL, session::local_path(return_url)).await?;

    debug!("sending visitor to {provider} for sign in");

    Ok(Redirect::to(authorize_url.as_str()).into_response())
}
