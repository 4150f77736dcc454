use std::sync::Arc;

use axum::{Extension, response::Html};

use crate::{spotify::Authenticator, warning};

pub async fn index(Extension(auth): Extension<Arc<Authenticator>>) -> Html<String> {
    match auth.authorize_url() {
        Ok(url) => Html(format!(
            "<a href=\"{url}\">Click here to login with Spotify</a>"
        )),
        Err(e) => {
            warning!("Cannot build authorization URL: {}", e);
            Html("<h4>Authorization is not configured.</h4>".to_string())
        }
    }
}
