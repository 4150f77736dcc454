use std::{net::SocketAddr, sync::Arc};

use tokio::{net::TcpListener, task::JoinHandle};

use crate::{api, error::Result, info, spotify::Authenticator, warning};

/// Binds the authorization listener.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    Ok(TcpListener::bind(addr).await?)
}

pub async fn serve(listener: TcpListener, auth: Arc<Authenticator>) -> Result<()> {
    axum::serve(listener, api::router(auth)).await?;
    Ok(())
}

/// Serves an already bound listener in the background.
pub fn spawn_api_server(listener: TcpListener, auth: Arc<Authenticator>) -> JoinHandle<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Server running at http://{}", addr);
    }

    tokio::spawn(async move {
        if let Err(e) = serve(listener, auth).await {
            warning!("Authorization server stopped: {}", e);
        }
    })
}
