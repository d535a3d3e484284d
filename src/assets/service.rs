//! HTTP handler that serves mounted asset trees.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderValue, Method, Request, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::assets::error::AssetError;
use crate::assets::listing::{read_listing, render_listing};
use crate::assets::mount::{AssetMount, Resolved};
use crate::config::MountConfig;
use crate::routing::PrefixRouter;

/// Immutable mount table shared by every connection.
#[derive(Clone)]
pub struct AssetState {
    mounts: Arc<PrefixRouter<AssetMount>>,
}

impl AssetState {
    /// Register mounts in configuration order.
    pub fn from_config(mounts: &[MountConfig]) -> Self {
        let mut router = PrefixRouter::new();
        for config in mounts {
            let mount = AssetMount::from_config(config);
            tracing::info!(
                prefix = %mount.prefix(),
                root = %mount.root().display(),
                "Asset mount registered"
            );
            router.insert(config.prefix.clone(), mount);
        }
        Self {
            mounts: Arc::new(router),
        }
    }

    pub fn mounts(&self) -> &PrefixRouter<AssetMount> {
        &self.mounts
    }
}

/// Fallback handler: every HTTP request that is not a tunnel upgrade lands here.
pub async fn serve_asset(State(state): State<AssetState>, request: Request<Body>) -> Response {
    let path = request.uri().path().to_string();

    let Some(route) = state.mounts.route(&path) else {
        tracing::debug!(path = %path, "No mount matched");
        return AssetError::NotFound.into_response();
    };

    if request.method() != Method::GET && request.method() != Method::HEAD {
        let mut response = StatusCode::METHOD_NOT_ALLOWED.into_response();
        response
            .headers_mut()
            .insert(header::ALLOW, HeaderValue::from_static("GET, HEAD"));
        return response;
    }

    let mount = route.value;
    let resolved = mount.resolve(route.rest, path.ends_with('/')).await;

    match resolved {
        Ok(Resolved::File(file)) => match ServeFile::new(&file).oneshot(request).await {
            Ok(response) => response.map(Body::new),
            Err(never) => match never {},
        },
        Ok(Resolved::Listing(dir)) => match read_listing(&dir).await {
            Ok(entries) => Html(render_listing(&path, &entries)).into_response(),
            Err(e) => asset_error(&request, &path, e),
        },
        Ok(Resolved::RedirectToDirectory) => {
            let location = match request.uri().query() {
                Some(query) => format!("{}/?{}", path, query),
                None => format!("{}/", path),
            };
            Redirect::permanent(&location).into_response()
        }
        Err(e) => asset_error(&request, &path, e),
    }
}

fn asset_error(request: &Request<Body>, path: &str, error: AssetError) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_default();

    match &error {
        AssetError::NotFound => {
            tracing::debug!(path = %path, "Asset not found");
        }
        AssetError::Forbidden { .. } => {
            tracing::warn!(
                security_event = true,
                peer = %peer,
                path = %path,
                "Path traversal attempt refused"
            );
        }
        AssetError::Io { .. } => {
            tracing::error!(path = %path, error = %error, "Asset read failed");
        }
    }

    error.into_response()
}
