//! Web app manifest

use axum::{Json, Router, http::header, response::IntoResponse, routing::get};
use serde::Serialize;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/manifest.webmanifest", get(manifest))
}

#[derive(Serialize)]
pub struct ManifestIcon {
    pub src: &'static str,
    pub sizes: &'static str,
    #[serde(rename = "type")]
    pub mime: &'static str,
    pub purpose: &'static str,
}

#[derive(Serialize)]
pub struct WebManifest {
    pub name: &'static str,
    pub short_name: &'static str,
    pub description: &'static str,
    pub lang: &'static str,
    pub start_url: &'static str,
    pub scope: &'static str,
    pub display: &'static str,
    pub background_color: &'static str,
    pub theme_color: &'static str,
    pub icons: Vec<ManifestIcon>,
}

pub fn web_manifest() -> WebManifest {
    WebManifest {
        name: "Soot",
        short_name: "Soot",
        description: "Gestion de la maison : tâches, calendrier, équipements et dates importantes",
        lang: "fr",
        start_url: "/",
        scope: "/",
        display: "standalone",
        background_color: "#ffffff",
        theme_color: "#1f2937",
        icons: vec![
            ManifestIcon {
                src: "/icons/icon-192.png",
                sizes: "192x192",
                mime: "image/png",
                purpose: "any",
            },
            ManifestIcon {
                src: "/icons/icon-512.png",
                sizes: "512x512",
                mime: "image/png",
                purpose: "any maskable",
            },
        ],
    }
}

/// GET /manifest.webmanifest - PWA installability metadata
async fn manifest() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/manifest+json")],
        Json(web_manifest()),
    )
}
