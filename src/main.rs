use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rust_leadgen_api::config::Config;
use rust_leadgen_api::{gemini_client, handlers};

/// Serves the single-page lead prospecting dashboard.
///
/// One self-contained HTML page: the query form, the ranked lead list, and
/// the detail view, all driven by fetch calls against the JSON API. The
/// submit control is disabled while a request is outstanding and every
/// failure collapses to one generic retryable message.
async fn serve_dashboard() -> impl IntoResponse {
    let html = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>LeadGen AI - Lead Prospector</title>
    <style>
        * { box-sizing: border-box; }
        body { margin: 0; font-family: system-ui, sans-serif; background: #f8fafc; color: #0f172a; }
        header { background: #fff; border-bottom: 1px solid #e2e8f0; padding: 16px 32px; }
        header h1 { margin: 0; font-size: 20px; }
        header h1 span { color: #4f46e5; }
        main { max-width: 1400px; margin: 0 auto; padding: 24px 32px; }
        form { display: flex; gap: 12px; flex-wrap: wrap; align-items: flex-end; margin-bottom: 24px; }
        label { display: flex; flex-direction: column; font-size: 12px; font-weight: 600; color: #475569; gap: 4px; }
        input { padding: 10px 12px; border: 1px solid #cbd5e1; border-radius: 8px; min-width: 220px; font-size: 14px; }
        button { padding: 10px 24px; border: 0; border-radius: 8px; background: #4f46e5; color: #fff; font-weight: 600; cursor: pointer; }
        button:disabled { background: #a5b4fc; cursor: wait; }
        #error { color: #b91c1c; font-size: 14px; margin-bottom: 16px; display: none; }
        .layout { display: grid; grid-template-columns: 380px 1fr; gap: 24px; }
        .card { background: #fff; border: 1px solid #e2e8f0; border-radius: 12px; padding: 14px 16px; margin-bottom: 10px; cursor: pointer; }
        .card.selected { border-color: #4f46e5; box-shadow: 0 0 0 1px #4f46e5; }
        .card h3 { margin: 0 0 4px; font-size: 15px; }
        .prob { float: right; font-weight: 700; color: #4f46e5; }
        .muted { color: #64748b; font-size: 13px; }
        #detail { background: #fff; border: 1px solid #e2e8f0; border-radius: 12px; padding: 24px; }
        .gap { margin: 8px 0; }
        .bar { height: 6px; background: #e2e8f0; border-radius: 3px; overflow: hidden; }
        .bar div { height: 100%; background: #4f46e5; }
        pre { white-space: pre-wrap; background: #f1f5f9; padding: 16px; border-radius: 8px; font-family: inherit; font-size: 14px; }
        .sources a { display: block; font-size: 13px; color: #4f46e5; margin: 4px 0; }
    </style>
</head>
<body>
    <header><h1>LeadGen <span>AI</span> &mdash; Lead Prospector</h1></header>
    <main>
        <form id="query-form">
            <label>Industry / Segment
                <input id="category" value="Dental Clinics" required>
            </label>
            <label>Region
                <input id="location" value="New York, NY" required>
            </label>
            <label>Gap Focus (optional)
                <input id="target-gaps" value="SEO, Website Performance, Social Media Presence">
            </label>
            <button id="submit" type="submit">Generate Leads</button>
        </form>
        <div id="error"></div>
        <div class="layout">
            <div id="list"></div>
            <div id="detail"><p class="muted">Run a query to see ranked leads.</p></div>
        </div>
    </main>
    <script>
        let leads = [];
        let selectedId = null;

        const el = (id) => document.getElementById(id);

        function showError(msg) {
            el('error').textContent = msg;
            el('error').style.display = msg ? 'block' : 'none';
        }

        function render() {
            el('list').innerHTML = leads.map(l => `
                <div class="card ${l.id === selectedId ? 'selected' : ''}" data-id="${l.id}">
                    <span class="prob">${l.conversionProbability}%</span>
                    <h3>${l.companyName}</h3>
                    <div class="muted">${l.decisionMaker} &middot; ${l.role}</div>
                    <div class="muted">${l.location}</div>
                </div>`).join('');
            document.querySelectorAll('.card').forEach(c =>
                c.addEventListener('click', () => select(c.dataset.id)));
            const lead = leads.find(l => l.id === selectedId);
            el('detail').innerHTML = lead ? `
                <h2>${lead.companyName} <span class="prob">${lead.conversionProbability}%</span></h2>
                <p class="muted">${lead.decisionMaker} &middot; ${lead.role}<br>
                   ${lead.phoneNumber} &middot; ${lead.email}<br>${lead.location}</p>
                <h3>Gap Analysis</h3>
                ${lead.gapAnalysis.map(g => `
                    <div class="gap"><strong>${g.title}</strong> (${g.score})
                        <div class="bar"><div style="width:${g.score}%"></div></div>
                        <div class="muted">${g.description}</div>
                    </div>`).join('')}
                <h3>Outreach Email</h3>
                <pre>${lead.outreachEmail}</pre>
                ${lead.sources && lead.sources.length ? `
                    <h3>Sources</h3>
                    <div class="sources">${lead.sources.map(s =>
                        `<a href="${s.uri}" target="_blank" rel="noopener">${s.title}</a>`).join('')}
                    </div>` : ''}`
                : '<p class="muted">Run a query to see ranked leads.</p>';
        }

        async function select(id) {
            try {
                const res = await fetch(`/api/v1/leads/selected/${encodeURIComponent(id)}`, { method: 'PUT' });
                if (!res.ok) return;
                const data = await res.json();
                leads = data.leads;
                selectedId = data.selectedId;
                render();
            } catch (_) { /* keep previous selection */ }
        }

        el('query-form').addEventListener('submit', async (e) => {
            e.preventDefault();
            const category = el('category').value.trim();
            const location = el('location').value.trim();
            if (!category || !location) {
                showError('Please fill in both industry and location.');
                return;
            }
            showError('');
            el('submit').disabled = true;
            try {
                const res = await fetch('/api/v1/leads/generate', {
                    method: 'POST',
                    headers: { 'Content-Type': 'application/json' },
                    body: JSON.stringify({
                        category, location,
                        targetGaps: el('target-gaps').value.trim() || null
                    })
                });
                if (!res.ok) throw new Error('request failed');
                const data = await res.json();
                leads = data.leads;
                selectedId = data.selectedId;
                render();
            } catch (_) {
                showError('Market analysis failed. Please verify your connection and try again.');
            } finally {
                el('submit').disabled = false;
            }
        });
    </script>
</body>
</html>
"#;
    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/html; charset=utf-8")],
        html,
    )
}

/// Main entry point for the application.
///
/// This function initializes the application, including:
/// - Logging and tracing.
/// - Configuration loading.
/// - The upstream Gemini client.
/// - HTTP routes and middleware (CORS, Rate Limiting).
///
/// It then starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_leadgen_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize the upstream client
    let gemini = gemini_client::GeminiClient::new(
        config.gemini_base_url.clone(),
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
    )?;
    tracing::info!("Gemini client initialized: {}", config.gemini_base_url);

    // Build application state
    let app_state = Arc::new(handlers::AppState::new(config.clone(), gemini));

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .expect("valid governor configuration"),
    );

    // Build protected routes with security layers, reusing the shared API
    // route table so the shipped routes match the tested ones
    let protected_routes = handlers::api_routes()
        .layer(
            ServiceBuilder::new()
                // Query payloads are tiny; 64KB is generous headroom
                .layer(RequestBodyLimitLayer::new(64 * 1024))
                // Rate limiting: 10 req/sec per IP, burst of 20
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    // Build final app with dashboard and health check (bypass rate limiting)
    let app = Router::new()
        .route("/", get(serve_dashboard))
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
