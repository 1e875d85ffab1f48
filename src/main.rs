use actix_web::{web, App, HttpServer, middleware::Compress};
use actix_cors::Cors;
use anyhow::Context;
use utoipa_swagger_ui::SwaggerUi;

use defi_auth::auth::TokenIssuer;
use defi_auth::config::AppConfig;
use defi_auth::delivery::{CodeSender, ConsoleSender, SmtpSender};
use defi_auth::openapi::ApiDoc;
use defi_auth::otp::OtpService;
use defi_auth::otp_store::{sweep_expired, InMemOtpStore, OtpStore};
use defi_auth::password::PasswordHasher;
use defi_auth::rate_limit::{purge_idle_every, InMemoryRateLimiter, RateLimiterFacade};
use defi_auth::repo::{inmem::InMemAccountRepo, AccountRepo};
use defi_auth::signup::SignupService;
use defi_auth::{config, AppState, SecurityHeaders};
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;
use tracing_actix_web::TracingLogger;
use utoipa::OpenApi; // bring trait into scope for ApiDoc::openapi()

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // .env only in debug builds; production sets the environment explicitly
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let cfg = AppConfig::from_env().context("loading configuration")?;
    info!("Bootstrapping auth server");

    let sender: Arc<dyn CodeSender> = match &cfg.smtp {
        Some(smtp) => {
            info!("SMTP delivery via {}", smtp.host);
            Arc::new(SmtpSender::new(smtp).context("building SMTP transport")?)
        }
        None => {
            warn!("SMTP_HOST not set; codes are written to the log (development only)");
            Arc::new(ConsoleSender)
        }
    };

    let accounts: Arc<dyn AccountRepo> = match &cfg.data_dir {
        Some(dir) => {
            info!("Account snapshot in {}", dir.display());
            Arc::new(InMemAccountRepo::with_snapshot_dir(dir))
        }
        None => {
            info!("Using in-memory account repository (no DATA_DIR)");
            Arc::new(InMemAccountRepo::new())
        }
    };

    let otp_store: Arc<dyn OtpStore> = Arc::new(InMemOtpStore::new());
    let tokens = Arc::new(TokenIssuer::new(cfg.jwt_secret.as_bytes(), cfg.token_ttl)?);
    let hasher = Arc::new(PasswordHasher::new(&cfg.argon2)?);

    let rate_limiter = cfg
        .rate_limit_enabled
        .then(|| RateLimiterFacade::new(InMemoryRateLimiter::new(true), cfg.rate_limit.clone()));

    if let Some(every) = cfg.otp_sweep_every {
        actix_web::rt::spawn(sweep_expired(otp_store.clone(), every));
    }
    if let Some(rl) = rate_limiter.clone() {
        let every = rl.cfg.purge_every();
        actix_web::rt::spawn(purge_idle_every(rl, every));
    }

    let state = AppState {
        otp: Arc::new(OtpService::new(otp_store, sender, cfg.otp_ttl)),
        signup: Arc::new(SignupService::new(accounts, hasher, tokens.clone())),
        tokens,
        rate_limiter,
    };

    let openapi = ApiDoc::openapi();
    let security = SecurityHeaders::new(cfg.enable_hsts);
    let frontend_url = cfg.frontend_url.clone();

    let server = HttpServer::new(move || {
        let cors = {
            let mut c = Cors::default()
                // local dashboard dev servers
                .allowed_origin("http://localhost:3000")
                .allowed_origin("http://localhost:5173")
                .allowed_methods(["GET", "POST", "OPTIONS"])
                .allow_any_header()
                .max_age(3600);
            if let Some(front) = &frontend_url {
                c = c.allowed_origin(front);
            }
            c
        };

        App::new()
            .wrap(TracingLogger::default())
            .wrap(Compress::default())
            .wrap(security)
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .configure(config)
            .service(SwaggerUi::new("/docs/{_:.*}").url("/docs/openapi.json", openapi.clone()))
    })
    .bind((cfg.bind_addr.as_str(), cfg.port))
    .with_context(|| format!("binding {}:{}", cfg.bind_addr, cfg.port))?;

    info!("Listening on http://{}:{}", cfg.bind_addr, cfg.port);

    server.run().await?;
    Ok(())
}
