// Entry point for `cargo run -p web-server`: serves the API with settings from
// `config.toml` and `HORIZON__*` environment variables.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = configuration::load_config()?;
    let _guard = configuration::init_tracing(&config.logging)?;

    let addr = web_server::listen_addr(&config)?;
    web_server::run_server(addr, &config).await
}
