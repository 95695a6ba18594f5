use gateway::{
    config::get_configuration, logging::setup_observability, render::Renderer,
    server::run_server, state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = get_configuration()?;
    let _telemetry = setup_observability(&config)?;

    tracing::info!(
        environment = config.environment.as_str(),
        model_dir = %config.model.model_dir.display(),
        "Starting YOLOv3 detection service"
    );

    let model_config = config.model.clone();
    let model = tokio::task::spawn_blocking(move || inference::load_default_model(&model_config))
        .await?;

    if let inference::ModelStatus::NotReady { reason, .. } = &model {
        tracing::warn!(%reason, "Serving without a model; detection endpoints will return 503");
    }

    let renderer = Renderer::new(&config.render)?;
    let state = AppState::new(model, config.model.clone(), renderer);

    run_server(&config.server, state).await
}
