// Main entry point - Dependency injection and the live dashboard loop
use std::sync::Arc;

use dashboard_canvas::application::dashboard_channel::ChannelEvent;
use dashboard_canvas::application::dashboard_session::DashboardSession;
use dashboard_canvas::application::dashboard_store::DataStatus;
use dashboard_canvas::application::live_data_client::Dispatch;
use dashboard_canvas::infrastructure::config::{load_app_config, AppConfig};
use dashboard_canvas::infrastructure::dependencies_api::DependenciesApi;
use dashboard_canvas::infrastructure::http_repository::HttpDashboardRepository;
use dashboard_canvas::infrastructure::logging;
use dashboard_canvas::infrastructure::ws_channel::{ReconnectPolicy, WsChannel};
use dashboard_canvas::presentation::canvas::CanvasView;
use futures::StreamExt;
use tokio_stream::wrappers::UnboundedReceiverStream;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = load_app_config()?;
    logging::init(config.logging.debug);

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some(action @ ("install" | "uninstall")) => run_dependencies(&config, action, &args[1..]).await,
        Some("packages") => {
            let api = DependenciesApi::new(&config.server.base_url, &config.server.dependencies_path);
            for package in api.list().await? {
                println!("{}", package);
            }
            Ok(())
        }
        _ => watch_dashboard(config).await,
    }
}

async fn watch_dashboard(config: AppConfig) -> anyhow::Result<()> {
    // Create adapters (infrastructure layer)
    let repository = Arc::new(HttpDashboardRepository::new(
        config.server.base_url.clone(),
        config.server.dashboard_path.clone(),
    ));
    let pipeline_key = config.dashboard.pipeline_key();
    let url = WsChannel::url_for(&config.server.ws_url, &config.server.ws_path, &pipeline_key);
    let (channel, events) = WsChannel::open(url, ReconnectPolicy::from_settings(&config.reconnect));

    // Create session (application layer)
    let mut session = DashboardSession::open(
        &config.dashboard.project,
        &config.dashboard.name,
        repository,
        &pipeline_key,
        Arc::new(channel),
    )
    .await?;
    let canvas = CanvasView::new(config.grid.clone(), session.store().grid_cols());

    let subscribed = session.subscribe_all()?;
    tracing::info!(
        "Watching dashboard {} ({} widgets, {} subscribed) on {}",
        session.store().name(),
        session.store().widgets().len(),
        subscribed,
        pipeline_key
    );

    let mut events = UnboundedReceiverStream::new(events);
    loop {
        tokio::select! {
            event = events.next() => {
                let Some(event) = event else { break };
                let closed = event == ChannelEvent::Closed;
                if let Some(dispatch) = session.handle_channel_event(event) {
                    report(&session, &canvas, &dispatch);
                }
                if closed {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                session.close();
                break;
            }
        }
    }

    Ok(())
}

fn report(session: &DashboardSession, canvas: &CanvasView, dispatch: &Dispatch) {
    let id = match dispatch {
        Dispatch::Applied(id) | Dispatch::ErrorRecorded(id) => id,
        Dispatch::Refetched(ids) if !ids.is_empty() => {
            tracing::info!("Pipeline tick, refetching {} widget(s)", ids.len());
            return;
        }
        _ => return,
    };

    let frames = canvas.frames(session.store());
    let Some(frame) = frames.iter().find(|f| &f.id == id) else {
        return;
    };
    match &frame.status {
        DataStatus::Ready(dataset) => tracing::info!(
            "{} [{}] {} rows of {} at {:?}",
            frame.title,
            frame.id,
            dataset.rows.len(),
            dataset.total,
            frame.layout
        ),
        DataStatus::Stale { dataset, error } => tracing::warn!(
            "{} [{}] showing {} stale rows: {}",
            frame.title,
            frame.id,
            dataset.rows.len(),
            error
        ),
        DataStatus::Failed(error) => tracing::warn!("{} [{}] failed: {}", frame.title, frame.id, error),
        DataStatus::NoData => tracing::info!("{} [{}] has no data", frame.title, frame.id),
    }
}

async fn run_dependencies(config: &AppConfig, action: &str, packages: &[String]) -> anyhow::Result<()> {
    let api = DependenciesApi::new(&config.server.base_url, &config.server.dependencies_path);
    let mut lines = if action == "install" {
        api.install(packages).await?
    } else {
        api.uninstall(packages).await?
    };

    while let Some(line) = lines.next().await {
        let line = line?;
        println!("{}", line);
        if line.is_terminal() {
            break;
        }
    }
    Ok(())
}
