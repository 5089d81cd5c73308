use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn init_cli_logger(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("ingredient_risk=debug,info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ingredient_risk=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

fn json_subscriber() -> impl tracing::Subscriber + Send + Sync {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ingredient_risk=info"));

    tracing_subscriber::registry().with(filter).with(
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .json()
            .with_current_span(true),
    )
}

/// 輸出 JSON 格式日誌，給排程批次或集中收集使用
pub fn init_json_logger() {
    json_subscriber().init();
}
