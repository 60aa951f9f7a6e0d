use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// 終端機用的精簡格式
    Compact,
    /// 容器環境 (Cloud Run 等) 的 JSON lines
    Json,
}

/// RUST_LOG 優先，否則依 verbose 決定本 crate 的層級
pub fn default_filter(verbose: bool) -> EnvFilter {
    let directives = if verbose {
        "odyssey_ops=debug,odyssey=debug,info"
    } else {
        "odyssey_ops=info,odyssey=info,warn"
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives))
}

pub fn init_logger(format: LogFormat, verbose: bool) {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let registry = tracing_subscriber::registry().with(default_filter(verbose));
    let result = match format {
        LogFormat::Compact => registry.with(fmt_layer.compact()).try_init(),
        LogFormat::Json => registry.with(fmt_layer.json()).try_init(),
    };

    if let Err(e) = result {
        // 已經有全域 subscriber (例如測試重複初始化) 時沿用原本的
        tracing::debug!("Logger already initialised: {}", e);
    }
}

pub fn init_cli_logger(verbose: bool) {
    init_logger(LogFormat::Compact, verbose);
}

pub fn init_json_logger() {
    init_logger(LogFormat::Json, false);
}
