//! ログ初期化
//!
//! `RUST_LOG` があればそれを優先し、無ければ `systype=info`（`-v` で debug）

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "systype=debug,systype_predictor=debug"
    } else {
        "systype=info,systype_predictor=info"
    }
}

/// stderrにログを出力する（2回目以降の呼び出しは無視）
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
