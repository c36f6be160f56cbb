/// ログ基盤モジュール
///
/// ファサードはクエリごとに診断ログを1行出すだけなので、購読側の設定は
/// 呼び出し元のプロセスに任せる。ここではJSON形式の標準設定を提供する。
use std::sync::Once;

use tracing::Subscriber;
use tracing_subscriber::{
    EnvFilter, fmt::MakeWriter, layer::SubscriberExt, util::SubscriberInitExt,
};

/// `RUST_LOG`未設定時のフィルター
const DEFAULT_FILTER: &str = "info";

static INIT: Once = Once::new();

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// 1イベント1行のJSONを`writer`に書き出すサブスクライバー
fn json_subscriber<W>(filter: EnvFilter, writer: W) -> impl Subscriber + Send + Sync
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(writer)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .flatten_event(true)
        .with_current_span(false);

    tracing_subscriber::registry().with(filter).with(json_layer)
}

/// JSON形式のログサブスクライバーを初期化する
///
/// 何度呼び出しても最初の1回だけが有効。既に別のサブスクライバーが
/// 設定されている場合は何もしない。
///
/// # 使用例
/// ```ignore
/// use dynamo_facade::infrastructure::init_logging;
///
/// init_logging();
/// tracing::info!(table = "Orders", "起動");
/// ```
pub fn init_logging() {
    INIT.call_once(|| {
        let _ = json_subscriber(env_filter(DEFAULT_FILTER), std::io::stdout).try_init();
    });
}

/// テスト用のログサブスクライバーを初期化する（人間が読みやすい形式）
#[cfg(test)]
pub(crate) fn init_test_logging() {
    static TEST_INIT: Once = Once::new();

    TEST_INIT.call_once(|| {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_test_writer()
            .with_target(true)
            .compact();

        let _ = tracing_subscriber::registry()
            .with(env_filter("debug"))
            .with(fmt_layer)
            .try_init();
    });
}

/// JSONログをメモリに溜めるテスト用ライター
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub(crate) struct CapturedLogs {
    buffer: std::sync::Arc<std::sync::Mutex<Vec<u8>>>,
}

#[cfg(test)]
impl CapturedLogs {
    /// 本番と同じJSON形式でこのバッファに書き出すサブスクライバー
    ///
    /// `tracing::subscriber::set_default`で現在のスレッドにだけ設定して使う。
    pub(crate) fn subscriber(&self) -> impl Subscriber + Send + Sync {
        json_subscriber(EnvFilter::new(DEFAULT_FILTER), self.clone())
    }

    /// 書き出されたログを1行ずつJSONとして読む
    pub(crate) fn events(&self) -> Vec<serde_json::Value> {
        let buffer = self.buffer.lock().unwrap();
        String::from_utf8_lossy(&buffer)
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }
}

#[cfg(test)]
impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
