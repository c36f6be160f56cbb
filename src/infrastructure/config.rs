/// DynamoDB接続設定
///
/// クライアントはプロセス起動時に1回だけ生成し、以後すべての呼び出しで共有する。
use std::time::Duration;

use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_dynamodb::Client as DynamoDbClient;
use thiserror::Error;

/// リージョンの環境変数名
pub const REGION_ENV: &str = "DYNAMODB_REGION";
/// エンドポイント上書き（DynamoDB Localなど）の環境変数名
pub const ENDPOINT_URL_ENV: &str = "DYNAMODB_ENDPOINT_URL";
/// 操作タイムアウト（ミリ秒）の環境変数名
pub const OPERATION_TIMEOUT_ENV: &str = "DYNAMODB_OPERATION_TIMEOUT_MS";

/// リージョン未指定時のデフォルト
pub const DEFAULT_REGION: &str = "eu-west-1";

/// DynamoDB設定のエラー型
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DynamoDbConfigError {
    #[error("Invalid environment variable {name}={value}: {reason}")]
    InvalidEnvVar {
        name: String,
        value: String,
        reason: String,
    },
}

/// クライアント生成に使う設定値
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamoDbSettings {
    region: String,
    endpoint_url: Option<String>,
    /// 未指定ならSDKのデフォルトのまま（独自のタイムアウトは追加しない）
    operation_timeout: Option<Duration>,
}

impl Default for DynamoDbSettings {
    fn default() -> Self {
        Self::new(DEFAULT_REGION)
    }
}

impl DynamoDbSettings {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            endpoint_url: None,
            operation_timeout: None,
        }
    }

    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }

    /// 環境変数から設定を読み込む
    ///
    /// 環境変数:
    /// - DYNAMODB_REGION: リージョン（デフォルト: eu-west-1）
    /// - DYNAMODB_ENDPOINT_URL: エンドポイントURLの上書き
    /// - DYNAMODB_OPERATION_TIMEOUT_MS: 操作タイムアウト（正の整数、ミリ秒）
    pub fn from_env() -> Result<Self, DynamoDbConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 任意の参照関数から設定を読み込む
    ///
    /// 空文字の値は未設定として扱う。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DynamoDbConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let mut settings = Self::new(get(REGION_ENV).unwrap_or_else(|| DEFAULT_REGION.to_string()));

        if let Some(endpoint_url) = get(ENDPOINT_URL_ENV) {
            settings = settings.with_endpoint_url(endpoint_url);
        }

        if let Some(raw) = get(OPERATION_TIMEOUT_ENV) {
            let invalid = |reason: &str| DynamoDbConfigError::InvalidEnvVar {
                name: OPERATION_TIMEOUT_ENV.to_string(),
                value: raw.clone(),
                reason: reason.to_string(),
            };

            let millis: u64 = raw
                .trim()
                .parse()
                .map_err(|_| invalid("expected a positive integer"))?;
            if millis == 0 {
                return Err(invalid("must be greater than zero"));
            }
            settings = settings.with_operation_timeout(Duration::from_millis(millis));
        }

        Ok(settings)
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn endpoint_url(&self) -> Option<&str> {
        self.endpoint_url.as_deref()
    }

    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout
    }
}

/// 共有クライアントと設定値を持つDynamoDB設定
#[derive(Debug, Clone)]
pub struct DynamoDbConfig {
    /// DynamoDBクライアントインスタンス
    client: DynamoDbClient,
    settings: DynamoDbSettings,
}

impl DynamoDbConfig {
    /// 環境変数から設定を読み込み、クライアントを生成
    ///
    /// AWS認証情報はaws-configのデフォルトチェーンで解決される。
    pub async fn from_env() -> Result<Self, DynamoDbConfigError> {
        let settings = DynamoDbSettings::from_env()?;
        Ok(Self::load(settings).await)
    }

    /// 設定値からクライアントを生成
    pub async fn load(settings: DynamoDbSettings) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.region().to_string()));

        if let Some(endpoint_url) = settings.endpoint_url() {
            loader = loader.endpoint_url(endpoint_url);
        }

        if let Some(timeout) = settings.operation_timeout() {
            loader = loader.timeout_config(
                TimeoutConfig::builder().operation_timeout(timeout).build(),
            );
        }

        let aws_config = loader.load().await;

        Self {
            client: DynamoDbClient::new(&aws_config),
            settings,
        }
    }

    /// 明示的な値で新しいDynamoDbConfigを作成（テスト用）
    pub fn new(client: DynamoDbClient, settings: DynamoDbSettings) -> Self {
        Self { client, settings }
    }

    /// DynamoDBクライアントへの参照を取得
    pub fn client(&self) -> &DynamoDbClient {
        &self.client
    }

    pub fn settings(&self) -> &DynamoDbSettings {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let settings = DynamoDbSettings::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(settings.region(), "eu-west-1");
        assert_eq!(settings.endpoint_url(), None);
        assert_eq!(settings.operation_timeout(), None);
        assert_eq!(settings, DynamoDbSettings::default());
    }

    #[test]
    fn test_all_values_read() {
        let settings = DynamoDbSettings::from_lookup(lookup_from(&[
            (REGION_ENV, "us-east-1"),
            (ENDPOINT_URL_ENV, "http://localhost:8000"),
            (OPERATION_TIMEOUT_ENV, "2500"),
        ]))
        .unwrap();

        assert_eq!(settings.region(), "us-east-1");
        assert_eq!(settings.endpoint_url(), Some("http://localhost:8000"));
        assert_eq!(settings.operation_timeout(), Some(Duration::from_millis(2500)));
    }

    // 空文字は未設定として扱う
    #[test]
    fn test_blank_values_ignored() {
        let settings = DynamoDbSettings::from_lookup(lookup_from(&[
            (REGION_ENV, ""),
            (ENDPOINT_URL_ENV, "  "),
        ]))
        .unwrap();

        assert_eq!(settings.region(), DEFAULT_REGION);
        assert_eq!(settings.endpoint_url(), None);
    }

    #[test]
    fn test_invalid_timeout_rejected() {
        let error =
            DynamoDbSettings::from_lookup(lookup_from(&[(OPERATION_TIMEOUT_ENV, "soon")]))
                .unwrap_err();

        assert_eq!(
            error.to_string(),
            "Invalid environment variable DYNAMODB_OPERATION_TIMEOUT_MS=soon: expected a positive integer"
        );
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let error = DynamoDbSettings::from_lookup(lookup_from(&[(OPERATION_TIMEOUT_ENV, "0")]))
            .unwrap_err();

        match error {
            DynamoDbConfigError::InvalidEnvVar { name, reason, .. } => {
                assert_eq!(name, OPERATION_TIMEOUT_ENV);
                assert_eq!(reason, "must be greater than zero");
            }
        }
    }

    // 環境変数はプロセスグローバルなのでシリアル実行する
    #[test]
    #[serial]
    fn test_from_env_reads_process_environment() {
        // 安全性: serialで他の環境変数テストと同時に実行されない
        unsafe {
            std::env::set_var(REGION_ENV, "ap-northeast-1");
            std::env::remove_var(ENDPOINT_URL_ENV);
            std::env::remove_var(OPERATION_TIMEOUT_ENV);
        }

        let settings = DynamoDbSettings::from_env().unwrap();
        assert_eq!(settings.region(), "ap-northeast-1");
        assert_eq!(settings.endpoint_url(), None);

        // 安全性: 同上
        unsafe {
            std::env::remove_var(REGION_ENV);
        }
    }

    #[tokio::test]
    #[serial]
    async fn test_load_applies_region() {
        let settings = DynamoDbSettings::new("us-west-2")
            .with_endpoint_url("http://localhost:8000")
            .with_operation_timeout(Duration::from_secs(3));

        let config = DynamoDbConfig::load(settings.clone()).await;

        assert_eq!(config.settings(), &settings);
        assert_eq!(
            config.client().config().region().map(ToString::to_string),
            Some("us-west-2".to_string())
        );
    }
}
