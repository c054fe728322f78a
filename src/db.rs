use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use tokio_postgres::config::SslMode;
use tracing::{debug, info};

use crate::config::{DatabaseParams, SslPreference};
use crate::error::ProbeResult;

pub type ProbeFuture<'a> = Pin<Box<dyn Future<Output = ProbeResult<()>> + Send + 'a>>;

/// 1 リクエストにつき 1 回、DB へ接続してすぐ切断するための抽象。
/// ハンドラはこのトレイト越しにしか DB を触らないので、テストでは差し替えられる。
pub trait Connector: Send + Sync {
    fn connect_and_close<'a>(
        &'a self,
        params: &'a DatabaseParams,
        tracker: &'a ConnectionTracker,
    ) -> ProbeFuture<'a>;
}

/// プロセスが今いくつ接続を握っているかを数えるカウンタ。
/// `Arc` の中身は atomic だけなので、ロックなしで複数リクエストから共有できる。
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    inner: Arc<TrackerInner>,
}

#[derive(Debug, Default)]
struct TrackerInner {
    open: AtomicUsize,
    probes: AtomicU64,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_connections(&self) -> usize {
        self.inner.open.load(Ordering::SeqCst)
    }

    pub fn probes_started(&self) -> u64 {
        self.inner.probes.load(Ordering::SeqCst)
    }

    pub fn record_probe(&self) {
        self.inner.probes.fetch_add(1, Ordering::SeqCst);
    }

    /// Marks a connection as open until the returned guard is dropped.
    pub fn open(&self) -> OpenConnection {
        self.inner.open.fetch_add(1, Ordering::SeqCst);
        OpenConnection {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// `Drop` でカウンタを戻す RAII ガード。途中で `?` により抜けても必ず減算される。
#[derive(Debug)]
pub struct OpenConnection {
    inner: Arc<TrackerInner>,
}

impl Drop for OpenConnection {
    fn drop(&mut self) {
        self.inner.open.fetch_sub(1, Ordering::SeqCst);
    }
}

/// `tokio-postgres` による本番用の実装。
/// プールは持たず、毎回新しい接続を張って、その場で閉じる。
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresConnector;

impl PostgresConnector {
    pub fn new() -> Self {
        Self
    }

    fn pg_config(params: &DatabaseParams) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&params.host)
            .port(params.port)
            .dbname(&params.database)
            .user(&params.user)
            .password(&params.password)
            .application_name("compose-lab")
            .ssl_mode(Self::ssl_mode(params.ssl_mode));
        config
    }

    /// `DB_SSLMODE` の値を `tokio-postgres` の `SslMode` に写す。
    /// 公式イメージは TLS 無効なので、既定の `Prefer` なら平文 TCP にフォールバックする。
    fn ssl_mode(preference: SslPreference) -> SslMode {
        match preference {
            SslPreference::Disable => SslMode::Disable,
            SslPreference::Prefer => SslMode::Prefer,
            SslPreference::Require => SslMode::Require,
        }
    }

    /// libpq の prefer / require と同じく、暗号化だけを行い証明書とホスト名は検証しない。
    /// 自己署名証明書 (snakeoil) の DB でも、正しい資格情報なら接続できる。
    fn tls_connector() -> ProbeResult<MakeTlsConnector> {
        let connector = TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .build()?;
        Ok(MakeTlsConnector::new(connector))
    }

    async fn probe(params: &DatabaseParams, tracker: &ConnectionTracker) -> ProbeResult<()> {
        let tls = Self::tls_connector()?;

        debug!(host = %params.host, port = params.port, database = %params.database, "Connecting to PostgreSQL");
        let (client, connection) = Self::pg_config(params).connect(tls).await?;
        let guard = tracker.open();

        let driver = tokio::spawn(connection);

        // Dropping the client makes the driver send Terminate and finish.
        drop(client);
        driver.await??;
        drop(guard);

        info!(host = %params.host, database = %params.database, "PostgreSQL connection opened and closed");
        Ok(())
    }
}

impl Connector for PostgresConnector {
    fn connect_and_close<'a>(
        &'a self,
        params: &'a DatabaseParams,
        tracker: &'a ConnectionTracker,
    ) -> ProbeFuture<'a> {
        Box::pin(Self::probe(params, tracker))
    }
}
