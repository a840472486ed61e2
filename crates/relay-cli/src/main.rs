use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use clap::Parser;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use relay_core::impls::{LoggingBehavior, TimingBehavior};
use relay_core::{
    HandlerResult, Mediator, MediatorBuilder, MediatorConfig, MediatorError, Notification,
    NotificationHandler, Request, RequestHandler,
};

/// relay のデモ: send / publish / send_dyn を一通り流す
#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "In-process mediator demo", long_about = None)]
struct Args {
    /// MediatorConfig の JSON ファイル
    #[arg(short, long, env = "RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Echo に渡す値
    #[arg(long, default_value_t = 5)]
    value: i64,

    /// Handler 0 件の publish をエラーにする（設定ファイルより優先）
    #[arg(long, default_value_t = false)]
    strict: bool,

    /// Ping の Handler を 1 つわざと失敗させる
    #[arg(long, default_value_t = false)]
    fail: bool,
}

struct Echo {
    value: i64,
}

impl Request for Echo {
    type Response = i64;
}

struct EchoHandler;

#[async_trait]
impl RequestHandler<Echo> for EchoHandler {
    async fn handle(&self, request: &Echo, _cancel: &CancellationToken) -> HandlerResult<i64> {
        Ok(request.value * 2)
    }
}

struct Ping;
impl Notification for Ping {}

/// 誰も購読していない notification
struct Shutdown;
impl Notification for Shutdown {}

struct CountingHandler(Arc<AtomicUsize>);

#[async_trait]
impl NotificationHandler<Ping> for CountingHandler {
    async fn handle(&self, _n: &Ping, _cancel: &CancellationToken) -> HandlerResult<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FlakyHandler;

#[async_trait]
impl NotificationHandler<Ping> for FlakyHandler {
    async fn handle(&self, _n: &Ping, _cancel: &CancellationToken) -> HandlerResult<()> {
        Err("intentional failure".into())
    }
}

#[derive(Debug, Serialize)]
struct Report {
    echo: i64,
    echo_dyn: i64,
    ping_delivered: usize,
    ping_failures: Vec<String>,
    shutdown: String,
    cached_request_types: usize,
    cached_notification_types: usize,
}

fn load_config(args: &Args) -> anyhow::Result<MediatorConfig> {
    let config = match &args.config {
        Some(path) => MediatorConfig::from_json_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => MediatorConfig::default(),
    };
    Ok(if args.strict {
        config.with_require_notification_handler(true)
    } else {
        config
    })
}

fn build(config: MediatorConfig, counter: &Arc<AtomicUsize>, fail: bool) -> anyhow::Result<Mediator> {
    let mut builder = MediatorBuilder::new()
        .config(config)
        .request::<Echo, _>(EchoHandler)?
        .behavior::<Echo, _>(LoggingBehavior::new())
        .behavior::<Echo, _>(TimingBehavior::new(Duration::from_millis(100)))
        .notification::<Ping, _>(CountingHandler(counter.clone()))
        .notification::<Ping, _>(CountingHandler(counter.clone()))
        .expect_request::<Echo>();
    if fail {
        builder = builder.notification::<Ping, _>(FlakyHandler);
    }
    Ok(builder.build()?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    // (A) 設定を読み込んで Mediator を組み立てる
    let config = load_config(&args)?;
    info!(?config, "mediator config");
    let counter = Arc::new(AtomicUsize::new(0));
    let mediator = build(config, &counter, args.fail)?;

    // (B) request: 型付き API と dynamic API は同じ thunk を使う
    let echo = mediator.send(Echo { value: args.value }).await?;
    let echo_dyn: i64 = mediator
        .send_dyn_as(Some(Box::new(Echo { value: args.value + 1 })))
        .await?;

    // (C) notification: 失敗は全件まとめて返る
    let ping_failures = match mediator.publish(Ping).await {
        Ok(()) => Vec::new(),
        Err(err) => err.failures().iter().map(ToString::to_string).collect(),
    };

    // (D) 購読者のいない notification は設定次第
    let shutdown = match mediator.publish(Shutdown).await {
        Ok(()) => "ignored".to_string(),
        Err(err @ MediatorError::NoHandlersRegistered { .. }) => err.to_string(),
        Err(err) => return Err(err.into()),
    };

    let report = Report {
        echo,
        echo_dyn,
        ping_delivered: counter.load(Ordering::SeqCst),
        ping_failures,
        shutdown,
        cached_request_types: mediator.cached_request_types(),
        cached_notification_types: mediator.cached_notification_types(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
