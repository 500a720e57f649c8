use clap::Parser;
use miette::{IntoDiagnostic, Result};
use mq_responder::application::responder::Responder;
use mq_responder::application::transform::SquareValue;
use mq_responder::config::ResponderConfig;
use mq_responder::domain::ports::QueueConnector;
use mq_responder::error::ResponderError;
use mq_responder::infrastructure::in_memory::{InMemoryConnector, InMemoryQueueManager};
use mq_responder::interfaces::json::reply_writer::ReplyWriter;
use mq_responder::interfaces::json::request_reader::RequestReader;
use std::fs::File;
use std::io::{self, BufReader, IsTerminal};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Requests to place on the source queue, one JSON object per line
    requests: Option<PathBuf>,

    #[command(flatten)]
    config: ResponderConfig,

    /// Make the first N reply sends fail, to exercise rollback
    #[arg(long, default_value_t = 0)]
    fail_sends: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();

    let cli = Cli::parse();
    let config = cli.config;
    tracing::info!("application is starting");
    config.log_settings();

    // Queue manager the responder connects to
    let qmgr = InMemoryQueueManager::new(&config.queue_manager);
    qmgr.define_queue(&config.queue_name).await;
    if let Some(reply_queue) = &config.reply_queue_name {
        qmgr.define_queue(reply_queue).await;
    }
    if let Some(path) = &cli.requests {
        let file = File::open(path).into_diagnostic()?;
        for request in RequestReader::new(BufReader::new(file)).requests() {
            match request {
                Ok(request) => {
                    let reply_to = request.reply_to.unwrap_or_default();
                    if !reply_to.is_empty() {
                        qmgr.define_queue(&reply_to).await;
                    }
                    qmgr.put_request(
                        &config.queue_name,
                        request.payload,
                        &reply_to,
                        request.correlation_id,
                    )
                    .await
                    .into_diagnostic()?;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "error reading request, skipping");
                }
            }
        }
    }
    qmgr.fail_next_sends(cli.fail_sends).await;

    let connector = InMemoryConnector::new(qmgr.clone());
    let target = config.connection_target();
    let transport = connector
        .connect(&target)
        .await
        .map_err(|source| ResponderError::Connection {
            target: target.connection.clone(),
            source,
        })
        .into_diagnostic()?;

    let span = tracing::info_span!(
        "responder",
        instance = %config.instance,
        queue = %config.queue_name
    );
    let responder = Responder::new(
        transport,
        config.queue_name.clone(),
        Box::new(SquareValue::new(config.instance.clone())),
    )
    .with_policy(config.retry_policy())
    .with_fallback_reply_queue(config.reply_queue_name.clone())
    .with_span(span);

    responder.run().await.into_diagnostic()?;

    // Output delivered replies
    let stdout = io::stdout();
    let mut writer = ReplyWriter::new(stdout.lock());
    for queue in qmgr.queue_names().await {
        if queue == config.queue_name {
            continue;
        }
        let replies = qmgr.browse(&queue).await;
        writer.write_replies(&queue, &replies).into_diagnostic()?;
    }

    tracing::info!("application is ending");
    Ok(())
}
