use crate::application::receiver::{DEFAULT_MAX_EMPTY_RETRIES, RetryPolicy};
use crate::domain::ports::ConnectionTarget;
use clap::Args;
use std::fmt;
use std::time::Duration;

/// Connection and polling settings, taken from flags or the environment.
#[derive(Args, Clone)]
pub struct ResponderConfig {
    /// Connection target, as `host(port)`
    #[arg(long, env = "MQ_CONNECTION", default_value = "localhost(1414)")]
    pub connection: String,

    /// Queue manager to connect to
    #[arg(long, env = "MQ_QMGR", default_value = "QM1")]
    pub queue_manager: String,

    /// Application user to authenticate as
    #[arg(long, env = "APP_USER")]
    pub app_user: Option<String>,

    /// Password for the application user
    #[arg(long, env = "APP_PASSWORD", hide_env_values = true)]
    pub app_password: Option<String>,

    /// Queue requests are read from
    #[arg(long, env = "QUEUE_NAME", default_value = "DEV.QUEUE.1")]
    pub queue_name: String,

    /// Reply queue for requests that do not name one
    #[arg(long, env = "REPLY_QUEUE_NAME")]
    pub reply_queue_name: Option<String>,

    /// Consecutive empty waits before the responder stops
    #[arg(long, env = "MQ_MAX_RETRIES", default_value_t = DEFAULT_MAX_EMPTY_RETRIES)]
    pub max_retries: u32,

    /// How long each receive waits for a message, in milliseconds
    #[arg(long, env = "MQ_WAIT_INTERVAL_MS", default_value_t = 3000)]
    pub wait_interval_ms: u64,

    /// Name stamped into reply greetings
    #[arg(long, env = "RESPONDER_INSTANCE", default_value = "rust")]
    pub instance: String,
}

impl ResponderConfig {
    pub fn connection_target(&self) -> ConnectionTarget {
        ConnectionTarget {
            connection: self.connection.clone(),
            queue_manager: self.queue_manager.clone(),
            user: self.app_user.clone(),
            password: self.app_password.clone(),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            Duration::from_millis(self.wait_interval_ms),
        )
    }

    /// Logs where the responder will connect. The password is never logged.
    pub fn log_settings(&self) {
        tracing::info!(
            connection = %self.connection,
            queue_manager = %self.queue_manager,
            user = self.app_user.as_deref().unwrap_or("<none>"),
            queue = %self.queue_name,
            "settings"
        );
    }
}

impl fmt::Debug for ResponderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponderConfig")
            .field("connection", &self.connection)
            .field("queue_manager", &self.queue_manager)
            .field("app_user", &self.app_user)
            .field("app_password", &self.app_password.as_ref().map(|_| "****"))
            .field("queue_name", &self.queue_name)
            .field("reply_queue_name", &self.reply_queue_name)
            .field("max_retries", &self.max_retries)
            .field("wait_interval_ms", &self.wait_interval_ms)
            .field("instance", &self.instance)
            .finish()
    }
}
