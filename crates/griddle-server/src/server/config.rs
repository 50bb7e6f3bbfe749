use crate::server::pool::PoolConfig;
use anyhow::bail;
use clap::Parser;
use core::time::Duration;

pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_NUM_FRYERS: usize = 3;
pub const DEFAULT_FRY_DURATION_MS: u64 = 2_000;
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 5;

/// Runtime configuration for the `griddle-server` binary.
///
/// These settings control how many fryers each session gets, how much work
/// may queue in front of them, how long a portion takes, and how many status
/// events may buffer in front of a slow connection. All values are parsed
/// from CLI arguments or environment variables.
///
/// Every session receives its own copy of the resulting [`ServerConfig`];
/// nothing here is shared mutable state.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "griddle-server",
    version,
    about = "A WebSocket kitchen that turns ingredient events into pancakes"
)]
pub struct CliArgs {
    /// Address to listen on.
    ///
    /// Example: "0.0.0.0:8080" or "127.0.0.1:9000"
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from(DEFAULT_SERVER_ADDR))]
    pub server_addr: String,

    /// Number of fryer workers spawned per session.
    ///
    /// Each fryer cooks exactly one portion at a time.
    ///
    /// Environment variable: `NUM_FRYERS`
    #[arg(long, env = "NUM_FRYERS", default_value_t = DEFAULT_NUM_FRYERS)]
    pub num_fryers: usize,

    /// Number of portion jobs that may be queued or cooking at once.
    ///
    /// When every slot is taken, the session stops reading new ingredients
    /// until a fryer finishes. Defaults to `NUM_FRYERS`, so at most one job
    /// is pending per fryer. Must not be smaller than `NUM_FRYERS`.
    ///
    /// Environment variable: `JOB_QUEUE_CAPACITY`
    #[arg(long, env = "JOB_QUEUE_CAPACITY")]
    pub job_queue_capacity: Option<usize>,

    /// Time, in milliseconds, a fryer holds a portion before it is ready.
    ///
    /// Environment variable: `FRY_DURATION_MS`
    #[arg(long, env = "FRY_DURATION_MS", default_value_t = DEFAULT_FRY_DURATION_MS)]
    pub fry_duration_ms: u64,

    /// Capacity of the outbound status event buffer per session.
    ///
    /// Lower values push backpressure from a slow client onto the fryers
    /// sooner; higher values absorb bursts.
    ///
    /// Environment variable: `EVENT_BUFFER_SIZE`
    #[arg(long, env = "EVENT_BUFFER_SIZE", default_value_t = DEFAULT_EVENT_BUFFER_SIZE)]
    pub event_buffer_size: usize,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_addr: String,
    pub num_fryers: usize,
    pub job_queue_capacity: usize,
    pub fry_duration: Duration,
    pub event_buffer_size: usize,
}

impl ServerConfig {
    /// The slice of configuration each session's fryer pool needs.
    pub const fn pool(&self) -> PoolConfig {
        PoolConfig {
            fryers: self.num_fryers,
            queue_capacity: self.job_queue_capacity,
            fry_duration: self.fry_duration,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_addr: String::from(DEFAULT_SERVER_ADDR),
            num_fryers: DEFAULT_NUM_FRYERS,
            job_queue_capacity: DEFAULT_NUM_FRYERS,
            fry_duration: Duration::from_millis(DEFAULT_FRY_DURATION_MS),
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
        }
    }
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.num_fryers == 0 {
            bail!("NUM_FRYERS must be greater than 0");
        }

        let job_queue_capacity = args.job_queue_capacity.unwrap_or(args.num_fryers);
        if job_queue_capacity < args.num_fryers {
            bail!(
                "JOB_QUEUE_CAPACITY ({}) must be at least NUM_FRYERS ({})",
                job_queue_capacity,
                args.num_fryers
            );
        }

        if args.fry_duration_ms == 0 {
            bail!("FRY_DURATION_MS must be greater than 0");
        }

        if args.event_buffer_size == 0 {
            bail!("EVENT_BUFFER_SIZE must be greater than 0");
        }

        Ok(Self {
            server_addr: args.server_addr,
            num_fryers: args.num_fryers,
            job_queue_capacity,
            fry_duration: Duration::from_millis(args.fry_duration_ms),
            event_buffer_size: args.event_buffer_size,
        })
    }
}
