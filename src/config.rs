use clap::Parser;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Args {
    /// Peers not seen for this many seconds are dropped by the sweeper
    #[arg(long, default_value = "300", help = "Maximum peer age, in seconds")]
    pub max_age: u64,

    #[arg(long, default_value = "30", help = "Sweep interval, in seconds")]
    pub sweep_interval: u64,

    /// Disable the periodic sweeper; peers are only pruned on request
    #[arg(long)]
    pub no_sweeper: bool,

    /// Do not read commands from stdin
    #[arg(long)]
    pub no_console: bool,
}

impl Args {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.no_sweeper && self.sweep_interval == 0 {
            return Err("--sweep-interval must be greater than zero".into());
        }
        Ok(())
    }
}
