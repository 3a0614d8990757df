use clap::Parser;
use std::path::PathBuf;

use crate::config::{AppConfig, BackoffStrategy, CONFIG_PATH};
use crate::export::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "subrecon")]
#[command(
    about = "Discover subdomains via DNS brute force, certificate transparency \
             and passive host search, then confirm them with DNS"
)]
#[command(version)]
pub struct Cli {
    /// Target domain (e.g. example.com)
    #[arg(required_unless_present = "init")]
    pub domain: Option<String>,

    /// Create the default configuration file at ./config/subrecon.toml and exit
    #[arg(long)]
    pub init: bool,

    /// Configuration file (embedded defaults are used if it does not exist)
    #[arg(short, long, default_value = CONFIG_PATH)]
    pub config: PathBuf,

    /// Directory for the results file (overrides config)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Txt)]
    pub format: OutputFormat,

    /// Wordlist file for DNS brute force, one word per line (overrides config)
    #[arg(short, long)]
    pub wordlist: Option<PathBuf>,

    /// Maximum concurrent DNS lookups (overrides config)
    #[arg(short = 'j', long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Skip the DNS brute-force source
    #[arg(long)]
    pub no_bruteforce: bool,

    /// Skip the certificate transparency source
    #[arg(long)]
    pub no_ct: bool,

    /// Skip the passive host search source
    #[arg(long)]
    pub no_passive: bool,

    /// Maximum DNS queries per second (0 = unlimited, overrides config)
    #[arg(long, value_name = "QPS")]
    pub dns_rate_limit: Option<u32>,

    /// Retries for timed-out lookups (overrides config)
    #[arg(long, value_name = "COUNT")]
    pub max_retries: Option<u32>,

    /// Delay growth between retries: linear or exponential (overrides config)
    #[arg(long, value_name = "STRATEGY")]
    pub backoff: Option<BackoffStrategy>,

    /// Verbose output (-v shows every resolved host, -vv adds debug detail)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

impl Cli {
    /// Fold command-line overrides into the loaded configuration
    pub fn apply_overrides(&self, config: &mut AppConfig, wordlist: Option<Vec<String>>) {
        if let Some(dir) = &self.output_dir {
            config.output.directory = dir.clone();
        }
        if let Some(words) = wordlist {
            config.discovery.wordlist = words;
        }
        if let Some(concurrency) = self.concurrency {
            config.dns.concurrency = concurrency.max(1);
        }
        if self.no_bruteforce {
            config.discovery.bruteforce_enabled = false;
        }
        if self.no_ct {
            config.discovery.ct_enabled = false;
        }
        if self.no_passive {
            config.discovery.passive_enabled = false;
        }
        if let Some(qps) = self.dns_rate_limit {
            config.rate_limit.dns_queries_per_second = qps;
        }
        if let Some(retries) = self.max_retries {
            config.rate_limit.max_retries = retries;
        }
        if let Some(strategy) = self.backoff {
            config.rate_limit.backoff_strategy = strategy;
        }
    }
}
