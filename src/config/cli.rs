use super::{DomainCheckConfig, SendConfig};
use crate::core::source::Delimiter;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "pigeon")]
#[command(about = "Bulk domain validation and email dispatch", version)]
pub struct CliConfig {
    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,

    #[arg(long, global = true, env = "PIGEON_ERROR_LOG", help = "Append-only error log (default errors.log)")]
    pub error_log: Option<String>,

    #[arg(short = 'c', long, global = true, env = "PIGEON_CONFIG", help = "TOML config file")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check that each domain has MX records and a reachable SMTP server
    Domain(DomainArgs),
    /// Send one message to every recipient in a CSV file
    Send(SendArgs),
}

#[derive(Debug, Args)]
pub struct DomainArgs {
    #[arg(short = 'f', long = "file", env = "PIGEON_CSV_FILE")]
    pub file: PathBuf,

    #[arg(long, env = "PIGEON_CONCURRENCY")]
    pub concurrency: Option<usize>,

    #[arg(long, value_enum)]
    pub delimiter: Option<Delimiter>,

    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    #[arg(long)]
    pub queue_capacity: Option<usize>,

    #[arg(long)]
    pub dns_timeout_secs: Option<u64>,

    #[arg(long)]
    pub smtp_timeout_secs: Option<u64>,

    #[arg(long)]
    pub smtp_port: Option<u16>,

    #[arg(long)]
    pub max_attempts: Option<u32>,

    #[arg(long)]
    pub backoff_ms: Option<u64>,
}

impl DomainArgs {
    /// 命令列參數覆蓋 TOML 設定
    pub fn apply(&self, config: &mut DomainCheckConfig) {
        config.input = Some(self.file.clone());
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(delimiter) = self.delimiter {
            config.delimiter = delimiter;
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(capacity) = self.queue_capacity {
            config.queue_capacity = capacity;
        }
        if let Some(secs) = self.dns_timeout_secs {
            config.dns_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.smtp_timeout_secs {
            config.smtp_timeout = Duration::from_secs(secs);
        }
        if let Some(port) = self.smtp_port {
            config.smtp_port = port;
        }
        if let Some(attempts) = self.max_attempts {
            config.max_attempts = attempts;
        }
        if let Some(ms) = self.backoff_ms {
            config.backoff_step = Duration::from_millis(ms);
        }
    }
}

#[derive(Debug, Args)]
pub struct SendArgs {
    #[arg(short = 'f', long = "file", env = "PIGEON_CSV_FILE")]
    pub file: PathBuf,

    #[arg(long, env = "PIGEON_SENDER")]
    pub sender: Option<String>,

    #[arg(long, env = "PIGEON_SUBJECT")]
    pub subject: Option<String>,

    #[arg(long, env = "PIGEON_BODY")]
    pub body: Option<String>,

    #[arg(long, env = "PIGEON_CSV_SKIP_ROWS")]
    pub skip_rows: Option<usize>,

    #[arg(long, env = "PIGEON_BATCH_SIZE")]
    pub batch_size: Option<usize>,

    #[arg(long, env = "PIGEON_ENDPOINT")]
    pub endpoint: Option<String>,

    #[arg(long, env = "PIGEON_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, help = "Skip recipients whose address or MX records fail validation")]
    pub verify_recipients: bool,
}

impl SendArgs {
    pub fn apply(&self, config: &mut SendConfig) {
        config.input = Some(self.file.clone());
        if self.sender.is_some() {
            config.sender = self.sender.clone();
        }
        if self.subject.is_some() {
            config.subject = self.subject.clone();
        }
        if self.body.is_some() {
            config.body = self.body.clone();
        }
        if let Some(skip_rows) = self.skip_rows {
            config.skip_rows = skip_rows;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if self.endpoint.is_some() {
            config.endpoint = self.endpoint.clone();
        }
        if self.api_key.is_some() {
            config.api_key = self.api_key.clone();
        }
        if self.verify_recipients {
            config.verify_recipients = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TomlConfig;

    #[test]
    fn test_domain_flags_override_toml() {
        let cli = CliConfig::try_parse_from([
            "pigeon",
            "--verbose",
            "domain",
            "-f",
            "domains.tsv",
            "--concurrency",
            "3",
            "--delimiter",
            "comma",
        ])
        .unwrap();
        assert!(cli.verbose);

        let toml = TomlConfig::from_toml_str("[validation]\nconcurrency = 20\nsmtp_port = 2525\n").unwrap();
        let mut config = DomainCheckConfig::from_toml(&toml);
        let Command::Domain(args) = &cli.command else {
            panic!("expected domain subcommand");
        };
        args.apply(&mut config);

        assert_eq!(config.input, Some(PathBuf::from("domains.tsv")));
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.delimiter, Delimiter::Comma);
        assert_eq!(config.smtp_port, 2525);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = CliConfig::try_parse_from([
            "pigeon",
            "domain",
            "--file",
            "d.tsv",
            "--log-format",
            "json",
            "--error-log",
            "run.log",
        ])
        .unwrap();
        assert_eq!(cli.log_format, LogFormat::Json);
        assert_eq!(cli.error_log.as_deref(), Some("run.log"));
    }

    #[test]
    fn test_send_args() {
        let cli = CliConfig::try_parse_from([
            "pigeon",
            "send",
            "-f",
            "recipients.csv",
            "--sender",
            "news@example.com",
            "--subject",
            "Hello",
            "--body",
            "<p>Hi</p>",
            "--endpoint",
            "https://mail.example.com/send",
            "--batch-size",
            "25",
            "--verify-recipients",
        ])
        .unwrap();

        let Command::Send(args) = &cli.command else {
            panic!("expected send subcommand");
        };
        let mut config = SendConfig::default();
        args.apply(&mut config);
        assert_eq!(config.batch_size, 25);
        assert!(config.verify_recipients);
        assert_eq!(config.sender.as_deref(), Some("news@example.com"));
        assert_eq!(config.endpoint.as_deref(), Some("https://mail.example.com/send"));
    }

    #[test]
    fn test_invalid_delimiter_is_rejected() {
        let result = CliConfig::try_parse_from(["pigeon", "domain", "-f", "d.tsv", "--delimiter", "pipe"]);
        assert!(result.is_err());
    }
}
