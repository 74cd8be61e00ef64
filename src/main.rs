use anyhow::Context;
use clap::Parser;
use pigeon::adapters::dns::DEFAULT_DNS_TIMEOUT;
use pigeon::config::{self, Command, DomainArgs, LogFormat, SendArgs};
use pigeon::utils::error::{ErrorSeverity, PigeonError};
use pigeon::utils::{logger, validation::Validate};
use pigeon::{
    Cancellation, CliConfig, Dispatcher, DomainCheckConfig, DomainCheckEngine, DomainValidator,
    HickoryMxResolver, HttpEmailSender, SendConfig, TcpSmtpProbe, TomlConfig,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let toml = match &cli.config {
        Some(path) => match TomlConfig::from_file(path).and_then(|t| t.validate().map(|_| t)) {
            Ok(toml) => toml,
            Err(e) => {
                eprintln!("❌ {}", e.user_friendly_message());
                eprintln!("💡 建議: {}", e.recovery_suggestion());
                std::process::exit(1);
            }
        },
        None => TomlConfig::default(),
    };

    // 錯誤日誌建立失敗即中止
    let error_log_path = config::resolve_error_log(cli.error_log.as_deref(), &toml);
    let error_log = logger::open_error_log(&error_log_path)
        .with_context(|| format!("failed to create error log {}", error_log_path))?;
    match cli.log_format {
        LogFormat::Compact => logger::init_cli_logger(cli.verbose, error_log),
        LogFormat::Json => logger::init_json_logger(cli.verbose, error_log),
    }

    tracing::info!("Starting pigeon");
    if cli.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    let cancel = Cancellation::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping");
            ctrl_c.cancel();
        }
    });

    let outcome = match &cli.command {
        Command::Domain(args) => run_domain(args, &toml, cli.monitor, cancel).await,
        Command::Send(args) => run_send(args, &toml, cancel).await,
    };

    if let Err(e) = outcome {
        report_failure(&e);
    }

    Ok(())
}

async fn run_domain(
    args: &DomainArgs,
    toml: &TomlConfig,
    monitor: bool,
    cancel: Cancellation,
) -> pigeon::Result<()> {
    let mut config = DomainCheckConfig::from_toml(toml);
    args.apply(&mut config);
    config.validate()?;
    tracing::debug!("Domain check config: {:?}", config);

    let resolver = HickoryMxResolver::from_system_conf(config.dns_timeout)?;
    let probe = TcpSmtpProbe::new(config.smtp_timeout);
    let validator = DomainValidator::with_settings(resolver, probe, config.validator_settings());
    let settings = config.pipeline_settings()?;

    let engine = DomainCheckEngine::new(Arc::new(validator), settings.clone()).with_monitoring(monitor);
    let summary = engine.run(cancel).await?;

    println!("{}", summary);
    println!("✅ Domain check completed successfully!");
    println!(
        "📁 Results saved to: {} and {}",
        settings.valid_path().display(),
        settings.invalid_path().display()
    );
    Ok(())
}

async fn run_send(args: &SendArgs, toml: &TomlConfig, cancel: Cancellation) -> pigeon::Result<()> {
    let mut config = SendConfig::from_toml(toml);
    args.apply(&mut config);
    config.validate()?;

    let sender = HttpEmailSender::new(
        config.endpoint()?.to_string(),
        config.api_key.clone(),
        config.timeout,
    )?;
    let mut dispatcher = Dispatcher::new(sender, config.dispatch_settings()?);
    if config.verify_recipients {
        let resolver = HickoryMxResolver::from_system_conf(DEFAULT_DNS_TIMEOUT)?;
        let validator = DomainValidator::new(resolver, TcpSmtpProbe::default());
        dispatcher = dispatcher.with_address_check(Arc::new(validator));
        tracing::info!("Recipient verification enabled");
    }

    let input = pigeon::utils::validation::validate_required_field("file", &config.input)?;
    let processed = dispatcher.run_file(input, cancel).await?;

    println!("✅ Email sending completed, processed {} recipients", processed);
    Ok(())
}

fn report_failure(e: &PigeonError) {
    tracing::error!(
        "❌ Run failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    if exit_code > 0 {
        std::process::exit(exit_code);
    }
}
