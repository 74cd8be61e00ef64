use crate::domain::model::{DnsFailure, Domain, MxRecord, ValidationResult};
use crate::domain::ports::{AddressCheck, MxResolver, SmtpProbe};
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

pub const ERR_EMPTY_OR_TOO_LONG: &str = "invalid empty or too long";
pub const ERR_DOMAIN_FORMAT: &str = "invalid domain format";
pub const ERR_EMAIL_FORMAT: &str = "invalid email format";
pub const ERR_NO_MX_RECORDS: &str = "no MX records found";
pub const ERR_NO_REACHABLE_SMTP: &str = "no reachable SMTP server found";

const MAX_DOMAIN_LEN: usize = 255;
const MAX_EMAIL_LEN: usize = 254;

static HOSTNAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("hostname pattern is valid")
});

/// Offline syntax gate run before any network access.
pub fn check_format(domain: &str) -> Result<(), &'static str> {
    if domain.is_empty() || domain.len() > MAX_DOMAIN_LEN {
        return Err(ERR_EMPTY_OR_TOO_LONG);
    }
    if !HOSTNAME.is_match(domain) {
        return Err(ERR_DOMAIN_FORMAT);
    }
    Ok(())
}

fn lookup_error(failure: &DnsFailure) -> String {
    format!("failed to lookup MX records: {}", failure)
}

#[derive(Debug, Clone)]
pub struct ValidatorSettings {
    /// Total MX lookups allowed when the resolver keeps failing temporarily.
    pub max_attempts: u32,
    /// Delay after the n-th temporary failure is `n * backoff_step`.
    pub backoff_step: Duration,
    pub smtp_port: u16,
}

impl Default for ValidatorSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_step: Duration::from_millis(100),
            smtp_port: 25,
        }
    }
}

/// 網域驗證：格式檢查 → MX 查詢（含重試）→ SMTP 連線探測
pub struct DomainValidator<R: MxResolver, P: SmtpProbe> {
    resolver: R,
    prober: P,
    settings: ValidatorSettings,
}

impl<R: MxResolver, P: SmtpProbe> DomainValidator<R, P> {
    pub fn new(resolver: R, prober: P) -> Self {
        Self::with_settings(resolver, prober, ValidatorSettings::default())
    }

    pub fn with_settings(resolver: R, prober: P, settings: ValidatorSettings) -> Self {
        Self {
            resolver,
            prober,
            settings,
        }
    }

    pub fn settings(&self) -> &ValidatorSettings {
        &self.settings
    }

    pub async fn validate(&self, domain: Domain) -> ValidationResult {
        if let Err(reason) = check_format(domain.as_str()) {
            tracing::debug!("{}: {}", domain, reason);
            return ValidationResult::invalid(domain, reason);
        }

        let records = match self.resolve_with_retry(domain.as_str()).await {
            Ok(records) => records,
            Err(reason) => {
                tracing::debug!("{}: {}", domain, reason);
                return ValidationResult::invalid(domain, reason);
            }
        };

        match self.probe_any(&records).await {
            Some(host) => {
                tracing::debug!("{}: SMTP reachable via {}", domain, host);
                ValidationResult::valid(domain)
            }
            None => ValidationResult::invalid(domain, ERR_NO_REACHABLE_SMTP),
        }
    }

    /// Checks an address's syntax and that its domain publishes MX records.
    /// No SMTP probe is made. Returns the normalized domain on success.
    pub async fn validate_email(&self, address: &str) -> Result<Domain, String> {
        if address.is_empty() || address.len() > MAX_EMAIL_LEN {
            return Err(ERR_EMPTY_OR_TOO_LONG.to_string());
        }

        let mut parts = address.split('@');
        let domain = match (parts.next(), parts.next(), parts.next()) {
            (Some(_), Some(domain), None) => Domain::new(domain),
            _ => return Err(ERR_EMAIL_FORMAT.to_string()),
        };

        if !HOSTNAME.is_match(domain.as_str()) {
            return Err(ERR_DOMAIN_FORMAT.to_string());
        }

        match self.resolver.lookup_mx(domain.as_str()).await {
            Ok(records) if records.is_empty() => Err(ERR_NO_MX_RECORDS.to_string()),
            Ok(_) => Ok(domain),
            Err(failure) => Err(lookup_error(&failure)),
        }
    }

    async fn resolve_with_retry(&self, domain: &str) -> Result<Vec<MxRecord>, String> {
        let mut last_failure = None;

        for attempt in 1..=self.settings.max_attempts {
            match self.resolver.lookup_mx(domain).await {
                Ok(records) if records.is_empty() => return Err(ERR_NO_MX_RECORDS.to_string()),
                Ok(records) => return Ok(records),
                Err(failure) if failure.is_temporary() => {
                    let delay = self.settings.backoff_step * attempt;
                    tracing::debug!(
                        "MX lookup for {} failed temporarily (attempt {}/{}): {}; retrying in {:?}",
                        domain,
                        attempt,
                        self.settings.max_attempts,
                        failure,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    last_failure = Some(failure);
                }
                Err(failure) => return Err(lookup_error(&failure)),
            }
        }

        Err(match last_failure {
            Some(failure) => lookup_error(&failure),
            None => "failed to lookup MX records: no attempts made".to_string(),
        })
    }

    // 依解析器回傳順序逐一嘗試，不依 preference 排序
    async fn probe_any<'a>(&self, records: &'a [MxRecord]) -> Option<&'a str> {
        for record in records {
            match self.prober.connect(&record.host, self.settings.smtp_port).await {
                Ok(()) => return Some(record.host.as_str()),
                Err(e) => tracing::debug!(
                    "SMTP probe {}:{} failed: {}",
                    record.host,
                    self.settings.smtp_port,
                    e
                ),
            }
        }
        None
    }
}

#[async_trait]
impl<R: MxResolver, P: SmtpProbe> AddressCheck for DomainValidator<R, P> {
    async fn check(&self, address: &str) -> Result<(), String> {
        self.validate_email(address.trim()).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::DnsFailureKind;
    use std::collections::{HashSet, VecDeque};
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    type LookupReply = std::result::Result<Vec<MxRecord>, DnsFailure>;

    #[derive(Clone, Default)]
    struct MockResolver {
        replies: Arc<Mutex<VecDeque<LookupReply>>>,
        fallback: Option<LookupReply>,
        calls: Arc<Mutex<Vec<Instant>>>,
    }

    impl MockResolver {
        fn scripted(replies: Vec<LookupReply>) -> Self {
            Self {
                replies: Arc::new(Mutex::new(replies.into())),
                ..Default::default()
            }
        }

        fn always(reply: LookupReply) -> Self {
            Self {
                fallback: Some(reply),
                ..Default::default()
            }
        }

        fn call_times(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MxResolver for MockResolver {
        async fn lookup_mx(&self, _domain: &str) -> LookupReply {
            self.calls.lock().unwrap().push(Instant::now());
            let scripted = self.replies.lock().unwrap().pop_front();
            scripted
                .or_else(|| self.fallback.clone())
                .expect("no scripted reply left")
        }
    }

    #[derive(Clone, Default)]
    struct MockProbe {
        reachable: HashSet<String>,
        attempts: Arc<Mutex<Vec<(String, u16)>>>,
    }

    impl MockProbe {
        fn reaching(hosts: &[&str]) -> Self {
            Self {
                reachable: hosts.iter().map(|h| h.to_string()).collect(),
                ..Default::default()
            }
        }

        fn attempted_hosts(&self) -> Vec<String> {
            self.attempts
                .lock()
                .unwrap()
                .iter()
                .map(|(host, _)| host.clone())
                .collect()
        }
    }

    #[async_trait]
    impl SmtpProbe for MockProbe {
        async fn connect(&self, host: &str, port: u16) -> std::io::Result<()> {
            self.attempts.lock().unwrap().push((host.to_string(), port));
            if self.reachable.contains(host) {
                Ok(())
            } else {
                Err(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "connection refused",
                ))
            }
        }
    }

    fn mx(hosts: &[&str]) -> LookupReply {
        Ok(hosts
            .iter()
            .enumerate()
            .map(|(i, h)| MxRecord::new(*h, (i as u16 + 1) * 10))
            .collect())
    }

    fn temporary() -> LookupReply {
        Err(DnsFailure::new(DnsFailureKind::Timeout, "request timed out"))
    }

    #[test]
    fn test_check_format() {
        assert!(check_format("example.com").is_ok());
        assert!(check_format("mail-1.sub.example.co").is_ok());
        assert_eq!(check_format(""), Err(ERR_EMPTY_OR_TOO_LONG));
        assert_eq!(
            check_format(&format!("{}.com", "a".repeat(252))),
            Err(ERR_EMPTY_OR_TOO_LONG)
        );
        assert_eq!(check_format("localhost"), Err(ERR_DOMAIN_FORMAT));
        assert_eq!(check_format("example.c"), Err(ERR_DOMAIN_FORMAT));
        assert_eq!(check_format("example.c0m"), Err(ERR_DOMAIN_FORMAT));
        assert_eq!(check_format("exa mple.com"), Err(ERR_DOMAIN_FORMAT));
        assert_eq!(check_format("user@example.com"), Err(ERR_DOMAIN_FORMAT));
    }

    #[tokio::test]
    async fn test_malformed_domains_never_touch_the_network() {
        let resolver = MockResolver::always(mx(&["mx.example.com"]));
        let probe = MockProbe::reaching(&["mx.example.com"]);
        let validator = DomainValidator::new(resolver.clone(), probe.clone());

        for raw in ["", "   ", "no-dot", "bad_tld.c", "under_score.123", "a b.com"] {
            let result = validator.validate(Domain::new(raw)).await;
            assert!(!result.valid, "{raw:?} should be invalid");
            assert!(result.error.is_some());
        }

        assert!(resolver.call_times().is_empty());
        assert!(probe.attempted_hosts().is_empty());
    }

    #[tokio::test]
    async fn test_zero_mx_records_fails_without_probe_or_retry() {
        let resolver = MockResolver::always(Ok(vec![]));
        let probe = MockProbe::default();
        let validator = DomainValidator::new(resolver.clone(), probe.clone());

        let result = validator.validate(Domain::new("x.invalidtld")).await;

        assert!(!result.valid);
        assert_eq!(result.error.as_deref(), Some("no MX records found"));
        assert_eq!(resolver.call_times().len(), 1);
        assert!(probe.attempted_hosts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_temporary_failures_retry_three_times_with_linear_backoff() {
        let resolver = MockResolver::always(temporary());
        let validator = DomainValidator::new(resolver.clone(), MockProbe::default());

        let started = Instant::now();
        let result = validator.validate(Domain::new("flaky.example")).await;
        let elapsed = started.elapsed();

        assert!(!result.valid);
        assert_eq!(
            result.error.as_deref(),
            Some("failed to lookup MX records: request timed out")
        );

        let calls = resolver.call_times();
        assert_eq!(calls.len(), 3);

        let tolerance = Duration::from_millis(5);
        let first_gap = calls[1] - calls[0];
        let second_gap = calls[2] - calls[1];
        assert!(first_gap >= Duration::from_millis(100) && first_gap < Duration::from_millis(100) + tolerance);
        assert!(second_gap >= Duration::from_millis(200) && second_gap < Duration::from_millis(200) + tolerance);
        // the third failure still backs off for 300ms before giving up
        assert!(elapsed >= Duration::from_millis(600) && elapsed < Duration::from_millis(600) + tolerance);
    }

    #[tokio::test(start_paused = true)]
    async fn test_temporary_failure_then_success() {
        let resolver = MockResolver::scripted(vec![temporary(), mx(&["mx1.example.com"])]);
        let probe = MockProbe::reaching(&["mx1.example.com"]);
        let validator = DomainValidator::new(resolver.clone(), probe);

        let result = validator.validate(Domain::new("example.com")).await;

        assert!(result.valid);
        assert_eq!(result.error, None);
        assert_eq!(resolver.call_times().len(), 2);
    }

    #[tokio::test]
    async fn test_permanent_failure_stops_immediately() {
        let resolver = MockResolver::always(Err(DnsFailure::new(
            DnsFailureKind::NotFound,
            "no such domain",
        )));
        let validator = DomainValidator::new(resolver.clone(), MockProbe::default());

        let result = validator.validate(Domain::new("missing.example")).await;

        assert!(!result.valid);
        assert_eq!(
            result.error.as_deref(),
            Some("failed to lookup MX records: no such domain")
        );
        assert_eq!(resolver.call_times().len(), 1);
    }

    #[tokio::test]
    async fn test_all_hosts_unreachable_are_probed_in_resolver_order() {
        // preference order is deliberately reversed relative to list order
        let resolver = MockResolver::always(Ok(vec![
            MxRecord::new("mx3.example.com", 30),
            MxRecord::new("mx1.example.com", 10),
            MxRecord::new("mx2.example.com", 20),
        ]));
        let probe = MockProbe::default();
        let validator = DomainValidator::new(resolver, probe.clone());

        let result = validator.validate(Domain::new("example.com")).await;

        assert!(!result.valid);
        assert_eq!(result.error.as_deref(), Some("no reachable SMTP server found"));
        assert_eq!(
            probe.attempted_hosts(),
            vec!["mx3.example.com", "mx1.example.com", "mx2.example.com"]
        );
    }

    #[tokio::test]
    async fn test_first_reachable_host_ends_probing() {
        let resolver = MockResolver::always(mx(&["a.mx.test", "b.mx.test", "c.mx.test"]));
        let probe = MockProbe::reaching(&["b.mx.test", "c.mx.test"]);
        let validator = DomainValidator::new(resolver, probe.clone());

        let result = validator.validate(Domain::new("Example.COM ")).await;

        assert!(result.valid);
        assert_eq!(result.domain.as_str(), "example.com");
        assert_eq!(probe.attempted_hosts(), vec!["a.mx.test", "b.mx.test"]);
        assert!(probe.attempts.lock().unwrap().iter().all(|(_, port)| *port == 25));
    }

    #[tokio::test]
    async fn test_custom_smtp_port_is_used() {
        let resolver = MockResolver::always(mx(&["mx.example.com"]));
        let probe = MockProbe::reaching(&["mx.example.com"]);
        let settings = ValidatorSettings {
            smtp_port: 2525,
            ..Default::default()
        };
        let validator = DomainValidator::with_settings(resolver, probe.clone(), settings);

        assert!(validator.validate(Domain::new("example.com")).await.valid);
        assert_eq!(
            probe.attempts.lock().unwrap().clone(),
            vec![("mx.example.com".to_string(), 2525)]
        );
    }

    #[tokio::test]
    async fn test_validate_email() {
        let resolver = MockResolver::scripted(vec![
            mx(&["gmail-smtp-in.l.google.com"]),
            Ok(vec![]),
            Err(DnsFailure::new(DnsFailureKind::NotFound, "no such domain")),
        ]);
        let validator = DomainValidator::new(resolver.clone(), MockProbe::default());

        assert_eq!(
            validator.validate_email("user@Gmail.COM ").await,
            Ok(Domain::new("gmail.com"))
        );
        assert_eq!(
            validator.validate_email("user@nomx.example").await,
            Err(ERR_NO_MX_RECORDS.to_string())
        );
        assert_eq!(
            validator.validate_email("user@hanmail.ner").await,
            Err("failed to lookup MX records: no such domain".to_string())
        );
        assert_eq!(
            validator.validate_email("").await,
            Err(ERR_EMPTY_OR_TOO_LONG.to_string())
        );
        assert_eq!(
            validator.validate_email("no-at-sign").await,
            Err(ERR_EMAIL_FORMAT.to_string())
        );
        assert_eq!(
            validator.validate_email("a@b@example.com").await,
            Err(ERR_EMAIL_FORMAT.to_string())
        );
        assert_eq!(
            validator.validate_email("user@localhost").await,
            Err(ERR_DOMAIN_FORMAT.to_string())
        );
        assert_eq!(resolver.call_times().len(), 3);
    }

    #[tokio::test]
    async fn test_address_check_skips_smtp_probe() {
        let resolver = MockResolver::scripted(vec![mx(&["mx.example.com"]), Ok(vec![])]);
        let probe = MockProbe::default();
        let validator = DomainValidator::new(resolver, probe.clone());
        let check: &dyn AddressCheck = &validator;

        assert_eq!(check.check(" user@example.com ").await, Ok(()));
        assert_eq!(
            check.check("user@nomx.example").await,
            Err(ERR_NO_MX_RECORDS.to_string())
        );
        assert!(probe.attempted_hosts().is_empty());
    }
}
