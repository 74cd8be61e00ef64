use async_trait::async_trait;
use pigeon::core::source::Delimiter;
use pigeon::core::ProgressReporter;
use pigeon::domain::model::{DnsFailure, DnsFailureKind, MxRecord};
use pigeon::domain::ports::{MxResolver, SmtpProbe};
use pigeon::{Cancellation, DomainCheckEngine, DomainValidator, PigeonError, PipelineSettings};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Answers from a fixed table; unknown names get NXDOMAIN.
#[derive(Default)]
struct TableResolver {
    records: HashMap<String, Vec<MxRecord>>,
}

impl TableResolver {
    fn with(mut self, domain: &str, hosts: &[&str]) -> Self {
        let records = hosts
            .iter()
            .enumerate()
            .map(|(i, host)| MxRecord::new(*host, (i as u16 + 1) * 10))
            .collect();
        self.records.insert(domain.to_string(), records);
        self
    }
}

#[async_trait]
impl MxResolver for TableResolver {
    async fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, DnsFailure> {
        self.records
            .get(domain)
            .cloned()
            .ok_or_else(|| DnsFailure::new(DnsFailureKind::NotFound, format!("{} not found", domain)))
    }
}

#[derive(Default)]
struct OpenHosts {
    open: HashSet<String>,
}

#[async_trait]
impl SmtpProbe for OpenHosts {
    async fn connect(&self, host: &str, _port: u16) -> std::io::Result<()> {
        if self.open.contains(host) {
            Ok(())
        } else {
            Err(std::io::ErrorKind::ConnectionRefused.into())
        }
    }
}

#[derive(Default)]
struct RecordingProgress {
    reports: Mutex<Vec<(u64, u64)>>,
}

impl ProgressReporter for RecordingProgress {
    fn report(&self, processed: u64, total: u64) {
        self.reports.lock().unwrap().push((processed, total));
    }
}

fn engine(
    resolver: TableResolver,
    probe: OpenHosts,
    settings: PipelineSettings,
    progress: Arc<RecordingProgress>,
) -> DomainCheckEngine<TableResolver, OpenHosts> {
    DomainCheckEngine::new(Arc::new(DomainValidator::new(resolver, probe)), settings).with_progress(progress)
}

fn read_rows(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let header = reader.headers().unwrap().iter().map(str::to_string).collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect();
    (header, rows)
}

fn settings_for(dir: &TempDir, input: &str) -> PipelineSettings {
    let path = dir.path().join("domains.tsv");
    std::fs::write(&path, input).unwrap();
    let mut settings = PipelineSettings::new(path);
    settings.output_dir = dir.path().to_path_buf();
    settings
}

fn mixed_fixture() -> (TableResolver, OpenHosts) {
    let resolver = TableResolver::default()
        .with("good.example", &["mx1.good.example", "mx2.good.example"])
        .with("dead.example", &["mx.dead.example"])
        .with("bare.example", &[]);
    let probe = OpenHosts {
        open: ["mx2.good.example".to_string()].into_iter().collect(),
    };
    (resolver, probe)
}

#[tokio::test]
async fn test_end_to_end_classification() {
    let dir = TempDir::new().unwrap();
    let settings = settings_for(
        &dir,
        "Domain\tOwner\nGood.Example\talice\nx.invalidtld\tbob\n\ndead.example\tcarol\nbare.example\nbad_host.c\n",
    );
    let progress = Arc::new(RecordingProgress::default());
    let (resolver, probe) = mixed_fixture();

    let summary = engine(resolver, probe, settings.clone(), Arc::clone(&progress))
        .run(Cancellation::new())
        .await
        .unwrap();

    assert_eq!(summary.total, 5);
    assert_eq!(summary.valid_count, 1);
    assert_eq!(summary.invalid_count, 4);

    let (header, valid) = read_rows(&settings.valid_path());
    assert_eq!(header, vec!["Domain"]);
    assert_eq!(valid, vec![vec!["good.example".to_string()]]);

    let (header, invalid) = read_rows(&settings.invalid_path());
    assert_eq!(header, vec!["Domain", "Error"]);
    let errors: HashMap<String, String> = invalid
        .into_iter()
        .map(|row| (row[0].clone(), row[1].clone()))
        .collect();
    assert_eq!(errors.len(), 4);
    assert!(errors["x.invalidtld"].starts_with("failed to lookup MX records"));
    assert_eq!(errors["dead.example"], "no reachable SMTP server found");
    assert_eq!(errors["bare.example"], "no MX records found");
    assert_eq!(errors["bad_host.c"], "invalid domain format");

    // 少於一個間隔時只會有最後一行進度
    assert_eq!(*progress.reports.lock().unwrap(), vec![(5, 5)]);
}

#[tokio::test]
async fn test_unknown_tld_without_mx_and_unreachable_host() {
    let dir = TempDir::new().unwrap();
    let settings = settings_for(&dir, "Domain\ngood.example\nx.invalidtld\ndead.example\n");
    let (resolver, probe) = mixed_fixture();
    let resolver = resolver.with("x.invalidtld", &[]);

    let summary = engine(resolver, probe, settings.clone(), Arc::default())
        .run(Cancellation::new())
        .await
        .unwrap();

    assert_eq!(summary.total, 3);
    assert_eq!(summary.valid_count, 1);
    assert_eq!(summary.invalid_count, 2);

    let (_, valid) = read_rows(&settings.valid_path());
    let (_, invalid) = read_rows(&settings.invalid_path());
    assert_eq!(valid, vec![vec!["good.example".to_string()]]);

    let mut invalid: Vec<(String, String)> = invalid
        .into_iter()
        .map(|row| (row[0].clone(), row[1].clone()))
        .collect();
    invalid.sort();
    assert_eq!(
        invalid,
        vec![
            ("dead.example".to_string(), "no reachable SMTP server found".to_string()),
            ("x.invalidtld".to_string(), "no MX records found".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_rerun_appends_without_duplicate_header() {
    let dir = TempDir::new().unwrap();
    let settings = settings_for(&dir, "good.example\ndead.example\n");

    for _ in 0..2 {
        let (resolver, probe) = mixed_fixture();
        engine(resolver, probe, settings.clone(), Arc::default())
            .run(Cancellation::new())
            .await
            .unwrap();
    }

    let content = std::fs::read_to_string(settings.valid_path()).unwrap();
    assert_eq!(content, "Domain\ngood.example\ngood.example\n");

    let (_, invalid) = read_rows(&settings.invalid_path());
    assert_eq!(invalid.len(), 2);
}

#[tokio::test]
async fn test_comma_delimited_input() {
    let dir = TempDir::new().unwrap();
    let mut settings = settings_for(&dir, "domain,notes\ngood.example,primary\n");
    settings.delimiter = Delimiter::Comma;
    let (resolver, probe) = mixed_fixture();

    let summary = engine(resolver, probe, settings, Arc::default())
        .run(Cancellation::new())
        .await
        .unwrap();

    assert_eq!(summary.total, 1);
    assert_eq!(summary.valid_count, 1);
}

#[tokio::test]
async fn test_results_do_not_depend_on_concurrency() {
    let mut input = String::from("Domain\n");
    let mut resolver = TableResolver::default();
    let mut open = HashSet::new();
    for i in 0..250 {
        let domain = format!("site{}.example", i);
        let host = format!("mx.{}", domain);
        input.push_str(&domain);
        input.push('\n');
        if i % 3 != 0 {
            resolver = resolver.with(&domain, &[&host]);
        }
        if i % 2 == 0 {
            open.insert(host);
        }
    }
    let resolver = Arc::new(resolver);

    let mut outcomes = Vec::new();
    for concurrency in [1, 10] {
        let dir = TempDir::new().unwrap();
        let mut settings = settings_for(&dir, &input);
        settings.concurrency = concurrency;
        let progress = Arc::new(RecordingProgress::default());

        let table = TableResolver {
            records: resolver.records.clone(),
        };
        let probe = OpenHosts { open: open.clone() };
        let summary = engine(table, probe, settings.clone(), Arc::clone(&progress))
            .run(Cancellation::new())
            .await
            .unwrap();
        assert_eq!(summary.total, 250);
        assert_eq!(summary.valid_count + summary.invalid_count, 250);

        let processed: Vec<u64> = progress.reports.lock().unwrap().iter().map(|r| r.0).collect();
        assert_eq!(processed, vec![100, 200, 250]);

        let (_, mut valid) = read_rows(&settings.valid_path());
        let (_, mut invalid) = read_rows(&settings.invalid_path());
        valid.sort();
        invalid.sort();
        outcomes.push((summary, valid, invalid));
    }

    assert_eq!(outcomes[0], outcomes[1]);
}

#[tokio::test]
async fn test_mid_stream_read_error_is_fatal() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("domains.tsv");
    let mut bytes = b"Domain\ngood.example\n".to_vec();
    bytes.extend_from_slice(b"bad\xff.example\n");
    bytes.extend_from_slice(b"dead.example\n");
    std::fs::write(&path, bytes).unwrap();

    let mut settings = PipelineSettings::new(&path);
    settings.output_dir = dir.path().to_path_buf();
    let cancel = Cancellation::new();
    let (resolver, probe) = mixed_fixture();

    let err = engine(resolver, probe, settings, Arc::default())
        .run(cancel.clone())
        .await
        .unwrap_err();

    assert!(matches!(err, PigeonError::SourceReadError { .. }));
    assert!(cancel.is_cancelled());
}

#[tokio::test]
async fn test_missing_input_file() {
    let dir = TempDir::new().unwrap();
    let mut settings = PipelineSettings::new(dir.path().join("absent.tsv"));
    settings.output_dir = dir.path().to_path_buf();
    let (resolver, probe) = mixed_fixture();

    let err = engine(resolver, probe, settings.clone(), Arc::default())
        .run(Cancellation::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PigeonError::SourceReadError { line: 0, .. }));
    assert!(!settings.valid_path().exists());
}
