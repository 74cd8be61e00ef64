//! MX lookups through `hickory-resolver`, with resolver errors mapped onto
//! [`DnsFailureKind`] so the retry decision stays independent of the
//! resolver library.
//!
//! | resolver outcome                         | mapped to                 |
//! |------------------------------------------|---------------------------|
//! | query timed out                          | `Timeout` (retried)       |
//! | socket / transport I/O error             | `Transport` (retried)     |
//! | answer with rcode SERVFAIL               | `ServerFailure` (retried) |
//! | answer with rcode NXDOMAIN               | `NotFound`                |
//! | answer with rcode REFUSED                | `Refused`                 |
//! | NOERROR answer without MX records        | empty record list         |
//! | any other rcode (FORMERR, NOTIMP, ...)   | `Other`                   |
//! | anything else                            | `Other`                   |

use crate::domain::model::{DnsFailure, DnsFailureKind, MxRecord};
use crate::domain::ports::MxResolver;
use crate::utils::error::{PigeonError, Result};
use async_trait::async_trait;
use hickory_resolver::config::ResolverOpts;
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::proto::op::ResponseCode;
use hickory_resolver::proto::ProtoErrorKind;
use hickory_resolver::{ResolveError, ResolveErrorKind, TokioResolver};
use std::time::Duration;

pub const DEFAULT_DNS_TIMEOUT: Duration = Duration::from_secs(5);

pub struct HickoryMxResolver {
    resolver: TokioResolver,
}

impl HickoryMxResolver {
    /// Uses the system resolver configuration. The resolver makes a single
    /// attempt per query; retries belong to the validator.
    pub fn from_system_conf(timeout: Duration) -> Result<Self> {
        let mut opts = ResolverOpts::default();
        opts.timeout = timeout;
        opts.attempts = 1;

        let resolver = TokioResolver::builder(TokioConnectionProvider::default())
            .map_err(|e| PigeonError::ConfigError {
                message: format!("cannot load system DNS configuration: {}", e),
            })?
            .with_options(opts)
            .build();

        Ok(Self { resolver })
    }
}

#[async_trait]
impl MxResolver for HickoryMxResolver {
    async fn lookup_mx(&self, domain: &str) -> std::result::Result<Vec<MxRecord>, DnsFailure> {
        match self.resolver.mx_lookup(domain).await {
            Ok(lookup) => Ok(lookup
                .iter()
                .map(|mx| {
                    let host = mx.exchange().to_utf8();
                    MxRecord::new(host.trim_end_matches('.'), mx.preference())
                })
                .collect()),
            Err(err) => classify(&err),
        }
    }
}

/// Maps a resolver error to either "no MX records" or a classified failure.
pub fn classify(err: &ResolveError) -> std::result::Result<Vec<MxRecord>, DnsFailure> {
    let message = err.to_string();
    let ResolveErrorKind::Proto(proto) = err.kind() else {
        return Err(DnsFailure::new(DnsFailureKind::Other, message));
    };

    let kind = match proto.kind() {
        ProtoErrorKind::Timeout => DnsFailureKind::Timeout,
        ProtoErrorKind::Io(_) => DnsFailureKind::Transport,
        ProtoErrorKind::NoRecordsFound { response_code, .. } => match *response_code {
            ResponseCode::ServFail => DnsFailureKind::ServerFailure,
            ResponseCode::NXDomain => DnsFailureKind::NotFound,
            ResponseCode::Refused => DnsFailureKind::Refused,
            ResponseCode::NoError => return Ok(Vec::new()),
            _ => DnsFailureKind::Other,
        },
        _ => DnsFailureKind::Other,
    };
    Err(DnsFailure::new(kind, message))
}
