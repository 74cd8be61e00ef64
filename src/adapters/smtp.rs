use crate::domain::ports::SmtpProbe;
use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio::net::TcpStream;

pub const DEFAULT_SMTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens a TCP connection and closes it straight away; no SMTP dialogue.
#[derive(Debug, Clone)]
pub struct TcpSmtpProbe {
    timeout: Duration,
}

impl TcpSmtpProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for TcpSmtpProbe {
    fn default() -> Self {
        Self::new(DEFAULT_SMTP_TIMEOUT)
    }
}

#[async_trait]
impl SmtpProbe for TcpSmtpProbe {
    async fn connect(&self, host: &str, port: u16) -> io::Result<()> {
        match tokio::time::timeout(self.timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(stream)) => {
                drop(stream);
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("connection to {}:{} timed out after {:?}", host, port, self.timeout),
            )),
        }
    }
}
