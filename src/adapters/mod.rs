// Adapters layer: concrete implementations of the domain ports (DNS, TCP, files, HTTP).

pub mod csv_sink;
pub mod dns;
pub mod http_sender;
pub mod smtp;

pub use csv_sink::CsvAppendSink;
pub use dns::HickoryMxResolver;
pub use http_sender::HttpEmailSender;
pub use smtp::TcpSmtpProbe;
