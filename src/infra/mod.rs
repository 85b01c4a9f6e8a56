pub mod ftp_transport;

pub use ftp_transport::FtpTransport;
