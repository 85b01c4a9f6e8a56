use std::net::ToSocketAddrs;
use std::time::Duration;

use suppaftp::types::FileType;
use suppaftp::FtpStream;
use tracing::{debug, error, info};

use crate::app::ports::{FileTransferPort, FileTransferSession};
use crate::config::{required, TransferConfig};
use crate::error::{DashboardError, Result};

/// Plain FTP access to the back-office export directory
pub struct FtpTransport {
    host: String,
    port: u16,
    username: String,
    password: String,
    timeout: Duration,
}

impl FtpTransport {
    pub fn from_config(config: &TransferConfig) -> Result<Self> {
        Ok(Self {
            host: required(&config.host, "FTP_HOST")?.to_string(),
            port: config.port,
            username: required(&config.username, "FTP_USERNAME")?.to_string(),
            password: required(&config.password, "FTP_PASSWORD")?.to_string(),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }
}

impl FileTransferPort for FtpTransport {
    fn endpoint(&self) -> String {
        format!("ftp://{}:{}", self.host, self.port)
    }

    fn open_session(&self) -> Result<Box<dyn FileTransferSession>> {
        info!("Connecting to FTP server: {}", self.endpoint());

        let addr = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| DashboardError::transport("resolve", e))?
            .next()
            .ok_or_else(|| DashboardError::transport("resolve", format!("no address for {}", self.host)))?;

        let mut stream = FtpStream::connect_timeout(addr, self.timeout).map_err(|e| {
            error!("FTP connect to {} failed: {}", addr, e);
            DashboardError::transport("connect", e)
        })?;
        stream
            .get_ref()
            .set_read_timeout(Some(self.timeout))
            .map_err(|e| DashboardError::transport("connect", e))?;

        stream.login(&self.username, &self.password).map_err(|e| {
            error!("FTP login as {} failed: {}", self.username, e);
            DashboardError::transport("login", e)
        })?;
        stream
            .transfer_type(FileType::Binary)
            .map_err(|e| DashboardError::transport("login", e))?;

        if let Ok(dir) = stream.pwd() {
            debug!("Current directory: {}", dir);
        }

        Ok(Box::new(FtpSession { stream }))
    }
}

struct FtpSession {
    stream: FtpStream,
}

impl FileTransferSession for FtpSession {
    fn list_files(&mut self) -> Result<Vec<String>> {
        let files = self
            .stream
            .nlst(None)
            .map_err(|e| DashboardError::transport("list", e))?;
        debug!("Files: {:?}", files);
        Ok(files)
    }

    fn retrieve(&mut self, name: &str) -> Result<Vec<u8>> {
        let cursor = self
            .stream
            .retr_as_buffer(name)
            .map_err(|e| DashboardError::transport(format!("retrieve {}", name), e))?;
        Ok(cursor.into_inner())
    }

    fn close(mut self: Box<Self>) -> Result<()> {
        self.stream
            .quit()
            .map_err(|e| DashboardError::transport("quit", e))
    }
}
