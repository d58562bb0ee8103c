use std::io::Read;

use suppaftp::types::{FileType, FtpError};
use suppaftp::{RustlsConnector, RustlsFtpStream, Status};
use tracing::{debug, info};

use crate::config::ConnectionConfig;
use crate::error::{RemoteError, SyncError};
use crate::remote::RemoteStore;
use crate::tls;

/// Open a TCP connection and wrap it in TLS before any FTP command is sent.
///
/// The server greeting is read over the encrypted channel.
pub fn connect_implicit_tls(config: &ConnectionConfig) -> Result<RustlsFtpStream, RemoteError> {
    let connector = RustlsConnector::from(tls::client_config()?);

    #[allow(deprecated)]
    let stream = RustlsFtpStream::connect_secure_implicit(
        (config.host.as_str(), config.port),
        connector,
        &config.host,
    )?;

    debug!(welcome = ?stream.get_welcome_msg(), "TLS session established");
    Ok(stream)
}

/// An authenticated implicit FTPS session with a protected data channel
pub struct FtpsSession {
    stream: RustlsFtpStream,
}

impl FtpsSession {
    pub fn connect(config: &ConnectionConfig) -> Result<Self, SyncError> {
        info!("Connecting to printer {config}");

        let session = Self::open(config).map_err(|source| SyncError::Connection {
            host: config.host.clone(),
            port: config.port,
            source,
        })?;

        info!("Connected.");
        Ok(session)
    }

    fn open(config: &ConnectionConfig) -> Result<Self, RemoteError> {
        let mut stream = connect_implicit_tls(config)?;

        stream
            .login(&config.username, &config.password)
            .map_err(map_ftp_error)?;

        // Protect the data channel as well
        stream
            .custom_command("PBSZ 0", &[Status::CommandOk])
            .map_err(map_ftp_error)?;
        stream
            .custom_command("PROT P", &[Status::CommandOk])
            .map_err(map_ftp_error)?;

        stream
            .transfer_type(FileType::Binary)
            .map_err(map_ftp_error)?;

        // Printers behind NAT advertise unreachable PASV addresses
        stream.set_passive_nat_workaround(true);

        Ok(Self { stream })
    }
}

impl RemoteStore for FtpsSession {
    fn list(&mut self, path: Option<&str>) -> Result<Vec<String>, RemoteError> {
        match self.stream.nlst(path) {
            Ok(names) => Ok(names),
            Err(FtpError::UnexpectedResponse(response))
                if response.status == Status::FileUnavailable =>
            {
                debug!(reply = %String::from_utf8_lossy(&response.body).trim(), "Empty listing");
                Err(RemoteError::NoFiles)
            }
            Err(e) => Err(map_ftp_error(e)),
        }
    }

    fn change_dir(&mut self, path: &str) -> Result<(), RemoteError> {
        self.stream.cwd(path).map_err(map_ftp_error)
    }

    fn size(&mut self, name: &str) -> Result<u64, RemoteError> {
        self.stream
            .size(name)
            .map(|size| size as u64)
            .map_err(map_ftp_error)
    }

    fn retrieve(&mut self, name: &str) -> Result<Box<dyn Read>, RemoteError> {
        let data = self.stream.retr_as_stream(name).map_err(map_ftp_error)?;
        Ok(Box::new(data))
    }

    fn finish_retrieve(&mut self, reader: Box<dyn Read>) -> Result<(), RemoteError> {
        self.stream
            .finalize_retr_stream(reader)
            .map_err(map_ftp_error)
    }

    fn remove(&mut self, name: &str) -> Result<(), RemoteError> {
        self.stream.rm(name).map_err(map_ftp_error)
    }

    fn close(&mut self) -> Result<(), RemoteError> {
        self.stream.quit().map_err(map_ftp_error)
    }
}

fn map_ftp_error(error: FtpError) -> RemoteError {
    match error {
        FtpError::UnexpectedResponse(response) => RemoteError::Rejected {
            code: response.status.code(),
            message: String::from_utf8_lossy(&response.body).trim().to_owned(),
        },
        other => RemoteError::Ftp(other),
    }
}
