//! FTP remote store.
//!
//! Wraps the blocking [`suppaftp::FtpStream`]. Every protocol call runs on
//! tokio's blocking pool via [`spawn_blocking`](tokio::task::spawn_blocking),
//! with the stream parked behind a mutex between calls so the session can be
//! moved into each `'static` closure.

use crate::backend::{Probe, RemoteStore, Session};
use crate::credentials::Credentials;
use crate::error::{ErrorKind, Result};
use crate::path::file_name;
use crate::SessionHandle;
use async_trait::async_trait;
use exn::{OptionExt, ResultExt};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream, Mode};
use tracing::instrument;

pub const DEFAULT_PORT: u16 = 21;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// Reply codes the remote archive actually sends back.
const NOT_LOGGED_IN: u32 = 530;
const FILE_UNAVAILABLE: u32 = 550;
const FILE_ACTION_NOT_TAKEN: u32 = 450;

/// Passive-mode FTP store.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use ziptrawl_storage::backend::FtpStore;
///
/// let store = FtpStore::new("ftp.zakupki.gov.ru", 21).with_timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct FtpStore {
    name: String,
    host: String,
    port: u16,
    /// Applied to connecting and to every read/write, on the control
    /// connection and on each passive data connection.
    timeout: Duration,
}
impl FtpStore {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let host = host.into();
        Self {
            name: format!("ftp://{host}:{port}"),
            host,
            port,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn connect(host: &str, port: u16, timeout: Duration) -> std::result::Result<FtpStream, FtpError> {
        let address = (host, port)
            .to_socket_addrs()
            .map_err(FtpError::ConnectionError)?
            .next()
            .ok_or_else(|| {
                FtpError::ConnectionError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{host} did not resolve to any address"),
                ))
            })?;
        let mut stream = FtpStream::connect_timeout(address, timeout)?
            .passive_stream_builder(move |address| data_stream(address, timeout));
        stream.get_ref().set_read_timeout(Some(timeout)).map_err(FtpError::ConnectionError)?;
        stream.get_ref().set_write_timeout(Some(timeout)).map_err(FtpError::ConnectionError)?;
        stream.set_mode(Mode::Passive);
        Ok(stream)
    }
}

/// Opens a passive data connection bounded by `timeout`, like the control one.
fn data_stream(address: SocketAddr, timeout: Duration) -> std::result::Result<TcpStream, FtpError> {
    let stream = TcpStream::connect_timeout(&address, timeout).map_err(FtpError::ConnectionError)?;
    stream.set_read_timeout(Some(timeout)).map_err(FtpError::ConnectionError)?;
    stream.set_write_timeout(Some(timeout)).map_err(FtpError::ConnectionError)?;
    Ok(stream)
}

/// The server refuses to enter files with 550; any other refusal is a failure.
fn refused_dir(code: u32) -> Option<Probe> {
    (code == FILE_UNAVAILABLE).then_some(Probe::NotADirectory)
}

/// Several servers answer NLST on an empty directory with "no files found".
fn is_empty_listing(code: u32) -> bool {
    matches!(code, FILE_UNAVAILABLE | FILE_ACTION_NOT_TAKEN)
}

#[async_trait]
impl RemoteStore for FtpStore {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, credentials), fields(store = %self.name, user = %credentials.user))]
    async fn open(&self, credentials: &Credentials) -> Result<SessionHandle> {
        let (host, port, timeout) = (self.host.clone(), self.port, self.timeout);
        let (user, password) = (credentials.user.clone(), credentials.password().to_string());
        let context = format!("login to {}", self.name);
        let connected = tokio::task::spawn_blocking(move || {
            let mut stream = Self::connect(&host, port, timeout)?;
            stream.login(user.as_str(), password.as_str())?;
            stream.transfer_type(FileType::Binary)?;
            Ok::<_, FtpError>(stream)
        })
        .await
        .or_raise(|| ErrorKind::BackendError(format!("{context}: worker panicked")))?;
        let stream = connected.map_err(|err| map_ftp_error(err, &context))?;
        tracing::debug!("FTP session established");
        Ok(Box::new(FtpSession {
            stream: Arc::new(Mutex::new(stream)),
        }))
    }
}

/// One logged-in FTP control connection.
struct FtpSession {
    stream: Arc<Mutex<FtpStream>>,
}
impl FtpSession {
    /// Run a protocol call on the blocking pool, handing back the raw FTP
    /// result so callers can interpret specific reply codes.
    async fn call_raw<T, F>(&self, context: &str, op: F) -> Result<std::result::Result<T, FtpError>>
    where
        T: Send + 'static,
        F: FnOnce(&mut FtpStream) -> std::result::Result<T, FtpError> + Send + 'static,
    {
        let stream = Arc::clone(&self.stream);
        let outcome = tokio::task::spawn_blocking(move || stream.lock().ok().map(|mut guard| op(&mut guard)))
            .await
            .or_raise(|| ErrorKind::BackendError(format!("{context}: worker panicked")))?;
        outcome.ok_or_raise(|| ErrorKind::BackendError(format!("{context}: session poisoned by an earlier failure")))
    }

    async fn call<T, F>(&self, context: String, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut FtpStream) -> std::result::Result<T, FtpError> + Send + 'static,
    {
        Ok(self.call_raw(&context, op).await?.map_err(|err| map_ftp_error(err, &context))?)
    }
}

#[async_trait]
impl Session for FtpSession {
    async fn change_dir(&mut self, path: &str) -> Result<Probe> {
        let context = format!("CWD {path}");
        let target = path.to_string();
        match self.call_raw(&context, move |ftp| ftp.cwd(target)).await? {
            Ok(()) => Ok(Probe::Directory),
            Err(FtpError::UnexpectedResponse(response)) if refused_dir(response.status.code()).is_some() => {
                Ok(Probe::NotADirectory)
            },
            Err(err) => Err(map_ftp_error(err, &context).into()),
        }
    }

    async fn current_dir(&mut self) -> Result<String> {
        self.call("PWD".to_string(), |ftp| ftp.pwd()).await
    }

    async fn list(&mut self) -> Result<Vec<String>> {
        let context = "NLST".to_string();
        let names = match self.call_raw(&context, |ftp| ftp.nlst(None)).await? {
            Ok(names) => names,
            Err(FtpError::UnexpectedResponse(response)) if is_empty_listing(response.status.code()) => Vec::new(),
            Err(err) => return Err(map_ftp_error(err, &context).into()),
        };
        Ok(names
            .iter()
            .map(|name| file_name(name.trim()))
            .filter(|name| !matches!(*name, "" | "." | ".."))
            .map(str::to_string)
            .collect())
    }

    #[instrument(skip(self))]
    async fn retrieve(&mut self, path: &str) -> Result<Vec<u8>> {
        let target = path.to_string();
        let buffer = self.call(format!("RETR {path}"), move |ftp| ftp.retr_as_buffer(&target)).await?;
        let bytes = buffer.into_inner();
        tracing::debug!(bytes = bytes.len(), "Retrieved remote file");
        Ok(bytes)
    }

    async fn close(&mut self) -> Result<()> {
        self.call("QUIT".to_string(), |ftp| ftp.quit()).await
    }
}

fn map_ftp_error(err: FtpError, context: &str) -> ErrorKind {
    match err {
        FtpError::ConnectionError(io) => match io.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => ErrorKind::Timeout(context.to_string()),
            _ => ErrorKind::Network(format!("{context}: {io}")),
        },
        FtpError::UnexpectedResponse(response) => {
            let code = response.status.code();
            let body = String::from_utf8_lossy(&response.body).trim().to_string();
            match code {
                NOT_LOGGED_IN => ErrorKind::PermissionDenied(format!("{context}: {body}")),
                FILE_UNAVAILABLE => ErrorKind::NotFound(format!("{context}: {body}")),
                // 4xx replies are transient by definition.
                400..=499 => ErrorKind::Network(format!("{context}: {code} {body}")),
                _ => ErrorKind::Protocol(format!("{context}: {code} {body}")),
            }
        },
        other => ErrorKind::Protocol(format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_timeouts_are_retryable() {
        let err = FtpError::ConnectionError(std::io::Error::new(std::io::ErrorKind::TimedOut, "slow"));
        let kind = map_ftp_error(err, "RETR /a.zip");
        assert_eq!(kind, ErrorKind::Timeout("RETR /a.zip".to_string()));
        assert!(kind.is_retryable());
    }

    #[test]
    fn test_connection_refused_is_network() {
        let err = FtpError::ConnectionError(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "nope"));
        assert!(matches!(map_ftp_error(err, "login"), ErrorKind::Network(_)));
    }

    #[test]
    fn test_store_name() {
        let store = FtpStore::new("ftp.example.org", DEFAULT_PORT);
        assert_eq!(store.name(), "ftp://ftp.example.org:21");
    }

    #[rstest]
    #[case(550, Some(Probe::NotADirectory))]
    #[case(450, None)]
    #[case(530, None)]
    #[case(421, None)]
    #[case(501, None)]
    fn test_refused_dir(#[case] code: u32, #[case] expected: Option<Probe>) {
        assert_eq!(refused_dir(code), expected);
    }

    #[rstest]
    #[case(550, true)]
    #[case(450, true)]
    #[case(425, false)]
    #[case(530, false)]
    #[case(226, false)]
    fn test_is_empty_listing(#[case] code: u32, #[case] expected: bool) {
        assert_eq!(is_empty_listing(code), expected);
    }

    #[test]
    fn test_data_stream_carries_timeouts() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let timeout = Duration::from_millis(750);
        let stream = data_stream(listener.local_addr().unwrap(), timeout).unwrap();
        assert_eq!(stream.read_timeout().unwrap(), Some(timeout));
        assert_eq!(stream.write_timeout().unwrap(), Some(timeout));
    }

    #[test]
    fn test_data_stream_refused_is_network() {
        // Bind then drop to get a local port with nothing listening.
        let address = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
        let err = data_stream(address, Duration::from_millis(500)).unwrap_err();
        assert!(matches!(map_ftp_error(err, "NLST"), ErrorKind::Network(_) | ErrorKind::Timeout(_)));
    }

    #[tokio::test]
    async fn test_unresolvable_host_fails_without_retry_storm() {
        let store = FtpStore::new("host.invalid", DEFAULT_PORT).with_timeout(Duration::from_millis(200));
        let err = store.open(&Credentials::new("free", "free")).await.err().unwrap();
        assert!(matches!(&*err, ErrorKind::Network(_) | ErrorKind::Timeout(_)));
    }
}
