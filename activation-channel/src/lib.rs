use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::net::UnixListener;
use tokio::net::UnixStream;

/// How long a second launch waits for the owning instance to accept its
/// connection before giving up.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub enum Error {
    /// No owner accepted the connection within the timeout bound.
    Timeout,
    Io(std::io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Timeout => write!(f, "Timed out connecting to the owning instance"),
            Error::Io(err) => write!(f, "Channel I/O error: {}", err),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

/// Socket path for an endpoint name, under `$XDG_RUNTIME_DIR` when set.
pub fn endpoint_path(endpoint: &str) -> PathBuf {
    let dir = std::env::var_os("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/tmp"));
    dir.join(format!("{}.sock", endpoint))
}

/// Server role of the activation channel, held by the owning instance.
///
/// Accepts one connection at a time, reads exactly one newline-terminated
/// payload per connection and hands it to the callback. Payloads are
/// delivered in the order clients connected; a client that disconnects
/// before terminating its line delivers nothing.
pub struct ChannelServer {
    listener: UnixListener,
    path: PathBuf,
}

impl ChannelServer {
    pub fn bind(endpoint: &str) -> Result<ChannelServer, Error> {
        ChannelServer::bind_path(endpoint_path(endpoint))
    }

    pub fn bind_path(path: PathBuf) -> Result<ChannelServer, Error> {
        // A leftover socket file means the previous owner crashed;
        // ownership is gated by the instance guard, so nothing live is
        // listening here.
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        let listener = UnixListener::bind(&path)?;
        log::trace!("Activation channel listening on {:?}", path);
        Ok(ChannelServer { listener, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs the accept loop for the life of the process. Blocks in accept
    /// while no client is connected. Accept and read failures are logged
    /// and the loop keeps serving; it is torn down only by process exit.
    pub async fn run(self, mut callback: impl FnMut(String)) {
        loop {
            let (stream, _addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(err) => {
                    // A client resetting before accept or momentary fd
                    // exhaustion must not stop second-launch forwarding
                    log::warn!("Failed accepting client connection: {}", err);
                    continue;
                }
            };
            let mut reader = BufReader::new(stream);
            let mut line = String::new();
            match reader.read_line(&mut line).await {
                Ok(0) => {
                    log::warn!("Client disconnected without sending a payload");
                }
                Ok(_) if line.ends_with('\n') => {
                    line.pop();
                    if line.ends_with('\r') {
                        line.pop();
                    }
                    callback(line);
                }
                Ok(_) => {
                    // Connection closed mid-line; the fragment is not a
                    // payload and must not be delivered.
                    log::warn!("Discarding partial payload from disconnected client");
                }
                Err(err) => {
                    log::warn!("Failed reading payload from client: {}", err);
                }
            }
        }
    }
}

impl Drop for ChannelServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Client role: forwards one activation payload to the owning instance.
///
/// Writes the payload terminated by a newline and shuts the write half
/// down so the bytes are drained before the connection closes. A
/// [`Error::Timeout`] (or connect [`Error::Io`]) means no reachable
/// owner; the caller decides between failing the launch and becoming the
/// owner itself.
pub async fn send_to_owner(
    endpoint: &str,
    payload: &str,
    connect_timeout: Duration,
) -> Result<(), Error> {
    send_to_owner_path(&endpoint_path(endpoint), payload, connect_timeout).await
}

pub async fn send_to_owner_path(
    path: &Path,
    payload: &str,
    connect_timeout: Duration,
) -> Result<(), Error> {
    let mut stream = tokio::time::timeout(connect_timeout, UnixStream::connect(path))
        .await
        .map_err(|_| Error::Timeout)??;
    stream.write_all(payload.as_bytes()).await?;
    stream.write_all(b"\n").await?;
    stream.flush().await?;
    stream.shutdown().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::sync::atomic::Ordering;

    fn test_socket_path(name: &str) -> PathBuf {
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!(
            "activation-channel-{}-{}-{}.sock",
            name,
            std::process::id(),
            n
        ))
    }

    #[tokio::test]
    async fn payloads_are_delivered_in_connect_order() -> Result<(), Box<dyn std::error::Error>> {
        let path = test_socket_path("order");
        let server = ChannelServer::bind_path(path.clone())?;

        let (sender, mut received) = tokio::sync::mpsc::unbounded_channel();
        let server_task = tokio::spawn(server.run(move |payload| {
            let _ = sender.send(payload);
        }));

        send_to_owner_path(&path, "action=viewImage&imageUrl=a.png", DEFAULT_CONNECT_TIMEOUT)
            .await?;
        send_to_owner_path(&path, "action=like", DEFAULT_CONNECT_TIMEOUT).await?;

        assert_eq!(
            received.recv().await.as_deref(),
            Some("action=viewImage&imageUrl=a.png")
        );
        assert_eq!(received.recv().await.as_deref(), Some("action=like"));

        server_task.abort();
        Ok(())
    }

    #[tokio::test]
    async fn partial_payload_is_discarded() -> Result<(), Box<dyn std::error::Error>> {
        let path = test_socket_path("partial");
        let server = ChannelServer::bind_path(path.clone())?;

        let (sender, mut received) = tokio::sync::mpsc::unbounded_channel();
        let server_task = tokio::spawn(server.run(move |payload| {
            let _ = sender.send(payload);
        }));

        // Disconnect before the newline; the fragment must not arrive
        let mut stream = UnixStream::connect(&path).await?;
        stream.write_all(b"action=trunc").await?;
        stream.shutdown().await?;
        drop(stream);

        send_to_owner_path(&path, "action=complete", DEFAULT_CONNECT_TIMEOUT).await?;

        assert_eq!(received.recv().await.as_deref(), Some("action=complete"));

        server_task.abort();
        Ok(())
    }

    #[tokio::test]
    async fn server_keeps_serving_after_misbehaving_clients()
    -> Result<(), Box<dyn std::error::Error>> {
        let path = test_socket_path("keeps-serving");
        let server = ChannelServer::bind_path(path.clone())?;

        let (sender, mut received) = tokio::sync::mpsc::unbounded_channel();
        let server_task = tokio::spawn(server.run(move |payload| {
            let _ = sender.send(payload);
        }));

        // Connection torn down with no data at all
        let stream = UnixStream::connect(&path).await?;
        drop(stream);

        // Connection torn down mid-line
        let mut stream = UnixStream::connect(&path).await?;
        stream.write_all(b"action=view").await?;
        drop(stream);

        // The loop must still be accepting and delivering in order
        send_to_owner_path(&path, "action=viewConversation&conversationId=5", DEFAULT_CONNECT_TIMEOUT)
            .await?;
        send_to_owner_path(&path, "action=like", DEFAULT_CONNECT_TIMEOUT).await?;

        assert_eq!(
            received.recv().await.as_deref(),
            Some("action=viewConversation&conversationId=5")
        );
        assert_eq!(received.recv().await.as_deref(), Some("action=like"));

        server_task.abort();
        Ok(())
    }

    #[tokio::test]
    async fn connecting_without_an_owner_fails() {
        let path = test_socket_path("no-owner");
        let result = send_to_owner_path(&path, "action=like", Duration::from_millis(200)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn stale_socket_file_is_replaced_on_bind() -> Result<(), Box<dyn std::error::Error>> {
        let path = test_socket_path("stale");
        {
            let _stale = ChannelServer::bind_path(path.clone())?;
            // Simulate a crash: the socket file survives the listener
            std::mem::forget(_stale);
        }
        assert!(path.exists());

        let server = ChannelServer::bind_path(path.clone())?;
        assert_eq!(server.path(), path.as_path());
        let (sender, mut received) = tokio::sync::mpsc::unbounded_channel();
        let server_task = tokio::spawn(server.run(move |payload| {
            let _ = sender.send(payload);
        }));

        send_to_owner_path(&path, "action=like", DEFAULT_CONNECT_TIMEOUT).await?;
        assert_eq!(received.recv().await.as_deref(), Some("action=like"));

        server_task.abort();
        std::fs::remove_file(&path).ok();
        Ok(())
    }
}
