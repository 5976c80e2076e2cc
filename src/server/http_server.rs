use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use http::header::{HeaderName, HeaderValue};
use http::{Method, StatusCode, Uri};
use tracing::{debug, info, warn};

use super::request::Request;
use super::response::{Body, Response, StreamBody};
use crate::dispatcher::Application;
use crate::runtime_config::HttpConfig;

type TransportResponse = tiny_http::Response<Box<dyn Read + Send>>;

/// Blocking HTTP/1.1 host for an [`Application`].
///
/// A `tiny_http` listener feeds a fixed pool of worker threads; each worker
/// converts the request, calls [`Application::respond`] and writes the result.
pub struct HttpServer {
    app: Arc<Application>,
    workers: usize,
    max_body_bytes: usize,
}

/// Handle to a running HTTP server
///
/// Provides methods for waiting until the server is ready, stopping it gracefully,
/// or joining the worker threads.
pub struct ServerHandle {
    addr: SocketAddr,
    server: Arc<tiny_http::Server>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl ServerHandle {
    /// Address the listener is bound to (the real port when started on port 0).
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait for the server to be ready to accept connections
    ///
    /// Polls the server address by attempting TCP connections until successful.
    ///
    /// # Errors
    ///
    /// Returns `TimedOut` if the server doesn't become ready within ~250ms (50 attempts × 5ms).
    pub fn wait_ready(&self) -> io::Result<()> {
        for _ in 0..50 {
            if TcpStream::connect(self.addr).is_ok() {
                return Ok(());
            }
            thread::sleep(Duration::from_millis(5));
        }
        Err(io::Error::new(io::ErrorKind::TimedOut, "server not ready"))
    }

    /// Stop accepting requests and wait for the workers to finish their current one.
    pub fn stop(self) {
        self.shutdown.store(true, Ordering::SeqCst);
        for _ in &self.workers {
            self.server.unblock();
        }
        for worker in self.workers {
            if worker.join().is_err() {
                warn!("HTTP worker panicked during shutdown");
            }
        }
        info!(addr = %self.addr, "HTTP server stopped");
    }

    /// Block until every worker exits.
    ///
    /// # Errors
    ///
    /// Returns the panic payload of the first worker that panicked.
    pub fn join(self) -> thread::Result<()> {
        let mut result = Ok(());
        for worker in self.workers {
            if let Err(payload) = worker.join() {
                if result.is_ok() {
                    result = Err(payload);
                }
            }
        }
        result
    }
}

impl HttpServer {
    #[must_use]
    pub fn new(app: Arc<Application>) -> Self {
        Self::with_config(app, &HttpConfig::default())
    }

    #[must_use]
    pub fn with_config(app: Arc<Application>, config: &HttpConfig) -> Self {
        Self {
            app,
            workers: config.workers.max(1),
            max_body_bytes: config.max_body_bytes,
        }
    }

    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    #[must_use]
    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Bind `addr` and start the worker threads.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or the port cannot be bound.
    pub fn start<A: ToSocketAddrs>(self, addr: A) -> io::Result<ServerHandle> {
        let requested = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid address"))?;
        let server = tiny_http::Server::http(requested)
            .map_err(|e| io::Error::new(io::ErrorKind::AddrNotAvailable, e.to_string()))?;
        let addr = server.server_addr().to_ip().unwrap_or(requested);
        let server = Arc::new(server);
        let shutdown = Arc::new(AtomicBool::new(false));

        let workers = (0..self.workers)
            .map(|i| {
                let server = Arc::clone(&server);
                let app = Arc::clone(&self.app);
                let shutdown = Arc::clone(&shutdown);
                let max_body = self.max_body_bytes;
                thread::Builder::new()
                    .name(format!("trellis-worker-{i}"))
                    .spawn(move || worker_loop(&server, &app, &shutdown, max_body))
            })
            .collect::<io::Result<Vec<_>>>()?;

        info!(addr = %addr, workers = workers.len(), "HTTP server listening");
        Ok(ServerHandle {
            addr,
            server,
            workers,
            shutdown,
        })
    }
}

fn worker_loop(
    server: &tiny_http::Server,
    app: &Application,
    shutdown: &AtomicBool,
    max_body: usize,
) {
    loop {
        let mut request = match server.recv() {
            Ok(request) => request,
            Err(e) => {
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }
                warn!(error = %e, "Failed to accept request");
                continue;
            }
        };

        let response = match convert_request(&mut request, max_body) {
            Ok(req) => app.respond(req),
            Err(rejection) => rejection,
        };
        if let Err(e) = request.respond(into_transport(response)) {
            debug!(error = %e, "Client went away before the response was written");
        }

        if shutdown.load(Ordering::SeqCst) {
            break;
        }
    }
}

/// Translate a transport request into a framework request.
///
/// Rejections (malformed target, oversized body) are returned as ready responses.
fn convert_request(request: &mut tiny_http::Request, max_body: usize) -> Result<Request, Response> {
    let method = Method::from_bytes(request.method().as_str().as_bytes())
        .map_err(|_| Response::error(StatusCode::BAD_REQUEST, "Invalid method"))?;
    let uri: Uri = request
        .url()
        .parse()
        .map_err(|_| Response::error(StatusCode::BAD_REQUEST, "Invalid request target"))?;

    let mut req = Request::new(method, uri);
    for h in request.headers() {
        let name = HeaderName::from_bytes(h.field.as_str().as_str().as_bytes());
        let value = HeaderValue::from_str(h.value.as_str());
        match (name, value) {
            (Ok(name), Ok(value)) => {
                req.headers.append(name, value);
            }
            _ => debug!(header = ?h.field, "Dropping malformed request header"),
        }
    }

    let too_large = || {
        warn!(limit = max_body, "Request body exceeds limit");
        Response::error(StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large")
    };
    if request.body_length().is_some_and(|n| n > max_body) {
        return Err(too_large());
    }
    let mut body = Vec::new();
    request
        .as_reader()
        .take(max_body as u64 + 1)
        .read_to_end(&mut body)
        .map_err(|_| Response::error(StatusCode::BAD_REQUEST, "Unreadable request body"))?;
    if body.len() > max_body {
        return Err(too_large());
    }
    Ok(req.with_body(body))
}

fn into_transport(res: Response) -> TransportResponse {
    let Response {
        status,
        headers,
        body,
    } = res;

    let headers: Vec<tiny_http::Header> = headers
        .iter()
        .filter_map(|(name, value)| {
            tiny_http::Header::from_bytes(name.as_str().as_bytes(), value.as_bytes())
                .map_err(|()| warn!(header = %name, "Header rejected by transport"))
                .ok()
        })
        .collect();

    let (data, len): (Box<dyn Read + Send>, Option<usize>) = match body {
        Body::Empty => (Box::new(io::empty()), Some(0)),
        Body::Bytes(bytes) => {
            let len = bytes.len();
            (Box::new(io::Cursor::new(bytes)), Some(len))
        }
        Body::Stream(stream) => (Box::new(spawn_stream(stream)), None),
    };

    tiny_http::Response::new(
        tiny_http::StatusCode(status.as_u16()),
        headers,
        data,
        len,
        None,
    )
}

/// Run a stream producer on its own thread, exposing its output as a reader.
///
/// When the client disconnects the reader is dropped, the producer's next
/// write fails with `BrokenPipe`, and the producer stops.
fn spawn_stream(stream: StreamBody) -> ChannelReader {
    let (tx, rx) = mpsc::sync_channel(16);
    thread::spawn(move || {
        let mut writer = ChannelWriter(tx);
        if let Err(e) = stream.write_to(&mut writer) {
            debug!(error = %e, "Streaming body ended early");
        }
    });
    ChannelReader {
        rx,
        chunk: Vec::new(),
        pos: 0,
    }
}

struct ChannelWriter(mpsc::SyncSender<Vec<u8>>);

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.0
            .send(buf.to_vec())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "response reader dropped"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct ChannelReader {
    rx: mpsc::Receiver<Vec<u8>>,
    chunk: Vec<u8>,
    pos: usize,
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pos >= self.chunk.len() {
            match self.rx.recv() {
                Ok(chunk) => {
                    self.chunk = chunk;
                    self.pos = 0;
                }
                // producer finished
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(self.chunk.len() - self.pos);
        buf[..n].copy_from_slice(&self.chunk[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}
