//! Minimal HTTP/1.1 file server for integration tests.
//!
//! Serves a fixed set of routes with Range support, extra response headers,
//! forced statuses, transient 503s, delays, and records what clients sent.
//! One request per connection (`Connection: close`).

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct Route {
    pub body: Vec<u8>,
    /// Extra response headers, e.g. Content-Disposition or Set-Cookie.
    pub headers: Vec<(String, String)>,
    /// Answer with this status (and the body) instead of serving the file.
    pub status: Option<u16>,
    /// Answer this many requests with 503 before serving normally.
    pub fail_first: u32,
    /// If true, Range is ignored and the full body is sent with 200.
    pub ignore_ranges: bool,
    /// Total to claim in Content-Range instead of the real length.
    pub claimed_total: Option<u64>,
    /// Sleep before sending headers.
    pub delay: Duration,
    /// Sleep between 4 KiB body pieces.
    pub chunk_delay: Duration,
}

impl Route {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            ..Self::default()
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn status(mut self, code: u16) -> Self {
        self.status = Some(code);
        self
    }

    pub fn fail_first(mut self, n: u32) -> Self {
        self.fail_first = n;
        self
    }

    pub fn ignore_ranges(mut self) -> Self {
        self.ignore_ranges = true;
        self
    }

    pub fn claim_total(mut self, total: u64) -> Self {
        self.claimed_total = Some(total);
        self
    }

    pub fn delay(mut self, d: Duration) -> Self {
        self.delay = d;
        self
    }

    pub fn chunk_delay(mut self, d: Duration) -> Self {
        self.chunk_delay = d;
        self
    }
}

/// What the server saw for one request.
#[derive(Debug, Clone)]
pub struct Seen {
    pub path: String,
    pub range: Option<String>,
    pub cookie: Option<String>,
}

#[derive(Debug, Default)]
struct Stats {
    requests: Mutex<Vec<Seen>>,
    in_flight: AtomicU64,
    peak: AtomicU64,
}

struct RouteState {
    route: Route,
    failures_left: AtomicU32,
}

pub struct FileServer {
    port: u16,
    stats: Arc<Stats>,
}

impl FileServer {
    /// Start serving `routes` (path → route) on a loopback port. Runs until the process exits.
    pub fn start(routes: Vec<(&str, Route)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let routes: Arc<HashMap<String, RouteState>> = Arc::new(
            routes
                .into_iter()
                .map(|(p, r)| {
                    let failures_left = AtomicU32::new(r.fail_first);
                    (p.to_string(), RouteState { route: r, failures_left })
                })
                .collect(),
        );
        let stats = Arc::new(Stats::default());
        let st = Arc::clone(&stats);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let routes = Arc::clone(&routes);
                let stats = Arc::clone(&st);
                thread::spawn(move || handle(stream, &routes, &stats));
            }
        });
        FileServer { port, stats }
    }

    /// `host:port`, for use as the files host.
    pub fn host(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }

    pub fn requests(&self) -> Vec<Seen> {
        self.stats.requests.lock().unwrap().clone()
    }

    pub fn gets(&self) -> usize {
        self.requests().len()
    }

    pub fn gets_for(&self, path: &str) -> usize {
        self.requests().iter().filter(|s| s.path == path).count()
    }

    /// Most requests ever being answered at the same time.
    pub fn peak_concurrency(&self) -> u64 {
        self.stats.peak.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a Stats);

impl<'a> InFlight<'a> {
    fn enter(stats: &'a Stats) -> Self {
        let now = stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        stats.peak.fetch_max(now, Ordering::SeqCst);
        InFlight(stats)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

fn reason(code: u16) -> &'static str {
    match code {
        200 => "OK",
        206 => "Partial Content",
        404 => "Not Found",
        416 => "Range Not Satisfiable",
        503 => "Service Unavailable",
        _ => "Status",
    }
}

fn read_request(stream: &mut TcpStream) -> Option<String> {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    while !data.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => return None,
            Ok(n) => data.extend_from_slice(&buf[..n]),
        }
        if data.len() > 64 * 1024 {
            return None;
        }
    }
    String::from_utf8(data).ok()
}

fn handle(mut stream: TcpStream, routes: &HashMap<String, RouteState>, stats: &Stats) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let Some(request) = read_request(&mut stream) else {
        return;
    };
    let seen = parse_request(&request);
    let range = seen.range.as_deref().and_then(parse_range);
    let path = seen.path.clone();
    stats.requests.lock().unwrap().push(seen);
    let _guard = InFlight::enter(stats);

    let Some(state) = routes.get(&path) else {
        respond(&mut stream, 404, &[], b"not found", Duration::ZERO);
        return;
    };
    let route = &state.route;
    thread::sleep(route.delay);

    let fail = state
        .failures_left
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if fail {
        respond(&mut stream, 503, &[], b"", Duration::ZERO);
        return;
    }

    let mut headers: Vec<(String, String)> = route.headers.clone();
    if let Some(code) = route.status {
        respond(&mut stream, code, &headers, &route.body, Duration::ZERO);
        return;
    }

    let total = route.body.len() as u64;
    let claimed = route.claimed_total.unwrap_or(total);
    match range.filter(|_| !route.ignore_ranges) {
        Some(start) if start >= total => {
            headers.push(("Content-Range".into(), format!("bytes */{}", claimed)));
            respond(&mut stream, 416, &headers, b"", Duration::ZERO);
        }
        Some(start) => {
            headers.push((
                "Content-Range".into(),
                format!("bytes {}-{}/{}", start, total - 1, claimed),
            ));
            let slice = &route.body[start as usize..];
            respond(&mut stream, 206, &headers, slice, route.chunk_delay);
        }
        None => respond(&mut stream, 200, &headers, &route.body, route.chunk_delay),
    }
}

fn respond(stream: &mut TcpStream, code: u16, headers: &[(String, String)], body: &[u8], pace: Duration) {
    let mut head = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        code,
        reason(code),
        body.len()
    );
    for (name, value) in headers {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    head.push_str("\r\n");
    if stream.write_all(head.as_bytes()).is_err() {
        return;
    }
    for piece in body.chunks(4096) {
        if stream.write_all(piece).is_err() {
            return;
        }
        let _ = stream.flush();
        thread::sleep(pace);
    }
}

fn parse_request(request: &str) -> Seen {
    let mut lines = request.lines();
    let target = lines
        .next()
        .and_then(|l| l.split_whitespace().nth(1))
        .unwrap_or("/");
    let path = target.split('?').next().unwrap_or("/").to_string();
    let mut range = None;
    let mut cookie = None;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            if name.eq_ignore_ascii_case("range") {
                range = Some(value.trim().to_string());
            } else if name.eq_ignore_ascii_case("cookie") {
                cookie = Some(value.trim().to_string());
            }
        }
    }
    Seen { path, range, cookie }
}

/// Start offset of `bytes=<start>-`.
fn parse_range(value: &str) -> Option<u64> {
    let range = value.trim().strip_prefix("bytes=")?;
    range.split_once('-')?.0.trim().parse().ok()
}
