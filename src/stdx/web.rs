//=============================================
// nekoscript/stdx/web.rs
//=============================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Web capability module
// Objective: Route-based HTTP servers served from a host task, outbound
//            HTTP requests, HTML templating and JSON helpers
//=============================================

use super::{ModuleBuilder, map_of};
use crate::interpreter::{
    Bindings, HostTask, Interpreter, NativeArity, RuntimeError, TaskStatus, Value, arg,
    expect_callable, expect_map, expect_number, expect_text, json_to_value, value_to_json,
};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::{ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::rc::Rc;
use std::time::{Duration, Instant};
use thiserror::Error;

const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_REQUEST_BYTES: usize = 1024 * 1024;

pub fn create_module(interpreter: &mut Interpreter) -> Result<Bindings, RuntimeError> {
    let host = interpreter.config().web.host.clone();
    let mut builder = ModuleBuilder::new("Web");
    builder
        .function("creerServeur", NativeArity::between(0, 1), move |_, args| {
            let port = match args.first() {
                Some(value) => expect_number(value, "creerServeur")?,
                None => 3000.0,
            };
            if !(0.0..=65535.0).contains(&port) {
                return Err(RuntimeError::ArgumentError(format!(
                    "creerServeur : port {port} invalide"
                )));
            }
            let state = Rc::new(RefCell::new(ServerState::new(host.clone(), port as u16)));
            Ok(server_value(state))
        })
        .function("requete", NativeArity::between(1, 2), requete)
        .function("recuperer", NativeArity::Exact(1), |_, args| {
            let url = expect_text(&arg(args, 0), "recuperer")?;
            let response = ureq::get(&url).call()?;
            Ok(Value::Str(response.into_string()?))
        })
        .function("envoyer", NativeArity::between(1, 2), |_, args| {
            let url = expect_text(&arg(args, 0), "envoyer")?;
            let response = match arg(args, 1) {
                body @ (Value::Map(_) | Value::List(_)) => {
                    ureq::post(&url).send_json(value_to_json(&body))?
                }
                Value::Null => ureq::post(&url).call()?,
                body => ureq::post(&url).send_string(&body.to_string())?,
            };
            Ok(Value::Str(response.into_string()?))
        })
        .function("page", NativeArity::between(2, 3), |_, args| {
            let title = expect_text(&arg(args, 0), "page")?;
            let content = arg(args, 1).to_string();
            let style = args.get(2).map(Value::to_string);
            Ok(Value::Str(render_page(&title, &content, style.as_deref())))
        })
        .function("versJson", NativeArity::Exact(1), |_, args| {
            serde_json::to_string(&value_to_json(&arg(args, 0)))
                .map(Value::Str)
                .map_err(|error| RuntimeError::TypeError(error.to_string()))
        })
        .function("depuisJson", NativeArity::Exact(1), |_, args| {
            let text = expect_text(&arg(args, 0), "depuisJson")?;
            serde_json::from_str::<serde_json::Value>(&text)
                .map(|json| json_to_value(&json))
                .map_err(|error| RuntimeError::ArgumentError(format!("JSON invalide : {error}")))
        });
    Ok(builder.build())
}

//=============================================
//            Section 1: Routing
//=============================================

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Param(String),
    Wildcard,
}

struct Route {
    method: String,
    pattern: Vec<Segment>,
    handler: Value,
}

impl Route {
    fn new(method: &str, path: &str, handler: Value) -> Self {
        let pattern = path_segments(path)
            .map(|segment| match segment {
                "*" => Segment::Wildcard,
                _ if segment.starts_with(':') => Segment::Param(segment[1..].to_string()),
                _ => Segment::Literal(segment.to_string()),
            })
            .collect();
        Self {
            method: method.to_uppercase(),
            pattern,
            handler,
        }
    }

    /// Path parameters when `method` and `path` match this route.
    fn matches(&self, method: &str, path: &str) -> Option<BTreeMap<String, String>> {
        if self.method != "*" && !self.method.eq_ignore_ascii_case(method) {
            return None;
        }
        let segments: Vec<&str> = path_segments(path).collect();
        let mut params = BTreeMap::new();
        for (index, expected) in self.pattern.iter().enumerate() {
            match expected {
                Segment::Wildcard => return Some(params),
                Segment::Literal(literal) => {
                    if segments.get(index) != Some(&literal.as_str()) {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let value = segments.get(index)?;
                    params.insert(name.clone(), percent_decode(value));
                }
            }
        }
        (segments.len() == self.pattern.len()).then_some(params)
    }
}

fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

struct ServerState {
    host: String,
    port: u16,
    routes: Vec<Route>,
    running: bool,
    stop_requested: bool,
}

impl ServerState {
    fn new(host: String, port: u16) -> Self {
        Self {
            host,
            port,
            routes: Vec::new(),
            running: false,
            stop_requested: false,
        }
    }

    fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

type SharedServer = Rc<RefCell<ServerState>>;

fn server_value(state: SharedServer) -> Value {
    let mut entries: Vec<(String, Value)> = Vec::new();
    for (name, method) in [("get", "GET"), ("post", "POST"), ("put", "PUT"), ("supprimer", "DELETE")] {
        let state = Rc::clone(&state);
        entries.push((
            name.to_string(),
            Value::native(name, NativeArity::Exact(2), move |_, args| {
                add_route(&state, method, args, 0)
            }),
        ));
    }

    let route_state = Rc::clone(&state);
    entries.push((
        "route".into(),
        Value::native("route", NativeArity::Exact(3), move |_, args| {
            let method = expect_text(&arg(args, 0), "route")?;
            add_route(&route_state, &method, args, 1)
        }),
    ));

    for name in ["demarrer", "ecouter"] {
        let state = Rc::clone(&state);
        entries.push((
            name.to_string(),
            Value::native(name, NativeArity::between(0, 1), move |interpreter, args| {
                start_server(interpreter, &state, args.first())
            }),
        ));
    }

    let stop_state = Rc::clone(&state);
    entries.push((
        "arreter".into(),
        Value::native("arreter", NativeArity::Exact(0), move |_, _| {
            stop_state.borrow_mut().stop_requested = true;
            Ok(Value::Null)
        }),
    ));

    let sim_state = Rc::clone(&state);
    entries.push((
        "simuler".into(),
        Value::native("simuler", NativeArity::between(2, 3), move |interpreter, args| {
            let method = expect_text(&arg(args, 0), "simuler")?;
            let target = expect_text(&arg(args, 1), "simuler")?;
            let body = match arg(args, 2) {
                Value::Null => String::new(),
                value @ (Value::Map(_) | Value::List(_)) => value_to_json(&value).to_string(),
                value => value.to_string(),
            };
            let request = HttpRequest::synthetic(&method, &target, body);
            let response = dispatch(interpreter, &sim_state, &request)?;
            Ok(response.into_value())
        }),
    ));

    let port = state.borrow().port;
    entries.push(("port".into(), Value::Number(port as f64)));
    map_of(entries)
}

fn add_route(
    state: &SharedServer,
    method: &str,
    args: &[Value],
    offset: usize,
) -> Result<Value, RuntimeError> {
    let path = expect_text(&arg(args, offset), "route")?;
    let handler = expect_callable(&arg(args, offset + 1), "route")?;
    tracing::debug!(method, path = %path, "route registered");
    state.borrow_mut().routes.push(Route::new(method, &path, handler));
    Ok(Value::Null)
}

fn start_server(
    interpreter: &mut Interpreter,
    state: &SharedServer,
    callback: Option<&Value>,
) -> Result<Value, RuntimeError> {
    let address = state.borrow().address();
    if state.borrow().running {
        tracing::warn!(%address, "server already running");
        return Ok(Value::Null);
    }

    if interpreter.is_persistent() {
        let listener = TcpListener::bind(&address)
            .map_err(|error| RuntimeError::Host(format!("écoute sur {address} impossible : {error}")))?;
        listener.set_nonblocking(true)?;
        state.borrow_mut().running = true;
        tracing::info!(%address, "web server listening");
        interpreter.register_task(Box::new(ServerTask {
            listener,
            state: Rc::clone(state),
            connections: Vec::new(),
        }));
        interpreter.print_line(format!("Serveur web démarré sur http://{address}"));
    } else {
        interpreter.print_line(format!(
            "Serveur web prêt sur http://{address} (utilisez `neko demarrer` pour le garder actif)"
        ));
    }

    if let Some(callback) = callback.filter(|value| value.is_callable()) {
        interpreter.call_value(callback, Vec::new())?;
    }
    Ok(Value::Null)
}

//=============================================
//            Section 2: Request Dispatch
//=============================================

/// Run the matching route handler. Unmatched requests get a 404.
fn dispatch(
    interpreter: &mut Interpreter,
    server: &SharedServer,
    request: &HttpRequest,
) -> Result<HttpResponse, RuntimeError> {
    let matched = server.borrow().routes.iter().find_map(|route| {
        route
            .matches(&request.method, &request.path)
            .map(|params| (route.handler.clone(), params))
    });

    let Some((handler, params)) = matched else {
        return Ok(HttpResponse::text(
            404,
            format!("Route introuvable : {} {}", request.method, request.path),
        ));
    };

    let response = Rc::new(RefCell::new(HttpResponse::new()));
    let returned = interpreter.call_value(
        &handler,
        vec![request.to_value(params), response_value(Rc::clone(&response))],
    )?;

    let mut response = response.borrow().clone();
    if response.body.is_none() {
        match returned {
            Value::Null => {}
            value @ (Value::Map(_) | Value::List(_)) => response.set_json(&value),
            value => response.body = Some(value.to_string()),
        }
    }
    Ok(response)
}

/// Response natives share one state so calls can be chained:
/// `reponse.statut(201).json(x)`.
fn response_value(state: Rc<RefCell<HttpResponse>>) -> Value {
    let envoyer = {
        let state = Rc::clone(&state);
        Value::native("envoyer", NativeArity::between(0, 1), move |_, args| {
            let body = match arg(args, 0) {
                value @ (Value::Map(_) | Value::List(_)) => {
                    state.borrow_mut().set_json(&value);
                    return Ok(Value::Null);
                }
                Value::Null => String::new(),
                value => value.to_string(),
            };
            let mut response = state.borrow_mut();
            if !response.has_header("Content-Type") {
                response.set_header("Content-Type", "text/html; charset=utf-8");
            }
            response.body = Some(body);
            Ok(Value::Null)
        })
    };
    let json = {
        let state = Rc::clone(&state);
        Value::native("json", NativeArity::Exact(1), move |_, args| {
            state.borrow_mut().set_json(&arg(args, 0));
            Ok(Value::Null)
        })
    };
    let html = {
        let state = Rc::clone(&state);
        Value::native("html", NativeArity::Exact(1), move |_, args| {
            let mut response = state.borrow_mut();
            response.set_header("Content-Type", "text/html; charset=utf-8");
            response.body = Some(arg(args, 0).to_string());
            Ok(Value::Null)
        })
    };
    let statut = {
        let state = Rc::clone(&state);
        Value::native("statut", NativeArity::Exact(1), move |_, args| {
            let code = expect_number(&arg(args, 0), "statut")?;
            if !(100.0..=599.0).contains(&code) {
                return Err(RuntimeError::ArgumentError(format!("statut HTTP {code} invalide")));
            }
            state.borrow_mut().status = code as u16;
            Ok(response_value(Rc::clone(&state)))
        })
    };
    let entete = {
        let state = Rc::clone(&state);
        Value::native("entete", NativeArity::Exact(2), move |_, args| {
            let name = expect_text(&arg(args, 0), "entete")?;
            let value = arg(args, 1).to_string();
            state.borrow_mut().set_header(&name, &value);
            Ok(response_value(Rc::clone(&state)))
        })
    };
    map_of([
        ("envoyer", envoyer),
        ("json", json),
        ("html", html),
        ("statut", statut),
        ("entete", entete),
    ])
}

//=============================================
//            Section 3: HTTP Messages
//=============================================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum HttpParseError {
    #[error("ligne de requête invalide : {0}")]
    RequestLine(String),
    #[error("en-tête invalide : {0}")]
    Header(String),
    #[error("requête trop volumineuse")]
    TooLarge,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub query: BTreeMap<String, String>,
    /// Header names are lowercased.
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl HttpRequest {
    fn synthetic(method: &str, target: &str, body: String) -> Self {
        let (path, query) = split_target(target);
        Self {
            method: method.to_uppercase(),
            path,
            query,
            headers: BTreeMap::new(),
            body,
        }
    }

    fn to_value(&self, params: BTreeMap<String, String>) -> Value {
        let strings = |map: &BTreeMap<String, String>| {
            Value::Map(
                map.iter()
                    .map(|(key, value)| (key.clone(), Value::text(value.clone())))
                    .collect(),
            )
        };
        let mut entries = vec![
            ("methode", Value::text(self.method.clone())),
            ("chemin", Value::text(self.path.clone())),
            ("requete", strings(&self.query)),
            ("entetes", strings(&self.headers)),
            ("corps", Value::text(self.body.clone())),
            ("parametres", strings(&params)),
        ];
        if let Ok(json) = serde_json::from_str::<serde_json::Value>(&self.body) {
            if json.is_object() || json.is_array() {
                entries.push(("json", json_to_value(&json)));
            }
        }
        map_of(entries)
    }
}

/// Parse a raw HTTP/1.1 request. `Ok(None)` while headers or body are
/// still incomplete.
pub fn parse_request(raw: &[u8]) -> Result<Option<HttpRequest>, HttpParseError> {
    if raw.len() > MAX_REQUEST_BYTES {
        return Err(HttpParseError::TooLarge);
    }
    let Some(header_end) = raw.windows(4).position(|window| window == b"\r\n\r\n") else {
        return Ok(None);
    };

    let head = String::from_utf8_lossy(&raw[..header_end]);
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(target), Some(version)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(HttpParseError::RequestLine(request_line.to_string()));
    };
    if !version.starts_with("HTTP/") {
        return Err(HttpParseError::RequestLine(request_line.to_string()));
    }

    let mut headers = BTreeMap::new();
    for line in lines {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| HttpParseError::Header(line.to_string()))?;
        headers.insert(name.trim().to_lowercase(), value.trim().to_string());
    }

    let content_length = match headers.get("content-length") {
        Some(length) => length
            .parse::<usize>()
            .map_err(|_| HttpParseError::Header(format!("content-length: {length}")))?,
        None => 0,
    };
    let body_start = header_end + 4;
    let body_end = body_start
        .checked_add(content_length)
        .filter(|end| *end <= MAX_REQUEST_BYTES)
        .ok_or(HttpParseError::TooLarge)?;
    if raw.len() < body_end {
        return Ok(None);
    }

    let (path, query) = split_target(target);
    Ok(Some(HttpRequest {
        method: method.to_uppercase(),
        path,
        query,
        headers,
        body: String::from_utf8_lossy(&raw[body_start..body_end]).into_owned(),
    }))
}

fn split_target(target: &str) -> (String, BTreeMap<String, String>) {
    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    let query = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (percent_decode(key), percent_decode(value))
        })
        .collect();
    let path = if path.is_empty() { "/" } else { path };
    (path.to_string(), query)
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        match bytes[index] {
            b'+' => decoded.push(b' '),
            b'%' if index + 2 < bytes.len() => {
                let high = (bytes[index + 1] as char).to_digit(16);
                let low = (bytes[index + 2] as char).to_digit(16);
                match (high, low) {
                    (Some(high), Some(low)) => {
                        decoded.push((high * 16 + low) as u8);
                        index += 2;
                    }
                    _ => decoded.push(b'%'),
                }
            }
            byte => decoded.push(byte),
        }
        index += 1;
    }
    String::from_utf8_lossy(&decoded).into_owned()
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpResponse {
    fn new() -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: None,
        }
    }

    fn text(status: u16, body: String) -> Self {
        let mut response = Self::new();
        response.status = status;
        response.set_header("Content-Type", "text/plain; charset=utf-8");
        response.body = Some(body);
        response
    }

    fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|(key, _)| key.eq_ignore_ascii_case(name))
    }

    fn set_header(&mut self, name: &str, value: &str) {
        self.headers.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.to_string()));
    }

    fn set_json(&mut self, value: &Value) {
        self.set_header("Content-Type", "application/json");
        self.body = Some(value_to_json(value).to_string());
    }

    fn into_value(self) -> Value {
        let headers = Value::Map(
            self.headers
                .into_iter()
                .map(|(key, value)| (key, Value::Str(value)))
                .collect(),
        );
        map_of([
            ("statut", Value::Number(self.status as f64)),
            ("entetes", headers),
            ("corps", Value::Str(self.body.unwrap_or_default())),
        ])
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let body = self.body.as_deref().unwrap_or_default();
        let mut head = format!("HTTP/1.1 {} {}\r\n", self.status, reason_phrase(self.status));
        for (name, value) in &self.headers {
            head.push_str(&format!("{name}: {value}\r\n"));
        }
        head.push_str(&format!("Content-Length: {}\r\nConnection: close\r\n\r\n", body.len()));
        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(body.as_bytes());
        bytes
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        408 => "Request Timeout",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

fn render_page(title: &str, content: &str, style: Option<&str>) -> String {
    let style = style
        .map(|css| format!("\n    <style>{css}</style>"))
        .unwrap_or_default();
    format!(
        "<!DOCTYPE html>\n<html lang=\"fr\">\n  <head>\n    <meta charset=\"utf-8\">\n    <title>{title}</title>{style}\n  </head>\n  <body>\n{content}\n  </body>\n</html>\n"
    )
}

//=============================================
//            Section 4: Server Host Task
//=============================================

struct Connection {
    stream: TcpStream,
    buffer: Vec<u8>,
    opened: Instant,
}

struct ServerTask {
    listener: TcpListener,
    state: SharedServer,
    connections: Vec<Connection>,
}

impl ServerTask {
    fn accept_pending(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    if let Err(error) = stream.set_nonblocking(true) {
                        tracing::warn!(%peer, %error, "dropping connection");
                        continue;
                    }
                    tracing::debug!(%peer, "connection accepted");
                    self.connections.push(Connection {
                        stream,
                        buffer: Vec::new(),
                        opened: Instant::now(),
                    });
                }
                Err(error) if error.kind() == ErrorKind::WouldBlock => break,
                Err(error) => {
                    tracing::warn!(%error, "accept failed");
                    break;
                }
            }
        }
    }

    /// `Some(request)` once fully read; `None` to keep waiting.
    fn read_request(connection: &mut Connection) -> Result<Option<HttpRequest>, HttpParseError> {
        let mut chunk = [0u8; 4096];
        loop {
            match connection.stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(read) => connection.buffer.extend_from_slice(&chunk[..read]),
                Err(error) if error.kind() == ErrorKind::WouldBlock => break,
                Err(_) => break,
            }
        }
        parse_request(&connection.buffer)
    }

    fn respond(connection: &mut Connection, response: &HttpResponse) {
        let result = connection
            .stream
            .set_nonblocking(false)
            .and_then(|_| connection.stream.write_all(&response.to_bytes()))
            .and_then(|_| connection.stream.flush());
        if let Err(error) = result {
            tracing::warn!(%error, "writing response failed");
        }
    }
}

impl HostTask for ServerTask {
    fn name(&self) -> &str {
        "serveur-web"
    }

    fn poll(&mut self, interpreter: &mut Interpreter) -> Result<TaskStatus, RuntimeError> {
        if self.state.borrow().stop_requested {
            return Ok(TaskStatus::Done);
        }
        self.accept_pending();

        let mut index = 0;
        while index < self.connections.len() {
            let connection = &mut self.connections[index];
            let outcome = match Self::read_request(connection) {
                Ok(Some(request)) => {
                    let response = dispatch(interpreter, &self.state, &request).unwrap_or_else(|error| {
                        tracing::warn!(path = %request.path, %error, "route handler failed");
                        HttpResponse::text(500, format!("Erreur d'exécution : {error}"))
                    });
                    Some(response)
                }
                Ok(None) if connection.opened.elapsed() > CONNECTION_TIMEOUT => {
                    Some(HttpResponse::text(408, "Délai dépassé".to_string()))
                }
                Ok(None) => None,
                Err(HttpParseError::TooLarge) => {
                    Some(HttpResponse::text(413, HttpParseError::TooLarge.to_string()))
                }
                Err(error) => Some(HttpResponse::text(400, error.to_string())),
            };

            match outcome {
                Some(response) => {
                    let mut connection = self.connections.swap_remove(index);
                    Self::respond(&mut connection, &response);
                }
                None => index += 1,
            }
        }
        Ok(TaskStatus::Pending)
    }

    fn shutdown(&mut self, _: &mut Interpreter) {
        let mut state = self.state.borrow_mut();
        state.running = false;
        self.connections.clear();
        tracing::info!(address = %state.address(), "web server stopped");
    }
}

//=============================================
//            Section 5: Outbound Requests
//=============================================

/// `requete(url, {methode, corps, entetes})` returns `{statut, corps}` and
/// `json` when the body parses.
fn requete(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let url = expect_text(&arg(args, 0), "requete")?;
    let options = match args.get(1) {
        Some(Value::Null) | None => Bindings::new(),
        Some(value) => expect_map(value, "requete")?,
    };
    let method = options
        .get("methode")
        .map(Value::to_string)
        .unwrap_or_else(|| "GET".to_string())
        .to_uppercase();

    let mut request = ureq::request(&method, &url);
    if let Some(Value::Map(headers)) = options.get("entetes") {
        for (name, value) in headers {
            request = request.set(name, &value.to_string());
        }
    }

    let result = match options.get("corps") {
        Some(body @ (Value::Map(_) | Value::List(_))) => request.send_json(value_to_json(body)),
        Some(Value::Null) | None => request.call(),
        Some(body) => request.send_string(&body.to_string()),
    };
    let response = match result {
        Ok(response) => response,
        Err(ureq::Error::Status(_, response)) => response,
        Err(error) => return Err(error.into()),
    };

    let status = response.status();
    let body = response.into_string()?;
    let mut entries = vec![
        ("statut", Value::Number(status as f64)),
        ("corps", Value::text(body.clone())),
    ];
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(&body) {
        entries.push(("json", json_to_value(&json)));
    }
    Ok(map_of(entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_request_with_body_and_query() {
        let raw = b"POST /chats/42?tri=nom&q=neko+noir HTTP/1.1\r\nHost: localhost\r\nContent-Length: 13\r\n\r\n{\"nom\":\"Mi\"}\n";
        let request = parse_request(raw).expect("valid").expect("complete");
        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/chats/42");
        assert_eq!(request.query.get("q").map(String::as_str), Some("neko noir"));
        assert_eq!(request.headers.get("host").map(String::as_str), Some("localhost"));
        assert_eq!(request.body, "{\"nom\":\"Mi\"}\n");
    }

    #[test]
    fn incomplete_request_waits_for_more() {
        assert_eq!(parse_request(b"GET / HTTP/1.1\r\nHost: x\r\n"), Ok(None));
        assert_eq!(
            parse_request(b"POST / HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc"),
            Ok(None)
        );
    }

    #[test]
    fn oversized_content_length_is_rejected() {
        assert_eq!(
            parse_request(b"GET / HTTP/1.1\r\nContent-Length: 18446744073709551615\r\n\r\n"),
            Err(HttpParseError::TooLarge)
        );
        assert_eq!(
            parse_request(b"POST / HTTP/1.1\r\nContent-Length: 2097152\r\n\r\nabc"),
            Err(HttpParseError::TooLarge)
        );
    }

    #[test]
    fn malformed_request_line_is_rejected() {
        assert!(matches!(
            parse_request(b"BONJOUR\r\n\r\n"),
            Err(HttpParseError::RequestLine(_))
        ));
    }

    #[test]
    fn routes_capture_parameters() {
        let route = Route::new("get", "/chats/:id", Value::Null);
        let params = route.matches("GET", "/chats/7").expect("match");
        assert_eq!(params.get("id").map(String::as_str), Some("7"));
        assert!(route.matches("POST", "/chats/7").is_none());
        assert!(route.matches("GET", "/chats/7/photos").is_none());
        assert!(Route::new("GET", "/", Value::Null).matches("GET", "/").is_some());
    }

    #[test]
    fn percent_decoding() {
        assert_eq!(percent_decode("caf%C3%A9"), "café");
        assert_eq!(percent_decode("100%"), "100%");
    }

    #[test]
    fn response_serialisation() {
        let response = HttpResponse::text(404, "absent".into());
        let bytes = String::from_utf8(response.to_bytes()).expect("utf8");
        assert!(bytes.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(bytes.contains("Content-Length: 6\r\n"));
        assert!(bytes.ends_with("\r\n\r\nabsent"));
    }
}
