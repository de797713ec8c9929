//! In-memory transport used by the unit tests

use crate::fetcher::{HttpRequest, HttpResponse, Method, Transport, TransportError};
use std::collections::HashMap;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

#[derive(Default)]
struct Route {
    responses: Vec<(u16, String)>,
    served: usize,
    calls: usize,
}

/// Transport answering from a table of scripted responses
///
/// GET requests are keyed by their URL, form POSTs by [`ScriptedTransport::post_key`].
/// Requests without a script fail like a refused connection. A scripted
/// sequence is served in order and its last entry repeats.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    routes: Mutex<HashMap<String, Route>>,
    unscripted_calls: Mutex<HashMap<String, usize>>,
    latency: Option<Duration>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a fixed delay to every exchange
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    pub fn respond(&self, key: &str, status: u16, body: &str) {
        self.respond_sequence(key, vec![(status, body)]);
    }

    pub fn respond_sequence(&self, key: &str, responses: Vec<(u16, &str)>) {
        let mut routes = self.routes.lock().unwrap();
        let route = routes.entry(key.to_string()).or_default();
        route.responses = responses
            .into_iter()
            .map(|(status, body)| (status, body.to_string()))
            .collect();
        route.served = 0;
    }

    /// Number of requests seen for a key, scripted or not
    pub fn calls(&self, key: &str) -> usize {
        let scripted = self
            .routes
            .lock()
            .unwrap()
            .get(key)
            .map(|r| r.calls)
            .unwrap_or(0);
        let unscripted = self
            .unscripted_calls
            .lock()
            .unwrap()
            .get(key)
            .copied()
            .unwrap_or(0);
        scripted + unscripted
    }

    /// Key for a form POST to `url`
    pub fn post_key(url: &str, form: &[(&str, &str)]) -> String {
        let body = form
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        format!("POST {} {}", url, body)
    }

    fn key_for(request: &HttpRequest) -> String {
        match &request.method {
            Method::Get => request.url.clone(),
            Method::PostForm(form) => {
                let pairs: Vec<(&str, &str)> =
                    form.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
                Self::post_key(&request.url, &pairs)
            }
        }
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        if let Some(latency) = self.latency {
            thread::sleep(latency);
        }

        let key = Self::key_for(request);
        let scripted = {
            let mut routes = self.routes.lock().unwrap();
            match routes.get_mut(&key) {
                Some(route) if !route.responses.is_empty() => {
                    route.calls += 1;
                    let index = route.served.min(route.responses.len() - 1);
                    route.served += 1;
                    Some(route.responses[index].clone())
                }
                _ => None,
            }
        };

        match scripted {
            Some((status, body)) => Ok(HttpResponse { status, body }),
            None => {
                *self
                    .unscripted_calls
                    .lock()
                    .unwrap()
                    .entry(key.clone())
                    .or_default() += 1;
                Err(TransportError(format!("connection refused: {}", key)))
            }
        }
    }
}
