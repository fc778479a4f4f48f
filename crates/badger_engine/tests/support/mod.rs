#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use badger_engine::{
    FailureKind, FetchDescriptor, FetchFailure, Transport, TransportResponse,
};

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(badger_logging::initialize_for_tests);
}

#[derive(Debug, Clone)]
pub struct Scripted {
    pub delay: Duration,
    pub result: Result<TransportResponse, FetchFailure>,
}

impl Scripted {
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

pub fn respond(status: u16, body: &str) -> Scripted {
    Scripted {
        delay: Duration::from_millis(10),
        result: Ok(TransportResponse::new(status, body.to_string())),
    }
}

pub fn started(file_name: &str) -> Scripted {
    respond(200, &format!(r#"{{"file_name":"{file_name}"}}"#))
}

pub fn pending() -> Scripted {
    respond(404, r#"{"status":"pending"}"#)
}

pub fn failed(message: &str) -> Scripted {
    respond(400, &format!(r#"{{"status":"failed","message":"{message}"}}"#))
}

pub fn ready(url: &str) -> Scripted {
    respond(200, &format!(r#"{{"url":"{url}"}}"#))
}

pub fn unreachable() -> Scripted {
    Scripted {
        delay: Duration::from_millis(10),
        result: Err(FetchFailure::new(FailureKind::Network, "connection refused")),
    }
}

/// Answers calls per path from a queue; the last entry of a queue repeats forever.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, path: &str, responses: impl IntoIterator<Item = Scripted>) {
        self.routes
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .extend(responses);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| route_of(call.split_once(' ').map_or("", |(_, t)| t)) == path)
            .count()
    }
}

fn route_of(target: &str) -> &str {
    target.split('?').next().unwrap_or(target)
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn send(
        &self,
        descriptor: &FetchDescriptor,
    ) -> Result<TransportResponse, FetchFailure> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{} {}", descriptor.method(), descriptor.target()));
        let scripted = {
            let mut routes = self.routes.lock().unwrap();
            let queue = routes
                .get_mut(route_of(descriptor.target()))
                .unwrap_or_else(|| panic!("no script for {}", descriptor.target()));
            if queue.len() > 1 {
                queue.pop_front().unwrap()
            } else {
                queue.front().cloned().unwrap()
            }
        };
        tokio::time::sleep(scripted.delay).await;
        scripted.result
    }
}
