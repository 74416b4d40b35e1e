// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use doit_app::{Task, TaskId, TaskSchema};
use doit_client::{Action, Client, Credentials, FIELD_DELIMITER};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tiny_http::{Request, Response, Server};
use url::Url;

pub const USERNAME: &str = "tester";
pub const PASSWORD: &str = "hunter2";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub action: Option<Action>,
    pub params: BTreeMap<String, String>,
}

#[derive(Debug)]
struct ServiceState {
    schema: TaskSchema,
    next_id: u64,
    tasks: Vec<Task>,
    notes: BTreeMap<String, String>,
    rejected: Vec<Action>,
    requests: Vec<RecordedRequest>,
}

/// In-memory task service speaking the remote wire protocol.
pub struct FakeService {
    server: Arc<Server>,
    state: Arc<Mutex<ServiceState>>,
    worker: Option<JoinHandle<()>>,
    base_url: String,
}

impl FakeService {
    pub fn start(schema: TaskSchema) -> Result<Self> {
        let server = Server::http("127.0.0.1:0")
            .map_err(|error| anyhow!("start fake task service: {error}"))?;
        let base_url = format!("http://{}", server.server_addr());
        let server = Arc::new(server);
        let state = Arc::new(Mutex::new(ServiceState {
            schema,
            next_id: 1,
            tasks: Vec::new(),
            notes: BTreeMap::new(),
            rejected: Vec::new(),
            requests: Vec::new(),
        }));

        let worker = {
            let server = Arc::clone(&server);
            let state = Arc::clone(&state);
            thread::spawn(move || {
                for request in server.incoming_requests() {
                    let (status, body) = handle_request(&state, &request);
                    let _ = request.respond(Response::from_string(body).with_status_code(status));
                }
            })
        };

        Ok(Self {
            server,
            state,
            worker: Some(worker),
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials() -> Credentials {
        Credentials::new(USERNAME, PASSWORD)
    }

    pub fn client(&self) -> Result<Client> {
        let schema = lock(&self.state).schema;
        Client::new(
            &self.base_url,
            Self::credentials(),
            schema,
            Duration::from_secs(2),
        )
        .context("build client for fake task service")
    }

    pub fn seed(&self, title: &str, done: bool, tag: Option<&str>) -> TaskId {
        let mut state = lock(&self.state);
        let id = state.allocate_id();
        let mut task = Task::new(id.clone(), title, done);
        if state.schema == TaskSchema::Tagged {
            task.tag = Some(tag.unwrap_or_default().to_owned());
        }
        state.tasks.push(task);
        id
    }

    pub fn tasks(&self) -> Vec<Task> {
        lock(&self.state).tasks.clone()
    }

    pub fn note(&self, id: &TaskId) -> Option<String> {
        lock(&self.state).notes.get(id.as_str()).cloned()
    }

    /// Every later call to `action` answers 500.
    pub fn reject(&self, action: Action) {
        let mut state = lock(&self.state);
        if !state.rejected.contains(&action) {
            state.rejected.push(action);
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state).requests.clone()
    }

    pub fn request_count(&self, action: Action) -> usize {
        lock(&self.state)
            .requests
            .iter()
            .filter(|request| request.action == Some(action))
            .count()
    }
}

impl Drop for FakeService {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl ServiceState {
    fn allocate_id(&mut self) -> TaskId {
        let id = TaskId::new(self.next_id.to_string());
        self.next_id += 1;
        id
    }

    fn task_mut(&mut self, id: Option<&String>) -> Option<&mut Task> {
        let id = id?;
        self.tasks.iter_mut().find(|task| task.id.as_str() == id)
    }

    fn render_list(&self) -> String {
        let mut out = String::new();
        for task in &self.tasks {
            let done = if task.done { "true" } else { "false" };
            let mut fields = vec![task.id.as_str(), task.title.as_str(), done];
            if self.schema == TaskSchema::Tagged {
                fields.push(task.tag.as_deref().unwrap_or_default());
            }
            out.push_str(&fields.join(FIELD_DELIMITER));
            out.push('\n');
        }
        out
    }

    fn apply(&mut self, action: Action, params: &BTreeMap<String, String>) -> (u16, String) {
        match action {
            Action::List => (200, self.render_list()),
            Action::New => {
                let Some(title) = params.get("task") else {
                    return (400, "missing task".to_owned());
                };
                let id = self.allocate_id();
                let mut task = Task::new(id, title.clone(), false);
                if self.schema == TaskSchema::Tagged {
                    task.tag = Some(params.get("tag").cloned().unwrap_or_default());
                }
                self.tasks.push(task);
                (200, String::new())
            }
            Action::Done | Action::Reset => match self.task_mut(params.get("id")) {
                Some(task) => {
                    task.done = action == Action::Done;
                    (200, String::new())
                }
                None => (404, "no such task".to_owned()),
            },
            Action::Delete => {
                let before = self.tasks.len();
                let id = params.get("id");
                self.tasks
                    .retain(|task| Some(task.id.as_str()) != id.map(String::as_str));
                if self.tasks.len() == before {
                    (404, "no such task".to_owned())
                } else {
                    (200, String::new())
                }
            }
            Action::Rename => {
                let Some(title) = params.get("task").cloned() else {
                    return (400, "missing task".to_owned());
                };
                match self.task_mut(params.get("id")) {
                    Some(task) => {
                        task.title = title;
                        (200, String::new())
                    }
                    None => (404, "no such task".to_owned()),
                }
            }
            Action::EditTag => {
                let tag = params.get("tag").cloned().unwrap_or_default();
                match self.task_mut(params.get("id")) {
                    Some(task) => {
                        task.tag = Some(tag);
                        (200, String::new())
                    }
                    None => (404, "no such task".to_owned()),
                }
            }
            Action::NewNote => {
                let Some(id) = params.get("id").cloned() else {
                    return (400, "missing id".to_owned());
                };
                if self.task_mut(Some(&id)).is_none() {
                    return (404, "no such task".to_owned());
                }
                let note = params.get("note").cloned().unwrap_or_default();
                self.notes.insert(id, note);
                (200, String::new())
            }
            Action::GetNote => match params.get("id").and_then(|id| self.notes.get(id)) {
                Some(note) => (200, note.clone()),
                None => (404, "no note".to_owned()),
            },
            Action::DeleteNote => match params.get("id").and_then(|id| self.notes.remove(id)) {
                Some(_) => (200, String::new()),
                None => (404, "no note".to_owned()),
            },
        }
    }
}

fn handle_request(state: &Mutex<ServiceState>, request: &Request) -> (u16, String) {
    let Ok(url) = Url::parse(&format!("http://fake{}", request.url())) else {
        return (400, "bad request line".to_owned());
    };
    let action = Action::parse(url.path().trim_start_matches('/'));
    let params = url
        .query_pairs()
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect::<BTreeMap<String, String>>();

    let mut state = lock(state);
    state.requests.push(RecordedRequest {
        action,
        params: params.clone(),
    });

    let Some(action) = action else {
        return (404, "unknown action".to_owned());
    };
    if request.method() != &tiny_http::Method::Post {
        return (405, "use POST".to_owned());
    }
    if params.get("user").map(String::as_str) != Some(USERNAME)
        || params.get("password").map(String::as_str) != Some(PASSWORD)
    {
        return (401, "bad credentials".to_owned());
    }
    if state.rejected.contains(&action) {
        return (500, "forced failure".to_owned());
    }
    state.apply(action, &params)
}

fn lock(state: &Mutex<ServiceState>) -> MutexGuard<'_, ServiceState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
