// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use doit_app::{Reply, Task, TaskId, TaskSchema};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Separator between the fields of one `/list` record.
pub const FIELD_DELIMITER: &str = "``";

/// Remote endpoints, one per capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    New,
    Done,
    Reset,
    Delete,
    Rename,
    NewNote,
    GetNote,
    DeleteNote,
    EditTag,
}

impl Action {
    pub const ALL: [Self; 10] = [
        Self::List,
        Self::New,
        Self::Done,
        Self::Reset,
        Self::Delete,
        Self::Rename,
        Self::NewNote,
        Self::GetNote,
        Self::DeleteNote,
        Self::EditTag,
    ];

    pub const fn path(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::New => "new",
            Self::Done => "done",
            Self::Reset => "reset",
            Self::Delete => "delete",
            Self::Rename => "rename",
            Self::NewNote => "newnote",
            Self::GetNote => "getnote",
            Self::DeleteNote => "deletenote",
            Self::EditTag => "edittag",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.path() == value)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.path())
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    credentials: Credentials,
    schema: TaskSchema,
    http: HttpClient,
}

impl Client {
    pub fn new(
        base_url: &str,
        credentials: Credentials,
        schema: TaskSchema,
        timeout: Duration,
    ) -> Result<Self> {
        let mut parsed =
            Url::parse(base_url).with_context(|| format!("invalid server URL {base_url:?}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!(
                "unsupported protocol {:?} in {base_url:?}; use http or https",
                parsed.scheme()
            );
        }
        if parsed.cannot_be_a_base() || parsed.host_str().is_none() {
            bail!("server URL {base_url:?} has no host");
        }
        if !parsed.path().ends_with('/') {
            let path = format!("{}/", parsed.path());
            parsed.set_path(&path);
        }
        if credentials.username.trim().is_empty() {
            bail!("username must not be empty");
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url: parsed,
            credentials,
            schema,
            http,
        })
    }

    /// Builds `<protocol>://<host>:<port>` and delegates to [`Client::new`].
    pub fn from_parts(
        protocol: &str,
        host: &str,
        port: u16,
        credentials: Credentials,
        schema: TaskSchema,
        timeout: Duration,
    ) -> Result<Self> {
        Self::new(
            &format!("{protocol}://{host}:{port}"),
            credentials,
            schema,
            timeout,
        )
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    pub fn schema(&self) -> TaskSchema {
        self.schema
    }

    pub fn list(&self) -> Result<Reply<Vec<Task>>> {
        let reply = self.post(Action::List, &[])?;
        Ok(reply.map(|body| parse_task_list(&body, self.schema)))
    }

    /// `tag` is only sent by the tagged variant.
    pub fn add(&self, title: &str, tag: Option<&str>) -> Result<Reply<()>> {
        let mut fields = vec![("task", title)];
        if let Some(tag) = tag {
            fields.push(("tag", tag));
        }
        self.mutate(Action::New, &fields)
    }

    pub fn done(&self, id: &TaskId) -> Result<Reply<()>> {
        self.mutate(Action::Done, &[("id", id.as_str())])
    }

    pub fn reset(&self, id: &TaskId) -> Result<Reply<()>> {
        self.mutate(Action::Reset, &[("id", id.as_str())])
    }

    pub fn delete(&self, id: &TaskId) -> Result<Reply<()>> {
        self.mutate(Action::Delete, &[("id", id.as_str())])
    }

    pub fn rename(&self, id: &TaskId, title: &str) -> Result<Reply<()>> {
        self.mutate(Action::Rename, &[("id", id.as_str()), ("task", title)])
    }

    pub fn edit_tag(&self, id: &TaskId, tag: &str) -> Result<Reply<()>> {
        self.mutate(Action::EditTag, &[("id", id.as_str()), ("tag", tag)])
    }

    pub fn get_note(&self, id: &TaskId) -> Result<Reply<String>> {
        self.post(Action::GetNote, &[("id", id.as_str())])
    }

    pub fn set_note(&self, id: &TaskId, note: &str) -> Result<Reply<()>> {
        self.mutate(Action::NewNote, &[("id", id.as_str()), ("note", note)])
    }

    pub fn delete_note(&self, id: &TaskId) -> Result<Reply<()>> {
        self.mutate(Action::DeleteNote, &[("id", id.as_str())])
    }

    fn mutate(&self, action: Action, fields: &[(&str, &str)]) -> Result<Reply<()>> {
        Ok(self.post(action, fields)?.map(|_| ()))
    }

    fn post(&self, action: Action, fields: &[(&str, &str)]) -> Result<Reply<String>> {
        let url = self
            .base_url
            .join(action.path())
            .with_context(|| format!("build URL for {action}"))?;

        let mut query = vec![
            ("user", self.credentials.username.as_str()),
            ("password", self.credentials.password.as_str()),
        ];
        query.extend_from_slice(fields);

        let response = self
            .http
            .post(url)
            .query(&query)
            .send()
            .map_err(|error| connection_error(self.base_url(), action, error))?;

        let status = response.status();
        debug!(%action, status = status.as_u16(), "remote call finished");
        if status != StatusCode::OK {
            warn!(%action, status = status.as_u16(), "remote call rejected");
            return Ok(Reply::Rejected(status.as_u16()));
        }

        let body = response
            .text()
            .with_context(|| format!("read {action} response body"))?;
        Ok(Reply::Accepted(body))
    }
}

/// Splits a `/list` body into tasks. Records whose field count does not
/// match `schema` are dropped without complaint.
pub fn parse_task_list(body: &str, schema: TaskSchema) -> Vec<Task> {
    body.split('\n')
        .filter_map(|line| {
            let fields = line.split(FIELD_DELIMITER).collect::<Vec<&str>>();
            if fields.len() != schema.field_count() {
                return None;
            }
            let task = Task::new(fields[0], fields[1], fields[2] == "true");
            Some(match schema {
                TaskSchema::Plain => task,
                TaskSchema::Tagged => task.with_tag(fields[3]),
            })
        })
        .collect()
}

fn connection_error(base_url: &str, action: Action, error: reqwest::Error) -> anyhow::Error {
    anyhow!(
        "cannot reach task server at {} for {} -- check [server] in the config ({})",
        base_url,
        action,
        error
    )
}
