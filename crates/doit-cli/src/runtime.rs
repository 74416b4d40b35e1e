// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use doit_app::{CompletionAction, Reply, Task, TaskId};
use doit_client::Client;

pub struct RemoteRuntime<'a> {
    client: &'a Client,
}

impl<'a> RemoteRuntime<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }
}

impl doit_tui::TaskRuntime for RemoteRuntime<'_> {
    fn list_tasks(&mut self) -> Result<Reply<Vec<Task>>> {
        self.client.list()
    }

    fn create_task(&mut self, title: &str, tag: Option<&str>) -> Result<Reply<()>> {
        self.client.add(title, tag)
    }

    fn complete_task(&mut self, id: &TaskId, action: CompletionAction) -> Result<Reply<()>> {
        match action {
            CompletionAction::Done => self.client.done(id),
            CompletionAction::Reset => self.client.reset(id),
        }
    }

    fn delete_task(&mut self, id: &TaskId) -> Result<Reply<()>> {
        self.client.delete(id)
    }

    fn rename_task(&mut self, id: &TaskId, title: &str) -> Result<Reply<()>> {
        self.client.rename(id, title)
    }

    fn edit_tag(&mut self, id: &TaskId, tag: &str) -> Result<Reply<()>> {
        self.client.edit_tag(id, tag)
    }

    fn fetch_note(&mut self, id: &TaskId) -> Result<Reply<String>> {
        self.client.get_note(id)
    }

    fn save_note(&mut self, id: &TaskId, note: &str) -> Result<Reply<()>> {
        self.client.set_note(id, note)
    }

    fn delete_note(&mut self, id: &TaskId) -> Result<Reply<()>> {
        self.client.delete_note(id)
    }
}
