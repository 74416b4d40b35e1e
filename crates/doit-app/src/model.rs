// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::ids::TaskId;

/// One remote to-do record as last reported by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub done: bool,
    pub tag: Option<String>,
    /// Only populated once the note editor has fetched it.
    pub note: Option<String>,
}

impl Task {
    pub fn new(id: impl Into<TaskId>, title: impl Into<String>, done: bool) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            done,
            tag: None,
            note: None,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// The completion call that flips this task's current state.
    pub const fn completion_action(&self) -> CompletionAction {
        if self.done {
            CompletionAction::Reset
        } else {
            CompletionAction::Done
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionAction {
    Done,
    Reset,
}

impl CompletionAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Done => "done",
            Self::Reset => "reset",
        }
    }
}

/// Shape of one `/list` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskSchema {
    /// `id, title, done`
    Plain,
    /// `id, title, done, tag`
    Tagged,
}

impl TaskSchema {
    pub const fn field_count(self) -> usize {
        match self {
            Self::Plain => 3,
            Self::Tagged => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitStyle {
    /// Commit applies to every selected row.
    #[default]
    Selection,
    /// Commit applies to the cursor row only.
    Toggle,
}

impl CommitStyle {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Selection => "selection",
            Self::Toggle => "toggle",
        }
    }

    /// Selection style only ever marks rows done; toggle style flips the
    /// cursor row.
    pub const fn completion_for(self, task: &Task) -> CompletionAction {
        match self {
            Self::Selection => CompletionAction::Done,
            Self::Toggle => task.completion_action(),
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "selection" => Some(Self::Selection),
            "toggle" => Some(Self::Toggle),
            _ => None,
        }
    }
}

/// Which flavor of the client is deployed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Features {
    pub tags: bool,
    pub notes: bool,
    pub commit: CommitStyle,
}

impl Features {
    pub const fn schema(self) -> TaskSchema {
        if self.tags {
            TaskSchema::Tagged
        } else {
            TaskSchema::Plain
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Success => "Success!",
            Self::Failure => "Failed!",
        }
    }

    pub const fn merge(self, other: Self) -> Self {
        match (self, other) {
            (Self::Success, Self::Success) => Self::Success,
            _ => Self::Failure,
        }
    }
}

/// Answer from the remote service for a request that reached it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply<T> {
    Accepted(T),
    /// Any status other than 200.
    Rejected(u16),
}

impl<T> Reply<T> {
    pub const fn outcome(&self) -> Outcome {
        match self {
            Self::Accepted(_) => Outcome::Success,
            Self::Rejected(_) => Outcome::Failure,
        }
    }

    pub fn accepted(self) -> Option<T> {
        match self {
            Self::Accepted(value) => Some(value),
            Self::Rejected(_) => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Reply<U> {
        match self {
            Self::Accepted(value) => Reply::Accepted(f(value)),
            Self::Rejected(status) => Reply::Rejected(status),
        }
    }
}
