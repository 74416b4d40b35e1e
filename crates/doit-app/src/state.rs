// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeSet;

use crate::{CommitStyle, Features, Outcome, Task, TaskRegistry};

/// Interaction mode. Edit modes carry the task captured on entry so the
/// edited id survives list refreshes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Browse,
    Add,
    AddTag { title: String },
    Rename { target: Task },
    EditTag { target: Task },
    Note { target: Task },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeKind {
    Browse,
    Add,
    AddTag,
    Rename,
    EditTag,
    Note,
}

impl ModeKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Browse => "browse",
            Self::Add => "add",
            Self::AddTag => "add tag",
            Self::Rename => "rename",
            Self::EditTag => "edit tag",
            Self::Note => "note",
        }
    }
}

impl Mode {
    pub const fn kind(&self) -> ModeKind {
        match self {
            Self::Browse => ModeKind::Browse,
            Self::Add => ModeKind::Add,
            Self::AddTag { .. } => ModeKind::AddTag,
            Self::Rename { .. } => ModeKind::Rename,
            Self::EditTag { .. } => ModeKind::EditTag,
            Self::Note { .. } => ModeKind::Note,
        }
    }

    pub const fn pending_target(&self) -> Option<&Task> {
        match self {
            Self::Rename { target } | Self::EditTag { target } | Self::Note { target } => {
                Some(target)
            }
            Self::Browse | Self::Add | Self::AddTag { .. } => None,
        }
    }

    pub const fn accepts_text(&self) -> bool {
        !matches!(self, Self::Browse)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub features: Features,
    pub mode: Mode,
    pub tasks: TaskRegistry,
    pub cursor: usize,
    pub selection: BTreeSet<usize>,
    pub input: String,
    /// Shown for one frame, then cleared by the event loop.
    pub last_outcome: Option<Outcome>,
}

impl AppState {
    pub fn new(features: Features, tasks: Vec<Task>) -> Self {
        Self {
            features,
            mode: Mode::Browse,
            tasks: TaskRegistry::new(tasks),
            cursor: 0,
            selection: BTreeSet::new(),
            input: String::new(),
            last_outcome: None,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Features::default(), Vec::new())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    MoveCursor(isize),
    ToggleSelection,
    OpenAdd,
    AdvanceToTag,
    OpenRename,
    OpenEditTag,
    OpenNote { body: String },
    ExitToBrowse,
    InsertChar(char),
    DeleteChar,
    RecordOutcome(Outcome),
    ClearOutcome,
    ClearSelection,
    ReplaceTasks(Vec<Task>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    ModeChanged(ModeKind),
    CursorMoved(usize),
    SelectionChanged { len: usize },
    InputChanged,
    OutcomeRecorded(Outcome),
    OutcomeCleared,
    TasksReplaced { count: usize },
}

impl AppState {
    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::MoveCursor(delta) => self.move_cursor(delta),
            AppCommand::ToggleSelection => {
                if self.tasks.is_empty() {
                    return Vec::new();
                }
                if !self.selection.remove(&self.cursor) {
                    self.selection.insert(self.cursor);
                }
                vec![AppEvent::SelectionChanged {
                    len: self.selection.len(),
                }]
            }
            AppCommand::OpenAdd => self.enter_mode(Mode::Add, String::new()),
            AppCommand::AdvanceToTag => {
                if !self.features.tags || self.mode != Mode::Add {
                    return Vec::new();
                }
                let title = std::mem::take(&mut self.input);
                self.enter_mode(Mode::AddTag { title }, String::new())
            }
            AppCommand::OpenRename => {
                let Some(target) = self.cursor_task().cloned() else {
                    return Vec::new();
                };
                let input = target.title.clone();
                self.enter_mode(Mode::Rename { target }, input)
            }
            AppCommand::OpenEditTag => {
                if !self.features.tags {
                    return Vec::new();
                }
                let Some(target) = self.cursor_task().cloned() else {
                    return Vec::new();
                };
                let input = target.tag.clone().unwrap_or_default();
                self.enter_mode(Mode::EditTag { target }, input)
            }
            AppCommand::OpenNote { body } => {
                if !self.features.notes {
                    return Vec::new();
                }
                let Some(mut target) = self.cursor_task().cloned() else {
                    return Vec::new();
                };
                target.note = Some(body.clone());
                self.enter_mode(Mode::Note { target }, body)
            }
            AppCommand::ExitToBrowse => {
                if self.mode == Mode::Browse {
                    return Vec::new();
                }
                self.enter_mode(Mode::Browse, String::new())
            }
            AppCommand::InsertChar(value) => {
                if !self.mode.accepts_text() {
                    return Vec::new();
                }
                self.input.push(value);
                vec![AppEvent::InputChanged]
            }
            AppCommand::DeleteChar => {
                if !self.mode.accepts_text() || self.input.pop().is_none() {
                    return Vec::new();
                }
                vec![AppEvent::InputChanged]
            }
            AppCommand::RecordOutcome(outcome) => {
                self.last_outcome = Some(outcome);
                vec![AppEvent::OutcomeRecorded(outcome)]
            }
            AppCommand::ClearOutcome => match self.last_outcome.take() {
                Some(_) => vec![AppEvent::OutcomeCleared],
                None => Vec::new(),
            },
            AppCommand::ClearSelection => {
                if self.selection.is_empty() {
                    return Vec::new();
                }
                self.selection.clear();
                vec![AppEvent::SelectionChanged { len: 0 }]
            }
            AppCommand::ReplaceTasks(tasks) => {
                self.tasks.replace(tasks);
                self.selection.clear();
                self.cursor = self.cursor.min(self.tasks.count().saturating_sub(1));
                vec![AppEvent::TasksReplaced {
                    count: self.tasks.count(),
                }]
            }
        }
    }

    pub fn cursor_task(&self) -> Option<&Task> {
        self.tasks.get(self.cursor)
    }

    pub fn pending_target(&self) -> Option<&Task> {
        self.mode.pending_target()
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selection.contains(&index)
    }

    /// Selected rows and rows already done share one checkbox marker.
    pub fn is_checked(&self, index: usize) -> bool {
        self.is_selected(index) || self.tasks.get(index).is_some_and(|task| task.done)
    }

    /// Tasks a commit or delete applies to, in list order.
    pub fn action_targets(&self) -> Vec<Task> {
        match self.features.commit {
            CommitStyle::Selection => self
                .selection
                .iter()
                .filter_map(|index| self.tasks.get(*index).cloned())
                .collect(),
            CommitStyle::Toggle => self.cursor_task().cloned().into_iter().collect(),
        }
    }

    fn move_cursor(&mut self, delta: isize) -> Vec<AppEvent> {
        let count = self.tasks.count();
        if count == 0 {
            self.cursor = 0;
            return Vec::new();
        }

        let next = if delta.is_negative() {
            self.cursor.saturating_sub(delta.unsigned_abs())
        } else {
            self.cursor.saturating_add(delta as usize)
        };
        let next = next.min(count - 1);
        if next == self.cursor {
            return Vec::new();
        }
        self.cursor = next;
        vec![AppEvent::CursorMoved(self.cursor)]
    }

    fn enter_mode(&mut self, mode: Mode, input: String) -> Vec<AppEvent> {
        self.mode = mode;
        self.input = input;
        vec![AppEvent::ModeChanged(self.mode.kind())]
    }
}
