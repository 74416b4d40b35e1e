// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod view;

pub use view::{hint_text, present_frame, render_text};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use doit_app::{
    AppCommand, AppState, CompletionAction, Mode, ModeKind, Outcome, Reply, Task, TaskId,
};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use std::io;
use tracing::{info, warn};

/// Boundary to the remote task service. `Err` means the request never got
/// an answer; `Reply::Rejected` means the service refused it.
pub trait TaskRuntime {
    fn list_tasks(&mut self) -> Result<Reply<Vec<Task>>>;
    fn create_task(&mut self, title: &str, tag: Option<&str>) -> Result<Reply<()>>;
    fn complete_task(&mut self, id: &TaskId, action: CompletionAction) -> Result<Reply<()>>;
    fn delete_task(&mut self, id: &TaskId) -> Result<Reply<()>>;
    fn rename_task(&mut self, id: &TaskId, title: &str) -> Result<Reply<()>>;
    fn edit_tag(&mut self, id: &TaskId, tag: &str) -> Result<Reply<()>>;
    fn fetch_note(&mut self, id: &TaskId) -> Result<Reply<String>>;
    fn save_note(&mut self, id: &TaskId, note: &str) -> Result<Reply<()>>;
    fn delete_note(&mut self, id: &TaskId) -> Result<Reply<()>>;
}

#[derive(Debug, Default)]
struct ViewData {
    /// First transport failure seen; ends the loop on the next cycle.
    transport_error: Option<anyhow::Error>,
}

impl ViewData {
    fn record_transport_error(&mut self, error: anyhow::Error) {
        warn!(error = %error, "transport failure, stopping after this cycle");
        if self.transport_error.is_none() {
            self.transport_error = Some(error);
        }
    }
}

pub fn run_app<R: TaskRuntime>(state: &mut AppState, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    let result = event_loop(&mut terminal, state, runtime, &mut view_data);

    let raw_mode = disable_raw_mode().context("disable raw mode");
    let screen =
        execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen");
    first_error(result, [raw_mode, screen])
}

/// Every teardown step has already run; the loop's own error wins.
fn first_error(result: Result<()>, teardown: [Result<()>; 2]) -> Result<()> {
    teardown
        .into_iter()
        .fold(result, |outcome, step| outcome.and(step))
}

fn event_loop<B: Backend, R: TaskRuntime>(
    terminal: &mut Terminal<B>,
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
) -> Result<()> {
    loop {
        if let Some(error) = view_data.transport_error.take() {
            return Err(error);
        }

        let body = present_frame(state);
        let snapshot = &*state;
        terminal
            .draw(|frame| draw(frame, snapshot, &body))
            .context("draw frame")?;

        if let Event::Key(key) = event::read().context("read event")?
            && key.kind == KeyEventKind::Press
            && handle_key_event(state, runtime, view_data, key)
        {
            return Ok(());
        }
    }
}

fn draw(frame: &mut Frame<'_>, state: &AppState, body: &str) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)])
        .split(frame.area());

    let title = format!("doit | {}", state.mode.kind().label());
    let main = Paragraph::new(body)
        .wrap(Wrap { trim: false })
        .block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(main, layout[0]);

    let hints = Paragraph::new(hint_text(state))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(hints, layout[1]);
}

/// Returns `true` when the process should quit.
fn handle_key_event<R: TaskRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    key: KeyEvent,
) -> bool {
    if is_ctrl(key, 'c') {
        return true;
    }

    if state.mode != Mode::Browse && is_ctrl(key, 'h') {
        state.dispatch(AppCommand::ExitToBrowse);
        return false;
    }

    match state.mode.kind() {
        ModeKind::Browse => return handle_browse_key(state, runtime, view_data, key),
        ModeKind::Note => handle_note_key(state, runtime, view_data, key),
        ModeKind::Add | ModeKind::AddTag | ModeKind::Rename | ModeKind::EditTag => {
            handle_prompt_key(state, runtime, view_data, key)
        }
    }
    false
}

fn handle_browse_key<R: TaskRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    key: KeyEvent,
) -> bool {
    match (key.code, key.modifiers) {
        (KeyCode::Char('q'), KeyModifiers::NONE) => return true,
        (KeyCode::Up, _) | (KeyCode::Char('k'), KeyModifiers::NONE) => {
            state.dispatch(AppCommand::MoveCursor(-1));
        }
        (KeyCode::Down, _) | (KeyCode::Char('j'), KeyModifiers::NONE) => {
            state.dispatch(AppCommand::MoveCursor(1));
        }
        (KeyCode::Char(' ') | KeyCode::Enter, _) => {
            state.dispatch(AppCommand::ToggleSelection);
        }
        (KeyCode::Char('y'), KeyModifiers::NONE) => {
            let style = state.features.commit;
            apply_to_targets(state, runtime, view_data, "commit", |runtime, task| {
                runtime.complete_task(&task.id, style.completion_for(task))
            });
        }
        (KeyCode::Char('d'), KeyModifiers::NONE) => {
            apply_to_targets(state, runtime, view_data, "delete", |runtime, task| {
                runtime.delete_task(&task.id)
            });
        }
        (KeyCode::Char('a'), KeyModifiers::NONE) => {
            state.dispatch(AppCommand::OpenAdd);
        }
        (KeyCode::Char('r'), KeyModifiers::NONE) => {
            state.dispatch(AppCommand::OpenRename);
        }
        (KeyCode::Char('t'), KeyModifiers::NONE) => {
            state.dispatch(AppCommand::OpenEditTag);
        }
        (KeyCode::Char('n'), KeyModifiers::NONE) => open_note_editor(state, runtime, view_data),
        _ => {}
    }
    false
}

fn handle_prompt_key<R: TaskRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Esc => {
            state.dispatch(AppCommand::ExitToBrowse);
        }
        KeyCode::Enter => submit_prompt(state, runtime, view_data),
        KeyCode::Backspace => {
            state.dispatch(AppCommand::DeleteChar);
        }
        KeyCode::Char(value) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            state.dispatch(AppCommand::InsertChar(value));
        }
        _ => {}
    }
}

fn handle_note_key<R: TaskRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    key: KeyEvent,
) {
    let Some(target) = state.pending_target().cloned() else {
        return;
    };

    if is_ctrl(key, 's') {
        let note = state.input.clone();
        let result = runtime.save_note(&target.id, &note);
        finish_edit(state, runtime, view_data, "save note", result);
        return;
    }
    if is_ctrl(key, 'd') {
        let result = runtime.delete_note(&target.id);
        finish_edit(state, runtime, view_data, "delete note", result);
        return;
    }

    match key.code {
        KeyCode::Esc => {
            state.dispatch(AppCommand::ExitToBrowse);
        }
        KeyCode::Enter => {
            state.dispatch(AppCommand::InsertChar('\n'));
        }
        KeyCode::Backspace => {
            state.dispatch(AppCommand::DeleteChar);
        }
        KeyCode::Char(value) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            state.dispatch(AppCommand::InsertChar(value));
        }
        _ => {}
    }
}

fn submit_prompt<R: TaskRuntime>(state: &mut AppState, runtime: &mut R, view_data: &mut ViewData) {
    let input = state.input.clone();
    match state.mode.clone() {
        Mode::Add => {
            if input.trim().is_empty() {
                return;
            }
            if state.features.tags {
                state.dispatch(AppCommand::AdvanceToTag);
                return;
            }
            let result = runtime.create_task(&input, None);
            finish_edit(state, runtime, view_data, "create", result);
        }
        Mode::AddTag { title } => {
            let result = runtime.create_task(&title, Some(&input));
            finish_edit(state, runtime, view_data, "create", result);
        }
        Mode::Rename { target } => {
            if input.trim().is_empty() {
                return;
            }
            let result = runtime.rename_task(&target.id, &input);
            finish_edit(state, runtime, view_data, "rename", result);
        }
        Mode::EditTag { target } => {
            let result = runtime.edit_tag(&target.id, &input);
            finish_edit(state, runtime, view_data, "edit tag", result);
        }
        Mode::Browse | Mode::Note { .. } => {}
    }
}

fn open_note_editor<R: TaskRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
) {
    if !state.features.notes {
        return;
    }
    let Some(task) = state.cursor_task().cloned() else {
        return;
    };

    let body = match runtime.fetch_note(&task.id) {
        Ok(Reply::Accepted(body)) => body,
        Ok(Reply::Rejected(status)) => {
            info!(id = %task.id, status, "no note on server, starting empty");
            String::new()
        }
        Err(error) => {
            view_data.record_transport_error(error);
            return;
        }
    };
    state.dispatch(AppCommand::OpenNote { body });
}

/// Leaves the edit mode, records the reply, and re-reads the list.
fn finish_edit<R: TaskRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    label: &str,
    result: Result<Reply<()>>,
) {
    state.dispatch(AppCommand::ExitToBrowse);
    match result {
        Ok(reply) => {
            log_reply(label, &reply);
            state.dispatch(AppCommand::RecordOutcome(reply.outcome()));
            refresh_tasks(state, runtime, view_data);
        }
        Err(error) => view_data.record_transport_error(error),
    }
}

fn apply_to_targets<R, F>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    label: &str,
    mut call: F,
) where
    R: TaskRuntime,
    F: FnMut(&mut R, &Task) -> Result<Reply<()>>,
{
    let targets = state.action_targets();
    if targets.is_empty() {
        return;
    }

    let mut outcome = Outcome::Success;
    for task in &targets {
        match call(runtime, task) {
            Ok(reply) => {
                log_reply(label, &reply);
                outcome = outcome.merge(reply.outcome());
            }
            Err(error) => {
                view_data.record_transport_error(error);
                return;
            }
        }
    }
    state.dispatch(AppCommand::RecordOutcome(outcome));
    refresh_tasks(state, runtime, view_data);
}

fn refresh_tasks<R: TaskRuntime>(state: &mut AppState, runtime: &mut R, view_data: &mut ViewData) {
    match runtime.list_tasks() {
        Ok(Reply::Accepted(tasks)) => {
            state.dispatch(AppCommand::ReplaceTasks(tasks));
        }
        Ok(Reply::Rejected(status)) => {
            warn!(status, "task list refresh rejected, keeping last snapshot");
            state.dispatch(AppCommand::ClearSelection);
            state.dispatch(AppCommand::RecordOutcome(Outcome::Failure));
        }
        Err(error) => view_data.record_transport_error(error),
    }
}

fn log_reply<T>(label: &str, reply: &Reply<T>) {
    match reply {
        Reply::Accepted(_) => info!(action = label, "remote call accepted"),
        Reply::Rejected(status) => warn!(action = label, status, "remote call rejected"),
    }
}

fn is_ctrl(key: KeyEvent, value: char) -> bool {
    key.code == KeyCode::Char(value) && key.modifiers.contains(KeyModifiers::CONTROL)
}

#[cfg(test)]
mod tests {
    use super::{TaskRuntime, ViewData, first_error, handle_key_event, present_frame};
    use anyhow::{Result, anyhow};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use doit_app::{
        AppState, CommitStyle, CompletionAction, Features, Mode, Outcome, Reply, Task, TaskId,
    };

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        List,
        Create(String, Option<String>),
        Complete(String, CompletionAction),
        Delete(String),
        Rename(String, String),
        EditTag(String, String),
        FetchNote(String),
        SaveNote(String, String),
        DeleteNote(String),
    }

    /// Scripted runtime: mutations answer `mutation_status`, the list call
    /// always returns `listing`.
    #[derive(Debug, Default)]
    struct TestRuntime {
        listing: Vec<Task>,
        reject_mutations: bool,
        reject_list: bool,
        reject_note_fetch: bool,
        reject_ids: Vec<String>,
        fail_transport: bool,
        note: String,
        calls: Vec<Call>,
    }

    impl TestRuntime {
        fn with_listing(listing: Vec<Task>) -> Self {
            Self {
                listing,
                ..Self::default()
            }
        }

        fn mutation_calls(&self) -> usize {
            self.calls
                .iter()
                .filter(|call| !matches!(call, Call::List | Call::FetchNote(_)))
                .count()
        }

        fn remote_calls(&self) -> usize {
            self.calls.len()
        }

        fn mutate(&mut self, call: Call) -> Result<Reply<()>> {
            let targeted = match &call {
                Call::Complete(id, _)
                | Call::Delete(id)
                | Call::Rename(id, _)
                | Call::EditTag(id, _)
                | Call::SaveNote(id, _)
                | Call::DeleteNote(id) => self.reject_ids.contains(id),
                Call::List | Call::Create(..) | Call::FetchNote(_) => false,
            };
            self.calls.push(call);
            if self.fail_transport {
                return Err(anyhow!("connection refused"));
            }
            if self.reject_mutations || targeted {
                Ok(Reply::Rejected(500))
            } else {
                Ok(Reply::Accepted(()))
            }
        }
    }

    impl TaskRuntime for TestRuntime {
        fn list_tasks(&mut self) -> Result<Reply<Vec<Task>>> {
            self.calls.push(Call::List);
            if self.reject_list {
                return Ok(Reply::Rejected(503));
            }
            Ok(Reply::Accepted(self.listing.clone()))
        }

        fn create_task(&mut self, title: &str, tag: Option<&str>) -> Result<Reply<()>> {
            self.mutate(Call::Create(title.to_owned(), tag.map(str::to_owned)))
        }

        fn complete_task(&mut self, id: &TaskId, action: CompletionAction) -> Result<Reply<()>> {
            self.mutate(Call::Complete(id.to_string(), action))
        }

        fn delete_task(&mut self, id: &TaskId) -> Result<Reply<()>> {
            self.mutate(Call::Delete(id.to_string()))
        }

        fn rename_task(&mut self, id: &TaskId, title: &str) -> Result<Reply<()>> {
            self.mutate(Call::Rename(id.to_string(), title.to_owned()))
        }

        fn edit_tag(&mut self, id: &TaskId, tag: &str) -> Result<Reply<()>> {
            self.mutate(Call::EditTag(id.to_string(), tag.to_owned()))
        }

        fn fetch_note(&mut self, id: &TaskId) -> Result<Reply<String>> {
            self.calls.push(Call::FetchNote(id.to_string()));
            if self.fail_transport {
                return Err(anyhow!("connection refused"));
            }
            if self.reject_note_fetch {
                return Ok(Reply::Rejected(404));
            }
            Ok(Reply::Accepted(self.note.clone()))
        }

        fn save_note(&mut self, id: &TaskId, note: &str) -> Result<Reply<()>> {
            self.mutate(Call::SaveNote(id.to_string(), note.to_owned()))
        }

        fn delete_note(&mut self, id: &TaskId) -> Result<Reply<()>> {
            self.mutate(Call::DeleteNote(id.to_string()))
        }
    }

    fn sample_tasks() -> Vec<Task> {
        vec![
            Task::new("1", "Buy milk", false),
            Task::new("2", "Call bank", true),
            Task::new("3", "Water plants", false),
        ]
    }

    fn refreshed_tasks() -> Vec<Task> {
        vec![
            Task::new("1", "Buy milk", true),
            Task::new("3", "Water plants", false),
        ]
    }

    fn features(tags: bool, notes: bool, commit: CommitStyle) -> Features {
        Features {
            tags,
            notes,
            commit,
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ch(value: char) -> KeyEvent {
        key(KeyCode::Char(value))
    }

    fn ctrl(value: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(value), KeyModifiers::CONTROL)
    }

    fn run_key_script(
        state: &mut AppState,
        runtime: &mut TestRuntime,
        view_data: &mut ViewData,
        keys: &[KeyEvent],
    ) -> bool {
        keys.iter()
            .any(|key| handle_key_event(state, runtime, view_data, *key))
    }

    fn type_text(text: &str) -> Vec<KeyEvent> {
        text.chars().map(ch).collect()
    }

    #[test]
    fn commit_marks_selection_and_refreshes_from_server() {
        let mut state = AppState::new(Features::default(), sample_tasks());
        let mut runtime = TestRuntime::with_listing(refreshed_tasks());
        let mut view_data = ViewData::default();

        run_key_script(
            &mut state,
            &mut runtime,
            &mut view_data,
            &[ch(' '), ch('j'), ch(' '), ch('y')],
        );

        assert_eq!(
            runtime.calls,
            vec![
                Call::Complete("1".to_owned(), CompletionAction::Done),
                Call::Complete("2".to_owned(), CompletionAction::Done),
                Call::List,
            ]
        );
        assert!(state.selection.is_empty());
        assert_eq!(state.tasks.as_slice(), refreshed_tasks().as_slice());
        assert_eq!(state.last_outcome, Some(Outcome::Success));
    }

    #[test]
    fn selection_commit_never_resets_done_task() {
        let mut state = AppState::new(Features::default(), sample_tasks());
        let mut runtime = TestRuntime::with_listing(sample_tasks());
        let mut view_data = ViewData::default();

        run_key_script(
            &mut state,
            &mut runtime,
            &mut view_data,
            &[ch('j'), ch(' '), ch('y')],
        );
        assert_eq!(
            runtime.calls,
            vec![
                Call::Complete("2".to_owned(), CompletionAction::Done),
                Call::List,
            ]
        );
    }

    #[test]
    fn enter_toggles_selection_without_committing() {
        let mut state = AppState::new(Features::default(), sample_tasks());
        let mut runtime = TestRuntime::with_listing(sample_tasks());
        let mut view_data = ViewData::default();

        run_key_script(
            &mut state,
            &mut runtime,
            &mut view_data,
            &[key(KeyCode::Enter), ch('j'), key(KeyCode::Enter)],
        );
        assert!(state.is_selected(0));
        assert!(state.is_selected(1));

        run_key_script(&mut state, &mut runtime, &mut view_data, &[key(KeyCode::Enter)]);
        assert!(!state.is_selected(1));
        assert_eq!(runtime.remote_calls(), 0);
    }

    #[test]
    fn rejected_mutation_still_refreshes() {
        let mut state = AppState::new(Features::default(), sample_tasks());
        let mut runtime = TestRuntime {
            reject_mutations: true,
            ..TestRuntime::with_listing(refreshed_tasks())
        };
        let mut view_data = ViewData::default();

        run_key_script(
            &mut state,
            &mut runtime,
            &mut view_data,
            &[ch(' '), ch('d')],
        );

        assert_eq!(
            runtime.calls,
            vec![Call::Delete("1".to_owned()), Call::List]
        );
        assert!(state.selection.is_empty());
        assert_eq!(state.tasks.as_slice(), refreshed_tasks().as_slice());
        assert_eq!(state.last_outcome, Some(Outcome::Failure));
        assert!(view_data.transport_error.is_none());
    }

    #[test]
    fn one_rejection_among_targets_reports_failure() {
        let mut state = AppState::new(Features::default(), sample_tasks());
        let mut runtime = TestRuntime {
            reject_ids: vec!["3".to_owned()],
            ..TestRuntime::with_listing(sample_tasks())
        };
        let mut view_data = ViewData::default();

        run_key_script(
            &mut state,
            &mut runtime,
            &mut view_data,
            &[ch(' '), ch('j'), ch('j'), ch(' '), ch('y')],
        );
        assert_eq!(runtime.mutation_calls(), 2);
        assert_eq!(state.last_outcome, Some(Outcome::Failure));
        assert!(state.selection.is_empty());
    }

    #[test]
    fn commit_with_nothing_selected_is_noop() {
        let mut state = AppState::new(Features::default(), sample_tasks());
        let mut runtime = TestRuntime::with_listing(sample_tasks());
        let mut view_data = ViewData::default();

        run_key_script(&mut state, &mut runtime, &mut view_data, &[ch('y'), ch('d')]);
        assert_eq!(runtime.remote_calls(), 0);
        assert!(state.last_outcome.is_none());
    }

    #[test]
    fn empty_list_ignores_browse_actions() {
        let mut state = AppState::new(
            features(true, true, CommitStyle::Toggle),
            Vec::new(),
        );
        let mut runtime = TestRuntime::default();
        let mut view_data = ViewData::default();

        let quit = run_key_script(
            &mut state,
            &mut runtime,
            &mut view_data,
            &[
                ch('j'),
                ch('k'),
                ch(' '),
                ch('y'),
                ch('d'),
                ch('r'),
                ch('t'),
                ch('n'),
            ],
        );
        assert!(!quit);
        assert_eq!(state.mode, Mode::Browse);
        assert_eq!(state.cursor, 0);
        assert_eq!(runtime.remote_calls(), 0);
    }

    #[test]
    fn toggle_style_flips_cursor_task_only() {
        let mut state = AppState::new(
            features(false, false, CommitStyle::Toggle),
            sample_tasks(),
        );
        let mut runtime = TestRuntime::with_listing(sample_tasks());
        let mut view_data = ViewData::default();

        run_key_script(
            &mut state,
            &mut runtime,
            &mut view_data,
            &[ch(' '), ch('j'), ch('y')],
        );
        assert_eq!(
            runtime.calls,
            vec![
                Call::Complete("2".to_owned(), CompletionAction::Reset),
                Call::List,
            ]
        );
        assert!(state.selection.is_empty());
    }

    #[test]
    fn add_without_tags_creates_and_returns_to_browse() {
        let mut state = AppState::new(Features::default(), sample_tasks());
        let mut runtime = TestRuntime::with_listing(refreshed_tasks());
        let mut view_data = ViewData::default();

        let mut keys = vec![ch('a')];
        keys.extend(type_text("Mow lawnx"));
        keys.push(key(KeyCode::Backspace));
        keys.push(key(KeyCode::Enter));
        run_key_script(&mut state, &mut runtime, &mut view_data, &keys);

        assert_eq!(
            runtime.calls,
            vec![Call::Create("Mow lawn".to_owned(), None), Call::List]
        );
        assert_eq!(state.mode, Mode::Browse);
        assert_eq!(state.tasks.as_slice(), refreshed_tasks().as_slice());
        assert_eq!(state.last_outcome, Some(Outcome::Success));
    }

    #[test]
    fn add_with_tags_goes_through_tag_prompt() {
        let mut state = AppState::new(
            features(true, false, CommitStyle::Selection),
            sample_tasks(),
        );
        let mut runtime = TestRuntime::with_listing(sample_tasks());
        let mut view_data = ViewData::default();

        let mut keys = vec![ch('a')];
        keys.extend(type_text("Mow"));
        keys.push(key(KeyCode::Enter));
        run_key_script(&mut state, &mut runtime, &mut view_data, &keys);
        assert_eq!(
            state.mode,
            Mode::AddTag {
                title: "Mow".to_owned()
            }
        );
        assert_eq!(runtime.remote_calls(), 0);

        let mut keys = type_text("yard");
        keys.push(key(KeyCode::Enter));
        run_key_script(&mut state, &mut runtime, &mut view_data, &keys);
        assert_eq!(
            runtime.calls,
            vec![
                Call::Create("Mow".to_owned(), Some("yard".to_owned())),
                Call::List,
            ]
        );
        assert_eq!(state.mode, Mode::Browse);
    }

    #[test]
    fn esc_in_tag_prompt_discards_pending_title() {
        let mut state = AppState::new(
            features(true, false, CommitStyle::Selection),
            sample_tasks(),
        );
        let mut runtime = TestRuntime::default();
        let mut view_data = ViewData::default();

        let mut keys = vec![ch('a')];
        keys.extend(type_text("Mow"));
        keys.push(key(KeyCode::Enter));
        keys.push(key(KeyCode::Esc));
        run_key_script(&mut state, &mut runtime, &mut view_data, &keys);
        assert_eq!(state.mode, Mode::Browse);
        assert!(state.input.is_empty());
        assert_eq!(runtime.remote_calls(), 0);
    }

    #[test]
    fn blank_title_is_not_submitted() {
        let mut state = AppState::new(Features::default(), sample_tasks());
        let mut runtime = TestRuntime::default();
        let mut view_data = ViewData::default();

        run_key_script(
            &mut state,
            &mut runtime,
            &mut view_data,
            &[ch('a'), ch(' '), key(KeyCode::Enter)],
        );
        assert_eq!(state.mode, Mode::Add);
        assert_eq!(runtime.remote_calls(), 0);
    }

    #[test]
    fn rename_targets_captured_task() {
        let mut state = AppState::new(Features::default(), sample_tasks());
        let mut runtime = TestRuntime::with_listing(refreshed_tasks());
        let mut view_data = ViewData::default();

        let mut keys = vec![ch(' '), ch('j'), ch('r')];
        keys.extend(std::iter::repeat_n(key(KeyCode::Backspace), 4));
        keys.extend(type_text("mom"));
        keys.push(key(KeyCode::Enter));
        run_key_script(&mut state, &mut runtime, &mut view_data, &keys);

        assert_eq!(
            runtime.calls,
            vec![
                Call::Rename("2".to_owned(), "Call mom".to_owned()),
                Call::List,
            ]
        );
        assert!(state.pending_target().is_none());
        assert!(state.selection.is_empty());
        assert_eq!(state.tasks.as_slice(), refreshed_tasks().as_slice());
    }

    #[test]
    fn edit_tag_submits_new_tag() {
        let tasks = vec![Task::new("5", "Mow", false).with_tag("yard")];
        let listing = vec![Task::new("5", "Mow", false).with_tag("garden")];
        let mut state = AppState::new(features(true, false, CommitStyle::Selection), tasks);
        let mut runtime = TestRuntime::with_listing(listing.clone());
        let mut view_data = ViewData::default();

        let mut keys = vec![ch(' '), ch('t')];
        assert!(!run_key_script(&mut state, &mut runtime, &mut view_data, &keys));
        assert_eq!(state.input, "yard");

        keys = vec![key(KeyCode::Backspace); 4];
        keys.extend(type_text("garden"));
        keys.push(key(KeyCode::Enter));
        run_key_script(&mut state, &mut runtime, &mut view_data, &keys);
        assert_eq!(
            runtime.calls,
            vec![
                Call::EditTag("5".to_owned(), "garden".to_owned()),
                Call::List,
            ]
        );
        assert!(state.selection.is_empty());
        assert_eq!(state.tasks.as_slice(), listing.as_slice());
    }

    #[test]
    fn home_and_cancel_keys_leave_edit_modes_without_remote_calls() {
        let mut state = AppState::new(features(true, true, CommitStyle::Selection), sample_tasks());
        let mut runtime = TestRuntime {
            note: "remember".to_owned(),
            ..TestRuntime::with_listing(sample_tasks())
        };
        let mut view_data = ViewData::default();

        for (open, leave) in [
            (ch('r'), ctrl('h')),
            (ch('t'), key(KeyCode::Esc)),
            (ch('n'), ctrl('h')),
            (ch('n'), key(KeyCode::Esc)),
            (ch('a'), ctrl('h')),
        ] {
            run_key_script(&mut state, &mut runtime, &mut view_data, &[open]);
            assert_ne!(state.mode, Mode::Browse);
            run_key_script(&mut state, &mut runtime, &mut view_data, &[ch('z'), leave]);
            assert_eq!(state.mode, Mode::Browse);
            assert!(state.pending_target().is_none());
        }

        assert_eq!(runtime.mutation_calls(), 0);
        assert!(!runtime.calls.contains(&Call::List));
    }

    #[test]
    fn note_editor_prefills_fetched_body_and_saves() {
        let mut state = AppState::new(features(false, true, CommitStyle::Selection), sample_tasks());
        let mut runtime = TestRuntime {
            note: "2%".to_owned(),
            ..TestRuntime::with_listing(refreshed_tasks())
        };
        let mut view_data = ViewData::default();

        run_key_script(&mut state, &mut runtime, &mut view_data, &[ch(' '), ch('n')]);
        assert_eq!(state.input, "2%");
        assert!(matches!(state.mode, Mode::Note { .. }));

        let mut keys = vec![key(KeyCode::Enter)];
        keys.extend(type_text("oat"));
        keys.push(ctrl('s'));
        run_key_script(&mut state, &mut runtime, &mut view_data, &keys);
        assert_eq!(
            runtime.calls,
            vec![
                Call::FetchNote("1".to_owned()),
                Call::SaveNote("1".to_owned(), "2%\noat".to_owned()),
                Call::List,
            ]
        );
        assert_eq!(state.mode, Mode::Browse);
        assert!(state.selection.is_empty());
        assert_eq!(state.tasks.as_slice(), refreshed_tasks().as_slice());
    }

    #[test]
    fn note_editor_starts_empty_when_fetch_rejected_and_can_delete() {
        let mut state = AppState::new(features(false, true, CommitStyle::Selection), sample_tasks());
        let mut runtime = TestRuntime {
            reject_note_fetch: true,
            ..TestRuntime::with_listing(sample_tasks())
        };
        let mut view_data = ViewData::default();

        run_key_script(&mut state, &mut runtime, &mut view_data, &[ch('n')]);
        assert!(state.input.is_empty());

        run_key_script(&mut state, &mut runtime, &mut view_data, &[ctrl('d')]);
        assert_eq!(
            runtime.calls,
            vec![
                Call::FetchNote("1".to_owned()),
                Call::DeleteNote("1".to_owned()),
                Call::List,
            ]
        );
    }

    #[test]
    fn note_key_ignored_without_note_feature() {
        let mut state = AppState::new(Features::default(), sample_tasks());
        let mut runtime = TestRuntime::default();
        let mut view_data = ViewData::default();

        run_key_script(&mut state, &mut runtime, &mut view_data, &[ch('n'), ch('t')]);
        assert_eq!(state.mode, Mode::Browse);
        assert_eq!(runtime.remote_calls(), 0);
    }

    #[test]
    fn rejected_refresh_keeps_snapshot_and_reports_failure() {
        let mut state = AppState::new(Features::default(), sample_tasks());
        let mut runtime = TestRuntime {
            reject_list: true,
            ..TestRuntime::with_listing(refreshed_tasks())
        };
        let mut view_data = ViewData::default();

        run_key_script(&mut state, &mut runtime, &mut view_data, &[ch(' '), ch('y')]);
        assert_eq!(state.tasks.as_slice(), sample_tasks().as_slice());
        assert!(state.selection.is_empty());
        assert_eq!(state.last_outcome, Some(Outcome::Failure));
        assert!(view_data.transport_error.is_none());
    }

    #[test]
    fn transport_failure_is_recorded_without_quitting() {
        let mut state = AppState::new(Features::default(), sample_tasks());
        let mut runtime = TestRuntime {
            fail_transport: true,
            ..TestRuntime::with_listing(sample_tasks())
        };
        let mut view_data = ViewData::default();

        let quit = run_key_script(
            &mut state,
            &mut runtime,
            &mut view_data,
            &[ch(' '), ch('j'), ch(' '), ch('y')],
        );
        assert!(!quit);
        assert_eq!(runtime.remote_calls(), 1);
        let error = view_data
            .transport_error
            .as_ref()
            .expect("transport error should be recorded");
        assert!(error.to_string().contains("connection refused"));
    }

    #[test]
    fn teardown_keeps_loop_error_and_reports_teardown_failure() {
        let error = first_error(
            Err(anyhow!("read event")),
            [Err(anyhow!("disable raw mode")), Ok(())],
        )
        .expect_err("loop error should surface");
        assert_eq!(error.to_string(), "read event");

        let error = first_error(Ok(()), [Ok(()), Err(anyhow!("leave alternate screen"))])
            .expect_err("teardown error should surface");
        assert_eq!(error.to_string(), "leave alternate screen");

        assert!(first_error(Ok(()), [Ok(()), Ok(())]).is_ok());
    }

    #[test]
    fn quit_keys() {
        let mut state = AppState::new(Features::default(), sample_tasks());
        let mut runtime = TestRuntime::default();
        let mut view_data = ViewData::default();

        assert!(handle_key_event(&mut state, &mut runtime, &mut view_data, ch('q')));

        run_key_script(&mut state, &mut runtime, &mut view_data, &[ch('a')]);
        assert!(!handle_key_event(&mut state, &mut runtime, &mut view_data, ch('q')));
        assert_eq!(state.input, "q");
        assert!(handle_key_event(&mut state, &mut runtime, &mut view_data, ctrl('c')));
        assert_eq!(runtime.remote_calls(), 0);
    }

    #[test]
    fn status_banner_lasts_one_frame_after_action() {
        let mut state = AppState::new(Features::default(), sample_tasks());
        let mut runtime = TestRuntime::with_listing(sample_tasks());
        let mut view_data = ViewData::default();

        run_key_script(&mut state, &mut runtime, &mut view_data, &[ch(' '), ch('y')]);
        assert!(present_frame(&mut state).contains("Success!"));
        assert!(!present_frame(&mut state).contains("Success!"));
    }
}
