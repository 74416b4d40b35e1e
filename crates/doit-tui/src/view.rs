// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use doit_app::{AppCommand, AppState, Mode, Task};

const CURSOR_MARK: &str = ">";
const CHECK_MARK: &str = "x";

/// Renders the current frame text. Pure: reading `last_outcome` does not
/// consume it.
pub fn render_text(state: &AppState) -> String {
    let mut out = match &state.mode {
        Mode::Browse => render_task_list(state),
        Mode::Add => render_prompt("Type in the name of the task:", &state.input),
        Mode::AddTag { title } => {
            render_prompt(&format!("Type in a tag for {title:?}:"), &state.input)
        }
        Mode::Rename { target } => {
            render_prompt(&format!("Rename {:?}:", target.title), &state.input)
        }
        Mode::EditTag { target } => {
            render_prompt(&format!("Tag for {:?}:", target.title), &state.input)
        }
        Mode::Note { target } => format!("Note for {:?}:\n\n{}\n", target.title, state.input),
    };

    if let Some(outcome) = state.last_outcome {
        out.push('\n');
        out.push_str(outcome.label());
        out.push('\n');
    }
    out
}

/// Renders the frame, then drops the outcome so the banner shows once.
pub fn present_frame(state: &mut AppState) -> String {
    let text = render_text(state);
    state.dispatch(AppCommand::ClearOutcome);
    text
}

pub fn hint_text(state: &AppState) -> String {
    match &state.mode {
        Mode::Browse => {
            let mut hints = vec![
                "j/k move",
                "space/enter select",
                "y commit",
                "d delete",
                "a add",
                "r rename",
            ];
            if state.features.tags {
                hints.push("t tag");
            }
            if state.features.notes {
                hints.push("n note");
            }
            hints.push("q quit");
            hints.join(" | ")
        }
        Mode::Note { .. } => "ctrl+s save | ctrl+d delete | esc discard | ctrl+c quit".to_owned(),
        Mode::Add | Mode::AddTag { .. } | Mode::Rename { .. } | Mode::EditTag { .. } => {
            "enter submit | esc cancel | ctrl+h home | ctrl+c quit".to_owned()
        }
    }
}

fn render_task_list(state: &AppState) -> String {
    let mut out = String::from("Tasks:\n\n");
    if state.tasks.is_empty() {
        out.push_str("  (no tasks -- press a to add one)\n");
        return out;
    }
    for (index, task) in state.tasks.iter().enumerate() {
        out.push_str(&task_line(state, index, task));
        out.push('\n');
    }
    out
}

fn task_line(state: &AppState, index: usize, task: &Task) -> String {
    let cursor = if index == state.cursor { CURSOR_MARK } else { " " };
    let checked = if state.is_checked(index) {
        CHECK_MARK
    } else {
        " "
    };
    let mut line = format!("{cursor} [{checked}] {}", task.title);
    if state.features.tags
        && let Some(tag) = task.tag.as_deref()
        && !tag.is_empty()
    {
        line.push_str(" #");
        line.push_str(tag);
    }
    line
}

fn render_prompt(prompt: &str, input: &str) -> String {
    format!("{prompt}\n\n> {input}\n")
}
