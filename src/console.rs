use anyhow::Result;
use log::error;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::error::ExamError;
use crate::proctor::Visibility;
use crate::session::{SessionHandle, SessionView};

/// One line typed into the terminal exam screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Answer(String),
    Next,
    Prev,
    Goto(usize),
    Hide,
    Show,
    Status,
    Submit,
    Quit,
    Unknown(String),
}

pub fn parse_command(line: &str) -> Command {
    let trimmed = line.trim();
    let Some(rest) = trimmed.strip_prefix(':') else {
        return Command::Answer(line.trim_end_matches(['\r', '\n']).to_string());
    };

    let mut parts = rest.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("next"), None) => Command::Next,
        (Some("prev"), None) => Command::Prev,
        // 1-based for the person typing
        (Some("goto"), Some(n)) => match n.parse::<usize>() {
            Ok(n) if n > 0 => Command::Goto(n - 1),
            _ => Command::Unknown(trimmed.to_string()),
        },
        (Some("hide"), None) => Command::Hide,
        (Some("show"), None) => Command::Show,
        (Some("status"), None) => Command::Status,
        (Some("submit"), None) => Command::Submit,
        (Some("quit"), None) | (Some("q"), None) => Command::Quit,
        _ => Command::Unknown(trimmed.to_string()),
    }
}

pub fn render(view: &SessionView) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "[{}] {} | {}/{} answered | ⏱ {}{}\n",
        view.exam_id,
        view.title.as_deref().unwrap_or("Exam"),
        view.answered,
        view.total_questions,
        view.timer.display,
        if view.timer.expired { " (time is up)" } else { "" }
    ));
    match &view.current_question {
        Some(question) => {
            let flag = if view.flagged.contains(&question.id) { " ⚑" } else { "" };
            out.push_str(&format!(
                "Q{}{}: {}\n> {}\n",
                view.current_index + 1,
                flag,
                question.text,
                question.answer
            ));
        }
        None => out.push_str("No questions in this assessment\n"),
    }
    out.push_str(&format!(
        "tab switches {} | out of frame {} | phone {} | AI {}{}\n",
        view.counters.tab_switches,
        view.counters.out_of_frame,
        view.counters.phone_usage,
        if view.ai_detected { "flagged" } else { "clear" },
        if view.camera_active { "" } else { " | camera off" }
    ));
    if let Some(last) = view.warnings.last() {
        out.push_str(&format!("⚠ {} ({} total)\n", last, view.warnings.len()));
    }
    out
}

/// Reads commands from stdin until submit succeeds, `:quit`, or end of input.
pub async fn drive(session: &SessionHandle) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{}", render(&session.snapshot().await?));

    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Command::Answer(text) => session.set_answer(text).await?,
            Command::Next => session.go_next().await?,
            Command::Prev => session.go_prev().await?,
            Command::Goto(index) => session.select_question(index).await?,
            Command::Hide => session.visibility_changed(Visibility::Hidden).await?,
            Command::Show => session.visibility_changed(Visibility::Visible).await?,
            Command::Status => {}
            Command::Submit => match session.submit().await {
                Ok(result) => {
                    println!("Submitted. Anomaly report:");
                    for anomaly in &result.anomalies {
                        println!(
                            "  {:<22} {:>3}  {:?}  {}",
                            anomaly.kind, anomaly.count, anomaly.severity, anomaly.description
                        );
                    }
                    return Ok(());
                }
                Err(ExamError::IncompleteAnswers { flagged }) => {
                    println!("Answer every question first: {}", flagged.join(", "));
                }
                Err(e) => {
                    error!("Submit failed: {}", e);
                    return Err(e.into());
                }
            },
            Command::Quit => return Ok(()),
            Command::Unknown(input) => {
                println!(
                    "Unknown command {} (:next :prev :goto N :hide :show :status :submit :quit)",
                    input
                );
                continue;
            }
        }
        println!("{}", render(&session.snapshot().await?));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command(":next"), Command::Next);
        assert_eq!(parse_command("  :prev "), Command::Prev);
        assert_eq!(parse_command(":goto 3"), Command::Goto(2));
        assert_eq!(parse_command(":q"), Command::Quit);
        assert!(matches!(parse_command(":goto 0"), Command::Unknown(_)));
        assert!(matches!(parse_command(":dance"), Command::Unknown(_)));
    }

    #[test]
    fn test_plain_text_is_an_answer() {
        assert_eq!(
            parse_command("Ownership moves on assignment\n"),
            Command::Answer("Ownership moves on assignment".to_string())
        );
        assert_eq!(parse_command(""), Command::Answer(String::new()));
    }
}
