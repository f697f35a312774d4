use anyhow::{bail, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::{session::SessionOrchestrator, session::SessionSnapshot};

/// One line typed on the console. An empty line is the confirm switch.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Confirm,
    Cancel,
    Detect(Vec<String>),
    Focus(String),
    Release,
    Status,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(Command::Confirm);
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "start" => Command::Start,
            "confirm" | "c" => Command::Confirm,
            "cancel" | "reset" => Command::Cancel,
            "detect" | "d" => Command::Detect(words.map(str::to_string).collect()),
            "focus" | "f" => match words.next() {
                Some(id) => Command::Focus(id.to_string()),
                None => bail!("focus needs an item id"),
            },
            "release" => Command::Release,
            "status" | "s" => Command::Status,
            "quit" | "exit" | "q" => Command::Quit,
            other => bail!("unknown command: {other}"),
        };
        Ok(command)
    }
}

pub fn describe(snapshot: &SessionSnapshot) -> String {
    let items = snapshot
        .items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            if snapshot.highlighted == Some(i) {
                format!("[{}]", item.label)
            } else {
                item.label.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" | ");

    format!(
        "{}{} {}",
        snapshot.phase.as_str(),
        if snapshot.busy { " (busy)" } else { "" },
        items
    )
}

/// Reads commands from stdin until `quit` or EOF.
pub async fn run_console(orchestrator: SessionOrchestrator) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };

        match command {
            Command::Start => match orchestrator.start().await {
                Ok(snapshot) => println!("{}", describe(&snapshot)),
                Err(err) => println!("{err}"),
            },
            Command::Confirm => println!("{:?}", orchestrator.confirm().await),
            Command::Cancel => orchestrator.cancel().await,
            Command::Detect(labels) => orchestrator.update_detections(labels).await,
            Command::Focus(id) => {
                if !orchestrator.focus(&id).await {
                    println!("focus on {id} ignored");
                }
            }
            Command::Release => orchestrator.release().await,
            Command::Status => println!("{}", describe(&orchestrator.snapshot())),
            Command::Quit => break,
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::SelectableItem;
    use crate::session::SessionPhase;

    #[test]
    fn empty_line_is_confirm() {
        assert_eq!(Command::parse("").unwrap(), Command::Confirm);
        assert_eq!(Command::parse("   ").unwrap(), Command::Confirm);
    }

    #[test]
    fn parses_detect_labels() {
        assert_eq!(
            Command::parse("detect cup bottle").unwrap(),
            Command::Detect(vec!["cup".into(), "bottle".into()])
        );
    }

    #[test]
    fn focus_requires_an_id() {
        assert!(Command::parse("focus").is_err());
        assert_eq!(
            Command::parse("f HELP").unwrap(),
            Command::Focus("HELP".into())
        );
    }

    #[test]
    fn rejects_unknown_verbs() {
        assert!(Command::parse("dance").is_err());
    }

    #[test]
    fn describe_brackets_the_highlight() {
        let snapshot = SessionSnapshot {
            phase: SessionPhase::ScanningOptions,
            items: vec![SelectableItem::fixed("HELP"), SelectableItem::fixed("PAIN")],
            highlighted: Some(1),
            ..Default::default()
        };
        assert_eq!(describe(&snapshot), "ScanningOptions HELP | [PAIN]");
    }
}
