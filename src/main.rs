//! Mentor - 自适应学习多智能体系统
//!
//! 演示入口：stdin 逐行读命令，向会话注入信号并打印结果摘要。
//! 命令：start <主题> / answers <JSON 对象> / signal <JSON payload> / state / quit

use std::io::Write;

use mentor::llm::build_capability;
use mentor::runtime::SessionSupervisor;
use mentor::{load_config, SessionView};
use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    mentor::observability::init();

    let config = load_config(None)?;
    let capability = build_capability(&config.llm);
    let (mut supervisor, _status_rx) = SessionSupervisor::new(config, capability, "local-user");

    println!("mentor demo session");
    println!("commands: start <topic> | answers <json> | signal <json> | state | quit");

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        let (command, rest) = match line.split_once(' ') {
            Some((c, r)) => (c, r.trim()),
            None => (line, ""),
        };

        match command {
            "" => {}
            "quit" | "exit" => break,
            "start" => {
                if rest.is_empty() {
                    println!("usage: start <topic>");
                    continue;
                }
                print_view(supervisor.start(rest).await.data.as_ref());
            }
            "answers" => match serde_json::from_str::<serde_json::Value>(rest) {
                Ok(values) => {
                    let response = supervisor
                        .signal(json!({
                            "kind": "ui-intent",
                            "action": "submit-answers",
                            "values": values,
                        }))
                        .await;
                    print_view(response.data.as_ref());
                }
                Err(e) => println!("invalid json: {}", e),
            },
            "signal" => match serde_json::from_str::<serde_json::Value>(rest) {
                Ok(payload) => {
                    let response = supervisor.signal(payload).await;
                    if let Some(err) = response.error {
                        println!("error: {}", err);
                    } else {
                        print_view(response.data.as_ref());
                    }
                }
                Err(e) => println!("invalid json: {}", e),
            },
            "state" => {
                let response = supervisor.state();
                match response.data {
                    Some(view) => println!("{}", serde_json::to_string_pretty(&view.state)?),
                    None => println!("error: {}", response.error.unwrap_or_default()),
                }
            }
            other => println!("unknown command: {}", other),
        }
    }

    Ok(())
}

fn print_view(view: Option<&SessionView>) {
    let Some(view) = view else {
        println!("no session view");
        return;
    };
    println!(
        "phase={:?} directive={:?} modules={} artifacts={}",
        view.state.phase,
        view.directive,
        view.state
            .curriculum
            .as_ref()
            .map(|c| c.modules.len())
            .unwrap_or(0),
        view.state.artifacts.len(),
    );
    for note in &view.notes {
        println!("  note: {}", note);
    }
}
