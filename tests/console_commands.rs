// tests/console_commands.rs

mod common;
use crate::common::{eventually, init_tracing, FakeServer, ServerConfigBuilder, TestResult, FAKE_SERVER_SCRIPT};

use std::sync::Arc;
use std::time::Duration;

use obsidia::clock::SystemClock;
use obsidia::console::{ConsoleCommand, ConsoleOutcome};
use obsidia::errors::ObsidiaError;
use obsidia::fleet::Fleet;
use obsidia::supervisor::SupervisorState;

#[test]
fn parses_every_command() -> TestResult {
    assert_eq!("status".parse::<ConsoleCommand>()?, ConsoleCommand::Status);
    assert_eq!(
        "start survival".parse::<ConsoleCommand>()?,
        ConsoleCommand::Start("survival".to_string())
    );
    assert_eq!(
        "  STOP survival  ".parse::<ConsoleCommand>()?,
        ConsoleCommand::Stop("survival".to_string())
    );
    assert_eq!(
        "restore survival 1704164400".parse::<ConsoleCommand>()?,
        ConsoleCommand::Restore {
            server: "survival".to_string(),
            id: "1704164400".to_string()
        }
    );
    assert_eq!(
        "send survival say hello   world".parse::<ConsoleCommand>()?,
        ConsoleCommand::Send {
            server: "survival".to_string(),
            text: "say hello   world".to_string()
        }
    );
    assert_eq!("backups creative".parse::<ConsoleCommand>()?, ConsoleCommand::Backups("creative".to_string()));
    assert_eq!("exit".parse::<ConsoleCommand>()?, ConsoleCommand::Quit);
    Ok(())
}

#[test]
fn malformed_commands_are_errors() {
    for line in ["", "start", "start a b", "restore survival", "send survival", "fly away"] {
        assert!(
            matches!(line.parse::<ConsoleCommand>(), Err(ObsidiaError::CommandError(_))),
            "{line:?}"
        );
    }
}

#[tokio::test]
async fn commands_drive_the_fleet() -> TestResult {
    init_tracing();
    let server = FakeServer::with_config(
        ServerConfigBuilder::new()
            .shell_script(FAKE_SERVER_SCRIPT)
            .name("survival"),
    );
    let fleet = Fleet::new(vec![server.supervisor(Arc::new(SystemClock))]);
    let sup = fleet.get("survival")?;

    let outcome = ConsoleCommand::Start("survival".to_string()).execute(&fleet).await?;
    assert_eq!(outcome, ConsoleOutcome::Output(vec!["survival: starting".to_string()]));
    assert_eq!(sup.state(), SupervisorState::Running);

    match ConsoleCommand::Status.execute(&fleet).await? {
        ConsoleOutcome::Output(lines) => {
            assert_eq!(lines.len(), 1);
            assert!(lines[0].starts_with("survival: running"), "{}", lines[0]);
        }
        other => panic!("unexpected {other:?}"),
    }

    ConsoleCommand::Send {
        server: "survival".to_string(),
        text: "list".to_string(),
    }
    .execute(&fleet)
    .await?;

    ConsoleCommand::Stop("survival".to_string()).execute(&fleet).await?;
    eventually("stopped", || sup.state() == SupervisorState::Stopped).await;

    match ConsoleCommand::Backups("survival".to_string()).execute(&fleet).await? {
        ConsoleOutcome::Output(lines) => assert_eq!(lines, vec!["survival: no backups"]),
        other => panic!("unexpected {other:?}"),
    }

    assert_eq!(ConsoleCommand::Quit.execute(&fleet).await?, ConsoleOutcome::Quit);
    fleet.shutdown_all(Duration::from_secs(5)).await;
    Ok(())
}

#[tokio::test]
async fn unknown_server_is_reported() -> TestResult {
    let fleet = Fleet::new(Vec::new());
    assert!(matches!(
        ConsoleCommand::Kill("ghost".to_string()).execute(&fleet).await,
        Err(ObsidiaError::ServerNotFound(_))
    ));
    assert_eq!(
        ConsoleCommand::Status.execute(&fleet).await?,
        ConsoleOutcome::Output(vec!["no servers".to_string()])
    );
    Ok(())
}
