// src/cli/handlers/db.rs

use anyhow::{Result, anyhow};
use std::path::Path;

use crate::core::runner::Invocation;
use crate::state::BootstrapContext;
use crate::system::executor::{self, ExternalCommand};

const MYSQL_CLIENT: &str = "mysql";

/// The handler for `db query [<sql>]`. Without a query the client reads from
/// standard input.
pub fn query(inv: &Invocation<'_>) -> Result<()> {
    let sql = (!inv.args.is_empty()).then(|| inv.args.join(" "));
    run_client(inv, sql.as_deref())
}

/// The handler for `db cli`: an interactive console.
pub fn cli(inv: &Invocation<'_>) -> Result<()> {
    run_client(inv, None)
}

fn run_client(inv: &Invocation<'_>, sql: Option<&str>) -> Result<()> {
    let command = mysql_command(inv.context, sql)?;
    let cwd = inv.context.host_root().unwrap_or(Path::new("."));
    executor::execute_command(&command, cwd)?;
    Ok(())
}

/// Builds the client invocation from the credentials the isolated host config
/// declared. The password travels in `MYSQL_PWD` so it never shows up in the
/// process list.
pub fn mysql_command(ctx: &BootstrapContext, sql: Option<&str>) -> Result<ExternalCommand> {
    let constant = |name: &str| {
        ctx.constant(name)
            .ok_or_else(|| anyhow!(format!(t!("db.error.missing_constant"), name = name)))
    };

    let mut command = ExternalCommand::new(MYSQL_CLIENT)
        .arg("--no-defaults")
        .arg(format!("--user={}", constant("DB_USER")?));

    let host = ctx.constant("DB_HOST").unwrap_or_else(|| "localhost".to_string());
    command = match host.split_once(':') {
        Some((name, port)) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => command
            .arg(format!("--host={}", name))
            .arg(format!("--port={}", port)),
        Some((name, socket)) if !socket.is_empty() => command
            .arg(format!("--host={}", name))
            .arg(format!("--socket={}", socket)),
        _ => command.arg(format!("--host={}", host)),
    };

    if let Some(charset) = ctx.constant("DB_CHARSET").filter(|c| !c.is_empty()) {
        command = command.arg(format!("--default-character-set={}", charset));
    }
    command = command.arg(format!("--database={}", constant("DB_NAME")?));
    if let Some(sql) = sql {
        command = command.arg(format!("--execute={}", sql));
    }
    if let Some(password) = ctx.constant("DB_PASSWORD") {
        command = command.env("MYSQL_PWD", password);
    }
    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(host: &str) -> BootstrapContext {
        let ctx = BootstrapContext::new();
        ctx.define("DB_NAME", "wordpress").unwrap();
        ctx.define("DB_USER", "root").unwrap();
        ctx.define("DB_PASSWORD", "secret").unwrap();
        ctx.define("DB_HOST", host).unwrap();
        ctx
    }

    #[test]
    fn test_query_command_keeps_password_out_of_args() {
        let command = mysql_command(&context("localhost"), Some("SELECT 1")).unwrap();
        assert_eq!(command.program, "mysql");
        assert!(command.args.contains(&"--user=root".to_string()));
        assert!(command.args.contains(&"--database=wordpress".to_string()));
        assert!(command.args.contains(&"--execute=SELECT 1".to_string()));
        assert!(!command.display_line().contains("secret"));
        assert_eq!(command.env.get("MYSQL_PWD").map(String::as_str), Some("secret"));
    }

    #[test]
    fn test_host_port_and_socket_are_split() {
        let command = mysql_command(&context("db.internal:3307"), None).unwrap();
        assert!(command.args.contains(&"--host=db.internal".to_string()));
        assert!(command.args.contains(&"--port=3307".to_string()));
        assert!(!command.args.iter().any(|a| a.starts_with("--execute")));

        let command = mysql_command(&context("localhost:/tmp/mysql.sock"), None).unwrap();
        assert!(command.args.contains(&"--socket=/tmp/mysql.sock".to_string()));
    }

    #[test]
    fn test_missing_database_name_is_an_error() {
        let ctx = BootstrapContext::new();
        ctx.define("DB_USER", "root").unwrap();
        let err = mysql_command(&ctx, None).unwrap_err();
        assert!(err.to_string().contains("DB_NAME"));
    }
}
