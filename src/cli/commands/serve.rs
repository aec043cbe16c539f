//! API server command.

use console::style;

use crate::config::Settings;

/// Start the API server.
pub async fn cmd_serve(settings: &Settings, bind: Option<&str>) -> anyhow::Result<()> {
    let (host, port) = match bind {
        Some(bind) => parse_bind_address(bind, settings.server.port)?,
        None => (settings.server.host.clone(), settings.server.port),
    };

    settings.ensure_directories()?;

    if settings.api_keys.is_empty() {
        println!(
            "{} No API keys configured; every request will be rejected with 401",
            style("!").yellow()
        );
    }

    println!(
        "{} Starting afeflow server at http://{}:{}",
        style("→").cyan(),
        host,
        port
    );
    println!("  Press Ctrl+C to stop");

    crate::server::serve(settings, &host, port).await
}

/// Parse a bind address that can be:
/// - Just a port: "3050" -> 127.0.0.1:3050
/// - Just a host: "0.0.0.0" -> 0.0.0.0:<default>
/// - Host and port: "0.0.0.0:3050"
fn parse_bind_address(bind: &str, default_port: u16) -> anyhow::Result<(String, u16)> {
    if let Ok(port) = bind.parse::<u16>() {
        return Ok(("127.0.0.1".to_string(), port));
    }

    if let Some((host, port_str)) = bind.rsplit_once(':') {
        if let Ok(port) = port_str.parse::<u16>() {
            return Ok((host.to_string(), port));
        }
    }

    Ok((bind.to_string(), default_port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bind_address() {
        assert_eq!(
            parse_bind_address("3050", 3050).unwrap(),
            ("127.0.0.1".to_string(), 3050)
        );
        assert_eq!(
            parse_bind_address("0.0.0.0:8080", 3050).unwrap(),
            ("0.0.0.0".to_string(), 8080)
        );
        assert_eq!(
            parse_bind_address("0.0.0.0", 3050).unwrap(),
            ("0.0.0.0".to_string(), 3050)
        );
    }
}
