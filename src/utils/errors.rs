//! User-Friendly Error Formatting
//!
//! Turns startup failures into messages with troubleshooting hints.

use std::fmt::Write;

/// Format error for user consumption
///
/// Takes a technical error and produces a message with likely causes and
/// the full error chain.
pub fn format_user_error(error: &anyhow::Error) -> String {
    let mut output = String::new();

    writeln!(&mut output).ok();
    writeln!(
        &mut output,
        "╔════════════════════════════════════════════════════════════╗"
    )
    .ok();
    writeln!(
        &mut output,
        "║                     ERROR                                  ║"
    )
    .ok();
    writeln!(
        &mut output,
        "╚════════════════════════════════════════════════════════════╝"
    )
    .ok();
    writeln!(&mut output).ok();

    // Match on the whole chain; context messages sit on top of the cause
    let error_msg = format!("{:#}", error);

    if error_msg.contains("pointer backend") {
        format_pointer_error(&mut output);
    } else if error_msg.contains("bind") || error_msg.contains("address") {
        format_network_error(&mut output);
    } else if error_msg.contains("Connection refused") || error_msg.contains("connect to") {
        format_connect_error(&mut output);
    } else if error_msg.contains("config") || error_msg.contains("feed") {
        format_config_error(&mut output);
    } else {
        format_generic_error(&mut output, &error_msg);
    }

    writeln!(&mut output).ok();
    writeln!(
        &mut output,
        "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━"
    )
    .ok();
    writeln!(&mut output, "Technical Details:").ok();
    writeln!(&mut output).ok();
    writeln!(&mut output, "{:#}", error).ok();
    writeln!(&mut output).ok();
    writeln!(
        &mut output,
        "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━"
    )
    .ok();
    writeln!(
        &mut output,
        "Run with -vv for detailed logs, or set RUST_LOG=beetle_link=trace"
    )
    .ok();

    output
}

fn format_network_error(output: &mut String) {
    writeln!(output, "Network Binding Error").ok();
    writeln!(output).ok();
    writeln!(output, "Could not listen for telemetry links.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Port already in use").ok();
    writeln!(output, "     → Check: ss -tlnp | grep 4444").ok();
    writeln!(output, "     → Pick another port with --port").ok();
    writeln!(output).ok();
    writeln!(output, "  2. Invalid listen address").ok();
    writeln!(output, "     → Should be 'IP:PORT' like '0.0.0.0:4444'").ok();
}

fn format_pointer_error(output: &mut String) {
    writeln!(output, "Pointer Access Error").ok();
    writeln!(output).ok();
    writeln!(output, "The desktop pointer could not be opened.").ok();
    writeln!(output).ok();
    writeln!(output, "  → Run inside a desktop session with xdg-desktop-portal").ok();
    writeln!(output, "  → Accept the remote control prompt when it appears").ok();
    writeln!(output, "  → Or run with --headless to drive a virtual pointer").ok();
}

fn format_connect_error(output: &mut String) {
    writeln!(output, "Connection Error").ok();
    writeln!(output).ok();
    writeln!(output, "Could not reach the receiving server.").ok();
    writeln!(output).ok();
    writeln!(output, "  → Is beetle-server running on that host and port?").ok();
    writeln!(output, "  → Is a firewall blocking the port?").ok();
}

fn format_config_error(output: &mut String) {
    writeln!(output, "Configuration Error").ok();
    writeln!(output).ok();
    writeln!(output, "An input file could not be loaded or is invalid.").ok();
    writeln!(output).ok();
    writeln!(output, "  → Check TOML syntax and value ranges in config.toml").ok();
    writeln!(output, "  → Feed lines must be 'F id x y z r g b' or 'P tx ty'").ok();
}

fn format_generic_error(output: &mut String, error: &str) {
    writeln!(output, "Error").ok();
    writeln!(output).ok();
    writeln!(output, "{}", error).ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_format_user_error() {
        let error = anyhow::anyhow!("something broke");
        let formatted = format_user_error(&error);
        assert!(formatted.contains("ERROR"));
        assert!(formatted.contains("something broke"));
    }

    #[test]
    fn test_bind_error_formatting() {
        let error: anyhow::Error = Err::<(), _>(std::io::Error::from(
            std::io::ErrorKind::AddrInUse,
        ))
        .context("Failed to bind listen address 0.0.0.0:4444")
        .unwrap_err();

        let formatted = format_user_error(&error);
        assert!(formatted.contains("Network Binding Error"));
        assert!(formatted.contains("--port"));
    }

    #[test]
    fn test_config_error_formatting() {
        let error = anyhow::anyhow!("Failed to parse config file");
        assert!(format_user_error(&error).contains("Configuration Error"));
    }

    #[test]
    fn test_pointer_error_formatting() {
        let error: anyhow::Error = Err::<(), _>(anyhow::anyhow!("desktop portal: no session"))
            .context("Failed to open the pointer backend")
            .unwrap_err();

        let formatted = format_user_error(&error);
        assert!(formatted.contains("Pointer Access Error"));
        assert!(formatted.contains("--headless"));
    }
}
