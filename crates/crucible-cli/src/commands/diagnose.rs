//! `crucible diagnose` - run full TLS diagnostics.

use anyhow::Result;
use colored::Colorize;
use crucible_ssl::{diagnose_host, SslDiagnostics};

use crate::args::DiagnoseArgs;

pub fn execute(args: &DiagnoseArgs) -> Result<()> {
    let diag = diagnose_host(&args.host);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&diag)?);
    } else {
        print!("{}", render_human(&diag));
    }

    Ok(())
}

fn render_human(diag: &SslDiagnostics) -> String {
    let mut out = String::new();

    out.push_str(&format!("Connection test: {}\n", diag.test_host));
    if diag.openssl_available {
        let status = if diag.connection_successful {
            "SUCCESS".green().bold().to_string()
        } else {
            "FAILED".red().bold().to_string()
        };
        out.push_str(&format!("  Handshake: {status}\n"));
        if let Some(error) = &diag.connection_error {
            out.push_str(&format!("  Reason: {error}\n"));
        }
    } else {
        out.push_str("  Handshake: skipped (openssl not available)\n");
    }

    if let Some(info) = &diag.cert_file_info {
        out.push_str(&format!("\nCA bundle: {}\n", info.path));
        if info.is_valid_pem {
            out.push_str(&format!("  {} certificates\n", info.cert_count));
            if !info.subjects.is_empty() {
                out.push_str(&format!("  Contains: {}\n", info.subjects.join(", ")));
            }
        } else if let Some(error) = &info.error {
            out.push_str(&format!("  {error}\n"));
        }
    }

    if !diag.issues.is_empty() {
        out.push_str("\nIssues:\n");
        for issue in &diag.issues {
            out.push_str(&format!("  - {issue}\n"));
        }
    }

    if !diag.recommendations.is_empty() {
        out.push_str("\nRecommendations:\n");
        for (i, rec) in diag.recommendations.iter().enumerate() {
            out.push_str(&format!("  {}. {rec}\n", i + 1));
        }
    }

    if let Some(cmd) = &diag.auto_fix_command {
        out.push_str("\nAuto-fix command:\n");
        out.push_str(&format!("  {cmd}\n"));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_report_lists_issues_and_recommendations() {
        colored::control::set_override(false);
        let diag = SslDiagnostics {
            openssl_available: true,
            connection_error: Some("verify error:num=19".to_string()),
            issues: vec!["Self-signed certificate in chain".to_string()],
            recommendations: vec!["Export the proxy CA".to_string()],
            ..SslDiagnostics::default()
        };

        let out = render_human(&diag);
        assert!(out.contains("Handshake: FAILED"));
        assert!(out.contains("- Self-signed certificate in chain"));
        assert!(out.contains("1. Export the proxy CA"));
    }

    #[test]
    fn human_report_notes_missing_openssl() {
        let diag = SslDiagnostics::default();
        let out = render_human(&diag);
        assert!(out.contains("skipped (openssl not available)"));
    }
}
