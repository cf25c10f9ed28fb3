use geosync_core::RunId;

/// Markdown notice for a step the operator has to take by hand.
pub fn format_operator_notice(run_id: &RunId, problem: &str, steps: &[&str], detail: Option<&str>) -> String {
    let mut s = String::new();
    s.push_str(&format!("# ACTION NEEDED: {}\n\n", run_id.as_str()));
    s.push_str(&format!("**Problem:** {}\n\n", problem));
    s.push_str("## Steps\n");
    for (i, step) in steps.iter().enumerate() {
        s.push_str(&format!("{}. {}\n", i + 1, step));
    }
    if let Some(detail) = detail {
        s.push('\n');
        s.push_str(&format!("**Detail:** {}\n", detail));
    }
    s
}
