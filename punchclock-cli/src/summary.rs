use colored::*;
use punchclock::{DialogOutcome, RunOutcome, RunReport};

/// Print the result of a run in a user-friendly format
pub fn display(report: &RunReport) {
    println!();
    println!("{}", "═".repeat(60));

    match &report.outcome {
        RunOutcome::Done {
            decision,
            dialog,
            submitted,
        } => {
            if *submitted {
                println!("{} {}", "✅ DONE:".green().bold(), decision);
            } else {
                println!("{} {} (dry run, not submitted)", "⏭️  DONE:".yellow().bold(), decision);
            }
            println!("   • Punch: {}", decision.action.human_label());
            let dialog_line = format!("{dialog}");
            match dialog {
                DialogOutcome::HandleFailed => println!("   • Dialog: {}", dialog_line.yellow()),
                _ => println!("   • Dialog: {dialog_line}"),
            }
        }
        RunOutcome::Failed { stage, error } => {
            println!("{} stage {} ({})", "❌ FAILED:".red().bold(), stage, error.kind());
            println!("   • Error: {error}");
        }
    }

    println!("{}", "─".repeat(60));
    println!("   • Run: {}", report.run_id);
    let stages: Vec<String> = report.transitions.iter().map(|s| s.to_string()).collect();
    println!("   • Stages: {}", stages.join(" → "));
    println!("   • Duration: {:.2}s", report.elapsed.as_secs_f64());
    println!("{}", "═".repeat(60));
}
