use anyhow::Result;

use crate::aegis::completion::resolve_completion_client;
use crate::aegis::config::load_config;
use crate::aegis::model::Mode;
use crate::aegis::orchestrator::Orchestrator;
use crate::aegis::paths::resolve_paths;
use crate::aegis::persistence::resolve_gateway;
use crate::commands::CommandReport;

#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub owner: String,
    pub text: String,
    pub mode: Option<String>,
}

pub fn run(opts: &ChatOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let cfg = load_config()?;
    let mut report = CommandReport::new("chat");

    let gateway = resolve_gateway(&paths)?;

    let mode = match &opts.mode {
        Some(raw) => match Mode::parse(raw) {
            Some(mode) => mode,
            None => {
                report.issue(format!("invalid mode `{raw}`; use PRIVATE or SHARED"));
                return Ok(report);
            }
        },
        None => gateway.load_mode(&opts.owner)?,
    };

    let completion = resolve_completion_client(&cfg);
    let orchestrator = Orchestrator::new(completion.as_ref(), gateway.as_ref(), &paths);

    match orchestrator.respond(&opts.owner, &opts.text, mode) {
        Ok(turn) => {
            report.detail(format!(
                "turn={} mode={} store={}",
                turn.message.id,
                mode.as_str(),
                gateway.label()
            ));
            if turn.response.is_safety_alert {
                report.detail("safety_alert=true");
            }
            match turn.response.wellbeing_score {
                Some(score) => report.detail(format!("wellbeing_score={score}")),
                None => report.detail("wellbeing_score=none"),
            }
            report.detail(format!("reply: {}", turn.response.empathetic_reply));
            report.detail(format!("reflect: {}", turn.response.reflection_prompt));
            report.detail(format!("tip: {}", turn.response.improvement_tip));
            if let Some(summary) = &turn.response.therapist_summary {
                report.detail(format!(
                    "summary.follow_up: {}",
                    summary.suggested_follow_up
                ));
            }
        }
        Err(err) => report.issue(err.to_string()),
    }

    Ok(report)
}
