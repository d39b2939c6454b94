use anyhow::Result;

use crate::aegis::model::Mode;
use crate::aegis::paths::resolve_paths;
use crate::aegis::persistence::resolve_gateway;
use crate::commands::CommandReport;

pub fn run(owner: &str, set: Option<&str>) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("mode");

    let gateway = resolve_gateway(&paths)?;

    if let Some(raw) = set {
        let Some(mode) = Mode::parse(raw) else {
            report.issue(format!("invalid mode `{raw}`; use PRIVATE or SHARED"));
            return Ok(report);
        };
        gateway.store_mode(owner, mode)?;
        report.detail(format!("owner={owner} mode={}", mode.as_str()));
        return Ok(report);
    }

    let mode = gateway.load_mode(owner)?;
    report.detail(format!("owner={owner} mode={}", mode.as_str()));
    Ok(report)
}
