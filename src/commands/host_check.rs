//! Implementation of the `host:check` command.

use crate::console::MessageKind;
use crate::error::Result;
use crate::lifecycle::{CliCommand, CommandContext};

/// Reports the bootstrapped host. Reaching `run` means every phase passed.
pub struct HostCheck;

impl HostCheck {
    pub const NAME: &'static str = "host:check";
}

impl CliCommand for HostCheck {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn run(&mut self, ctx: &mut CommandContext) -> Result<()> {
        let time_limit = match ctx.limits.time_limit {
            Some(limit) => format!("{}s", limit.as_secs()),
            None => "unlimited".to_string(),
        };
        let lines = [
            format!("Host:        {}", ctx.host.request().http_host),
            format!("Root:        {}", ctx.host.root().display()),
            format!("Application: {}", ctx.host.application().context),
            format!(
                "Components:  {} ({})",
                ctx.host.components().name,
                ctx.host.components().group
            ),
            format!(
                "Logged in:   {} at {}",
                ctx.session.login,
                ctx.session.authenticated_at.format("%Y-%m-%d %H:%M:%S UTC")
            ),
            format!("Memory:      {}", ctx.limits.memory),
            format!("Time limit:  {}", time_limit),
        ];

        for line in &lines {
            ctx.say(line, MessageKind::Comment);
        }
        ctx.say("Host is ready", MessageKind::Info);
        Ok(())
    }
}
