//! Implementation of the `config:show` command.

use crate::cli::ConfigShowArgs;
use crate::config::{ConfigData, command_config_key};
use crate::console::MessageKind;
use crate::error::{CliError, Result};
use crate::lifecycle::{CliCommand, CommandContext};

/// Global keys never printed in clear text.
const SECRET_KEYS: &[&str] = &["auth.pass", "auth.secretkey"];

pub struct ConfigShow {
    args: ConfigShowArgs,
}

impl ConfigShow {
    pub const NAME: &'static str = "config:show";

    pub fn new(args: ConfigShowArgs) -> Self {
        Self { args }
    }

    fn render(&self, data: &ConfigData) -> Result<String> {
        if self.args.json {
            serde_json::to_string_pretty(data).map_err(|e| {
                CliError::CommandFailed(format!("failed to render config as JSON: {}", e))
            })
        } else {
            data.to_yaml()
        }
    }
}

impl CliCommand for ConfigShow {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn run(&mut self, ctx: &mut CommandContext) -> Result<()> {
        let (title, data) = match self.args.target.as_deref() {
            None => (
                format!("Global config ({})", ctx.global.path().display()),
                ctx.global.data().masked(SECRET_KEYS),
            ),
            Some(target) => {
                let profile = self
                    .args
                    .target_profile
                    .as_deref()
                    .or(ctx.profile.as_deref());
                let data = ctx.loader.load_command(target, profile)?;
                let key = command_config_key(target, profile);
                (format!("Config of {} ({})", target, key), data)
            }
        };

        ctx.say(&title, MessageKind::Info);
        if data.is_empty() && !self.args.json {
            ctx.say("(empty)", MessageKind::Comment);
            return Ok(());
        }

        let rendered = self.render(&data)?;
        ctx.say(rendered.trim_end(), MessageKind::Plain);
        Ok(())
    }
}
