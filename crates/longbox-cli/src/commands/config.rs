//! Config command - show and validate the configuration

use anyhow::{Context, Result};
use clap::Subcommand;

use crate::context::AppContext;

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the effective configuration
    Show,
    /// Validate the configuration file
    Validate,
}

impl ConfigCommand {
    pub async fn execute(&self, ctx: &AppContext) -> Result<()> {
        match self {
            ConfigCommand::Show => self.execute_show(ctx),
            ConfigCommand::Validate => self.execute_validate(ctx),
        }
    }

    fn execute_show(&self, ctx: &AppContext) -> Result<()> {
        let formatter = ctx.formatter();

        if ctx.format.is_json() {
            let json = serde_json::to_value(&ctx.config)
                .context("Failed to serialize configuration to JSON")?;
            formatter.print_json(&json);
            return Ok(());
        }

        formatter.success(&format!("Configuration ({})", ctx.config_path.display()));
        if !ctx.config_path.exists() {
            formatter.info("(file not found; showing defaults)");
        }
        formatter.info("");
        for line in ctx.config.to_yaml()?.lines() {
            formatter.info(line);
        }
        Ok(())
    }

    fn execute_validate(&self, ctx: &AppContext) -> Result<()> {
        let formatter = ctx.formatter();
        let errors = ctx.config.validate();

        if ctx.format.is_json() {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            formatter.print_json(&serde_json::json!({
                "valid": errors.is_empty(),
                "config_path": ctx.config_path.display().to_string(),
                "errors": messages,
            }));
        } else if errors.is_empty() {
            formatter.success(&format!("{} is valid", ctx.config_path.display()));
        } else {
            formatter.error(&format!(
                "{} has {} problem(s)",
                ctx.config_path.display(),
                errors.len()
            ));
            for error in &errors {
                formatter.info(&error.to_string());
            }
        }

        if !errors.is_empty() {
            anyhow::bail!("configuration is invalid");
        }
        Ok(())
    }
}
