use super::*;

/// List every command with its usage
pub fn help(cx: &CommandContext<'_>) -> Card {
    embedded_messages::help(&cx.config.prefix)
}
