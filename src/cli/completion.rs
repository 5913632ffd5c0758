//! Shell completion generation

use clap::Command;
use clap_complete::{generate, Shell};
use std::io;

/// Write a completion script for `shell` to stdout
pub fn print_completions(shell: Shell, cmd: &mut Command) {
    let name = cmd.get_name().to_string();
    generate(shell, cmd, name, &mut io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_bash_mentions_subcommands() {
        let mut cmd = Command::new("kiln").subcommand(Command::new("dist"));
        let mut out = Vec::new();
        generate(Shell::Bash, &mut cmd, "kiln", &mut out);
        let script = String::from_utf8(out).unwrap();
        assert!(script.contains("kiln"));
        assert!(script.contains("dist"));
    }
}
