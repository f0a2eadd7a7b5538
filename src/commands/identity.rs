use crate::shell::{CommandRunner, Identity, ProcessHost};

pub fn cmd_identity<H: ProcessHost>(runner: &CommandRunner<H>) -> Identity {
    runner.get_vcs_identity()
}

pub fn format_identity_human(result: &Identity) -> String {
    format!("Author: {}\nEmail:  {}", result.author, result.email)
}
