//! `specsafe` binary entry point

use specsafe_cli::{cli, exit_code, logging, run, ProjectContext, PromptConfirm};
use std::path::PathBuf;

fn main() {
    let matches = cli().get_matches();
    logging::init(matches.get_flag("verbose"), matches.get_flag("log-json"));

    let result = std::env::current_dir()
        .map_err(anyhow::Error::from)
        .and_then(|cwd| {
            let explicit = matches.get_one::<PathBuf>("config");
            Ok(ProjectContext::discover(&cwd, explicit.map(PathBuf::as_path))?)
        })
        .and_then(|ctx| run(&matches, &ctx, &mut std::io::stdout().lock(), &PromptConfirm));

    if let Err(err) = result {
        tracing::debug!(error = ?err, "command failed");
        eprintln!("error: {err:#}");
        std::process::exit(exit_code(&err));
    }
}
