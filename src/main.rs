use std::{env, path::PathBuf};

use anyhow::bail;
use sketchpad::{config::Config, script::Session, Canvas};

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_module(env!("CARGO_CRATE_NAME"), log::LevelFilter::Debug)
        .parse_default_env()
        .init();

    let (script, out) = match &*env::args_os().skip(1).collect::<Vec<_>>() {
        [script, out] => (PathBuf::from(script), PathBuf::from(out)),
        _ => {
            bail!("usage: {} <script.toml> <out.png>", env!("CARGO_PKG_NAME"));
        }
    };

    let config = Config::load(&script)?;
    let canvas = Canvas::new(config.canvas.width, config.canvas.height);
    let mut session = Session::new(canvas, &config);
    session.run(&config.steps)?;

    session.surface().pixels().save(&out)?;
    log::info!(
        "wrote '{}' ({} commands applied, {} undone)",
        out.display(),
        session.history().applied().len(),
        session.history().reverted().len(),
    );
    Ok(())
}
