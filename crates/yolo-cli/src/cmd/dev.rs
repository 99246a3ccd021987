use super::Session;
use std::path::Path;

pub fn run(root: &Path) -> anyhow::Result<()> {
    let mut session = Session::load(root)?;
    let enabled = !session.config.dev_mode();
    session.config.set_dev_mode(enabled)?;
    if enabled {
        println!("Developer mode enabled: debug logging is on.");
    } else {
        println!("Developer mode disabled.");
    }
    Ok(())
}
