use crate::core::context::PublishContext;
use crate::core::error::{ConfigError, PublishError, PublishResult};
use crate::state::ProgressStore;

/// Run the reset command
///
/// With `repository`, drops only that repository's marker so its next run
/// starts from the first step (and the clean-tree check) again.
pub fn run_reset(ctx: &PublishContext, repository: Option<String>) -> PublishResult<()> {
  let mut store = ProgressStore::load(&ctx.progress_path())?;

  match repository {
    Some(name) => {
      // Orphaned markers may be dropped even if the repository left release.toml
      if ctx.config.find_repository(&name).is_none() && store.marker(&name).is_none() {
        return Err(PublishError::Config(ConfigError::RepositoryNotFound { name }));
      }
      match store.marker(&name).map(str::to_string) {
        Some(marker) => {
          store.remove(&name)?;
          println!("✅ Cleared marker '{}' for {}", marker, name);
        }
        None => println!("⏭️  No marker recorded for {}", name),
      }
    }
    None => {
      let count = store.entries().count();
      store.reset()?;
      println!("✅ Cleared {} marker(s) from {}", count, store.path().display());
    }
  }

  Ok(())
}
