//! Delete remote backups

use crate::context::AppContext;
use crate::util;
use anyhow::Result;
use owo_colors::OwoColorize;

pub async fn run(ctx: &AppContext, name: Option<&str>, all: bool, yes: bool) -> Result<()> {
    let remote = ctx.remote()?;

    if all {
        let count = remote.list().await?.len();
        if count == 0 {
            println!("No backups to delete");
            return Ok(());
        }
        let prompt = format!(
            "Delete all {} backups in {}?",
            count,
            remote.dir().display()
        );
        if !yes && !util::confirm(&prompt)? {
            println!("{}", "Delete cancelled".yellow());
            return Ok(());
        }
        let deleted = remote.delete_all().await?;
        println!("{} Deleted {} backups", "✓".green(), deleted);
        return Ok(());
    }

    let Some(name) = name else {
        anyhow::bail!("Name a backup to delete (see 'tv list'), or pass --all");
    };
    let record = remote.find(name).await?;
    if !yes && !util::confirm(&format!("Delete {}?", record.file_name))? {
        println!("{}", "Delete cancelled".yellow());
        return Ok(());
    }

    remote.delete(&record).await?;
    println!("{} Deleted {}", "✓".green(), record.file_name.cyan());
    Ok(())
}
