use crate::app::AppContext;
use crate::output::print_integrity;

pub async fn handle_check(ctx: &AppContext<'_>) -> anyhow::Result<()> {
    let storage = ctx.open_storage().await?;
    let report = storage.check_integrity().await?;
    let schema = storage.schema_report()?;
    print_integrity(
        &report,
        &schema,
        storage.recovered_from_corruption(),
        ctx.json(),
        ctx.quiet(),
    )?;

    if !report.is_ok() {
        if !ctx.json() {
            eprintln!("Hint: Entries that cannot be decrypted were sealed under a different key.");
        }
        return Err(anyhow::anyhow!("Integrity check failed"));
    }
    Ok(())
}
